// Elasticsearch dialect: integer totals via rest_total_hits_as_int

use super::{BackendError, HttpTransport, SearchBackend, SearchResult, decode_response};
use crate::query::SearchQuery;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ElasticsearchBackend {
    transport: HttpTransport,
}

impl ElasticsearchBackend {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    pub(crate) fn search_path(index: &str) -> String {
        format!(
            "{}/_search?track_total_hits=true&rest_total_hits_as_int=true",
            urlencoding::encode(index)
        )
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResult, BackendError> {
        let bytes = self
            .transport
            .post_json(&Self::search_path(index), &query.to_body())
            .await?;
        decode_response(&bytes)
    }

    fn provider(&self) -> &str {
        "elasticsearch"
    }
}
