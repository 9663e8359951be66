// OpenSearch dialect: totals come back as { "value": n }

use super::{BackendError, HttpTransport, SearchBackend, SearchResult, decode_response};
use crate::query::SearchQuery;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct OpenSearchBackend {
    transport: HttpTransport,
}

impl OpenSearchBackend {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    pub(crate) fn search_path(index: &str) -> String {
        format!("{}/_search?track_total_hits=true", urlencoding::encode(index))
    }
}

#[async_trait]
impl SearchBackend for OpenSearchBackend {
    async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResult, BackendError> {
        let bytes = self
            .transport
            .post_json(&Self::search_path(index), &query.to_body())
            .await?;
        decode_response(&bytes)
    }

    fn provider(&self) -> &str {
        "opensearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::build_backend;
    use crate::config::{BackendConfig, Provider};

    #[test]
    fn test_provider_selected_at_construction() {
        let mut config = BackendConfig {
            addresses: vec!["http://localhost:9200".into()],
            provider: Provider::Opensearch,
            ..Default::default()
        };
        assert_eq!(build_backend(&config).unwrap().provider(), "opensearch");

        config.provider = Provider::Elasticsearch;
        assert_eq!(build_backend(&config).unwrap().provider(), "elasticsearch");
    }

    #[test]
    fn test_search_path() {
        assert_eq!(
            OpenSearchBackend::search_path("app"),
            "app/_search?track_total_hits=true"
        );
    }
}
