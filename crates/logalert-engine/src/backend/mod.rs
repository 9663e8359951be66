//! Search backend capability and its two wire dialects
//!
//! The engine only sees [`SearchBackend`]; which dialect answers is decided
//! once in [`build_backend`] from `backend.provider`.

mod elasticsearch;
mod http;
mod opensearch;

pub use elasticsearch::ElasticsearchBackend;
pub use http::HttpTransport;
pub use opensearch::OpenSearchBackend;

use crate::config::{BackendConfig, Provider};
use crate::query::SearchQuery;
use async_trait::async_trait;
use logalert_core::SampleDocument;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("search request failed: {0}")]
    Transport(String),

    #[error("search error: status={status} body={body}")]
    Server { status: u16, body: String },

    #[error("decode search response: {0}")]
    Decode(String),

    #[error("no backend address configured")]
    NoAddress,
}

/// Total hit count plus newest-first sample documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub total: u64,
    pub documents: Vec<SampleDocument>,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResult, BackendError>;

    fn provider(&self) -> &str;
}

/// Pick the adapter for the configured provider.
pub fn build_backend(config: &BackendConfig) -> Result<Arc<dyn SearchBackend>, BackendError> {
    let transport = HttpTransport::new(config)?;
    let backend: Arc<dyn SearchBackend> = match config.provider {
        Provider::Elasticsearch => Arc::new(ElasticsearchBackend::new(transport)),
        Provider::Opensearch => Arc::new(OpenSearchBackend::new(transport)),
    };
    Ok(backend)
}

// response shape shared by both dialects

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    total: Option<Total>,
    #[serde(default)]
    hits: Vec<Hit>,
}

// `rest_total_hits_as_int` gives a bare number, otherwise `{ "value": n }`
#[derive(Deserialize)]
#[serde(untagged)]
enum Total {
    Int(u64),
    Object { value: u64 },
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_index", default)]
    index: String,
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(rename = "_source", default)]
    source: Option<Map<String, Value>>,
}

pub(crate) fn decode_response(bytes: &[u8]) -> Result<SearchResult, BackendError> {
    let parsed: SearchResponse =
        serde_json::from_slice(bytes).map_err(|e| BackendError::Decode(e.to_string()))?;

    let total = match parsed.hits.total {
        Some(Total::Int(n)) | Some(Total::Object { value: n }) => n,
        None => return Err(BackendError::Decode("hits.total missing".into())),
    };
    let documents = parsed
        .hits
        .hits
        .into_iter()
        .map(|h| SampleDocument::new(h.index, h.id, h.source.unwrap_or_default()))
        .collect();

    Ok(SearchResult { total, documents })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_int_total() {
        let body = br#"{"hits":{"total":15,"hits":[
            {"_index":"logs-1","_id":"a","_source":{"message":"boom"}},
            {"_index":"logs-1","_id":"b"}
        ]}}"#;
        let result = decode_response(body).unwrap();
        assert_eq!(result.total, 15);
        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.documents[0].field_str("message"), Some("boom"));
        assert!(result.documents[1].source.is_empty());
    }

    #[test]
    fn test_decode_object_total() {
        let body = br#"{"hits":{"total":{"value":42,"relation":"eq"},"hits":[]}}"#;
        let result = decode_response(body).unwrap();
        assert_eq!(result.total, 42);
        assert!(result.documents.is_empty());
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode_response(b"<html>"), Err(BackendError::Decode(_))));
        assert!(matches!(
            decode_response(br#"{"hits":{"hits":[]}}"#),
            Err(BackendError::Decode(_))
        ));
    }
}
