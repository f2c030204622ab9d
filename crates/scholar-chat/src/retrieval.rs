//! Evidence search over a document collection

use async_trait::async_trait;
use scholar_config::RetrievalConfig;
use scholar_core::CallerId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::RetrievalError;
use crate::sources::EvidenceItem;

/// One search against a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub caller: CallerId,
    pub collection_id: Uuid,
    pub query: String,
    pub limit: u32,
    pub threshold: f32,
}

/// Ranked evidence plus what the search itself consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<EvidenceItem>,
    #[serde(default)]
    pub usage: RetrievalUsage,
}

/// Tokens spent embedding the query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalUsage {
    pub model_id: String,
    pub tokens: u64,
}

/// Retrieval capability used by the `get_sources` tool
#[async_trait]
pub trait Retrieval: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, RetrievalError>;
}

/// Retrieval service reached over HTTP
#[derive(Clone)]
pub struct HttpRetrieval {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Option<SecretString>,
}

impl HttpRetrieval {
    /// Create a client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn search_url(&self) -> String {
        let base = self.endpoint.as_str().trim_end_matches('/');
        format!("{base}/search")
    }
}

#[async_trait]
impl Retrieval for HttpRetrieval {
    /// POST `/search`
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, RetrievalError> {
        let mut builder = self.http.post(self.search_url()).json(query);

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(RetrievalError::Api { status, message })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn query() -> SearchQuery {
        SearchQuery {
            caller: CallerId::new("alice"),
            collection_id: Uuid::nil(),
            query: "CRISPR off-target effects".to_owned(),
            limit: 5,
            threshold: 0.3,
        }
    }

    fn client(server: &MockServer, api_key: Option<&str>) -> HttpRetrieval {
        HttpRetrieval::new(&RetrievalConfig {
            endpoint: Url::parse(&format!("{}/v1/", server.uri())).unwrap(),
            api_key: api_key.map(|k| SecretString::from(k.to_owned())),
            documents: 10,
            threshold: 0.0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn search_posts_query_and_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/search"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({"caller": "alice", "limit": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": "c1", "document_id": "doc-1", "text": "Cas9 cuts DNA.", "score": 0.9, "position": 3}
                ],
                "usage": {"model_id": "embed-v1", "tokens": 7}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server, Some("secret")).search(&query()).await.unwrap();

        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].document_id, "doc-1");
        assert_eq!(response.usage.tokens, 7);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("index warming up"))
            .mount(&server)
            .await;

        let err = client(&server, None).search(&query()).await.unwrap_err();

        assert!(matches!(err, RetrievalError::Api { status: 503, ref message } if message == "index warming up"));
    }
}
