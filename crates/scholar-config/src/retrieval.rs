use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Evidence retrieval service configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Base URL of the search service
    pub endpoint: Url,
    /// Bearer token for the search service
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Number of evidence items to request per search
    #[serde(default = "default_documents")]
    pub documents: u32,
    /// Minimum similarity score for an item to be returned
    #[serde(default)]
    pub threshold: f32,
}

const fn default_documents() -> u32 {
    10
}
