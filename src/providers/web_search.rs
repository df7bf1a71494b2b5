//! Client for the web search API.

use super::{ProviderKind, SearchProvider};
use crate::config::ProviderConfig;
use crate::error::{BenchError, Result};
use crate::records::Prompt;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "Exa";

/// Number of pages fetched per query.
pub const NUM_RESULTS: u32 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    #[serde(rename = "type")]
    search_type: &'a str,
    num_results: u32,
    contents: Contents,
}

#[derive(Debug, Serialize)]
struct Contents {
    text: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct PageContent<'a> {
    id: &'a str,
    title: Option<&'a str>,
    content: Option<&'a str>,
}

/// Web search client.
#[derive(Clone)]
pub struct WebSearchClient {
    client: Client,
    config: ProviderConfig,
}

impl WebSearchClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/search", self.config.api_base.trim_end_matches('/'))
    }

    /// Reduce a search response body to page ids, titles and text.
    fn extract_raw_data(body: &str) -> Result<String> {
        let response: SearchResponse = serde_json::from_str(body).map_err(|e| {
            BenchError::ProviderResponse {
                provider: PROVIDER,
                message: e.to_string(),
            }
        })?;

        let pages: Vec<PageContent<'_>> = response
            .results
            .iter()
            .map(|hit| PageContent {
                id: &hit.id,
                title: hit.title.as_deref(),
                content: hit.text.as_deref(),
            })
            .collect();

        serde_json::to_string(&pages).map_err(|e| BenchError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl SearchProvider for WebSearchClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::WebSearch
    }

    async fn search(&self, prompt: &Prompt) -> Result<String> {
        let request = SearchRequest {
            query: &prompt.prompt,
            search_type: "auto",
            num_results: NUM_RESULTS,
            contents: Contents { text: true },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BenchError::ProviderApi {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        Self::extract_raw_data(&body)
    }
}
