//! Client for the domain data API.
//!
//! The API plans a chain of tool calls for a query within a vertical and
//! returns every step's output. The raw output kept for the benchmark is
//! the list of steps without their planner ids.

use super::{ProviderKind, SearchProvider};
use crate::config::ProviderConfig;
use crate::error::{BenchError, Result};
use crate::records::Prompt;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const PROVIDER: &str = "Kirha";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    vertical_id: &'a str,
    include_planning: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    raw_data: Option<Vec<RawDataStep>>,
}

#[derive(Debug, Deserialize)]
struct RawDataStep {
    tool_name: String,
    #[serde(default, deserialize_with = "present")]
    parameters: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    output: Option<Value>,
}

/// `Some` whenever the key exists, including an explicit `null`.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
struct ToolOutput<'a> {
    tool_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Value>,
}

/// Data API client.
#[derive(Clone)]
pub struct DataApiClient {
    client: Client,
    config: ProviderConfig,
}

impl DataApiClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/v1/search",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Reduce a search response body to the tool steps kept as raw data.
    fn extract_raw_data(body: &str) -> Result<String> {
        let response: SearchResponse = serde_json::from_str(body).map_err(|e| {
            BenchError::ProviderResponse {
                provider: PROVIDER,
                message: e.to_string(),
            }
        })?;

        let steps = response.raw_data.ok_or_else(|| BenchError::ProviderResponse {
            provider: PROVIDER,
            message: "missing raw_data".to_string(),
        })?;

        let outputs: Vec<ToolOutput<'_>> = steps
            .iter()
            .map(|s| ToolOutput {
                tool_name: &s.tool_name,
                parameters: s.parameters.as_ref(),
                output: s.output.as_ref(),
            })
            .collect();

        serde_json::to_string(&outputs).map_err(|e| BenchError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl SearchProvider for DataApiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DataApi
    }

    async fn search(&self, prompt: &Prompt) -> Result<String> {
        let request = SearchRequest {
            query: &prompt.prompt,
            vertical_id: &prompt.vertical,
            include_planning: true,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
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
