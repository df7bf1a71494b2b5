//! Search providers under comparison.
//!
//! Each provider turns a prompt into raw output (a JSON array, serialized
//! as text) that is later summarized and judged.

mod data_api;
mod web_search;

pub use data_api::DataApiClient;
pub use web_search::WebSearchClient;

use crate::config::PathsConfig;
use crate::error::Result;
use crate::records::Prompt;
use async_trait::async_trait;
use std::path::PathBuf;

/// Which side of the comparison a provider is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// The domain data API.
    DataApi,
    /// Generic web search.
    WebSearch,
}

impl ProviderKind {
    /// Display name used in logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::DataApi => "Kirha",
            ProviderKind::WebSearch => "Exa",
        }
    }

    /// Dataset file holding this provider's results.
    pub fn results_path(&self, paths: &PathsConfig) -> PathBuf {
        match self {
            ProviderKind::DataApi => paths.data_api_results(),
            ProviderKind::WebSearch => paths.web_search_results(),
        }
    }
}

/// A search backend queried once per prompt.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Query the provider and return its raw output as JSON text.
    async fn search(&self, prompt: &Prompt) -> Result<String>;
}
