//! Summarization of raw provider output.

use crate::error::Result;
use crate::llm::{LlmClient, Prompts};
use async_trait::async_trait;

/// Sampling temperature for summaries.
pub const SUMMARY_TEMPERATURE: f32 = 0.4;

/// Turns raw provider output into a readable answer to the query.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(&self, query: &str, raw: &str) -> Result<String>;
}

/// LLM-backed summarizer.
pub struct Summarizer {
    client: LlmClient,
}

impl Summarizer {
    pub fn new(client: &LlmClient) -> Self {
        Self {
            client: client.with_temperature(SUMMARY_TEMPERATURE),
        }
    }

    fn prompt(query: &str, raw: &str) -> String {
        let date = chrono::Local::now().to_rfc2822();
        Prompts::fill(
            Prompts::summarize(),
            &[("date", date.as_str()), ("query", query), ("raw", raw)],
        )
    }
}

#[async_trait]
impl Summarize for Summarizer {
    async fn summarize(&self, query: &str, raw: &str) -> Result<String> {
        let prompt = Self::prompt(query, raw);
        let answer = self.client.complete(None, &prompt).await?;
        Ok(answer.trim().to_string())
    }
}
