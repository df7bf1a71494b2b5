//! LLM-as-judge scoring of both providers' answers.

use crate::error::{BenchError, Result};
use crate::llm::{LlmClient, Prompts};
use crate::score::{CategoryScores, JudgeScore, Winner};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

/// Sampling temperature for judging.
pub const JUDGE_TEMPERATURE: f32 = 0.2;

/// Scores for both providers on one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub exa: JudgeScore,
    pub kirha: JudgeScore,
    pub winner: Winner,
}

/// Scores a pair of answers to the same query.
#[async_trait]
pub trait Evaluate: Send + Sync {
    async fn evaluate(&self, query: &str, websearch: &str, kirha: &str) -> Result<Verdict>;
}

/// Date format stored in `lastRunDate`.
pub fn format_run_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// LLM-as-judge.
pub struct LlmJudge {
    client: LlmClient,
}

impl LlmJudge {
    pub fn new(client: &LlmClient) -> Self {
        Self {
            client: client.with_temperature(JUDGE_TEMPERATURE),
        }
    }

    fn prompt(query: &str, websearch: &str, kirha: &str) -> String {
        let today = chrono::Local::now().date_naive().to_string();
        Prompts::fill(
            Prompts::judge(),
            &[
                ("date", today.as_str()),
                ("query", query),
                ("websearch", websearch),
                ("kirha", kirha),
            ],
        )
    }

    /// Parse the judge's JSON answer.
    ///
    /// Scores are clamped to 0-100 and the winner is recomputed from the
    /// category totals; the model's own winner field is ignored.
    fn parse_verdict(response: &str) -> Result<Verdict> {
        let json_str = Self::extract_json(response);

        #[derive(Deserialize)]
        struct RawScore {
            relevance: f64,
            accuracy: f64,
            completeness: f64,
            freshness: f64,
            actionability: f64,
            #[serde(default)]
            feedback: String,
        }

        #[derive(Deserialize)]
        struct RawVerdict {
            exa: RawScore,
            kirha: RawScore,
        }

        let raw: RawVerdict = serde_json::from_str(&json_str).map_err(|e| {
            BenchError::LlmParse(format!(
                "Failed to parse judge response: {}. Response: {}",
                e, response
            ))
        })?;

        fn to_score(raw: RawScore) -> JudgeScore {
            let clamp = |v: f64| v.round().clamp(0.0, 100.0) as u32;
            JudgeScore {
                categories: CategoryScores::new(
                    clamp(raw.relevance),
                    clamp(raw.accuracy),
                    clamp(raw.completeness),
                    clamp(raw.freshness),
                    clamp(raw.actionability),
                ),
                feedback: raw.feedback,
            }
        }

        let exa = to_score(raw.exa);
        let kirha = to_score(raw.kirha);
        let winner = Winner::from_totals(exa.categories.total(), kirha.categories.total());

        Ok(Verdict { exa, kirha, winner })
    }

    /// Extract JSON from a response that may be wrapped in prose or fences.
    fn extract_json(response: &str) -> String {
        let response = response.trim();

        if response.starts_with("```") {
            if let Some(end) = response.rfind("```") {
                let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
                if end > start {
                    return response[start..end].trim().to_string();
                }
            }
        }

        if let Some(start) = response.find('{') {
            if let Some(end) = response.rfind('}') {
                if end > start {
                    return response[start..=end].to_string();
                }
            }
        }

        response.to_string()
    }
}

#[async_trait]
impl Evaluate for LlmJudge {
    async fn evaluate(&self, query: &str, websearch: &str, kirha: &str) -> Result<Verdict> {
        let prompt = Self::prompt(query, websearch, kirha);
        let response = self.client.complete(None, &prompt).await?;
        Self::parse_verdict(&response)
    }
}
