//! Aggregation of collected results into the published report.
//!
//! The build joins every judge record with its prompt and both providers'
//! results, masks personal data, counts tokens and computes corpus-level
//! summaries. Missing cross-references degrade to empty text and zero
//! scores; they are logged, never fatal. Running the build twice on the
//! same inputs produces the same document.

use crate::config::PathsConfig;
use crate::error::{BenchError, Result};
use crate::mask::mask_private_data;
use crate::records::{JudgeRecord, Prompt, ProviderResult, index_by_id, load_jsonl};
use crate::score::{Category, CategoryScores, JudgeScore};
use crate::tokens::TokenCounter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Vertical reported when a judged id has no prompt record.
pub const UNKNOWN_VERTICAL: &str = "unknown";

fn default_true() -> bool {
    true
}

/// One provider's side of an aggregated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResult {
    #[serde(flatten)]
    pub categories: CategoryScores,
    pub score: u32,
    pub feedback: String,
    /// Masked summarized answer.
    pub result: String,
    /// Masked raw provider output.
    pub raw_data: String,
    /// Tokens in the unmasked raw output.
    pub tokens: usize,
    /// False when the judge produced no scores for this side and the
    /// categories are zero-filled.
    #[serde(default = "default_true")]
    pub scored: bool,
    /// Collection error recorded by the runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceResult {
    fn build(
        judge: Option<&JudgeScore>,
        collected: Option<&ProviderResult>,
        counter: &TokenCounter,
    ) -> Self {
        let categories = judge.map(|j| j.categories).unwrap_or_default();
        let raw_data = collected.map(|c| c.raw_data.as_str()).unwrap_or_default();
        let result = collected.map(|c| c.result.as_str()).unwrap_or_default();

        Self {
            categories,
            score: categories.score(),
            feedback: judge.map(|j| j.feedback.clone()).unwrap_or_default(),
            result: mask_private_data(result),
            raw_data: mask_private_data(raw_data),
            tokens: counter.count(raw_data),
            scored: judge.is_some(),
            error: collected.and_then(|c| c.error.clone()),
        }
    }
}

/// A judged prompt joined with both providers' output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub id: u32,
    pub prompt: String,
    pub vertical: String,
    /// `kirha`, `websearch` or `tie`.
    pub winner: String,
    pub last_run_date: String,
    pub kirha: SourceResult,
    pub websearch: SourceResult,
}

/// Per-category corpus means for one chart row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    pub category: String,
    pub kirha: u32,
    pub websearch: u32,
}

/// Winner tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinCounts {
    pub kirha: usize,
    pub websearch: usize,
    pub tie: usize,
}

/// Corpus category means for both providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderCategories {
    pub kirha: CategoryScores,
    pub websearch: CategoryScores,
}

/// Corpus-level statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_tests: usize,
    pub kirha_score: u32,
    pub websearch_score: u32,
    pub kirha_tokens: usize,
    pub websearch_tokens: usize,
    pub token_savings_percent: i64,
    pub chart_data: Vec<ChartDataPoint>,
    #[serde(default)]
    pub categories: ProviderCategories,
    #[serde(default)]
    pub wins: WinCounts,
}

impl Summary {
    /// Compute the summary of a set of aggregated results.
    pub fn from_results(results: &[AggregatedResult]) -> Self {
        let kirha = CategoryScores::mean(results.iter().map(|r| &r.kirha.categories));
        let websearch = CategoryScores::mean(results.iter().map(|r| &r.websearch.categories));

        let kirha_tokens: usize = results.iter().map(|r| r.kirha.tokens).sum();
        let websearch_tokens: usize = results.iter().map(|r| r.websearch.tokens).sum();

        let chart_data = Category::ALL
            .iter()
            .map(|c| ChartDataPoint {
                category: c.label().to_string(),
                kirha: kirha.get(*c),
                websearch: websearch.get(*c),
            })
            .collect();

        let mut wins = WinCounts::default();
        for r in results {
            match r.winner.as_str() {
                "kirha" => wins.kirha += 1,
                "websearch" => wins.websearch += 1,
                _ => wins.tie += 1,
            }
        }

        Self {
            total_tests: results.len(),
            kirha_score: kirha.score(),
            websearch_score: websearch.score(),
            kirha_tokens,
            websearch_tokens,
            token_savings_percent: token_savings_percent(kirha_tokens, websearch_tokens),
            chart_data,
            categories: ProviderCategories { kirha, websearch },
            wins,
        }
    }
}

/// Percentage of web search tokens saved by the data API.
///
/// `round((1 - data_api / web_search) * 100)`, rounding half toward
/// positive infinity; 0 when web search used no tokens. Negative when the
/// data API used more.
pub fn token_savings_percent(data_api_tokens: usize, web_search_tokens: usize) -> i64 {
    if web_search_tokens == 0 {
        return 0;
    }
    let ratio = data_api_tokens as f64 / web_search_tokens as f64;
    ((1.0 - ratio) * 100.0 + 0.5).floor() as i64
}

/// The published artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub results: Vec<AggregatedResult>,
    pub summary: Summary,
}

/// The four datasets the report is built from.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkInputs {
    pub prompts: Vec<Prompt>,
    pub data_api: Vec<ProviderResult>,
    pub web_search: Vec<ProviderResult>,
    pub judge: Vec<JudgeRecord>,
}

impl BenchmarkInputs {
    /// Load all datasets. Any missing or malformed file is an error.
    pub fn load(paths: &PathsConfig) -> Result<Self> {
        let inputs = Self {
            prompts: load_jsonl(&paths.prompts())?,
            judge: load_jsonl(&paths.judge_results())?,
            data_api: load_jsonl(&paths.data_api_results())?,
            web_search: load_jsonl(&paths.web_search_results())?,
        };

        debug!(
            prompts = inputs.prompts.len(),
            judged = inputs.judge.len(),
            data_api = inputs.data_api.len(),
            web_search = inputs.web_search.len(),
            "loaded benchmark datasets"
        );

        Ok(inputs)
    }
}

/// Join, mask, count and summarize the inputs.
///
/// Produces exactly one result per judge record, in judge file order.
pub fn build_report(inputs: &BenchmarkInputs, counter: &TokenCounter) -> BenchmarkReport {
    let prompts = index_by_id(&inputs.prompts);
    let data_api = index_by_id(&inputs.data_api);
    let web_search = index_by_id(&inputs.web_search);

    let mut unscored = 0usize;

    let results: Vec<AggregatedResult> = inputs
        .judge
        .iter()
        .map(|judge| {
            let preview: String = judge.prompt.chars().take(40).collect();
            info!("Processing #{}: {}...", judge.id, preview);

            let prompt = prompts.get(&judge.id).copied();
            let kirha = data_api.get(&judge.id).copied();
            let exa = web_search.get(&judge.id).copied();

            if prompt.is_none() {
                warn!(id = judge.id, "no prompt record, vertical set to unknown");
            }
            if kirha.is_none() {
                warn!(id = judge.id, "no data API result, using empty output");
            }
            if exa.is_none() {
                warn!(id = judge.id, "no web search result, using empty output");
            }
            if judge.kirha.is_none() || judge.exa.is_none() {
                unscored += 1;
                warn!(id = judge.id, "judge scores missing, zero-filled");
            }

            AggregatedResult {
                id: judge.id,
                prompt: judge.prompt.clone(),
                vertical: prompt
                    .map(|p| p.vertical.clone())
                    .unwrap_or_else(|| UNKNOWN_VERTICAL.to_string()),
                winner: judge.winner.report_label().to_string(),
                last_run_date: judge.last_run_date.clone(),
                kirha: SourceResult::build(judge.kirha.as_ref(), kirha, counter),
                websearch: SourceResult::build(judge.exa.as_ref(), exa, counter),
            }
        })
        .collect();

    if unscored > 0 {
        warn!(unscored, "some results have zero-filled scores");
    }

    let summary = Summary::from_results(&results);
    BenchmarkReport { results, summary }
}

/// Write the report as pretty-printed JSON, replacing any previous artifact.
pub fn save_report(report: &BenchmarkReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| BenchError::io(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(report)
        .map_err(|e| BenchError::Serialization(e.to_string()))?;
    fs::write(path, json).map_err(|e| BenchError::io(path, e))
}

/// Read a previously written report.
pub fn load_report(path: &Path) -> Result<BenchmarkReport> {
    if !path.exists() {
        return Err(BenchError::ReportNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| BenchError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Winner;
    use tempfile::TempDir;

    fn score(r: u32, a: u32, c: u32, f: u32, x: u32, feedback: &str) -> JudgeScore {
        JudgeScore {
            categories: CategoryScores::new(r, a, c, f, x),
            feedback: feedback.to_string(),
        }
    }

    fn provider(id: u32, raw: &str, result: &str) -> ProviderResult {
        ProviderResult {
            id,
            prompt: format!("prompt {}", id),
            raw_data: raw.to_string(),
            result: result.to_string(),
            error: None,
        }
    }

    fn sample_inputs() -> BenchmarkInputs {
        BenchmarkInputs {
            prompts: vec![
                Prompt {
                    id: 1,
                    prompt: "prompt 1".to_string(),
                    vertical: "crypto".to_string(),
                },
                Prompt {
                    id: 2,
                    prompt: "prompt 2".to_string(),
                    vertical: "company-data".to_string(),
                },
            ],
            data_api: vec![
                provider(1, "[{\"output\":42}]", "BTC holdings: 42"),
                provider(2, "[]", "Contact: founder@acme.io"),
            ],
            web_search: vec![provider(
                1,
                "[{\"title\":\"Crypto news\",\"content\":\"Call +1 415-555-1234 for a long article about holdings\"}]",
                "Older figures",
            )],
            judge: vec![
                JudgeRecord {
                    id: 1,
                    prompt: "prompt 1".to_string(),
                    exa: Some(score(60, 50, 40, 30, 20, "stale")),
                    kirha: Some(score(80, 60, 70, 50, 90, "fresh")),
                    winner: Winner::DataApi,
                    last_run_date: "01-06-2025".to_string(),
                },
                JudgeRecord {
                    id: 2,
                    prompt: "prompt 2".to_string(),
                    exa: Some(score(70, 70, 70, 70, 70, "ok")),
                    kirha: None,
                    winner: Winner::WebSearch,
                    last_run_date: String::new(),
                },
                JudgeRecord {
                    id: 9,
                    prompt: "orphan".to_string(),
                    exa: None,
                    kirha: None,
                    winner: Winner::Tie,
                    last_run_date: String::new(),
                },
            ],
        }
    }

    #[test]
    fn test_join_is_total() {
        let counter = TokenCounter::o200k().unwrap();
        let report = build_report(&sample_inputs(), &counter);

        assert_eq!(report.results.len(), 3);
        let ids: Vec<u32> = report.results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 9]);

        let orphan = &report.results[2];
        assert_eq!(orphan.vertical, UNKNOWN_VERTICAL);
        assert_eq!(orphan.kirha.raw_data, "");
        assert_eq!(orphan.websearch.result, "");
        assert_eq!(orphan.kirha.score, 0);
        assert_eq!(orphan.kirha.tokens, 0);
        assert!(!orphan.kirha.scored);
        assert_eq!(orphan.winner, "tie");
    }

    #[test]
    fn test_scores_and_winner_labels() {
        let counter = TokenCounter::o200k().unwrap();
        let report = build_report(&sample_inputs(), &counter);

        let first = &report.results[0];
        assert_eq!(first.kirha.score, 70);
        assert_eq!(first.websearch.score, 40);
        assert_eq!(first.kirha.feedback, "fresh");
        assert_eq!(first.winner, "kirha");
        assert_eq!(first.vertical, "crypto");
        assert_eq!(first.last_run_date, "01-06-2025");

        let second = &report.results[1];
        assert_eq!(second.winner, "websearch");
        assert!(!second.kirha.scored);
        assert!(second.websearch.scored);
    }

    #[test]
    fn test_text_is_masked_but_tokens_use_raw() {
        let counter = TokenCounter::o200k().unwrap();
        let inputs = sample_inputs();
        let report = build_report(&inputs, &counter);

        let first = &report.results[0];
        assert!(first.websearch.raw_data.contains("+1 XXX-XXX-XXXX"));
        assert!(!first.websearch.raw_data.contains("415-555-1234"));
        assert_eq!(
            first.websearch.tokens,
            counter.count(&inputs.web_search[0].raw_data)
        );

        assert_eq!(report.results[1].kirha.result, "Contact: private@email.com");
    }

    #[test]
    fn test_summary() {
        let counter = TokenCounter::o200k().unwrap();
        let report = build_report(&sample_inputs(), &counter);
        let summary = &report.summary;

        assert_eq!(summary.total_tests, 3);
        // kirha relevance: (80 + 0 + 0) / 3 = 26.67
        assert_eq!(summary.categories.kirha.relevance, 27);
        // websearch relevance: (60 + 70 + 0) / 3 = 43.33
        assert_eq!(summary.categories.websearch.relevance, 43);
        assert_eq!(summary.kirha_score, summary.categories.kirha.score());
        assert_eq!(summary.chart_data.len(), 5);
        assert_eq!(summary.chart_data[0].category, "Relevance");
        assert_eq!(summary.chart_data[0].kirha, 27);
        assert_eq!(
            summary.wins,
            WinCounts {
                kirha: 1,
                websearch: 1,
                tie: 1
            }
        );
        assert_eq!(
            summary.kirha_tokens,
            report.results.iter().map(|r| r.kirha.tokens).sum::<usize>()
        );
    }

    #[test]
    fn test_empty_inputs() {
        let counter = TokenCounter::o200k().unwrap();
        let report = build_report(&BenchmarkInputs::default(), &counter);
        assert!(report.results.is_empty());
        assert_eq!(report.summary.total_tests, 0);
        assert_eq!(report.summary.kirha_score, 0);
        assert_eq!(report.summary.token_savings_percent, 0);
    }

    #[test]
    fn test_token_savings() {
        assert_eq!(token_savings_percent(0, 0), 0);
        assert_eq!(token_savings_percent(500, 0), 0);
        assert_eq!(token_savings_percent(250, 1000), 75);
        assert_eq!(token_savings_percent(0, 1000), 100);
        assert_eq!(token_savings_percent(1500, 1000), -50);
        // 1 - 1/3 = 66.67
        assert_eq!(token_savings_percent(1, 3), 67);
        // half rounds toward +inf: 1 - 1025/1000 = -2.5
        assert_eq!(token_savings_percent(1025, 1000), -2);
    }

    #[test]
    fn test_build_is_idempotent() {
        let counter = TokenCounter::o200k().unwrap();
        let inputs = sample_inputs();
        assert_eq!(build_report(&inputs, &counter), build_report(&inputs, &counter));
    }

    #[test]
    fn test_save_and_load_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("public").join("benchmark-results.json");

        let counter = TokenCounter::o200k().unwrap();
        let report = build_report(&sample_inputs(), &counter);
        save_report(&report, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"tokenSavingsPercent\""));
        assert!(content.contains("\"lastRunDate\": \"01-06-2025\""));
        assert!(content.contains("\"rawData\""));
        assert!(content.contains("\n  \"summary\""));

        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_load_missing_report() {
        assert!(matches!(
            load_report(Path::new("/nonexistent/benchmark-results.json")),
            Err(BenchError::ReportNotFound(_))
        ));
    }
}
