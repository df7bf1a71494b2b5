//! Collection and judging runs.
//!
//! Runs are sequential: one prompt at a time, each remote call wrapped in
//! the retry policy. A prompt that still fails becomes a `Failed` outcome
//! and the run moves on. When a run targets specific ids, its results are
//! merged into the existing dataset instead of replacing it.

use crate::config::PathsConfig;
use crate::error::{BenchError, Result};
use crate::judge::{Evaluate, format_run_date};
use crate::records::{
    JudgeRecord, Prompt, ProviderResult, index_by_id, load_jsonl, load_jsonl_or_empty,
    merge_by_id, select_ids, write_jsonl,
};
use crate::providers::SearchProvider;
use crate::retry::RetryPolicy;
use crate::score::{JudgeScore, Winner};
use crate::summarizer::Summarize;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use tracing::{error, info};

/// Parse an id selection such as `"1-5,8,10"`.
pub fn parse_target_ids(arg: &str) -> Result<HashSet<u32>> {
    let invalid = || BenchError::InvalidIds(arg.to_string());
    let mut ids = HashSet::new();

    for part in arg.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start.trim().parse().map_err(|_| invalid())?;
            let end: u32 = end.trim().parse().map_err(|_| invalid())?;
            if start > end {
                return Err(invalid());
            }
            ids.extend(start..=end);
        } else {
            ids.insert(part.parse().map_err(|_| invalid())?);
        }
    }

    if ids.is_empty() {
        return Err(invalid());
    }
    Ok(ids)
}

/// Result of processing one item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<T> {
    Success(T),
    Failed { id: u32, error: String },
}

impl<T> ItemOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success(_))
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub succeeded: usize,
    pub failed: usize,
    pub output: PathBuf,
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

/// Collects one provider's results for a set of prompts.
pub struct ProviderRunner<'a, P: SearchProvider, S: Summarize> {
    provider: &'a P,
    summarizer: &'a S,
    retry: RetryPolicy,
}

impl<'a, P: SearchProvider, S: Summarize> ProviderRunner<'a, P, S> {
    pub fn new(provider: &'a P, summarizer: &'a S, retry: RetryPolicy) -> Self {
        Self {
            provider,
            summarizer,
            retry,
        }
    }

    /// Search and summarize a single prompt.
    pub async fn collect_one(&self, prompt: &Prompt) -> ItemOutcome<ProviderResult> {
        let name = self.provider.kind().display_name();
        info!("Processing prompt {}: {}...", prompt.id, preview(&prompt.prompt));

        let raw = match self
            .retry
            .run(name, || self.provider.search(prompt))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                error!(id = prompt.id, error = %e, "{} search failed", name);
                return ItemOutcome::Failed {
                    id: prompt.id,
                    error: e.to_string(),
                };
            }
        };

        info!("  Got {} chars, summarizing...", raw.len());

        match self
            .retry
            .run("summarizer", || self.summarizer.summarize(&prompt.prompt, &raw))
            .await
        {
            Ok(summary) => {
                info!("  Summary complete");
                ItemOutcome::Success(ProviderResult::success(prompt, raw, summary))
            }
            Err(e) => {
                error!(id = prompt.id, error = %e, "summarization failed");
                ItemOutcome::Failed {
                    id: prompt.id,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Process prompts in order, one at a time.
    pub async fn collect(&self, prompts: &[Prompt]) -> Vec<ItemOutcome<ProviderResult>> {
        let mut outcomes = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            outcomes.push(self.collect_one(prompt).await);
        }
        outcomes
    }

    /// Collect results for the selected prompts and write the provider's dataset.
    pub async fn run(
        &self,
        paths: &PathsConfig,
        targets: Option<&HashSet<u32>>,
    ) -> Result<RunReport> {
        let prompts = select_ids(load_jsonl::<Prompt>(&paths.prompts())?, targets);
        let by_id = index_by_id(&prompts);

        if let Some(ids) = targets {
            let mut sorted: Vec<_> = ids.iter().copied().collect();
            sorted.sort_unstable();
            info!(
                "Running {} for IDs: {:?}",
                self.provider.kind().display_name(),
                sorted
            );
        }

        let outcomes = self.collect(&prompts).await;
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;

        let records: Vec<ProviderResult> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                ItemOutcome::Success(record) => Some(record),
                ItemOutcome::Failed { id, error } => by_id
                    .get(&id)
                    .map(|prompt| ProviderResult::failure(prompt, error)),
            })
            .collect();

        let output = self.provider.kind().results_path(paths);
        let existing = match targets {
            Some(ids) if !ids.is_empty() => load_jsonl_or_empty(&output)?,
            _ => Vec::new(),
        };
        write_jsonl(&output, &merge_by_id(existing, records))?;

        info!("Results written to {}", output.display());

        Ok(RunReport {
            succeeded,
            failed,
            output,
        })
    }
}

/// Tally of a judging run over the selected ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JudgeReport {
    pub judged: usize,
    pub failed: usize,
    pub exa_wins: usize,
    pub kirha_wins: usize,
    pub ties: usize,
    /// Mean category total (0-500) over the summarized records.
    pub avg_exa_total: f64,
    pub avg_kirha_total: f64,
    pub output: PathBuf,
}

impl JudgeReport {
    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== SUMMARY ===");
        println!("Judged: {} ({} failed)", self.judged, self.failed);
        println!("Exa wins: {}", self.exa_wins);
        println!("Kirha wins: {}", self.kirha_wins);
        println!("Ties: {}", self.ties);
        println!("Avg Exa score: {:.1}/500", self.avg_exa_total);
        println!("Avg Kirha score: {:.1}/500", self.avg_kirha_total);
        println!("\nResults written to {}", self.output.display());
    }
}

/// Answer text shown to the judge for one side.
fn judged_text(result: Option<&ProviderResult>) -> String {
    match result {
        Some(r) => match &r.error {
            Some(error) => format!("No data returned: {}", error),
            None => r.result.clone(),
        },
        None => String::new(),
    }
}

/// Judge both providers' results and update the judge dataset.
///
/// Without targets, every id present in either provider's results is
/// judged. An id whose judging fails keeps its previous record.
pub async fn run_judge<J: Evaluate>(
    judge: &J,
    paths: &PathsConfig,
    retry: &RetryPolicy,
    targets: Option<&HashSet<u32>>,
) -> Result<JudgeReport> {
    info!("Loading results...");

    let exa_results: Vec<ProviderResult> = load_jsonl_or_empty(&paths.web_search_results())?;
    let kirha_results: Vec<ProviderResult> = load_jsonl_or_empty(&paths.data_api_results())?;
    let existing: Vec<JudgeRecord> = load_jsonl_or_empty(&paths.judge_results())?;

    let exa = index_by_id(&exa_results);
    let kirha = index_by_id(&kirha_results);

    let ids: BTreeSet<u32> = match targets {
        Some(ids) if !ids.is_empty() => {
            info!("Running Judge for IDs: {:?}", ids.iter().collect::<BTreeSet<_>>());
            ids.iter().copied().collect()
        }
        _ => exa.keys().chain(kirha.keys()).copied().collect(),
    };

    let today = format_run_date(chrono::Local::now().date_naive());
    let mut updates = Vec::new();
    let mut failed = 0;

    for id in ids.iter().copied() {
        let exa_result = exa.get(&id).copied();
        let kirha_result = kirha.get(&id).copied();

        if exa_result.is_none() && kirha_result.is_none() {
            continue;
        }

        let prompt = exa_result
            .or(kirha_result)
            .map(|r| r.prompt.clone())
            .unwrap_or_default();

        info!("Judging prompt {}: {}...", id, preview(&prompt));

        let websearch_text = judged_text(exa_result);
        let kirha_text = judged_text(kirha_result);

        match retry
            .run("judge", || judge.evaluate(&prompt, &websearch_text, &kirha_text))
            .await
        {
            Ok(verdict) => {
                info!(
                    "  Exa: {}/500 | Kirha: {}/500 | Winner: {}",
                    verdict.exa.categories.total(),
                    verdict.kirha.categories.total(),
                    verdict.winner.report_label()
                );
                updates.push(JudgeRecord {
                    id,
                    prompt,
                    exa: Some(verdict.exa),
                    kirha: Some(verdict.kirha),
                    winner: verdict.winner,
                    last_run_date: today.clone(),
                });
            }
            Err(e) => {
                failed += 1;
                error!(id, error = %e, "judging failed");
            }
        }
    }

    let judged = updates.len();
    let records = merge_by_id(existing, updates);
    let output = paths.judge_results();
    write_jsonl(&output, &records)?;

    let summarized: Vec<&JudgeRecord> = match targets {
        Some(t) if !t.is_empty() => records.iter().filter(|r| t.contains(&r.id)).collect(),
        _ => records.iter().collect(),
    };

    let mut report = JudgeReport {
        judged,
        failed,
        output,
        ..Default::default()
    };

    for record in &summarized {
        match record.winner {
            Winner::WebSearch => report.exa_wins += 1,
            Winner::DataApi => report.kirha_wins += 1,
            Winner::Tie => report.ties += 1,
        }
    }

    if !summarized.is_empty() {
        let n = summarized.len() as f64;
        let total = |s: &Option<JudgeScore>| {
            s.as_ref().map(|s| s.categories.total()).unwrap_or(0) as f64
        };
        report.avg_exa_total = summarized.iter().map(|r| total(&r.exa)).sum::<f64>() / n;
        report.avg_kirha_total = summarized.iter().map(|r| total(&r.kirha)).sum::<f64>() / n;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::Verdict;
    use crate::providers::ProviderKind;
    use crate::score::CategoryScores;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeProvider {
        fail_ids: HashSet<u32>,
        calls: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl SearchProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::WebSearch
        }

        async fn search(&self, prompt: &Prompt) -> Result<String> {
            self.calls.lock().unwrap().push(prompt.id);
            if self.fail_ids.contains(&prompt.id) {
                return Err(BenchError::ProviderApi {
                    provider: "Exa",
                    status: 400,
                    body: "bad query".to_string(),
                });
            }
            Ok(format!("[{{\"id\":\"{}\"}}]", prompt.id))
        }
    }

    struct EchoSummarizer;

    #[async_trait]
    impl Summarize for EchoSummarizer {
        async fn summarize(&self, query: &str, raw: &str) -> Result<String> {
            Ok(format!("{} => {}", query, raw))
        }
    }

    struct FixedJudge {
        fail_ids: HashSet<String>,
    }

    #[async_trait]
    impl Evaluate for FixedJudge {
        async fn evaluate(&self, query: &str, _websearch: &str, kirha: &str) -> Result<Verdict> {
            if self.fail_ids.contains(query) {
                return Err(BenchError::LlmParse("garbage".to_string()));
            }
            let kirha_score = if kirha.is_empty() { 10 } else { 90 };
            Ok(Verdict {
                exa: JudgeScore {
                    categories: CategoryScores::new(50, 50, 50, 50, 50),
                    feedback: "web".to_string(),
                },
                kirha: JudgeScore {
                    categories: CategoryScores::new(kirha_score, kirha_score, kirha_score, kirha_score, kirha_score),
                    feedback: "api".to_string(),
                },
                winner: if kirha.is_empty() {
                    Winner::WebSearch
                } else {
                    Winner::DataApi
                },
            })
        }
    }

    fn setup() -> (TempDir, PathsConfig) {
        let dir = TempDir::new().unwrap();
        let paths = PathsConfig {
            data_dir: dir.path().to_path_buf(),
            output: dir.path().join("out.json"),
        };
        let prompts: Vec<Prompt> = (1..=4)
            .map(|id| Prompt {
                id,
                prompt: format!("question {}", id),
                vertical: "crypto".to_string(),
            })
            .collect();
        write_jsonl(&paths.prompts(), &prompts).unwrap();
        (dir, paths)
    }

    #[test]
    fn test_parse_target_ids() {
        let ids = parse_target_ids("1-3, 7").unwrap();
        let mut sorted: Vec<_> = ids.into_iter().collect();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3, 7]);

        assert_eq!(parse_target_ids("5").unwrap().len(), 1);
        assert_eq!(parse_target_ids("2,2,2-3").unwrap().len(), 2);
    }

    #[test]
    fn test_parse_target_ids_invalid() {
        for bad in ["", "a", "3-1", "1-", "1,x", ","] {
            assert!(
                matches!(parse_target_ids(bad), Err(BenchError::InvalidIds(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_failed_item_does_not_stop_run() {
        let (_dir, paths) = setup();
        let provider = FakeProvider {
            fail_ids: [2].into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        };
        let runner = ProviderRunner::new(&provider, &EchoSummarizer, RetryPolicy::none());

        let report = runner.run(&paths, None).await.unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(*provider.calls.lock().unwrap(), vec![1, 2, 3, 4]);

        let written: Vec<ProviderResult> = load_jsonl(&paths.web_search_results()).unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(written[0].result, "question 1 => [{\"id\":\"1\"}]");
        assert!(written[1].is_failure());
        assert_eq!(written[1].raw_data, "");
        assert!(written[1].error.as_deref().unwrap().contains("bad query"));
    }

    #[tokio::test]
    async fn test_targeted_run_merges() {
        let (_dir, paths) = setup();
        let provider = FakeProvider {
            fail_ids: [3].into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        };
        let runner = ProviderRunner::new(&provider, &EchoSummarizer, RetryPolicy::none());
        runner.run(&paths, None).await.unwrap();

        let healthy = FakeProvider {
            fail_ids: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        };
        let rerun = ProviderRunner::new(&healthy, &EchoSummarizer, RetryPolicy::none());
        let targets = parse_target_ids("3").unwrap();
        let report = rerun.run(&paths, Some(&targets)).await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(*healthy.calls.lock().unwrap(), vec![3]);

        let written: Vec<ProviderResult> = load_jsonl(&paths.web_search_results()).unwrap();
        let ids: Vec<u32> = written.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(written.iter().all(|r| !r.is_failure()));
    }

    #[tokio::test]
    async fn test_run_judge() {
        let (_dir, paths) = setup();
        let provider = FakeProvider {
            fail_ids: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        };
        ProviderRunner::new(&provider, &EchoSummarizer, RetryPolicy::none())
            .run(&paths, None)
            .await
            .unwrap();

        // Data API only answered prompt 1
        let kirha = vec![ProviderResult {
            id: 1,
            prompt: "question 1".to_string(),
            raw_data: "[]".to_string(),
            result: "api answer".to_string(),
            error: None,
        }];
        write_jsonl(&paths.data_api_results(), &kirha).unwrap();

        let judge = FixedJudge {
            fail_ids: ["question 4".to_string()].into_iter().collect(),
        };
        let report = run_judge(&judge, &paths, &RetryPolicy::none(), None)
            .await
            .unwrap();

        assert_eq!(report.judged, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.kirha_wins, 1);
        assert_eq!(report.exa_wins, 2);
        assert!((report.avg_exa_total - 250.0).abs() < 1e-9);

        let records: Vec<JudgeRecord> = load_jsonl(&paths.judge_results()).unwrap();
        let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(records[0].winner, Winner::DataApi);
        assert_eq!(records[0].last_run_date.len(), 10);

        let content = fs::read_to_string(paths.judge_results()).unwrap();
        assert!(content.contains("\"winner\":\"exa\""));
    }

    #[tokio::test]
    async fn test_failed_judging_keeps_previous_record() {
        let (_dir, paths) = setup();
        let previous = JudgeRecord {
            id: 2,
            prompt: "question 2".to_string(),
            exa: None,
            kirha: None,
            winner: Winner::Tie,
            last_run_date: "01-01-2025".to_string(),
        };
        write_jsonl(&paths.judge_results(), &[previous.clone()]).unwrap();

        let exa = vec![ProviderResult {
            id: 2,
            prompt: "question 2".to_string(),
            raw_data: String::new(),
            result: String::new(),
            error: Some("timeout".to_string()),
        }];
        write_jsonl(&paths.web_search_results(), &exa).unwrap();

        let judge = FixedJudge {
            fail_ids: ["question 2".to_string()].into_iter().collect(),
        };
        let targets = parse_target_ids("2").unwrap();
        let report = run_judge(&judge, &paths, &RetryPolicy::none(), Some(&targets))
            .await
            .unwrap();

        assert_eq!(report.judged, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.ties, 1);

        let records: Vec<JudgeRecord> = load_jsonl(&paths.judge_results()).unwrap();
        assert_eq!(records, vec![previous]);
    }

    #[test]
    fn test_judged_text() {
        assert_eq!(judged_text(None), "");
        let failed = ProviderResult {
            id: 1,
            prompt: "q".to_string(),
            raw_data: String::new(),
            result: String::new(),
            error: Some("HTTP request failed".to_string()),
        };
        assert_eq!(
            judged_text(Some(&failed)),
            "No data returned: HTTP request failed"
        );
    }
}
