//! Read-only access to a published report.
//!
//! `BenchmarkData` is loaded once from the report file and handed to
//! whatever renders it. It never changes after loading.

use crate::error::Result;
use crate::report::{AggregatedResult, BenchmarkReport, SourceResult, Summary, load_report};
use crate::score::Category;
use std::collections::BTreeSet;
use std::path::Path;

/// Results shown per table page.
pub const PAGE_SIZE: usize = 10;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    /// 1-based page number, clamped to the available pages.
    pub number: usize,
    pub total_pages: usize,
    pub total_results: usize,
    pub results: Vec<&'a AggregatedResult>,
}

/// A loaded benchmark report.
#[derive(Debug, Clone)]
pub struct BenchmarkData {
    report: BenchmarkReport,
}

impl BenchmarkData {
    pub fn new(report: BenchmarkReport) -> Self {
        Self { report }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(load_report(path)?))
    }

    pub fn summary(&self) -> &Summary {
        &self.report.summary
    }

    pub fn results(&self) -> &[AggregatedResult] {
        &self.report.results
    }

    pub fn get(&self, id: u32) -> Option<&AggregatedResult> {
        self.report.results.iter().find(|r| r.id == id)
    }

    /// Distinct verticals, sorted.
    pub fn verticals(&self) -> Vec<&str> {
        self.report
            .results
            .iter()
            .map(|r| r.vertical.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Results in one vertical, or all results when `vertical` is `None`.
    pub fn filter(&self, vertical: Option<&str>) -> Vec<&AggregatedResult> {
        self.report
            .results
            .iter()
            .filter(|r| vertical.is_none_or(|v| r.vertical.eq_ignore_ascii_case(v)))
            .collect()
    }

    /// Page `number` (1-based) of the filtered results.
    pub fn page(&self, number: usize, vertical: Option<&str>) -> Page<'_> {
        let filtered = self.filter(vertical);
        let total_results = filtered.len();
        let total_pages = total_results.div_ceil(PAGE_SIZE).max(1);
        let number = number.clamp(1, total_pages);

        let results = filtered
            .into_iter()
            .skip((number - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect();

        Page {
            number,
            total_pages,
            total_results,
            results,
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Render the corpus summary.
pub fn format_summary(summary: &Summary) -> String {
    let mut out = String::from("Benchmark Summary\n");
    out.push_str(&"─".repeat(50));
    out.push('\n');

    out.push_str(&format!("  Tests:          {}\n", summary.total_tests));
    out.push_str(&format!(
        "  Score:          Kirha {} | Websearch {}\n",
        summary.kirha_score, summary.websearch_score
    ));
    out.push_str(&format!(
        "  Wins:           Kirha {} | Websearch {} | Tie {}\n",
        summary.wins.kirha, summary.wins.websearch, summary.wins.tie
    ));
    out.push_str(&format!(
        "  Tokens:         Kirha {} | Websearch {}\n",
        summary.kirha_tokens, summary.websearch_tokens
    ));
    out.push_str(&format!(
        "  Token savings:  {}%\n\n",
        summary.token_savings_percent
    ));

    out.push_str(&format!("  {:<16}{:>8}{:>12}\n", "Category", "Kirha", "Websearch"));
    for point in &summary.chart_data {
        out.push_str(&format!(
            "  {:<16}{:>8}{:>12}\n",
            point.category, point.kirha, point.websearch
        ));
    }

    out
}

/// Render one page as a table.
pub fn format_page(page: &Page<'_>) -> String {
    let mut out = format!(
        "{:>4}  {:<12}{:>6}{:>6}  {:<10}{}\n",
        "ID", "Vertical", "Kirha", "Web", "Winner", "Prompt"
    );
    out.push_str(&"─".repeat(80));
    out.push('\n');

    for r in &page.results {
        out.push_str(&format!(
            "{:>4}  {:<12}{:>6}{:>6}  {:<10}{}\n",
            r.id,
            truncate(&r.vertical, 11),
            r.kirha.score,
            r.websearch.score,
            r.winner,
            truncate(&r.prompt, 40)
        ));
    }

    out.push_str(&format!(
        "\nPage {}/{} ({} results)\n",
        page.number, page.total_pages, page.total_results
    ));
    out
}

fn format_source(name: &str, source: &SourceResult) -> String {
    let mut out = format!("{} (score {}, {} tokens)", name, source.score, source.tokens);
    if !source.scored {
        out.push_str(" [not scored]");
    }
    out.push('\n');

    for category in Category::ALL {
        out.push_str(&format!(
            "  {:<16}{:>4}\n",
            category.label(),
            source.categories.get(category)
        ));
    }

    if let Some(error) = &source.error {
        out.push_str(&format!("  Error: {}\n", error));
    }
    if !source.feedback.is_empty() {
        out.push_str(&format!("  Feedback: {}\n", source.feedback));
    }
    if !source.result.is_empty() {
        out.push_str("  Result:\n");
        for line in source.result.lines() {
            out.push_str(&format!("    {}\n", line));
        }
    }
    out
}

/// Render a single result with both providers' scores and answers.
pub fn format_detail(result: &AggregatedResult) -> String {
    let mut out = format!("#{} [{}] {}\n", result.id, result.vertical, result.prompt);
    out.push_str(&"─".repeat(60));
    out.push('\n');
    out.push_str(&format!(
        "Winner: {}    Last run: {}\n\n",
        result.winner, result.last_run_date
    ));
    out.push_str(&format_source("Kirha", &result.kirha));
    out.push('\n');
    out.push_str(&format_source("Websearch", &result.websearch));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::save_report;
    use crate::score::CategoryScores;
    use tempfile::TempDir;

    fn source(score: u32) -> SourceResult {
        let categories = CategoryScores::new(score, score, score, score, score);
        SourceResult {
            categories,
            score: categories.score(),
            feedback: String::new(),
            result: "answer".to_string(),
            raw_data: "[]".to_string(),
            tokens: 1,
            scored: true,
            error: None,
        }
    }

    fn result(id: u32, vertical: &str) -> AggregatedResult {
        AggregatedResult {
            id,
            prompt: format!("prompt {}", id),
            vertical: vertical.to_string(),
            winner: "kirha".to_string(),
            last_run_date: "01-06-2025".to_string(),
            kirha: source(80),
            websearch: source(40),
        }
    }

    fn data(n: u32) -> BenchmarkData {
        let results: Vec<_> = (1..=n)
            .map(|id| result(id, if id % 2 == 0 { "crypto" } else { "finance" }))
            .collect();
        let summary = Summary::from_results(&results);
        BenchmarkData::new(BenchmarkReport { results, summary })
    }

    #[test]
    fn test_pagination() {
        let data = data(23);

        let first = data.page(1, None);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.results.len(), 10);
        assert_eq!(first.results[0].id, 1);

        let last = data.page(3, None);
        assert_eq!(last.results.len(), 3);
        assert_eq!(last.results[0].id, 21);

        assert_eq!(data.page(99, None).number, 3);
        assert_eq!(data.page(0, None).number, 1);
    }

    #[test]
    fn test_empty_report_has_one_page() {
        let data = data(0);
        let page = data.page(1, None);
        assert_eq!(page.total_pages, 1);
        assert!(page.results.is_empty());
        assert_eq!(data.summary().kirha_score, 0);
    }

    #[test]
    fn test_vertical_filter() {
        let data = data(5);
        assert_eq!(data.verticals(), vec!["crypto", "finance"]);

        let crypto = data.filter(Some("Crypto"));
        assert_eq!(crypto.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 4]);
        assert!(data.filter(Some("weather")).is_empty());

        let page = data.page(1, Some("finance"));
        assert_eq!(page.total_results, 3);
    }

    #[test]
    fn test_get_by_id() {
        let data = data(3);
        assert_eq!(data.get(2).map(|r| r.prompt.as_str()), Some("prompt 2"));
        assert!(data.get(7).is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let original = data(4);
        save_report(&original.report, &path).unwrap();

        let loaded = BenchmarkData::load(&path).unwrap();
        assert_eq!(loaded.results().len(), 4);
        assert_eq!(loaded.summary(), original.summary());
    }

    #[test]
    fn test_format_detail() {
        let mut r = result(9, "crypto");
        r.websearch.scored = false;
        r.websearch.error = Some("timeout".to_string());

        let text = format_detail(&r);
        assert!(text.starts_with("#9 [crypto] prompt 9"));
        assert!(text.contains("Kirha (score 80, 1 tokens)"));
        assert!(text.contains("[not scored]"));
        assert!(text.contains("Error: timeout"));
    }

    #[test]
    fn test_format_page_and_summary() {
        let data = data(12);
        let table = format_page(&data.page(2, None));
        assert!(table.contains("Page 2/2 (12 results)"));
        assert!(table.contains("prompt 11"));

        let summary = format_summary(data.summary());
        assert!(summary.contains("Tests:          12"));
        assert!(summary.contains("Relevance"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer prompt", 10), "a much ...");
    }
}
