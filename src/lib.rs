//! Search Benchmark - compares a domain data API with generic web search.
//!
//! Each benchmark prompt is sent to both providers, their raw output is
//! summarized by an LLM, and an LLM judge scores both answers on five
//! categories. The aggregation pipeline then joins the datasets into a
//! single static report.
//!
//! # Quick Start
//!
//! ```no_run
//! use search_benchmark::{
//!     config::Config,
//!     report::{BenchmarkInputs, build_report, save_report},
//!     tokens::TokenCounter,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!
//!     let inputs = BenchmarkInputs::load(&config.paths)?;
//!     let counter = TokenCounter::o200k()?;
//!     let report = build_report(&inputs, &counter);
//!
//!     save_report(&report, &config.paths.output)?;
//!     println!("{} tests", report.summary.total_tests);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **records**: JSON-lines datasets keyed by prompt id
//! - **providers**: HTTP clients for the data API and web search
//! - **summarizer** / **judge**: LLM steps on top of `LlmClient`
//! - **runner**: sequential collection and judging runs with retries
//! - **report**: joins, masks, counts tokens and summarizes
//! - **view**: read-only access to a published report

pub mod config;
pub mod error;
pub mod judge;
pub mod llm;
pub mod mask;
pub mod providers;
pub mod records;
pub mod report;
pub mod retry;
pub mod runner;
pub mod score;
pub mod summarizer;
pub mod tokens;
pub mod view;

pub use config::Config;
pub use error::{BenchError, Result};
pub use llm::LlmClient;
pub use report::{BenchmarkReport, build_report, load_report, save_report};
pub use view::BenchmarkData;
