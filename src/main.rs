//! Search Benchmark CLI
//!
//! Collects provider results, judges them and builds the published report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use search_benchmark::{
    config::Config,
    judge::LlmJudge,
    llm::LlmClient,
    providers::{DataApiClient, SearchProvider, WebSearchClient},
    report::{BenchmarkInputs, build_report, save_report},
    retry::RetryPolicy,
    runner::{ProviderRunner, parse_target_ids, run_judge},
    summarizer::Summarizer,
    tokens::TokenCounter,
    view::{BenchmarkData, format_detail, format_page, format_summary},
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Search Benchmark - data API vs. web search, judged by an LLM
#[derive(Parser)]
#[command(name = "search-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    /// The domain data API (kirha)
    DataApi,
    /// Generic web search (exa)
    WebSearch,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the collected datasets into the report
    Build {
        /// Directory holding prompts.jsonl and results/
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Output path for the report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Collect one provider's results
    Run {
        /// Provider to query
        #[arg(value_enum)]
        provider: ProviderArg,

        /// Prompt ids to (re)run, e.g. "1-5,8"; all prompts when omitted
        ids: Option<String>,
    },

    /// Judge both providers' results
    Judge {
        /// Prompt ids to (re)judge, e.g. "1-5,8"; all results when omitted
        ids: Option<String>,
    },

    /// Display a built report
    Show {
        /// Path to the report file
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Page of the results table
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Only show results from this vertical
        #[arg(long)]
        vertical: Option<String>,

        /// Show a single result in detail
        #[arg(long)]
        id: Option<u32>,

        /// Output the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "search_benchmark=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { data_dir, output } => cmd_build(data_dir, output),
        Commands::Run { provider, ids } => cmd_run(provider, ids).await,
        Commands::Judge { ids } => cmd_judge(ids).await,
        Commands::Show {
            report,
            page,
            vertical,
            id,
            json,
        } => cmd_show(report, page, vertical, id, json),
        Commands::Test => cmd_test().await,
    }
}

fn targets(ids: Option<String>) -> Result<Option<HashSet<u32>>> {
    ids.map(|ids| parse_target_ids(&ids))
        .transpose()
        .context("Invalid id selection")
}

/// The o200k counter, or a Hugging Face tokenizer named by `BENCH_TOKENIZER`.
fn token_counter() -> Result<TokenCounter> {
    #[cfg(feature = "hf-tokenizer")]
    {
        if let Ok(path) = std::env::var("BENCH_TOKENIZER") {
            return TokenCounter::from_tokenizer_file(std::path::Path::new(&path))
                .context("Failed to load tokenizer file");
        }
    }

    TokenCounter::o200k().context("Failed to load tokenizer")
}

fn cmd_build(data_dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(data_dir) = data_dir {
        config.paths.data_dir = data_dir;
    }
    if let Some(output) = output {
        config.paths.output = output;
    }

    println!("Loading data...");
    let start = Instant::now();

    let inputs = BenchmarkInputs::load(&config.paths).context("Failed to load datasets")?;
    let counter = token_counter()?;

    let report = build_report(&inputs, &counter);
    save_report(&report, &config.paths.output).context("Failed to write report")?;

    let summary = &report.summary;
    println!("\nGenerated {}", config.paths.output.display());
    println!("  Total tests:     {}", summary.total_tests);
    println!("  Kirha score:     {}", summary.kirha_score);
    println!("  Websearch score: {}", summary.websearch_score);
    println!("  Kirha tokens:    {}", summary.kirha_tokens);
    println!("  Websearch tokens: {}", summary.websearch_tokens);
    println!("  Token savings:   {}%", summary.token_savings_percent);
    println!("  Tokenizer:       {}", counter.encoding());
    println!("  Build time:      {:.2?}", start.elapsed());

    Ok(())
}

async fn collect<P: SearchProvider>(
    provider: &P,
    config: &Config,
    targets: Option<&HashSet<u32>>,
) -> Result<()> {
    let client = LlmClient::new(config.llm.clone());
    let summarizer = Summarizer::new(&client);
    let retry = RetryPolicy::from_config(&config.retry);

    let report = ProviderRunner::new(provider, &summarizer, retry)
        .run(&config.paths, targets)
        .await
        .context("Provider run failed")?;

    println!(
        "\n{}: {} succeeded, {} failed",
        provider.kind().display_name(),
        report.succeeded,
        report.failed
    );
    println!("Results written to {}", report.output.display());
    Ok(())
}

async fn cmd_run(provider: ProviderArg, ids: Option<String>) -> Result<()> {
    let targets = targets(ids)?;
    let config = Config::load().context("Failed to load configuration")?;
    config.validate_llm().context("Invalid configuration")?;

    match provider {
        ProviderArg::DataApi => {
            config.validate_data_api().context("Invalid configuration")?;
            let client = DataApiClient::new(config.providers.data_api.clone());
            collect(&client, &config, targets.as_ref()).await
        }
        ProviderArg::WebSearch => {
            config.validate_web_search().context("Invalid configuration")?;
            let client = WebSearchClient::new(config.providers.web_search.clone());
            collect(&client, &config, targets.as_ref()).await
        }
    }
}

async fn cmd_judge(ids: Option<String>) -> Result<()> {
    let targets = targets(ids)?;
    let config = Config::load().context("Failed to load configuration")?;
    config.validate_llm().context("Invalid configuration")?;

    let client = LlmClient::new(config.llm.clone());
    println!("Using model: {}", client.model());

    let judge = LlmJudge::new(&client);
    let retry = RetryPolicy::from_config(&config.retry);

    let report = run_judge(&judge, &config.paths, &retry, targets.as_ref())
        .await
        .context("Judge run failed")?;

    report.print_summary();
    Ok(())
}

fn cmd_show(
    report_path: Option<PathBuf>,
    page: usize,
    vertical: Option<String>,
    id: Option<u32>,
    json: bool,
) -> Result<()> {
    let path = match report_path {
        Some(path) => path,
        None => Config::load().context("Failed to load configuration")?.paths.output,
    };

    let data = BenchmarkData::load(&path).context("Failed to load report")?;

    if json {
        let json_str = serde_json::to_string_pretty(data.summary())
            .context("Failed to serialize summary")?;
        println!("{}", json_str);
        return Ok(());
    }

    if let Some(id) = id {
        let result = data
            .get(id)
            .with_context(|| format!("No result with id {} in '{}'", id, path.display()))?;
        println!("{}", format_detail(result));
        return Ok(());
    }

    println!("{}", format_summary(data.summary()));

    if let Some(v) = &vertical {
        if data.filter(Some(v)).is_empty() {
            anyhow::bail!(
                "Unknown vertical '{}'. Available: {}",
                v,
                data.verticals().join(", ")
            );
        }
    }

    println!("{}", format_page(&data.page(page, vertical.as_deref())));
    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    let key_preview: String = config.llm.api_key.chars().take(8).collect();
    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!("  API Key:   {}...", key_preview);
    println!();

    if let Err(e) = config.validate_llm() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => println!("Connection successful!"),
        Err(e) => println!("Connection failed: {}", e),
    }

    Ok(())
}
