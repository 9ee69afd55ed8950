//! CLI subcommand handlers and the research runner.

use crate::{Commands, ConfigAction};
use anyhow::Context;
use quarry_core::config::{QuarryConfig, to_toml_string};
use quarry_core::research::{Report, ResearchCallback, ResearchEngine, ResearchPhase};
use quarry_core::search::{SearchExecutor, SearchResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, config: &QuarryConfig) -> anyhow::Result<()> {
    match command {
        Commands::Search {
            query,
            academic,
            comprehensive,
            max_results,
        } => handle_search(&query, academic, comprehensive, max_results, config).await,
        Commands::FactCheck { claim } => handle_fact_check(&claim, config).await,
        Commands::Fetch { url } => handle_fetch(&url, config).await,
        Commands::Config { action } => handle_config(action, config),
    }
}

/// Prints phase changes to stderr.
struct ProgressCallback;

impl ResearchCallback for ProgressCallback {
    fn on_phase_change(&self, phase: ResearchPhase, progress: f64) {
        eprintln!("[{:>3.0}%] {}", progress * 100.0, phase);
    }
}

/// Run one research request, save the report, and print it.
pub async fn run_research(query: &str, config: &QuarryConfig, quiet: bool) -> anyhow::Result<()> {
    let mut engine =
        ResearchEngine::from_config(config).context("Failed to set up research engine")?;
    if !quiet {
        engine = engine.with_callback(Arc::new(ProgressCallback));
    }

    let report = engine.conduct_research(query).await;
    let path = write_report(&config.output.dir, &report)?;

    println!("{}", report.without_images());

    let charts: Vec<_> = report
        .image_references()
        .into_iter()
        .filter(|image| image.path.exists())
        .collect();
    if !charts.is_empty() {
        println!("\nCharts:");
        for chart in charts {
            println!("  {}: {}", chart.alt, chart.path.display());
        }
    }
    if report.is_llm_generated() {
        eprintln!("\nNote: this answer is LLM-generated, not based on external research.");
    }
    eprintln!("Report saved to {}", path.display());
    Ok(())
}

/// Write `research_report_<timestamp>.md` into `dir`.
fn write_report(dir: &Path, report: &Report) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let name = format!(
        "research_report_{}.md",
        report.generated_at.format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(name);
    std::fs::write(&path, &report.content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    tracing::info!(path = %path.display(), kind = ?report.kind, "Report written");
    Ok(path)
}

async fn handle_search(
    query: &str,
    academic: bool,
    comprehensive: bool,
    max_results: usize,
    config: &QuarryConfig,
) -> anyhow::Result<()> {
    let executor = SearchExecutor::from_config(&config.search)?;
    let results = if comprehensive {
        executor.comprehensive_search(query).await
    } else if academic {
        executor.academic_search(query, max_results).await
    } else {
        executor.search(query, max_results).await
    };

    if results.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }
    print!("{}", format_results(&results));
    Ok(())
}

fn format_results(results: &[SearchResult]) -> String {
    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!("{}. {} [{}]\n", i + 1, r.title, r.source_tag));
        if !r.url.is_empty() {
            out.push_str(&format!("   {}\n", r.url));
        }
        if r.has_snippet() {
            out.push_str(&format!("   {}\n", r.snippet));
        }
        out.push('\n');
    }
    out
}

async fn handle_fact_check(claim: &str, config: &QuarryConfig) -> anyhow::Result<()> {
    let executor = SearchExecutor::from_config(&config.search)?;
    let check = executor.fact_check(claim).await;

    println!("Claim: {}", check.claim);
    println!("Source: {} [{}]", check.title, check.source_tag);
    if !check.url.is_empty() {
        println!("URL: {}", check.url);
    }
    if let Some(confidence) = check.confidence {
        println!("Keyword overlap: {:.0}%", confidence * 100.0);
    }
    println!("\n{}", check.snippet);
    Ok(())
}

async fn handle_fetch(url: &str, config: &QuarryConfig) -> anyhow::Result<()> {
    let executor = SearchExecutor::from_config(&config.search)?;
    match executor.fetch_content(url).await {
        Some(text) => {
            println!("{}", text);
            Ok(())
        }
        None => anyhow::bail!("Could not fetch content from {}", url),
    }
}

fn handle_config(action: ConfigAction, config: &QuarryConfig) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", to_toml_string(config)?);
            Ok(())
        }
    }
}
