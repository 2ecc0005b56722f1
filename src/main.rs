mod cache;
mod crawler;
mod error;
mod fetch;
mod gedcom;
mod inhibit;
mod model;
mod parser;
mod pipeline;
mod reference;
mod settings;
mod store;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use crate::cache::PageCache;
use crate::crawler::CrawlOptions;
use crate::fetch::HttpFetcher;
use crate::pipeline::RunOptions;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "genea_scraper", about = "Crawl an online family tree into a GEDCOM file")]
struct Cli {
    /// Follow parents
    #[arg(short, long)]
    ascendants: bool,
    /// Follow children
    #[arg(short, long)]
    descendants: bool,
    /// Follow spouses
    #[arg(short, long)]
    spouses: bool,
    /// Maximum number of links followed from a seed
    #[arg(short, long, default_value = "0")]
    level: u32,
    /// Re-download pages even when cached
    #[arg(short, long)]
    force: bool,
    /// Output file (default: <userid>.ged)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Skip the structural check of the written file
    #[arg(long)]
    no_validate: bool,
    /// Do not hold off screen lock and sleep during the crawl
    #[arg(long)]
    no_inhibit: bool,
    /// Person page URLs to start from
    #[arg(required = true)]
    seeds: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let settings = Settings::load()?;
    let cache = PageCache::open(&settings.cache_path)?;
    let fetcher = HttpFetcher::new(&settings, Some(cache))?;

    let options = RunOptions {
        crawl: CrawlOptions {
            max_levels: cli.level,
            ascendants: cli.ascendants,
            spouses: cli.spouses,
            descendants: cli.descendants,
            force: cli.force,
        },
        output: cli.output,
        validate: !cli.no_validate,
        inhibit: !cli.no_inhibit,
        progress: true,
    };

    let summary = pipeline::run(&fetcher, &cli.seeds, &options).await?;

    println!(
        "Saved {} persons and {} families to {} ({} failed fetches).",
        summary.crawl.visited,
        summary.crawl.families,
        summary.output.display(),
        summary.crawl.failed
    );
    if let Some(report) = &summary.report {
        let verdict = if report.is_ok() { "valid" } else { "INVALID" };
        println!("GEDCOM {}: {}", verdict, report.message);
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
