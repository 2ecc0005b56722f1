use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::crawler::{CrawlOptions, CrawlStats, Crawler};
use crate::fetch::PageFetcher;
use crate::gedcom::{self, Report};
use crate::inhibit::InhibitGuard;
use crate::reference::{self, Reference};

pub struct RunOptions {
    pub crawl: CrawlOptions,
    /// Defaults to `<userid>.ged` of the first seed.
    pub output: Option<PathBuf>,
    pub validate: bool,
    pub inhibit: bool,
    pub progress: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub output: PathBuf,
    pub crawl: CrawlStats,
    pub report: Option<Report>,
    pub elapsed: Duration,
}

/// Crawl from `seeds`, write the GEDCOM file, and check it.
pub async fn run<F: PageFetcher>(
    fetcher: &F,
    seeds: &[String],
    options: &RunOptions,
) -> Result<RunSummary> {
    let t0 = Instant::now();

    let seeds = seeds
        .iter()
        .map(|s| reference::canonicalize(s))
        .collect::<Result<Vec<Reference>, _>>()?;
    let Some(first) = seeds.first() else {
        bail!("no seed URL given");
    };
    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output(first));

    let _inhibit = options
        .inhibit
        .then(|| InhibitGuard::acquire("crawling a family tree"))
        .flatten();

    let mut crawler = Crawler::new(fetcher, options.crawl);
    if options.progress {
        crawler = crawler.with_progress();
    }
    let crawl = crawler.crawl(&seeds).await;

    let base = reference::tree_base(&first.url);
    let info = match fetcher.informations(&base, options.crawl.force).await {
        Ok(info) => Some(info),
        Err(e) => {
            warn!("No tree information: {}", e);
            None
        }
    };

    let (persons, families) = crawler.into_stores();
    if persons.is_empty() {
        warn!("No person could be scraped; writing an empty tree");
    }
    let text = gedcom::emit(&persons, &families, info.as_ref());
    write_atomic(&output, &text)?;
    info!(
        "Wrote {} ({} persons, {} families)",
        output.display(),
        persons.len(),
        families.len()
    );

    let report = if options.validate {
        let report = gedcom::validate_file(&output)?;
        if report.is_ok() {
            info!("GEDCOM valid: {}", report.message);
        } else {
            warn!("GEDCOM invalid: {}", report.message);
        }
        Some(report)
    } else {
        None
    };

    Ok(RunSummary {
        output,
        crawl,
        report,
        elapsed: t0.elapsed(),
    })
}

fn default_output(seed: &Reference) -> PathBuf {
    let userid = reference::userid(&seed.url);
    let stem = if userid.is_empty() { "tree" } else { userid };
    PathBuf::from(format!("{}.ged", stem.replace('/', "_")))
}

/// Create or replace `path` without ever leaving a half-written file behind.
fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, text).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

// ── Tests ──
