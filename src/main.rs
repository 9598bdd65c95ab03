//! scholarfolio - Academic portfolio data pipeline
//!
//! Loads Google Scholar metrics and articles, joins them with the ORCID works
//! list and prints what the portfolio page renders.
//!
//! ## Usage
//!
//! ```bash
//! SERPAPI_KEY=... scholarfolio publications --year 2021 --query maize
//! scholarfolio chart
//! scholarfolio snapshot --output ./fallback.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scholarfolio::aggregate::ChartSeries;
use scholarfolio::config::Config;
use scholarfolio::error::SectionError;
use scholarfolio::fetcher::HttpTransport;
use scholarfolio::merge::MergedPublication;
use scholarfolio::orcid::OrcidSource;
use scholarfolio::pipeline::{DataOrigin, Portfolio, PortfolioLoader};
use scholarfolio::scholar::{Metric, ScholarSource};
use scholarfolio::snapshot::{Snapshot, SnapshotStore, DEFAULT_TTL_HOURS};
use scholarfolio::view::{PageMode, PublicationView};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Academic portfolio data pipeline (Google Scholar + ORCID)
#[derive(Parser)]
#[command(name = "scholarfolio")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Search API key used for Google Scholar requests
    #[arg(long, env = "SERPAPI_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Google Scholar author id
    #[arg(long, global = true)]
    author_id: Option<String>,

    /// ORCID iD
    #[arg(long, global = true)]
    orcid_id: Option<String>,

    /// CORS proxy prefix (target URL is appended percent-encoded)
    #[arg(long, global = true)]
    cors_proxy: Option<String>,

    /// Snapshot file used as cache and fallback
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Hours a snapshot is served without refetching
    #[arg(long, default_value_t = DEFAULT_TTL_HOURS, global = true)]
    cache_ttl_hours: i64,

    /// Always fetch live and never read or write the snapshot
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List merged publications, most cited first
    Publications {
        /// Text filter over title, journal, year and DOI
        #[arg(short, long)]
        query: Option<String>,

        /// Only publications from this year
        #[arg(short, long)]
        year: Option<i32>,

        /// Show every match instead of the short list
        #[arg(long)]
        all: bool,

        /// Press "show more" this many times
        #[arg(long, default_value = "0")]
        more: usize,

        /// Also write the visible publications to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print the per-year citation/publication series
    Chart,

    /// Print the Scholar profile metrics
    Profile,

    /// Fetch live and write the snapshot file
    Snapshot {
        /// Output path (defaults to the cache path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write even if the profile failed or pagination was interrupted
        #[arg(long)]
        force: bool,
    },

    /// Manage the snapshot cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete the snapshot file
    Clear,
    /// Show snapshot file path
    Path,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let config = build_config(&cli);

    match &cli.command {
        Commands::Publications {
            query,
            year,
            all,
            more,
            csv,
        } => {
            let portfolio = build_loader(&cli, config)?.load().await;
            report_origin(&portfolio);
            let publications = match portfolio.publications {
                Ok(p) => p,
                Err(e) => {
                    println!("{}", e.user_message());
                    return Ok(());
                }
            };

            let mode = if *all { PageMode::All } else { PageMode::default() };
            let mut view = PublicationView::new(publications, mode);
            if let Some(y) = year {
                view.toggle_year(*y);
            }
            if let Some(q) = query {
                view.set_query(q);
            }
            for _ in 0..*more {
                view.show_more();
            }

            let page = view.visible();
            if page.total == 0 {
                println!("No publications match the current filters.");
            }
            for (i, p) in page.items.iter().enumerate() {
                print_publication(i + 1, p);
            }
            println!("\nShowing {} of {}", page.shown, page.total);
            if page.has_more {
                println!("(use --more or --all to see the rest)");
            }

            if let Some(path) = csv {
                let rows: Vec<PublicationRow> = page.items.iter().map(|p| PublicationRow::from(*p)).collect();
                save_csv(path, &rows)?;
            }
        }

        Commands::Chart => {
            let portfolio = build_loader(&cli, config)?.load().await;
            report_origin(&portfolio);
            match &portfolio.years {
                Ok(buckets) => {
                    let series = ChartSeries::from_buckets(buckets);
                    if series.is_empty() {
                        println!("No citation or publication data.");
                        return Ok(());
                    }
                    println!("{:>6} {:>10} {:>13} {:>7}", "Year", "Citations", "Publications", "Bubble");
                    for i in 0..series.len() {
                        println!(
                            "{:>6} {:>10} {:>13} {:>7.1}",
                            series.years[i], series.citations[i], series.publications[i], series.bubble_sizes[i]
                        );
                    }
                    let (lo, hi) = series.citation_axis();
                    println!("\nCitation axis: {:.1} .. {:.1}", lo, hi);
                }
                Err(e) => println!("{}", e.user_message()),
            }
        }

        Commands::Profile => {
            let portfolio = build_loader(&cli, config)?.load().await;
            report_origin(&portfolio);
            match &portfolio.profile {
                Ok(profile) => {
                    print_metric("Citations", &profile.citations);
                    print_metric("h-index", &profile.h_index);
                    print_metric("i10-index", &profile.i10_index);
                    if let Some(link) = &profile.author_link {
                        println!("Profile: {}", link);
                    }
                }
                Err(e) => println!("{}", e.user_message()),
            }
        }

        Commands::Snapshot { output, force } => {
            let store = match output {
                Some(path) => SnapshotStore::with_path(path.clone()),
                None => snapshot_store(&cli)?,
            };
            let loader = build_loader_with(config, None)?;
            let portfolio = loader.load_live().await;
            warn_sections(&portfolio.warnings);

            let publications = match portfolio.publications {
                Ok(p) => p,
                Err(e) => anyhow::bail!("Snapshot not written: {}", e.message),
            };
            if !portfolio.warnings.is_empty() && !*force {
                anyhow::bail!(
                    "Snapshot not written: load was incomplete ({} warning(s)); use --force to write anyway",
                    portfolio.warnings.len()
                );
            }
            let snapshot = Snapshot::new(portfolio.profile.ok(), publications);
            store.save(&snapshot).context("Failed to write snapshot")?;
            println!(
                "Saved {} publications to {:?}",
                snapshot.publications.len(),
                store.path()
            );
        }

        Commands::Cache { action } => {
            let store = snapshot_store(&cli)?;
            match action {
                CacheAction::Clear => {
                    store.clear()?;
                    println!("Snapshot cleared");
                }
                CacheAction::Path => {
                    println!("{:?}", store.path());
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Wiring
// ============================================================================

fn build_config(cli: &Cli) -> Config {
    let mut config = Config {
        api_key: cli.api_key.clone(),
        cors_proxy: cli.cors_proxy.clone(),
        ..Default::default()
    };
    if let Some(id) = &cli.author_id {
        config.scholar_author_id = id.clone();
    }
    if let Some(id) = &cli.orcid_id {
        config.orcid_id = id.clone();
    }
    config
}

fn snapshot_store(cli: &Cli) -> Result<SnapshotStore> {
    let store = match &cli.cache {
        Some(path) => SnapshotStore::with_path(path.clone()),
        None => SnapshotStore::new().context("Failed to locate snapshot file")?,
    };
    let ttl = cache_ttl(cli.cache_ttl_hours)?;
    Ok(store.with_ttl(ttl))
}

fn cache_ttl(hours: i64) -> Result<chrono::Duration> {
    chrono::Duration::try_hours(hours)
        .with_context(|| format!("--cache-ttl-hours {} is out of range", hours))
}

fn build_loader(cli: &Cli, config: Config) -> Result<PortfolioLoader<HttpTransport, HttpTransport>> {
    let store = if cli.no_cache {
        None
    } else {
        Some(snapshot_store(cli)?)
    };
    build_loader_with(config, store)
}

fn build_loader_with(
    config: Config,
    store: Option<SnapshotStore>,
) -> Result<PortfolioLoader<HttpTransport, HttpTransport>> {
    let transport = HttpTransport::from_config(&config).context("Failed to create HTTP client")?;
    let loader = PortfolioLoader::new(
        ScholarSource::new(transport.clone(), config.clone()),
        OrcidSource::new(transport, config),
    );
    Ok(match store {
        Some(store) => loader.with_store(store),
        None => loader,
    })
}

// ============================================================================
// Output
// ============================================================================

fn report_origin(portfolio: &Portfolio) {
    match portfolio.origin {
        DataOrigin::Live => info!("Loaded live data"),
        DataOrigin::Cache => println!(
            "(cached data from {})",
            portfolio.generated_at.format("%Y-%m-%d %H:%M UTC")
        ),
        DataOrigin::Fallback => println!(
            "(live fetch failed; showing saved data from {})",
            portfolio.generated_at.format("%Y-%m-%d %H:%M UTC")
        ),
    }
    warn_sections(&portfolio.warnings);
}

fn warn_sections(warnings: &[SectionError]) {
    for w in warnings {
        warn!(kind = ?w.kind, "{}", w.message);
    }
}

fn print_publication(rank: usize, p: &MergedPublication) {
    println!("\n{}. {}", rank, p.title);
    let venue = p.publication();
    if !venue.is_empty() {
        println!("   {}", venue);
    }
    println!("   Cited by {}", p.citations());
    if let Some(link) = p.link.as_deref().or(p.doi_link.as_deref()) {
        println!("   {}", link);
    }
}

fn print_metric(label: &str, metric: &Metric) {
    let all = metric.all.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
    match (metric.since, metric.since_year) {
        (Some(since), Some(year)) => println!("{:<10} {:>6}  (since {}: {})", label, all, year, since),
        _ => println!("{:<10} {:>6}", label, all),
    }
}

/// Flat CSV record for one publication
#[derive(Serialize)]
struct PublicationRow<'a> {
    title: &'a str,
    year: &'a str,
    journal: &'a str,
    doi: &'a str,
    link: &'a str,
    citations: u64,
}

impl<'a> From<&'a MergedPublication> for PublicationRow<'a> {
    fn from(p: &'a MergedPublication) -> Self {
        Self {
            title: &p.title,
            year: &p.year,
            journal: &p.journal_title,
            doi: p.doi.as_deref().unwrap_or(""),
            link: p.link.as_deref().unwrap_or(""),
            citations: p.citations(),
        }
    }
}

fn save_csv<T: Serialize>(path: &Path, data: &[T]) -> Result<()> {
    if data.is_empty() {
        println!("No data to save to {:?}", path);
        return Ok(());
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context("Failed to create CSV writer")?;

    for item in data {
        wtr.serialize(item).context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV")?;
    println!("Saved: {:?}", path);
    Ok(())
}
