//! Command-line front end: mirror one account's categories into a directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vsco_dl::ledger::ledger_path;
use vsco_dl::site_cache::site_cache_path;
use vsco_dl::{
    Account, AccountReport, Category, Config, DedupLedger, Error, Result, SiteCache,
    VscoDownloader, run_with_shutdown,
};

/// Mirror a VSCO account's images, collection, journal and profile picture
#[derive(Parser, Debug)]
#[command(name = "vsco-dl", version)]
#[command(about = "Scrapes a VSCO account to local storage", long_about = None)]
struct Cli {
    /// Account to mirror
    username: String,

    /// Get the account's own posts
    #[arg(short = 'i', long)]
    images: bool,

    /// Get the account's collection
    #[arg(short = 'c', long)]
    collection: bool,

    /// Get the account's journal articles
    #[arg(short = 'j', long)]
    journal: bool,

    /// Get the account's profile picture
    #[arg(short = 'p', long)]
    profile: bool,

    /// Images, collection and journal
    #[arg(short = 'a', long)]
    all: bool,

    /// Images, collection, journal and profile picture
    #[arg(long)]
    all_profile: bool,

    /// Remember downloaded media across runs and never fetch it again
    #[arg(short = 'l', long)]
    latest: bool,

    /// Cache the site and collection ids of the account
    #[arg(long)]
    cache_hit: bool,

    /// Site id of the account (otherwise taken from the site cache)
    #[arg(long)]
    site_id: Option<String>,

    /// Collection id of the account (otherwise taken from the site cache)
    #[arg(long)]
    collection_id: Option<String>,

    /// Root directory; the account is mirrored into `<dir>/<username>`
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Listing and download workers
    #[arg(long)]
    workers: Option<usize>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Categories in run order; `--all`/`--all-profile` take precedence over single flags
    fn categories(&self) -> Vec<Category> {
        if self.all || self.all_profile {
            let mut categories = vec![Category::Images, Category::Collection, Category::Journal];
            if self.all_profile {
                categories.push(Category::Profile);
            }
            return categories;
        }
        [
            (self.images, Category::Images),
            (self.journal, Category::Journal),
            (self.collection, Category::Collection),
            (self.profile, Category::Profile),
        ]
        .into_iter()
        .filter_map(|(selected, category)| selected.then_some(category))
        .collect()
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &self.dir {
            config.download.download_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.harvest.workers = workers;
            config.download.max_concurrent_downloads = workers;
        }
        config.persistence.ledger |= self.latest;
        config.persistence.site_cache |= self.cache_hit;
        config.validate()?;
        Ok(config)
    }

    /// Ids from the command line win over cached ones
    fn account(&self, cache: &SiteCache) -> Result<Account> {
        let cached = cache.get(&self.username);
        let site_id = self
            .site_id
            .clone()
            .or_else(|| cached.as_ref().map(|account| account.site_id.clone()))
            .ok_or_else(|| {
                Error::config(
                    "site_id",
                    format!(
                        "no site id for {}: pass --site-id or run with --cache-hit after caching it",
                        self.username
                    ),
                )
            })?;
        let collection_id = self
            .collection_id
            .clone()
            .or_else(|| cached.and_then(|account| account.collection_id));
        Ok(Account::new(self.username.clone(), site_id, collection_id))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vsco_dl=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every selected category completed without gaps
async fn run(cli: Cli) -> Result<bool> {
    let categories = cli.categories();
    if categories.is_empty() {
        return Err(Error::config(
            "categories",
            "nothing to do: pass -i, -c, -j, -p, -a or --all-profile",
        ));
    }

    let config = cli.load_config()?;
    let state_dir = config.persistence.state_dir.clone();
    let use_site_cache = config.persistence.site_cache;
    let use_ledger = config.persistence.ledger;

    let cache_path = site_cache_path(&state_dir, &cli.username);
    let mut site_cache = if use_site_cache {
        SiteCache::load(&cache_path).await?
    } else {
        SiteCache::default()
    };
    let account = cli.account(&site_cache)?;
    if categories.contains(&Category::Collection) && account.collection_id.is_none() {
        tracing::warn!(
            account = %account.username,
            "No collection id known, collection will be skipped"
        );
    }

    let ledger = DedupLedger::open(&state_dir, &account.username, use_ledger).await?;
    let downloader = VscoDownloader::new(config, ledger)?;

    let report = run_with_shutdown(
        &downloader,
        downloader.download_categories(&account, &categories),
    )
    .await;
    print_report(&report);

    if use_ledger {
        downloader
            .ledger()
            .save(&ledger_path(&state_dir, &account.username))
            .await?;
    }
    if use_site_cache {
        site_cache.insert(&account);
        site_cache.save(&cache_path).await?;
    }

    Ok(report.is_complete())
}

fn print_report(report: &AccountReport) {
    for (category, summary) in &report.categories {
        println!(
            "{} {}: {} downloaded, {} skipped, {} failed",
            report.account,
            category,
            summary.downloaded,
            summary.skipped,
            summary.failed.len()
        );
        for id in &summary.failed {
            println!("  failed: {id}");
        }
        if summary.cancelled > 0 {
            println!("  cancelled: {} items not attempted", summary.cancelled);
        }
        for failure in &summary.stripe_failures {
            println!(
                "  listing stopped at page {} (stripe {}): {}",
                failure.page, failure.stripe, failure.error
            );
        }
    }
    for (category, error) in &report.errors {
        println!("{} {}: aborted: {}", report.account, category, error);
    }
}
