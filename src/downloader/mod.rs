//! Category pipelines, split into focused submodules.
//!
//! The `VscoDownloader` struct and its methods are organized by category:
//! - [`media`] - Account posts and the reposted collection (striped harvest + pool)
//! - [`journal`] - Two-phase journal listing and per-article downloads
//! - [`profile`] - Current profile picture
//! - [`run_all`] - Every category of one account, each isolated from the others

mod journal;
mod media;
mod profile;
mod run_all;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::client::{ApiClient, Endpoints, RemoteSource};
use crate::config::Config;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::ledger::DedupLedger;
use crate::types::{Account, Category, CategoryReport, Event};
use crate::utils::safe_path_component;

/// Mirrors accounts to disk (cloneable - all fields are shared)
#[derive(Clone)]
pub struct VscoDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Authenticated session used for listings and media
    pub(crate) source: Arc<dyn RemoteSource>,
    /// Cross-run dedup ledger shared by every pipeline
    pub(crate) ledger: DedupLedger,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Stops every pipeline at its next page or item boundary
    pub(crate) cancel: CancellationToken,
}

impl VscoDownloader {
    /// Create a downloader talking to the configured API over HTTP
    ///
    /// Fails if the configuration does not validate or the HTTP client cannot be built.
    pub fn new(config: Config, ledger: DedupLedger) -> Result<Self> {
        config.validate()?;
        let source = ApiClient::new(&config)?.into_source();
        Ok(Self::with_source(config, source, ledger))
    }

    /// Create a downloader over any [`RemoteSource`], e.g. a client carrying session cookies
    pub fn with_source(config: Config, source: Arc<dyn RemoteSource>, ledger: DedupLedger) -> Self {
        // Buffer enough events that a slow progress consumer does not lag on a full page
        let (event_tx, _rx) = broadcast::channel(1000);
        Self {
            config: Arc::new(config),
            source,
            ledger,
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to progress events
    ///
    /// Each subscriber gets every event sent after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Stop all running pipelines at their next page or item boundary
    ///
    /// Work already in flight finishes; reports count untouched items as cancelled.
    pub fn cancel(&self) {
        tracing::info!("Cancelling downloads");
        self.cancel.cancel();
    }

    /// Token cancelled by [`cancel`](Self::cancel), for wiring to signal handlers
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The dedup ledger shared by all pipelines
    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `{download_dir}/{username}`
    ///
    /// The username becomes a directory name, so anything that is not a single
    /// plain path component is rejected.
    pub fn account_root(&self, account: &Account) -> Result<PathBuf> {
        let name = safe_path_component(&account.username).ok_or_else(|| Error::Config {
            message: format!("username {:?} is not usable as a directory name", account.username),
            key: Some("username".to_string()),
        })?;
        Ok(self.config.download_dir().join(name))
    }

    /// Destination directory of `category` for `account`
    pub fn category_dir(&self, account: &Account, category: Category) -> Result<PathBuf> {
        let root = self.account_root(account)?;
        Ok(match category.subdir() {
            Some(subdir) => root.join(subdir),
            None => root,
        })
    }

    /// Run one category pipeline for `account`
    pub async fn download(&self, account: &Account, category: Category) -> Result<CategoryReport> {
        match category {
            Category::Images => self.download_images(account).await,
            Category::Collection => self.download_collection(account).await,
            Category::Journal => self.download_journal(account).await,
            Category::Profile => self.download_profile(account).await,
        }
    }

    pub(crate) fn endpoints(&self, account: &Account) -> Endpoints {
        Endpoints::new(&self.config.api.base_url, account)
    }

    /// Per-run context; also makes sure the account has a ledger entry
    pub(crate) fn context(&self, account: &Account, category: Category) -> RunContext {
        self.ledger.open_account(&account.username);
        RunContext {
            source: Arc::clone(&self.source),
            ledger: self.ledger.clone(),
            retry: self.config.retry.clone(),
            cancel: self.cancel.clone(),
            event_tx: self.event_tx.clone(),
            account: account.username.clone(),
            category,
        }
    }

    /// Log and announce a finished category
    pub(crate) fn finish(&self, ctx: &RunContext, report: CategoryReport) -> CategoryReport {
        if report.is_complete() {
            tracing::info!(
                account = %ctx.account,
                category = %ctx.category,
                downloaded = report.downloaded,
                skipped = report.skipped,
                "Category complete"
            );
        } else {
            tracing::warn!(
                account = %ctx.account,
                category = %ctx.category,
                downloaded = report.downloaded,
                skipped = report.skipped,
                failed = report.failed.len(),
                cancelled = report.cancelled,
                malformed = report.malformed,
                failed_stripes = report.stripe_failures.len(),
                "Category finished with gaps"
            );
        }
        ctx.emit(Event::CategoryComplete {
            account: ctx.account.clone(),
            category: ctx.category,
            report: report.clone(),
        });
        report
    }
}
