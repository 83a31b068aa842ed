//! # vsco-dl
//!
//! Mirror the media of a VSCO account to local storage without downloading anything twice.
//!
//! Each category of an account (its own posts, its collection, its journal and its
//! profile picture) runs as a pipeline of two stages:
//!
//! 1. **Harvest** - `W` concurrent stripes sweep the paginated listing endpoint; stripe
//!    `k` reads pages `k+1, k+1+W, …` until it sees an empty page. Every record is
//!    checked against the [`DedupLedger`] and the destination directory.
//! 2. **Download** - a bounded pool streams the remaining items to disk through
//!    temporary `.part` files, isolating every failure at its item.
//!
//! Listing completes before downloading starts. Runs report counts instead of failing
//! on partial success; only setup problems abort a category.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vsco_dl::{Account, Config, DedupLedger, VscoDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let ledger = DedupLedger::open(&config.persistence.state_dir, "alice", true).await?;
//!     let downloader = VscoDownloader::new(config, ledger)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let account = Account::new("alice", "1234567", Some("c0ffee".to_string()));
//!     let report = downloader.download_all(&account, true).await;
//!     println!("downloaded {}", report.totals().downloaded);
//!
//!     downloader
//!         .ledger()
//!         .save(&vsco_dl::ledger::ledger_path(&downloader.config().persistence.state_dir, "alice"))
//!         .await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Remote API access and listing record shapes
pub mod client;
/// Configuration types
pub mod config;
/// Per-run shared state
pub mod context;
/// Category pipelines (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Striped pagination harvester
pub mod harvest;
/// Cross-run dedup ledger
pub mod ledger;
/// Bounded download pool
pub mod pool;
/// Retry logic with exponential backoff
pub mod retry;
/// Persisted site/collection id cache
pub mod site_cache;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use client::{ApiClient, RemoteSource};
pub use config::Config;
pub use downloader::VscoDownloader;
pub use error::{Error, ErrorKind, Result};
pub use ledger::DedupLedger;
pub use site_cache::SiteCache;
pub use types::{
    Account, AccountReport, Category, CategoryReport, Event, ItemId, ItemKind, StripeFailure,
    WorkItem,
};

/// Run `work` to completion, cancelling the downloader when a termination signal arrives.
///
/// Cancellation stops pipelines at their next page or item boundary, so `work` still
/// returns its (partial) reports and the caller can persist the ledger afterwards.
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use vsco_dl::{Account, Config, DedupLedger, VscoDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = VscoDownloader::new(Config::default(), DedupLedger::disabled())?;
///     let account = Account::new("alice", "1234567", None);
///
///     let report = run_with_shutdown(&downloader, downloader.download_all(&account, false)).await;
///     println!("{:?}", report.totals());
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown<F>(downloader: &VscoDownloader, work: F) -> F::Output
where
    F: std::future::Future,
{
    let watcher = {
        let downloader = downloader.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            downloader.cancel();
        })
    };
    let output = work.await;
    watcher.abort();
    output
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments; fall back to ctrl_c there
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                _ = sigint.recv() => tracing::info!("Received SIGINT"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C");
}
