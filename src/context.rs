//! Per-run shared state handed to the harvester and the download pool.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::client::RemoteSource;
use crate::config::RetryConfig;
use crate::ledger::DedupLedger;
use crate::types::{Category, Event};

/// Everything a worker needs to fetch, dedup, write and report for one
/// (account, category) run. Cheap to clone: all shared parts are reference-counted.
#[derive(Clone)]
pub struct RunContext {
    /// Authenticated session
    pub source: Arc<dyn RemoteSource>,
    /// Cross-run dedup ledger (possibly disabled)
    pub ledger: DedupLedger,
    /// Retry policy for page fetches and item downloads
    pub retry: RetryConfig,
    /// Honored before every page fetch and every item download
    pub cancel: CancellationToken,
    /// Progress events
    pub event_tx: broadcast::Sender<Event>,
    /// Account username
    pub account: String,
    /// Category being processed
    pub category: Category,
}

impl RunContext {
    /// Emit an event; having no subscribers is fine
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
