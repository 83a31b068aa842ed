//! Dedup ledger: identities already processed, per account and category
//!
//! The persisted form is the `{account}_latest_cache_store` JSON document:
//!
//! ```json
//! { "alice": { "images": { "1561234567": "06-22-2019" }, "collection": {}, "journal": {}, "profile": {} } }
//! ```
//!
//! A ledger is either enabled (shared, mutex-guarded map) or disabled, in which
//! case nothing is ever "seen" and marking does nothing. Cloning a ledger shares
//! the same underlying map, so every harvester worker sees every other worker's marks.

use crate::error::{Error, Result};
use crate::types::{Category, ItemId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// `account → category → identity → first-seen date`
pub type LedgerData = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// Date format of first-seen stamps
const DATE_FORMAT: &str = "%m-%d-%Y";

/// Shared record of identities that are on disk or being downloaded
#[derive(Clone, Debug, Default)]
pub struct DedupLedger {
    inner: Option<Arc<Mutex<LedgerData>>>,
}

impl DedupLedger {
    /// An enabled, empty ledger
    pub fn new() -> Self {
        Self::from_data(LedgerData::new())
    }

    /// A ledger that remembers nothing; the on-disk check is the only dedup guard
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// An enabled ledger seeded with previously persisted data
    pub fn from_data(data: LedgerData) -> Self {
        Self {
            inner: Some(Arc::new(Mutex::new(data))),
        }
    }

    /// Load a ledger from `path`
    ///
    /// A missing file yields an empty ledger. A file that cannot be parsed is
    /// logged and also yields an empty ledger, so a damaged store never blocks a run.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No ledger file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(Error::filesystem(path, e)),
        };

        match serde_json::from_slice::<LedgerData>(&raw) {
            Ok(data) => {
                tracing::info!(
                    path = %path.display(),
                    accounts = data.len(),
                    "Loaded dedup ledger"
                );
                Ok(Self::from_data(data))
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ledger file is not valid JSON, starting empty"
                );
                Ok(Self::new())
            }
        }
    }

    /// Open the ledger for `account` as configured: loaded from
    /// `{state_dir}/{account}_latest_cache_store` when enabled, disabled otherwise
    pub async fn open(state_dir: &Path, account: &str, enabled: bool) -> Result<Self> {
        if enabled {
            Self::load(&ledger_path(state_dir, account)).await
        } else {
            Ok(Self::disabled())
        }
    }

    /// Whether this ledger records anything
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Make sure `account` has a (possibly empty) map for every category
    pub fn open_account(&self, account: &str) {
        if let Some(mut data) = self.lock() {
            let categories = data.entry(account.to_string()).or_default();
            for category in Category::ALL {
                categories.entry(category.as_str().to_string()).or_default();
            }
        }
    }

    /// Whether `id` was already recorded for (account, category)
    pub fn seen(&self, account: &str, category: Category, id: &ItemId) -> bool {
        self.lock().is_some_and(|data| {
            data.get(account)
                .and_then(|categories| categories.get(category.as_str()))
                .is_some_and(|ids| ids.contains_key(id.as_str()))
        })
    }

    /// Record `id` for (account, category) with the given first-seen date
    ///
    /// An existing entry keeps its original date.
    pub fn mark(&self, account: &str, category: Category, id: &ItemId, date: &str) {
        if let Some(mut data) = self.lock() {
            Self::insert(&mut data, account, category, id, date);
        }
    }

    /// Atomically check and record `id`; returns `true` if it was already present
    ///
    /// Two workers racing on the same identity get exactly one `false`.
    pub fn check_and_mark(&self, account: &str, category: Category, id: &ItemId) -> bool {
        let Some(mut data) = self.lock() else {
            return false;
        };
        let today = today();
        !Self::insert(&mut data, account, category, id, &today)
    }

    /// Forget `id` for (account, category) so a later run harvests it again
    ///
    /// Used for items that were admitted but never reached the disk.
    pub fn unmark(&self, account: &str, category: Category, id: &ItemId) {
        if let Some(mut data) = self.lock()
            && let Some(ids) = data
                .get_mut(account)
                .and_then(|categories| categories.get_mut(category.as_str()))
        {
            ids.remove(id.as_str());
        }
    }

    /// Number of identities recorded for (account, category)
    pub fn len(&self, account: &str, category: Category) -> usize {
        self.lock()
            .and_then(|data| {
                data.get(account)
                    .and_then(|categories| categories.get(category.as_str()))
                    .map(BTreeMap::len)
            })
            .unwrap_or(0)
    }

    /// Snapshot of the persisted form (empty for a disabled ledger)
    pub fn flush(&self) -> LedgerData {
        self.lock().map(|data| data.clone()).unwrap_or_default()
    }

    /// Write the ledger to `path` as pretty JSON (temp file + rename)
    ///
    /// A disabled ledger writes nothing.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let json = serde_json::to_vec_pretty(&self.flush())?;
        crate::utils::write_atomic(path, &json).await?;
        tracing::debug!(path = %path.display(), "Saved dedup ledger");
        Ok(())
    }

    /// Returns `true` if the entry was newly inserted
    fn insert(
        data: &mut LedgerData,
        account: &str,
        category: Category,
        id: &ItemId,
        date: &str,
    ) -> bool {
        let ids = data
            .entry(account.to_string())
            .or_default()
            .entry(category.as_str().to_string())
            .or_default();
        if ids.contains_key(id.as_str()) {
            return false;
        }
        ids.insert(id.as_str().to_string(), date.to_string());
        true
    }

    fn lock(&self) -> Option<MutexGuard<'_, LedgerData>> {
        // A panicked worker cannot leave the map half-updated: every mutation is a
        // single insert or remove
        self.inner
            .as_ref()
            .map(|inner| inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

/// `{state_dir}/{account}_latest_cache_store`
pub fn ledger_path(state_dir: &Path, account: &str) -> PathBuf {
    state_dir.join(format!("{account}_latest_cache_store"))
}

/// Today's date in ledger format
pub fn today() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}
