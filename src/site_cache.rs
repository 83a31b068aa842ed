//! Persisted site/collection id cache (`{account}_cache_store`)
//!
//! Lets a run reuse ids resolved earlier, e.g. after a username change.
//! Layout: `{ "alice": [123456, "5d1a2b3c"] }`, site id first, collection id second.

use crate::error::{Error, Result};
use crate::types::Account;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Id as stored on disk; the API hands out site ids as numbers and collection ids as strings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredId {
    Number(i64),
    Text(String),
}

impl StoredId {
    fn from_string(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(n) => StoredId::Number(n),
            Err(_) => StoredId::Text(id.to_string()),
        }
    }

    fn into_string(self) -> String {
        match self {
            StoredId::Number(n) => n.to_string(),
            StoredId::Text(s) => s,
        }
    }
}

/// Map of username to `(site_id, collection_id)`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteCache {
    entries: BTreeMap<String, (StoredId, StoredId)>,
}

impl SiteCache {
    /// Load from `path`; a missing or unreadable document yields an empty cache
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::filesystem(path, e)),
        };
        match serde_json::from_slice(&raw) {
            Ok(cache) => Ok(cache),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Site cache is not valid JSON, starting empty");
                Ok(Self::default())
            }
        }
    }

    /// Write to `path` as pretty JSON
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        crate::utils::write_atomic(path, &json).await
    }

    /// Cached account for `username`, if any
    pub fn get(&self, username: &str) -> Option<Account> {
        self.entries.get(username).map(|(site, collection)| {
            Account::new(
                username,
                site.clone().into_string(),
                Some(collection.clone().into_string()),
            )
        })
    }

    /// Remember the ids of `account`; accounts without a collection id are not cached
    pub fn insert(&mut self, account: &Account) {
        if let Some(collection_id) = &account.collection_id {
            self.entries.insert(
                account.username.clone(),
                (
                    StoredId::from_string(&account.site_id),
                    StoredId::Text(collection_id.clone()),
                ),
            );
        }
    }

    /// Number of cached accounts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `{state_dir}/{account}_cache_store`
pub fn site_cache_path(state_dir: &Path, account: &str) -> PathBuf {
    state_dir.join(format!("{account}_cache_store"))
}
