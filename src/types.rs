//! Core types for vsco-dl

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Number of hex characters of the SHA-256 digest kept in a text identity
const TEXT_ID_HEX_LEN: usize = 16;

/// Stable identity of a harvested item, used both as file stem and ledger key
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Identity of a listing item: its millisecond upload timestamp with the last
    /// three digits dropped
    pub fn from_upload_date(upload_date_ms: i64) -> Self {
        Self((upload_date_ms / 1000).to_string())
    }

    /// Identity of an inline journal text block in article `permalink`
    ///
    /// Derived from a hash of the permalink and the content, so the same text in two
    /// articles is saved in both. Text is never used as its own filename: long or
    /// special-character content would produce invalid or colliding names.
    pub fn from_text(permalink: &str, content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(permalink.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>();
        Self(format!("text-{}", &hex[..TEXT_ID_HEX_LEN]))
    }

    /// Borrow the identity as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Harvest domain; each has its own listing endpoint, directory and ledger namespace
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Account's own posts, stored flat in the account root
    Images,
    /// Reposted collection, stored under `collection/`
    Collection,
    /// Journal articles, stored under `journal/{permalink}/`
    Journal,
    /// Current profile picture, stored under `profile/`
    Profile,
}

impl Category {
    /// Every category, in the order a full run visits them
    pub const ALL: [Category; 4] = [
        Category::Images,
        Category::Collection,
        Category::Journal,
        Category::Profile,
    ];

    /// Key used in the persisted ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Collection => "collection",
            Category::Journal => "journal",
            Category::Profile => "profile",
        }
    }

    /// Sub-directory of the account root this category is mirrored into
    pub fn subdir(&self) -> Option<&'static str> {
        match self {
            Category::Images => None,
            Category::Collection => Some("collection"),
            Category::Journal => Some("journal"),
            Category::Profile => Some("profile"),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a work item is, and where its bytes come from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemKind {
    /// Still image fetched from `url`, saved as `.jpg`
    Image {
        /// Absolute source URL
        url: String,
    },
    /// Video fetched from `url`, saved as `.mp4`
    Video {
        /// Absolute source URL
        url: String,
    },
    /// Inline text written verbatim, saved as `.txt`
    Text {
        /// Literal text content
        content: String,
    },
}

impl ItemKind {
    /// File extension the item is saved under
    pub fn extension(&self) -> &'static str {
        match self {
            ItemKind::Image { .. } => "jpg",
            ItemKind::Video { .. } => "mp4",
            ItemKind::Text { .. } => "txt",
        }
    }
}

/// A harvested entry waiting to be written to disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Stable identity (file stem and ledger key)
    pub id: ItemId,
    /// Media type and payload
    #[serde(flatten)]
    pub kind: ItemKind,
    /// Journal permalink the item is filed under, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl WorkItem {
    /// Create an ungrouped item
    pub fn new(id: ItemId, kind: ItemKind) -> Self {
        Self {
            id,
            kind,
            group: None,
        }
    }

    /// File this item is finalized under, e.g. `1561234567.jpg`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.kind.extension())
    }
}

/// Account to mirror, with the ids the API keys its listings by
///
/// Resolving `site_id`/`collection_id` from a username happens outside this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Username; also the name of the account's root directory and ledger key
    pub username: String,
    /// Numeric site id
    pub site_id: String,
    /// Collection id, required only for the collection category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
}

impl Account {
    /// Create an account descriptor
    pub fn new(
        username: impl Into<String>,
        site_id: impl Into<String>,
        collection_id: Option<String>,
    ) -> Self {
        Self {
            username: username.into(),
            site_id: site_id.into(),
            collection_id,
        }
    }
}

/// A stripe that stopped before reaching its empty page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeFailure {
    /// 0-based worker index
    pub stripe: usize,
    /// 1-based page that could not be fetched
    pub page: usize,
    /// Error message after retries were exhausted
    pub error: String,
}

/// Outcome of one category run for one account
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryReport {
    /// Items written to disk during this run
    pub downloaded: usize,
    /// Items not fetched because the ledger or the destination already had them
    pub skipped: usize,
    /// Identities whose download failed
    pub failed: Vec<ItemId>,
    /// Items left untouched because the run was cancelled
    pub cancelled: usize,
    /// Listing records that could not be turned into work items
    pub malformed: usize,
    /// Pagination stripes that stopped early
    pub stripe_failures: Vec<StripeFailure>,
}

impl CategoryReport {
    /// True when nothing failed and nothing was left behind
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
            && self.cancelled == 0
            && self.malformed == 0
            && self.stripe_failures.is_empty()
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: CategoryReport) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
        self.cancelled += other.cancelled;
        self.malformed += other.malformed;
        self.stripe_failures.extend(other.stripe_failures);
    }
}

/// Outcome of a run over several categories of one account
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReport {
    /// Account username
    pub account: String,
    /// Reports of the categories that ran to the end
    pub categories: BTreeMap<Category, CategoryReport>,
    /// Categories that aborted during setup or listing, with the error message
    pub errors: BTreeMap<Category, String>,
}

impl AccountReport {
    /// Empty report for `account`
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            ..Self::default()
        }
    }

    /// Sum of every category report
    pub fn totals(&self) -> CategoryReport {
        let mut totals = CategoryReport::default();
        for report in self.categories.values() {
            totals.merge(report.clone());
        }
        totals
    }

    /// True when no category aborted and every category report is complete
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.categories.values().all(CategoryReport::is_complete)
    }
}

/// Event emitted during a harvest/download run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Listing started for a category
    HarvestStarted {
        /// Account username
        account: String,
        /// Category being listed
        category: Category,
    },

    /// A listing page was fetched
    PageFetched {
        /// Account username
        account: String,
        /// Category being listed
        category: Category,
        /// 1-based page number
        page: usize,
        /// Records on the page
        items: usize,
    },

    /// A new item was found and will be downloaded
    ItemQueued {
        /// Account username
        account: String,
        /// Category of the item
        category: Category,
        /// Item identity
        id: ItemId,
    },

    /// A pagination stripe gave up after exhausting retries
    StripeFailed {
        /// Account username
        account: String,
        /// Category being listed
        category: Category,
        /// Failure details
        failure: StripeFailure,
    },

    /// Listing finished; `queued` items will be downloaded
    HarvestComplete {
        /// Account username
        account: String,
        /// Category that was listed
        category: Category,
        /// Items handed to the download stage
        queued: usize,
        /// Items skipped as already known
        skipped: usize,
    },

    /// An item was written to disk
    ItemDownloaded {
        /// Account username
        account: String,
        /// Category of the item
        category: Category,
        /// Item identity
        id: ItemId,
        /// Final path
        path: PathBuf,
    },

    /// An item was already on disk when its download slot came up
    ItemSkipped {
        /// Account username
        account: String,
        /// Category of the item
        category: Category,
        /// Item identity
        id: ItemId,
    },

    /// An item could not be downloaded
    ItemFailed {
        /// Account username
        account: String,
        /// Category of the item
        category: Category,
        /// Item identity
        id: ItemId,
        /// Error message
        error: String,
    },

    /// A category run finished
    CategoryComplete {
        /// Account username
        account: String,
        /// Category that finished
        category: Category,
        /// Final counts
        report: CategoryReport,
    },
}
