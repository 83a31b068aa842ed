//! In-memory [`RemoteSource`] and fixtures shared by unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::client::{ByteStream, RemoteSource};
use crate::config::RetryConfig;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::ledger::DedupLedger;
use crate::types::{Category, Event};

#[derive(Default)]
struct Listings {
    /// url -> (items field, 1-based page -> records)
    pages: HashMap<String, (String, BTreeMap<usize, Vec<Value>>)>,
    /// url -> fixed JSON document
    documents: HashMap<String, Value>,
    /// url -> media body
    media: HashMap<String, Bytes>,
}

/// Fake session: serves canned listing pages and media bodies, and counts requests.
#[derive(Default)]
pub(crate) struct FakeSource {
    listings: Listings,
    failing_pages: HashSet<(String, usize)>,
    failing_media: HashSet<String>,
    page_hits: Mutex<HashMap<(String, usize), usize>>,
    media_hits: Mutex<HashMap<String, usize>>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve `records` under `url`, split into pages of `page_size`
    pub(crate) fn with_listing(
        self,
        url: &str,
        field: &str,
        records: Vec<Value>,
        page_size: usize,
    ) -> Self {
        let pages = records
            .chunks(page_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        self.with_pages(url, field, pages)
    }

    /// Serve explicit pages (page 1 first) under `url`; later pages are empty
    pub(crate) fn with_pages(mut self, url: &str, field: &str, pages: Vec<Vec<Value>>) -> Self {
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, records)| (i + 1, records))
            .collect();
        self.listings
            .pages
            .insert(url.to_string(), (field.to_string(), pages));
        self
    }

    /// Serve `doc` for every request to `url`, ignoring the query
    pub(crate) fn with_document(mut self, url: &str, doc: Value) -> Self {
        self.listings.documents.insert(url.to_string(), doc);
        self
    }

    /// Serve `body` as the media at `url`
    pub(crate) fn with_media(mut self, url: &str, body: &[u8]) -> Self {
        self.listings
            .media
            .insert(url.to_string(), Bytes::copy_from_slice(body));
        self
    }

    /// Page `page` of `url` always answers 503
    pub(crate) fn failing_page(mut self, url: &str, page: usize) -> Self {
        self.failing_pages.insert((url.to_string(), page));
        self
    }

    /// Media at `url` always answers 404
    pub(crate) fn failing_media(mut self, url: &str) -> Self {
        self.failing_media.insert(url.to_string());
        self
    }

    pub(crate) fn page_hits(&self, url: &str, page: usize) -> usize {
        self.page_hits
            .lock()
            .unwrap()
            .get(&(url.to_string(), page))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_page_hits(&self) -> usize {
        self.page_hits.lock().unwrap().values().sum()
    }

    pub(crate) fn media_hits(&self, url: &str) -> usize {
        self.media_hits
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_media_hits(&self) -> usize {
        self.media_hits.lock().unwrap().values().sum()
    }
}

fn query_usize(query: &[(&'static str, String)], key: &str) -> Option<usize> {
    query
        .iter()
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| v.parse().ok())
}

#[async_trait::async_trait]
impl RemoteSource for FakeSource {
    async fn fetch_json(&self, url: &str, query: &[(&'static str, String)]) -> Result<Value> {
        if let Some(doc) = self.listings.documents.get(url) {
            return Ok(doc.clone());
        }
        let Some((field, pages)) = self.listings.pages.get(url) else {
            return Err(Error::Http {
                status: 404,
                url: url.to_string(),
            });
        };
        let page = query_usize(query, "page").unwrap_or(1);
        *self
            .page_hits
            .lock()
            .unwrap()
            .entry((url.to_string(), page))
            .or_default() += 1;
        if self.failing_pages.contains(&(url.to_string(), page)) {
            return Err(Error::Http {
                status: 503,
                url: url.to_string(),
            });
        }
        let records = pages.get(&page).cloned().unwrap_or_default();
        let mut body = serde_json::Map::new();
        body.insert(field.clone(), Value::Array(records));
        Ok(Value::Object(body))
    }

    async fn open_stream(&self, url: &str) -> Result<ByteStream> {
        *self
            .media_hits
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;
        if self.failing_media.contains(url) {
            return Err(Error::Http {
                status: 404,
                url: url.to_string(),
            });
        }
        let body = self.listings.media.get(url).cloned().ok_or_else(|| Error::Http {
            status: 404,
            url: url.to_string(),
        })?;
        // Two chunks, so writers see a multi-chunk body
        let mid = body.len() / 2;
        let chunks = vec![Ok(body.slice(..mid)), Ok(body.slice(mid..))];
        Ok(futures::stream::iter(chunks).boxed())
    }
}

/// A listing record as the media endpoint returns it
pub(crate) fn media_record(upload_date_ms: i64, is_video: bool) -> Value {
    json!({
        "upload_date": upload_date_ms,
        "is_video": is_video,
        "responsive_url": format!("img.test/{upload_date_ms}.jpg"),
        "video_url": format!("vid.test/{upload_date_ms}.mp4"),
    })
}

/// `count` distinct image records with identities 1..=count
pub(crate) fn media_records(count: usize) -> Vec<Value> {
    (1..=count as i64)
        .map(|i| media_record(i * 1000, false))
        .collect()
}

/// Retry policy that fails fast
pub(crate) fn no_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 0,
        initial_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(1),
        backoff_multiplier: 1.0,
        jitter: false,
    }
}

/// Run context over `source` for account "alice"
pub(crate) fn run_context(
    source: Arc<FakeSource>,
    ledger: DedupLedger,
    category: Category,
) -> (RunContext, broadcast::Receiver<Event>) {
    let (event_tx, event_rx) = broadcast::channel(4096);
    let ctx = RunContext {
        source,
        ledger,
        retry: no_retry(),
        cancel: CancellationToken::new(),
        event_tx,
        account: "alice".to_string(),
        category,
    };
    (ctx, event_rx)
}

/// Drain every event currently buffered on `rx`
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
