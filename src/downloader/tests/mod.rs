use std::path::Path;
use std::sync::Arc;

use super::*;
use crate::test_helpers::{FakeSource, drain_events, media_records, no_retry};
use crate::types::ItemId;

mod journal;
mod profile;

const BASE: &str = "http://api.test";
const MEDIA_URL: &str = "http://api.test/medias";
const COLLECTION_URL: &str = "http://api.test/collections/c0ffee/medias";
const JOURNAL_URL: &str = "http://api.test/articles";
const PROFILE_URL: &str = "http://api.test/sites/123";

fn alice() -> Account {
    Account::new("alice", "123", Some("c0ffee".to_string()))
}

/// Downloader over `source`, mirroring into `dir`, with small pages and no retry delay
fn downloader(dir: &Path, source: Arc<FakeSource>, ledger: DedupLedger) -> VscoDownloader {
    let mut config = Config::default();
    config.api.base_url = BASE.to_string();
    config.download.download_dir = dir.to_path_buf();
    config.harvest.page_size = 10;
    config.retry = no_retry();
    VscoDownloader::with_source(config, source, ledger)
}

/// Serve a body for every image of [`media_records`]`(count)`
fn serve_images(mut source: FakeSource, count: usize) -> FakeSource {
    for i in 1..=count {
        source = source.with_media(
            &format!("http://img.test/{}.jpg", i * 1000),
            format!("image {i}").as_bytes(),
        );
    }
    source
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
