use serde_json::json;

use super::*;

fn trip_2019() -> serde_json::Value {
    json!({
        "articles": [{
            "permalink": "trip-2019",
            "body": [
                {"type": "image", "content": [{"id": "img1", "responsive_url": "img.test/j1.jpg"}]},
                {"type": "video", "content": [{"id": "vid1", "video_url": "vid.test/j1.mp4"}]},
                {"type": "text", "content": "Day one."}
            ]
        }]
    })
}

fn journal_source(doc: serde_json::Value) -> FakeSource {
    FakeSource::new()
        .with_document(JOURNAL_URL, doc)
        .with_media("http://img.test/j1.jpg", b"jpeg")
        .with_media("http://vid.test/j1.mp4", b"mp4")
}

#[tokio::test]
async fn trip_2019_article_is_mirrored_into_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = downloader(
        dir.path(),
        Arc::new(journal_source(trip_2019())),
        DedupLedger::disabled(),
    );
    let mut events = downloader.subscribe();

    let report = downloader.download_journal(&alice()).await.unwrap();

    assert_eq!(report.downloaded, 3);
    assert!(report.is_complete());

    let article = dir.path().join("alice").join("journal").join("trip-2019");
    let text_name = format!("{}.txt", ItemId::from_text("trip-2019", "Day one."));
    let mut expected = vec!["img1.jpg".to_string(), "vid1.mp4".to_string(), text_name.clone()];
    expected.sort();
    assert_eq!(file_names(&article), expected);
    assert_eq!(std::fs::read_to_string(article.join(text_name)).unwrap(), "Day one.");
    assert_eq!(std::fs::read(article.join("vid1.mp4")).unwrap(), b"mp4");

    let total = drain_events(&mut events).into_iter().find_map(|event| match event {
        Event::HarvestComplete { queued, .. } => Some(queued),
        _ => None,
    });
    assert_eq!(total, Some(3));
}

#[tokio::test]
async fn journal_rerun_with_ledger_queues_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(journal_source(trip_2019()));
    let ledger = DedupLedger::new();
    let downloader = downloader(dir.path(), source.clone(), ledger.clone());

    downloader.download_journal(&alice()).await.unwrap();
    let second = downloader.download_journal(&alice()).await.unwrap();

    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(source.total_media_hits(), 2);
    assert_eq!(ledger.len("alice", Category::Journal), 3);
    assert!(ledger.seen("alice", Category::Journal, &ItemId::from("img1")));
}

#[tokio::test]
async fn article_directory_is_only_created_when_it_has_items() {
    let dir = tempfile::tempdir().unwrap();
    let doc = json!({
        "articles": [
            {"permalink": "empty-one", "body": [{"type": "divider"}]},
            {"permalink": "no-body"}
        ]
    });
    let downloader = downloader(dir.path(), Arc::new(journal_source(doc)), DedupLedger::disabled());

    let report = downloader.download_journal(&alice()).await.unwrap();

    assert_eq!(report, CategoryReport::default());
    assert!(file_names(&dir.path().join("alice").join("journal")).is_empty());
}

#[tokio::test]
async fn unsafe_permalink_and_bad_blocks_are_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let doc = json!({
        "articles": [
            {"permalink": "../outside", "body": [{"type": "text", "content": "escape"}]},
            {"permalink": "fine", "body": [
                {"type": "image", "content": []},
                {"type": "text", "content": "kept"}
            ]},
            {"body": []}
        ]
    });
    let downloader = downloader(dir.path(), Arc::new(journal_source(doc)), DedupLedger::disabled());

    let report = downloader.download_journal(&alice()).await.unwrap();

    assert_eq!(report.downloaded, 1);
    assert_eq!(report.malformed, 3);
    assert!(!dir.path().join("alice").join("outside").exists());
    assert_eq!(
        file_names(&dir.path().join("alice").join("journal")),
        ["fine"]
    );
}

#[tokio::test]
async fn journal_listing_failure_aborts_the_category() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = downloader(dir.path(), Arc::new(FakeSource::new()), DedupLedger::disabled());

    let result = downloader.download_journal(&alice()).await;

    assert!(matches!(result, Err(Error::Http { status: 404, .. })));
}

#[tokio::test]
async fn failing_journal_media_stays_in_its_article() {
    let dir = tempfile::tempdir().unwrap();
    let doc = json!({
        "articles": [
            {"permalink": "a", "body": [
                {"type": "image", "content": [{"id": "broken", "responsive_url": "img.test/broken.jpg"}]}
            ]},
            {"permalink": "b", "body": [
                {"type": "image", "content": [{"id": "img1", "responsive_url": "img.test/j1.jpg"}]}
            ]}
        ]
    });
    let source = journal_source(doc).failing_media("http://img.test/broken.jpg");
    let downloader = downloader(dir.path(), Arc::new(source), DedupLedger::disabled());

    let report = downloader.download_journal(&alice()).await.unwrap();

    assert_eq!(report.failed, vec![ItemId::from("broken")]);
    assert_eq!(report.downloaded, 1);
    assert!(dir.path().join("alice/journal/b/img1.jpg").exists());
}

#[tokio::test]
async fn repeated_media_in_an_article_is_fetched_once() {
    let dir = tempfile::tempdir().unwrap();
    let block = json!({"type": "video", "content": [{"id": "v1", "video_url": "vid.test/j1.mp4"}]});
    let doc = json!({"articles": [{"permalink": "trip-2019", "body": [block.clone(), block]}]});
    let source = Arc::new(journal_source(doc));
    let downloader = downloader(dir.path(), source.clone(), DedupLedger::disabled());

    let report = downloader.download_journal(&alice()).await.unwrap();

    assert_eq!(report.downloaded, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.failed.is_empty());
    assert_eq!(source.media_hits("http://vid.test/j1.mp4"), 1);
    assert_eq!(
        file_names(&dir.path().join("alice/journal/trip-2019")),
        ["v1.mp4"]
    );
}

#[tokio::test]
async fn same_text_in_two_articles_is_written_to_both_with_a_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let text = json!({"type": "text", "content": "See you soon."});
    let doc = json!({"articles": [
        {"permalink": "trip-2019", "body": [text.clone()]},
        {"permalink": "trip-2020", "body": [text]}
    ]});
    let ledger = DedupLedger::new();
    let downloader = downloader(dir.path(), Arc::new(journal_source(doc)), ledger.clone());

    let report = downloader.download_journal(&alice()).await.unwrap();

    assert_eq!(report.downloaded, 2);
    assert_eq!(ledger.len("alice", Category::Journal), 2);
    for permalink in ["trip-2019", "trip-2020"] {
        let article = dir.path().join("alice/journal").join(permalink);
        let name = format!("{}.txt", ItemId::from_text(permalink, "See you soon."));
        assert_eq!(std::fs::read_to_string(article.join(name)).unwrap(), "See you soon.");
    }
}
