use serde_json::json;

use super::*;

fn site(profile_image_id: serde_json::Value) -> serde_json::Value {
    json!({"site": {"profile_image_id": profile_image_id, "responsive_url": "img.test/pp42.jpg"}})
}

#[tokio::test]
async fn profile_picture_is_saved_once() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::new()
            .with_document(PROFILE_URL, site(json!("pp42")))
            .with_media("http://img.test/pp42.jpg", b"face"),
    );
    let ledger = DedupLedger::new();
    let downloader = downloader(dir.path(), source.clone(), ledger.clone());

    let first = downloader.download_profile(&alice()).await.unwrap();
    let second = downloader.download_profile(&alice()).await.unwrap();

    assert_eq!(first.downloaded, 1);
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(source.total_media_hits(), 1);
    assert_eq!(
        std::fs::read(dir.path().join("alice/profile/pp42.jpg")).unwrap(),
        b"face"
    );
    assert!(ledger.seen("alice", Category::Profile, &ItemId::from("pp42")));
}

#[tokio::test]
async fn missing_profile_picture_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new().with_document(PROFILE_URL, site(json!(null))));
    let downloader = downloader(dir.path(), source.clone(), DedupLedger::disabled());

    let report = downloader.download_profile(&alice()).await.unwrap();

    assert_eq!(report, CategoryReport::default());
    assert_eq!(source.total_media_hits(), 0);
    assert!(!dir.path().join("alice/profile").exists());
}

#[tokio::test]
async fn malformed_site_document_aborts_profile() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new().with_document(PROFILE_URL, json!({"user": {}})));
    let downloader = downloader(dir.path(), source, DedupLedger::disabled());

    let err = downloader.download_profile(&alice()).await.unwrap_err();

    assert_eq!(err.kind(), crate::error::ErrorKind::MalformedResponse);
}
