//! A mock VSCO API served by wiremock

use serde_json::{Value, json};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SITE_ID: &str = "123";
pub const COLLECTION_ID: &str = "c0ffee";

/// Mock API plus helpers to describe an account's remote content
pub struct MockApi {
    pub server: MockServer,
}

impl MockApi {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Scheme-less media URL on this server, as the API would return it
    pub fn media_url(&self, name: &str) -> String {
        format!("{}/media/{}", self.server.address(), name)
    }

    /// Listing record for an image or video uploaded at `upload_date_ms`
    pub fn media_record(&self, upload_date_ms: i64, is_video: bool) -> Value {
        json!({
            "upload_date": upload_date_ms,
            "is_video": is_video,
            "responsive_url": self.media_url(&format!("{upload_date_ms}.jpg")),
            "video_url": self.media_url(&format!("{upload_date_ms}.mp4")),
        })
    }

    /// `count` image records with identities `1..=count`
    pub fn media_records(&self, count: usize) -> Vec<Value> {
        (1..=count as i64)
            .map(|i| self.media_record(i * 1000, false))
            .collect()
    }

    /// Serve `records` from `endpoint` in pages of `page_size`; every other page is empty
    pub async fn mount_listing(&self, endpoint: &str, field: &str, records: &[Value], page_size: usize) {
        for (index, chunk) in records.chunks(page_size).enumerate() {
            Mock::given(method("GET"))
                .and(path(endpoint))
                .and(query_param("page", (index + 1).to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ field: chunk })))
                .with_priority(2)
                .mount(&self.server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ field: [] })))
            .with_priority(10)
            .mount(&self.server)
            .await;
    }

    /// Serve `articles` from the journal endpoint, expecting exactly one bulk request
    pub async fn mount_journal(&self, articles: Value) {
        Mock::given(method("GET"))
            .and(path("/articles"))
            .and(query_param("site_id", SITE_ID))
            .and(query_param("size", "10000"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "articles": articles })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Serve the site document with the given profile picture
    pub async fn mount_profile(&self, profile_image_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/sites/{SITE_ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "site": {
                    "profile_image_id": profile_image_id,
                    "responsive_url": self.media_url(&format!("{profile_image_id}.jpg")),
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Serve a small body for every media URL, expecting `expected` requests in total
    pub async fn mount_media(&self, expected: u64) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/media/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"media-bytes".to_vec()))
            .expect(expected)
            .mount(&self.server)
            .await;
    }
}
