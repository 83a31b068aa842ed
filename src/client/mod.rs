//! Remote API access: the [`RemoteSource`] seam, its reqwest-backed implementation,
//! and the listing endpoints of an account.

pub mod records;

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::Account;

/// Stream of body chunks for a media download
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Query string pairs for a listing request
pub type Query = Vec<(&'static str, String)>;

/// Abstraction over the authenticated session, enabling testability.
///
/// Cookies and credentials are expected to be attached already.
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    /// GET `url` with `query` and parse the body as JSON
    async fn fetch_json(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<serde_json::Value>;

    /// GET `url` and return its body as a chunk stream
    async fn open_stream(&self, url: &str) -> Result<ByteStream>;
}

/// Production [`RemoteSource`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    /// Build a client with the configured user agent and request timeout
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.api.user_agent.clone())
            .timeout(config.download.request_timeout)
            .build()?;
        Ok(Self { http })
    }

    /// Wrap an existing client, e.g. one carrying session cookies
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Shareable trait object for [`VscoDownloader`](crate::VscoDownloader)
    pub fn into_source(self) -> Arc<dyn RemoteSource> {
        Arc::new(self)
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        json: bool,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.get(url).query(query);
        if json {
            request = request.header(reqwest::header::ACCEPT, "application/json");
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl RemoteSource for ApiClient {
    async fn fetch_json(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<serde_json::Value> {
        let body = self.get(url, query, true).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| Error::malformed(url, e.to_string()))
    }

    async fn open_stream(&self, url: &str) -> Result<ByteStream> {
        let response = self.get(url, &[], false).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::from))
            .boxed())
    }
}

/// A paginated listing: where to fetch it and which field holds the records
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    /// Endpoint URL without paging parameters
    pub url: String,
    /// Fixed query parameters (e.g. `site_id`)
    pub query: Query,
    /// JSON field of the response holding the record array
    pub items_field: &'static str,
}

impl Listing {
    /// Full query for one page: fixed parameters plus `size` and `page`
    pub fn page_query(&self, page: usize, size: usize) -> Query {
        let mut query = self.query.clone();
        query.push(("size", size.to_string()));
        query.push(("page", page.to_string()));
        query
    }
}

/// Listing and lookup URLs of one account
#[derive(Clone, Debug)]
pub struct Endpoints {
    base: String,
    site_id: String,
    collection_id: Option<String>,
}

impl Endpoints {
    /// Endpoints of `account` under the API rooted at `base_url`
    pub fn new(base_url: &str, account: &Account) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
            site_id: account.site_id.clone(),
            collection_id: account.collection_id.clone(),
        }
    }

    /// `medias?site_id=…`, records under `media`
    pub fn media(&self) -> Listing {
        Listing {
            url: format!("{}/medias", self.base),
            query: vec![("site_id", self.site_id.clone())],
            items_field: "media",
        }
    }

    /// `collections/{collection_id}/medias`, records under `medias`
    pub fn collection(&self) -> Result<Listing> {
        let collection_id = self
            .collection_id
            .as_deref()
            .ok_or_else(|| Error::config("collection_id", "account has no collection id"))?;
        Ok(Listing {
            url: format!("{}/collections/{}/medias", self.base, collection_id),
            query: Vec::new(),
            items_field: "medias",
        })
    }

    /// `articles?site_id=…`, records under `articles`
    pub fn journal(&self) -> Listing {
        Listing {
            url: format!("{}/articles", self.base),
            query: vec![("site_id", self.site_id.clone())],
            items_field: "articles",
        }
    }

    /// `sites/{site_id}`
    pub fn profile(&self) -> String {
        format!("{}/sites/{}", self.base, self.site_id)
    }
}

/// Take the record array named by `listing.items_field` out of a page
///
/// A `null` field counts as an empty page.
pub fn page_records(listing: &Listing, page: serde_json::Value) -> Result<Vec<serde_json::Value>> {
    let field = match page {
        serde_json::Value::Object(mut map) => map.remove(listing.items_field),
        _ => {
            return Err(Error::malformed(&listing.url, "page is not a JSON object"));
        }
    };
    match field {
        Some(serde_json::Value::Array(records)) => Ok(records),
        Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(_) => Err(Error::malformed(
            &listing.url,
            format!("field `{}` is not an array", listing.items_field),
        )),
        None => Err(Error::malformed(
            &listing.url,
            format!("missing field `{}`", listing.items_field),
        )),
    }
}
