//! Shapes of the JSON records returned by the listing endpoints, and their
//! conversion into [`WorkItem`]s.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{ItemId, ItemKind, WorkItem};
use crate::utils::{absolute_media_url, json_id, safe_path_component};

/// One entry of the media or collection listing
#[derive(Clone, Debug, Deserialize)]
pub struct MediaRecord {
    /// Upload time in milliseconds since the epoch
    pub upload_date: i64,
    /// Server flag separating videos from images
    #[serde(default)]
    pub is_video: bool,
    /// Scheme-less image URL
    #[serde(default)]
    pub responsive_url: Option<String>,
    /// Scheme-less video URL
    #[serde(default)]
    pub video_url: Option<String>,
}

impl MediaRecord {
    /// Parse a raw listing record; `context` names the listing for error messages
    pub fn parse(record: Value, context: &str) -> Result<Self> {
        serde_json::from_value(record).map_err(|e| Error::malformed(context, e.to_string()))
    }

    /// Identity derived from the upload timestamp
    pub fn id(&self) -> ItemId {
        ItemId::from_upload_date(self.upload_date)
    }

    /// Classify as Image or Video by `is_video`
    pub fn into_work_item(self, context: &str) -> Result<WorkItem> {
        let id = self.id();
        let kind = media_kind(
            self.is_video,
            self.responsive_url.as_deref(),
            self.video_url.as_deref(),
        )
        .ok_or_else(|| Error::malformed(context, format!("item {id} has no source URL")))?;
        Ok(WorkItem::new(id, kind))
    }
}

/// A journal article: its permalink and ordered body blocks
#[derive(Clone, Debug, Deserialize)]
pub struct ArticleRecord {
    /// Slug used as the article's directory name
    pub permalink: String,
    /// Content blocks in display order
    #[serde(default)]
    pub body: Vec<BodyBlock>,
}

/// One block of a journal article body
///
/// `content` is an array holding one media object for `image`/`video` blocks and a
/// plain string for `text` blocks.
#[derive(Clone, Debug, Deserialize)]
pub struct BodyBlock {
    /// Block type (`image`, `video`, `text`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-dependent payload
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Deserialize)]
struct JournalMedia {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    responsive_url: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
}

impl BodyBlock {
    /// Convert to a work item filed under `permalink`
    ///
    /// Returns `Ok(None)` for block types that carry nothing to save (and for empty text).
    pub fn into_work_item(self, permalink: &str) -> Result<Option<WorkItem>> {
        let (id, kind) = match self.kind.as_str() {
            "image" | "video" => {
                let media = first_media(self.content, permalink)?;
                let id = json_id(&media.id).ok_or_else(|| {
                    Error::malformed(permalink, format!("{} block without id", self.kind))
                })?;
                let id = file_stem(&id, permalink)?;
                let kind = media_kind(
                    self.kind == "video",
                    media.responsive_url.as_deref(),
                    media.video_url.as_deref(),
                )
                .ok_or_else(|| {
                    Error::malformed(permalink, format!("item {id} has no source URL"))
                })?;
                (ItemId(id), kind)
            }
            "text" => {
                let Value::String(content) = self.content else {
                    return Err(Error::malformed(permalink, "text block content is not a string"));
                };
                if content.trim().is_empty() {
                    return Ok(None);
                }
                (ItemId::from_text(permalink, &content), ItemKind::Text { content })
            }
            other => {
                tracing::debug!(permalink, block_type = other, "Ignoring journal block");
                return Ok(None);
            }
        };
        Ok(Some(WorkItem {
            id,
            kind,
            group: Some(permalink.to_string()),
        }))
    }
}

fn first_media(content: Value, permalink: &str) -> Result<JournalMedia> {
    let first = match content {
        Value::Array(items) => items.into_iter().next(),
        _ => None,
    }
    .ok_or_else(|| Error::malformed(permalink, "media block has no content"))?;
    serde_json::from_value(first).map_err(|e| Error::malformed(permalink, e.to_string()))
}

/// Envelope of `sites/{site_id}`
#[derive(Clone, Debug, Deserialize)]
pub struct SiteEnvelope {
    /// The site record
    pub site: SiteRecord,
}

/// Profile fields of a site
#[derive(Clone, Debug, Deserialize)]
pub struct SiteRecord {
    /// Id of the current profile picture; `null` when none is set
    #[serde(default)]
    pub profile_image_id: Value,
    /// Scheme-less URL of the current profile picture
    #[serde(default)]
    pub responsive_url: Option<String>,
}

impl SiteRecord {
    /// The profile picture as an Image item, or `None` if the account has none
    pub fn into_work_item(self, context: &str) -> Result<Option<WorkItem>> {
        let Some(id) = json_id(&self.profile_image_id) else {
            return Ok(None);
        };
        let id = file_stem(&id, context)?;
        let url = self
            .responsive_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::malformed(context, "profile image has no URL"))?;
        Ok(Some(WorkItem::new(
            ItemId(id),
            ItemKind::Image {
                url: absolute_media_url(&url),
            },
        )))
    }
}

/// A server id that is about to become a file name
fn file_stem(id: &str, context: &str) -> Result<String> {
    safe_path_component(id)
        .map(str::to_string)
        .ok_or_else(|| Error::malformed(context, format!("id {id:?} is not usable as a file name")))
}

fn media_kind(
    is_video: bool,
    image_url: Option<&str>,
    video_url: Option<&str>,
) -> Option<ItemKind> {
    let pick = |url: Option<&str>| {
        url.map(str::trim)
            .filter(|u| !u.is_empty())
            .map(absolute_media_url)
    };
    if is_video {
        pick(video_url).map(|url| ItemKind::Video { url })
    } else {
        pick(image_url).map(|url| ItemKind::Image { url })
    }
}
