//! Utility functions for paths, URLs and file writes

use crate::error::{Error, Result};
use crate::types::ItemKind;
use std::path::{Path, PathBuf};

/// Suffix of in-progress downloads; renamed away once the body is complete
pub const PARTIAL_SUFFIX: &str = "part";

/// Turn a scheme-less media URL from the API (`im.vsco.co/...`) into an absolute one
///
/// # Examples
///
/// ```
/// use vsco_dl::utils::absolute_media_url;
///
/// assert_eq!(absolute_media_url("im.vsco.co/a.jpg"), "http://im.vsco.co/a.jpg");
/// assert_eq!(absolute_media_url("//im.vsco.co/a.jpg"), "http://im.vsco.co/a.jpg");
/// assert_eq!(absolute_media_url("https://im.vsco.co/a.jpg"), "https://im.vsco.co/a.jpg");
/// ```
pub fn absolute_media_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else if let Some(rest) = raw.strip_prefix("//") {
        format!("http://{rest}")
    } else {
        format!("http://{raw}")
    }
}

/// Validate a server-supplied name (journal permalink) for use as one path component
///
/// Rejects empty names, `.`/`..`, and anything containing a path separator or NUL.
pub fn safe_path_component(name: &str) -> Option<&str> {
    let name = name.trim();
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return None;
    }
    Some(name)
}

/// Render a JSON id (string or number) as a string; `null` and other shapes yield `None`
pub fn json_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// File names that count as "already have" for an item of this kind
///
/// Images and videos share an identity space, so either extension satisfies a media item.
pub fn presence_names(id: &str, kind: &ItemKind) -> Vec<String> {
    match kind {
        ItemKind::Image { .. } | ItemKind::Video { .. } => {
            vec![format!("{id}.jpg"), format!("{id}.mp4")]
        }
        ItemKind::Text { .. } => vec![format!("{id}.txt")],
    }
}

/// Whether any file in `names` exists in `dir`
pub async fn any_exists(dir: &Path, names: &[String]) -> bool {
    for name in names {
        if tokio::fs::try_exists(dir.join(name)).await.unwrap_or(false) {
            return true;
        }
    }
    false
}

/// Temporary sibling of `path` used while streaming, e.g. `123.mp4.part`
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Create `dir` and its parents
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::filesystem(dir, e))
}

/// Write `bytes` to a temporary sibling of `path`, then rename it into place
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent).await?;
    }
    let tmp = partial_path(path);
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| Error::filesystem(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::filesystem(path, e))
}
