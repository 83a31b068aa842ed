//! Profile picture pipeline: a single-item harvest keyed by the profile image id.

use crate::client::records::SiteEnvelope;
use crate::error::{Error, Result};
use crate::harvest::admit;
use crate::pool::download_items;
use crate::retry::fetch_with_retry;
use crate::types::{Account, Category, CategoryReport, Event};

use super::VscoDownloader;

impl VscoDownloader {
    /// Save the account's current profile picture into `profile/`, if it is new
    pub async fn download_profile(&self, account: &Account) -> Result<CategoryReport> {
        let dest = self.category_dir(account, Category::Profile)?;
        let ctx = self.context(account, Category::Profile);
        ctx.emit(Event::HarvestStarted {
            account: ctx.account.clone(),
            category: ctx.category,
        });

        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let url = self.endpoints(account).profile();
        let doc = fetch_with_retry(&ctx.retry, &ctx.cancel, || ctx.source.fetch_json(&url, &[]))
            .await?;
        let envelope: SiteEnvelope =
            serde_json::from_value(doc).map_err(|e| Error::malformed(&url, e.to_string()))?;

        let mut report = CategoryReport::default();
        let mut items = Vec::new();
        if let Some(item) = envelope.site.into_work_item(&url)? {
            if admit(&ctx, &dest, &item).await {
                items.push(item);
            } else {
                report.skipped += 1;
            }
        } else {
            tracing::debug!(account = %ctx.account, "Account has no profile picture");
        }

        ctx.emit(Event::HarvestComplete {
            account: ctx.account.clone(),
            category: ctx.category,
            queued: items.len(),
            skipped: report.skipped,
        });

        let downloaded = download_items(
            &ctx,
            items,
            &dest,
            self.config.download.max_concurrent_downloads,
        )
        .await;
        report.merge(downloaded);

        Ok(self.finish(&ctx, report))
    }
}
