//! Media and collection pipelines: striped harvest, then the download pool.

use crate::client::Listing;
use crate::error::Result;
use crate::harvest::harvest;
use crate::pool::download_items;
use crate::types::{Account, Category, CategoryReport};
use crate::utils::ensure_dir;

use super::VscoDownloader;

impl VscoDownloader {
    /// Mirror the account's own posts into its root directory
    ///
    /// # Errors
    ///
    /// Only setup failures (unusable username, account root cannot be created) are
    /// returned. Page and item failures are recorded in the report.
    pub async fn download_images(&self, account: &Account) -> Result<CategoryReport> {
        let listing = self.endpoints(account).media();
        self.harvest_and_download(account, Category::Images, listing)
            .await
    }

    /// Mirror the account's collection into `collection/`
    ///
    /// Requires `account.collection_id`.
    pub async fn download_collection(&self, account: &Account) -> Result<CategoryReport> {
        let listing = self.endpoints(account).collection()?;
        self.harvest_and_download(account, Category::Collection, listing)
            .await
    }

    async fn harvest_and_download(
        &self,
        account: &Account,
        category: Category,
        listing: Listing,
    ) -> Result<CategoryReport> {
        let dest = self.category_dir(account, category)?;
        ensure_dir(&dest).await?;

        let ctx = self.context(account, category);
        let outcome = harvest(&ctx, &listing, &dest, &self.config.harvest).await;

        let mut report = download_items(
            &ctx,
            outcome.items,
            &dest,
            self.config.download.max_concurrent_downloads,
        )
        .await;
        report.skipped += outcome.skipped;
        report.malformed += outcome.malformed;
        report.stripe_failures = outcome.stripe_failures;

        Ok(self.finish(&ctx, report))
    }
}
