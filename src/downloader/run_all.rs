//! Every category of one account, in a fixed order.

use crate::types::{Account, AccountReport, Category};

use super::VscoDownloader;

impl VscoDownloader {
    /// Run images, collection and journal (then the profile picture if asked)
    ///
    /// Categories are isolated: a category that aborts is logged and recorded in
    /// [`AccountReport::errors`], and the next one still runs. The collection is
    /// skipped when the account has no collection id. Stops early once cancelled.
    pub async fn download_all(&self, account: &Account, include_profile: bool) -> AccountReport {
        let mut categories = vec![Category::Images, Category::Collection, Category::Journal];
        if include_profile {
            categories.push(Category::Profile);
        }
        self.download_categories(account, &categories).await
    }

    /// Run `categories` for `account` in the given order, each isolated from the others
    pub async fn download_categories(
        &self,
        account: &Account,
        categories: &[Category],
    ) -> AccountReport {
        let mut report = AccountReport::new(account.username.clone());

        for &category in categories {
            if self.cancel.is_cancelled() {
                tracing::info!(
                    account = %account.username,
                    %category,
                    "Cancelled, not starting category"
                );
                break;
            }
            if category == Category::Collection && account.collection_id.is_none() {
                tracing::debug!(
                    account = %account.username,
                    "No collection id, skipping collection"
                );
                continue;
            }

            match self.download(account, category).await {
                Ok(category_report) => {
                    report.categories.insert(category, category_report);
                }
                Err(e) => {
                    tracing::error!(
                        account = %account.username,
                        %category,
                        error = %e,
                        "Category aborted"
                    );
                    report.errors.insert(category, e.to_string());
                }
            }
        }

        report
    }
}
