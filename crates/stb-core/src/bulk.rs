//! Bulk re-shortening of every stored link through one provider.

use crate::{shortener::Shortener, store::Store, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: usize,
    pub total: usize,
}

impl BulkReport {
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }
}

/// Re-run every stored original URL through `shortener` and store the new
/// short link. A provider failure skips that record; the run never rotates
/// or retries. Store failures abort the run.
pub async fn reshorten_all(store: &Store, shortener: &dyn Shortener) -> Result<BulkReport> {
    let provider = shortener.descriptor().name.as_str();
    let records = store.all_links()?;
    let mut report = BulkReport {
        succeeded: 0,
        total: records.len(),
    };

    tracing::info!(provider, total = report.total, "re-shortening stored links");

    for record in records {
        match shortener.shorten(&record.original_url).await {
            Ok(short_url) => {
                if store.update_short_url(record.id, &short_url)? {
                    report.succeeded += 1;
                } else {
                    tracing::warn!(id = record.id.0, "link vanished during re-shortening");
                }
            }
            Err(e) => {
                tracing::warn!(provider, id = record.id.0, error = %e, "re-shortening skipped");
            }
        }
    }

    tracing::info!(
        provider,
        succeeded = report.succeeded,
        total = report.total,
        "re-shortening finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::UserId, rotation::tests::FakeShortener};

    #[tokio::test]
    async fn empty_store_reports_zero() {
        let store = Store::open_in_memory().unwrap();
        let fake = FakeShortener::ok("A");
        let report = reshorten_all(&store, fake.as_ref()).await.unwrap();
        assert_eq!(report, BulkReport::default());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn partial_success_updates_only_successful_records() {
        let store = Store::open_in_memory().unwrap();
        let urls = [
            "https://a.test/1",
            "https://b.test/22",
            "https://c.test/333",
            "https://d.test/4444",
        ];
        let originals: Vec<_> = urls
            .iter()
            .map(|u| store.insert_link(UserId(1), u, "old").unwrap())
            .collect();

        let fake = FakeShortener::failing_for("B", &[urls[1], urls[3]]);
        let report = reshorten_all(&store, fake.as_ref()).await.unwrap();

        assert_eq!(report, BulkReport { succeeded: 2, total: 4 });
        assert_eq!(report.failed(), 2);
        assert_eq!(fake.seen(), urls.to_vec());

        let after = store.all_links().unwrap();
        for (before, now) in originals.iter().zip(&after) {
            assert_eq!(before.id, now.id);
            assert_eq!(before.original_url, now.original_url);
            if now.original_url == urls[1] || now.original_url == urls[3] {
                assert_eq!(now.short_url, "old");
            } else {
                assert_eq!(now.short_url, FakeShortener::short_for("B", &now.original_url));
            }
        }
    }

    #[tokio::test]
    async fn does_not_touch_the_cursor() {
        let store = Store::open_in_memory().unwrap();
        store.set_current_index(1).unwrap();
        store.insert_link(UserId(1), "https://a.test", "old").unwrap();

        let fake = FakeShortener::failing("A");
        let report = reshorten_all(&store, fake.as_ref()).await.unwrap();
        assert_eq!(report, BulkReport { succeeded: 0, total: 1 });
        assert_eq!(fake.calls(), 1);
        assert_eq!(store.current_index().unwrap(), 1);
    }
}
