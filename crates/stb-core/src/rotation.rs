//! Provider rotation and failover.
//!
//! The cursor lives in the store and is re-read before every attempt; the
//! controller keeps no copy of it between calls.

use std::sync::Arc;

use crate::{
    errors::{Error, ProviderError},
    registry::ProviderDescriptor,
    shortener::Shortener,
    store::Store,
    Result,
};

/// Result of a successful failover cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shortened {
    pub short_url: String,
    pub provider_index: usize,
    pub provider_name: String,
}

pub struct RotationController {
    store: Arc<Store>,
    shorteners: Vec<Arc<dyn Shortener>>,
}

impl RotationController {
    /// `shorteners` must be non-empty and ordered like the provider registry.
    pub fn new(store: Arc<Store>, shorteners: Vec<Arc<dyn Shortener>>) -> Result<Self> {
        if shorteners.is_empty() {
            return Err(Error::Config(
                "at least one shortener provider must be configured".to_string(),
            ));
        }
        store.normalize_cursor(shorteners.len())?;
        Ok(Self { store, shorteners })
    }

    pub fn count(&self) -> usize {
        self.shorteners.len()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// The provider the cursor currently selects.
    pub fn current(&self) -> Result<(usize, &ProviderDescriptor)> {
        let index = self.store.current_index()? % self.count();
        Ok((index, self.shorteners[index].descriptor()))
    }

    /// Shorten `url` with the current provider, moving on to the next one on
    /// every provider failure. At most `count()` attempts, each provider at
    /// most once; the cursor is left on the provider that succeeded.
    pub async fn shorten_with_failover(&self, url: &str) -> Result<Shortened> {
        let n = self.count();
        let mut tried = vec![false; n];
        let mut attempts = 0usize;

        while attempts < n {
            let cursor = self.store.current_index()? % n;
            // A concurrent rotation may have pointed the cursor back at a
            // provider this call already tried; take the next untried one.
            let index = next_untried(&tried, cursor);
            tried[index] = true;
            attempts += 1;

            let shortener = &self.shorteners[index];
            let name = &shortener.descriptor().name;
            tracing::debug!(provider = %name, index, attempt = attempts, "shortening");

            match shortener.shorten(url).await {
                Ok(short_url) => {
                    tracing::info!(provider = %name, index, attempts, "shortened");
                    return Ok(Shortened {
                        short_url,
                        provider_index: index,
                        provider_name: name.clone(),
                    });
                }
                Err(e) => {
                    let next = self.store.advance_cursor_from(index, n)?;
                    log_provider_failure(name, index, next, &e);
                }
            }
        }

        tracing::warn!(attempts, "all shorteners failed");
        Err(Error::AllProvidersFailed { attempts })
    }

    /// Operator-triggered switch to the next provider, regardless of health.
    /// Callers are expected to have checked authorization already.
    pub fn rotate_manually(&self) -> Result<(usize, Arc<dyn Shortener>)> {
        let index = self.store.advance_cursor(self.count())?;
        let shortener = self.shorteners[index].clone();
        tracing::info!(provider = %shortener.descriptor().name, index, "rotated provider");
        Ok((index, shortener))
    }
}

fn next_untried(tried: &[bool], from: usize) -> usize {
    let n = tried.len();
    (0..n)
        .map(|step| (from + step) % n)
        .find(|&i| !tried[i])
        .unwrap_or(from)
}

fn log_provider_failure(name: &str, index: usize, next: usize, e: &ProviderError) {
    tracing::warn!(provider = %name, index, next, error = %e, "shortener failed, rotating");
}
