//! Shortening clients: one `Shortener` implementation per provider kind.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    errors::{Error, ProviderError},
    registry::{ProviderDescriptor, ProviderKind, ProviderRegistry},
    Result,
};

mod keyed_status;
mod simple_redirect;

pub use keyed_status::KeyedStatusShortener;
pub use simple_redirect::SimpleRedirectShortener;

/// Outbound call timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A single third-party shortening provider.
#[async_trait]
pub trait Shortener: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    async fn shorten(&self, url: &str) -> std::result::Result<String, ProviderError>;
}

/// Build one client per registry entry, preserving registry order.
pub fn build_all(registry: &ProviderRegistry, timeout: Duration) -> Result<Vec<Arc<dyn Shortener>>> {
    let http = http_client(timeout)?;
    let shorteners = registry
        .iter()
        .map(|d| build(d.clone(), http.clone()))
        .collect();
    Ok(shorteners)
}

pub fn build(descriptor: ProviderDescriptor, http: reqwest::Client) -> Arc<dyn Shortener> {
    match descriptor.kind {
        ProviderKind::SimpleRedirect => Arc::new(SimpleRedirectShortener::new(descriptor, http)),
        ProviderKind::KeyedStatus { .. } => Arc::new(KeyedStatusShortener::new(descriptor, http)),
    }
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("stb-rust/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("failed to build http client: {e}")))
}
