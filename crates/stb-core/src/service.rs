//! Application layer driven by the chat transport.

use std::sync::Arc;

use crate::{
    bulk::{reshorten_all, BulkReport},
    domain::{LinkRecord, UserId},
    errors::Error,
    rotation::{RotationController, Shortened},
    store::Store,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortenOutcome {
    pub record: LinkRecord,
    pub provider_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationReport {
    pub provider_index: usize,
    pub provider_name: String,
    pub bulk: BulkReport,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusReport {
    pub provider_index: usize,
    pub provider_name: String,
    pub provider_count: usize,
    pub link_count: usize,
}

pub struct LinkService {
    owner_id: UserId,
    rotation: RotationController,
}

impl LinkService {
    pub fn new(owner_id: UserId, rotation: RotationController) -> Self {
        Self { owner_id, rotation }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        user == self.owner_id
    }

    fn store(&self) -> &Arc<Store> {
        self.rotation.store()
    }

    /// Shorten `url` for `requester` (with failover) and persist the mapping.
    pub async fn shorten(&self, requester: UserId, url: &str) -> Result<ShortenOutcome> {
        let url = validate_url(url)?;
        let Shortened {
            short_url,
            provider_name,
            ..
        } = self.rotation.shorten_with_failover(&url).await?;

        let record = self.store().insert_link(requester, &url, &short_url)?;
        tracing::info!(
            requester = requester.0,
            id = record.id.0,
            provider = %provider_name,
            "link stored"
        );
        Ok(ShortenOutcome {
            record,
            provider_name,
        })
    }

    /// Owner-only: switch to the next provider and re-shorten every stored link
    /// with it. Non-owners get `Error::Unauthorized` and nothing changes.
    pub async fn rotate(&self, requester: UserId) -> Result<RotationReport> {
        if !self.is_owner(requester) {
            tracing::warn!(requester = requester.0, "unauthorized rotate attempt");
            return Err(Error::Unauthorized);
        }

        let (provider_index, shortener) = self.rotation.rotate_manually()?;
        let bulk = reshorten_all(self.store(), shortener.as_ref()).await?;

        Ok(RotationReport {
            provider_index,
            provider_name: shortener.descriptor().name.clone(),
            bulk,
        })
    }

    pub fn status(&self) -> Result<StatusReport> {
        let (provider_index, descriptor) = self.rotation.current()?;
        Ok(StatusReport {
            provider_index,
            provider_name: descriptor.name.clone(),
            provider_count: self.rotation.count(),
            link_count: self.store().link_count()?,
        })
    }

    pub fn recent_links(&self, requester: UserId, limit: usize) -> Result<Vec<LinkRecord>> {
        self.store().links_for(requester, limit)
    }
}

/// Accept only absolute http(s) URLs; returns the trimmed input.
pub fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty".to_string()));
    }
    let parsed =
        reqwest::Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Error::InvalidUrl(format!(
            "{trimmed}: only http(s) links can be shortened"
        )));
    }
    Ok(trimmed.to_string())
}
