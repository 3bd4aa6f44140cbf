use async_trait::async_trait;

use crate::{errors::ProviderError, registry::ProviderDescriptor};

use super::Shortener;

/// TinyURL-style API: `GET endpoint?url=...` answers with the short link as
/// plain text.
#[derive(Clone, Debug)]
pub struct SimpleRedirectShortener {
    descriptor: ProviderDescriptor,
    http: reqwest::Client,
}

impl SimpleRedirectShortener {
    pub fn new(descriptor: ProviderDescriptor, http: reqwest::Client) -> Self {
        Self { descriptor, http }
    }
}

#[async_trait]
impl Shortener for SimpleRedirectShortener {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn shorten(&self, url: &str) -> Result<String, ProviderError> {
        let resp = self
            .http
            .get(self.descriptor.endpoint.clone())
            .query(&[("url", url)])
            .send()
            .await?
            .error_for_status()?;

        let body = resp.text().await?;
        parse_body(&body)
    }
}

fn parse_body(body: &str) -> Result<String, ProviderError> {
    let short = body.trim();
    if short.is_empty() {
        return Err(ProviderError::EmptyBody);
    }
    let parsed = reqwest::Url::parse(short)
        .map_err(|_| ProviderError::Malformed(truncate(short, 120)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ProviderError::Malformed(truncate(short, 120)));
    }
    Ok(short.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
