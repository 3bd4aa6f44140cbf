use std::{env, path::Path};

use serde::Deserialize;

use crate::{errors::Error, Result};

/// Status code Cutt.ly reports for a successfully shortened link.
pub const DEFAULT_KEYED_SUCCESS_STATUS: i64 = 7;

/// Request/response protocol spoken by a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    /// `GET endpoint?url=<url>`; the trimmed body is the short link.
    SimpleRedirect,
    /// `GET endpoint?key=<credential>&short=<url>`; JSON reply carrying a
    /// status code, where `success_status` marks success.
    KeyedStatus { success_status: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: String,
    pub kind: ProviderKind,
    pub endpoint: reqwest::Url,
    pub credential: Option<String>,
}

/// Ordered, fixed list of providers. Never empty.
#[derive(Clone, Debug)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<ProviderDescriptor>) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::Config(
                "at least one shortener provider must be configured".to_string(),
            ));
        }
        for p in &providers {
            if p.name.trim().is_empty() {
                return Err(Error::Config("provider name must not be empty".to_string()));
            }
            if matches!(p.kind, ProviderKind::KeyedStatus { .. })
                && p.credential.as_deref().map_or(true, |k| k.trim().is_empty())
            {
                return Err(Error::Config(format!(
                    "provider {:?} requires an api_key",
                    p.name
                )));
            }
        }
        Ok(Self { providers })
    }

    /// Load the registry from a JSON file, expanding `${VAR}` placeholders.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read shorteners file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("invalid shorteners json: {e}")))?;
        let entries: Vec<RawProvider> = serde_json::from_value(interpolate_env(value))
            .map_err(|e| Error::Config(format!("invalid shorteners json: {e}")))?;

        let providers = entries
            .into_iter()
            .map(RawProvider::into_descriptor)
            .collect::<Result<Vec<_>>>()?;
        Self::new(providers)
    }

    pub fn count(&self) -> usize {
        self.providers.len()
    }

    pub fn get(&self, index: usize) -> Option<&ProviderDescriptor> {
        self.providers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.iter()
    }
}

#[derive(Debug, Deserialize)]
struct RawProvider {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    api_endpoint: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    success_status: Option<i64>,
}

impl RawProvider {
    fn into_descriptor(self) -> Result<ProviderDescriptor> {
        let kind = match self.kind.trim().to_lowercase().as_str() {
            "tinyurl" | "simple_redirect" => ProviderKind::SimpleRedirect,
            "cuttly" | "keyed_status" => ProviderKind::KeyedStatus {
                success_status: self.success_status.unwrap_or(DEFAULT_KEYED_SUCCESS_STATUS),
            },
            other => {
                return Err(Error::Config(format!(
                    "provider {:?}: unsupported type {other:?}",
                    self.name
                )))
            }
        };

        let endpoint = reqwest::Url::parse(self.api_endpoint.trim()).map_err(|e| {
            Error::Config(format!(
                "provider {:?}: invalid api_endpoint {:?}: {e}",
                self.name, self.api_endpoint
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "provider {:?}: api_endpoint must be http(s)",
                self.name
            )));
        }

        let credential = self.api_key.filter(|k| !k.trim().is_empty());

        Ok(ProviderDescriptor {
            name: self.name,
            kind,
            endpoint,
            credential,
        })
    }
}

fn interpolate_env(v: serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::String(s) => serde_json::Value::String(interpolate_env_str(&s)),
        serde_json::Value::Array(xs) => {
            serde_json::Value::Array(xs.into_iter().map(interpolate_env).collect())
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, interpolate_env(v)))
                .collect(),
        ),
        other => other,
    }
}

/// `${VAR}` expansion without defaults. Unset vars become empty.
fn interpolate_env_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + end];
        out.push_str(&env::var(name).unwrap_or_default());
        rest = &rest[start + 2 + end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[
  { "name": "TinyURL", "type": "tinyurl", "api_endpoint": "http://tinyurl.com/api-create.php" },
  { "name": "Cuttly", "type": "cuttly", "api_endpoint": "https://cutt.ly/api/api.php", "api_key": "k-123" }
]
"#;

    #[test]
    fn parses_ordered_registry() {
        let reg = ProviderRegistry::from_json(SAMPLE).unwrap();
        assert_eq!(reg.count(), 2);

        let first = reg.get(0).unwrap();
        assert_eq!(first.name, "TinyURL");
        assert_eq!(first.kind, ProviderKind::SimpleRedirect);
        assert!(first.credential.is_none());

        let second = reg.get(1).unwrap();
        assert_eq!(second.name, "Cuttly");
        assert_eq!(
            second.kind,
            ProviderKind::KeyedStatus {
                success_status: DEFAULT_KEYED_SUCCESS_STATUS
            }
        );
        assert_eq!(second.credential.as_deref(), Some("k-123"));
        assert!(reg.get(2).is_none());
    }

    #[test]
    fn empty_registry_is_config_error() {
        let err = ProviderRegistry::from_json("[]").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_kind_is_config_error() {
        let raw = r#"[{ "name": "Cuty", "type": "cuty", "api_endpoint": "https://api.cuty.io/full", "api_key": "x" }]"#;
        match ProviderRegistry::from_json(raw) {
            Err(Error::Config(msg)) => assert!(msg.contains("cuty")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn keyed_provider_without_key_is_config_error() {
        let raw = r#"[{ "name": "Cuttly", "type": "cuttly", "api_endpoint": "https://cutt.ly/api/api.php" }]"#;
        assert!(matches!(
            ProviderRegistry::from_json(raw),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn malformed_endpoint_is_config_error() {
        let raw = r#"[{ "name": "Bad", "type": "tinyurl", "api_endpoint": "not a url" }]"#;
        assert!(matches!(
            ProviderRegistry::from_json(raw),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn custom_success_status_is_kept() {
        let raw = r#"[{ "name": "K", "type": "keyed_status", "api_endpoint": "https://k.test/api", "api_key": "k", "success_status": 1 }]"#;
        let reg = ProviderRegistry::from_json(raw).unwrap();
        assert_eq!(
            reg.get(0).unwrap().kind,
            ProviderKind::KeyedStatus { success_status: 1 }
        );
    }

    #[test]
    fn expands_env_placeholders_in_credentials() {
        let key = format!("STB_TEST_CUTTLY_KEY_{}", std::process::id());
        env::set_var(&key, "secret-1");

        let raw = format!(
            r#"[{{ "name": "Cuttly", "type": "cuttly", "api_endpoint": "https://cutt.ly/api/api.php", "api_key": "${{{key}}}" }}]"#
        );
        let reg = ProviderRegistry::from_json(&raw).unwrap();
        assert_eq!(reg.get(0).unwrap().credential.as_deref(), Some("secret-1"));

        env::remove_var(&key);
    }

    #[test]
    fn unset_placeholder_expands_to_empty() {
        assert_eq!(
            interpolate_env_str("a${STB_SURELY_UNSET_VAR_XYZ}b"),
            "ab".to_string()
        );
        assert_eq!(interpolate_env_str("no vars"), "no vars");
        assert_eq!(interpolate_env_str("dangling ${oops"), "dangling ${oops");
    }
}
