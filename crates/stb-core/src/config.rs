use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    domain::UserId, errors::Error, registry::ProviderRegistry, shortener::DEFAULT_TIMEOUT, Result,
};

/// Typed bot configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// The only user allowed to run `/rotate`.
    pub owner_id: UserId,
    pub db_path: PathBuf,
    pub shorteners_file: PathBuf,
    pub registry: ProviderRegistry,
    pub provider_timeout: Duration,
    pub links_page_size: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let owner_id = parse_owner_id(env_str("BOT_OWNER_ID"))?;

        let db_path = env_path("DB_PATH").unwrap_or_else(|| PathBuf::from("bot_data.db"));
        let shorteners_file =
            env_path("SHORTENERS_FILE").unwrap_or_else(|| PathBuf::from("shorteners.json"));
        let registry = ProviderRegistry::load(&shorteners_file)?;

        let provider_timeout = parse_timeout(env_str("PROVIDER_TIMEOUT_MS"));
        let links_page_size = env_usize("LINKS_PAGE_SIZE").unwrap_or(10).clamp(1, 50);

        Ok(Self {
            telegram_bot_token,
            owner_id,
            db_path,
            shorteners_file,
            registry,
            provider_timeout,
            links_page_size,
        })
    }
}

fn parse_owner_id(raw: Option<String>) -> Result<UserId> {
    let raw = raw.and_then(non_empty).ok_or_else(|| {
        Error::Config("BOT_OWNER_ID environment variable is required".to_string())
    })?;
    raw.trim()
        .parse::<i64>()
        .map(UserId)
        .map_err(|_| Error::Config(format!("BOT_OWNER_ID must be an integer, got {raw:?}")))
}

/// Milliseconds; unset, unparsable or zero falls back to `DEFAULT_TIMEOUT`.
fn parse_timeout(raw: Option<String>) -> Duration {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TIMEOUT)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_id_must_be_present_and_numeric() {
        assert_eq!(parse_owner_id(Some(" 23810894 ".to_string())).unwrap(), UserId(23810894));
        assert!(matches!(parse_owner_id(None), Err(Error::Config(_))));
        assert!(matches!(
            parse_owner_id(Some("  ".to_string())),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_owner_id(Some("admin".to_string())),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn provider_timeout_defaults_to_ten_seconds() {
        assert_eq!(parse_timeout(None), Duration::from_secs(10));
        assert_eq!(parse_timeout(Some("0".to_string())), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("soon".to_string())), DEFAULT_TIMEOUT);
        assert_eq!(
            parse_timeout(Some(" 2500 ".to_string())),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn dotenv_parsing_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# comment\n\
             TELEGRAM_BOT_TOKEN=\"123:abc\"\n\
             export BOT_OWNER_ID=42\n\
             \n\
             NOT_A_PAIR\n\
             DB_PATH='/var/lib/stb/bot.db'\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "123:abc".to_string()),
                ("BOT_OWNER_ID".to_string(), "42".to_string()),
                ("DB_PATH".to_string(), "/var/lib/stb/bot.db".to_string()),
            ]
        );
    }
}
