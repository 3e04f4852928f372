use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Names a TOML file whose values sit underneath the environment.
pub const CONFIG_PATH_VAR: &str = "SHORTLINK_BOT_CONFIG";

pub const DEFAULT_BITLY_BASE_URL: &str = "https://api-ssl.bitly.com/v4";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub bitly: BitlyConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Empty means every user is served.
    pub allowed_user_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitlyConfig {
    pub api_token: String,
    pub api_base_url: String,
    /// Branded short domain, e.g. "bit.ly" or a custom one.
    pub domain: Option<String>,
    pub group_guid: Option<String>,
}

/// On-disk shape; every key is optional so the environment can fill the gaps.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    telegram: FileTelegram,
    #[serde(default)]
    bitly: FileBitly,
}

#[derive(Debug, Deserialize, Default)]
struct FileTelegram {
    bot_token: Option<String>,
    #[serde(default)]
    allowed_user_ids: Vec<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct FileBitly {
    api_token: Option<String>,
    api_base_url: Option<String>,
    domain: Option<String>,
    group_guid: Option<String>,
}

impl Config {
    /// Load `.env`, the optional TOML file and the process environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let file = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Some(read_file(Path::new(&path))?),
            _ => None,
        };

        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build a config from TOML text and an environment lookup. Environment wins.
    pub fn from_sources<F>(file: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match file {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => FileConfig::default(),
        };

        let lookup = |key: &str, fallback: Option<String>| {
            non_empty(env(key)).or_else(|| non_empty(fallback))
        };

        let bot_token = lookup("TELEGRAM_API_TOKEN", file.telegram.bot_token)
            .context("TELEGRAM_API_TOKEN is not set")?;
        let api_token = lookup("BITLY_API_TOKEN", file.bitly.api_token)
            .context("BITLY_API_TOKEN is not set")?;

        let allowed_user_ids = match non_empty(env("TELEGRAM_ALLOWED_USER_IDS")) {
            Some(raw) => parse_user_ids(&raw)?,
            None => file.telegram.allowed_user_ids,
        };

        Ok(Self {
            telegram: TelegramConfig {
                bot_token,
                allowed_user_ids,
            },
            bitly: BitlyConfig {
                api_token,
                api_base_url: lookup("BITLY_API_URL", file.bitly.api_base_url)
                    .unwrap_or_else(|| DEFAULT_BITLY_BASE_URL.to_string()),
                domain: lookup("BITLY_DOMAIN", file.bitly.domain),
                group_guid: lookup("BITLY_GROUP_GUID", file.bitly.group_guid),
            },
        })
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_user_ids(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .with_context(|| format!("Invalid user id in TELEGRAM_ALLOWED_USER_IDS: {}", s))
        })
        .collect()
}
