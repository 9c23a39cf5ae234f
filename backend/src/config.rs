use std::env;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Canonical scheme + host the site should be served from.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalOrigin {
    pub origin: String,
    /// IPv6 literals are kept without brackets.
    pub host: String,
    /// Only set when the URL names a non-default port.
    pub port: Option<u16>,
    /// What a Host header without a port means; unset when `port` is.
    pub default_port: Option<u16>,
}

impl CanonicalOrigin {
    /// `None` for URLs without a host, like `file:` ones.
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };
        Some(Self {
            origin,
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port: url.port(),
            default_port: url.port_or_known_default().filter(|_| url.port().is_none()),
        })
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub static_dir: PathBuf,
    pub app_base_url: Option<String>,
    pub canonical: Option<CanonicalOrigin>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_ids: Vec<i64>,
    pub jwt_secret: String,
    pub admin_password_hash: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_telegram: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET_KEY").ok_or(ConfigError::Missing("JWT_SECRET_KEY"))?;

        let app_base_url = get("APP_BASE_URL").map(|v| v.trim_end_matches('/').to_string());
        let canonical = match &app_base_url {
            Some(raw) => parse_canonical(raw)?,
            None => None,
        };

        let telegram_chat_ids = match get("TELEGRAM_CHAT_IDS") {
            Some(raw) => parse_chat_ids(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "academy.db".to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string()),
            static_dir: PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "frontend/dist".to_string())),
            app_base_url,
            canonical,
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_ids,
            jwt_secret,
            admin_password_hash: get("ADMIN_PASSWORD_HASH"),
            contact_phone: get("CONTACT_PHONE"),
            contact_telegram: get("CONTACT_TELEGRAM"),
        })
    }
}

fn parse_chat_ids(raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_| ConfigError::Invalid {
                name: "TELEGRAM_CHAT_IDS",
                value: part.to_string(),
            })
        })
        .collect()
}

fn parse_canonical(raw: &str) -> Result<Option<CanonicalOrigin>, ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::Invalid {
        name: "APP_BASE_URL",
        value: raw.to_string(),
    })?;
    Ok(CanonicalOrigin::from_url(&url))
}
