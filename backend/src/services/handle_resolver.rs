use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::api::telegram_bot_api::{TelegramBotApi, TelegramError};

static TELEGRAM_USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{5,32}$").expect("valid username regex"));

/// Body of `GET /validate/telegram`, the shape the page script expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleCheck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl HandleCheck {
    fn found(description: Option<String>) -> Self {
        Self { ok: true, reason: None, description }
    }

    fn rejected(reason: &str, description: Option<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.to_string()),
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found { description: Option<String> },
    NotFound { description: Option<String> },
    NotConfigured,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HandleResolver: Send + Sync {
    async fn resolve(&self, handle: &str) -> Result<Resolution, TelegramError>;
}

/// Resolves handles with the Bot API `getChat` call.
pub struct BotApiResolver {
    api: Option<TelegramBotApi>,
}

impl BotApiResolver {
    pub fn new(bot_token: Option<&str>) -> Self {
        Self {
            api: bot_token.map(TelegramBotApi::new),
        }
    }
}

#[async_trait]
impl HandleResolver for BotApiResolver {
    async fn resolve(&self, handle: &str) -> Result<Resolution, TelegramError> {
        let api = match &self.api {
            Some(api) => api,
            None => return Ok(Resolution::NotConfigured),
        };
        match api.get_chat(handle).await {
            Ok(chat) => Ok(Resolution::Found {
                description: chat.title.or(chat.first_name),
            }),
            Err(e) if e.is_not_found() => Ok(Resolution::NotFound {
                description: Some(e.to_string()),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Trims and drops one leading `@`.
pub fn normalize_handle(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}

pub fn is_valid_handle(handle: &str) -> bool {
    TELEGRAM_USERNAME_RE.is_match(handle)
}

pub async fn check_handle(resolver: &dyn HandleResolver, raw: &str) -> HandleCheck {
    let handle = normalize_handle(raw);
    if handle.is_empty() || !is_valid_handle(handle) {
        return HandleCheck::rejected("invalid", None);
    }
    match resolver.resolve(handle).await {
        Ok(Resolution::Found { description }) => HandleCheck::found(description),
        Ok(Resolution::NotFound { description }) => HandleCheck::rejected("not_found", description),
        Ok(Resolution::NotConfigured) => HandleCheck::rejected("not_configured", None),
        Err(e) => {
            tracing::warn!("Handle lookup for {} failed: {}", handle, e);
            HandleCheck::rejected("error", None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_single_marker() {
        assert_eq!(normalize_handle("  @alice_dev "), "alice_dev");
        assert_eq!(normalize_handle("@@alice"), "@alice");
        assert!(is_valid_handle("alice_dev"));
        assert!(!is_valid_handle("abcd"));
        assert!(!is_valid_handle("has-dash"));
        assert!(!is_valid_handle(&"a".repeat(33)));
    }

    #[tokio::test]
    async fn bad_shape_never_reaches_the_resolver() {
        let mut resolver = MockHandleResolver::new();
        resolver.expect_resolve().never();
        let check = check_handle(&resolver, "@abc").await;
        assert_eq!(check, HandleCheck::rejected("invalid", None));
    }

    #[tokio::test]
    async fn resolutions_map_to_reasons() {
        let mut resolver = MockHandleResolver::new();
        resolver
            .expect_resolve()
            .withf(|handle| handle.eq_ignore_ascii_case("alice_dev"))
            .returning(|_| Ok(Resolution::Found { description: Some("Alice".to_string()) }));
        resolver
            .expect_resolve()
            .withf(|handle| handle.eq_ignore_ascii_case("ghost_user"))
            .returning(|_| Ok(Resolution::NotFound { description: None }));
        resolver
            .expect_resolve()
            .withf(|handle| handle.eq_ignore_ascii_case("broken_net"))
            .returning(|_| {
                Err(TelegramError::Api {
                    code: Some(502),
                    description: "Bad Gateway".to_string(),
                })
            });

        let found = check_handle(&resolver, "@alice_dev").await;
        assert!(found.ok);
        assert_eq!(found.description.as_deref(), Some("Alice"));
        assert_eq!(check_handle(&resolver, "ghost_user").await.reason.as_deref(), Some("not_found"));
        assert_eq!(check_handle(&resolver, "broken_net").await.reason.as_deref(), Some("error"));
    }

    #[tokio::test]
    async fn unconfigured_resolver_reports_it() {
        let resolver = BotApiResolver::new(None);
        let check = check_handle(&resolver, "alice_dev").await;
        assert_eq!(check.reason.as_deref(), Some("not_configured"));
    }

    #[test]
    fn serializes_without_absent_fields() {
        let json = serde_json::to_value(HandleCheck::rejected("invalid", None)).unwrap();
        assert_eq!(json, serde_json::json!({"ok": false, "reason": "invalid"}));
    }
}
