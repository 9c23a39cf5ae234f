use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};
use crate::api::telegram_bot_api::{InlineKeyboardMarkup, TelegramBotApi};
use crate::config::AppConfig;
use crate::models::lead_models::{Agreement, Lead};
use crate::repositories::whitelist_repository::WhitelistRepository;
use crate::utils::lead_format::{admin_url, build_agreement_text, build_lead_text, build_status_keyboard};

/// Pushes new leads and agreements to the people handling them.
/// Returns whether at least one recipient got the message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeadNotifier: Send + Sync {
    async fn notify_lead(&self, lead: &Lead) -> bool;
    async fn notify_agreement(&self, agreement: &Agreement) -> bool;
}

pub struct TelegramLeadNotifier {
    api: Option<TelegramBotApi>,
    whitelist: Arc<WhitelistRepository>,
    app_base_url: Option<String>,
}

impl TelegramLeadNotifier {
    pub fn from_config(config: &AppConfig, whitelist: Arc<WhitelistRepository>) -> Self {
        Self {
            api: config.telegram_bot_token.as_deref().map(TelegramBotApi::new),
            whitelist,
            app_base_url: config.app_base_url.clone(),
        }
    }

    async fn broadcast(&self, text: &str, keyboard: Option<&InlineKeyboardMarkup>) -> bool {
        let Some(api) = &self.api else {
            warn!("Telegram bot not configured, skipping send.");
            return false;
        };
        // Read on every send so whitelist edits apply without a restart.
        let chat_ids = match self.whitelist.chat_ids() {
            Ok(ids) if !ids.is_empty() => ids,
            Ok(_) => {
                warn!("Whitelist is empty, skipping send.");
                return false;
            }
            Err(e) => {
                error!("Failed to load the whitelist: {}", e);
                return false;
            }
        };
        let sends = chat_ids.iter().map(|chat_id| async move {
            match api.send_message(*chat_id, text, keyboard).await {
                Ok(_) => {
                    info!("Lead message sent to chat_id={}", chat_id);
                    true
                }
                Err(e) => {
                    error!("Failed to send lead message to chat_id={}: {}", chat_id, e);
                    false
                }
            }
        });
        join_all(sends).await.into_iter().any(|sent| sent)
    }
}

#[async_trait]
impl LeadNotifier for TelegramLeadNotifier {
    async fn notify_lead(&self, lead: &Lead) -> bool {
        let now = Utc::now().timestamp();
        let text = build_lead_text(lead, now);
        let keyboard = build_status_keyboard(
            &lead.token,
            Some(lead.effective_status(now)),
            admin_url(self.app_base_url.as_deref(), lead),
        );
        self.broadcast(&text, Some(&keyboard)).await
    }

    async fn notify_agreement(&self, agreement: &Agreement) -> bool {
        self.broadcast(&build_agreement_text(agreement), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::repositories::lead_repository::tests::memory_pool;

    fn sample_lead() -> Lead {
        Lead {
            id: 1,
            token: "abcd0001".to_string(),
            created_at: 0,
            name: "A".to_string(),
            contact: String::new(),
            course: String::new(),
            page: String::new(),
            telegram: None,
            status: None,
            status_updated_at: None,
            note: None,
            tags: None,
            next_contact: None,
        }
    }

    #[tokio::test]
    async fn skips_when_nobody_is_configured() {
        let config = AppConfig::from_lookup(|name| (name == "JWT_SECRET_KEY").then(|| "s".to_string())).unwrap();
        let whitelist = Arc::new(WhitelistRepository::new(memory_pool()));
        whitelist.seed(&[101], 0).unwrap();
        let notifier = TelegramLeadNotifier::from_config(&config, whitelist);
        assert!(!notifier.notify_lead(&sample_lead()).await);
    }

    #[tokio::test]
    async fn skips_when_the_whitelist_is_empty() {
        let config = AppConfig::from_lookup(|name| match name {
            "JWT_SECRET_KEY" => Some("s".to_string()),
            "TELEGRAM_BOT_TOKEN" => Some("123:abc".to_string()),
            _ => None,
        })
        .unwrap();
        let notifier = TelegramLeadNotifier::from_config(&config, Arc::new(WhitelistRepository::new(memory_pool())));
        // Returns before any request is made to Telegram.
        assert!(!notifier.notify_lead(&sample_lead()).await);
    }
}
