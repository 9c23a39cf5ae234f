use anyhow::{bail, Context};
use chrono::Utc;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use backend::api::telegram_bot_api::{CallbackQuery, Message, TelegramBotApi, Update};
use backend::bot::commands::{parse_command, LeadBot};
use backend::config::AppConfig;
use backend::init_pool;
use backend::repositories::{lead_repository::LeadRepository, whitelist_repository::WhitelistRepository};
use backend::utils::lead_format::{build_status_keyboard, parse_status_callback};

const POLL_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

async fn handle_message(api: &TelegramBotApi, bot: &LeadBot, message: Message) {
    let user_id = match &message.from {
        Some(user) => user.id,
        None => return,
    };
    if !bot.is_allowed(user_id) {
        info!("Ignored message from non-whitelisted user_id={}", user_id);
        return;
    }
    let command = match message.text.as_deref().and_then(parse_command) {
        Some(command) => command,
        None => return,
    };
    debug!("Command {:?} from user_id={}", command, user_id);

    let replies = match bot.handle_command(command, Utc::now().timestamp()) {
        Ok(replies) => replies,
        Err(e) => {
            error!("Command failed: {}", e);
            return;
        }
    };
    for reply in replies {
        if let Err(e) = api
            .send_message(message.chat.id, &reply.text, reply.keyboard.as_ref())
            .await
        {
            error!("Failed to reply in chat_id={}: {}", message.chat.id, e);
        }
    }
}

async fn handle_callback(api: &TelegramBotApi, bot: &LeadBot, callback: CallbackQuery) {
    if !bot.is_allowed(callback.from.id) {
        info!("Ignored button press from non-whitelisted user_id={}", callback.from.id);
        return;
    }
    let data = match callback.data.as_deref() {
        Some(data) if data.starts_with("lead:") => data,
        _ => return,
    };

    let outcome = match bot.handle_callback(data, Utc::now().timestamp()) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Status callback failed: {}", e);
            return;
        }
    };

    if let Some(message) = &callback.message {
        let refreshed = match &outcome.card {
            Some(card) => {
                api.edit_message_text(message.chat.id, message.message_id, &card.text, card.keyboard.as_ref())
                    .await
            }
            // Lead vanished between update and reload; only the buttons can be refreshed.
            None => match parse_status_callback(data) {
                Some((token, _)) => {
                    api.edit_message_reply_markup(
                        message.chat.id,
                        message.message_id,
                        &build_status_keyboard(token, None, None),
                    )
                    .await
                }
                None => Ok(serde_json::Value::Null),
            },
        };
        if let Err(e) = refreshed {
            // Telegram refuses edits that change nothing.
            debug!("Could not refresh lead card: {}", e);
        }
    }

    if let Err(e) = api.answer_callback_query(&callback.id, &outcome.answer).await {
        warn!("Failed to answer callback {}: {}", callback.id, e);
    }
}

async fn dispatch(api: &TelegramBotApi, bot: &LeadBot, update: Update) {
    if let Some(message) = update.message {
        handle_message(api, bot, message).await;
    } else if let Some(callback) = update.callback_query {
        handle_callback(api, bot, callback).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let token = match config.telegram_bot_token.as_deref() {
        Some(token) => token,
        None => bail!("Missing TELEGRAM_BOT_TOKEN"),
    };

    let pool = init_pool(&config.database_url, 2).context("Failed to open the database")?;
    let whitelist = Arc::new(WhitelistRepository::new(pool.clone()));
    whitelist
        .seed(&config.telegram_chat_ids, Utc::now().timestamp())
        .context("Failed to seed the bot whitelist")?;
    if whitelist.chat_ids().context("Failed to read the bot whitelist")?.is_empty() {
        warn!("Bot whitelist is empty, every user will be ignored until an admin adds one");
    }
    let bot = LeadBot::new(Arc::new(LeadRepository::new(pool)), whitelist, config.app_base_url.clone());
    let api = TelegramBotApi::new(token);

    info!("Lead bot polling for updates");
    let mut offset = 0;
    loop {
        match api.get_updates(offset, POLL_SECS).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    dispatch(&api, &bot, update).await;
                }
            }
            Err(e) => {
                warn!("Polling failed, retrying in {}s: {}", RETRY_DELAY.as_secs(), e);
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}
