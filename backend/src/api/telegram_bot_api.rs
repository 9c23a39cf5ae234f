use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API error {code:?}: {description}")]
    Api { code: Option<i32>, description: String },
}

impl TelegramError {
    /// `getChat` answers 400 "chat not found" for handles nobody owns.
    pub fn is_not_found(&self) -> bool {
        match self {
            TelegramError::Api { code, description } => {
                *code == Some(400) && description.to_lowercase().contains("not found")
            }
            TelegramError::Http(_) => false,
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub data: Option<String>,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// Thin Bot API client. Every call is a JSON POST to `/bot<token>/<method>`.
#[derive(Clone)]
pub struct TelegramBotApi {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramBotApi {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(token, API_BASE)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, TelegramError> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);
        let mut request = self.client.post(&url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response: ApiResponse<T> = request.send().await?.json().await?;
        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api {
                code: response.error_code,
                description: response.description.unwrap_or_else(|| "empty response".to_string()),
            }),
        }
    }

    pub async fn get_chat(&self, handle: &str) -> Result<Chat, TelegramError> {
        self.call("getChat", &json!({ "chat_id": format!("@{}", handle) }), None)
            .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = json!(keyboard);
        }
        self.call("sendMessage", &body, None).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<serde_json::Value, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = json!(keyboard);
        }
        self.call("editMessageText", &body, None).await
    }

    pub async fn edit_message_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: &InlineKeyboardMarkup,
    ) -> Result<serde_json::Value, TelegramError> {
        self.call(
            "editMessageReplyMarkup",
            &json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "reply_markup": keyboard,
            }),
            None,
        )
        .await
    }

    pub async fn answer_callback_query(&self, callback_id: &str, text: &str) -> Result<bool, TelegramError> {
        self.call(
            "answerCallbackQuery",
            &json!({ "callback_query_id": callback_id, "text": text }),
            None,
        )
        .await
    }

    /// Long poll; the request timeout is stretched past the poll window.
    pub async fn get_updates(&self, offset: i64, poll_secs: u64) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": poll_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
            Some(Duration::from_secs(poll_secs + 10)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_serializes_without_empty_fields() {
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: "Paid".to_string(),
                callback_data: Some("lead:abcd1234:paid".to_string()),
                url: None,
            }]],
        };
        let value = serde_json::to_value(&keyboard).unwrap();
        assert_eq!(
            value,
            json!({"inline_keyboard": [[{"text": "Paid", "callback_data": "lead:abcd1234:paid"}]]})
        );
    }

    #[test]
    fn chat_not_found_is_recognised() {
        let err = TelegramError::Api {
            code: Some(400),
            description: "Bad Request: chat not found".to_string(),
        };
        assert!(err.is_not_found());
        let other = TelegramError::Api {
            code: Some(401),
            description: "Unauthorized".to_string(),
        };
        assert!(!other.is_not_found());
    }
}
