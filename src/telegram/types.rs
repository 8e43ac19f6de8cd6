//! Telegram Bot API request/response types and well-known sender ids

use serde::{Deserialize, Serialize};

/// Telegram Bot API base URL
pub(crate) const API_BASE: &str = "https://api.telegram.org/bot";

/// @GroupAnonymousBot, the service account behind "send as anonymous admin"
pub const ANONYMOUS_ADMIN_ID: i64 = 1_087_968_824;

/// Telegram's service account (linked-channel posts, service notices)
pub const SERVICE_NOTIFICATIONS_ID: i64 = 777_000;

/// Generic Bot API response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// Telegram sendMessage request
#[derive(Serialize)]
pub(crate) struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
}

/// Telegram deleteMessage request
#[derive(Serialize)]
pub(crate) struct DeleteMessageRequest {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Telegram getChatAdministrators request
#[derive(Serialize)]
pub(crate) struct GetChatAdministratorsRequest {
    pub chat_id: i64,
}

/// A Telegram user
#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl TgUser {
    /// Display handle for notices: `@username` or the first name
    #[must_use]
    pub fn display_handle(&self) -> String {
        self.username
            .as_ref()
            .map_or_else(|| self.first_name.clone(), |u| format!("@{u}"))
    }
}

/// A chat-member entry from getChatAdministrators
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatMember {
    pub user: TgUser,
    #[allow(dead_code)]
    pub status: String,
}

/// Minimal sendMessage result (only the id is needed, for later deletion)
#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
    pub message_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_handle_prefers_username() {
        let user = TgUser {
            id: 1,
            is_bot: false,
            first_name: "Ada".to_string(),
            username: Some("ada".to_string()),
        };
        assert_eq!(user.display_handle(), "@ada");
    }

    #[test]
    fn display_handle_falls_back_to_first_name() {
        let user = TgUser {
            id: 1,
            is_bot: false,
            first_name: "Ada".to_string(),
            username: None,
        };
        assert_eq!(user.display_handle(), "Ada");
    }
}
