//! Raw Telegram Bot API calls

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{
    API_BASE, ApiResponse, ChatMember, DeleteMessageRequest, GetChatAdministratorsRequest,
    SendMessageRequest, SentMessage, TgUser,
};
use crate::{Error, Result};

impl super::TelegramChannel {
    /// Verify the token and return the bot's own account
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn get_me(&self) -> Result<TgUser> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Send a plain-text message, optionally into a forum topic
    ///
    /// Returns the new message id so callers can delete it later
    /// (self-expiring notices).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn send_message(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        text: &str,
    ) -> Result<i64> {
        self.pace(chat_id).await;
        let request = SendMessageRequest {
            chat_id,
            text: text.to_string(),
            message_thread_id: thread_id,
            disable_notification: Some(true),
        };
        let sent: SentMessage = self.call("sendMessage", &request).await?;
        tracing::debug!(chat_id, message_id = sent.message_id, "Telegram message sent");
        Ok(sent.message_id)
    }

    /// Delete a message
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails (e.g. the message is
    /// already gone or the bot lacks delete rights).
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.pace(chat_id).await;
        let request = DeleteMessageRequest {
            chat_id,
            message_id,
        };
        let _: bool = self.call("deleteMessage", &request).await?;
        tracing::debug!(chat_id, message_id, "Telegram message deleted");
        Ok(())
    }

    /// Fetch the chat's current administrator list
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; callers treat that as
    /// a transient roster outage.
    pub(crate) async fn get_chat_administrators(&self, chat_id: i64) -> Result<Vec<ChatMember>> {
        let request = GetChatAdministratorsRequest { chat_id };
        self.call("getChatAdministrators", &request).await
    }

    /// Wait out the per-chat pacing interval if needed
    async fn pace(&self, chat_id: i64) {
        if !self.pacer.check(chat_id) {
            tokio::time::sleep(self.pacer.interval()).await;
        }
    }

    /// POST one Bot API method and unwrap the response envelope
    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{API_BASE}{}/{method}", self.token);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram {method} error: {e}")))?;

        let status = response.status();
        if status.as_u16() == 429 {
            // Flood control: push the pacer forward before surfacing
            if let Ok(value) = serde_json::to_value(body) {
                if let Some(chat_id) = value.get("chat_id").and_then(serde_json::Value::as_i64) {
                    self.pacer.backoff(chat_id);
                }
            }
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Channel(format!("Telegram {method} error: {status} - {e}")))?;

        if !envelope.ok {
            let description = envelope.description.unwrap_or_else(|| status.to_string());
            return Err(Error::Channel(format!(
                "Telegram {method} error: {description}"
            )));
        }
        envelope
            .result
            .ok_or_else(|| Error::Channel(format!("Telegram {method} error: empty result")))
    }
}
