//! Telegram polling mode — getUpdates loop and message conversion

use serde::Deserialize;
use tokio::sync::mpsc;

use super::IncomingMessage;
use super::types::{API_BASE, TgUser};

/// getUpdates long-poll window in seconds
const POLL_TIMEOUT_SECS: u64 = 30;

/// Response from Telegram getUpdates API
#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    #[allow(dead_code)]
    ok: bool,
    #[serde(default)]
    result: Vec<PollingUpdate>,
}

/// A single update from getUpdates
#[derive(Debug, Deserialize)]
struct PollingUpdate {
    update_id: i64,
    message: Option<PollingMessage>,
}

/// Message from a polling update
#[derive(Debug, Deserialize)]
struct PollingMessage {
    message_id: i64,
    chat: PollingChat,
    from: Option<TgUser>,
    sender_chat: Option<PollingChat>,
    text: Option<String>,
    caption: Option<String>,
    message_thread_id: Option<i64>,
    date: i64,
}

/// Chat info from polling
#[derive(Debug, Deserialize)]
struct PollingChat {
    id: i64,
}

impl super::TelegramChannel {
    /// Spawn a background task that polls Telegram's getUpdates API
    ///
    /// Forwards each received message into the mpsc channel. Deletes
    /// any existing webhook before starting to avoid conflicts.
    pub fn start_polling(
        &self,
        tx: mpsc::Sender<IncomingMessage>,
        error_backoff: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        let token = self.token.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            polling_loop(token, client, tx, error_backoff).await;
        })
    }
}

/// Run the polling loop (background task)
async fn polling_loop(
    token: String,
    client: reqwest::Client,
    tx: mpsc::Sender<IncomingMessage>,
    error_backoff: std::time::Duration,
) {
    // Delete any existing webhook so getUpdates works
    let delete_url = format!("{API_BASE}{token}/deleteWebhook");
    if let Err(e) = client.post(&delete_url).send().await {
        tracing::warn!(error = %e, "failed to delete Telegram webhook before polling");
    }

    let mut offset: Option<i64> = None;

    loop {
        let url = format!("{API_BASE}{token}/getUpdates");
        let mut params = serde_json::json!({
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"],
        });
        if let Some(off) = offset {
            params["offset"] = serde_json::json!(off);
        }

        match client.post(&url).json(&params).send().await {
            Ok(resp) => match resp.json::<GetUpdatesResponse>().await {
                Ok(updates) => {
                    for update in updates.result {
                        offset = Some(update.update_id + 1);

                        if let Some(msg) = update.message.map(message_to_incoming) {
                            if tx.send(msg).await.is_err() {
                                tracing::info!("message receiver dropped, stopping polling");
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed getUpdates response");
                    tokio::time::sleep(error_backoff).await;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Telegram getUpdates error");
                tokio::time::sleep(error_backoff).await;
            }
        }
    }
}

/// Convert a polling message into an `IncomingMessage`
fn message_to_incoming(msg: PollingMessage) -> IncomingMessage {
    IncomingMessage {
        chat_id: msg.chat.id,
        thread_id: msg.message_thread_id,
        message_id: msg.message_id,
        from: msg.from,
        sender_chat_id: msg.sender_chat.map(|c| c.id),
        text: msg.text.or(msg.caption),
        date: msg.date,
    }
}
