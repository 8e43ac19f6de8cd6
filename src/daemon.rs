//! Daemon - wires the polling loop, the decision engine, and the
//! verdict actions together

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};

use crate::commands::{self, format_hm};
use crate::config::Config;
use crate::policy::{
    AdminRoster, MessageEvent, MessageLedger, OverlayRegistry, PolicyState, RateDecisionEngine,
    Sender, Verdict, sweeper,
};
use crate::store::{JsonFileStore, StateStore};
use crate::telegram::{ChannelRoster, IncomingMessage, TelegramChannel, TgUser};
use crate::Result;

/// The warden service
pub struct Daemon {
    config: Config,
}

impl Daemon {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until the process is stopped
    ///
    /// # Errors
    ///
    /// Returns an error if startup fails (bad token, unusable data
    /// directory). Per-message failures are logged, never fatal.
    pub async fn run(self) -> Result<()> {
        let store: Arc<dyn StateStore> = Arc::new(JsonFileStore::new(&self.config.data_dir)?);
        let state = Arc::new(Mutex::new(PolicyState {
            ledger: MessageLedger::load(Arc::clone(&store)),
            overlays: OverlayRegistry::load(store),
        }));

        let channel = TelegramChannel::new(self.config.bot_token.clone());
        let me = channel.get_me().await?;
        tracing::info!(
            bot = %me.display_handle(),
            topics = self.config.watched.len(),
            cooldown = %format_hm(self.config.default_cooldown_secs),
            "warden connected"
        );

        let roster = Arc::new(ChannelRoster::new(channel.clone()));
        let engine = RateDecisionEngine::new(
            Arc::clone(&state),
            Arc::clone(&roster) as Arc<dyn AdminRoster>,
            self.config.watched.clone(),
            self.config.default_cooldown_secs,
        );

        let _sweeper = sweeper::spawn(
            state,
            self.config.default_cooldown_secs,
            Duration::from_secs(self.config.sweep_interval_secs),
        );

        let (tx, mut rx) = mpsc::channel(100);
        let _poller = channel.start_polling(
            tx,
            Duration::from_secs(self.config.poll_error_backoff_secs),
        );

        while let Some(msg) = rx.recv().await {
            self.handle_message(&channel, &engine, roster.as_ref(), msg)
                .await;
        }
        Ok(())
    }

    async fn handle_message(
        &self,
        channel: &TelegramChannel,
        engine: &RateDecisionEngine,
        roster: &dyn AdminRoster,
        msg: IncomingMessage,
    ) {
        // Admin commands may arrive in any topic of a watched chat and
        // are never rate-limited themselves
        if let Some(parsed) = msg.text.as_deref().and_then(commands::parse) {
            if engine.watches_chat(msg.chat_id) {
                self.handle_command(channel, engine, roster, &msg, parsed)
                    .await;
            }
            return;
        }

        let sender = if let Some(chat) = msg.sender_chat_id {
            Sender::Chat(chat)
        } else if let Some(user) = &msg.from {
            Sender::User(user.id)
        } else {
            return;
        };

        let event = MessageEvent {
            chat_id: msg.chat_id,
            thread_id: msg.thread_id,
            message_id: msg.message_id,
            sender,
            timestamp: msg.date,
        };

        match engine.decide(&event).await {
            Verdict::Ignored => {}
            Verdict::Allowed => {
                tracing::info!(
                    chat_id = msg.chat_id,
                    message_id = msg.message_id,
                    sender = ?sender,
                    "message allowed and recorded"
                );
            }
            Verdict::ExemptAdmin | Verdict::ExemptCustom | Verdict::ExemptUnlimited => {
                tracing::debug!(
                    chat_id = msg.chat_id,
                    message_id = msg.message_id,
                    sender = ?sender,
                    "message exempt from rate limit"
                );
            }
            Verdict::Rejected {
                retry_after_secs,
                cooldown_secs,
            } => {
                self.reject(channel, &msg, retry_after_secs, cooldown_secs)
                    .await;
            }
        }
    }

    async fn handle_command(
        &self,
        channel: &TelegramChannel,
        engine: &RateDecisionEngine,
        roster: &dyn AdminRoster,
        msg: &IncomingMessage,
        parsed: std::result::Result<commands::AdminCommand, String>,
    ) {
        // Anonymous admins post as the chat itself and need no roster check
        let is_anonymous_admin = msg.sender_chat_id == Some(msg.chat_id);
        if !is_anonymous_admin {
            let Some(issuer) = msg.from.as_ref() else {
                return;
            };
            match roster.is_platform_admin(msg.chat_id, issuer.id).await {
                Ok(true) => {}
                Ok(false) => {
                    self.reply(channel, msg, "This command is for group admins only.")
                        .await;
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot verify command issuer");
                    self.reply(
                        channel,
                        msg,
                        "Cannot verify admin status right now, try again later.",
                    )
                    .await;
                    return;
                }
            }
        }

        let text = match parsed {
            Ok(cmd) => {
                let now = chrono::Utc::now().timestamp();
                let state = engine.state();
                commands::execute(cmd, msg.chat_id, &state, engine.default_cooldown(), now).await
            }
            Err(usage) => usage,
        };
        self.reply(channel, msg, &text).await;
    }

    async fn reply(&self, channel: &TelegramChannel, msg: &IncomingMessage, text: &str) {
        if let Err(e) = channel.send_message(msg.chat_id, msg.thread_id, text).await {
            tracing::warn!(chat_id = msg.chat_id, error = %e, "failed to send reply");
        }
    }

    /// Delete a rejected message and post a self-expiring warning notice
    async fn reject(
        &self,
        channel: &TelegramChannel,
        msg: &IncomingMessage,
        retry_after_secs: u64,
        cooldown_secs: u64,
    ) {
        tracing::info!(
            chat_id = msg.chat_id,
            message_id = msg.message_id,
            retry_after = retry_after_secs,
            "message rejected, deleting"
        );

        if let Err(e) = channel.delete_message(msg.chat_id, msg.message_id).await {
            tracing::warn!(
                chat_id = msg.chat_id,
                message_id = msg.message_id,
                error = %e,
                "failed to delete rejected message"
            );
        }

        let handle = msg
            .from
            .as_ref()
            .map_or_else(|| "you".to_string(), TgUser::display_handle);
        let text = format!(
            "⚠️ {handle}, only one message per {} is allowed here.\nPlease wait {} before posting again.",
            format_hm(cooldown_secs),
            format_hm(retry_after_secs),
        );

        match channel.send_message(msg.chat_id, msg.thread_id, &text).await {
            Ok(notice_id) => {
                // UX echo only, never state: the notice deletes itself
                let channel = channel.clone();
                let chat_id = msg.chat_id;
                let ttl = self.config.notice_ttl_secs;
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(ttl)).await;
                    if let Err(e) = channel.delete_message(chat_id, notice_id).await {
                        tracing::debug!(chat_id, notice_id, error = %e, "failed to expire notice");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(chat_id = msg.chat_id, error = %e, "failed to send notice");
            }
        }
    }
}
