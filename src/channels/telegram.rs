//! Telegram channel. Long-polls the Bot API for updates.
//!
//! Text messages become `ChatEvent::Text`, callback queries from inline
//! keyboards become `ChatEvent::InlineAction`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::channels::{ChatEvent, ChatTransport, EventStream, InlineKeyboard, OutgoingMessage};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Back-off after a failed poll.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram connection settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Usernames or numeric ids; `*` allows everyone.
    pub allowed_users: Vec<String>,
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            allowed_users: vec!["*".to_string()],
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Telegram Bot API channel.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.config.api_base, &self.config.bot_token, method)
    }

    /// Verify the token with getMe and log the bot account.
    pub async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            });
        }

        let data: Value = resp.json().await.map_err(|e| ChannelError::StartupFailed {
            name: "telegram".into(),
            reason: format!("getMe returned an unreadable body: {e}"),
        })?;
        let username = data
            .get("result")
            .and_then(|r| r.get("username"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::info!(account = username, "Authorized on Telegram");
        Ok(())
    }

    /// Send a single message chunk (≤4096 chars), Markdown-first with fallback.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
        markdown: bool,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = keyboard_markup(kb);
        }

        if markdown {
            let mut markdown_body = body.clone();
            markdown_body["parse_mode"] = Value::String("Markdown".into());

            let markdown_resp = self.post("sendMessage", &markdown_body).await?;
            if markdown_resp.status().is_success() {
                return Ok(());
            }
            tracing::warn!(
                status = ?markdown_resp.status(),
                "Telegram sendMessage with Markdown failed; retrying without parse_mode"
            );
        }

        let plain_resp = self.post("sendMessage", &body).await?;
        if !plain_resp.status().is_success() {
            let status = plain_resp.status();
            let err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage failed ({status}): {err}"),
            });
        }

        Ok(())
    }

    async fn post(&self, method: &str, body: &Value) -> Result<reqwest::Response, ChannelError> {
        self.client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })
    }
}

// ── ChatTransport implementation ────────────────────────────────────

#[async_trait]
impl ChatTransport for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.config.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let results = match poll_results(&data) {
                    Ok(results) => results,
                    Err(description) => {
                        tracing::warn!("Telegram getUpdates rejected: {description}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(event) = parse_update(update, &allowed_users) else {
                        continue;
                    };

                    if tx.send(event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(&self, chat_id: &str, message: OutgoingMessage) -> Result<(), ChannelError> {
        let chunks = split_message(&message.text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            // The keyboard goes under the last chunk only.
            let keyboard = if i == last { message.keyboard.as_ref() } else { None };
            self.send_message_chunk(chat_id, chunk, keyboard, message.markdown)
                .await?;
        }
        Ok(())
    }

    async fn acknowledge(&self, ack_token: &str, text: Option<&str>) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({ "callback_query_id": ack_token });
        if let Some(text) = text {
            body["text"] = Value::String(text.to_string());
        }

        let resp = self.post("answerCallbackQuery", &body).await?;
        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("answerCallbackQuery failed: {err}"),
            });
        }
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(api_base: &str, bot_token: &str, method: &str) -> String {
    format!("{api_base}/bot{bot_token}/{method}")
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Identity of the `from` object: the username, or the numeric id for users
/// without one. Returns `None` for unauthorized senders.
fn sender_identity(from: &Value, allowed_users: &[String]) -> Option<String> {
    let username = from.get("username").and_then(Value::as_str);
    let user_id = from.get("id").and_then(Value::as_i64).map(|id| id.to_string());

    let mut identities: Vec<&str> = Vec::with_capacity(2);
    identities.extend(username);
    identities.extend(user_id.as_deref());

    if !check_user_allowed(allowed_users, identities.iter().copied()) {
        tracing::warn!(
            "Telegram: ignoring update from unauthorized user: username={}, user_id={}",
            username.unwrap_or("unknown"),
            user_id.as_deref().unwrap_or("unknown")
        );
        return None;
    }

    username.map(String::from).or(user_id)
}

fn chat_id_of(message: &Value) -> Option<String> {
    message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
}

/// The updates of a getUpdates reply, or Telegram's description of why the
/// call was rejected (`{"ok": false, "error_code": 409, ...}`).
fn poll_results(data: &Value) -> Result<&[Value], String> {
    let ok = data.get("ok").and_then(Value::as_bool).unwrap_or(false);
    match data.get("result").and_then(Value::as_array) {
        Some(results) if ok => Ok(results),
        _ => Err(data
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("no result in response")
            .to_string()),
    }
}

/// Turn one getUpdates entry into a chat event.
fn parse_update(update: &Value, allowed_users: &[String]) -> Option<ChatEvent> {
    if let Some(message) = update.get("message") {
        let text = message.get("text").and_then(Value::as_str)?;
        let sender = sender_identity(message.get("from")?, allowed_users)?;
        let chat_id = chat_id_of(message)?;
        tracing::debug!(sender = %sender, text, "Telegram message received");
        return Some(ChatEvent::text(sender, chat_id, text));
    }

    if let Some(callback) = update.get("callback_query") {
        let from = callback.get("from")?;
        let ack_token = callback.get("id").and_then(Value::as_str)?;
        let payload = callback.get("data").and_then(Value::as_str).unwrap_or_default();
        let sender = sender_identity(from, allowed_users)?;
        // Callbacks from inline-mode messages carry no message; answer in the private chat.
        let chat_id = callback
            .get("message")
            .and_then(chat_id_of)
            .or_else(|| from.get("id").and_then(Value::as_i64).map(|id| id.to_string()))?;
        tracing::debug!(sender = %sender, payload, "Telegram callback received");
        return Some(ChatEvent::inline_action(sender, chat_id, payload, ack_token));
    }

    None
}

/// Telegram `reply_markup` for an inline keyboard.
fn keyboard_markup(keyboard: &InlineKeyboard) -> Value {
    let rows: Vec<Value> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| serde_json::json!({ "text": b.text, "callback_data": b.payload }))
                .collect()
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut cut = max_len;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }

        let chunk = &remaining[..cut];
        let separator = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .filter(|&at| at > 0);

        match separator {
            // Drop only the separator itself; indentation and blank lines stay.
            Some(at) => {
                chunks.push(remaining[..at].to_string());
                remaining = &remaining[at + 1..];
            }
            None => {
                chunks.push(chunk.to_string());
                remaining = &remaining[cut..];
            }
        }
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
