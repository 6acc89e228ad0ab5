// Posts run summaries to a Discord channel webhook.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::core::sync::{NotifyError, RunNotifier};

/// Discord rejects message content longer than this.
const MESSAGE_LIMIT: usize = 2000;

pub struct DiscordWebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordWebhookNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
        }
    }

    /// Reads `DISCORD_WEBHOOK_URL`.
    pub fn from_env() -> Result<Self, NotifyError> {
        std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| Self::new(url.trim()))
            .ok_or_else(|| NotifyError::NotConfigured("DISCORD_WEBHOOK_URL is not set".to_string()))
    }
}

#[async_trait]
impl RunNotifier for DiscordWebhookNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        for chunk in chunk_message(message, MESSAGE_LIMIT) {
            let response = self
                .client
                .post(&self.webhook_url)
                .json(&json!({ "content": chunk }))
                .send()
                .await
                .map_err(|e| NotifyError::Http(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(NotifyError::Rejected { status, body });
            }
        }

        tracing::info!("Posted run summary to Discord");
        Ok(())
    }
}

/// Splits on line breaks where possible so each chunk has at most `limit`
/// characters. Lines longer than `limit` are cut.
fn chunk_message(message: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current: Option<(String, usize)> = None;

    for line in message.lines() {
        let chars: Vec<char> = line.chars().collect();
        let pieces: Vec<String> = if chars.is_empty() {
            vec![String::new()]
        } else {
            chars.chunks(limit).map(|c| c.iter().collect()).collect()
        };

        for piece in pieces {
            let piece_len = piece.chars().count();
            current = match current.take() {
                Some((mut buf, len)) if len + 1 + piece_len <= limit => {
                    buf.push('\n');
                    buf.push_str(&piece);
                    Some((buf, len + 1 + piece_len))
                }
                Some((buf, _)) => {
                    chunks.push(buf);
                    Some((piece, piece_len))
                }
                None => Some((piece, piece_len)),
            };
        }
    }

    chunks.extend(current.map(|(buf, _)| buf));
    chunks.retain(|c| !c.trim().is_empty());
    chunks
}
