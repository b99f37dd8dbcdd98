//! Thin Telegram Bot API wrapper: long-polled updates in, messages out.
//!
//! No core logic lives here; the poll loop hands this module structured
//! [`DeliveryEvent`]s and this module renders and sends them.

pub mod commands;

use crate::poll::{DeliveryEvent, DeliverySink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const LONG_POLL_SECS: u64 = 50;

/// An incoming update from getUpdates. Only message updates carry anything
/// we act on; everything else deserializes with `message: None` and is
/// skipped by the dispatcher.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
}

/// Bot API client. One reused reqwest client; the request timeout leaves
/// headroom over the long-poll window.
pub struct TelegramClient {
    client: Client,
    base: Url,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self> {
        let base = Url::parse(&format!("https://api.telegram.org/bot{token}/"))
            .context("Invalid Telegram API base URL")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()
            .context("Failed to build Telegram HTTP client")?;
        Ok(Self { client, base })
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        self.base
            .join(method)
            .with_context(|| format!("Invalid Telegram method: {method}"))
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let mut url = self.method_url("getUpdates")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("timeout", &LONG_POLL_SECS.to_string());
            if let Some(offset) = offset {
                qp.append_pair("offset", &offset.to_string());
            }
        }

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send getUpdates request")?
            .error_for_status()
            .context("Non-success status from getUpdates")?;

        let body: ApiResponse<Vec<Update>> = resp
            .json()
            .await
            .context("Failed to parse getUpdates response")?;
        if !body.ok {
            anyhow::bail!("getUpdates reported ok=false");
        }
        Ok(body.result.unwrap_or_default())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str, markdown: bool) -> Result<()> {
        let mut payload = json!({"chat_id": chat_id, "text": text});
        if markdown {
            payload["parse_mode"] = "Markdown".into();
        }

        self.client
            .post(self.method_url("sendMessage")?)
            .json(&payload)
            .send()
            .await
            .context("Failed to send sendMessage request")?
            .error_for_status()
            .context("Non-success status from sendMessage")?;
        Ok(())
    }

    /// Advertise the /start and /stop commands in the Telegram UI.
    pub async fn set_my_commands(&self) -> Result<()> {
        let payload = json!({"commands": [
            {"command": "start", "description": "Start prediction"},
            {"command": "stop", "description": "Stop prediction"}
        ]});

        self.client
            .post(self.method_url("setMyCommands")?)
            .json(&payload)
            .send()
            .await
            .context("Failed to send setMyCommands request")?
            .error_for_status()
            .context("Non-success status from setMyCommands")?;
        Ok(())
    }
}

#[async_trait]
impl DeliverySink for TelegramClient {
    async fn deliver(&self, event: &DeliveryEvent) -> Result<()> {
        self.send_message(event.subscriber, &format_delivery(event), true)
            .await
    }
}

/// Render a delivery event as the subscriber-facing Markdown message.
pub(crate) fn format_delivery(event: &DeliveryEvent) -> String {
    format!(
        "🔮 *Draw Prediction*\n🕐 Period: `{}`\n📥 Results fetched: *{}*\n📊 {}",
        event.next_issue, event.results_seen, event.prediction
    )
}
