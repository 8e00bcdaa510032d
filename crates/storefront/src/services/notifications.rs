//! Staff notifications for new orders.
//!
//! Posting to Slack is best-effort: it runs on a detached task after the
//! order is saved and its failure is only logged. Checkout never waits on it.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Instrument, debug, info_span, instrument, warn};

use saffron_core::{Order, format_usd};

use crate::config::SlackConfig;

/// Slack Web API base URL.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Errors that can occur when interacting with Slack.
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed.
    #[error("Slack request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Slack response error: {0}")]
    Response(String),

    /// Slack API returned an error.
    #[error("Slack API error: {0}")]
    Api(String),
}

/// Tells kitchen staff about new orders.
#[async_trait]
pub trait StaffNotifier: Send + Sync {
    async fn order_placed(&self, order: &Order) -> Result<(), SlackError>;
}

/// Fire `order_placed` on a detached task; failures are logged at `warn`.
pub fn notify_in_background(notifier: Arc<dyn StaffNotifier>, order: Order) {
    let span = info_span!("staff_notification", order_number = %order.order_number);
    tokio::spawn(
        async move {
            if let Err(e) = notifier.order_placed(&order).await {
                warn!(error = %e, "Staff notification failed");
            }
        }
        .instrument(span),
    );
}

/// Plain-text summary used as the Slack fallback text.
#[must_use]
pub fn order_summary(order: &Order) -> String {
    format!(
        "New {} order {} total {}",
        order.order_type,
        order.order_number,
        format_usd(order.totals.total)
    )
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    channel: &'a str,
    text: String,
    blocks: Vec<Block>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Header { text: Text },
    Section { text: Text },
    Context { elements: Vec<Text> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Text {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl Text {
    fn plain(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

fn order_blocks(order: &Order) -> Vec<Block> {
    let items = order
        .items
        .iter()
        .map(|item| format!("• {} × {}", item.quantity, item.name))
        .collect::<Vec<_>>()
        .join("\n");

    let mut details = format!(
        "*{}* · {}\n{}",
        order.customer.name,
        order.customer.phone,
        format_usd(order.totals.total)
    );
    if let Some(address) = order.delivery_address() {
        details.push_str(&format!("\n:round_pushpin: {address}"));
    }
    if let Some(minutes) = order.delivery_minutes {
        details.push_str(&format!(" (~{minutes} min)"));
    }

    let mut blocks = vec![
        Block::Header {
            text: Text::plain(format!(
                "New {} order {}",
                order.order_type, order.order_number
            )),
        },
        Block::Section {
            text: Text::mrkdwn(details),
        },
        Block::Section {
            text: Text::mrkdwn(items),
        },
    ];
    if let Some(notes) = &order.customer.notes {
        blocks.push(Block::Context {
            elements: vec![Text::mrkdwn(format!("Notes: {notes}"))],
        });
    }
    blocks
}

/// Slack bot posting to the orders channel.
#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    bot_token: SecretString,
    channel: String,
    base_url: String,
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("bot_token", &"[REDACTED]")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl SlackNotifier {
    #[must_use]
    pub fn new(config: &SlackConfig) -> Self {
        Self::with_base_url(config, SLACK_API_BASE)
    }

    /// Point the notifier at a different API root.
    #[must_use]
    pub fn with_base_url(config: &SlackConfig, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            bot_token: config.bot_token.clone(),
            channel: config.channel.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StaffNotifier for SlackNotifier {
    #[instrument(skip(self, order), fields(channel = %self.channel, order_number = %order.order_number))]
    async fn order_placed(&self, order: &Order) -> Result<(), SlackError> {
        let message = SlackMessage {
            channel: &self.channel,
            text: order_summary(order),
            blocks: order_blocks(order),
        };

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&message)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!("Order posted to Slack");
        Ok(())
    }
}
