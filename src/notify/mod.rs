//! # Operator Intervention Hooks
//!
//! Extraction cannot get past a login wall or a verification challenge on its
//! own. Instead of blocking on a console prompt, the fetcher reports these
//! moments through an [`InterventionHook`], and the embedding context decides
//! how to reach a human: an interactive tool can print to its terminal, a
//! service can page someone through a webhook.
//!
//! ## Events
//!
//! - **ChallengeSuspected**: the title is missing after navigation; the
//!   recovery loop is about to wait for manual remediation
//! - **RecoveryExhausted**: the wait ended without a title; the URL fails
//! - **LoginRedirect**: the session was redirected to a login page; the URL
//!   fails immediately
//!
//! ## Webhook Payload
//!
//! [`WebhookNotifier`] posts a Discord-compatible embed with the page URL,
//! the browser-reported page title and the page size, which is usually enough
//! to tell a login page from a captcha from an unrecognised template.
//!
//! Hook failures never affect extraction: they are logged and dropped.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::models::{WebhookEmbed, WebhookField, WebhookMessage};

/// Why an operator is being called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterventionKind {
    ChallengeSuspected,
    RecoveryExhausted,
    LoginRedirect,
}

impl InterventionKind {
    fn headline(self) -> &'static str {
        match self {
            Self::ChallengeSuspected => "Verification suspected, waiting for manual remediation",
            Self::RecoveryExhausted => "Extraction abandoned after recovery wait",
            Self::LoginRedirect => "Redirected to login, cookies need refreshing",
        }
    }

    /// Embed color: amber while waiting, red once the URL has failed
    fn color(self) -> u32 {
        match self {
            Self::ChallengeSuspected => 0x00F1_C40F,
            Self::RecoveryExhausted | Self::LoginRedirect => 0x00E7_4C3C,
        }
    }
}

/// Diagnostic context handed to a hook
#[derive(Debug, Clone, PartialEq)]
pub struct InterventionEvent {
    pub kind: InterventionKind,
    /// URL that was requested
    pub target_url: String,
    /// URL the browser actually shows
    pub current_url: String,
    pub page_title: String,
    pub page_len: usize,
}

/// Receives intervention events from the fetcher
#[async_trait]
pub trait InterventionHook: Send + Sync {
    async fn notify(&self, event: &InterventionEvent);
}

/// Logs events; the default hook
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHook;

#[async_trait]
impl InterventionHook for LogHook {
    async fn notify(&self, event: &InterventionEvent) {
        warn!(
            "{}: {} (showing {}, title '{}', {} bytes)",
            event.kind.headline(),
            event.target_url,
            event.current_url,
            event.page_title,
            event.page_len
        );
    }
}

/// Webhook client posting intervention events.
///
/// Constructed with an optional URL so callers can wire it unconditionally;
/// without a URL every event is only logged.
#[derive(Clone)]
pub struct WebhookNotifier {
    /// Reusable HTTP client; connection pools are shared between clones
    client: Client,

    /// Webhook endpoint, from `INTERVENTION_WEBHOOK_URL`
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        if webhook_url.is_none() {
            warn!("INTERVENTION_WEBHOOK_URL not set - intervention alerts will only be logged");
        }

        Self {
            client: Client::new(),
            webhook_url,
        }
    }

    /// Build the embed message for an event
    pub fn message(event: &InterventionEvent) -> WebhookMessage {
        let field = |name: &str, value: String, inline: bool| WebhookField {
            name: name.to_string(),
            value: if value.is_empty() { "-".to_string() } else { value },
            inline,
        };

        WebhookMessage {
            embeds: vec![WebhookEmbed {
                title: event.kind.headline().to_string(),
                description: event.target_url.clone(),
                url: event.target_url.clone(),
                color: event.kind.color(),
                timestamp: Utc::now().to_rfc3339(),
                fields: vec![
                    field("Current URL", event.current_url.clone(), false),
                    field("Page title", event.page_title.clone(), true),
                    field("Page size", format!("{} bytes", event.page_len), true),
                ],
            }],
        }
    }

    /// Post an event to the webhook.
    ///
    /// Returns `Ok(())` when no webhook is configured. HTTP error statuses are
    /// logged; network failures are returned.
    pub async fn send(&self, event: &InterventionEvent) -> anyhow::Result<()> {
        let Some(webhook_url) = &self.webhook_url else {
            return Ok(());
        };

        let response = self
            .client
            .post(webhook_url)
            .json(&Self::message(event))
            .send()
            .await?;

        if response.status().is_success() {
            info!("Intervention alert sent for {}", event.target_url);
        } else {
            error!("Failed to send intervention alert: {}", response.status());
        }

        Ok(())
    }
}

#[async_trait]
impl InterventionHook for WebhookNotifier {
    async fn notify(&self, event: &InterventionEvent) {
        LogHook.notify(event).await;
        if let Err(e) = self.send(event).await {
            error!("Intervention webhook unreachable: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event(kind: InterventionKind) -> InterventionEvent {
        InterventionEvent {
            kind,
            target_url: "https://detail.1688.com/offer/1.html".to_string(),
            current_url: "https://detail.1688.com/offer/1.html?punish=1".to_string(),
            page_title: "验证码拦截".to_string(),
            page_len: 2048,
        }
    }

    #[tokio::test]
    async fn posts_embed_to_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "embeds": [{
                    "url": "https://detail.1688.com/offer/1.html",
                    "color": 0x00E7_4C3C,
                }]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(Some(format!("{}/hook", server.uri())));
        notifier.notify(&event(InterventionKind::RecoveryExhausted)).await;
    }

    #[tokio::test]
    async fn unconfigured_webhook_is_a_no_op() {
        let notifier = WebhookNotifier::new(None);
        assert!(notifier.send(&event(InterventionKind::LoginRedirect)).await.is_ok());
    }

    #[test]
    fn message_carries_diagnostics() {
        let message = WebhookNotifier::message(&event(InterventionKind::ChallengeSuspected));
        let embed = &message.embeds[0];
        assert_eq!(embed.color, 0x00F1_C40F);
        assert_eq!(embed.fields[1].value, "验证码拦截");
        assert_eq!(embed.fields[2].value, "2048 bytes");
    }
}
