//! Run result reporting.
//!
//! After all servers are processed, the results are rendered as one
//! webhook message with one colored embed per server and posted once.
//! Delivery problems are logged and never change the run's outcome.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::WebhookSettings;
use crate::error::{DbBackupError, Result};
use crate::models::BackupResult;

/// Embed color for a successful backup.
pub const SUCCESS_COLOR: u32 = 456_521;

/// Embed color for a failed backup.
pub const FAILURE_COLOR: u32 = 15_599_624;

/// One server's entry in the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    /// Server name
    pub title: String,
    /// Result message
    pub description: String,
    /// [`SUCCESS_COLOR`] or [`FAILURE_COLOR`]
    pub color: u32,
}

impl From<&BackupResult> for Embed {
    fn from(result: &BackupResult) -> Self {
        Self {
            title: result.server_name.clone(),
            description: result.message.clone(),
            color: if result.success {
                SUCCESS_COLOR
            } else {
                FAILURE_COLOR
            },
        }
    }
}

/// JSON body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Sender display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Sender avatar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Summary line
    pub content: String,
    /// Per-server entries, in run order
    pub embeds: Vec<Embed>,
}

/// Delivers a rendered run report.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `payload` once.
    ///
    /// # Errors
    /// Returns [`DbBackupError::Notification`] if delivery fails
    async fn notify(&self, payload: &WebhookPayload) -> Result<()>;
}

/// Posts reports to an HTTP webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: url::Url,
}

impl WebhookNotifier {
    /// Creates a notifier posting to `url`.
    ///
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn new(url: url::Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dbbackup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                DbBackupError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, payload: &WebhookPayload) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| DbBackupError::notification("webhook request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DbBackupError::notification_rejected(format!(
                "webhook responded with {}",
                status
            )));
        }

        // Drain the body so the connection can be reused
        response
            .bytes()
            .await
            .map_err(|e| DbBackupError::notification("failed to read webhook response", e))?;

        Ok(())
    }
}

/// Renders run results and hands them to a [`Notifier`].
pub struct ResultReporter {
    notifier: Option<Box<dyn Notifier>>,
    username: Option<String>,
    avatar_url: Option<String>,
}

impl ResultReporter {
    /// Creates a reporter delivering through `notifier`.
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self {
            notifier: Some(notifier),
            username: None,
            avatar_url: None,
        }
    }

    /// Creates a reporter that only logs the summary.
    pub fn disabled() -> Self {
        Self {
            notifier: None,
            username: None,
            avatar_url: None,
        }
    }

    /// Builds a webhook reporter, or a log-only one when no webhook is set.
    pub fn from_settings(webhook: Option<&WebhookSettings>) -> Result<Self> {
        match webhook {
            Some(webhook) => Ok(Self::new(Box::new(WebhookNotifier::new(webhook.url.clone())?))
                .with_sender(webhook.username.clone(), webhook.avatar_url.clone())),
            None => Ok(Self::disabled()),
        }
    }

    /// Builder method to set the sender name and avatar.
    pub fn with_sender(mut self, username: Option<String>, avatar_url: Option<String>) -> Self {
        self.username = username;
        self.avatar_url = avatar_url;
        self
    }

    /// Renders `results` as a webhook payload stamped with `now`.
    pub fn payload(&self, results: &[BackupResult], now: DateTime<Local>) -> WebhookPayload {
        WebhookPayload {
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            content: format!(
                "backup result of date : {}",
                now.format("%Y-%m-%d %H:%M:%S")
            ),
            embeds: results.iter().map(Embed::from).collect(),
        }
    }

    /// Logs a summary of `results` and sends one notification.
    ///
    /// Never fails: delivery errors are logged.
    pub async fn report(&self, results: &[BackupResult]) {
        let failed = results.iter().filter(|r| !r.success).count();
        info!(
            "Backup run finished: {} succeeded, {} failed",
            results.len().saturating_sub(failed),
            failed
        );

        let Some(notifier) = &self.notifier else {
            info!("No webhook configured, skipping notification");
            return;
        };

        let payload = self.payload(results, Local::now());
        match notifier.notify(&payload).await {
            Ok(()) => info!("Sent backup report with {} entries", payload.embeds.len()),
            Err(e) => error!("Failed to send backup report: {}", e),
        }

        if failed > 0 {
            warn!("{} server(s) failed to back up", failed);
        }
    }
}
