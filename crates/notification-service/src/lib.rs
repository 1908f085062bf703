mod digest;
mod smtp;

pub use digest::{compose, subject_for, AssetSummary, Digest};
pub use smtp::SmtpNotifier;

use async_trait::async_trait;
use std::str::FromStr;

/// Trait for delivery channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, digest: &Digest) -> Result<(), NotificationError>;
    fn name(&self) -> &str;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Configuration for the notification service.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_to: Vec<String>,
    pub smtp_tls: SmtpTls,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SmtpTls {
    #[default]
    StartTls,
    Tls,
    None,
}

impl FromStr for SmtpTls {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(SmtpTls::StartTls),
            "tls" => Ok(SmtpTls::Tls),
            "none" => Ok(SmtpTls::None),
            other => Err(NotificationError::Config(format!(
                "Unknown SMTP_TLS mode {:?} (expected starttls, tls or none)",
                other
            ))),
        }
    }
}

impl NotificationConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let smtp_to = var("NOTIFICATION_EMAIL_TO")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let smtp_tls = var("SMTP_TLS")
            .map(|raw| {
                raw.parse().unwrap_or_else(|e| {
                    tracing::warn!("{}; using STARTTLS", e);
                    SmtpTls::default()
                })
            })
            .unwrap_or_default();

        Self {
            smtp_host: var("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port: var("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(587),
            smtp_username: var("SMTP_USERNAME"),
            smtp_password: var("SMTP_PASSWORD"),
            smtp_from: var("SMTP_FROM_ADDRESS"),
            smtp_to,
            smtp_tls,
        }
    }

    /// Sender address, falling back to the login name.
    pub fn from_address(&self) -> Option<&str> {
        self.smtp_from.as_deref().or(self.smtp_username.as_deref())
    }
}

/// Delivers digests to every configured channel.
pub struct NotificationService {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationService {
    pub fn new(config: &NotificationConfig) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        match SmtpNotifier::new(config) {
            Ok(notifier) => {
                tracing::info!(
                    "Email notifications enabled (SMTP {}:{} -> {} recipients)",
                    config.smtp_host,
                    config.smtp_port,
                    config.smtp_to.len()
                );
                channels.push(Box::new(notifier));
            }
            Err(e) => {
                tracing::warn!("Failed to initialize SMTP notifier: {}", e);
            }
        }

        Self { channels }
    }

    pub fn with_channels(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Send to all channels. True only if there is at least one channel and
    /// every channel accepted the digest. Failures are logged, never raised.
    pub async fn send(&self, subject: &str, body: &str) -> bool {
        let digest = Digest {
            subject: subject.to_string(),
            body: body.to_string(),
        };
        self.deliver(&digest).await
    }

    pub async fn deliver(&self, digest: &Digest) -> bool {
        if self.channels.is_empty() {
            tracing::error!("No notification channels configured; digest not sent");
            return false;
        }

        let mut delivered = true;
        for channel in &self.channels {
            match channel.send(digest).await {
                Ok(()) => tracing::info!("Digest sent via {}", channel.name()),
                Err(e) => {
                    tracing::error!("Failed to send digest via {}: {}", channel.name(), e);
                    delivered = false;
                }
            }
        }
        delivered
    }
}
