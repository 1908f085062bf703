use async_trait::async_trait;
use std::future::Future;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{Digest, NotificationChannel, NotificationConfig, NotificationError, SmtpTls};

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let from_addr = config
            .from_address()
            .ok_or_else(|| NotificationError::Config("SMTP_FROM_ADDRESS or SMTP_USERNAME not set".into()))?;

        let from: Mailbox = from_addr
            .parse()
            .map_err(|e| NotificationError::Config(format!("Invalid from address: {}", e)))?;

        let to: Vec<Mailbox> = config
            .smtp_to
            .iter()
            .filter_map(|addr| match addr.parse() {
                Ok(mailbox) => Some(mailbox),
                Err(e) => {
                    tracing::warn!("Skipping invalid recipient {}: {}", addr, e);
                    None
                }
            })
            .collect();

        if to.is_empty() {
            return Err(NotificationError::Config(
                "No valid NOTIFICATION_EMAIL_TO addresses".into(),
            ));
        }

        let credentials = match (&config.smtp_username, &config.smtp_password) {
            (Some(user), Some(pass)) => Credentials::new(user.clone(), pass.clone()),
            _ => {
                return Err(NotificationError::Config(
                    "SMTP_USERNAME and SMTP_PASSWORD are required".into(),
                ))
            }
        };

        let host = config.smtp_host.as_str();
        let builder = match config.smtp_tls {
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            SmtpTls::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                host,
            )),
        }
        .map_err(|e| NotificationError::Smtp(format!("SMTP transport error: {}", e)))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    fn build_message(&self, recipient: &Mailbox, digest: &Digest) -> Result<Message, NotificationError> {
        Message::builder()
            .from(self.from.clone())
            .to(recipient.clone())
            .subject(&digest.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(digest.body.clone())
            .map_err(|e| NotificationError::Smtp(format!("Failed to build email: {}", e)))
    }
}

/// Every recipient is tried; the first failure is returned afterwards.
async fn send_to_each<'a, F, Fut>(
    recipients: &'a [Mailbox],
    mut send_one: F,
) -> Result<(), NotificationError>
where
    F: FnMut(&'a Mailbox) -> Fut,
    Fut: Future<Output = Result<(), NotificationError>>,
{
    let mut first_error = None;
    for recipient in recipients {
        if let Err(e) = send_one(recipient).await {
            tracing::error!("Failed to send digest to {}: {}", recipient, e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[async_trait]
impl NotificationChannel for SmtpNotifier {
    async fn send(&self, digest: &Digest) -> Result<(), NotificationError> {
        send_to_each(&self.to, |recipient| async move {
            let email = self.build_message(recipient, digest)?;

            self.transport
                .send(email)
                .await
                .map(|_| ())
                .map_err(|e| NotificationError::Smtp(format!("Failed to send email: {}", e)))
        })
        .await
    }

    fn name(&self) -> &str {
        "smtp"
    }
}
