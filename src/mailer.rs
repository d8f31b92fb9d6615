use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, warn};

use crate::config::MailConfig;

/// Outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> anyhow::Result<()>;
}

/// SMTP mailer. Without a configured host it only logs what it would send.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .context("invalid SMTP_FROM address")?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; mailer will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .context("configure SMTP transport")?
            .port(config.smtp_port);

            let builder = match (&config.smtp_username, &config.smtp_password) {
                (Some(username), Some(password)) => {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                }
                _ => builder,
            };
            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> anyhow::Result<()> {
        let Some(transport) = &self.transport else {
            info!(subject, recipient, "mailer in no-op mode; skipping send");
            return Ok(());
        };

        let to = recipient
            .parse::<Mailbox>()
            .context("invalid recipient address")?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("build email message")?;

        transport.send(email).await.context("smtp send")?;
        info!(subject, recipient, "email sent");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

/// Keeps every message in memory; can be switched to fail for error-path tests.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: Mutex<bool>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = failing;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> anyhow::Result<()> {
        if *self.failing.lock().unwrap_or_else(|e| e.into_inner()) {
            anyhow::bail!("delivery refused for {recipient}");
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentMail {
                subject: subject.to_string(),
                body: body.to_string(),
                recipient: recipient.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_op_config() -> MailConfig {
        MailConfig {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "MatkaMestre <no-reply@example.com>".into(),
            use_starttls: true,
        }
    }

    #[tokio::test]
    async fn smtp_mailer_without_host_is_a_no_op() {
        let mailer = SmtpMailer::new(&no_op_config()).expect("mailer");
        assert!(!mailer.is_enabled());
        mailer
            .send("subject", "body", "someone@example.com")
            .await
            .expect("no-op send succeeds");
    }

    #[test]
    fn smtp_mailer_rejects_bad_from_address() {
        let mut config = no_op_config();
        config.smtp_from = "not an address".into();
        assert!(SmtpMailer::new(&config).is_err());
    }

    #[tokio::test]
    async fn recording_mailer_records_and_fails_on_demand() {
        let mailer = RecordingMailer::default();
        mailer.send("hi", "body", "a@x.com").await.unwrap();
        mailer.set_failing(true);
        assert!(mailer.send("hi", "body", "b@x.com").await.is_err());
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "a@x.com");
    }
}
