//! Outbound mail transport.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use call_assistant_config::MailConfig;

use crate::WorkflowError;

/// Delivers one notification to the collector mailbox.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), WorkflowError>;
}

/// SMTP mailer; port 465 speaks SSL, 587 STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    collector: Mailbox,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, WorkflowError> {
        let sender: Mailbox = config
            .sender
            .parse()
            .map_err(|e| WorkflowError::SubmissionFailed(format!("bad sender address: {e}")))?;
        let collector: Mailbox = config
            .collector
            .parse()
            .map_err(|e| WorkflowError::SubmissionFailed(format!("bad collector address: {e}")))?;

        // App passwords are often pasted with grouping spaces.
        let credentials = Credentials::new(config.sender.clone(), config.app_password.replace(' ', ""));

        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .map_err(|e| WorkflowError::SubmissionFailed(format!("bad SMTP relay: {e}")))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            sender,
            collector,
            timeout: Duration::from_secs(config.send_timeout_secs),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, subject: &str, body: &str) -> Result<(), WorkflowError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(self.collector.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| WorkflowError::SubmissionFailed(format!("could not build email: {e}")))?;

        let delivery = tokio::time::timeout(self.timeout, self.transport.send(message))
            .await
            .map_err(|_| {
                WorkflowError::SubmissionFailed(format!("mail send timed out after {:?}", self.timeout))
            })?;

        delivery.map_err(|e| WorkflowError::SubmissionFailed(e.to_string()))?;
        tracing::info!(subject, to = %self.collector, "notification email sent");
        Ok(())
    }
}

/// Stand-in used when no mail transport is configured; every send
/// fails as a submission failure so the caller hears the right apology.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, _subject: &str, _body: &str) -> Result<(), WorkflowError> {
        Err(WorkflowError::SubmissionFailed(
            "mail transport not configured".to_string(),
        ))
    }
}
