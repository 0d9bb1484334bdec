//! Best-effort email notifications for story lifecycle events.
//!
//! Delivery is fire-and-forget: `Mailer::dispatch` spawns the send and logs
//! failures. Nothing in the request path ever waits on, or fails because of,
//! an email.

use lettre::message::Mailbox;
use lettre::transport::smtp;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Smtp(#[from] smtp::Error),
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub from_address: String,
}

/// A lifecycle event worth telling the submitter about.
#[derive(Debug, Clone)]
pub enum Notification {
    SubmissionReceived { submitter: String, title: String },
    StoryApproved { submitter: String, title: String },
    StoryRejected {
        submitter: String,
        title: String,
        reason: Option<String>,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::SubmissionReceived { .. } => "submission received",
            Notification::StoryApproved { .. } => "approved",
            Notification::StoryRejected { .. } => "rejected",
        }
    }

    fn subject(&self) -> &'static str {
        match self {
            Notification::SubmissionReceived { .. } => "We received your story",
            Notification::StoryApproved { .. } => "Your story has been published",
            Notification::StoryRejected { .. } => "An update on your story",
        }
    }

    fn body(&self) -> String {
        match self {
            Notification::SubmissionReceived { submitter, title } => format!(
                "Hi {submitter},\n\n\
                 Thank you for sharing \"{title}\" with us. Our review team reads \
                 every submission and you will hear from us once a decision is made.\n",
            ),
            Notification::StoryApproved { submitter, title } => format!(
                "Hi {submitter},\n\n\
                 Good news: \"{title}\" has been approved and is now live on the site.\n",
            ),
            Notification::StoryRejected {
                submitter,
                title,
                reason,
            } => match reason {
                Some(reason) => format!(
                    "Hi {submitter},\n\n\
                     We are sorry, but \"{title}\" was not selected for publication.\n\n\
                     Reviewer note: {reason}\n",
                ),
                None => format!(
                    "Hi {submitter},\n\n\
                     We are sorry, but \"{title}\" was not selected for publication.\n",
                ),
            },
        }
    }
}

#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = Mailbox {
            name: Some(config.from_name.clone()),
            email: config.from_address.parse::<Address>()?,
        };

        Ok(Self { transport, from })
    }

    pub async fn send(&self, to: &str, notification: &Notification) -> Result<(), NotifyError> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(Mailbox {
                name: None,
                email: to.parse::<Address>()?,
            })
            .subject(notification.subject())
            .body(notification.body())?;

        self.transport.send(msg).await?;
        Ok(())
    }

    /// Spawn the send on the runtime and forget it. Failures are logged and
    /// discarded; no retry is attempted.
    pub fn dispatch(&self, to: String, notification: Notification) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(err) = mailer.send(&to, &notification).await {
                warn!(
                    "failed to send \"{}\" notification to {}: {}",
                    notification.kind(),
                    to,
                    err
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_body_includes_reason_when_present() {
        let with_reason = Notification::StoryRejected {
            submitter: "Ada".into(),
            title: "The Long Walk".into(),
            reason: Some("duplicate submission".into()),
        };
        assert!(with_reason.body().contains("duplicate submission"));

        let without = Notification::StoryRejected {
            submitter: "Ada".into(),
            title: "The Long Walk".into(),
            reason: None,
        };
        assert!(!without.body().contains("Reviewer note"));
    }

    #[test]
    fn subjects_differ_by_event() {
        let received = Notification::SubmissionReceived {
            submitter: "Ada".into(),
            title: "T".into(),
        };
        let approved = Notification::StoryApproved {
            submitter: "Ada".into(),
            title: "T".into(),
        };
        assert_ne!(received.subject(), approved.subject());
    }
}
