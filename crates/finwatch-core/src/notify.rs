//! Email dispatch with dry-run support.

use std::sync::Arc;

use finwatch_abstraction::{EmailMessage, Notifier, NotifyError};
use tracing::info;

/// What happened to a message handed to [`Mailer::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The notifier accepted the message.
    Dispatched,
    /// Dry run: the message was logged only.
    Logged,
}

/// Sends emails from a fixed sender address, or logs them in dry-run mode.
#[derive(Clone)]
pub struct Mailer {
    notifier: Arc<dyn Notifier>,
    sender: String,
    dry_run: bool,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("sender", &self.sender)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Mailer {
    /// Creates a mailer that dispatches through `notifier`.
    pub fn new(notifier: Arc<dyn Notifier>, sender: impl Into<String>) -> Self {
        Self { notifier, sender: sender.into(), dry_run: false }
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether messages are only logged.
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Sends one email to `recipient`.
    ///
    /// In dry-run mode the full message is logged and the notifier is never called.
    pub async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Delivery, NotifyError> {
        let message = EmailMessage {
            from: self.sender.clone(),
            to: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        if self.dry_run {
            info!(
                recipient = %message.to,
                subject = %message.subject,
                body = %message.body,
                "DRY RUN - would send email"
            );
            return Ok(Delivery::Logged);
        }

        info!(recipient = %message.to, subject = %message.subject, "Sending email");
        self.notifier.send(&message).await?;
        Ok(Delivery::Dispatched)
    }
}
