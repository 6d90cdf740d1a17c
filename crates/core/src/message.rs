//! Alert email composition.
//!
//! The message text is assembled here rather than by a message builder so
//! that header layout and blind-copy semantics stay in one place: the `Cc`
//! header appears only when there are Cc recipients, and Bcc addresses are
//! part of the delivery set but never of the message text.

use crate::config::EmailConfig;
use crate::report::AlertBatch;

/// A fully composed alert email, ready for a single submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailEnvelope {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    /// Template paragraph followed by one rendered line per server.
    pub body: String,
}

impl EmailEnvelope {
    /// Compose the alert for a batch: the configured template, a blank
    /// line, then every report line in batch order.
    pub fn compose(batch: &AlertBatch, email: &EmailConfig) -> Self {
        let lines: Vec<String> = batch.lines.iter().map(|line| line.render()).collect();
        EmailEnvelope {
            from: email.from.clone(),
            to: email.to.clone(),
            cc: email.cc.clone(),
            bcc: email.bcc.clone(),
            subject: email.subject.clone(),
            body: format!("{}\n\n{}", email.message, lines.join("\n")),
        }
    }

    /// Every address the relay must deliver to, in To, Cc, Bcc order.
    pub fn recipients(&self) -> Vec<&str> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .map(String::as_str)
            .collect()
    }

    /// Render the RFC 5322 message text: `From` and `To` always, `Cc` only
    /// when non-empty, never `Bcc`, then `Subject`, a blank line, and the
    /// body. Line endings come out as CRLF.
    pub fn to_rfc5322(&self) -> String {
        let mut text = format!("From: {}\nTo: {}\n", self.from, self.to.join(", "));
        if !self.cc.is_empty() {
            text.push_str(&format!("Cc: {}\n", self.cc.join(", ")));
        }
        text.push_str(&format!("Subject: {}\n\n{}", self.subject, self.body));
        // Normalize in two steps so pre-existing CRLF does not double up.
        text.replace("\r\n", "\n").replace('\n', "\r\n")
    }
}
