//! Alert submission via SMTP.
//!
//! One consolidated email per run, and only when at least one server
//! crossed its threshold. A quiet run never opens a relay connection.

use queuewatch_core::{AlertBatch, EmailConfig, EmailEnvelope};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for alert submission failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// SMTP transport-level failure (connection, or refusal at any step of
    /// the dialogue).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// A configured address could not be parsed as a mailbox.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// An alert fired but To, Cc and Bcc are all empty.
    #[error("Alert raised but no recipients are configured")]
    NoRecipients,

    /// The relay envelope could not be assembled.
    #[error("Envelope build error: {0}")]
    Envelope(String),
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// What a dispatch call decided, for the final log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The alert email was handed to the relay.
    Sent,
    /// No threshold was crossed; nothing was sent.
    Skipped,
}

/// Submit the alert for a batch, or do nothing when no threshold was
/// crossed. At most one submission attempt, no retry.
pub async fn dispatch(
    batch: &AlertBatch,
    email: &EmailConfig,
) -> Result<DispatchOutcome, DispatchError> {
    if !batch.any_exceeded || batch.lines.is_empty() {
        return Ok(DispatchOutcome::Skipped);
    }
    let envelope = EmailEnvelope::compose(batch, email);
    send(&envelope, email).await?;
    Ok(DispatchOutcome::Sent)
}

/// Hand one composed alert to the relay.
///
/// The message bytes come from [`EmailEnvelope::to_rfc5322`] and the relay
/// recipient set from [`EmailEnvelope::recipients`], so blind-copy
/// recipients take part in the SMTP dialogue without appearing in the
/// message text.
async fn send(envelope: &EmailEnvelope, email: &EmailConfig) -> Result<(), DispatchError> {
    use lettre::address::Envelope;
    use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

    let recipients = envelope.recipients();
    if recipients.is_empty() {
        return Err(DispatchError::NoRecipients);
    }

    let from = envelope.from.parse::<Address>()?;
    let rcpt = recipients
        .iter()
        .map(|r| r.parse::<Address>())
        .collect::<Result<Vec<_>, _>>()?;
    let smtp_envelope =
        Envelope::new(Some(from), rcpt).map_err(|e| DispatchError::Envelope(e.to_string()))?;

    // Plaintext relay dialogue unless STARTTLS was asked for.
    let transport_builder = if email.starttls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.smtp_server)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(email.smtp_server.as_str())
    };
    let mailer: AsyncSmtpTransport<Tokio1Executor> =
        transport_builder.port(email.smtp_port).build();

    mailer
        .send_raw(&smtp_envelope, envelope.to_rfc5322().as_bytes())
        .await?;

    tracing::info!(
        relay = %email.smtp_server,
        port = email.smtp_port,
        recipients = recipients.len(),
        "Alert email submitted"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
