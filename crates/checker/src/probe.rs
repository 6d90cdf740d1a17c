//! SSH command execution against a single server.
//!
//! [`SshProbe`] opens one connection per probe, authenticates with the
//! resolved method, runs the configured command in one exec session, and
//! captures stdout and stderr separately. Connections, sessions and agent
//! sockets live only as long as the probe call that opened them.
//!
//! Host keys are accepted without verification unless the server entry
//! pins a fingerprint. The unverified default mirrors how the fleet was
//! operated before pinning existed and is a documented limitation.

use std::sync::Arc;

use async_trait::async_trait;
use russh::client;
use russh::keys::agent::client::AgentClient;
use russh::keys::{HashAlg, PublicKey};
use russh::ChannelMsg;

use queuewatch_core::ServerTarget;

use crate::auth::{self, AuthMethod};

/// Why a single server produced no report line. Every variant is scoped to
/// the server that raised it; the fleet run continues past it.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("no password configured and {} is not set", auth::AGENT_SOCK_ENV)]
    NoAuthAvailable,

    #[error("ssh agent lookup failed: {detail}")]
    AgentLookup { detail: String },

    #[error("failed to connect to {addr}: {detail}")]
    Connect { addr: String, detail: String },

    #[error("failed to open session on {host}: {detail}")]
    Session { host: String, detail: String },

    #[error("command failed on {host}: {detail}, stderr: {stderr:?}")]
    Command {
        host: String,
        detail: String,
        stderr: String,
    },

    #[error("output is not a number: {raw:?}")]
    Parse { raw: String },
}

/// Executes one remote command against one target.
///
/// The trait is the seam between the fleet runner and the network: tests
/// drive the runner with a scripted implementation, production uses
/// [`SshProbe`].
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run the target's command and return its trimmed stdout.
    async fn execute(&self, target: &ServerTarget) -> Result<String, ProbeError>;
}

/// Host key acceptance for one connection.
struct HostKeyPolicy {
    /// Expected `SHA256:...` fingerprint. `None` accepts any key.
    pinned: Option<String>,
}

impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.pinned {
            None => Ok(true),
            Some(expected) => Ok(fingerprint_matches(expected, server_public_key)),
        }
    }
}

/// Compare a configured pin against the presented key's SHA-256
/// fingerprint. The `SHA256:` prefix is optional in the config.
fn fingerprint_matches(expected: &str, key: &PublicKey) -> bool {
    let fingerprint = key.fingerprint(HashAlg::Sha256).to_string();
    fingerprint == expected || fingerprint.strip_prefix("SHA256:") == Some(expected)
}

/// Production [`Probe`] implementation over SSH.
pub struct SshProbe;

#[async_trait]
impl Probe for SshProbe {
    async fn execute(&self, target: &ServerTarget) -> Result<String, ProbeError> {
        let method = auth::resolve(target.password.as_deref()).await?;
        let addr = format!("{}:{}", target.host, target.port);

        let config = Arc::new(client::Config::default());
        let handler = HostKeyPolicy {
            pinned: target.host_key.clone(),
        };

        let mut session = client::connect(config, (target.host.as_str(), target.port), handler)
            .await
            .map_err(|e| connect_error(&addr, e))?;

        authenticate(&mut session, &target.user, &method, &addr).await?;

        let output = run_command(&mut session, target).await;

        // Polite shutdown; the transport is torn down on drop regardless.
        let _ = session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await;

        output
    }
}

fn connect_error(addr: &str, e: russh::Error) -> ProbeError {
    let detail = match e {
        // Raised when the handler refuses the host key, i.e. a pin mismatch.
        russh::Error::UnknownKey => "host key fingerprint does not match the pinned value".to_string(),
        e => e.to_string(),
    };
    ProbeError::Connect {
        addr: addr.to_string(),
        detail,
    }
}

/// Authenticate an established connection with the resolved method.
///
/// A server-side credential rejection classifies as a connect failure: the
/// server was reached but refused to let us in.
async fn authenticate(
    session: &mut client::Handle<HostKeyPolicy>,
    user: &str,
    method: &AuthMethod,
    addr: &str,
) -> Result<(), ProbeError> {
    match method {
        AuthMethod::Password(password) => {
            let result = session
                .authenticate_password(user, password.as_str())
                .await
                .map_err(|e| connect_error(addr, e))?;
            if !result.success() {
                return Err(rejected(addr, "password"));
            }
        }
        AuthMethod::AgentIdentities(identities) => {
            // Signing happens in the agent, so the handshake needs its own
            // agent connection for the duration of the attempts.
            let mut agent = AgentClient::connect_env()
                .await
                .map_err(|e| ProbeError::AgentLookup {
                    detail: e.to_string(),
                })?;
            let hash_alg = session
                .best_supported_rsa_hash()
                .await
                .map_err(|e| connect_error(addr, e))?
                .flatten();
            for key in identities {
                let result = session
                    .authenticate_publickey_with(user, key.clone(), hash_alg, &mut agent)
                    .await
                    .map_err(|e| ProbeError::Connect {
                        addr: addr.to_string(),
                        detail: e.to_string(),
                    })?;
                if result.success() {
                    return Ok(());
                }
            }
            return Err(rejected(addr, "public-key"));
        }
    }
    Ok(())
}

fn rejected(addr: &str, mechanism: &str) -> ProbeError {
    ProbeError::Connect {
        addr: addr.to_string(),
        detail: format!("{mechanism} authentication rejected by server"),
    }
}

/// Run the target's command in a fresh exec session and collect both output
/// streams until the channel closes.
async fn run_command(
    session: &mut client::Handle<HostKeyPolicy>,
    target: &ServerTarget,
) -> Result<String, ProbeError> {
    let mut channel = session.channel_open_session().await.map_err(|e| {
        ProbeError::Session {
            host: target.host.clone(),
            detail: e.to_string(),
        }
    })?;

    channel
        .exec(true, target.command.as_str())
        .await
        .map_err(|e| ProbeError::Session {
            host: target.host.clone(),
            detail: e.to_string(),
        })?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_status = None;

    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
            // ext 1 is the stderr stream.
            ChannelMsg::ExtendedData { ref data, ext: 1 } => stderr.extend_from_slice(data),
            ChannelMsg::ExitStatus { exit_status: status } => {
                // Keep draining: data can still arrive after the status.
                exit_status = Some(status);
            }
            _ => {}
        }
    }

    let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
    match exit_status {
        Some(0) => Ok(String::from_utf8_lossy(&stdout).trim().to_string()),
        Some(code) => Err(ProbeError::Command {
            host: target.host.clone(),
            detail: format!("exit status {code}"),
            stderr,
        }),
        None => Err(ProbeError::Command {
            host: target.host.clone(),
            detail: "channel closed without an exit status".to_string(),
            stderr,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Structurally valid ed25519 public key for fingerprint checks.
    const TEST_KEY: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8g test@queuewatch";

    #[test]
    fn fingerprint_accepts_exact_and_unprefixed_pins() {
        let key = PublicKey::from_openssh(TEST_KEY).unwrap();
        let fingerprint = key.fingerprint(HashAlg::Sha256).to_string();
        assert!(fingerprint_matches(&fingerprint, &key));

        let bare = fingerprint.strip_prefix("SHA256:").unwrap();
        assert!(fingerprint_matches(bare, &key));
    }

    #[test]
    fn fingerprint_rejects_other_pins() {
        let key = PublicKey::from_openssh(TEST_KEY).unwrap();
        assert!(!fingerprint_matches("SHA256:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", &key));
        assert!(!fingerprint_matches("", &key));
    }

    /// Failure messages carry enough context to act on from the log alone.
    #[test]
    fn error_messages_name_the_server() {
        let err = ProbeError::Command {
            host: "mail1.example.com".to_string(),
            detail: "exit status 127".to_string(),
            stderr: "sh: mailq: not found".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("mail1.example.com"));
        assert!(text.contains("exit status 127"));
        assert!(text.contains("mailq: not found"));
    }

    #[test]
    fn parse_error_shows_raw_output() {
        let err = ProbeError::Parse {
            raw: "Mail queue is empty".to_string(),
        };
        assert!(err.to_string().contains("Mail queue is empty"));
    }
}
