//! SSH credential resolution.
//!
//! A server entry with an inline password authenticates with it directly.
//! Otherwise the local SSH agent named by `SSH_AUTH_SOCK` is asked for its
//! identities. Having neither is a failure for that server only; the rest
//! of the fleet is unaffected.

use russh::keys::agent::client::AgentClient;
use russh::keys::PublicKey;

use crate::probe::ProbeError;

/// Environment variable naming the agent's unix socket.
pub const AGENT_SOCK_ENV: &str = "SSH_AUTH_SOCK";

/// How a probe should authenticate.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Inline password from the config file.
    Password(String),
    /// Public keys enumerated from the SSH agent. The agent itself signs
    /// for them during the handshake.
    AgentIdentities(Vec<PublicKey>),
}

/// Resolve the authentication method for one server.
///
/// A non-empty password wins without touching the agent. The agent
/// connection opened for enumeration is dropped before this returns; the
/// handshake later opens its own.
pub async fn resolve(password: Option<&str>) -> Result<AuthMethod, ProbeError> {
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        return Ok(AuthMethod::Password(password.to_string()));
    }

    if std::env::var_os(AGENT_SOCK_ENV).is_none() {
        return Err(ProbeError::NoAuthAvailable);
    }

    let mut agent = AgentClient::connect_env()
        .await
        .map_err(|e| ProbeError::AgentLookup {
            detail: e.to_string(),
        })?;
    let identities = agent
        .request_identities()
        .await
        .map_err(|e| ProbeError::AgentLookup {
            detail: e.to_string(),
        })?;
    Ok(AuthMethod::AgentIdentities(identities))
}
