//! Fleet configuration schema and loading.
//!
//! The config document is YAML with two sections: `servers` (the fleet, in
//! report order) and `email` (alert routing). Loading only checks that the
//! document matches the schema; semantic rules live in
//! [`validate`](crate::validate) and must pass before the config is used.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// SSH port applied when a server entry does not name one.
pub const DEFAULT_SSH_PORT: u16 = 22;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// Servers to probe. Their order here is the report order.
    pub servers: Vec<ServerConfig>,
    /// Alert email settings.
    pub email: EmailConfig,
}

/// One server entry as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// SSH login user.
    pub user: String,
    /// Inline SSH password. Absent or empty means "ask the SSH agent".
    #[serde(default)]
    pub password: Option<String>,
    /// Hostname or IPv4 address.
    pub host: String,
    /// SSH port. Defaults to 22 when omitted.
    #[serde(default)]
    pub port: Option<u16>,
    /// Command whose stdout is the queue depth.
    pub command: String,
    /// Inclusive alert threshold: a depth at or above this value alerts.
    pub threshold: i64,
    /// Optional pinned host key fingerprint (`SHA256:...`). Without a pin
    /// any presented host key is accepted.
    #[serde(default)]
    pub host_key: Option<String>,
}

/// Alert email settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay hostname.
    pub smtp_server: String,
    /// SMTP relay port.
    pub smtp_port: u16,
    /// Sender address.
    pub from: String,
    /// Primary recipients.
    #[serde(default)]
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    #[serde(default)]
    pub cc: Vec<String>,
    /// Blind-copy recipients. Delivered to, but never named in the message.
    #[serde(default)]
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Static body text placed above the per-server report lines.
    pub message: String,
    /// Upgrade the relay connection with STARTTLS. Off by default: the
    /// relay dialogue is plaintext unless asked otherwise.
    #[serde(default)]
    pub starttls: bool,
}

/// A normalized probe target: port always present, empty password strings
/// collapsed to `None`. Identity is the position in the configured list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub command: String,
    pub threshold: i64,
    pub host_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl FleetConfig {
    /// Load a configuration document from a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse a configuration document from YAML text.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Normalize the server list into probe targets, in config order.
    pub fn targets(&self) -> Vec<ServerTarget> {
        self.servers.iter().map(ServerConfig::normalize).collect()
    }
}

impl ServerConfig {
    /// Apply the default port and collapse empty passwords to `None`, so
    /// downstream code never re-checks either.
    fn normalize(&self) -> ServerTarget {
        ServerTarget {
            user: self.user.clone(),
            password: self
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(str::to_owned),
            host: self.host.clone(),
            port: self.port.unwrap_or(DEFAULT_SSH_PORT),
            command: self.command.clone(),
            threshold: self.threshold,
            host_key: self.host_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SAMPLE: &str = r#"
servers:
  - user: monitor
    password: hunter2
    host: mail1.example.com
    command: find /var/spool/mqueue -type f | wc -l
    threshold: 100
  - user: monitor
    host: 192.168.10.21
    port: 2222
    command: ls /var/spool/postfix/deferred | wc -l
    threshold: 10
email:
  smtp_server: smtp.example.com
  smtp_port: 25
  from: queuewatch@example.com
  to:
    - ops@example.com
  subject: queue depth alert
  message: The following servers are over their configured queue thresholds.
"#;

    /// The sample document parses and keeps server order.
    #[test]
    fn parses_sample_document() {
        let config = FleetConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].host, "mail1.example.com");
        assert_eq!(config.servers[1].host, "192.168.10.21");
        assert_eq!(config.email.smtp_port, 25);
        assert_eq!(config.email.to, vec!["ops@example.com"]);
    }

    /// An omitted port normalizes to 22; an explicit one is kept.
    #[test]
    fn port_defaults_to_22() {
        let config = FleetConfig::from_yaml(SAMPLE).unwrap();
        let targets = config.targets();
        assert_eq!(targets[0].port, DEFAULT_SSH_PORT);
        assert_eq!(targets[1].port, 2222);
    }

    /// An empty password string means the same as no password at all.
    #[test]
    fn empty_password_collapses_to_none() {
        let yaml = SAMPLE.replace("password: hunter2", "password: \"\"");
        let config = FleetConfig::from_yaml(&yaml).unwrap();
        let targets = config.targets();
        assert_eq!(targets[0].password, None);
        assert_eq!(targets[1].password, None);
    }

    /// A real password survives normalization.
    #[test]
    fn password_is_preserved() {
        let config = FleetConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.targets()[0].password.as_deref(), Some("hunter2"));
    }

    /// Optional email lists default to empty and STARTTLS stays off.
    #[test]
    fn optional_email_fields_default() {
        let config = FleetConfig::from_yaml(SAMPLE).unwrap();
        assert!(config.email.cc.is_empty());
        assert!(config.email.bcc.is_empty());
        assert!(!config.email.starttls);
    }

    /// A document missing a required section is a parse error, not a panic.
    #[test]
    fn missing_email_section_is_parse_error() {
        let yaml = "servers: []\n";
        assert_matches!(FleetConfig::from_yaml(yaml), Err(ConfigError::Parse(_)));
    }

    /// An unreadable path surfaces as a read error carrying the path.
    #[test]
    fn unreadable_path_is_read_error() {
        let err = FleetConfig::from_path("/definitely/not/here.yaml").unwrap_err();
        assert_matches!(err, ConfigError::Read { .. });
    }

    /// An out-of-range SMTP port is rejected by the schema itself.
    #[test]
    fn oversized_smtp_port_is_parse_error() {
        let yaml = SAMPLE.replace("smtp_port: 25", "smtp_port: 70000");
        assert_matches!(FleetConfig::from_yaml(&yaml), Err(ConfigError::Parse(_)));
    }
}
