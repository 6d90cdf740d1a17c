//! Fleet configuration validation.
//!
//! Every rule runs before any server is probed; the first violation aborts
//! the run with a message naming the offending entry. The command charset
//! is deliberately narrow because the command travels to a remote shell
//! verbatim.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{EmailConfig, FleetConfig, ServerConfig};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Unix login grammar: lowercase or underscore start, then up to 31 more
/// of `[a-z0-9_-]`.
pub const USERNAME_PATTERN: &str = r"^[a-z_][a-z0-9_-]{0,31}$";

/// DNS hostname grammar: dot-separated alphanumeric labels with internal
/// hyphens. IPv4 literals are accepted separately.
pub const HOSTNAME_PATTERN: &str =
    r"^(([a-zA-Z0-9](-?[a-zA-Z0-9])*)\.)*([A-Za-z0-9](-?[A-Za-z0-9])*)$";

/// Characters a queue-depth command may contain. No quoting, no variable
/// substitution, no command separators.
pub const COMMAND_PATTERN: &str = r"^[a-zA-Z0-9_\-./\|\s><{},=]+$";

/// Mailbox grammar for alert addresses.
pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

/// Compiled once, reused for every entry.
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(USERNAME_PATTERN).expect("valid regex"));
static HOSTNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HOSTNAME_PATTERN).expect("valid regex"));
static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COMMAND_PATTERN).expect("valid regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// Validate an SSH login user against the unix username grammar.
pub fn validate_username(user: &str, field: &str) -> Result<(), ConfigError> {
    if !USERNAME_RE.is_match(user) {
        return Err(ConfigError::Validation(format!(
            "{field} must be a valid unix login (got {user:?})"
        )));
    }
    Ok(())
}

/// Validate a host: either an IPv4 literal or a DNS hostname.
pub fn validate_host(host: &str, field: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Validation(format!("{field} is required")));
    }
    if host.parse::<Ipv4Addr>().is_ok() {
        return Ok(());
    }
    if !HOSTNAME_RE.is_match(host) {
        return Err(ConfigError::Validation(format!(
            "{field} must be a hostname or IPv4 address (got {host:?})"
        )));
    }
    Ok(())
}

/// Validate a queue-depth command against the allowed character set.
pub fn validate_command(command: &str, field: &str) -> Result<(), ConfigError> {
    if command.is_empty() {
        return Err(ConfigError::Validation(format!("{field} is required")));
    }
    if !COMMAND_RE.is_match(command) {
        return Err(ConfigError::Validation(format!(
            "{field} contains characters outside the allowed set"
        )));
    }
    Ok(())
}

/// Validate one alert email address.
pub fn validate_email_address(address: &str, field: &str) -> Result<(), ConfigError> {
    if !EMAIL_RE.is_match(address) {
        return Err(ConfigError::Validation(format!(
            "{field} must be a valid email address (got {address:?})"
        )));
    }
    Ok(())
}

/// Validate a port number. The schema already bounds it to a `u16`; zero is
/// the one in-type value that is never routable.
pub fn validate_port(port: u16, field: &str) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be between 1 and 65535"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Document rule
// ---------------------------------------------------------------------------

/// Validate a whole fleet document. Checks servers first, in order, then
/// the email section, and stops at the first violation.
pub fn validate(config: &FleetConfig) -> Result<(), ConfigError> {
    if config.servers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one server must be configured".to_string(),
        ));
    }
    for (i, server) in config.servers.iter().enumerate() {
        validate_server(server, i)?;
    }
    validate_email(&config.email)
}

fn validate_server(server: &ServerConfig, i: usize) -> Result<(), ConfigError> {
    validate_username(&server.user, &format!("servers[{i}].user"))?;
    validate_host(&server.host, &format!("servers[{i}].host"))?;
    if let Some(port) = server.port {
        validate_port(port, &format!("servers[{i}].port"))?;
    }
    validate_command(&server.command, &format!("servers[{i}].command"))?;
    if server.threshold < 0 {
        return Err(ConfigError::Validation(format!(
            "servers[{i}].threshold must be zero or positive (got {})",
            server.threshold
        )));
    }
    Ok(())
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    validate_host(&email.smtp_server, "email.smtp_server")?;
    validate_port(email.smtp_port, "email.smtp_port")?;
    validate_email_address(&email.from, "email.from")?;
    for (i, address) in email.to.iter().enumerate() {
        validate_email_address(address, &format!("email.to[{i}]"))?;
    }
    for (i, address) in email.cc.iter().enumerate() {
        validate_email_address(address, &format!("email.cc[{i}]"))?;
    }
    for (i, address) in email.bcc.iter().enumerate() {
        validate_email_address(address, &format!("email.bcc[{i}]"))?;
    }
    Ok(())
}
