//! Threshold evaluation and report assembly.
//!
//! A fleet run produces one [`ReportLine`] per server that answered, in
//! configured order, folded into an [`AlertBatch`] that knows whether any
//! threshold was crossed.

use std::num::ParseIntError;

/// One evaluated server: the measured queue depth and whether it reached
/// the server's threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    /// Host the value came from.
    pub host: String,
    /// Measured queue depth.
    pub value: i64,
    /// Whether the value is at or above the configured threshold.
    pub exceeded: bool,
}

impl ReportLine {
    /// Evaluate a measured value against a threshold. The comparison is
    /// inclusive: a value exactly at the threshold counts as exceeded.
    pub fn evaluate(host: impl Into<String>, value: i64, threshold: i64) -> Self {
        ReportLine {
            host: host.into(),
            value,
            exceeded: value >= threshold,
        }
    }

    /// Render the report line: `host: value`, with a trailing ` *` marker
    /// when the threshold was reached.
    pub fn render(&self) -> String {
        if self.exceeded {
            format!("{}: {} *", self.host, self.value)
        } else {
            format!("{}: {}", self.host, self.value)
        }
    }
}

/// The aggregated outcome of one fleet run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertBatch {
    /// Report lines in configured server order. Servers that failed to
    /// answer have no line.
    pub lines: Vec<ReportLine>,
    /// True when at least one line reached its threshold.
    pub any_exceeded: bool,
}

impl AlertBatch {
    /// Fold evaluated lines into a batch, preserving their order.
    pub fn assemble(lines: Vec<ReportLine>) -> Self {
        let any_exceeded = lines.iter().any(|line| line.exceeded);
        AlertBatch {
            lines,
            any_exceeded,
        }
    }
}

/// Parse a probe's trimmed stdout as a base-10 queue depth.
///
/// Anything that is not a plain integer is an error. A non-numeric result
/// must never read as zero.
pub fn parse_queue_depth(raw: &str) -> Result<i64, ParseIntError> {
    raw.parse::<i64>()
}
