//! Fleet run loop.
//!
//! Probes every configured target and reassembles the results in
//! configured order, so the report reads the same from run to run whatever
//! the completion order was. A failing server is logged and skipped; it
//! never aborts the batch and never fabricates a value.

use futures::future::join_all;

use queuewatch_core::report::{parse_queue_depth, AlertBatch, ReportLine};
use queuewatch_core::ServerTarget;

use crate::probe::{Probe, ProbeError};

/// Probe every target and fold the successes into an ordered batch.
///
/// One future per target, polled concurrently; `join_all` yields results
/// in input order, which is exactly the report order.
pub async fn run_fleet<P: Probe + ?Sized>(probe: &P, targets: &[ServerTarget]) -> AlertBatch {
    let outcomes = join_all(targets.iter().map(|target| check_target(probe, target))).await;

    let mut lines = Vec::with_capacity(outcomes.len());
    let mut failed = 0usize;
    for outcome in outcomes {
        match outcome {
            Ok(line) => lines.push(line),
            Err(_) => failed += 1,
        }
    }

    tracing::info!(
        targets = targets.len(),
        reported = lines.len(),
        failed,
        "Fleet run complete"
    );

    AlertBatch::assemble(lines)
}

/// Probe one target, parse its output and evaluate its threshold. The
/// outcome is logged here with the host attached; a failure reaches the
/// caller only as the absence of a line.
async fn check_target<P: Probe + ?Sized>(
    probe: &P,
    target: &ServerTarget,
) -> Result<ReportLine, ProbeError> {
    let result = measure(probe, target).await;
    match &result {
        Ok(line) => {
            tracing::info!(
                host = %target.host,
                value = line.value,
                threshold = target.threshold,
                exceeded = line.exceeded,
                "Server checked"
            );
        }
        Err(e) => {
            tracing::warn!(host = %target.host, error = %e, "Server check failed");
        }
    }
    result
}

async fn measure<P: Probe + ?Sized>(
    probe: &P,
    target: &ServerTarget,
) -> Result<ReportLine, ProbeError> {
    let output = probe.execute(target).await?;
    let value = parse_queue_depth(&output).map_err(|_| ProbeError::Parse { raw: output })?;
    Ok(ReportLine::evaluate(target.host.as_str(), value, target.threshold))
}
