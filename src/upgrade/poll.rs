use crate::{
    common::constants::{FALLBACK_POLL_TIMEOUT, POLL_INTERVAL, VERSION_UNKNOWN},
    kube::client::{observe_version, ClusterOps},
};
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of waiting for a Deployment's observable version to move off its
/// pre-upgrade value. `Inconclusive` carries the last sample seen before the
/// deadline and is surfaced to the operator, not treated as an error.
pub(crate) enum Convergence {
    Converged(String),
    Inconclusive(String),
}

/// Poll deadline from the configured timeout string, e.g. "120s" or "2m".
/// Absent, unparseable or zero timeouts fall back to the default.
pub(crate) fn poll_timeout(timeout: &str) -> Duration {
    parse_timeout(timeout).unwrap_or(FALLBACK_POLL_TIMEOUT)
}

fn parse_timeout(timeout: &str) -> Option<Duration> {
    let timeout = timeout.trim();
    let (value, unit_secs) = if let Some(value) = timeout.strip_suffix('s') {
        (value, 1)
    } else if let Some(value) = timeout.strip_suffix('m') {
        (value, 60)
    } else if let Some(value) = timeout.strip_suffix('h') {
        (value, 3600)
    } else {
        return None;
    };

    let value: u64 = value.parse().ok()?;
    if value == 0 {
        return None;
    }
    Some(Duration::from_secs(value * unit_secs))
}

/// Samples the Deployment's observable version at a fixed interval until it reads as
/// something other than the pre-upgrade value, or the deadline passes. A pre-upgrade
/// version of `<unknown>` converges on the first readable sample, since any readable
/// value differs from the sentinel.
pub(crate) async fn await_version_change(
    cluster: &dyn ClusterOps,
    deployment: &str,
    before: &str,
    timeout: Duration,
) -> Convergence {
    let deadline = Instant::now() + timeout;
    let mut last = String::new();

    while Instant::now() < deadline {
        let (_, sample) = observe_version(cluster, deployment);
        last = sample;

        if last != VERSION_UNKNOWN && last != before {
            return Convergence::Converged(last);
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }

    Convergence::Inconclusive(last)
}
