//! Passive health monitoring for circuit breakers
//!
//! Each breaker owns one reporting task that periodically inspects the
//! cumulative counters and warns when the failure rate is high. The task
//! never touches the state machine, so losing it affects visibility only.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::task::JoinHandle;

use crate::breaker::BreakerShared;

/// Failure rate above which a tick emits a warning
const FAILURE_RATE_ALERT: f64 = 0.5;

/// Spawn the health reporting loop for a breaker
///
/// The loop holds only a weak handle so an abandoned breaker is not kept
/// alive by its own monitor; it exits once the breaker is gone.
pub(crate) fn spawn(shared: &Arc<BreakerShared>) -> JoinHandle<()> {
    let period = shared.config.monitoring_period;
    let weak = Arc::downgrade(shared);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let Some(shared) = weak.upgrade() else { break };
            report(&shared);
        }
    })
}

/// One monitoring tick; reads only the atomic totals
fn report(shared: &BreakerShared) {
    let requests = shared.totals.requests.load(Ordering::Relaxed);
    if requests == 0 {
        return;
    }

    let failures = shared.totals.failures.load(Ordering::Relaxed);
    let failure_rate = failures as f64 / requests as f64;
    if failure_rate > FAILURE_RATE_ALERT {
        tracing::warn!(
            provider = %shared.name,
            failure_rate,
            total_requests = requests,
            total_failures = failures,
            "high failure rate detected"
        );
    }
}
