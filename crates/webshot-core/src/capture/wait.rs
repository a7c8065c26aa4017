//! Post-navigation wait protocol
//!
//! Every wait is a poll loop with a local deadline: check the condition,
//! sleep [`NETWORK_IDLE_POLL_MS`], repeat until the condition holds or the
//! deadline passes.

use std::{future::Future, time::Duration};

use tokio::time::{Instant, sleep};
use tracing::debug;

use super::{constants::NETWORK_IDLE_POLL_MS, network::NetworkActivity, traits::PageHandle};
use crate::{
    error::{CaptureError, CaptureResult},
    model::WaitCondition,
    validation::require_selector,
};

/// Runs `condition` against `page`.
///
/// Selector values are sanitized here, so an unsafe selector in a wait fails
/// with `UnsafeSelector` and a missing one with `InvalidSelector`.
pub async fn execute_wait(page: &dyn PageHandle, condition: &WaitCondition) -> CaptureResult<()> {
    match condition {
        WaitCondition::Selector {
            selector,
            timeout_ms,
        } => {
            let selector = require_selector(selector.as_deref())?;
            debug!(%selector, timeout_ms, "Waiting for selector");
            let target = selector.as_str();
            poll_until(
                &format!("selector '{}'", selector),
                Duration::from_millis(*timeout_ms),
                move || page.element_exists(target),
            )
            .await
        }
        WaitCondition::Function {
            expression,
            timeout_ms,
        } => {
            debug!(timeout_ms, "Waiting for predicate");
            poll_until(
                "predicate function",
                Duration::from_millis(*timeout_ms),
                move || page.evaluate_predicate(expression),
            )
            .await
        }
        WaitCondition::Delay { duration_ms } => {
            debug!(duration_ms, "Waiting fixed delay");
            sleep(Duration::from_millis(*duration_ms)).await;
            Ok(())
        }
        WaitCondition::NetworkIdle {
            idle_ms,
            timeout_ms,
        } => {
            let activity = page.network_activity();
            // The idle clock starts when the wait starts, not at the last
            // event seen during navigation.
            activity.touch();
            debug!(idle_ms, timeout_ms, "Waiting for network idle");
            wait_for_network_idle(
                &activity,
                Duration::from_millis(*idle_ms),
                Duration::from_millis(*timeout_ms),
                None,
            )
            .await
        }
    }
}

/// Blocks until `activity` has been quiet for `idle`.
///
/// `max_in_flight` additionally bounds the number of outstanding requests
/// (the `networkidle0` / `networkidle2` navigation conditions).
pub async fn wait_for_network_idle(
    activity: &NetworkActivity,
    idle: Duration,
    timeout: Duration,
    max_in_flight: Option<usize>,
) -> CaptureResult<()> {
    poll_until("network idle", timeout, || {
        futures::future::ready(Ok(activity.is_quiet(idle, max_in_flight)))
    })
    .await
}

/// Polls `check` until it returns `true`, failing with `Timeout` once
/// `timeout` has elapsed. Errors from `check` end the wait immediately.
pub async fn poll_until<F, Fut>(operation: &str, timeout: Duration, mut check: F) -> CaptureResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CaptureResult<bool>>,
{
    let start = Instant::now();
    let poll = Duration::from_millis(NETWORK_IDLE_POLL_MS);

    loop {
        if check().await? {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(CaptureError::Timeout {
                operation: operation.to_string(),
                duration_ms: timeout.as_millis() as u64,
            });
        }
        sleep(poll).await;
    }
}
