//! # Error Policy
//!
//! Requeue decisions for failed reconciliations. Backoff state is tracked per
//! OperandBindInfo so one failing resource never slows down the others, and
//! it is reset as soon as that resource reconciles successfully.

use crate::controller::backoff::BackoffState;
use crate::controller::reconciler::ReconcilerError;
use crate::crd::OperandBindInfo;
use crate::observability::metrics;
use crate::runtime::{resource_key, Context};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
pub fn handle_reconciliation_error(
    obj: Arc<OperandBindInfo>,
    error: &ReconcilerError,
    ctx: Arc<Context>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    error!(
        bindinfo = %name,
        %namespace,
        error = %error,
        "Reconciliation error"
    );
    metrics::increment_reconciliation_errors();

    let (delay, error_count) = next_retry(
        &ctx.backoff_states,
        &resource_key(&namespace, &name),
        ctx.config.backoff_min_duration(),
        ctx.config.backoff_max_duration(),
    );

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    info!(
        bindinfo = %name,
        %namespace,
        error_count,
        delay_secs = delay.as_secs(),
        next_retry = %next_trigger_time.to_rfc3339(),
        "Retrying with Fibonacci backoff"
    );

    metrics::increment_requeues_total(error.reason());
    Action::requeue(delay)
}

/// Forget the backoff of a resource after a successful pass
pub fn reset_backoff(ctx: &Context, namespace: &str, name: &str) {
    match ctx.backoff_states.lock() {
        Ok(mut states) => {
            if let Some(state) = states.get_mut(&resource_key(namespace, name)) {
                state.reset();
            }
        }
        Err(e) => warn!("Failed to lock backoff_states: {}", e),
    }
}

/// Advance the backoff of `key` and return the delay plus the error count.
///
/// Falls back to `min` when the state map is poisoned.
pub fn next_retry(
    states: &Mutex<HashMap<String, BackoffState>>,
    key: &str,
    min: Duration,
    max: Duration,
) -> (Duration, u32) {
    match states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(key.to_string())
                .or_insert_with(|| BackoffState::new(min, max));
            state.increment_error();
            (state.backoff.next_backoff(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using minimum backoff", e);
            (min, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_retry_grows_per_resource() {
        let states = Mutex::new(HashMap::new());
        let min = Duration::from_secs(5);
        let max = Duration::from_secs(300);

        assert_eq!(next_retry(&states, "ns/a", min, max), (Duration::from_secs(5), 1));
        assert_eq!(next_retry(&states, "ns/a", min, max), (Duration::from_secs(5), 2));
        assert_eq!(next_retry(&states, "ns/a", min, max), (Duration::from_secs(10), 3));
        assert_eq!(next_retry(&states, "ns/b", min, max), (Duration::from_secs(5), 1));
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let states = Mutex::new(HashMap::new());
        let min = Duration::from_secs(1);
        let max = Duration::from_secs(10);
        next_retry(&states, "ns/a", min, max);
        next_retry(&states, "ns/a", min, max);
        next_retry(&states, "ns/a", min, max);

        if let Some(state) = states.lock().unwrap().get_mut("ns/a") {
            state.reset();
        }
        assert_eq!(next_retry(&states, "ns/a", min, max), (Duration::from_secs(1), 1));
    }
}
