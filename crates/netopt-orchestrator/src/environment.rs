//! Environment: applies actions to the network stack

use netopt_common::{
    AppliedChange, NetworkController, OptimizationAction, RouteChange,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sub-operations smaller than this are treated as noise and skipped
const DEAD_ZONE: f64 = 0.1;

/// What one apply pass actually did
#[derive(Debug, Clone)]
pub struct ApplyReport {
    /// Changes that took effect, in application order
    pub applied: Vec<AppliedChange>,
    /// First controller failure, if any; later operations are not attempted
    pub failure: Option<String>,
}

impl ApplyReport {
    /// Whether every requested operation succeeded
    pub fn clean(&self) -> bool {
        self.failure.is_none()
    }
}

/// Wraps the network controller with dead-zone filtering and settling
pub struct Environment {
    controller: Arc<dyn NetworkController>,
}

impl Environment {
    /// Wrap a controller
    pub fn new(controller: Arc<dyn NetworkController>) -> Self {
        Self { controller }
    }

    /// Apply the sub-operations of `action` whose magnitude clears the
    /// dead zone
    ///
    /// Stops at the first controller failure and reports how far it got;
    /// nothing is retried within the cycle.
    pub async fn apply(&self, action: &OptimizationAction) -> ApplyReport {
        let action = action.clamped();
        let mut applied = Vec::new();

        macro_rules! step {
            ($cond:expr, $call:expr, $change:expr) => {
                if $cond {
                    match $call.await {
                        Ok(()) => applied.push($change),
                        Err(e) => {
                            warn!(error = %e, applied = applied.len(), "apply aborted");
                            return ApplyReport {
                                applied,
                                failure: Some(e.to_string()),
                            };
                        }
                    }
                }
            };
        }

        step!(
            action.bandwidth_delta.abs() > DEAD_ZONE,
            self.controller.adjust_bandwidth(action.bandwidth_delta),
            AppliedChange::Bandwidth(action.bandwidth_delta)
        );
        step!(
            action.route_change != RouteChange::None,
            self.controller.change_route(action.route_change),
            AppliedChange::Route(action.route_change)
        );
        step!(
            action.qos_delta.abs() > DEAD_ZONE,
            self.controller.adjust_qos(action.qos_delta),
            AppliedChange::Qos(action.qos_delta)
        );
        step!(
            (1.0 - action.connection_limit_factor) > DEAD_ZONE,
            self.controller
                .set_connection_limit(action.connection_limit_factor),
            AppliedChange::ConnectionLimit(action.connection_limit_factor)
        );
        step!(
            action.compression_level > DEAD_ZONE,
            self.controller.set_compression(action.compression_level),
            AppliedChange::Compression(action.compression_level)
        );

        debug!(changes = applied.len(), "action applied");
        ApplyReport {
            applied,
            failure: None,
        }
    }

    /// Wait for the network to settle before re-measuring
    ///
    /// Plain async sleep: status queries stay responsive during the wait.
    pub async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Access the underlying controller (for tunnel and allocation pushes)
    pub fn controller(&self) -> &Arc<dyn NetworkController> {
        &self.controller
    }
}
