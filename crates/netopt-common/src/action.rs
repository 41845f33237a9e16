//! The discrete optimization action set

use serde::{Deserialize, Serialize};

/// Route change requested by an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteChange {
    /// Keep the current route
    None,
    /// Steer traffic to the primary route
    Primary,
    /// Steer traffic to the secondary route
    Secondary,
    /// Split traffic across available routes
    LoadBalance,
}

impl Default for RouteChange {
    fn default() -> Self {
        Self::None
    }
}

/// A single optimization step applied to the network stack
///
/// Deltas are relative (-1.0 to 1.0); `connection_limit_factor` and
/// `compression_level` are absolute targets (0.0 - 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationAction {
    /// Bandwidth reallocation delta (-1.0 to 1.0)
    pub bandwidth_delta: f64,
    /// Route change request
    pub route_change: RouteChange,
    /// QoS adjustment delta (-1.0 to 1.0)
    pub qos_delta: f64,
    /// Connection limit factor (0.0 - 1.0, 1.0 = unlimited)
    pub connection_limit_factor: f64,
    /// Compression level (0.0 - 1.0, 0.0 = off)
    pub compression_level: f64,
}

impl OptimizationAction {
    /// The do-nothing action
    pub const fn hold() -> Self {
        Self {
            bandwidth_delta: 0.0,
            route_change: RouteChange::None,
            qos_delta: 0.0,
            connection_limit_factor: 1.0,
            compression_level: 0.0,
        }
    }

    /// Copy with every field forced into its valid range
    pub fn clamped(&self) -> Self {
        Self {
            bandwidth_delta: finite_or_zero(self.bandwidth_delta).clamp(-1.0, 1.0),
            route_change: self.route_change,
            qos_delta: finite_or_zero(self.qos_delta).clamp(-1.0, 1.0),
            connection_limit_factor: if self.connection_limit_factor.is_finite() {
                self.connection_limit_factor.clamp(0.0, 1.0)
            } else {
                1.0
            },
            compression_level: finite_or_zero(self.compression_level).clamp(0.0, 1.0),
        }
    }

    /// Largest single adjustment requested by this action
    ///
    /// Used for the extreme-action reward penalty. A route change counts as
    /// a fixed medium-sized disturbance.
    pub fn magnitude(&self) -> f64 {
        let route = if self.route_change == RouteChange::None {
            0.0
        } else {
            0.5
        };
        self.bandwidth_delta
            .abs()
            .max(self.qos_delta.abs())
            .max(1.0 - self.connection_limit_factor)
            .max(self.compression_level)
            .max(route)
    }
}

impl Default for OptimizationAction {
    fn default() -> Self {
        Self::hold()
    }
}

/// Named action template from the fixed discrete set
#[derive(Debug, Clone, Copy)]
pub struct ActionTemplate {
    /// Human-readable template name (used in result explanations)
    pub name: &'static str,
    /// The action the template expands to
    pub action: OptimizationAction,
}

/// The discrete action set the policy selects from
pub const ACTION_TEMPLATES: [ActionTemplate; 8] = [
    ActionTemplate {
        name: "hold",
        action: OptimizationAction::hold(),
    },
    ActionTemplate {
        name: "boost-bandwidth",
        action: OptimizationAction {
            bandwidth_delta: 0.3,
            route_change: RouteChange::None,
            qos_delta: 0.0,
            connection_limit_factor: 1.0,
            compression_level: 0.0,
        },
    },
    ActionTemplate {
        name: "trim-bandwidth",
        action: OptimizationAction {
            bandwidth_delta: -0.3,
            route_change: RouteChange::None,
            qos_delta: 0.0,
            connection_limit_factor: 1.0,
            compression_level: 0.0,
        },
    },
    ActionTemplate {
        name: "raise-qos",
        action: OptimizationAction {
            bandwidth_delta: 0.0,
            route_change: RouteChange::None,
            qos_delta: 0.4,
            connection_limit_factor: 1.0,
            compression_level: 0.0,
        },
    },
    ActionTemplate {
        name: "route-primary",
        action: OptimizationAction {
            bandwidth_delta: 0.0,
            route_change: RouteChange::Primary,
            qos_delta: 0.0,
            connection_limit_factor: 1.0,
            compression_level: 0.0,
        },
    },
    ActionTemplate {
        name: "load-balance",
        action: OptimizationAction {
            bandwidth_delta: 0.0,
            route_change: RouteChange::LoadBalance,
            qos_delta: 0.1,
            connection_limit_factor: 1.0,
            compression_level: 0.0,
        },
    },
    ActionTemplate {
        name: "throttle",
        action: OptimizationAction {
            bandwidth_delta: -0.2,
            route_change: RouteChange::None,
            qos_delta: 0.0,
            connection_limit_factor: 0.6,
            compression_level: 0.3,
        },
    },
    ActionTemplate {
        name: "compress-heavy",
        action: OptimizationAction {
            bandwidth_delta: 0.0,
            route_change: RouteChange::None,
            qos_delta: 0.0,
            connection_limit_factor: 1.0,
            compression_level: 0.8,
        },
    },
];

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
