//! Normalized configuration intent produced by decision fusion

use crate::state::{NetworkState, STATE_FEATURES};
use serde::{Deserialize, Serialize};

/// Number of intent components appended to the policy input
pub const INTENT_FEATURES: usize = 5;

/// Total policy input dimension: state features, intent components, bias term
pub const POLICY_FEATURES: usize = STATE_FEATURES + INTENT_FEATURES + 1;

/// Fused, normalized configuration intent
///
/// Each bias is -1.0 to 1.0 where 0.0 means "no pressure in this direction".
/// Deterministic given its inputs; carries no learned state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigIntent {
    /// Pressure to grow (+) or shrink (-) bandwidth headroom
    pub bandwidth_bias: f64,
    /// Pressure to prioritize latency over throughput
    pub latency_bias: f64,
    /// Pressure to harden the tunnel (stricter limits, encryption)
    pub security_bias: f64,
    /// Pressure to enable/raise compression
    pub compression_bias: f64,
    /// Pressure to tighten (-) or relax (+) connection limits
    pub connection_bias: f64,
    /// Confidence in the fused intent (0.0 - 1.0)
    pub confidence: f64,
}

impl ConfigIntent {
    /// The no-pressure intent used when inputs are missing or degenerate
    pub const fn neutral() -> Self {
        Self {
            bandwidth_bias: 0.0,
            latency_bias: 0.0,
            security_bias: 0.0,
            compression_bias: 0.0,
            connection_bias: 0.0,
            confidence: 0.2,
        }
    }

    /// Copy with every bias clamped into range
    pub fn clamped(&self) -> Self {
        let c = |v: f64| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            bandwidth_bias: c(self.bandwidth_bias),
            latency_bias: c(self.latency_bias),
            security_bias: c(self.security_bias),
            compression_bias: c(self.compression_bias),
            connection_bias: c(self.connection_bias),
            confidence: if self.confidence.is_finite() {
                self.confidence.clamp(0.0, 1.0)
            } else {
                0.2
            },
        }
    }

    /// Intent components as policy features
    fn features(&self) -> [f64; INTENT_FEATURES] {
        [
            self.bandwidth_bias,
            self.latency_bias,
            self.security_bias,
            self.compression_bias,
            self.connection_bias,
        ]
    }
}

/// Assemble the fixed-length policy input from a state and a fused intent
///
/// Layout: state features, intent biases, then a constant 1.0 bias term so
/// linear policies carry an intercept.
pub fn policy_input(state: &NetworkState, intent: &ConfigIntent) -> [f64; POLICY_FEATURES] {
    let mut out = [0.0; POLICY_FEATURES];
    out[..STATE_FEATURES].copy_from_slice(&state.features());
    out[STATE_FEATURES..STATE_FEATURES + INTENT_FEATURES].copy_from_slice(&intent.features());
    out[POLICY_FEATURES - 1] = 1.0;
    out
}
