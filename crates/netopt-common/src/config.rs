//! Validated optimizer configuration
//!
//! One strongly-typed struct with explicit defaults, validated once at
//! construction. Interval fields are plain integers so the whole tree
//! serializes cleanly; accessors expose `Duration`.

use crate::error::{OptimizerError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the optimization loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Seconds between optimization cycles
    pub optimization_interval_secs: u64,
    /// Milliseconds to wait after applying before re-measuring
    pub settle_duration_ms: u64,
    /// Milliseconds before a metric collection attempt is abandoned
    pub metric_timeout_ms: u64,
    /// Seconds to sleep after a failed cycle before retrying
    pub error_backoff_secs: u64,
    /// Bounded optimization-result history capacity
    pub history_capacity: usize,
    /// Policy learning parameters
    pub policy: PolicyConfig,
    /// Reward shaping parameters
    pub reward: RewardConfig,
    /// Per-flow fairness bounds
    pub fairness: FairnessConstraints,
    /// Tunnel parameter bounds
    pub tunnel: TunnelBounds,
}

/// Policy-optimization agent parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Trust-region clip epsilon for the probability ratio
    pub clip_epsilon: f64,
    /// Minimum buffered experiences before an update runs
    pub batch_size: usize,
    /// Gradient step size
    pub learning_rate: f64,
    /// Update passes per learning phase
    pub update_epochs: usize,
    /// Experience ring buffer capacity
    pub buffer_capacity: usize,
}

/// Reward function weights and penalty shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Weight of the utilization sub-score
    pub bandwidth_weight: f64,
    /// Weight of the latency-improvement sub-score
    pub latency_weight: f64,
    /// Weight of the stability sub-score
    pub stability_weight: f64,
    /// Weight of the resource-efficiency sub-score
    pub efficiency_weight: f64,
    /// Bandwidth utilization the loop steers toward
    pub target_utilization: f64,
    /// Action magnitude above which the penalty applies
    pub extreme_action_threshold: f64,
    /// Fraction of reward subtracted for extreme actions
    pub extreme_action_penalty: f64,
}

/// Per-flow fairness bounds enforced by the allocator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessConstraints {
    /// Absolute floor per flow in Mbps (starvation prevention)
    pub min_allocation_per_flow: f64,
    /// Absolute ceiling per flow in Mbps
    pub max_allocation_per_flow: f64,
    /// Minimum share of total bandwidth per flow
    pub min_ratio: f64,
    /// Maximum share of total bandwidth per flow
    pub max_ratio: f64,
    /// Cap on the multiplier priority can add to a flow's demand
    pub priority_boost_ceiling: f64,
}

/// Bounds for tunnel frame and buffer sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelBounds {
    /// Smallest frame size the tuner may request (bytes)
    pub min_frame_size: u32,
    /// Largest frame size the tuner may request (bytes)
    pub max_frame_size: u32,
    /// Adaptive frame-size adjustment step (bytes)
    pub frame_step: u32,
    /// Smallest transport buffer (bytes)
    pub min_buffer_size: u64,
    /// Largest transport buffer (bytes)
    pub max_buffer_size: u64,
    /// Tunnel keepalive interval (seconds)
    pub keepalive_secs: u16,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            optimization_interval_secs: 30,
            settle_duration_ms: 2_000,
            metric_timeout_ms: 5_000,
            error_backoff_secs: 120,
            history_capacity: 256,
            policy: PolicyConfig::default(),
            reward: RewardConfig::default(),
            fairness: FairnessConstraints::default(),
            tunnel: TunnelBounds::default(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            clip_epsilon: 0.2,
            batch_size: 16,
            learning_rate: 0.01,
            update_epochs: 4,
            buffer_capacity: 256,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            bandwidth_weight: 0.3,
            latency_weight: 0.3,
            stability_weight: 0.2,
            efficiency_weight: 0.2,
            target_utilization: 0.75,
            extreme_action_threshold: 0.8,
            extreme_action_penalty: 0.25,
        }
    }
}

impl Default for FairnessConstraints {
    fn default() -> Self {
        Self {
            min_allocation_per_flow: 1.0,
            max_allocation_per_flow: 100.0,
            min_ratio: 0.02,
            max_ratio: 0.6,
            priority_boost_ceiling: 1.5,
        }
    }
}

impl Default for TunnelBounds {
    fn default() -> Self {
        Self {
            min_frame_size: 576,
            max_frame_size: 9_000,
            frame_step: 64,
            min_buffer_size: 64 * 1024,
            max_buffer_size: 16 * 1024 * 1024,
            keepalive_secs: 25,
        }
    }
}

impl OptimizerConfig {
    /// Cycle interval as a `Duration`
    pub fn optimization_interval(&self) -> Duration {
        Duration::from_secs(self.optimization_interval_secs)
    }

    /// Settle wait as a `Duration`
    pub fn settle_duration(&self) -> Duration {
        Duration::from_millis(self.settle_duration_ms)
    }

    /// Metric collection timeout as a `Duration`
    pub fn metric_timeout(&self) -> Duration {
        Duration::from_millis(self.metric_timeout_ms)
    }

    /// Post-failure backoff as a `Duration`
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    /// Validate the whole tree; called once at orchestrator construction
    pub fn validate(&self) -> Result<()> {
        if self.optimization_interval_secs == 0 {
            return Err(invalid("optimization_interval_secs must be positive"));
        }
        if self.metric_timeout_ms == 0 {
            return Err(invalid("metric_timeout_ms must be positive"));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity must be positive"));
        }
        self.policy.validate()?;
        self.reward.validate()?;
        self.fairness.validate()?;
        self.tunnel.validate()?;
        Ok(())
    }
}

impl PolicyConfig {
    fn validate(&self) -> Result<()> {
        if !(self.clip_epsilon > 0.0 && self.clip_epsilon < 1.0) {
            return Err(invalid("policy.clip_epsilon must be in (0, 1)"));
        }
        if self.batch_size == 0 {
            return Err(invalid("policy.batch_size must be positive"));
        }
        if self.buffer_capacity < self.batch_size {
            return Err(invalid("policy.buffer_capacity must hold at least one batch"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid("policy.learning_rate must be positive"));
        }
        if self.update_epochs == 0 {
            return Err(invalid("policy.update_epochs must be positive"));
        }
        Ok(())
    }
}

impl RewardConfig {
    fn validate(&self) -> Result<()> {
        let sum = self.bandwidth_weight
            + self.latency_weight
            + self.stability_weight
            + self.efficiency_weight;
        if (sum - 1.0).abs() > 0.01 {
            return Err(invalid("reward weights must sum to 1.0"));
        }
        for (name, w) in [
            ("bandwidth", self.bandwidth_weight),
            ("latency", self.latency_weight),
            ("stability", self.stability_weight),
            ("efficiency", self.efficiency_weight),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(invalid(&format!("reward.{name}_weight must be in [0, 1]")));
            }
        }
        if !(0.0 < self.target_utilization && self.target_utilization < 1.0) {
            return Err(invalid("reward.target_utilization must be in (0, 1)"));
        }
        if !(0.0..=1.0).contains(&self.extreme_action_threshold) {
            return Err(invalid("reward.extreme_action_threshold must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.extreme_action_penalty) {
            return Err(invalid("reward.extreme_action_penalty must be in [0, 1]"));
        }
        Ok(())
    }
}

impl FairnessConstraints {
    fn validate(&self) -> Result<()> {
        if self.min_allocation_per_flow < 0.0 {
            return Err(invalid("fairness.min_allocation_per_flow must be >= 0"));
        }
        if self.max_allocation_per_flow < self.min_allocation_per_flow {
            return Err(invalid("fairness.max_allocation_per_flow below minimum"));
        }
        if !(0.0 < self.min_ratio && self.min_ratio <= self.max_ratio && self.max_ratio <= 1.0) {
            return Err(invalid("fairness ratios must satisfy 0 < min <= max <= 1"));
        }
        if self.priority_boost_ceiling < 1.0 {
            return Err(invalid("fairness.priority_boost_ceiling must be >= 1"));
        }
        Ok(())
    }
}

impl TunnelBounds {
    fn validate(&self) -> Result<()> {
        if self.min_frame_size == 0 || self.min_frame_size >= self.max_frame_size {
            return Err(invalid("tunnel frame size bounds are inverted"));
        }
        if self.frame_step == 0 {
            return Err(invalid("tunnel.frame_step must be positive"));
        }
        if self.min_buffer_size == 0 || self.min_buffer_size >= self.max_buffer_size {
            return Err(invalid("tunnel buffer bounds are inverted"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> OptimizerError {
    OptimizerError::ConfigValidation(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        OptimizerConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_epsilon() {
        let mut cfg = OptimizerConfig::default();
        cfg.policy.clip_epsilon = 1.5;
        assert!(cfg.validate().is_err());
        cfg.policy.clip_epsilon = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let mut cfg = OptimizerConfig::default();
        cfg.fairness.max_allocation_per_flow = 0.1;
        assert!(cfg.validate().is_err());

        let mut cfg = OptimizerConfig::default();
        cfg.tunnel.max_frame_size = 100;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unbalanced_weights() {
        let mut cfg = OptimizerConfig::default();
        cfg.reward.bandwidth_weight = 0.9;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = OptimizerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: OptimizerConfig = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(back.policy.batch_size, cfg.policy.batch_size);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: OptimizerConfig =
            serde_json::from_str(r#"{"optimization_interval_secs": 10}"#).unwrap();
        assert_eq!(cfg.optimization_interval_secs, 10);
        assert_eq!(cfg.policy.batch_size, PolicyConfig::default().batch_size);
    }
}
