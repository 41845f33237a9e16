//! Reward shaping from measured state pairs
//!
//! The reward judges what an action actually did to the network, not what
//! the policy hoped it would do. Always in [-1, 1] via saturating tanh.

use netopt_common::{NetworkState, OptimizationAction, RewardConfig};

/// Pure reward function: (prior state, action, new state) -> scalar
#[derive(Debug, Clone)]
pub struct RewardFunction {
    config: RewardConfig,
}

impl RewardFunction {
    /// Create with the given weights; the config is validated upstream
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    /// Evaluate a transition, returning a reward in [-1, 1]
    pub fn evaluate(
        &self,
        prev: &NetworkState,
        action: &OptimizationAction,
        next: &NetworkState,
    ) -> f64 {
        let c = &self.config;

        let weighted = c.bandwidth_weight * self.utilization_score(next)
            + c.latency_weight * Self::latency_score(prev, next)
            + c.stability_weight * Self::stability_score(prev, next)
            + c.efficiency_weight * Self::efficiency_score(prev, next);

        // Oscillation guard: large swings pay for themselves
        let penalized = if action.magnitude() > c.extreme_action_threshold {
            weighted - c.extreme_action_penalty * weighted.abs() - 0.05
        } else {
            weighted
        };

        penalized.tanh()
    }

    /// Distance of utilization from the target band, 1.0 at the target
    fn utilization_score(&self, next: &NetworkState) -> f64 {
        let distance = (next.bandwidth_utilization - self.config.target_utilization).abs();
        (1.0 - distance / 0.25).clamp(-1.0, 1.0)
    }

    /// Relative latency improvement
    fn latency_score(prev: &NetworkState, next: &NetworkState) -> f64 {
        let base = prev.latency_ms.max(1.0);
        ((prev.latency_ms - next.latency_ms) / base).clamp(-1.0, 1.0)
    }

    /// Inverse of loss level and loss/jitter growth between states
    fn stability_score(prev: &NetworkState, next: &NetworkState) -> f64 {
        let loss_level = next.packet_loss * 5.0;
        let loss_growth = (next.packet_loss - prev.packet_loss).max(0.0) * 10.0;
        let jitter_growth = (next.jitter_ms - prev.jitter_ms).max(0.0) / 20.0;
        let instability = (loss_level + loss_growth + jitter_growth).min(1.0);
        1.0 - 2.0 * instability
    }

    /// CPU and memory reduction
    fn efficiency_score(prev: &NetworkState, next: &NetworkState) -> f64 {
        let cpu = prev.cpu_load - next.cpu_load;
        let mem = prev.memory_load - next.memory_load;
        ((cpu + mem) * 2.0).clamp(-1.0, 1.0)
    }
}
