//! Policy-optimization agent
//!
//! A softmax-linear policy over the fixed feature vector, selecting from the
//! discrete action template set. Updates use a clipped probability ratio so
//! no single batch can move the policy far from the one that collected the
//! data; that bound is the stability property the tests pin down.

use crate::experience::{Experience, ExperienceBuffer};
use netopt_common::{
    ActionTemplate, OptimizerError, PolicyConfig, Result, ACTION_TEMPLATES, POLICY_FEATURES,
};
use rand::Rng;
use tracing::{debug, warn};

/// Number of discrete actions the policy selects from
pub const ACTION_COUNT: usize = ACTION_TEMPLATES.len();

type PolicyWeights = [[f64; POLICY_FEATURES]; ACTION_COUNT];
type ValueWeights = [f64; POLICY_FEATURES];

/// Outcome of one action selection
#[derive(Debug, Clone, Copy)]
pub struct ActionSelection {
    /// Index into the action template table
    pub action_index: usize,
    /// The selected template
    pub template: ActionTemplate,
    /// Probability the policy assigned to this action
    pub probability: f64,
    /// Value baseline estimate for the input state
    pub value_estimate: f64,
}

/// Learned mapping from policy inputs to the discrete action set
pub struct PolicyAgent {
    config: PolicyConfig,
    weights: PolicyWeights,
    value_weights: ValueWeights,
    buffer: ExperienceBuffer,
    updates_applied: u64,
    updates_skipped: u64,
}

impl PolicyAgent {
    /// Create an agent with uniform initial policy
    pub fn new(config: PolicyConfig) -> Self {
        let buffer = ExperienceBuffer::new(config.buffer_capacity);
        Self {
            config,
            weights: [[0.0; POLICY_FEATURES]; ACTION_COUNT],
            value_weights: [0.0; POLICY_FEATURES],
            buffer,
            updates_applied: 0,
            updates_skipped: 0,
        }
    }

    /// Sample an action for the given input
    ///
    /// Reproducible given a seeded random source.
    pub fn select_action<R: Rng>(
        &self,
        input: &[f64; POLICY_FEATURES],
        rng: &mut R,
    ) -> ActionSelection {
        let probs = probabilities(&self.weights, input);
        let mut draw: f64 = rng.gen();
        let mut action_index = ACTION_COUNT - 1;
        for (i, p) in probs.iter().enumerate() {
            if draw < *p {
                action_index = i;
                break;
            }
            draw -= p;
        }
        ActionSelection {
            action_index,
            template: ACTION_TEMPLATES[action_index],
            probability: probs[action_index],
            value_estimate: dot(&self.value_weights, input),
        }
    }

    /// Append an experience and run a learning pass once a batch is buffered
    ///
    /// Math errors never reach the caller: a degenerate batch is logged and
    /// the prior parameters are kept.
    pub fn update(&mut self, experience: Experience) {
        self.buffer.push(experience);
        if self.buffer.len() < self.config.batch_size {
            return;
        }

        let batch = self.buffer.recent(self.config.batch_size);
        match self.train(&batch) {
            Ok(()) => {
                self.updates_applied += 1;
                debug!(
                    batch = batch.len(),
                    updates = self.updates_applied,
                    "policy updated"
                );
            }
            Err(e) => {
                self.updates_skipped += 1;
                warn!(error = %e, "skipping policy update, keeping parameters");
            }
        }
    }

    /// Transitions currently buffered
    pub fn experience_len(&self) -> usize {
        self.buffer.len()
    }

    /// Learning passes applied so far
    pub fn updates_applied(&self) -> u64 {
        self.updates_applied
    }

    /// Learning passes skipped as degenerate
    pub fn updates_skipped(&self) -> u64 {
        self.updates_skipped
    }

    /// Run the clipped-ratio update on a working copy; commit only if the
    /// result is finite everywhere
    fn train(&mut self, batch: &[Experience]) -> Result<()> {
        let mut advantages: Vec<f64> = batch
            .iter()
            .map(|e| e.reward - dot(&self.value_weights, &e.state))
            .collect();

        let mean = advantages.iter().sum::<f64>() / advantages.len() as f64;
        let variance = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f64>()
            / advantages.len() as f64;
        if !mean.is_finite() || !variance.is_finite() {
            return Err(OptimizerError::DegenerateBatch(
                "non-finite advantage statistics".into(),
            ));
        }
        if variance.sqrt() < 1e-8 {
            return Err(OptimizerError::DegenerateBatch(
                "zero-variance advantages".into(),
            ));
        }
        let std = variance.sqrt();
        for a in advantages.iter_mut() {
            *a = (*a - mean) / std;
        }

        let mut weights = self.weights;
        let mut value_weights = self.value_weights;
        let epsilon = self.config.clip_epsilon;
        let lr = self.config.learning_rate;

        for _ in 0..self.config.update_epochs {
            for (exp, &adv) in batch.iter().zip(advantages.iter()) {
                let probs = probabilities(&weights, &exp.state);
                let p_new = probs[exp.action_index].max(1e-12);
                let p_old = exp.probability.max(1e-12);
                let ratio = p_new / p_old;
                let clipped = clip_ratio(ratio, epsilon);

                // Trust region: when the clipped surrogate is the minimum the
                // gradient is zero, so the bound on movement is exact.
                if ratio * adv > clipped * adv {
                    continue;
                }

                let scale = lr * adv * ratio;
                for (a, row) in weights.iter_mut().enumerate() {
                    let indicator = if a == exp.action_index { 1.0 } else { 0.0 };
                    let g = indicator - probs[a];
                    for (w, x) in row.iter_mut().zip(exp.state.iter()) {
                        *w += scale * g * x;
                    }
                }
            }

            for exp in batch {
                let err = exp.reward - dot(&value_weights, &exp.state);
                for (w, x) in value_weights.iter_mut().zip(exp.state.iter()) {
                    *w += lr * err * x;
                }
            }
        }

        let finite = weights.iter().flatten().all(|w| w.is_finite())
            && value_weights.iter().all(|w| w.is_finite());
        if !finite {
            return Err(OptimizerError::DegenerateBatch(
                "update produced non-finite parameters".into(),
            ));
        }

        self.weights = weights;
        self.value_weights = value_weights;
        Ok(())
    }
}

/// Clamp the new/old probability ratio to the trust region
fn clip_ratio(ratio: f64, epsilon: f64) -> f64 {
    ratio.clamp(1.0 - epsilon, 1.0 + epsilon)
}

/// Softmax over per-action logits
fn probabilities(weights: &PolicyWeights, input: &[f64; POLICY_FEATURES]) -> [f64; ACTION_COUNT] {
    let mut logits = [0.0; ACTION_COUNT];
    for (l, row) in logits.iter_mut().zip(weights.iter()) {
        *l = dot(row, input);
    }
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut probs = [0.0; ACTION_COUNT];
    let mut sum = 0.0;
    for (p, l) in probs.iter_mut().zip(logits.iter()) {
        *p = (l - max).exp();
        sum += *p;
    }
    for p in probs.iter_mut() {
        *p /= sum;
    }
    probs
}

fn dot(a: &[f64; POLICY_FEATURES], b: &[f64; POLICY_FEATURES]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> PolicyConfig {
        PolicyConfig {
            batch_size: 4,
            buffer_capacity: 16,
            ..PolicyConfig::default()
        }
    }

    fn input(seed: f64) -> [f64; POLICY_FEATURES] {
        let mut v = [0.0; POLICY_FEATURES];
        for (i, x) in v.iter_mut().enumerate() {
            *x = ((i as f64 + 1.0) * seed).sin().abs();
        }
        v[POLICY_FEATURES - 1] = 1.0;
        v
    }

    fn transition(action_index: usize, probability: f64, reward: f64) -> Experience {
        Experience {
            state: input(0.3),
            action_index,
            probability,
            reward,
            next_state: input(0.4),
            terminal: false,
        }
    }

    #[test]
    fn selection_is_reproducible_with_seed() {
        let agent = PolicyAgent::new(small_config());
        let state = input(0.7);

        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a = agent.select_action(&state, &mut rng_a);
        let b = agent.select_action(&state, &mut rng_b);

        assert_eq!(a.action_index, b.action_index);
        assert_eq!(a.probability, b.probability);
    }

    #[test]
    fn fresh_agent_is_uniform() {
        let agent = PolicyAgent::new(small_config());
        let probs = probabilities(&agent.weights, &input(0.5));
        for p in probs {
            assert!((p - 1.0 / ACTION_COUNT as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn clip_ratio_bounds_movement() {
        assert_eq!(clip_ratio(5.0, 0.2), 1.2);
        assert_eq!(clip_ratio(0.01, 0.2), 0.8);
        assert_eq!(clip_ratio(1.05, 0.2), 1.05);
    }

    #[test]
    fn zero_variance_batch_keeps_parameters() {
        let mut agent = PolicyAgent::new(small_config());
        let before = agent.weights;

        // Identical rewards, zero initial value weights: advantages have
        // exactly zero variance.
        for _ in 0..4 {
            agent.update(transition(1, 0.125, 0.5));
        }

        assert_eq!(agent.weights, before);
        assert_eq!(agent.updates_skipped(), 1);
        assert_eq!(agent.updates_applied(), 0);
    }

    #[test]
    fn rewarded_action_gains_probability() {
        let mut agent = PolicyAgent::new(small_config());
        let state = input(0.3);
        let uniform = 1.0 / ACTION_COUNT as f64;

        for _ in 0..8 {
            agent.update(transition(1, uniform, 0.9));
            agent.update(transition(2, uniform, -0.9));
        }

        assert!(agent.updates_applied() > 0);
        let probs = probabilities(&agent.weights, &state);
        assert!(
            probs[1] > probs[2],
            "rewarded action should outrank punished one: {probs:?}"
        );
    }

    #[test]
    fn non_finite_reward_is_absorbed() {
        let mut agent = PolicyAgent::new(small_config());
        let before = agent.weights;

        agent.update(transition(0, 0.125, 0.1));
        agent.update(transition(1, 0.125, f64::NAN));
        agent.update(transition(2, 0.125, 0.3));
        agent.update(transition(3, 0.125, -0.2));

        // The NaN sample is still in the batch; the update must skip,
        // not poison the parameters.
        assert_eq!(agent.weights, before);
        assert!(agent.weights.iter().flatten().all(|w| w.is_finite()));
    }

    #[test]
    fn buffer_stays_bounded() {
        let mut agent = PolicyAgent::new(small_config());
        for i in 0..100usize {
            agent.update(transition(i % ACTION_COUNT, 0.125, (i % 7) as f64 / 7.0 - 0.4));
        }
        assert!(agent.experience_len() <= 16);
    }
}
