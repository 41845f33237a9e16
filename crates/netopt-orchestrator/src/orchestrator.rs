//! The periodic optimization control loop
//!
//! One long-lived task runs cycles on a fixed interval; `run_once` and the
//! loop serialize on the cycle mutex so two applies can never overlap.
//! Status reads never take that mutex. `stop` takes effect at the next
//! phase boundary, never mid-apply.

use crate::decision::DecisionEngine;
use crate::environment::Environment;
use chrono::Utc;
use netopt_bandwidth::BandwidthAllocator;
use netopt_common::{
    policy_input, AppliedChange, ExperienceRecord, ForecastProvider, HistoryStore,
    ImprovementDeltas, MetricsProvider, NetworkController, NetworkState, OptimizationResult,
    OptimizerConfig, OptimizerError, Result, TrafficCategory, TrafficForecast,
    TunnelConfiguration,
};
use netopt_policy::{Experience, PolicyAgent, RewardFunction};
use netopt_tunnel::{LinkStats, TunnelTuner};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Control loop phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Loop is not running
    Idle,
    /// Waiting on the metric collector
    Collecting,
    /// Fusing forecasts and selecting an action
    Deciding,
    /// Pushing changes to the network controller
    Applying,
    /// Waiting for the change to propagate
    Settling,
    /// Re-measuring after settle
    Measuring,
    /// Rewarding and updating the policy
    Learning,
    /// Computing and pushing the bandwidth split
    Allocating,
    /// Deriving and pushing tunnel parameters
    Tuning,
    /// Waiting for the next cycle
    Sleeping,
}

/// Snapshot of the orchestrator's externally visible state
///
/// A value, not a reference into live state; safe to hold across cycles.
#[derive(Debug, Clone)]
pub struct Status {
    /// Whether the periodic loop is running
    pub running: bool,
    /// Current phase
    pub phase: Phase,
    /// Completed cycles (including failed ones)
    pub cycle_count: u64,
    /// Failed cycles since the last success
    pub consecutive_failures: u32,
    /// Result of the last completed cycle
    pub last_result: Option<OptimizationResult>,
}

/// Everything a cycle mutates, guarded by the cycle mutex
struct CycleCore {
    engine: DecisionEngine,
    agent: PolicyAgent,
    reward: RewardFunction,
    allocator: BandwidthAllocator,
    tuner: TunnelTuner,
    rng: StdRng,
    last_tunnel: Option<TunnelConfiguration>,
}

struct StatusInner {
    phase: Phase,
    cycle_count: u64,
    consecutive_failures: u32,
    last_result: Option<OptimizationResult>,
}

struct Inner {
    config: OptimizerConfig,
    metrics: Arc<dyn MetricsProvider>,
    forecasts: Arc<dyn ForecastProvider>,
    environment: Environment,
    history: Arc<dyn HistoryStore>,
    core: Mutex<CycleCore>,
    status: RwLock<StatusInner>,
    recent: RwLock<VecDeque<OptimizationResult>>,
    running: AtomicBool,
}

enum CycleOutcome {
    Completed(OptimizationResult),
    Cancelled,
}

/// The adaptive optimization orchestrator
pub struct Orchestrator {
    inner: Arc<Inner>,
    loop_handle: Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl Orchestrator {
    /// Create an orchestrator with injected collaborators
    ///
    /// Validates the configuration; the policy seed comes from entropy.
    pub fn new(
        config: OptimizerConfig,
        metrics: Arc<dyn MetricsProvider>,
        forecasts: Arc<dyn ForecastProvider>,
        controller: Arc<dyn NetworkController>,
        history: Arc<dyn HistoryStore>,
    ) -> Result<Self> {
        Self::with_seed(config, metrics, forecasts, controller, history, rand::random())
    }

    /// Create with a fixed policy seed for reproducible action selection
    pub fn with_seed(
        config: OptimizerConfig,
        metrics: Arc<dyn MetricsProvider>,
        forecasts: Arc<dyn ForecastProvider>,
        controller: Arc<dyn NetworkController>,
        history: Arc<dyn HistoryStore>,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;

        let core = CycleCore {
            engine: DecisionEngine::new(),
            agent: PolicyAgent::new(config.policy.clone()),
            reward: RewardFunction::new(config.reward.clone()),
            allocator: BandwidthAllocator::new(config.fairness.clone()),
            tuner: TunnelTuner::new(config.tunnel.clone()),
            rng: StdRng::seed_from_u64(seed),
            last_tunnel: None,
        };

        let inner = Inner {
            config,
            metrics,
            forecasts,
            environment: Environment::new(controller),
            history,
            core: Mutex::new(core),
            status: RwLock::new(StatusInner {
                phase: Phase::Idle,
                cycle_count: 0,
                consecutive_failures: 0,
                last_result: None,
            }),
            recent: RwLock::new(VecDeque::new()),
            running: AtomicBool::new(false),
        };

        Ok(Self {
            inner: Arc::new(inner),
            loop_handle: Mutex::new(None),
        })
    }

    /// Start the periodic loop; no-op if already running
    pub async fn start(&self) {
        let mut handle = self.loop_handle.lock().await;
        if self.inner.running.load(Ordering::SeqCst) {
            debug!("optimization loop already running");
            return;
        }

        let (tx, rx) = watch::channel(false);
        self.inner.running.store(true, Ordering::SeqCst);
        let inner = self.inner.clone();
        let task = tokio::spawn(run_loop(inner, rx));
        *handle = Some((tx, task));
        info!(
            interval_secs = self.inner.config.optimization_interval_secs,
            "optimization loop started"
        );
    }

    /// Stop the loop cooperatively
    ///
    /// Returns once the in-flight phase completes and the loop task has
    /// exited; no cycle starts after this returns.
    pub async fn stop(&self) {
        let mut handle = self.loop_handle.lock().await;
        if let Some((tx, task)) = handle.take() {
            let _ = tx.send(true);
            if let Err(e) = task.await {
                warn!(error = %e, "loop task join failed");
            }
        }
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.set_phase(Phase::Idle);
        info!("optimization loop stopped");
    }

    /// Execute exactly one cycle synchronously
    ///
    /// Serializes with the periodic loop on the cycle mutex, so two applies
    /// never overlap.
    pub async fn run_once(&self) -> OptimizationResult {
        match run_cycle(&self.inner, None).await {
            CycleOutcome::Completed(result) => result,
            // Unreachable without a cancel signal; fold defensively anyway
            CycleOutcome::Cancelled => OptimizationResult::failed("cycle cancelled"),
        }
    }

    /// Current externally visible state; never blocks on an in-flight cycle
    pub fn status(&self) -> Status {
        let s = self.inner.status.read();
        Status {
            running: self.inner.running.load(Ordering::SeqCst),
            phase: s.phase,
            cycle_count: s.cycle_count,
            consecutive_failures: s.consecutive_failures,
            last_result: s.last_result.clone(),
        }
    }

    /// Bounded history of recent cycle results, oldest first
    pub fn recent_results(&self) -> Vec<OptimizationResult> {
        self.inner.recent.read().iter().cloned().collect()
    }
}

async fn run_loop(inner: Arc<Inner>, mut stop: watch::Receiver<bool>) {
    loop {
        if *stop.borrow() {
            break;
        }

        let outcome = run_cycle(&inner, Some(&stop)).await;
        let sleep_for = match &outcome {
            CycleOutcome::Completed(result) if result.success => {
                inner.config.optimization_interval()
            }
            CycleOutcome::Completed(_) => {
                warn!(
                    backoff_secs = inner.config.error_backoff_secs,
                    "cycle failed, backing off"
                );
                inner.config.error_backoff()
            }
            CycleOutcome::Cancelled => break,
        };

        inner.set_phase(Phase::Sleeping);
        tokio::select! {
            _ = tokio::time::sleep(sleep_for) => {}
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }

    inner.running.store(false, Ordering::SeqCst);
    inner.set_phase(Phase::Idle);
}

/// One full cycle under the cycle mutex
///
/// The cancel signal is honored between phases only; once the apply phase
/// begins the cycle always runs to completion so the stack is never left
/// half-configured.
async fn run_cycle(inner: &Arc<Inner>, cancel: Option<&watch::Receiver<bool>>) -> CycleOutcome {
    let cancelled = || cancel.map(|c| *c.borrow()).unwrap_or(false);
    let cycle_id = Uuid::new_v4();

    let mut guard = inner.core.lock().await;
    let core = &mut *guard;

    inner.set_phase(Phase::Collecting);
    let prev = match inner.collect_state().await {
        Ok(state) => state,
        Err(e) => {
            let result = inner
                .finish_failure(cycle_id, format!("state collection failed: {e}"))
                .await;
            return CycleOutcome::Completed(result);
        }
    };

    let traffic = inner
        .forecasts
        .traffic_forecast()
        .await
        .map_err(|e| warn!(error = %e, "traffic forecast unavailable"))
        .ok();
    let security = inner
        .forecasts
        .security_assessment()
        .await
        .map_err(|e| warn!(error = %e, "security assessment unavailable"))
        .ok();
    let usage = inner
        .forecasts
        .usage_forecast()
        .await
        .map_err(|e| warn!(error = %e, "usage forecast unavailable"))
        .ok();

    if cancelled() {
        return CycleOutcome::Cancelled;
    }

    inner.set_phase(Phase::Deciding);
    let intent = core
        .engine
        .decide(traffic.as_ref(), security.as_ref(), usage.as_ref(), &prev);
    let input = policy_input(&prev, &intent);
    let selection = core.agent.select_action(&input, &mut core.rng);
    debug!(
        action = selection.template.name,
        probability = selection.probability,
        value = selection.value_estimate,
        "action selected"
    );

    if cancelled() {
        return CycleOutcome::Cancelled;
    }

    inner.set_phase(Phase::Applying);
    let report = inner.environment.apply(&selection.template.action).await;

    inner.set_phase(Phase::Settling);
    inner
        .environment
        .settle(inner.config.settle_duration())
        .await;

    inner.set_phase(Phase::Measuring);
    let next = match inner.collect_state().await {
        Ok(state) => state,
        Err(e) => {
            let result = inner
                .finish_failure(cycle_id, format!("post-apply measurement failed: {e}"))
                .await;
            return CycleOutcome::Completed(result);
        }
    };

    inner.set_phase(Phase::Learning);
    let reward = core
        .reward
        .evaluate(&prev, &selection.template.action, &next);
    core.agent.update(Experience {
        state: input,
        action_index: selection.action_index,
        probability: selection.probability,
        reward,
        next_state: policy_input(&next, &intent),
        terminal: false,
    });
    let record = ExperienceRecord {
        cycle_id,
        action: selection.template.name.to_string(),
        probability: selection.probability,
        reward,
        terminal: false,
        timestamp: Utc::now(),
    };
    if let Err(e) = inner.history.append_experience(&record).await {
        warn!(error = %e, "experience not persisted");
    }

    inner.set_phase(Phase::Allocating);
    let mut notes: Vec<String> = Vec::new();
    match inner.metrics.active_flows().await {
        Ok(flows) if !flows.is_empty() => {
            match core
                .allocator
                .allocate_at(&flows, next.link_capacity_mbps, next.hour_of_day)
            {
                Ok(allocation) => {
                    let push = inner
                        .environment
                        .controller()
                        .apply_allocations(&allocation.as_map())
                        .await;
                    match push {
                        Ok(()) => notes.push(format!(
                            "allocated {} flows over {:.0} Mbps",
                            allocation.flows.len(),
                            allocation.total_available
                        )),
                        Err(e) => notes.push(format!("allocation push failed: {e}")),
                    }
                }
                Err(e) => notes.push(format!("allocation skipped: {e}")),
            }
        }
        Ok(_) => {}
        Err(e) => notes.push(format!("flow inventory unavailable: {e}")),
    }

    inner.set_phase(Phase::Tuning);
    let stats = link_stats(&prev, &next);
    let forecast = traffic.unwrap_or_else(|| fallback_forecast(&next));
    let tuned = core.tuner.tune(&forecast, next.connection, &stats);

    let mut applied = report.applied.clone();
    let mut tunnel_failure = None;
    match apply_tunnel(
        inner.environment.controller(),
        core.last_tunnel.as_ref(),
        &tuned.config,
    )
    .await
    {
        Ok(mut changes) => {
            applied.append(&mut changes);
            // Known-good configuration for the next diff
            core.last_tunnel = Some(tuned.config);
        }
        Err(e) => tunnel_failure = Some(e.to_string()),
    }

    let target = inner.config.reward.target_utilization;
    let improvement = ImprovementDeltas {
        latency_ms: prev.latency_ms - next.latency_ms,
        utilization: (prev.bandwidth_utilization - target).abs()
            - (next.bandwidth_utilization - target).abs(),
        packet_loss: prev.packet_loss - next.packet_loss,
        jitter_ms: prev.jitter_ms - next.jitter_ms,
    };

    let success = report.clean() && tunnel_failure.is_none();
    let mut explanation = format!(
        "action {} applied {} change(s), reward {:.3}",
        selection.template.name,
        applied.len(),
        reward
    );
    if let Some(f) = &report.failure {
        explanation.push_str(&format!("; apply aborted: {f}"));
    }
    if let Some(f) = &tunnel_failure {
        explanation.push_str(&format!("; tunnel apply failed: {f}"));
    }
    for note in &notes {
        explanation.push_str("; ");
        explanation.push_str(note);
    }

    let result = OptimizationResult {
        id: cycle_id,
        success,
        applied,
        improvement,
        confidence: intent.confidence,
        explanation,
        timestamp: Utc::now(),
    };
    inner.publish(result.clone()).await;
    CycleOutcome::Completed(result)
}

impl Inner {
    fn set_phase(&self, phase: Phase) {
        self.status.write().phase = phase;
    }

    /// Collect a snapshot, bounded by the configured timeout
    async fn collect_state(&self) -> Result<NetworkState> {
        let state = tokio::time::timeout(self.config.metric_timeout(), self.metrics.collect_state())
            .await
            .map_err(|_| OptimizerError::TransientMetric("collection timed out".into()))??;
        if state.is_degenerate() {
            return Err(OptimizerError::TransientMetric(
                "degenerate state snapshot".into(),
            ));
        }
        Ok(state)
    }

    async fn finish_failure(&self, cycle_id: Uuid, explanation: String) -> OptimizationResult {
        warn!(%cycle_id, %explanation, "cycle abandoned");
        let mut result = OptimizationResult::failed(explanation);
        result.id = cycle_id;
        self.publish(result.clone()).await;
        result
    }

    async fn publish(&self, result: OptimizationResult) {
        {
            let mut status = self.status.write();
            status.cycle_count += 1;
            if result.success {
                status.consecutive_failures = 0;
            } else {
                status.consecutive_failures += 1;
            }
            status.last_result = Some(result.clone());
        }
        {
            let mut recent = self.recent.write();
            if recent.len() >= self.config.history_capacity {
                recent.pop_front();
            }
            recent.push_back(result.clone());
        }
        if let Err(e) = self.history.append_result(&result).await {
            warn!(error = %e, "result not persisted");
        }
    }
}

/// Diff the tuned configuration against the last applied one and push only
/// what changed; fails fast so the previous known-good config is kept
async fn apply_tunnel(
    controller: &Arc<dyn NetworkController>,
    last: Option<&TunnelConfiguration>,
    config: &TunnelConfiguration,
) -> Result<Vec<AppliedChange>> {
    let mut changes = Vec::new();

    if last.map(|l| l.frame_size) != Some(config.frame_size) {
        controller.set_frame_size(config.frame_size).await?;
        changes.push(AppliedChange::FrameSize(config.frame_size));
    }
    if last.map(|l| l.buffer_size) != Some(config.buffer_size) {
        controller.set_buffer_size(config.buffer_size).await?;
        changes.push(AppliedChange::BufferSize(config.buffer_size));
    }
    if last.map(|l| l.queue_discipline) != Some(config.queue_discipline) {
        controller
            .set_queue_discipline(config.queue_discipline)
            .await?;
        changes.push(AppliedChange::QueueDiscipline(config.queue_discipline));
    }
    if last.map(|l| l.congestion_control) != Some(config.congestion_control) {
        controller
            .set_congestion_control(config.congestion_control)
            .await?;
        changes.push(AppliedChange::CongestionControl(config.congestion_control));
    }

    Ok(changes)
}

fn link_stats(prev: &NetworkState, next: &NetworkState) -> LinkStats {
    let avg_throughput = (prev.throughput_mbps() + next.throughput_mbps()) / 2.0;
    let throughput_delta = (next.throughput_mbps() - prev.throughput_mbps()).abs();
    let latency_delta = (next.latency_ms - prev.latency_ms).abs();

    LinkStats {
        error_rate: next.packet_loss,
        avg_throughput_mbps: avg_throughput,
        throughput_stability: (1.0 - throughput_delta / avg_throughput.max(1.0)).clamp(0.0, 1.0),
        avg_latency_ms: (prev.latency_ms + next.latency_ms) / 2.0,
        latency_stability: (1.0 - latency_delta / next.latency_ms.max(1.0)).clamp(0.0, 1.0),
    }
}

/// Stand-in forecast from the live state when the provider is unavailable
fn fallback_forecast(state: &NetworkState) -> TrafficForecast {
    TrafficForecast {
        expected_mbps: state.throughput_mbps(),
        peak_mbps: state.throughput_mbps() * 1.25,
        trend: 0.0,
        dominant_category: TrafficCategory::Unknown,
        confidence: 0.3,
    }
}
