//! End-to-end tests of the control loop against in-process collaborators

use async_trait::async_trait;
use chrono::Utc;
use netopt_common::{
    CongestionControl, ConnectionType, ExperienceRecord, FlowDescriptor, ForecastProvider,
    HistoryStore, MetricsProvider, NetworkController, NetworkState, OptimizationResult,
    OptimizerConfig, OptimizerError, QueueDiscipline, Result, RouteChange, SecurityAssessment,
    TrafficCategory, TrafficForecast, TransportProtocol, UsageForecast,
};
use netopt_orchestrator::{Orchestrator, Phase};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn snapshot() -> NetworkState {
    NetworkState {
        timestamp: Utc::now(),
        bandwidth_utilization: 0.72,
        connection_count: 150,
        latency_ms: 42.0,
        jitter_ms: 4.5,
        packet_loss: 0.008,
        cpu_load: 0.35,
        memory_load: 0.5,
        active_routes: 2,
        congestion_level: 0.2,
        hour_of_day: 15,
        link_capacity_mbps: 100.0,
        connection: ConnectionType::Wired,
    }
}

fn flows() -> Vec<FlowDescriptor> {
    vec![
        FlowDescriptor {
            id: "conf-call".into(),
            application: Some("zoom".into()),
            port: 3478,
            protocol: TransportProtocol::Udp,
            current_rate_mbps: 3.0,
        },
        FlowDescriptor {
            id: "web".into(),
            application: None,
            port: 443,
            protocol: TransportProtocol::Tcp,
            current_rate_mbps: 6.0,
        },
        FlowDescriptor {
            id: "backup".into(),
            application: Some("rsync".into()),
            port: 873,
            protocol: TransportProtocol::Tcp,
            current_rate_mbps: 25.0,
        },
    ]
}

struct MockMetrics {
    fail: AtomicBool,
    delay_ms: AtomicU64,
}

impl MockMetrics {
    fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl MetricsProvider for MockMetrics {
    async fn collect_state(&self) -> Result<NetworkState> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(OptimizerError::TransientMetric("collector offline".into()));
        }
        Ok(snapshot())
    }

    async fn active_flows(&self) -> Result<Vec<FlowDescriptor>> {
        Ok(flows())
    }
}

struct MockForecasts;

#[async_trait]
impl ForecastProvider for MockForecasts {
    async fn traffic_forecast(&self) -> Result<TrafficForecast> {
        Ok(TrafficForecast {
            expected_mbps: 60.0,
            peak_mbps: 85.0,
            trend: 0.1,
            dominant_category: TrafficCategory::Video,
            confidence: 0.8,
        })
    }

    async fn security_assessment(&self) -> Result<SecurityAssessment> {
        Ok(SecurityAssessment {
            threat_level: 0.1,
            anomaly_score: 0.05,
            confidence: 0.7,
        })
    }

    async fn usage_forecast(&self) -> Result<UsageForecast> {
        Ok(UsageForecast {
            expected_sessions: 160,
            heavy_share: 0.3,
            confidence: 0.6,
        })
    }
}

/// Controller that detects concurrent entry across any two operations
struct MockController {
    active: AtomicBool,
    overlap: AtomicBool,
    calls: AtomicUsize,
}

impl MockController {
    fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            overlap: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    async fn enter(&self) -> Result<()> {
        if self.active.swap(true, Ordering::SeqCst) {
            self.overlap.store(true, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.active.store(false, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl NetworkController for MockController {
    async fn adjust_bandwidth(&self, _delta: f64) -> Result<()> {
        self.enter().await
    }
    async fn change_route(&self, _mode: RouteChange) -> Result<()> {
        self.enter().await
    }
    async fn adjust_qos(&self, _delta: f64) -> Result<()> {
        self.enter().await
    }
    async fn set_connection_limit(&self, _factor: f64) -> Result<()> {
        self.enter().await
    }
    async fn set_compression(&self, _level: f64) -> Result<()> {
        self.enter().await
    }
    async fn set_frame_size(&self, _bytes: u32) -> Result<()> {
        self.enter().await
    }
    async fn set_buffer_size(&self, _bytes: u64) -> Result<()> {
        self.enter().await
    }
    async fn set_queue_discipline(&self, _q: QueueDiscipline) -> Result<()> {
        self.enter().await
    }
    async fn set_congestion_control(&self, _cc: CongestionControl) -> Result<()> {
        self.enter().await
    }
    async fn apply_allocations(&self, _a: &HashMap<String, f64>) -> Result<()> {
        self.enter().await
    }
}

struct MockHistory {
    results: AtomicUsize,
    experiences: AtomicUsize,
}

impl MockHistory {
    fn new() -> Self {
        Self {
            results: AtomicUsize::new(0),
            experiences: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl HistoryStore for MockHistory {
    async fn append_result(&self, _result: &OptimizationResult) -> Result<()> {
        self.results.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append_experience(&self, _record: &ExperienceRecord) -> Result<()> {
        self.experiences.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fast_config() -> OptimizerConfig {
    OptimizerConfig {
        optimization_interval_secs: 1,
        settle_duration_ms: 5,
        metric_timeout_ms: 200,
        error_backoff_secs: 1,
        ..OptimizerConfig::default()
    }
}

struct Harness {
    orchestrator: Arc<Orchestrator>,
    metrics: Arc<MockMetrics>,
    controller: Arc<MockController>,
    history: Arc<MockHistory>,
}

fn harness(config: OptimizerConfig) -> Harness {
    let metrics = Arc::new(MockMetrics::new());
    let controller = Arc::new(MockController::new());
    let history = Arc::new(MockHistory::new());
    let orchestrator = Orchestrator::with_seed(
        config,
        metrics.clone(),
        Arc::new(MockForecasts),
        controller.clone(),
        history.clone(),
        7,
    )
    .unwrap();
    Harness {
        orchestrator: Arc::new(orchestrator),
        metrics,
        controller,
        history,
    }
}

async fn wait_for<F: Fn() -> bool>(cond: F, timeout_ms: u64) -> bool {
    for _ in 0..(timeout_ms / 10).max(1) {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn run_once_completes_and_publishes() {
    init_tracing();
    let h = harness(fast_config());
    let result = h.orchestrator.run_once().await;

    assert!(result.success, "cycle failed: {}", result.explanation);
    // First cycle pushes the full tunnel configuration
    assert!(!result.applied.is_empty());

    let status = h.orchestrator.status();
    assert!(!status.running);
    assert_eq!(status.cycle_count, 1);
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.last_result.unwrap().id, result.id);

    assert_eq!(h.history.results.load(Ordering::SeqCst), 1);
    assert_eq!(h.history.experiences.load(Ordering::SeqCst), 1);
    assert!(h.controller.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn metric_failure_is_absorbed_and_recovers() {
    let h = harness(fast_config());
    h.metrics.fail.store(true, Ordering::SeqCst);

    let failed = h.orchestrator.run_once().await;
    assert!(!failed.success);
    assert!(failed.explanation.contains("state collection failed"));
    assert_eq!(h.orchestrator.status().consecutive_failures, 1);

    h.metrics.fail.store(false, Ordering::SeqCst);
    let ok = h.orchestrator.run_once().await;
    assert!(ok.success);

    let status = h.orchestrator.status();
    assert_eq!(status.cycle_count, 2);
    assert_eq!(status.consecutive_failures, 0);
}

#[tokio::test]
async fn metric_timeout_is_treated_as_transient() {
    let h = harness(fast_config());
    h.metrics.delay_ms.store(500, Ordering::SeqCst);

    let result = h.orchestrator.run_once().await;
    assert!(!result.success);
    assert!(result.explanation.contains("timed out"));
    // Nothing was applied for the abandoned cycle
    assert!(result.applied.is_empty());
}

#[tokio::test]
async fn stop_during_sleep_prevents_next_cycle() {
    init_tracing();
    let h = harness(fast_config());
    h.orchestrator.start().await;

    assert!(
        wait_for(|| h.orchestrator.status().phase == Phase::Sleeping, 2_000).await,
        "first cycle never reached the sleeping phase"
    );
    let cycles_before = h.orchestrator.status().cycle_count;
    assert!(cycles_before >= 1);

    h.orchestrator.stop().await;
    assert!(!h.orchestrator.status().running);
    assert_eq!(h.orchestrator.status().phase, Phase::Idle);

    // Well past the next tick: no further cycle may start
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(h.orchestrator.status().cycle_count, cycles_before);
}

#[tokio::test]
async fn run_once_serializes_with_periodic_loop() {
    let h = harness(fast_config());
    h.orchestrator.start().await;

    let mut tasks = Vec::new();
    for _ in 0..3 {
        let orch = h.orchestrator.clone();
        tasks.push(tokio::spawn(async move { orch.run_once().await }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    h.orchestrator.stop().await;

    assert!(
        !h.controller.overlap.load(Ordering::SeqCst),
        "two applies overlapped"
    );
    assert!(h.orchestrator.status().cycle_count >= 3);
}

#[tokio::test]
async fn start_is_a_noop_when_running() {
    let h = harness(fast_config());
    h.orchestrator.start().await;
    h.orchestrator.start().await;
    assert!(h.orchestrator.status().running);

    h.orchestrator.stop().await;
    assert!(!h.orchestrator.status().running);
}

#[tokio::test]
async fn status_stays_responsive_during_settle() {
    let config = OptimizerConfig {
        settle_duration_ms: 200,
        ..fast_config()
    };
    let h = harness(config);

    let orch = h.orchestrator.clone();
    let cycle = tokio::spawn(async move { orch.run_once().await });

    assert!(
        wait_for(|| h.orchestrator.status().phase == Phase::Settling, 1_000).await,
        "cycle never reached settling"
    );
    // Status reads complete while the cycle is parked in settle
    let status = h.orchestrator.status();
    assert_eq!(status.phase, Phase::Settling);

    let result = cycle.await.unwrap();
    assert!(result.success);
}

#[tokio::test]
async fn recent_results_are_bounded() {
    let config = OptimizerConfig {
        history_capacity: 2,
        ..fast_config()
    };
    let h = harness(config);

    for _ in 0..5 {
        h.orchestrator.run_once().await;
    }
    let recent = h.orchestrator.recent_results();
    assert_eq!(recent.len(), 2);
    assert_eq!(h.orchestrator.status().cycle_count, 5);
}
