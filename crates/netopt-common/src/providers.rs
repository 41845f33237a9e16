//! Collaborator seams consumed by the control loop
//!
//! The loop never talks to the OS or the wire directly; everything external
//! arrives through these traits, injected at orchestrator construction.

use crate::action::RouteChange;
use crate::error::Result;
use crate::profile::TrafficCategory;
use crate::result::{ExperienceRecord, OptimizationResult};
use crate::state::{FlowDescriptor, NetworkState};
use crate::tunnel::{CongestionControl, QueueDiscipline};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Short-horizon traffic volume forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficForecast {
    /// Expected aggregate throughput over the horizon (Mbps)
    pub expected_mbps: f64,
    /// Expected peak throughput (Mbps)
    pub peak_mbps: f64,
    /// Trend of demand, -1.0 (falling) to 1.0 (rising)
    pub trend: f64,
    /// Category expected to dominate the mix
    pub dominant_category: TrafficCategory,
    /// Forecast confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// Security posture assessment over the same horizon
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SecurityAssessment {
    /// Threat level (0.0 - 1.0)
    pub threat_level: f64,
    /// Behavioral anomaly score (0.0 - 1.0)
    pub anomaly_score: f64,
    /// Assessment confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// Expected user-level demand
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsageForecast {
    /// Expected concurrent sessions
    pub expected_sessions: u32,
    /// Share of sessions expected to be bandwidth-heavy (0.0 - 1.0)
    pub heavy_share: f64,
    /// Forecast confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// Source of network state snapshots and the active flow inventory
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Collect a fresh state snapshot
    async fn collect_state(&self) -> Result<NetworkState>;

    /// List currently active flows for the allocation phase
    async fn active_flows(&self) -> Result<Vec<FlowDescriptor>>;
}

/// Source of the three short-horizon forecasts fused per cycle
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Traffic volume forecast
    async fn traffic_forecast(&self) -> Result<TrafficForecast>;

    /// Security posture assessment
    async fn security_assessment(&self) -> Result<SecurityAssessment>;

    /// User demand forecast
    async fn usage_forecast(&self) -> Result<UsageForecast>;
}

/// The mutating interface to the live network stack
///
/// Each call either takes effect or returns an error; the loop records
/// partial application rather than retrying within a cycle.
#[async_trait]
pub trait NetworkController: Send + Sync {
    /// Reallocate bandwidth by a relative delta (-1.0 to 1.0)
    async fn adjust_bandwidth(&self, delta: f64) -> Result<()>;

    /// Steer traffic according to the route mode
    async fn change_route(&self, mode: RouteChange) -> Result<()>;

    /// Adjust QoS marking aggressiveness by a relative delta
    async fn adjust_qos(&self, delta: f64) -> Result<()>;

    /// Set the connection admission factor (0.0 - 1.0)
    async fn set_connection_limit(&self, factor: f64) -> Result<()>;

    /// Set payload compression level (0.0 - 1.0)
    async fn set_compression(&self, level: f64) -> Result<()>;

    /// Set tunnel frame size in bytes
    async fn set_frame_size(&self, bytes: u32) -> Result<()>;

    /// Set tunnel transport buffer size in bytes
    async fn set_buffer_size(&self, bytes: u64) -> Result<()>;

    /// Set the egress queue discipline
    async fn set_queue_discipline(&self, qdisc: QueueDiscipline) -> Result<()>;

    /// Set the congestion control mode
    async fn set_congestion_control(&self, cc: CongestionControl) -> Result<()>;

    /// Push a per-flow bandwidth allocation map (flow id -> Mbps)
    async fn apply_allocations(&self, allocations: &HashMap<String, f64>) -> Result<()>;
}

/// Durable sink for results and experiences; querying is the store's concern
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a cycle result
    async fn append_result(&self, result: &OptimizationResult) -> Result<()>;

    /// Persist a rewarded transition
    async fn append_experience(&self, record: &ExperienceRecord) -> Result<()>;
}
