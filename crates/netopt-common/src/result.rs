//! Typed per-operation result records

use crate::action::RouteChange;
use crate::tunnel::{CongestionControl, QueueDiscipline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One change actually applied to the network stack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum AppliedChange {
    /// Relative bandwidth reallocation
    Bandwidth(f64),
    /// Route steering
    Route(RouteChange),
    /// QoS adjustment
    Qos(f64),
    /// Connection admission factor
    ConnectionLimit(f64),
    /// Compression level
    Compression(f64),
    /// Tunnel frame size (bytes)
    FrameSize(u32),
    /// Tunnel buffer size (bytes)
    BufferSize(u64),
    /// Egress queue discipline
    QueueDiscipline(QueueDiscipline),
    /// Congestion control mode
    CongestionControl(CongestionControl),
}

/// Measured before/after deltas for one cycle (positive = improvement)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImprovementDeltas {
    /// Latency reduction in milliseconds
    pub latency_ms: f64,
    /// Utilization movement toward the target band
    pub utilization: f64,
    /// Packet loss reduction
    pub packet_loss: f64,
    /// Jitter reduction in milliseconds
    pub jitter_ms: f64,
}

/// Immutable record of one optimization cycle
///
/// Appended to the bounded history and the external store; queried by
/// status callers, never replayed into learning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Cycle identifier
    pub id: Uuid,
    /// Whether the cycle completed and applied cleanly
    pub success: bool,
    /// Changes that took effect
    pub applied: Vec<AppliedChange>,
    /// Measured improvement
    pub improvement: ImprovementDeltas,
    /// Decision confidence carried from the intent fusion (0.0 - 1.0)
    pub confidence: f64,
    /// Human-readable explanation of what happened and why
    pub explanation: String,
    /// Completion time
    pub timestamp: DateTime<Utc>,
}

impl OptimizationResult {
    /// Build a failure record with an explanation
    pub fn failed(explanation: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            success: false,
            applied: Vec::new(),
            improvement: ImprovementDeltas::default(),
            confidence: 0.0,
            explanation: explanation.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Serializable rewarded transition handed to the history store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceRecord {
    /// Cycle the transition belongs to
    pub cycle_id: Uuid,
    /// Selected action template name
    pub action: String,
    /// Selection probability at choice time
    pub probability: f64,
    /// Reward observed after settling
    pub reward: f64,
    /// Whether the episode terminated (loop shutdown)
    pub terminal: bool,
    /// Transition time
    pub timestamp: DateTime<Utc>,
}
