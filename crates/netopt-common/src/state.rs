//! Network state snapshots and traffic flow descriptors

use crate::tunnel::ConnectionType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of features extracted from a state snapshot
pub const STATE_FEATURES: usize = 10;

/// Immutable snapshot of the network produced by the metric collector
///
/// Consumed read-only by every component in a cycle. Ratios are 0.0 - 1.0,
/// latency and jitter are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkState {
    /// Collection time
    pub timestamp: DateTime<Utc>,
    /// Bandwidth utilization (0.0 - 1.0)
    pub bandwidth_utilization: f64,
    /// Active connection count
    pub connection_count: u32,
    /// Round-trip latency in milliseconds
    pub latency_ms: f64,
    /// Jitter in milliseconds
    pub jitter_ms: f64,
    /// Packet loss rate (0.0 - 1.0)
    pub packet_loss: f64,
    /// CPU load (0.0 - 1.0)
    pub cpu_load: f64,
    /// Memory load (0.0 - 1.0)
    pub memory_load: f64,
    /// Number of active routes
    pub active_routes: u32,
    /// Congestion level (0.0 - 1.0)
    pub congestion_level: f64,
    /// Local hour of day (0 - 23), for time-of-day weighting
    pub hour_of_day: u8,
    /// Provisioned link capacity in Mbps
    pub link_capacity_mbps: f64,
    /// Physical type of the active uplink
    pub connection: ConnectionType,
}

impl NetworkState {
    /// Extract the fixed-length normalized feature vector (each 0.0 - 1.0)
    pub fn features(&self) -> [f64; STATE_FEATURES] {
        [
            self.bandwidth_utilization.clamp(0.0, 1.0),
            (self.connection_count as f64 / 1000.0).min(1.0),
            (self.latency_ms / 500.0).min(1.0),
            (self.jitter_ms / 100.0).min(1.0),
            self.packet_loss.clamp(0.0, 1.0),
            self.cpu_load.clamp(0.0, 1.0),
            self.memory_load.clamp(0.0, 1.0),
            (self.active_routes as f64 / 32.0).min(1.0),
            self.congestion_level.clamp(0.0, 1.0),
            self.hour_of_day as f64 / 24.0,
        ]
    }

    /// Whether the snapshot contains unusable values
    pub fn is_degenerate(&self) -> bool {
        !(self.bandwidth_utilization.is_finite()
            && self.latency_ms.is_finite()
            && self.jitter_ms.is_finite()
            && self.packet_loss.is_finite()
            && self.cpu_load.is_finite()
            && self.memory_load.is_finite()
            && self.congestion_level.is_finite())
            || self.latency_ms < 0.0
            || !(0.0..=1.0).contains(&self.packet_loss)
            || !self.link_capacity_mbps.is_finite()
            || self.link_capacity_mbps <= 0.0
    }

    /// Observed throughput implied by utilization and capacity (Mbps)
    pub fn throughput_mbps(&self) -> f64 {
        self.bandwidth_utilization.clamp(0.0, 1.0) * self.link_capacity_mbps
    }
}

/// Transport protocol of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    /// TCP
    Tcp,
    /// UDP
    Udp,
    /// QUIC
    Quic,
}

/// Active traffic flow as reported by the metric collector
///
/// Input to flow classification and bandwidth allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDescriptor {
    /// Stable flow identifier
    pub id: String,
    /// Application label if the collector resolved one (e.g. "zoom")
    pub application: Option<String>,
    /// Destination port
    pub port: u16,
    /// Transport protocol
    pub protocol: TransportProtocol,
    /// Observed throughput in Mbps
    pub current_rate_mbps: f64,
}
