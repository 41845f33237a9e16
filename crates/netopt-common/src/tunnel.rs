//! Tunnel-level configuration types

use crate::profile::QosClass;
use serde::{Deserialize, Serialize};

/// Queue discipline applied at the tunnel egress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueDiscipline {
    /// Plain FIFO
    Fifo,
    /// Fair queueing with CoDel (latency-sensitive mixes)
    FqCodel,
    /// CAKE (mixed traffic with shaping)
    Cake,
    /// Stochastic fairness queueing
    Sfq,
}

/// Congestion control algorithm for the tunnel transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionControl {
    /// Loss-based default
    Cubic,
    /// Model-based, tolerant of random loss
    Bbr,
    /// Classic AIMD
    Reno,
    /// Delay-based
    Vegas,
}

/// Physical characteristics of the underlying connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Wired ethernet / fiber
    Wired,
    /// Wi-Fi
    Wifi,
    /// Cellular (LTE/5G)
    Cellular,
    /// Satellite
    Satellite,
}

/// Complete tunnel parameter set produced by the tuner
///
/// Consumed by the external network controller; the tuner guarantees every
/// field is inside its configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TunnelConfiguration {
    /// Frame size in bytes (MTU-equivalent)
    pub frame_size: u32,
    /// Transport buffer size in bytes
    pub buffer_size: u64,
    /// Egress queue discipline
    pub queue_discipline: QueueDiscipline,
    /// Congestion control mode
    pub congestion_control: CongestionControl,
    /// Whether payload compression is enabled
    pub compression: bool,
    /// Whether payload encryption is enabled
    pub encryption: bool,
    /// Keepalive interval in seconds
    pub keepalive_secs: u16,
    /// QoS tier the tunnel is marked with
    pub qos_class: QosClass,
}
