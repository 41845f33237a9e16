//! Application traffic profiles and QoS classes

use serde::{Deserialize, Serialize};

/// Application traffic category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficCategory {
    /// Interactive voice
    Voice,
    /// Video conferencing
    Video,
    /// Media streaming
    Streaming,
    /// Online gaming
    Gaming,
    /// Interactive web browsing
    Browsing,
    /// Bulk file transfer
    FileTransfer,
    /// Messaging and presence
    Messaging,
    /// Background sync and updates
    Background,
    /// Unclassified traffic
    Unknown,
}

/// Coarse traffic priority tier used to bias allocation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QosClass {
    /// Best effort, deprioritized under contention
    Economy,
    /// Default tier
    Standard,
    /// Latency-sensitive interactive traffic
    Premium,
    /// Must never be starved (e.g. emergency calls)
    Emergency,
}

/// Bandwidth requirement envelope in Mbps
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandwidthRequirement {
    /// Floor below which the application is unusable
    pub min_mbps: f64,
    /// Typical steady-state demand
    pub typical_mbps: f64,
    /// Demand ceiling worth allocating for
    pub max_mbps: f64,
}

/// Static per-category requirements looked up during allocation
///
/// Never mutated at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ApplicationProfile {
    /// Category this profile describes
    pub category: TrafficCategory,
    /// Bandwidth envelope
    pub bandwidth: BandwidthRequirement,
    /// Sensitivity to latency (0.0 - 1.0)
    pub latency_sensitivity: f64,
    /// Sensitivity to jitter (0.0 - 1.0)
    pub jitter_sensitivity: f64,
    /// Sensitivity to packet loss (0.0 - 1.0)
    pub loss_sensitivity: f64,
    /// Relative priority weight for allocation
    pub priority_weight: f64,
    /// QoS tier
    pub qos_class: QosClass,
}

impl ApplicationProfile {
    /// Look up the static profile for a category
    pub const fn for_category(category: TrafficCategory) -> Self {
        match category {
            TrafficCategory::Voice => Self {
                category: TrafficCategory::Voice,
                bandwidth: BandwidthRequirement {
                    min_mbps: 0.1,
                    typical_mbps: 0.3,
                    max_mbps: 1.0,
                },
                latency_sensitivity: 1.0,
                jitter_sensitivity: 1.0,
                loss_sensitivity: 0.8,
                priority_weight: 0.95,
                qos_class: QosClass::Premium,
            },
            TrafficCategory::Video => Self {
                category: TrafficCategory::Video,
                bandwidth: BandwidthRequirement {
                    min_mbps: 1.0,
                    typical_mbps: 3.5,
                    max_mbps: 8.0,
                },
                latency_sensitivity: 0.8,
                jitter_sensitivity: 0.8,
                loss_sensitivity: 0.7,
                priority_weight: 0.85,
                qos_class: QosClass::Premium,
            },
            TrafficCategory::Streaming => Self {
                category: TrafficCategory::Streaming,
                bandwidth: BandwidthRequirement {
                    min_mbps: 1.5,
                    typical_mbps: 5.0,
                    max_mbps: 25.0,
                },
                latency_sensitivity: 0.3,
                jitter_sensitivity: 0.4,
                loss_sensitivity: 0.5,
                priority_weight: 0.6,
                qos_class: QosClass::Standard,
            },
            TrafficCategory::Gaming => Self {
                category: TrafficCategory::Gaming,
                bandwidth: BandwidthRequirement {
                    min_mbps: 0.5,
                    typical_mbps: 1.5,
                    max_mbps: 4.0,
                },
                latency_sensitivity: 1.0,
                jitter_sensitivity: 0.9,
                loss_sensitivity: 0.6,
                priority_weight: 0.8,
                qos_class: QosClass::Premium,
            },
            TrafficCategory::Browsing => Self {
                category: TrafficCategory::Browsing,
                bandwidth: BandwidthRequirement {
                    min_mbps: 0.5,
                    typical_mbps: 2.0,
                    max_mbps: 10.0,
                },
                latency_sensitivity: 0.6,
                jitter_sensitivity: 0.2,
                loss_sensitivity: 0.4,
                priority_weight: 0.5,
                qos_class: QosClass::Standard,
            },
            TrafficCategory::FileTransfer => Self {
                category: TrafficCategory::FileTransfer,
                bandwidth: BandwidthRequirement {
                    min_mbps: 0.5,
                    typical_mbps: 10.0,
                    max_mbps: 100.0,
                },
                latency_sensitivity: 0.1,
                jitter_sensitivity: 0.0,
                loss_sensitivity: 0.2,
                priority_weight: 0.3,
                qos_class: QosClass::Economy,
            },
            TrafficCategory::Messaging => Self {
                category: TrafficCategory::Messaging,
                bandwidth: BandwidthRequirement {
                    min_mbps: 0.05,
                    typical_mbps: 0.1,
                    max_mbps: 0.5,
                },
                latency_sensitivity: 0.5,
                jitter_sensitivity: 0.1,
                loss_sensitivity: 0.3,
                priority_weight: 0.55,
                qos_class: QosClass::Standard,
            },
            TrafficCategory::Background => Self {
                category: TrafficCategory::Background,
                bandwidth: BandwidthRequirement {
                    min_mbps: 0.1,
                    typical_mbps: 1.0,
                    max_mbps: 20.0,
                },
                latency_sensitivity: 0.0,
                jitter_sensitivity: 0.0,
                loss_sensitivity: 0.1,
                priority_weight: 0.2,
                qos_class: QosClass::Economy,
            },
            TrafficCategory::Unknown => Self {
                category: TrafficCategory::Unknown,
                bandwidth: BandwidthRequirement {
                    min_mbps: 0.2,
                    typical_mbps: 1.0,
                    max_mbps: 10.0,
                },
                latency_sensitivity: 0.4,
                jitter_sensitivity: 0.3,
                loss_sensitivity: 0.3,
                priority_weight: 0.4,
                qos_class: QosClass::Standard,
            },
        }
    }
}
