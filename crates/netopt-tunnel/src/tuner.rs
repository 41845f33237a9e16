//! One-shot tunnel configuration derivation

use crate::adaptive::{AdaptiveFrameSizer, FrameSample};
use chrono::{DateTime, Utc};
use netopt_common::{
    ApplicationProfile, CongestionControl, ConnectionType, QueueDiscipline, TrafficCategory,
    TrafficForecast, TunnelBounds, TunnelConfiguration,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Recent link performance statistics fed into the tuner
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinkStats {
    /// Frame/packet error rate (0.0 - 1.0)
    pub error_rate: f64,
    /// Average throughput over the window (Mbps)
    pub avg_throughput_mbps: f64,
    /// Throughput stability (0.0 = erratic, 1.0 = flat)
    pub throughput_stability: f64,
    /// Average round-trip latency (ms)
    pub avg_latency_ms: f64,
    /// Latency stability (0.0 = erratic, 1.0 = flat)
    pub latency_stability: f64,
}

/// Result of one tuning pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunerResult {
    /// The derived tunnel configuration
    pub config: TunnelConfiguration,
    /// Why the tuner chose these parameters
    pub rationale: String,
    /// When the pass ran
    pub timestamp: DateTime<Utc>,
}

/// Tunnel parameter tuner
///
/// `calculate` is a pure derivation; `tune` additionally folds in the
/// adaptive frame sizer once it has warmed up.
pub struct TunnelTuner {
    bounds: TunnelBounds,
    sizer: AdaptiveFrameSizer,
}

impl TunnelTuner {
    /// Create a tuner with the given bounds
    pub fn new(bounds: TunnelBounds) -> Self {
        let sizer = AdaptiveFrameSizer::new(bounds.clone());
        Self { bounds, sizer }
    }

    /// Derive a full tunnel configuration from forecasts and link state
    ///
    /// Idempotent: identical inputs produce an identical configuration.
    pub fn calculate(
        &self,
        forecast: &TrafficForecast,
        connection: ConnectionType,
        stats: &LinkStats,
    ) -> TunerResult {
        let frame_size = self.frame_size_for(connection, stats);
        let buffer_size = self.buffer_size_for(forecast, stats);
        let queue_discipline = queue_discipline_for(forecast);
        let congestion_control = congestion_control_for(connection, stats);
        let profile = ApplicationProfile::for_category(forecast.dominant_category);

        let config = TunnelConfiguration {
            frame_size,
            buffer_size,
            queue_discipline,
            congestion_control,
            compression: compressible(forecast.dominant_category),
            encryption: true,
            keepalive_secs: self.bounds.keepalive_secs,
            qos_class: profile.qos_class,
        };

        TunerResult {
            rationale: rationale(&config, forecast, connection, stats),
            config,
            timestamp: Utc::now(),
        }
    }

    /// Full tuning pass: derive the configuration, then let the adaptive
    /// sizer override the frame size once it has a usable window
    pub fn tune(
        &mut self,
        forecast: &TrafficForecast,
        connection: ConnectionType,
        stats: &LinkStats,
    ) -> TunerResult {
        self.sizer.record(FrameSample {
            error_rate: stats.error_rate,
            throughput_mbps: stats.avg_throughput_mbps,
        });

        let mut result = self.calculate(forecast, connection, stats);
        if self.sizer.warmed_up() {
            let adapted = self.sizer.adjust(forecast.expected_mbps.max(1.0));
            result.config.frame_size = adapted;
        }
        info!(
            frame = result.config.frame_size,
            buffer = result.config.buffer_size,
            qdisc = ?result.config.queue_discipline,
            cc = ?result.config.congestion_control,
            "tunnel tuned"
        );
        result
    }

    /// The adaptive sizer's current frame size
    pub fn adaptive_frame_size(&self) -> u32 {
        self.sizer.current_frame_size()
    }

    fn frame_size_for(&self, connection: ConnectionType, stats: &LinkStats) -> u32 {
        let base: u32 = match connection {
            ConnectionType::Wired => 1500,
            ConnectionType::Wifi => 1500,
            ConnectionType::Cellular => 1400,
            ConnectionType::Satellite => 1300,
        };

        let sized = if stats.error_rate > 0.05 {
            // Lossy link: smaller frames lose less per corruption
            (base as f64 * 0.8) as u32
        } else if stats.error_rate < 0.001
            && stats.throughput_stability > 0.8
            && connection == ConnectionType::Wired
        {
            // Clean stable wire: jumbo frames cut per-packet overhead
            self.bounds.max_frame_size
        } else {
            base
        };

        sized.clamp(self.bounds.min_frame_size, self.bounds.max_frame_size)
    }

    /// Buffer sized to the bandwidth-delay product, doubled for headroom
    fn buffer_size_for(&self, forecast: &TrafficForecast, stats: &LinkStats) -> u64 {
        let bandwidth_mbps = forecast
            .expected_mbps
            .max(stats.avg_throughput_mbps)
            .max(1.0);
        let bdp_bytes = bandwidth_mbps * 1_000_000.0 / 8.0 * (stats.avg_latency_ms.max(1.0) / 1000.0);
        let sized = (bdp_bytes * 2.0) as u64;
        sized.clamp(self.bounds.min_buffer_size, self.bounds.max_buffer_size)
    }
}

fn queue_discipline_for(forecast: &TrafficForecast) -> QueueDiscipline {
    if forecast.expected_mbps < 1.0 {
        return QueueDiscipline::Fifo;
    }
    match forecast.dominant_category {
        TrafficCategory::Voice | TrafficCategory::Video | TrafficCategory::Gaming => {
            QueueDiscipline::FqCodel
        }
        TrafficCategory::FileTransfer | TrafficCategory::Background => QueueDiscipline::Sfq,
        _ => QueueDiscipline::Cake,
    }
}

fn congestion_control_for(connection: ConnectionType, stats: &LinkStats) -> CongestionControl {
    let wireless = matches!(
        connection,
        ConnectionType::Cellular | ConnectionType::Satellite
    );
    if wireless || stats.error_rate > 0.02 {
        // Random loss should not be read as congestion
        CongestionControl::Bbr
    } else if stats.latency_stability < 0.5 {
        CongestionControl::Bbr
    } else if stats.latency_stability > 0.9 && stats.throughput_stability > 0.9 {
        CongestionControl::Vegas
    } else {
        CongestionControl::Cubic
    }
}

fn compressible(category: TrafficCategory) -> bool {
    matches!(
        category,
        TrafficCategory::Browsing
            | TrafficCategory::Messaging
            | TrafficCategory::FileTransfer
            | TrafficCategory::Background
    )
}

fn rationale(
    config: &TunnelConfiguration,
    forecast: &TrafficForecast,
    connection: ConnectionType,
    stats: &LinkStats,
) -> String {
    let mut parts = Vec::new();
    if stats.error_rate > 0.05 {
        parts.push("lossy link".to_string());
    }
    if config.congestion_control == CongestionControl::Bbr {
        parts.push("loss-tolerant congestion control".to_string());
    }
    parts.push(format!(
        "{:?} dominant at {:.0} Mbps over {:?}",
        forecast.dominant_category, forecast.expected_mbps, connection
    ));
    parts.join(", ")
}
