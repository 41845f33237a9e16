//! Forecast fusion into a single configuration intent
//!
//! Pure and deterministic: same forecasts and state, same intent. Missing
//! or degenerate inputs degrade to a near-neutral, low-confidence intent
//! instead of failing the cycle.

use netopt_common::{
    ApplicationProfile, ConfigIntent, NetworkState, SecurityAssessment, TrafficForecast,
    UsageForecast,
};
use tracing::debug;

/// Confidence floor reported when no usable forecast arrived
const FLOOR_CONFIDENCE: f64 = 0.2;

/// Fuses traffic, security, and usage forecasts with the current state
#[derive(Debug, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    /// Create a decision engine
    pub fn new() -> Self {
        Self
    }

    /// Fuse the available forecasts into a normalized intent
    pub fn decide(
        &self,
        traffic: Option<&TrafficForecast>,
        security: Option<&SecurityAssessment>,
        usage: Option<&UsageForecast>,
        state: &NetworkState,
    ) -> ConfigIntent {
        let traffic = traffic.filter(|t| usable(t.confidence) && t.expected_mbps.is_finite());
        let security = security.filter(|s| usable(s.confidence) && s.threat_level.is_finite());
        let usage = usage.filter(|u| usable(u.confidence));

        if traffic.is_none() && security.is_none() && usage.is_none() {
            debug!("no usable forecasts, neutral intent");
            return ConfigIntent::neutral();
        }

        let utilization = state.bandwidth_utilization.clamp(0.0, 1.0);
        let capacity = state.link_capacity_mbps.max(1.0);

        // Bandwidth pressure: forecast demand relative to capacity, against
        // what the link is already carrying.
        let bandwidth_bias = traffic
            .map(|t| {
                let pressure = (t.expected_mbps / capacity).clamp(0.0, 1.5);
                ((pressure - utilization) + 0.3 * t.trend.clamp(-1.0, 1.0)) * t.confidence
            })
            .unwrap_or(0.0);

        // Latency pressure: how far the link is from interactive-grade
        // latency, scaled by how latency-sensitive the expected mix is.
        let latency_bias = traffic
            .map(|t| {
                let sensitivity =
                    ApplicationProfile::for_category(t.dominant_category).latency_sensitivity;
                let latency_excess = ((state.latency_ms - 50.0) / 200.0).clamp(0.0, 1.0);
                latency_excess * sensitivity * t.confidence
            })
            .unwrap_or(0.0);

        let security_bias = security
            .map(|s| (s.threat_level + 0.5 * s.anomaly_score.clamp(0.0, 1.0)) * s.confidence)
            .unwrap_or(0.0);

        // Compression pays off when the link is hot and heavy users dominate
        let compression_bias = usage
            .map(|u| {
                let heavy = u.heavy_share.clamp(0.0, 1.0);
                ((utilization - 0.7) * 2.0 + heavy - 0.5) * u.confidence
            })
            .unwrap_or(0.0);

        // Relax limits when forecast sessions exceed current, tighten under
        // threat.
        let connection_bias = {
            let growth = usage
                .map(|u| {
                    let current = state.connection_count.max(1) as f64;
                    ((u.expected_sessions as f64 / current) - 1.0).clamp(-1.0, 1.0) * u.confidence
                })
                .unwrap_or(0.0);
            let threat = security
                .map(|s| s.threat_level * s.confidence)
                .unwrap_or(0.0);
            growth - 0.5 * threat
        };

        let confidence = [
            traffic.map(|t| t.confidence),
            security.map(|s| s.confidence),
            usage.map(|u| u.confidence),
        ]
        .into_iter()
        .flatten()
        .fold(FLOOR_CONFIDENCE, f64::max);

        ConfigIntent {
            bandwidth_bias,
            latency_bias,
            security_bias,
            compression_bias,
            connection_bias,
            confidence,
        }
        .clamped()
    }
}

fn usable(confidence: f64) -> bool {
    confidence.is_finite() && confidence > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use netopt_common::{ConnectionType, TrafficCategory};

    fn state(utilization: f64, latency: f64) -> NetworkState {
        NetworkState {
            timestamp: Utc::now(),
            bandwidth_utilization: utilization,
            connection_count: 100,
            latency_ms: latency,
            jitter_ms: 5.0,
            packet_loss: 0.01,
            cpu_load: 0.4,
            memory_load: 0.5,
            active_routes: 2,
            congestion_level: 0.2,
            hour_of_day: 11,
            link_capacity_mbps: 100.0,
            connection: ConnectionType::Wired,
        }
    }

    fn traffic(mbps: f64, confidence: f64) -> TrafficForecast {
        TrafficForecast {
            expected_mbps: mbps,
            peak_mbps: mbps * 1.3,
            trend: 0.2,
            dominant_category: TrafficCategory::Video,
            confidence,
        }
    }

    #[test]
    fn missing_inputs_yield_neutral_low_confidence() {
        let engine = DecisionEngine::new();
        let intent = engine.decide(None, None, None, &state(0.5, 40.0));
        assert_eq!(intent, ConfigIntent::neutral());
    }

    #[test]
    fn zero_confidence_forecasts_count_as_missing() {
        let engine = DecisionEngine::new();
        let t = traffic(80.0, 0.0);
        let intent = engine.decide(Some(&t), None, None, &state(0.5, 40.0));
        assert_eq!(intent, ConfigIntent::neutral());
    }

    #[test]
    fn demand_above_supply_pushes_bandwidth_up() {
        let engine = DecisionEngine::new();
        let t = traffic(90.0, 0.9);
        let intent = engine.decide(Some(&t), None, None, &state(0.4, 40.0));
        assert!(intent.bandwidth_bias > 0.0);
    }

    #[test]
    fn threat_raises_security_and_tightens_connections() {
        let engine = DecisionEngine::new();
        let s = SecurityAssessment {
            threat_level: 0.9,
            anomaly_score: 0.8,
            confidence: 1.0,
        };
        let intent = engine.decide(None, Some(&s), None, &state(0.5, 40.0));
        assert!(intent.security_bias > 0.8);
        assert!(intent.connection_bias < 0.0);
    }

    #[test]
    fn confidence_is_max_of_components() {
        let engine = DecisionEngine::new();
        let t = traffic(50.0, 0.4);
        let u = UsageForecast {
            expected_sessions: 120,
            heavy_share: 0.3,
            confidence: 0.9,
        };
        let intent = engine.decide(Some(&t), None, Some(&u), &state(0.5, 40.0));
        assert!((intent.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn decision_is_deterministic() {
        let engine = DecisionEngine::new();
        let t = traffic(70.0, 0.8);
        let st = state(0.6, 90.0);
        let a = engine.decide(Some(&t), None, None, &st);
        let b = engine.decide(Some(&t), None, None, &st);
        assert_eq!(a, b);
    }
}
