//! Near-term per-flow demand forecasting
//!
//! Time-of-day and category-weighted extrapolation from observed usage.
//! Keeps a bounded rate history per flow and fits a linear trend over it.

use dashmap::DashMap;
use netopt_common::{ApplicationProfile, FlowDescriptor, TrafficCategory};
use std::collections::VecDeque;

/// Samples retained per flow
const WINDOW_SIZE: usize = 30;

/// Cycles of trend extrapolated into the forecast
const HORIZON_CYCLES: f64 = 3.0;

/// Per-flow demand forecaster
pub struct DemandForecaster {
    history: DashMap<String, VecDeque<f64>>,
}

impl DemandForecaster {
    /// Create an empty forecaster
    pub fn new() -> Self {
        Self {
            history: DashMap::new(),
        }
    }

    /// Record the latest observed rate for a flow
    pub fn record(&self, flow_id: &str, rate_mbps: f64) {
        if !rate_mbps.is_finite() || rate_mbps < 0.0 {
            return;
        }
        let mut entry = self.history.entry(flow_id.to_string()).or_default();
        if entry.len() >= WINDOW_SIZE {
            entry.pop_front();
        }
        entry.push_back(rate_mbps);
    }

    /// Forecast near-term demand for a flow, clamped to its profile envelope
    pub fn predict(
        &self,
        flow: &FlowDescriptor,
        profile: &ApplicationProfile,
        hour_of_day: u8,
    ) -> f64 {
        let (last, slope) = self
            .history
            .get(&flow.id)
            .map(|h| (h.back().copied().unwrap_or(flow.current_rate_mbps), slope(&h)))
            .unwrap_or((flow.current_rate_mbps, 0.0));

        let extrapolated = (last + slope * HORIZON_CYCLES).max(0.0);
        let baseline = extrapolated.max(profile.bandwidth.typical_mbps * 0.5);
        let demand = baseline * tod_factor(profile.category, hour_of_day);

        demand.clamp(profile.bandwidth.min_mbps, profile.bandwidth.max_mbps)
    }

    /// Drop history for flows that no longer exist
    pub fn retain(&self, live_ids: &[&str]) {
        self.history.retain(|id, _| live_ids.contains(&id.as_str()));
    }

    /// Number of flows with recorded history
    pub fn tracked_flows(&self) -> usize {
        self.history.len()
    }
}

impl Default for DemandForecaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Least-squares slope over the rate window (Mbps per cycle)
fn slope(data: &VecDeque<f64>) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let n = data.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (i, &y) in data.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }
    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < 1e-9 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denominator
    }
}

/// Time-of-day demand multiplier per category
fn tod_factor(category: TrafficCategory, hour: u8) -> f64 {
    let business = (9..=17).contains(&hour);
    let evening = (19..=23).contains(&hour);
    let night = hour < 6;

    match category {
        TrafficCategory::Voice | TrafficCategory::Video => {
            if business {
                1.3
            } else if night {
                0.6
            } else {
                1.0
            }
        }
        TrafficCategory::Streaming | TrafficCategory::Gaming => {
            if evening {
                1.4
            } else if business {
                0.8
            } else {
                1.0
            }
        }
        TrafficCategory::Browsing | TrafficCategory::Messaging => {
            if night {
                0.5
            } else {
                1.0
            }
        }
        TrafficCategory::FileTransfer | TrafficCategory::Background => {
            // Bulk work migrates to off-hours
            if night {
                1.3
            } else if business {
                0.9
            } else {
                1.0
            }
        }
        TrafficCategory::Unknown => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netopt_common::TransportProtocol;

    fn flow(id: &str, rate: f64) -> FlowDescriptor {
        FlowDescriptor {
            id: id.into(),
            application: None,
            port: 443,
            protocol: TransportProtocol::Tcp,
            current_rate_mbps: rate,
        }
    }

    #[test]
    fn prediction_stays_in_profile_envelope() {
        let forecaster = DemandForecaster::new();
        let profile = ApplicationProfile::for_category(TrafficCategory::Video);
        let f = flow("f1", 500.0);
        let demand = forecaster.predict(&f, &profile, 12);
        assert!(demand <= profile.bandwidth.max_mbps);
        assert!(demand >= profile.bandwidth.min_mbps);
    }

    #[test]
    fn rising_history_raises_forecast() {
        let forecaster = DemandForecaster::new();
        let profile = ApplicationProfile::for_category(TrafficCategory::FileTransfer);
        for i in 0..10 {
            forecaster.record("f1", 5.0 + i as f64);
        }
        forecaster.record("f2", 5.0);

        let rising = forecaster.predict(&flow("f1", 14.0), &profile, 12);
        let flat = forecaster.predict(&flow("f2", 5.0), &profile, 12);
        assert!(rising > flat, "rising {rising} should exceed flat {flat}");
    }

    #[test]
    fn evening_boosts_streaming() {
        let forecaster = DemandForecaster::new();
        let profile = ApplicationProfile::for_category(TrafficCategory::Streaming);
        let f = flow("f1", 6.0);
        let evening = forecaster.predict(&f, &profile, 21);
        let morning = forecaster.predict(&f, &profile, 10);
        assert!(evening > morning);
    }

    #[test]
    fn negative_and_nan_samples_ignored() {
        let forecaster = DemandForecaster::new();
        forecaster.record("f1", -3.0);
        forecaster.record("f1", f64::NAN);
        assert_eq!(forecaster.tracked_flows(), 0);
    }

    #[test]
    fn retain_drops_dead_flows() {
        let forecaster = DemandForecaster::new();
        forecaster.record("a", 1.0);
        forecaster.record("b", 1.0);
        forecaster.retain(&["a"]);
        assert_eq!(forecaster.tracked_flows(), 1);
    }
}
