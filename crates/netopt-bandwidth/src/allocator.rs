//! Fairness-constrained bandwidth allocation

use crate::classifier::FlowClassifier;
use crate::demand::DemandForecaster;
use chrono::{DateTime, Timelike, Utc};
use netopt_common::{
    ApplicationProfile, FairnessConstraints, FlowDescriptor, OptimizerError, QosClass, Result,
    TrafficCategory,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Largest fraction of the total an allocation may move per cycle
const MAX_STEP_FRACTION: f64 = 0.25;

/// Weighted demand for one flow, input to the apportioning step
#[derive(Debug, Clone)]
pub struct DemandEntry {
    pub flow_id: String,
    pub category: TrafficCategory,
    pub qos_class: QosClass,
    /// Priority weight (0.0 - 1.0)
    pub weight: f64,
    /// Forecast near-term demand in Mbps
    pub demand_mbps: f64,
}

/// Final allocation for one flow
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FlowAllocation {
    pub flow_id: String,
    pub category: TrafficCategory,
    pub qos_class: QosClass,
    pub demand_mbps: f64,
    pub allocated_mbps: f64,
    /// Share of total available bandwidth (0.0 - 1.0)
    pub share: f64,
}

/// Result of one allocation pass
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AllocationResult {
    pub flows: Vec<FlowAllocation>,
    pub total_available: f64,
    pub total_demand: f64,
    pub total_allocated: f64,
    pub timestamp: DateTime<Utc>,
}

impl AllocationResult {
    /// Flow id -> Mbps map for the network controller
    pub fn as_map(&self) -> HashMap<String, f64> {
        self.flows
            .iter()
            .map(|f| (f.flow_id.clone(), f.allocated_mbps))
            .collect()
    }
}

/// Bandwidth allocator with fairness enforcement
///
/// Holds per-flow rate history and the previous allocation so successive
/// passes converge on the forecast instead of jumping to it.
pub struct BandwidthAllocator {
    constraints: FairnessConstraints,
    classifier: FlowClassifier,
    forecaster: DemandForecaster,
    previous: RwLock<HashMap<String, f64>>,
}

impl BandwidthAllocator {
    /// Create an allocator with the given fairness bounds
    pub fn new(constraints: FairnessConstraints) -> Self {
        Self {
            constraints,
            classifier: FlowClassifier::new(),
            forecaster: DemandForecaster::new(),
            previous: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate using the current wall-clock hour for demand weighting
    pub fn allocate(
        &self,
        flows: &[FlowDescriptor],
        total_bandwidth: f64,
    ) -> Result<AllocationResult> {
        self.allocate_at(flows, total_bandwidth, Utc::now().hour() as u8)
    }

    /// Full pipeline: classify, forecast demand, apportion fairly
    pub fn allocate_at(
        &self,
        flows: &[FlowDescriptor],
        total_bandwidth: f64,
        hour_of_day: u8,
    ) -> Result<AllocationResult> {
        let entries: Vec<DemandEntry> = flows
            .iter()
            .map(|flow| {
                let category = self.classifier.classify(flow);
                let profile = ApplicationProfile::for_category(category);
                self.forecaster.record(&flow.id, flow.current_rate_mbps);
                let demand_mbps = self.forecaster.predict(flow, &profile, hour_of_day);
                DemandEntry {
                    flow_id: flow.id.clone(),
                    category,
                    qos_class: profile.qos_class,
                    weight: profile.priority_weight,
                    demand_mbps,
                }
            })
            .collect();

        let live_ids: Vec<&str> = flows.iter().map(|f| f.id.as_str()).collect();
        self.forecaster.retain(&live_ids);

        let result = self.apportion(&entries, total_bandwidth)?;
        debug!(
            flows = result.flows.len(),
            available = result.total_available,
            allocated = result.total_allocated,
            "bandwidth allocated"
        );
        Ok(result)
    }

    /// Split `total_bandwidth` across weighted demands under fairness bounds
    ///
    /// Guarantees: allocations sum to <= total, every flow sits inside the
    /// effective [floor, ceiling] for this total, and no flow moves more
    /// than a bounded step from its previous allocation.
    pub fn apportion(
        &self,
        entries: &[DemandEntry],
        total_bandwidth: f64,
    ) -> Result<AllocationResult> {
        if !total_bandwidth.is_finite() || total_bandwidth <= 0.0 {
            return Err(OptimizerError::ConfigValidation(format!(
                "total bandwidth must be positive, got {total_bandwidth}"
            )));
        }

        let timestamp = Utc::now();
        if entries.is_empty() {
            return Ok(AllocationResult {
                flows: Vec::new(),
                total_available: total_bandwidth,
                total_demand: 0.0,
                total_allocated: 0.0,
                timestamp,
            });
        }

        let c = &self.constraints;
        let n = entries.len() as f64;

        // Effective bounds for this pass. The starvation floor yields only
        // when the link genuinely cannot hold n floors.
        let lower = c
            .min_allocation_per_flow
            .max(c.min_ratio * total_bandwidth);
        let upper = c
            .max_allocation_per_flow
            .min(c.max_ratio * total_bandwidth)
            .max(lower);
        let floor = lower.min(total_bandwidth / n);

        let scores: Vec<f64> = entries
            .iter()
            .map(|e| {
                let demand = if e.demand_mbps.is_finite() {
                    e.demand_mbps.max(0.0)
                } else {
                    0.0
                };
                demand * e.weight.clamp(0.0, 1.0) * self.priority_boost(e.qos_class)
            })
            .collect();
        let score_sum: f64 = scores.iter().sum();

        let mut allocations: Vec<f64> = if score_sum > 0.0 {
            scores
                .iter()
                .map(|s| total_bandwidth * s / score_sum)
                .collect()
        } else {
            vec![total_bandwidth / n; entries.len()]
        };

        // Bounded step from the previous allocation, then hard bounds
        let step = MAX_STEP_FRACTION * total_bandwidth;
        {
            let previous = self.previous.read();
            for (alloc, entry) in allocations.iter_mut().zip(entries.iter()) {
                if let Some(&prev) = previous.get(&entry.flow_id) {
                    *alloc = prev + (*alloc - prev).clamp(-step, step);
                }
                *alloc = alloc.clamp(floor, upper);
            }
        }

        // Scale the above-floor portion so the sum fits exactly; floors are
        // untouched, which preserves starvation prevention.
        let sum: f64 = allocations.iter().sum();
        if sum > total_bandwidth {
            let floor_total = floor * n;
            let excess_total = sum - floor_total;
            let budget = (total_bandwidth - floor_total).max(0.0);
            if excess_total > 0.0 {
                let factor = budget / excess_total;
                for alloc in allocations.iter_mut() {
                    *alloc = floor + (*alloc - floor) * factor;
                }
            }
        }

        {
            let mut previous = self.previous.write();
            previous.clear();
            for (alloc, entry) in allocations.iter().zip(entries.iter()) {
                previous.insert(entry.flow_id.clone(), *alloc);
            }
        }

        let total_demand: f64 = entries.iter().map(|e| e.demand_mbps.max(0.0)).sum();
        let total_allocated: f64 = allocations.iter().sum();
        let flows = entries
            .iter()
            .zip(allocations.iter())
            .map(|(e, &alloc)| FlowAllocation {
                flow_id: e.flow_id.clone(),
                category: e.category,
                qos_class: e.qos_class,
                demand_mbps: e.demand_mbps,
                allocated_mbps: alloc,
                share: alloc / total_bandwidth,
            })
            .collect();

        Ok(AllocationResult {
            flows,
            total_available: total_bandwidth,
            total_demand,
            total_allocated,
            timestamp,
        })
    }

    fn priority_boost(&self, qos: QosClass) -> f64 {
        let ceiling = self.constraints.priority_boost_ceiling;
        match qos {
            QosClass::Emergency => ceiling,
            QosClass::Premium => (1.0 + ceiling) / 2.0,
            QosClass::Standard => 1.0,
            QosClass::Economy => 0.85,
        }
    }
}
