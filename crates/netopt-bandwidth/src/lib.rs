//! NetOpt Bandwidth - fairness-constrained allocation
//!
//! Classifies active flows by application category, forecasts near-term
//! per-flow demand, and splits the available bandwidth proportionally to
//! priority-weighted demand under hard fairness bounds.
//!
//! Pipeline: classify -> profile lookup -> demand forecast -> weighted
//! split -> fairness clamp -> scale to fit -> starvation floor.

pub mod allocator;
pub mod classifier;
pub mod demand;

pub use allocator::{AllocationResult, BandwidthAllocator, DemandEntry, FlowAllocation};
pub use classifier::FlowClassifier;
pub use demand::DemandForecaster;
