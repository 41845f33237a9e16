//! NetOpt Common - Shared types for the adaptive network optimization loop
//!
//! This crate provides the vocabulary every control-loop crate speaks:
//!
//! - Network state snapshots and flow descriptors
//! - The discrete optimization action set
//! - Application traffic profiles and QoS classes
//! - Validated, strongly-typed configuration
//! - The error taxonomy shared across the workspace
//! - Collaborator seams (metrics, forecasts, controller, history)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod config;
pub mod error;
pub mod intent;
pub mod profile;
pub mod providers;
pub mod result;
pub mod state;
pub mod tunnel;

pub use action::{ActionTemplate, OptimizationAction, RouteChange, ACTION_TEMPLATES};
pub use config::{
    FairnessConstraints, OptimizerConfig, PolicyConfig, RewardConfig, TunnelBounds,
};
pub use error::{OptimizerError, Result};
pub use intent::{policy_input, ConfigIntent, POLICY_FEATURES};
pub use profile::{ApplicationProfile, BandwidthRequirement, QosClass, TrafficCategory};
pub use providers::{
    ForecastProvider, HistoryStore, MetricsProvider, NetworkController, SecurityAssessment,
    TrafficForecast, UsageForecast,
};
pub use result::{AppliedChange, ExperienceRecord, ImprovementDeltas, OptimizationResult};
pub use state::{FlowDescriptor, NetworkState, TransportProtocol, STATE_FEATURES};
pub use tunnel::{CongestionControl, ConnectionType, QueueDiscipline, TunnelConfiguration};
