//! NetOpt Policy - learned action selection for the optimization loop
//!
//! # Features
//!
//! - Softmax-linear policy over the fixed state/intent feature vector
//! - Clipped-ratio (trust-region) updates bounding per-batch policy movement
//! - Linear value baseline for advantage estimation
//! - Bounded experience ring buffer
//! - Saturating reward shaping from measured state pairs

#![warn(missing_docs)]

pub mod agent;
pub mod experience;
pub mod reward;

pub use agent::{ActionSelection, PolicyAgent};
pub use experience::{Experience, ExperienceBuffer};
pub use reward::RewardFunction;
