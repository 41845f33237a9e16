//! Error types for the NetOpt control loop

use thiserror::Error;

/// NetOpt error type
///
/// Every variant is absorbed at an orchestrator phase boundary and folded
/// into the cycle result; none of them terminate the control loop.
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// State collection timed out or failed; the cycle is skipped
    #[error("metric collection failed: {0}")]
    TransientMetric(String),

    /// Learning batch was numerically unusable; parameters are kept
    #[error("degenerate learning batch: {0}")]
    DegenerateBatch(String),

    /// A controller call failed mid-apply; partial application is recorded
    #[error("apply failed after {applied} change(s): {reason}")]
    ApplyFailure {
        /// Number of changes applied before the failure
        applied: usize,
        /// Failure description from the controller
        reason: String,
    },

    /// A computed value violates its bounds and cannot be clamped
    #[error("config validation: {0}")]
    ConfigValidation(String),

    /// Underlying network controller rejected an operation
    #[error("controller error: {0}")]
    Controller(String),

    /// A forecast or history collaborator failed
    #[error("provider error: {0}")]
    Provider(String),
}

/// Result type for NetOpt
pub type Result<T> = std::result::Result<T, OptimizerError>;
