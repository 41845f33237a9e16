//! NetOpt Tunnel - tunnel parameter tuning
//!
//! Two mechanisms:
//!
//! - A one-shot calculation deriving frame size, buffer size, queue
//!   discipline, and congestion-control mode from forecasts, connection
//!   type, and recent link statistics. Idempotent given the same inputs.
//! - A continuous adaptive frame sizer nudging frame size up under clean,
//!   fast conditions and down under errors, clamped to configured bounds.

#![warn(missing_docs)]

pub mod adaptive;
pub mod tuner;

pub use adaptive::{AdaptiveFrameSizer, FrameSample};
pub use tuner::{LinkStats, TunerResult, TunnelTuner};
