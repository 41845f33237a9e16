//! NetOpt Orchestrator - the adaptive optimization control loop
//!
//! Sequences one cycle: collect state -> fuse forecasts into an intent ->
//! select a policy action -> apply it through the network controller ->
//! settle -> re-measure -> reward and learn -> allocate bandwidth ->
//! tune the tunnel -> publish the result.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ORCHESTRATOR LOOP                      │
//! │                                                              │
//! │  Metrics ──► DecisionEngine ──► PolicyAgent ──► Environment  │
//! │     ▲             ▲                  ▲              │        │
//! │     │        Forecasts           Experience      settle      │
//! │     │                                ▲              │        │
//! │     └──── measure ───────────────────┴── reward ◄───┘        │
//! │                                                              │
//! │  BandwidthAllocator ──► apply_allocations                    │
//! │  TunnelTuner ─────────► frame/buffer/qdisc/cc                │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod decision;
pub mod environment;
pub mod orchestrator;

pub use decision::DecisionEngine;
pub use environment::{ApplyReport, Environment};
pub use orchestrator::{Orchestrator, Phase, Status};
