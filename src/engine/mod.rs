//! Core engine: the match list state machine, the deep-dive aggregator and
//! the view that drives both against a gateway.

pub mod orchestrator;
pub mod deep_dive;
pub mod view;
