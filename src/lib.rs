//! # Event Impact
//!
//! Measures how markets price scheduled macro and earnings events. The binary in
//! `main.rs` wires configuration and HTTP clients into [`pipeline::run`] and hands
//! the ranked records to [`report`].

pub mod pipeline;
pub mod report;

pub use pipeline::{ImpactRun, Sources, NO_EVENTS_MESSAGE};
