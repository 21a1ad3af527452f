//! # Event Impact Analytics
//!
//! This crate measures how a price series reacts around a scheduled event. It acts
//! as the "unbiased judge" of the system.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external systems.
//!   It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** The `ImpactEngine` is a stateless calculator. It takes a
//!   price series, an event and a window, and produces an `ImpactRecord`.
//!
//! ## Public API
//!
//! - `ImpactEngine`: Windowed return, volatility, drawdown and reaction-time statistics.
//! - `rank_impacts` / `summarize_by_category`: Ordering and aggregation of the results.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{analysis_bounds, ImpactEngine};
pub use error::AnalyticsError;
pub use report::{rank_impacts, summarize_by_category, CategorySummary};
