//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw source records (`RawBond`, `RawRate`) and the session `MarketSnapshot`
//! - normalized tables (`BondDefinition`, `HeldPosition`, `ScheduleRow`)
//! - engine outputs (`MonthlySeries`, `BagSummary`, `RecommendationCandidate`)

pub mod types;

pub use types::*;
