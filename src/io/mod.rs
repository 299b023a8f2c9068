//! Input/output helpers.
//!
//! - bag CSV ingest + validation (`ingest`)
//! - workbook export (CSV sheets) (`export`)
//! - market snapshot JSON read/write (`snapshot`)

pub mod export;
pub mod ingest;
pub mod snapshot;

pub use export::*;
pub use ingest::*;
pub use snapshot::*;
