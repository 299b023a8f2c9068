//! External data sources.
//!
//! - NBU bond catalog + exchange rates (`nbu`)
//! - auction announcement document (`auction`)
//! - bundled example bag (`sample`)

pub mod auction;
pub mod nbu;
pub mod sample;

pub use auction::*;
pub use nbu::*;
pub use sample::*;
