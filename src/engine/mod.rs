//! Pure computations over normalized tables.
//!
//! Nothing in here performs I/O; every function takes owned or borrowed
//! tables and returns new ones.

pub mod bag;
pub mod catalog;
pub mod monthly;
pub mod profit;
pub mod recommend;
pub mod simulate;

/// Round a money amount to two decimals.
pub fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
