//! Read/write market snapshot JSON files.
//!
//! A snapshot bundles the raw catalog, exchange rates and auction ISINs as
//! fetched on one day, so later runs (and tests) can work offline against
//! exactly the same inputs. The schema is `domain::MarketSnapshot`.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{AuctionCandidateSet, MarketSnapshot, RawBond, RawRate};
use crate::error::AppError;

/// Bundle freshly fetched sources.
pub fn build_snapshot(
    fetched_on: NaiveDate,
    bonds: Vec<RawBond>,
    rates: Vec<RawRate>,
    auction: AuctionCandidateSet,
) -> MarketSnapshot {
    MarketSnapshot {
        tool: "bondstool".to_string(),
        fetched_on,
        bonds,
        rates,
        auction,
    }
}

/// Write a snapshot JSON file.
pub fn write_snapshot_json(path: &Path, snapshot: &MarketSnapshot) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create snapshot JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(BufWriter::new(file), snapshot)
        .map_err(|e| AppError::new(4, format!("Failed to write snapshot JSON: {e}")))?;

    info!(path = %path.display(), bonds = snapshot.bonds.len(), "wrote snapshot");
    Ok(())
}

/// Read a snapshot JSON file.
pub fn read_snapshot_json(path: &Path) -> Result<MarketSnapshot, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open snapshot JSON '{}': {e}", path.display())))?;
    let snapshot: MarketSnapshot =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid snapshot JSON: {e}")))?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawPayment;

    #[test]
    fn snapshot_survives_a_file_trip() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let bond = RawBond {
            isin: "UA4000227045".to_string(),
            nominal: Some(1000.0),
            issue_date: None,
            maturity_date: NaiveDate::from_ymd_opt(2027, 6, 2),
            bond_type: "ОВДП".to_string(),
            security_kind: "OVDP".to_string(),
            currency: "UAH".to_string(),
            pay_period: Some(182),
            payments: vec![RawPayment {
                pay_date: NaiveDate::from_ymd_opt(2027, 6, 2).unwrap(),
                pay_val: 1097.5,
            }],
        };
        let rate = RawRate {
            r030: 840,
            cc: "USD".to_string(),
            rate: 41.25,
            exchangedate: Some("17.10.2026".to_string()),
        };
        let snapshot = build_snapshot(day, vec![bond], vec![rate], AuctionCandidateSet::new(vec!["UA4000227045".into()]));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        write_snapshot_json(&path, &snapshot).unwrap();

        let back = read_snapshot_json(&path).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.exchange_rates().rate("USD"), Some(41.25));
    }

    #[test]
    fn missing_snapshot_is_an_input_error() {
        let err = read_snapshot_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
