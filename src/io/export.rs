//! Export the bag summary and the payment schedule as CSV "sheets".
//!
//! The export is meant to be easy to open in spreadsheets: one file per
//! sheet, money rounded to cents, dates as `DD-MM-YYYY`. Plain CSV carries
//! no column widths, so no width fitting is done; spreadsheets size columns
//! themselves on open.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{BagSummary, ScheduleRow};
use crate::engine::round_cents;
use crate::error::AppError;

pub const BAG_SHEET: &str = "Bag.csv";
pub const SCHEDULE_SHEET: &str = "Schedule.csv";

/// Marker written in the date column of matured holdings.
pub const MATURED_MARKER: &str = "matured";

const BAG_HEADER: [&str; 12] = [
    "isin",
    "type",
    "currency",
    "last_pay_date",
    "quantity",
    "expenditure",
    "tax",
    "expected_return",
    "profit_before_tax",
    "profit_after_tax",
    "profit_per_bond",
    "profitability_pct",
];

const SCHEDULE_HEADER: [&str; 5] = ["isin", "type", "currency", "pay_date", "amount_uah"];

/// Write `Bag.csv` and `Schedule.csv` into `dir`, creating it if needed.
pub fn write_workbook(dir: &Path, summary: &BagSummary, schedule: &[ScheduleRow]) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(4, format!("Failed to create export directory '{}': {e}", dir.display())))?;

    let bag_path = dir.join(BAG_SHEET);
    write_bag_sheet(&bag_path, summary)?;
    let schedule_path = dir.join(SCHEDULE_SHEET);
    write_schedule_sheet(&schedule_path, schedule)?;

    info!(dir = %dir.display(), "exported workbook");
    Ok(vec![bag_path, schedule_path])
}

fn write_bag_sheet(path: &Path, summary: &BagSummary) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| create_error(path, e))?;
    writer.write_record(BAG_HEADER).map_err(|e| write_error(path, e))?;

    for r in &summary.active {
        writer
            .write_record([
                r.bag.isin.clone(),
                r.bond_type.clone(),
                r.currency.clone(),
                r.last_pay_date.format("%d-%m-%Y").to_string(),
                r.bag.quantity.to_string(),
                money(r.bag.expenditure),
                r.bag.tax.to_string(),
                money(r.expected_return),
                money(r.profit.profit_before_tax),
                money(r.profit.profit_after_tax),
                money(r.profit.profit_per_unit),
                money(r.profit.profitability_pct),
            ])
            .map_err(|e| write_error(path, e))?;
    }

    if let Some(total) = &summary.total {
        writer
            .write_record([
                "Total".to_string(),
                String::new(),
                String::new(),
                String::new(),
                total.quantity.to_string(),
                money(total.expenditure),
                String::new(),
                money(total.expected_return),
                money(total.profit_before_tax),
                money(total.profit_after_tax),
                String::new(),
                money(total.profitability_pct),
            ])
            .map_err(|e| write_error(path, e))?;
    }

    for m in &summary.matured {
        writer
            .write_record([
                m.isin.clone(),
                String::new(),
                String::new(),
                MATURED_MARKER.to_string(),
                m.quantity.to_string(),
                money(m.expenditure),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ])
            .map_err(|e| write_error(path, e))?;
    }

    writer.flush().map_err(|e| write_error(path, e))
}

fn write_schedule_sheet(path: &Path, schedule: &[ScheduleRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| create_error(path, e))?;
    writer.write_record(SCHEDULE_HEADER).map_err(|e| write_error(path, e))?;

    for row in schedule {
        writer
            .write_record([
                row.isin.as_str(),
                row.bond_type.as_str(),
                row.currency.as_str(),
                row.pay_date.as_str(),
                money(row.total_pay_val).as_str(),
            ])
            .map_err(|e| write_error(path, e))?;
    }

    writer.flush().map_err(|e| write_error(path, e))
}

fn money(v: f64) -> String {
    format!("{:.2}", round_cents(v))
}

fn create_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(4, format!("Failed to create '{}': {e}", path.display()))
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(4, format!("Failed to write '{}': {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BagRow, PositionProfit, PositionReport, TotalRow};
    use chrono::NaiveDate;

    fn summary() -> BagSummary {
        let bag = BagRow {
            isin: "UA4000227045".to_string(),
            quantity: 10,
            expenditure: 900.0,
            tax: 0.1,
        };
        BagSummary {
            active: vec![PositionReport {
                bag,
                bond_type: "ОВДП".to_string(),
                currency: "UAH".to_string(),
                last_pay_date: NaiveDate::from_ymd_opt(2027, 6, 2).unwrap(),
                expected_return: 1000.0,
                profit: PositionProfit {
                    profit_before_tax: 100.0,
                    profit_after_tax: 90.0,
                    profit_per_unit: 9.0,
                    profitability_pct: 10.0,
                },
            }],
            total: Some(TotalRow {
                quantity: 10,
                expenditure: 900.0,
                expected_return: 1000.0,
                profit_before_tax: 100.0,
                profit_after_tax: 90.0,
                profitability_pct: 10.0,
            }),
            matured: vec![BagRow {
                isin: "UA4000199999".to_string(),
                quantity: 4,
                expenditure: 4000.0,
                tax: 0.195,
            }],
        }
    }

    #[test]
    fn workbook_contains_both_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let schedule = vec![ScheduleRow {
            isin: "UA4000227045".to_string(),
            bond_type: "ОВДП".to_string(),
            currency: "UAH".to_string(),
            pay_date: "02-06-2027".to_string(),
            total_pay_val: 1000.004,
        }];

        let out_dir = dir.path().join("export");
        let paths = write_workbook(&out_dir, &summary(), &schedule).unwrap();
        assert_eq!(paths.len(), 2);

        let bag = fs::read_to_string(out_dir.join(BAG_SHEET)).unwrap();
        let lines: Vec<&str> = bag.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("UA4000227045,ОВДП,UAH,02-06-2027,10,900.00,0.1,1000.00"));
        assert!(lines[2].starts_with("Total,,,,10,900.00"));
        assert!(lines[3].starts_with("UA4000199999,,,matured,4"));

        let sched = fs::read_to_string(out_dir.join(SCHEDULE_SHEET)).unwrap();
        assert_eq!(
            sched.lines().collect::<Vec<_>>(),
            vec!["isin,type,currency,pay_date,amount_uah", "UA4000227045,ОВДП,UAH,02-06-2027,1000.00"]
        );
    }
}
