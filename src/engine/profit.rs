//! Lifetime yield per bond and profit per held position.

use std::collections::BTreeMap;

use crate::domain::{BagRow, BondDefinition, PositionProfit, PositionReport, TotalRow};
use crate::error::EngineError;

/// `(Σ payments − nominal) / nominal × 100` per ISIN, in the bond's currency.
///
/// Expects the untruncated catalog: payments already made still count towards
/// the bond's lifetime yield. Bonds without a positive nominal are omitted.
pub fn bond_lifetime_profitability(full_catalog: &[BondDefinition]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<&str, (f64, Option<f64>)> = BTreeMap::new();
    for row in full_catalog {
        let entry = sums.entry(row.isin.as_str()).or_insert((0.0, row.nominal));
        entry.0 += row.pay_val;
    }

    sums.into_iter()
        .filter_map(|(isin, (paid, nominal))| {
            let nominal = nominal.filter(|n| n.is_finite() && *n > 0.0)?;
            Some((isin.to_string(), (paid - nominal) / nominal * 100.0))
        })
        .collect()
}

/// Profit of one held position given its expected return (base currency).
pub fn position_profitability(expected_return: f64, bag: &BagRow) -> Result<PositionProfit, EngineError> {
    if bag.quantity == 0 {
        return Err(EngineError::InvalidPosition {
            isin: bag.isin.clone(),
            reason: "quantity must be greater than zero".to_string(),
        });
    }
    if !(bag.expenditure.is_finite() && bag.expenditure != 0.0) {
        return Err(EngineError::InvalidPosition {
            isin: bag.isin.clone(),
            reason: "expenditure must be non-zero".to_string(),
        });
    }

    let profit_before_tax = expected_return - bag.expenditure;
    let profit_after_tax = profit_before_tax * (1.0 - bag.tax);

    Ok(PositionProfit {
        profit_before_tax,
        profit_after_tax,
        profit_per_unit: profit_after_tax / bag.quantity as f64,
        profitability_pct: profit_after_tax / bag.expenditure * 100.0,
    })
}

/// Sum the active positions; the percentage is recomputed from the sums.
pub fn total_row(reports: &[PositionReport]) -> Option<TotalRow> {
    if reports.is_empty() {
        return None;
    }

    let mut total = TotalRow {
        quantity: 0,
        expenditure: 0.0,
        expected_return: 0.0,
        profit_before_tax: 0.0,
        profit_after_tax: 0.0,
        profitability_pct: 0.0,
    };
    for r in reports {
        total.quantity += r.bag.quantity;
        total.expenditure += r.bag.expenditure;
        total.expected_return += r.expected_return;
        total.profit_before_tax += r.profit.profit_before_tax;
        total.profit_after_tax += r.profit.profit_after_tax;
    }
    if total.expenditure != 0.0 {
        total.profitability_pct = total.profit_after_tax / total.expenditure * 100.0;
    }

    Some(total)
}
