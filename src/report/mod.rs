//! Reporting utilities: forecast comparison, bond lookup, and formatted
//! terminal output (`format`).

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{BondDefinition, MonthlySeries};
use crate::engine::catalog::rows_for_isin;

pub mod format;

pub use format::*;

/// One month of a forecast next to the baseline it extends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRow {
    pub month_end: NaiveDate,
    pub baseline: f64,
    pub forecast: f64,
}

impl ForecastRow {
    pub fn delta(&self) -> f64 {
        self.forecast - self.baseline
    }
}

/// Align a forecast with its baseline month by month.
///
/// The forecast covers every baseline month, so it drives the rows; months
/// the baseline doesn't reach count as zero there.
pub fn compare_forecast(baseline: &MonthlySeries, forecast: &MonthlySeries) -> Vec<ForecastRow> {
    forecast
        .entries()
        .map(|(month_end, value)| ForecastRow {
            month_end,
            baseline: baseline.value_at(month_end).unwrap_or(0.0),
            forecast: value,
        })
        .collect()
}

/// Everything known about one bond, for the lookup view.
#[derive(Debug, Clone, PartialEq)]
pub struct BondDetails {
    pub isin: String,
    pub bond_type: String,
    pub security_kind: String,
    pub currency: String,
    pub nominal: Option<f64>,
    pub issue_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub pay_period: Option<u32>,
    pub exchange_rate: f64,
    pub lifetime_profitability_pct: Option<f64>,
    /// Remaining `(pay_date, pay_val)` in the bond's currency.
    pub remaining: Vec<(NaiveDate, f64)>,
}

/// Look a bond up by ISIN.
///
/// `full_catalog` is the untruncated table (static attributes survive even
/// when no payments remain); `catalog` is the truncated one.
pub fn bond_details(
    full_catalog: &[BondDefinition],
    catalog: &[BondDefinition],
    lifetime: &BTreeMap<String, f64>,
    isin: &str,
) -> Option<BondDetails> {
    let isin = isin.trim().to_ascii_uppercase();
    let first = rows_for_isin(full_catalog, &isin).next()?;

    Some(BondDetails {
        isin: first.isin.clone(),
        bond_type: first.bond_type.clone(),
        security_kind: first.security_kind.clone(),
        currency: first.currency.clone(),
        nominal: first.nominal,
        issue_date: first.issue_date,
        maturity_date: first.maturity_date,
        pay_period: first.pay_period,
        exchange_rate: first.exchange_rate,
        lifetime_profitability_pct: lifetime.get(&isin).copied(),
        remaining: rows_for_isin(catalog, &isin).map(|r| (r.pay_date, r.pay_val)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::monthly::{aggregate_and_fill, month_end};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn forecast_rows_pad_the_baseline_with_zeros() {
        let baseline = aggregate_and_fill(vec![(d(2027, 1, 5), 10.0)]);
        let forecast = aggregate_and_fill(vec![(d(2027, 1, 5), 10.0), (d(2027, 3, 5), 7.0)]);
        let rows = compare_forecast(&baseline, &forecast);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].delta(), 0.0);
        assert_eq!(rows[2].baseline, 0.0);
        assert_eq!(rows[2].delta(), 7.0);
    }

    #[test]
    fn lookup_uses_full_catalog_for_attributes() {
        let row = |pay_date: NaiveDate, pay_val: f64| BondDefinition {
            isin: "UA4000227045".to_string(),
            nominal: Some(1000.0),
            issue_date: Some(d(2025, 1, 8)),
            maturity_date: Some(d(2027, 6, 2)),
            bond_type: "ОВДП".to_string(),
            security_kind: "OVDP".to_string(),
            pay_period: Some(182),
            currency: "UAH".to_string(),
            pay_date,
            pay_val,
            exchange_rate: 1.0,
            month_end: month_end(pay_date),
        };
        let full = vec![row(d(2026, 6, 3), 97.5), row(d(2027, 6, 2), 1097.5)];
        let truncated = vec![full[1].clone()];
        let mut lifetime = BTreeMap::new();
        lifetime.insert("UA4000227045".to_string(), 19.5);

        let details = bond_details(&full, &truncated, &lifetime, " ua4000227045 ").unwrap();
        assert_eq!(details.remaining, vec![(d(2027, 6, 2), 1097.5)]);
        assert_eq!(details.lifetime_profitability_pct, Some(19.5));
        assert!(bond_details(&full, &truncated, &lifetime, "UA4000000000").is_none());
    }
}
