//! Catalog normalization: nested payment lists → one row per (ISIN, pay date).
//!
//! The steps are kept separate so callers can compute lifetime figures on the
//! full table before past payments are truncated.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{BondDefinition, ExchangeRates, RawBond};
use crate::engine::monthly::month_end;
use crate::error::EngineError;

/// Security kinds that are never offered at the state auction.
pub const EXCLUDED_KINDS: [&str; 1] = ["OZDP"];

/// Flatten, sum same-date payments, attach exchange rates and month ends.
///
/// Output is ordered by ISIN, then pay date. A bond listed twice keeps its
/// first occurrence.
pub fn flatten_catalog(raw: &[RawBond], rates: &ExchangeRates) -> Result<Vec<BondDefinition>, EngineError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut rows = Vec::new();

    for bond in raw {
        if EXCLUDED_KINDS
            .iter()
            .any(|kind| bond.security_kind.trim().eq_ignore_ascii_case(kind))
        {
            continue;
        }
        if !seen.insert(bond.isin.as_str()) {
            warn!(isin = %bond.isin, "duplicate catalog entry ignored");
            continue;
        }
        if bond.payments.is_empty() {
            continue;
        }

        let exchange_rate = rates.rate(&bond.currency).ok_or_else(|| EngineError::UnknownCurrency {
            isin: bond.isin.clone(),
            currency: bond.currency.clone(),
        })?;

        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for p in &bond.payments {
            *by_date.entry(p.pay_date).or_insert(0.0) += p.pay_val;
        }

        for (pay_date, pay_val) in by_date {
            rows.push(BondDefinition {
                isin: bond.isin.clone(),
                nominal: bond.nominal,
                issue_date: bond.issue_date,
                maturity_date: bond.maturity_date,
                bond_type: bond.bond_type.clone(),
                security_kind: bond.security_kind.clone(),
                pay_period: bond.pay_period,
                currency: bond.currency.trim().to_ascii_uppercase(),
                pay_date,
                pay_val,
                exchange_rate,
                month_end: month_end(pay_date),
            });
        }
    }

    rows.sort_by(|a, b| a.isin.cmp(&b.isin).then(a.pay_date.cmp(&b.pay_date)));
    Ok(rows)
}

/// Drop every row paying strictly before `asof`.
pub fn truncate_past(rows: Vec<BondDefinition>, asof: NaiveDate) -> Vec<BondDefinition> {
    let before = rows.len();
    let kept: Vec<BondDefinition> = rows.into_iter().filter(|r| r.pay_date >= asof).collect();
    debug!(dropped = before - kept.len(), kept = kept.len(), %asof, "truncated past payments");
    kept
}

/// Full normalization: [`flatten_catalog`] then [`truncate_past`].
pub fn normalize_catalog(
    raw: &[RawBond],
    rates: &ExchangeRates,
    asof: NaiveDate,
) -> Result<Vec<BondDefinition>, EngineError> {
    Ok(truncate_past(flatten_catalog(raw, rates)?, asof))
}

/// Rows of a single bond.
pub fn rows_for_isin<'a>(catalog: &'a [BondDefinition], isin: &'a str) -> impl Iterator<Item = &'a BondDefinition> + 'a {
    catalog.iter().filter(move |r| r.isin == isin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawPayment;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bond(isin: &str, currency: &str, payments: &[(NaiveDate, f64)]) -> RawBond {
        RawBond {
            isin: isin.to_string(),
            nominal: Some(1000.0),
            issue_date: Some(d(2024, 1, 10)),
            maturity_date: payments.iter().map(|(p, _)| *p).max(),
            bond_type: "ОВДП".to_string(),
            security_kind: "OVDP".to_string(),
            currency: currency.to_string(),
            pay_period: Some(182),
            payments: payments
                .iter()
                .map(|&(pay_date, pay_val)| RawPayment { pay_date, pay_val })
                .collect(),
        }
    }

    #[test]
    fn same_date_payments_are_summed_and_rate_attached() {
        let raw = vec![bond(
            "UA4000000001",
            "usd",
            &[(d(2026, 11, 4), 20.0), (d(2026, 11, 4), 1000.0), (d(2026, 5, 6), 20.0)],
        )];
        let rates = ExchangeRates::base_only().with_rate("USD", 41.0);

        let rows = flatten_catalog(&raw, &rates).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pay_date, d(2026, 5, 6));
        assert_eq!(rows[1].pay_val, 1020.0);
        assert_eq!(rows[1].exchange_rate, 41.0);
        assert_eq!(rows[1].month_end, d(2026, 11, 30));
        assert_eq!(rows[1].currency, "USD");
    }

    #[test]
    fn truncation_never_returns_past_rows() {
        let raw = vec![
            bond("UA4000000001", "UAH", &[(d(2026, 1, 5), 50.0), (d(2026, 10, 17), 50.0), (d(2027, 4, 1), 1050.0)]),
            bond("UA4000000002", "UAH", &[(d(2025, 6, 1), 1050.0)]),
        ];
        let asof = d(2026, 10, 17);
        let rows = normalize_catalog(&raw, &ExchangeRates::base_only(), asof).unwrap();

        assert!(rows.iter().all(|r| r.pay_date >= asof));
        assert_eq!(rows.len(), 2);
        // Fully matured bond disappears.
        assert!(rows.iter().all(|r| r.isin == "UA4000000001"));
    }

    #[test]
    fn unknown_currency_is_an_error() {
        let raw = vec![bond("UA4000000003", "GBP", &[(d(2027, 1, 1), 10.0)])];
        let err = flatten_catalog(&raw, &ExchangeRates::base_only()).unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownCurrency {
                isin: "UA4000000003".to_string(),
                currency: "GBP".to_string()
            }
        );
    }

    #[test]
    fn local_bonds_and_duplicates_are_skipped() {
        let mut local = bond("UA4000000004", "UAH", &[(d(2027, 1, 1), 10.0)]);
        local.security_kind = "OZDP".to_string();
        let first = bond("UA4000000005", "UAH", &[(d(2027, 1, 1), 10.0)]);
        let dup = bond("UA4000000005", "UAH", &[(d(2027, 1, 1), 99.0)]);

        let rows = flatten_catalog(&[local, first, dup], &ExchangeRates::base_only()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pay_val, 10.0);
    }
}
