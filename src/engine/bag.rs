//! Bag processing: join held positions with the catalog, split matured
//! holdings off, and derive the forward schedule and the bag summary.

use std::collections::BTreeMap;

use crate::domain::{
    BagRow, BagSummary, BondDefinition, HeldPosition, MonthlySeries, PositionPayment, PositionReport, ScheduleRow,
};
use crate::engine::monthly::aggregate_and_fill;
use crate::engine::profit::{position_profitability, total_row};
use crate::engine::round_cents;
use crate::error::EngineError;

/// Left-join bag rows to catalog rows on ISIN.
///
/// Every catalog payment of a held bond yields one position row. A bag row
/// with no catalog match is kept with `payment: None`.
pub fn merge_positions(bag: &[BagRow], catalog: &[BondDefinition]) -> Vec<HeldPosition> {
    let mut by_isin: BTreeMap<&str, Vec<&BondDefinition>> = BTreeMap::new();
    for row in catalog {
        by_isin.entry(row.isin.as_str()).or_default().push(row);
    }

    let mut out = Vec::new();
    for held in bag {
        match by_isin.get(held.isin.as_str()) {
            Some(rows) => out.extend(rows.iter().map(|bond| HeldPosition {
                bag: held.clone(),
                payment: Some(PositionPayment {
                    pay_date: bond.pay_date,
                    pay_val: bond.pay_val,
                    month_end: bond.month_end,
                    bond_type: bond.bond_type.clone(),
                    currency: bond.currency.clone(),
                    exchange_rate: bond.exchange_rate,
                    total_pay_val: bond.pay_val * held.quantity as f64 * bond.exchange_rate,
                }),
            })),
            None => out.push(HeldPosition {
                bag: held.clone(),
                payment: None,
            }),
        }
    }
    out
}

/// Split into `(active, matured)`; a position is matured iff it has no payment.
pub fn split_by_maturity(positions: &[HeldPosition]) -> (Vec<&HeldPosition>, Vec<&HeldPosition>) {
    positions.iter().partition(|p| !p.is_matured())
}

/// Forward payment schedule of the active cohort, sorted by date.
pub fn build_schedule(positions: &[HeldPosition]) -> Vec<ScheduleRow> {
    let (active, _) = split_by_maturity(positions);

    let mut rows: Vec<(&HeldPosition, &PositionPayment)> = active
        .into_iter()
        .filter_map(|p| p.payment.as_ref().map(|pay| (p, pay)))
        .collect();
    rows.sort_by(|a, b| a.1.pay_date.cmp(&b.1.pay_date).then_with(|| a.0.isin().cmp(b.0.isin())));

    rows.into_iter()
        .map(|(position, pay)| ScheduleRow {
            isin: position.bag.isin.clone(),
            bond_type: pay.bond_type.clone(),
            currency: pay.currency.clone(),
            pay_date: pay.pay_date.format("%d-%m-%Y").to_string(),
            total_pay_val: round_cents(pay.pay_val * position.bag.quantity as f64 * pay.exchange_rate),
        })
        .collect()
}

/// Gap-filled monthly totals of the active cohort (the bag baseline).
pub fn monthly_payments(positions: &[HeldPosition]) -> MonthlySeries {
    aggregate_and_fill(
        positions
            .iter()
            .filter_map(|p| p.payment.as_ref())
            .map(|pay| (pay.month_end, pay.total_pay_val)),
    )
}

/// One report per active ISIN, the total row, and the matured holdings.
pub fn summarize_bag(positions: &[HeldPosition]) -> Result<BagSummary, EngineError> {
    let (active, matured) = split_by_maturity(positions);

    let mut grouped: BTreeMap<&str, Vec<&HeldPosition>> = BTreeMap::new();
    for p in active {
        grouped.entry(p.isin()).or_default().push(p);
    }

    let mut reports = Vec::with_capacity(grouped.len());
    for rows in grouped.into_values() {
        let Some(last) = rows
            .iter()
            .filter_map(|p| p.payment.as_ref().map(|pay| (*p, pay)))
            .max_by_key(|(_, pay)| pay.pay_date)
        else {
            continue;
        };

        let expected_return: f64 = rows
            .iter()
            .filter_map(|p| p.payment.as_ref())
            .map(|pay| pay.total_pay_val)
            .sum();
        let profit = position_profitability(expected_return, &last.0.bag)?;

        reports.push(PositionReport {
            bag: last.0.bag.clone(),
            bond_type: last.1.bond_type.clone(),
            currency: last.1.currency.clone(),
            last_pay_date: last.1.pay_date,
            expected_return,
            profit,
        });
    }
    reports.sort_by(|a, b| {
        a.last_pay_date
            .cmp(&b.last_pay_date)
            .then_with(|| a.bag.isin.cmp(&b.bag.isin))
    });

    let mut matured_rows: Vec<BagRow> = Vec::new();
    for p in matured {
        if !matured_rows.iter().any(|r| r.isin == p.bag.isin) {
            matured_rows.push(p.bag.clone());
        }
    }

    Ok(BagSummary {
        total: total_row(&reports),
        active: reports,
        matured: matured_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::monthly::month_end;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bond(isin: &str, pay_date: NaiveDate, pay_val: f64, rate: f64) -> BondDefinition {
        BondDefinition {
            isin: isin.to_string(),
            nominal: Some(1000.0),
            issue_date: None,
            maturity_date: None,
            bond_type: "ОВДП".to_string(),
            security_kind: "OVDP".to_string(),
            pay_period: Some(182),
            currency: if rate == 1.0 { "UAH" } else { "USD" }.to_string(),
            pay_date,
            pay_val,
            exchange_rate: rate,
            month_end: month_end(pay_date),
        }
    }

    fn held(isin: &str, quantity: u64, expenditure: f64) -> BagRow {
        BagRow {
            isin: isin.to_string(),
            quantity,
            expenditure,
            tax: 0.195,
        }
    }

    fn catalog() -> Vec<BondDefinition> {
        vec![
            bond("UA4000000001", d(2026, 11, 4), 50.0, 1.0),
            bond("UA4000000001", d(2027, 5, 5), 1050.0, 1.0),
            bond("UA4000000002", d(2027, 2, 1), 1020.0, 40.0),
        ]
    }

    #[test]
    fn merge_keeps_unknown_isins_with_null_payment() {
        let bag = vec![held("UA4000000001", 3, 3000.0), held("UA4000999999", 5, 5000.0)];
        let positions = merge_positions(&bag, &catalog());

        assert_eq!(positions.len(), 3);
        let total: f64 = positions.iter().filter_map(|p| p.payment.as_ref()).map(|p| p.total_pay_val).sum();
        assert_relative_eq!(total, 3.0 * 1100.0);

        let (active, matured) = split_by_maturity(&positions);
        assert_eq!(active.len(), 2);
        assert_eq!(matured.len(), 1);
        assert_eq!(matured[0].isin(), "UA4000999999");
    }

    #[test]
    fn schedule_is_sorted_converted_and_rounded() {
        let bag = vec![held("UA4000000002", 3, 120_000.0), held("UA4000000001", 1, 1000.0)];
        let mut cat = catalog();
        cat[2].exchange_rate = 41.123456;
        let schedule = build_schedule(&merge_positions(&bag, &cat));

        let dates: Vec<&str> = schedule.iter().map(|r| r.pay_date.as_str()).collect();
        assert_eq!(dates, vec!["04-11-2026", "01-02-2027", "05-05-2027"]);
        assert_relative_eq!(schedule[1].total_pay_val, 125_837.78, epsilon = 1e-9);
        assert_eq!(schedule[1].currency, "USD");
    }

    #[test]
    fn summary_groups_by_isin_and_lists_matured() {
        let bag = vec![
            held("UA4000000001", 2, 2000.0),
            held("UA4000000002", 1, 40_000.0),
            held("UA4000999999", 5, 5000.0),
        ];
        let summary = summarize_bag(&merge_positions(&bag, &catalog())).unwrap();

        assert_eq!(summary.active.len(), 2);
        assert_eq!(summary.active[0].bag.isin, "UA4000000002");
        assert_eq!(summary.active[1].last_pay_date, d(2027, 5, 5));
        assert_relative_eq!(summary.active[1].expected_return, 2200.0);
        assert_relative_eq!(summary.active[0].expected_return, 40_800.0);
        assert_eq!(summary.matured.len(), 1);

        let total = summary.total.unwrap();
        assert_eq!(total.quantity, 3);
        assert_relative_eq!(total.expected_return, 43_000.0);
    }

    #[test]
    fn baseline_spans_active_payments_only() {
        let bag = vec![held("UA4000000001", 1, 1000.0), held("UA4000999999", 5, 5000.0)];
        let monthly = monthly_payments(&merge_positions(&bag, &catalog()));

        assert_eq!(monthly.first_month(), Some(d(2026, 11, 30)));
        assert_eq!(monthly.last_month(), Some(d(2027, 5, 31)));
        assert_eq!(monthly.len(), 7);
        assert_relative_eq!(monthly.total(), 1100.0);
    }

    #[test]
    fn empty_bag_is_a_valid_empty_result() {
        let summary = summarize_bag(&[]).unwrap();
        assert!(summary.active.is_empty());
        assert!(summary.total.is_none());
        assert!(monthly_payments(&[]).is_empty());
        assert!(build_schedule(&[]).is_empty());
    }
}
