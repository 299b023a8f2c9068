//! "What if I bought N more units of bond X" forecasts.

use tracing::debug;

use crate::domain::{BondDefinition, MonthlySeries};
use crate::engine::monthly::{aggregate_and_fill, aggregate_by_month};

/// Monthly contribution of buying `amounts[i]` units of `candidate_isins[i]`.
///
/// Each matching catalog row contributes its base-currency payment times `amount`.
/// Zero amounts and ISINs without catalog rows contribute nothing. Missing
/// trailing amounts count as zero; surplus amounts are ignored.
pub fn purchase_contribution(catalog: &[BondDefinition], amounts: &[u32], candidate_isins: &[String]) -> MonthlySeries {
    let entries = candidate_isins
        .iter()
        .zip(amounts.iter().copied())
        .filter(|(_, amount)| *amount > 0)
        .flat_map(|(isin, amount)| {
            catalog
                .iter()
                .filter(move |row| &row.isin == isin)
                .map(move |row| (row.month_end, row.base_pay_val() * amount as f64))
        });
    aggregate_by_month(entries)
}

/// Baseline plus the purchase contribution, re-aggregated and gap-filled.
pub fn simulate(
    catalog: &[BondDefinition],
    amounts: &[u32],
    baseline: &MonthlySeries,
    candidate_isins: &[String],
) -> MonthlySeries {
    let contribution = purchase_contribution(catalog, amounts, candidate_isins);
    debug!(
        months = contribution.len(),
        added = contribution.total(),
        "simulated purchase contribution"
    );
    aggregate_and_fill(baseline.entries().chain(contribution.entries()))
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

    fn bond(isin: &str, pay_date: NaiveDate, pay_val: f64, exchange_rate: f64) -> BondDefinition {
        BondDefinition {
            isin: isin.to_string(),
            nominal: Some(1000.0),
            issue_date: None,
            maturity_date: None,
            bond_type: "ОВДП".to_string(),
            security_kind: "OVDP".to_string(),
            pay_period: None,
            currency: "USD".to_string(),
            pay_date,
            pay_val,
            exchange_rate,
            month_end: month_end(pay_date),
        }
    }

    fn baseline() -> MonthlySeries {
        aggregate_and_fill(vec![(d(2027, 1, 31), 100.0), (d(2027, 3, 31), 50.0)])
    }

    fn isins(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn purchase_adds_converted_payment_to_its_month() {
        let catalog = vec![bond("B", d(2027, 2, 14), 20.0, 2.0)];
        let forecast = simulate(&catalog, &[5], &baseline(), &isins(&["B"]));

        assert_relative_eq!(forecast.value_at(d(2027, 2, 28)).unwrap(), 200.0);
        assert_relative_eq!(forecast.value_at(d(2027, 1, 31)).unwrap(), 100.0);
        assert_relative_eq!(forecast.total(), 350.0);
    }

    #[test]
    fn contribution_uses_base_currency_payment() {
        let catalog = vec![bond("B", d(2027, 2, 14), 20.0, 40.0), bond("B", d(2027, 8, 14), 1020.0, 40.0)];
        assert_relative_eq!(catalog[0].base_pay_val(), 800.0);

        let added = purchase_contribution(&catalog, &[3], &isins(&["B"]));
        assert_relative_eq!(added.value_at(d(2027, 2, 28)).unwrap(), 2400.0);
        assert_relative_eq!(added.value_at(d(2027, 8, 31)).unwrap(), 122_400.0);
    }

    #[test]
    fn zero_amounts_reproduce_the_baseline() {
        let catalog = vec![bond("A", d(2028, 6, 1), 20.0, 2.0), bond("B", d(2026, 6, 1), 20.0, 2.0)];
        let forecast = simulate(&catalog, &[0, 0], &baseline(), &isins(&["A", "B"]));
        assert_eq!(forecast, aggregate_and_fill(baseline().entries()));
    }

    #[test]
    fn unknown_isins_and_short_amounts_contribute_nothing() {
        let catalog = vec![bond("A", d(2027, 3, 1), 10.0, 1.0)];
        let forecast = simulate(&catalog, &[3], &baseline(), &isins(&["MATURED", "A"]));
        assert_eq!(forecast, baseline());
    }

    #[test]
    fn purchases_beyond_baseline_extend_the_series() {
        let catalog = vec![bond("A", d(2027, 6, 10), 10.0, 1.0)];
        let forecast = simulate(&catalog, &[2], &baseline(), &isins(&["A"]));
        assert_eq!(forecast.last_month(), Some(d(2027, 6, 30)));
        assert_eq!(forecast.len(), 6);
        assert_relative_eq!(forecast.value_at(d(2027, 5, 31)).unwrap(), 0.0);
        assert_relative_eq!(forecast.value_at(d(2027, 6, 30)).unwrap(), 20.0);
    }

    #[test]
    fn empty_baseline_yields_contribution_only() {
        let catalog = vec![bond("A", d(2027, 6, 10), 10.0, 1.0)];
        let forecast = simulate(&catalog, &[1], &MonthlySeries::default(), &isins(&["A"]));
        assert_eq!(forecast.entries().collect::<Vec<_>>(), vec![(d(2027, 6, 30), 10.0)]);
    }
}
