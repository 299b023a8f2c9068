//! End-to-end checks of the bag pipeline against a hand-built snapshot.

use approx::assert_relative_eq;
use chrono::NaiveDate;

use bondstool::app::pipeline::run_with;
use bondstool::domain::{AuctionCandidateSet, BagRow, Purchase, RawBond, RawPayment, RawRate, RecommendReason};
use bondstool::engine::monthly::aggregate_and_fill;
use bondstool::engine::profit::position_profitability;
use bondstool::io::{build_snapshot, load_bag};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bond(isin: &str, currency: &str, payments: &[(NaiveDate, f64)]) -> RawBond {
    RawBond {
        isin: isin.to_string(),
        nominal: Some(1000.0),
        issue_date: Some(d(2026, 1, 14)),
        maturity_date: payments.last().map(|p| p.0),
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

fn held(isin: &str, quantity: u64) -> BagRow {
    BagRow {
        isin: isin.to_string(),
        quantity,
        expenditure: 1000.0 * quantity as f64,
        tax: 0.195,
    }
}

fn usd_at(rate: f64) -> Vec<RawRate> {
    vec![RawRate {
        r030: 840,
        cc: "USD".to_string(),
        rate,
        exchangedate: Some("17.10.2026".to_string()),
    }]
}

#[test]
fn gap_months_are_filled_with_zero() {
    let snapshot = build_snapshot(
        d(2026, 10, 17),
        vec![bond("UA4000000010", "UAH", &[(d(2027, 1, 13), 100.0), (d(2027, 3, 10), 100.0)])],
        Vec::new(),
        AuctionCandidateSet::default(),
    );
    let run = run_with(snapshot, vec![held("UA4000000010", 1)], d(2026, 10, 17)).unwrap();

    let values: Vec<f64> = run.baseline.points().iter().map(|p| p.value).collect();
    assert_eq!(values, vec![100.0, 0.0, 100.0]);
    assert_eq!(run.baseline.first_month(), Some(d(2027, 1, 31)));
    assert_eq!(run.baseline.last_month(), Some(d(2027, 3, 31)));
}

#[test]
fn position_profit_follows_expected_return() {
    let bag = BagRow {
        isin: "UA4000000010".to_string(),
        quantity: 10,
        expenditure: 900.0,
        tax: 0.1,
    };
    let profit = position_profitability(1000.0, &bag).unwrap();

    assert_relative_eq!(profit.profit_before_tax, 100.0);
    assert_relative_eq!(profit.profit_after_tax, 90.0);
    assert_relative_eq!(profit.profit_per_unit, 9.0);
    assert_relative_eq!(profit.profitability_pct, 10.0, epsilon = 1e-9);
}

#[test]
fn simulated_purchase_adds_converted_payments() {
    let snapshot = build_snapshot(
        d(2026, 10, 17),
        vec![
            bond("UA4000000010", "UAH", &[(d(2027, 1, 13), 100.0), (d(2027, 3, 10), 100.0)]),
            bond("UA4000000020", "USD", &[(d(2027, 3, 24), 20.0)]),
        ],
        usd_at(2.0),
        AuctionCandidateSet::new(vec!["UA4000000020".to_string()]),
    );
    let run = run_with(snapshot, vec![held("UA4000000010", 1)], d(2026, 10, 17)).unwrap();

    let forecast = run.simulate_auction(&[5]);
    assert_eq!(forecast.value_at(d(2027, 3, 31)), Some(300.0));
    assert_eq!(forecast.value_at(d(2027, 2, 28)), Some(0.0));

    let same = run.simulate_purchases(&[Purchase {
        isin: "UA4000000020".to_string(),
        amount: 5,
    }]);
    assert_eq!(forecast, same);

    // Nothing bought: the forecast is the baseline.
    assert_eq!(run.simulate_auction(&[0]), run.baseline);
}

#[test]
fn recommendations_fill_quiet_months_and_extend_the_horizon() {
    let snapshot = build_snapshot(
        d(2026, 10, 17),
        vec![
            // The bag: 40 / 60 / 50, average 50.
            bond("UA4000000010", "UAH", &[(d(2027, 1, 6), 40.0), (d(2027, 2, 3), 60.0), (d(2027, 3, 3), 50.0)]),
            bond("UA4000000030", "UAH", &[(d(2027, 1, 20), 1080.0)]),
            bond("UA4000000040", "UAH", &[(d(2027, 2, 17), 1080.0)]),
            bond("UA4000000050", "UAH", &[(d(2027, 2, 17), 30.0), (d(2027, 6, 16), 1030.0)]),
        ],
        Vec::new(),
        AuctionCandidateSet::default(),
    );
    let run = run_with(snapshot, vec![held("UA4000000010", 1)], d(2026, 10, 17)).unwrap();
    assert_eq!(run.baseline.mean(), Some(50.0));

    let isins = run.recommended_isins();
    assert_eq!(isins, vec!["UA4000000030", "UA4000000050"]);

    assert_eq!(
        run.recommendations[0].reason,
        RecommendReason::UnderloadedMonth { baseline_value: 40.0 }
    );
    assert_eq!(run.recommendations[1].reason, RecommendReason::BeyondHorizon);
}

#[test]
fn aggregate_and_fill_is_ordered_and_contiguous() {
    let series = aggregate_and_fill(vec![
        (d(2027, 4, 2), 5.0),
        (d(2027, 1, 30), 1.0),
        (d(2027, 1, 2), 2.0),
    ]);
    let months: Vec<NaiveDate> = series.points().iter().map(|p| p.month_end).collect();
    assert_eq!(months, vec![d(2027, 1, 31), d(2027, 2, 28), d(2027, 3, 31), d(2027, 4, 30)]);
    assert_eq!(series.value_at(d(2027, 1, 31)), Some(3.0));
}

#[test]
fn invalid_bag_file_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bag.csv");
    std::fs::write(&path, "ISIN,quantity\nUA4000000010,3\n").unwrap();

    let err = load_bag(&path).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("missing"));
}
