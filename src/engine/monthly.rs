//! Month-end bucketing and gap filling.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::domain::{MonthlyPoint, MonthlySeries};

/// Round a date forward to the last calendar day of its month.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Months since year 0, for plotting months on a linear axis.
pub fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// Inverse of [`month_index`], as a month end.
pub fn month_from_index(index: i32) -> Option<NaiveDate> {
    let year = index.div_euclid(12);
    let month0 = index.rem_euclid(12) as u32;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).map(month_end)
}

/// Month end following the month of `month_end`.
fn next_month_end(month_end_date: NaiveDate) -> Option<NaiveDate> {
    month_end_date.succ_opt().map(month_end)
}

/// Sum `(date, value)` pairs per month.
///
/// Dates are bucketed by [`month_end`], so feeding an already aggregated
/// series back in is a no-op. No rounding is applied.
pub fn aggregate_by_month<I>(entries: I) -> MonthlySeries
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, value) in entries {
        *buckets.entry(month_end(date)).or_insert(0.0) += value;
    }

    MonthlySeries::from_points(
        buckets
            .into_iter()
            .map(|(month_end, value)| MonthlyPoint { month_end, value })
            .collect(),
    )
}

/// Reindex to every month between the first and last observed month, zero-filling.
pub fn fill_gaps(series: &MonthlySeries) -> MonthlySeries {
    let (Some(first), Some(last)) = (series.first_month(), series.last_month()) else {
        return MonthlySeries::default();
    };

    let mut points = Vec::new();
    let mut cursor = Some(first);
    while let Some(month) = cursor {
        if month > last {
            break;
        }
        points.push(MonthlyPoint {
            month_end: month,
            value: series.value_at(month).unwrap_or(0.0),
        });
        cursor = next_month_end(month);
    }

    MonthlySeries::from_points(points)
}

/// [`aggregate_by_month`] followed by [`fill_gaps`].
pub fn aggregate_and_fill<I>(entries: I) -> MonthlySeries
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    fill_gaps(&aggregate_by_month(entries))
}
