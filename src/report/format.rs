//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the engine stays free of presentation concerns
//! - output changes are localized

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{BagSummary, MonthlySeries, RecommendReason, RecommendationCandidate, ScheduleRow, BASE_CURRENCY};
use crate::report::{BondDetails, ForecastRow};

/// Bag summary: one line per active ISIN, the total, then matured holdings.
pub fn format_bag_summary(summary: &BagSummary, asof: NaiveDate) -> String {
    let mut out = String::new();

    out.push_str("=== bonds - Bag summary ===\n");
    out.push_str(&format!("As-of: {asof} | amounts in {BASE_CURRENCY}\n\n"));

    push_line(
        &mut out,
        format!(
            "{:<12} {:<10} {:<4} {:<10} {:>6} {:>14} {:>6} {:>14} {:>12} {:>12} {:>10} {:>8}",
            "isin", "type", "cur", "last_pay", "qty", "expenditure", "tax", "expected", "pnl_gross", "pnl_net", "per_bond", "pct"
        ),
    );
    push_line(
        &mut out,
        format!(
            "{:-<12} {:-<10} {:-<4} {:-<10} {:->6} {:->14} {:->6} {:->14} {:->12} {:->12} {:->10} {:->8}",
            "", "", "", "", "", "", "", "", "", "", "", ""
        ),
    );

    for r in &summary.active {
        push_line(
            &mut out,
            format!(
                "{:<12} {:<10} {:<4} {:<10} {:>6} {:>14.2} {:>6.3} {:>14.2} {:>12.2} {:>12.2} {:>10.2} {:>8.2}",
                r.bag.isin,
                truncate(&r.bond_type, 10),
                r.currency,
                fmt_date(r.last_pay_date),
                r.bag.quantity,
                r.bag.expenditure,
                r.bag.tax,
                r.expected_return,
                r.profit.profit_before_tax,
                r.profit.profit_after_tax,
                r.profit.profit_per_unit,
                r.profit.profitability_pct,
            ),
        );
    }

    match &summary.total {
        Some(t) => push_line(
            &mut out,
            format!(
                "{:<12} {:<10} {:<4} {:<10} {:>6} {:>14.2} {:>6} {:>14.2} {:>12.2} {:>12.2} {:>10} {:>8.2}",
                "Total",
                "",
                "",
                "",
                t.quantity,
                t.expenditure,
                "",
                t.expected_return,
                t.profit_before_tax,
                t.profit_after_tax,
                "",
                t.profitability_pct,
            ),
        ),
        None => out.push_str("(no active positions)\n"),
    }

    if !summary.matured.is_empty() {
        out.push_str("\nMatured:\n");
        for m in &summary.matured {
            push_line(
                &mut out,
                format!("{:<12} {:>6} {:>14.2}", m.isin, m.quantity, m.expenditure),
            );
        }
    }

    out
}

/// Forward payment schedule.
pub fn format_schedule(rows: &[ScheduleRow]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("{:<10} {:<12} {:<10} {:<4} {:>14}", "date", "isin", "type", "cur", "amount"),
    );
    push_line(
        &mut out,
        format!("{:-<10} {:-<12} {:-<10} {:-<4} {:->14}", "", "", "", "", ""),
    );

    let mut total = 0.0;
    for r in rows {
        total += r.total_pay_val;
        push_line(
            &mut out,
            format!(
                "{:<10} {:<12} {:<10} {:<4} {:>14.2}",
                r.pay_date,
                r.isin,
                truncate(&r.bond_type, 10),
                r.currency,
                r.total_pay_val
            ),
        );
    }
    push_line(&mut out, format!("{:<39} {:>14.2}", "Total", total));
    out
}

/// Month-by-month totals plus the monthly average.
pub fn format_monthly(series: &MonthlySeries) -> String {
    let mut out = String::new();
    if series.is_empty() {
        out.push_str("(no scheduled payments)\n");
        return out;
    }

    push_line(&mut out, format!("{:<10} {:>14}", "month", "amount"));
    push_line(&mut out, format!("{:-<10} {:->14}", "", ""));
    for p in series.points() {
        push_line(
            &mut out,
            format!("{:<10} {:>14.2}", p.month_end.format("%Y-%m").to_string(), p.value),
        );
    }
    if let Some(mean) = series.mean() {
        push_line(&mut out, format!("{:<10} {:>14.2}", "average", mean));
    }
    out
}

/// Recommended bonds with the month they'd fill.
pub fn format_recommendations(recs: &[RecommendationCandidate], lifetime: &BTreeMap<String, f64>) -> String {
    let mut out = String::new();
    if recs.is_empty() {
        out.push_str("No bonds land in an underloaded month.\n");
        return out;
    }

    push_line(
        &mut out,
        format!(
            "{:<12} {:<10} {:<4} {:<10} {:>12} {:>8} {:<}",
            "isin", "type", "cur", "pay_date", "pay_val", "life%", "reason"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<12} {:-<10} {:-<4} {:-<10} {:->12} {:->8} {:-<20}", "", "", "", "", "", "", ""),
    );

    for r in recs {
        let b = &r.bond;
        let reason = match r.reason {
            RecommendReason::UnderloadedMonth { baseline_value } => {
                format!("month total {baseline_value:.2} at/below average")
            }
            RecommendReason::BeyondHorizon => "after last bag payment".to_string(),
        };
        let life = lifetime
            .get(&b.isin)
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        push_line(
            &mut out,
            format!(
                "{:<12} {:<10} {:<4} {:<10} {:>12.2} {:>8} {}",
                b.isin,
                truncate(&b.bond_type, 10),
                b.currency,
                fmt_date(b.pay_date),
                b.pay_val,
                life,
                reason
            ),
        );
    }
    out
}

/// Bond lookup view.
pub fn format_bond_details(details: &BondDetails) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", details.isin));
    out.push_str(&format!("Type: {} ({})\n", details.bond_type, details.security_kind));
    out.push_str(&format!(
        "Currency: {} (rate {:.4})\n",
        details.currency, details.exchange_rate
    ));
    out.push_str(&format!("Nominal: {}\n", fmt_opt_f64(details.nominal)));
    out.push_str(&format!("Issued: {}\n", fmt_opt_date(details.issue_date)));
    out.push_str(&format!("Matures: {}\n", fmt_opt_date(details.maturity_date)));
    if let Some(days) = details.pay_period {
        out.push_str(&format!("Coupon period: {days} days\n"));
    }
    out.push_str(&format!(
        "Lifetime profitability: {}\n",
        details
            .lifetime_profitability_pct
            .map(|v| format!("{v:.2}%"))
            .unwrap_or_else(|| "-".to_string())
    ));

    if details.remaining.is_empty() {
        out.push_str("\nNo remaining payments.\n");
        return out;
    }

    out.push_str("\nRemaining payments:\n");
    for (date, value) in &details.remaining {
        push_line(&mut out, format!("{:<10} {:>12.2}", fmt_date(*date), value));
    }
    out
}

/// Forecast vs baseline, with totals.
pub fn format_forecast(rows: &[ForecastRow]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("{:<10} {:>14} {:>14} {:>14}", "month", "baseline", "forecast", "delta"),
    );
    push_line(&mut out, format!("{:-<10} {:->14} {:->14} {:->14}", "", "", "", ""));

    let (mut base_total, mut fc_total) = (0.0, 0.0);
    for r in rows {
        base_total += r.baseline;
        fc_total += r.forecast;
        push_line(
            &mut out,
            format!(
                "{:<10} {:>14.2} {:>14.2} {:>+14.2}",
                r.month_end.format("%Y-%m").to_string(),
                r.baseline,
                r.forecast,
                r.delta()
            ),
        );
    }
    push_line(
        &mut out,
        format!(
            "{:<10} {:>14.2} {:>14.2} {:>+14.2}",
            "Total",
            base_total,
            fc_total,
            fc_total - base_total
        ),
    );
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_date(d: NaiveDate) -> String {
    d.format("%d-%m-%Y").to_string()
}

fn fmt_opt_date(d: Option<NaiveDate>) -> String {
    d.map(fmt_date).unwrap_or_else(|| "-".to_string())
}

fn fmt_opt_f64(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
