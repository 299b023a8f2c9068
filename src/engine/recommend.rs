//! Recommend bonds whose biggest payment lands in an under-paid month.

use std::collections::BTreeMap;

use crate::domain::{AuctionCandidateSet, BondDefinition, MonthlySeries, RecommendReason, RecommendationCandidate};
use crate::engine::monthly::month_end;

/// The most valuable remaining payment of every bond.
///
/// Ties on value go to the earliest payment date.
pub fn representative_payments(catalog: &[BondDefinition]) -> Vec<&BondDefinition> {
    let mut best: BTreeMap<&str, &BondDefinition> = BTreeMap::new();
    for row in catalog {
        best.entry(row.isin.as_str())
            .and_modify(|cur| {
                if row.pay_val > cur.pay_val || (row.pay_val == cur.pay_val && row.pay_date < cur.pay_date) {
                    *cur = row;
                }
            })
            .or_insert(row);
    }
    best.into_values().collect()
}

/// Select bonds that would flatten the bag's monthly payment curve.
///
/// A bond is kept when the bag's baseline for the month of its representative
/// payment is at or below the baseline average, or when that month lies after
/// the last baseline month. Months before the baseline starts are not judged.
/// With an empty baseline every bond is beyond the horizon.
pub fn recommend(catalog: &[BondDefinition], baseline: &MonthlySeries) -> Vec<RecommendationCandidate> {
    let average = baseline.mean();
    let last_month = baseline.last_month();

    let mut out: Vec<RecommendationCandidate> = representative_payments(catalog)
        .into_iter()
        .filter_map(|bond| {
            let month = month_end(bond.pay_date);
            let reason = match (last_month, average) {
                (Some(last), Some(avg)) if month <= last => {
                    let baseline_value = baseline.value_at(month)?;
                    if baseline_value > avg {
                        return None;
                    }
                    RecommendReason::UnderloadedMonth { baseline_value }
                }
                _ => RecommendReason::BeyondHorizon,
            };
            Some(RecommendationCandidate {
                bond: BondDefinition {
                    month_end: month,
                    ..bond.clone()
                },
                reason,
            })
        })
        .collect();

    out.sort_by(|a, b| a.bond.pay_date.cmp(&b.bond.pay_date).then_with(|| a.bond.isin.cmp(&b.bond.isin)));
    out
}

/// [`recommend`] restricted to the bonds offered at the auction.
pub fn recommend_for_auction(
    catalog: &[BondDefinition],
    baseline: &MonthlySeries,
    auction: &AuctionCandidateSet,
) -> Vec<RecommendationCandidate> {
    let offered: Vec<BondDefinition> = catalog
        .iter()
        .filter(|row| auction.contains(&row.isin))
        .cloned()
        .collect();
    recommend(&offered, baseline)
}
