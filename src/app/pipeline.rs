//! Shared bag pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! fetch/read snapshot -> normalize catalog -> load bag -> merge -> summary,
//! schedule, monthly baseline -> recommendations
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::data::{AuctionClient, NbuClient, example_bag};
use crate::domain::{
    AuctionCandidateSet, BagRow, BagSource, BagSummary, BondDefinition, HeldPosition, MarketSnapshot, MonthlySeries,
    Purchase, RecommendationCandidate, RunConfig, ScheduleRow,
};
use crate::engine::{bag, catalog, profit, recommend, simulate};
use crate::error::AppError;
use crate::io::{build_snapshot, load_bag as load_bag_file, read_snapshot_json};
use crate::report::{BondDetails, bond_details};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub asof: NaiveDate,
    pub snapshot: MarketSnapshot,
    /// Untruncated catalog (lifetime figures, bond lookup).
    pub full_catalog: Vec<BondDefinition>,
    /// Catalog with payments before `asof` dropped.
    pub catalog: Vec<BondDefinition>,
    pub lifetime: BTreeMap<String, f64>,
    pub bag: Vec<BagRow>,
    pub positions: Vec<HeldPosition>,
    pub summary: BagSummary,
    pub schedule: Vec<ScheduleRow>,
    pub baseline: MonthlySeries,
    pub recommendations: Vec<RecommendationCandidate>,
}

impl RunOutput {
    /// Bonds offered at the auction.
    pub fn auction(&self) -> &AuctionCandidateSet {
        &self.snapshot.auction
    }

    /// Baseline plus purchases given as amounts aligned with the auction ISINs.
    pub fn simulate_auction(&self, amounts: &[u32]) -> MonthlySeries {
        simulate::simulate(&self.catalog, amounts, &self.baseline, &self.snapshot.auction.isins)
    }

    /// Baseline plus arbitrary purchases.
    pub fn simulate_purchases(&self, purchases: &[Purchase]) -> MonthlySeries {
        for p in purchases {
            if !self.catalog.iter().any(|row| row.isin == p.isin) {
                warn!(isin = %p.isin, "purchase has no remaining payments; ignored");
            }
        }
        let isins: Vec<String> = purchases.iter().map(|p| p.isin.clone()).collect();
        let amounts: Vec<u32> = purchases.iter().map(|p| p.amount).collect();
        simulate::simulate(&self.catalog, &amounts, &self.baseline, &isins)
    }

    /// Recommendations limited to the bonds offered at the auction.
    pub fn auction_recommendations(&self) -> Vec<RecommendationCandidate> {
        recommend::recommend_for_auction(&self.catalog, &self.baseline, &self.snapshot.auction)
    }

    /// ISINs of every recommended bond.
    pub fn recommended_isins(&self) -> Vec<&str> {
        self.recommendations.iter().map(|r| r.bond.isin.as_str()).collect()
    }

    pub fn is_recommended(&self, isin: &str) -> bool {
        self.recommendations.iter().any(|r| r.bond.isin == isin)
    }

    pub fn details(&self, isin: &str) -> Option<BondDetails> {
        bond_details(&self.full_catalog, &self.catalog, &self.lifetime, isin)
    }
}

/// Fetch catalog, rates and auction ISINs from the configured sources.
///
/// The auction announcement is optional: when it cannot be fetched the run
/// continues with an empty candidate set.
pub fn fetch_snapshot(fetched_on: NaiveDate) -> Result<MarketSnapshot, AppError> {
    let nbu = NbuClient::from_env();

    let bonds = nbu.fetch_bonds()?;
    let rates = nbu.fetch_rates()?;
    let auction = match AuctionClient::new(nbu.config().auction_url.clone()).fetch() {
        Ok(set) => set,
        Err(err) => {
            warn!(error = %err, "auction announcement unavailable; continuing without candidates");
            AuctionCandidateSet::default()
        }
    };

    Ok(build_snapshot(fetched_on, bonds, rates, auction))
}

/// Read the configured snapshot file, or fetch a fresh one.
pub fn load_snapshot(config: &RunConfig) -> Result<MarketSnapshot, AppError> {
    match &config.snapshot_path {
        Some(path) => {
            let snapshot = read_snapshot_json(path)?;
            info!(path = %path.display(), fetched_on = %snapshot.fetched_on, "using snapshot");
            Ok(snapshot)
        }
        None => fetch_snapshot(config.asof_date),
    }
}

pub fn load_bag(source: &BagSource) -> Result<Vec<BagRow>, AppError> {
    match source {
        BagSource::File(path) => load_bag_file(path),
        BagSource::Example => example_bag(),
    }
}

/// Execute the full pipeline and return the computed outputs.
pub fn run(config: &RunConfig) -> Result<RunOutput, AppError> {
    // Load the bag first so a bad file fails before any network access.
    let bag = load_bag(&config.bag)?;
    let snapshot = load_snapshot(config)?;
    run_with(snapshot, bag, config.asof_date)
}

/// Execute the pipeline against already loaded inputs.
pub fn run_with(snapshot: MarketSnapshot, bag: Vec<BagRow>, asof: NaiveDate) -> Result<RunOutput, AppError> {
    let rates = snapshot.exchange_rates();
    let full_catalog = catalog::flatten_catalog(&snapshot.bonds, &rates)?;
    let lifetime = profit::bond_lifetime_profitability(&full_catalog);
    let catalog = catalog::truncate_past(full_catalog.clone(), asof);

    let positions = bag::merge_positions(&bag, &catalog);
    let summary = bag::summarize_bag(&positions)?;
    let schedule = bag::build_schedule(&positions);
    let baseline = bag::monthly_payments(&positions);
    let recommendations = recommend::recommend(&catalog, &baseline);

    info!(
        bonds = catalog.len(),
        active = summary.active.len(),
        matured = summary.matured.len(),
        recommended = recommendations.len(),
        "pipeline complete"
    );

    Ok(RunOutput {
        asof,
        snapshot,
        full_catalog,
        catalog,
        lifetime,
        bag,
        positions,
        summary,
        schedule,
        baseline,
        recommendations,
    })
}
