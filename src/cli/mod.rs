//! Command-line parsing for the bond bag planner.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the payment engine.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::Purchase;

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "bonds", version, about = "Government bond bag planner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the catalog, exchange rates and auction ISINs into a snapshot JSON.
    Fetch(FetchArgs),
    /// Print the bag summary: active positions, total and matured holdings.
    Bag(CommonArgs),
    /// Print the forward payment schedule of the bag.
    Schedule(CommonArgs),
    /// Print monthly payment totals and optionally plot them.
    Monthly(MonthlyArgs),
    /// Print bonds that would flatten the bag's monthly payments.
    Recommend(RecommendArgs),
    /// Forecast monthly payments after hypothetical purchases.
    Simulate(SimulateArgs),
    /// Look up one bond.
    Bond(BondArgs),
    /// Write the bag summary and schedule as CSV sheets.
    Export(ExportArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same pipeline as the other commands, but renders results
    /// in a terminal UI using Ratatui.
    Tui(TuiArgs),
}

/// Options shared by every command that reads market data.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Read sources from a snapshot JSON instead of fetching them.
    #[arg(long, value_name = "JSON")]
    pub snapshot: Option<PathBuf>,

    /// Drop payments before this date (YYYY-MM-DD, default: today).
    #[arg(long, value_name = "DATE")]
    pub asof: Option<NaiveDate>,

    /// Verbose logging (debug level).
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Options shared by commands that work on a bag.
#[derive(Debug, Args, Clone, Default)]
pub struct CommonArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Bag CSV file. Without it (and without `--example`) a picker is shown.
    #[arg(long, value_name = "CSV", conflicts_with = "example")]
    pub bag: Option<PathBuf>,

    /// Use the bundled example bag.
    #[arg(long)]
    pub example: bool,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Snapshot JSON to write.
    #[arg(long, value_name = "JSON", default_value = "snapshot.json")]
    pub out: PathBuf,

    /// Verbose logging (debug level).
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Options for terminal plots.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,
}

#[derive(Debug, Args)]
pub struct MonthlyArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub plot: PlotArgs,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Only consider bonds offered at the upcoming auction.
    #[arg(long)]
    pub auction_only: bool,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Purchase to simulate; repeat for several bonds.
    #[arg(long = "buy", value_name = "ISIN=AMOUNT", required = true)]
    pub buy: Vec<Purchase>,

    #[command(flatten)]
    pub plot: PlotArgs,
}

#[derive(Debug, Args)]
pub struct BondArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// ISIN to look up.
    pub isin: String,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Directory to write `Bag.csv` and `Schedule.csv` into.
    #[arg(long, value_name = "DIR", default_value = "export")]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct TuiArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Directory the `e` key exports into.
    #[arg(long, value_name = "DIR", default_value = "export")]
    pub export_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_collects_repeated_purchases() {
        let cli = Cli::try_parse_from([
            "bonds",
            "simulate",
            "--example",
            "--buy",
            "UA4000227045=400",
            "--buy",
            "ua4000231153=200",
            "--no-plot",
        ])
        .unwrap();

        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert!(args.common.example);
        assert!(args.plot.no_plot);
        assert_eq!(args.buy.len(), 2);
        assert_eq!(args.buy[1].isin, "UA4000231153");
        assert_eq!(args.buy[1].amount, 200);
    }

    #[test]
    fn bad_purchase_is_a_parse_error() {
        let res = Cli::try_parse_from(["bonds", "simulate", "--buy", "UA4000227045"]);
        assert!(res.is_err());
        assert!(Cli::try_parse_from(["bonds", "simulate", "--example"]).is_err());
    }

    #[test]
    fn source_flags_parse_dates_and_snapshot() {
        let cli = Cli::try_parse_from([
            "bonds",
            "bag",
            "--bag",
            "bag.csv",
            "--snapshot",
            "snap.json",
            "--asof",
            "2026-10-17",
        ])
        .unwrap();

        let Command::Bag(args) = cli.command else {
            panic!("expected bag");
        };
        assert_eq!(args.bag, Some(PathBuf::from("bag.csv")));
        assert_eq!(args.source.snapshot, Some(PathBuf::from("snap.json")));
        assert_eq!(args.source.asof, NaiveDate::from_ymd_opt(2026, 10, 17));
    }

    #[test]
    fn bag_and_example_conflict() {
        assert!(Cli::try_parse_from(["bonds", "bag", "--bag", "b.csv", "--example"]).is_err());
    }

    #[test]
    fn bond_lookup_needs_no_bag() {
        let cli = Cli::try_parse_from(["bonds", "bond", "UA4000227045"]).unwrap();
        let Command::Bond(args) = cli.command else {
            panic!("expected bond");
        };
        assert_eq!(args.isin, "UA4000227045");
    }
}
