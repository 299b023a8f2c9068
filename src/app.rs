//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - resolves the bag (file, example, or interactive picker)
//! - runs the pipeline and prints reports/plots
//! - writes snapshots and exports

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    BondArgs, Command, CommonArgs, ExportArgs, FetchArgs, MonthlyArgs, RecommendArgs, SimulateArgs, SourceArgs,
    TuiArgs,
};
use crate::domain::{BagSource, RunConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `bonds` binary.
pub fn run() -> Result<(), AppError> {
    // `bonds` and `bonds --example` behave like `bonds tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fetch(args) => handle_fetch(args),
        Command::Bag(args) => handle_bag(args),
        Command::Schedule(args) => handle_schedule(args),
        Command::Monthly(args) => handle_monthly(args),
        Command::Recommend(args) => handle_recommend(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Bond(args) => handle_bond(args),
        Command::Export(args) => handle_export(args),
        Command::Tui(args) => handle_tui(args),
    }
}

/// Route `tracing` output to stderr, or discard it while the TUI owns the terminal.
///
/// `RUST_LOG` overrides the level picked from `--verbose`.
fn init_tracing(verbose: bool, tui: bool) {
    let default = if verbose { "bondstool=debug" } else { "bondstool=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let _ = if tui {
        builder.with_writer(std::io::sink).try_init()
    } else {
        builder.with_writer(std::io::stderr).try_init()
    };
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    init_tracing(args.verbose, false);

    let snapshot = pipeline::fetch_snapshot(today())?;
    crate::io::write_snapshot_json(&args.out, &snapshot)?;

    println!(
        "Wrote {}: {} bonds, {} rates, {} auction ISIN(s).",
        args.out.display(),
        snapshot.bonds.len(),
        snapshot.rates.len(),
        snapshot.auction.len(),
    );
    Ok(())
}

fn handle_bag(args: CommonArgs) -> Result<(), AppError> {
    let run = run_pipeline(&args)?;
    println!("{}", crate::report::format_bag_summary(&run.summary, run.asof));
    Ok(())
}

fn handle_schedule(args: CommonArgs) -> Result<(), AppError> {
    let run = run_pipeline(&args)?;
    println!("{}", crate::report::format_schedule(&run.schedule));
    Ok(())
}

fn handle_monthly(args: MonthlyArgs) -> Result<(), AppError> {
    let run = run_pipeline(&args.common)?;
    println!("{}", crate::report::format_monthly(&run.baseline));

    if !args.plot.no_plot {
        let plot = crate::plot::render_monthly_plot(&run.baseline, None, args.plot.width, args.plot.height);
        println!("{plot}");
    }
    Ok(())
}

fn handle_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let run = run_pipeline(&args.common)?;
    let recs = if args.auction_only {
        if run.auction().is_empty() {
            return Err(AppError::new(3, "No auction candidates available."));
        }
        run.auction_recommendations()
    } else {
        run.recommendations.clone()
    };
    println!("{}", crate::report::format_recommendations(&recs, &run.lifetime));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let run = run_pipeline(&args.common)?;
    let forecast = run.simulate_purchases(&args.buy);

    let rows = crate::report::compare_forecast(&run.baseline, &forecast);
    println!("{}", crate::report::format_forecast(&rows));

    if !args.plot.no_plot {
        let plot =
            crate::plot::render_monthly_plot(&run.baseline, Some(&forecast), args.plot.width, args.plot.height);
        println!("{plot}");
    }
    Ok(())
}

fn handle_bond(args: BondArgs) -> Result<(), AppError> {
    init_tracing(args.source.verbose, false);

    // Lookup needs the catalog only; the bag stays empty.
    let config = run_config(&args.source, BagSource::Example);
    let snapshot = pipeline::load_snapshot(&config)?;
    let run = pipeline::run_with(snapshot, Vec::new(), config.asof_date)?;

    let details = run
        .details(&args.isin)
        .ok_or_else(|| AppError::new(2, format!("Bond {} not found in the catalog.", args.isin.trim())))?;
    println!("{}", crate::report::format_bond_details(&details));
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    let run = run_pipeline(&args.common)?;
    let paths = crate::io::write_workbook(&args.out, &run.summary, &run.schedule)?;
    for path in paths {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    init_tracing(args.common.source.verbose, true);
    let config = run_config(&args.common.source, bag_source(&args.common)?);
    crate::tui::run(&config, args.export_dir)
}

fn run_pipeline(args: &CommonArgs) -> Result<pipeline::RunOutput, AppError> {
    init_tracing(args.source.verbose, false);
    let config = run_config(&args.source, bag_source(args)?);
    pipeline::run(&config)
}

/// Resolve the bag from flags, falling back to the interactive picker.
fn bag_source(args: &CommonArgs) -> Result<BagSource, AppError> {
    if args.example {
        return Ok(BagSource::Example);
    }
    match &args.bag {
        Some(path) => Ok(BagSource::File(path.clone())),
        None => crate::cli::picker::prompt_for_bag(),
    }
}

pub fn run_config(source: &SourceArgs, bag: BagSource) -> RunConfig {
    RunConfig {
        asof_date: source.asof.unwrap_or_else(today),
        snapshot_path: source.snapshot.clone(),
        bag,
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Rewrite argv so `bonds` defaults to `bonds tui`.
///
/// Rules:
/// - `bonds`                        -> `bonds tui`
/// - `bonds --bag my.csv ...`       -> `bonds tui --bag my.csv ...`
/// - `bonds --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "fetch" | "bag" | "schedule" | "monthly" | "recommend" | "simulate" | "bond" | "export" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    // A leading flag is a TUI flag.
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}
