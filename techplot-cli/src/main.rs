//! techplot CLI: render backtest and signal result JSON as chart images.
//!
//! Commands:
//! - `backtest`: portfolio vs benchmark, and price with trade markers
//! - `signal`: price, indicator outputs, and bullish/bearish signal bars
//!
//! Input is read from the given path, or stdin when omitted or `-`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;
use techplot_core::chart::{BacktestLayout, ImageFormat, SignalLayout};
use techplot_core::data::{InputSource, JoinPolicy};
use techplot_core::report::{run_report, ReportKind, ReportOptions, ReportOutcome};
use techplot_core::ReportConfig;

#[derive(Parser)]
#[command(
    name = "techplot",
    about = "techplot: chart images from backtest and signal results"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory to write images to. Defaults to the current directory.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Image format: png or svg.
    #[arg(long, global = true)]
    format: Option<ImageFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a backtest result.
    Backtest {
        /// Result JSON file. Reads stdin when omitted or `-`.
        input: Option<PathBuf>,

        /// Single panel: normalized price and portfolio value.
        #[arg(long, default_value_t = false)]
        compact: bool,

        /// Date join: outer or inner.
        #[arg(long)]
        join: Option<JoinPolicy>,

        /// Also write the aligned table as CSV.
        #[arg(long)]
        export_table: Option<PathBuf>,
    },
    /// Render a signal result.
    Signal {
        /// Result JSON file. Reads stdin when omitted or `-`.
        input: Option<PathBuf>,

        /// Indicator placement: auto, superimposed or separate.
        #[arg(long)]
        layout: Option<SignalLayout>,

        /// Date join: outer or inner.
        #[arg(long)]
        join: Option<JoinPolicy>,

        /// Also write the aligned table as CSV.
        #[arg(long)]
        export_table: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let config = ReportConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            debug!("loaded config from {}", path.display());
            config
        }
        None => ReportConfig::default(),
    };

    let (input, mut options) = match cli.command {
        Commands::Backtest {
            input,
            compact,
            join,
            export_table,
        } => {
            let mut options = ReportOptions::backtest(&config);
            if compact {
                options.kind = ReportKind::Backtest(BacktestLayout::Compact);
            }
            if let Some(join) = join {
                options.join = join;
            }
            options.export_table = export_table;
            (input, options)
        }
        Commands::Signal {
            input,
            layout,
            join,
            export_table,
        } => {
            let mut options = ReportOptions::signal(&config);
            if let Some(layout) = layout {
                options.kind = ReportKind::Signal(layout);
            }
            if let Some(join) = join {
                options.join = join;
            }
            options.export_table = export_table;
            (input, options)
        }
    };

    if let Some(dir) = cli.output_dir {
        options.output_dir = dir;
    }
    if let Some(format) = cli.format {
        options.format = format;
    }

    let source = InputSource::from_arg(input);
    let outcome = run_report(&source, &options)
        .with_context(|| format!("rendering {} report from {source}", options.kind.suffix()))?;

    print_summary(&outcome);
    Ok(())
}

fn print_summary(outcome: &ReportOutcome) {
    let report = &outcome.report;
    println!();
    match &report.summary {
        Some(summary) => {
            println!("=== Backtest Report ===");
            println!("Symbol:         {}", report.symbol.to_uppercase());
            println!("Model:          {}", summary.model_name);
            if let Some(price_symbol) = &summary.price_symbol {
                println!("Price Series:   {price_symbol}");
            }
        }
        None => {
            println!("=== Signal Report ===");
            println!("Symbol:         {}", report.symbol.to_uppercase());
        }
    }
    println!(
        "Period:         {} to {}",
        report.start_date(),
        report.end_date()
    );
    println!("Rows:           {}", report.table.len());
    println!("Markers:        {}", report.marker_count());
    if let Some(summary) = &report.summary {
        if let Some(total_return) = summary.total_return {
            println!("Total Return:   {:.2}%", total_return * 100.0);
        }
        if let Some(volatility) = summary.volatility {
            println!("Volatility:     {:.4}", volatility);
        }
        if let Some((mean, days)) = summary.daily_returns {
            println!("Avg Daily Ret:  {:.4}% ({days} days)", mean * 100.0);
        }
    }
    println!("Image:          {}", outcome.path.display());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "techplot",
            "backtest",
            "result.json",
            "--compact",
            "--join",
            "inner",
            "--format",
            "svg",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(ImageFormat::Svg));
        match cli.command {
            Commands::Backtest {
                input,
                compact,
                join,
                ..
            } => {
                assert_eq!(input, Some(PathBuf::from("result.json")));
                assert!(compact);
                assert_eq!(join, Some(JoinPolicy::Inner));
            }
            Commands::Signal { .. } => panic!("expected backtest"),
        }
    }

    #[test]
    fn rejects_unknown_layout() {
        assert!(Cli::try_parse_from(["techplot", "signal", "--layout", "diagonal"]).is_err());
    }
}
