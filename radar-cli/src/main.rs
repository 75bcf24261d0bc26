//! MarketRadar CLI.
//!
//! Commands:
//! - `run`: fetch every instrument of a catalog, compute indicators, write the report
//! - `providers`: print which asset types each provider serves

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use radar_core::data::capability;
use radar_core::domain::ProviderId;
use radar_runner::{run_catalog, RunConfig, RunReport, TargetCatalog};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "radar",
    about = "MarketRadar: multi-source market data and indicator snapshots"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over a target catalog.
    Run {
        /// Target catalog (TOML).
        #[arg(long)]
        catalog: PathBuf,

        /// Run configuration (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the full report as JSON here.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write report-window candles as CSV here.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Pin "today" (YYYY-MM-DD). Overrides `as_of` from the config.
        #[arg(long)]
        as_of: Option<String>,

        /// Serve every instrument from the offline synthetic provider.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Financial Modeling Prep API key.
        #[arg(long, env = "FMP_API_KEY", hide_env_values = true)]
        fmp_key: Option<String>,
    },
    /// Print the provider capability table.
    Providers,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            catalog,
            config,
            out,
            csv,
            as_of,
            synthetic,
            fmp_key,
        } => run_cmd(&catalog, config.as_deref(), out, csv, as_of, synthetic, fmp_key),
        Commands::Providers => {
            print_capabilities();
            Ok(())
        }
    }
}

fn run_cmd(
    catalog_path: &Path,
    config_path: Option<&Path>,
    out: Option<PathBuf>,
    csv_path: Option<PathBuf>,
    as_of: Option<String>,
    synthetic: bool,
    fmp_key: Option<String>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(date) = as_of.as_deref() {
        config.as_of = Some(
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("invalid --as-of date '{date}'"))?,
        );
    }

    let mut catalog = TargetCatalog::from_file(catalog_path)?;
    if synthetic {
        config.providers = vec![ProviderId::Synthetic];
        catalog = catalog.with_synthetic_symbols();
    }

    let chain = config.build_chain(fmp_key)?;
    info!(
        providers = ?chain.provider_ids(),
        instruments = catalog.instrument_count(),
        "starting run"
    );
    let report = run_catalog(&catalog, &config, chain, chrono::Local::now().date_naive())?;

    print_summary(&report);

    if let Some(path) = out {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }
    if let Some(path) = csv_path {
        write_candles_csv(&report, &path)?;
        println!("Candles saved to: {}", path.display());
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "Window: {} .. {} (history from {})",
        report.windows.report.start, report.windows.report.end, report.windows.fetch.start
    );
    for group in &report.groups {
        println!();
        println!("== {} ==", group.group);
        for status in &group.statuses {
            match (&status.provider, &status.error) {
                (Some(provider), _) if status.success => {
                    println!("  OK    {:<24} via {provider}", status.name)
                }
                (_, Some(err)) => println!("  FAIL  {:<24} {err}", status.name),
                _ => println!("  FAIL  {}", status.name),
            }
        }
    }

    let signals = report.signal_summary();
    if !signals.is_empty() {
        println!();
        println!("Signals:");
        for (name, fired) in signals {
            println!("  {name}: {}", fired.join(", "));
        }
    }

    println!();
    println!("{}", report.summary);
}

/// One flat CSV row; `csv` cannot serialize flattened structs.
#[derive(Serialize)]
struct CsvRow<'a> {
    group: &'a str,
    name: &'a str,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    amount: f64,
    volume_ratio: f64,
}

fn write_candles_csv(report: &RunReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for (group, record) in report.candle_rows() {
        let c = &record.candle;
        writer.serialize(CsvRow {
            group,
            name: &record.name,
            date: c.date,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            amount: c.amount,
            volume_ratio: c.volume_ratio,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn print_capabilities() {
    println!("{:<12} ASSET TYPES", "PROVIDER");
    for provider in ProviderId::ALL {
        let assets: Vec<&str> = capability::supported_assets(provider)
            .iter()
            .map(|a| a.as_str())
            .collect();
        println!("{:<12} {}", provider.as_str(), assets.join(", "));
    }
}
