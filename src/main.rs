mod aggregator;
mod config;
mod detector;
mod loader;
mod models;
mod pipeline;
mod report;
mod scraper;
mod utils;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{AppConfig, ReportFormat};
use crate::loader::CsvDirectorySource;
use crate::pipeline::Pipeline;
use crate::report::{CsvReportWriter, JsonReportWriter, ReportWriter};
use crate::scraper::{EastmoneyClient, MarketDataSource};

#[derive(Parser)]
#[command(name = "gem-limitup", about = "ChiNext limit-up day scanner", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the lookback window for limit-up days and write a report
    Scan {
        /// Lookback window in calendar days (default: 30)
        #[arg(short, long)]
        days: Option<u32>,

        /// Report location: directory for csv, file for json
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,

        /// Read symbols.csv and <code>.csv from this directory instead of the quote API
        #[arg(long, env = "GEM_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Symbols fetched in parallel
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// List the symbols in the configured market segment
    Symbols {
        #[arg(long, env = "GEM_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },
}

fn build_source(config: &AppConfig, data_dir: Option<PathBuf>) -> Result<Arc<dyn MarketDataSource>> {
    Ok(match data_dir {
        Some(dir) => Arc::new(CsvDirectorySource::new(dir)?),
        None => Arc::new(
            EastmoneyClient::new(&config.provider).context("Failed to build quote API client")?,
        ),
    })
}

fn build_writer(config: &AppConfig) -> Arc<dyn ReportWriter> {
    let path = config.report.output_path.clone();
    match config.report.format {
        ReportFormat::Csv => Arc::new(CsvReportWriter::new(path)),
        ReportFormat::Json => Arc::new(JsonReportWriter::new(path)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "gem_limitup=info,warn",
        1 => "gem_limitup=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Scan {
            days,
            output,
            format,
            data_dir,
            concurrency,
        } => {
            if let Some(days) = days {
                config.scan.lookback_days = days;
            }
            if let Some(output) = output {
                config.report.output_path = output;
            }
            if let Some(format) = format {
                config.report.format = format;
            }
            if let Some(n) = concurrency {
                config.scan.concurrency = n;
            }

            let _t = utils::Timer::start("Limit-up scan");
            let source = build_source(&config, data_dir)?;
            let writer = build_writer(&config);
            let today = Local::now().date_naive();

            let span = info_span!(
                "scan",
                days = config.scan.lookback_days,
                prefix = %config.scan.code_prefix
            );
            let outcome = Pipeline::new(config.scan.clone(), source, writer)
                .with_span(span)
                .run(today)
                .await?;

            print!(
                "{}",
                report::preview::render(
                    &outcome.events,
                    &outcome.summary,
                    config.report.preview_rows
                )
            );
            info!(
                "Done: {} → {} | {} events | report at {:?}",
                outcome.window.start,
                outcome.window.end,
                outcome.stats.events_found,
                outcome.report_path
            );
        }

        Command::Symbols { data_dir } => {
            let source = build_source(&config, data_dir)?;
            let prefix = config.scan.code_prefix.as_str();
            let symbols: Vec<_> = source
                .fetch_symbol_list(Some(prefix))
                .await?
                .into_iter()
                .filter(|s| s.code.starts_with(prefix))
                .collect();

            if symbols.is_empty() {
                println!("No symbols starting with {:?}.", prefix);
            } else {
                println!("{} symbols:", symbols.len());
                for s in &symbols {
                    println!("  {}  {}", s.code, s.name);
                }
            }
        }
    }

    Ok(())
}
