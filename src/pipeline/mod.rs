//! Scan orchestrator: ties source → detector → aggregator → report together.
//!
//! ## Run sequence
//!
//! 1. Compute the lookback window ending on `today`.
//! 2. Fetch the symbol universe and keep codes with the configured prefix.
//!    Failure here aborts the run.
//! 3. For every symbol, fetch daily bars and run the detector. Symbols run
//!    concurrently up to `scan.concurrency`; a failing or slow symbol is
//!    logged and skipped without touching its siblings.
//! 4. Merge events in universe order, stable-sort by date descending,
//!    summarize, and hand both to the report writer exactly once.

use crate::aggregator::{SummaryReport, summarize};
use crate::config::ScanConfig;
use crate::detector::{BarSeries, DetectError, detect};
use crate::models::{LimitUpEvent, ScanWindow, Symbol};
use crate::report::ReportWriter;
use crate::scraper::MarketDataSource;
use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

pub struct Pipeline {
    config: ScanConfig,
    source: Arc<dyn MarketDataSource>,
    writer: Arc<dyn ReportWriter>,
    span: Span,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    pub symbols_total: usize,
    pub symbols_scanned: usize,
    pub fetch_errors: usize,
    pub detect_errors: usize,
    pub events_found: usize,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub window: ScanWindow,
    /// Date descending; same-day events keep universe order.
    pub events: Vec<LimitUpEvent>,
    pub summary: SummaryReport,
    pub stats: PipelineStats,
    pub report_path: PathBuf,
}

/// Why one symbol produced no events.
#[derive(Debug)]
enum SymbolFailure {
    Fetch(anyhow::Error),
    Detect(DetectError),
}

impl Pipeline {
    pub fn new(
        config: ScanConfig,
        source: Arc<dyn MarketDataSource>,
        writer: Arc<dyn ReportWriter>,
    ) -> Self {
        Self {
            config,
            source,
            writer,
            span: Span::none(),
        }
    }

    /// Logging context for the run; per-symbol spans are created as its children.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub async fn run(&self, today: NaiveDate) -> Result<ScanOutcome> {
        self.run_inner(today).instrument(self.span.clone()).await
    }

    async fn run_inner(&self, today: NaiveDate) -> Result<ScanOutcome> {
        let window = ScanWindow::ending_on(today, self.config.lookback_days).ok_or_else(|| {
            anyhow!(
                "Lookback of {} days before {} is out of the supported date range",
                self.config.lookback_days,
                today
            )
        })?;
        let prefix = self.config.code_prefix.as_str();

        // ── 1. Symbol universe ────────────────────────────────────────────────
        info!("=== Step 1: Fetching symbol universe ({}…) ===", prefix);
        let universe = self
            .source
            .fetch_symbol_list(Some(prefix))
            .await
            .context("Symbol universe fetch failed")?;

        let symbols: Vec<Symbol> = universe
            .into_iter()
            .filter(|s| s.code.starts_with(prefix))
            .collect();
        if symbols.is_empty() {
            bail!("Symbol universe has no codes starting with {:?}", prefix);
        }

        // ── 2. Bars + detection per symbol ────────────────────────────────────
        info!(
            "=== Step 2: Scanning {} symbols from {} to {} ===",
            symbols.len(),
            window.start,
            window.end
        );

        let sem = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let per_symbol = Duration::from_secs(self.config.symbol_timeout_secs);
        let total = symbols.len();
        let mut handles = Vec::with_capacity(total);

        for (idx, symbol) in symbols.into_iter().enumerate() {
            let source = Arc::clone(&self.source);
            let sem = Arc::clone(&sem);
            let threshold = self.config.threshold;
            let adjustment = self.config.adjustment;
            let span = info_span!(parent: &self.span, "symbol", code = %symbol.code);
            let task_symbol = symbol.clone();

            let handle = tokio::spawn(
                async move {
                    let symbol = task_symbol;
                    let _permit = sem
                        .acquire()
                        .await
                        .map_err(|e| SymbolFailure::Fetch(anyhow!(e)))?;

                    debug!(
                        "Processing {}/{}: {} - {}",
                        idx + 1,
                        total,
                        symbol.code,
                        symbol.name
                    );

                    let fetch = source.fetch_daily_bars(&symbol.code, &window, adjustment);
                    let bars = match tokio::time::timeout(per_symbol, fetch).await {
                        Ok(Ok(bars)) => bars,
                        Ok(Err(e)) => return Err(SymbolFailure::Fetch(e)),
                        Err(_) => {
                            return Err(SymbolFailure::Fetch(anyhow!(
                                "timed out after {:?}",
                                per_symbol
                            )));
                        }
                    };

                    let series =
                        BarSeries::new(&symbol.code, bars).map_err(SymbolFailure::Detect)?;
                    if series.is_empty() {
                        debug!("{}: no bars in window", series.code());
                        return Ok(vec![]);
                    }
                    let events =
                        detect(&symbol, &series, threshold).map_err(SymbolFailure::Detect)?;

                    if !events.is_empty() {
                        info!(
                            "{}: {} limit-up day(s) in {} bars",
                            series.code(),
                            events.len(),
                            series.len()
                        );
                    }
                    Ok::<_, SymbolFailure>(events)
                }
                .instrument(span),
            );

            handles.push((symbol, handle));
        }

        // Joined in submission order, so the merge does not depend on completion order
        let mut stats = PipelineStats {
            symbols_total: total,
            ..Default::default()
        };
        let mut events = Vec::new();

        for (symbol, handle) in handles {
            match handle.await {
                Ok(Ok(found)) => {
                    stats.symbols_scanned += 1;
                    events.extend(found);
                }
                Ok(Err(SymbolFailure::Fetch(e))) => {
                    warn!("{}: skipped, {:#}", symbol.code, e);
                    stats.fetch_errors += 1;
                }
                Ok(Err(SymbolFailure::Detect(e))) => {
                    error!("{}: rejected, {}", symbol.code, e);
                    stats.detect_errors += 1;
                }
                Err(e) => {
                    error!("Task panic for {}: {}", symbol.code, e);
                    stats.fetch_errors += 1;
                }
            }
        }

        events.sort_by(|a, b| b.date.cmp(&a.date));
        stats.events_found = events.len();

        if events.is_empty() {
            warn!("No limit-up records found");
        } else {
            info!("{} limit-up records found", events.len());
        }

        // ── 3. Summarize + report ─────────────────────────────────────────────
        info!("=== Step 3: Writing report ===");
        let summary = summarize(&events);
        let report_path = self
            .writer
            .write(&events, &summary)
            .context("Report write failed")?;

        info!(
            "=== Done: {} symbols | {} scanned | {} fetch errors | {} detect errors | {} events ===",
            stats.symbols_total,
            stats.symbols_scanned,
            stats.fetch_errors,
            stats.detect_errors,
            stats.events_found,
        );

        Ok(ScanOutcome {
            window,
            events,
            summary,
            stats,
            report_path,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
