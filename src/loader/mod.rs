//! Offline data source backed by a directory of CSV files.
//!
//! Layout:
//! - `symbols.csv`: `code,name`
//! - `<code>.csv`: `date,open,high,low,close,volume,turnover,turnover_rate`
//!
//! Useful for replaying an exported snapshot without touching the network.

use crate::models::{Adjustment, DailyBar, RawCsvRow, RawSymbolRow, ScanWindow, Symbol};
use crate::scraper::MarketDataSource;
use crate::scraper::cleaner::{clean_symbol_rows, csv_row_to_bar};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SYMBOLS_FILE: &str = "symbols.csv";

pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            bail!("Data directory {:?} does not exist", dir);
        }
        Ok(Self { dir })
    }

    fn bars_path(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", code))
    }
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))
}

/// Parse `symbols.csv`: code, name
pub fn load_symbols(path: &Path) -> Result<Vec<Symbol>> {
    let mut rdr = reader(path)?;
    let mut rows = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {} in {:?}: {}", i + 1, path, e);
                continue;
            }
        };
        rows.push(RawSymbolRow {
            code: record.get(0).map(|s| s.to_string()),
            name: record.get(1).map(|s| s.to_string()),
        });
    }

    Ok(clean_symbol_rows(rows))
}

/// Parse one bar file: date, open, high, low, close, volume, turnover, turnover_rate
///
/// Any unusable row fails the whole file rather than leaving a gap in the series.
pub fn load_bars(code: &str, path: &Path) -> Result<Vec<DailyBar>> {
    let mut rdr = reader(path)?;
    let mut bars = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("{}: row {} in {:?} unreadable", code, i + 1, path))?;

        let raw = RawCsvRow {
            date: record.get(0).map(|s| s.to_string()),
            open: record.get(1).map(|s| s.to_string()),
            high: record.get(2).map(|s| s.to_string()),
            low: record.get(3).map(|s| s.to_string()),
            close: record.get(4).map(|s| s.to_string()),
            volume: record.get(5).map(|s| s.to_string()),
            turnover: record.get(6).map(|s| s.to_string()),
            turnover_rate: record.get(7).map(|s| s.to_string()),
        };

        let bar = csv_row_to_bar(&raw)
            .with_context(|| format!("{}: row {} in {:?} rejected", code, i + 1, path))?;
        bars.push(bar);
    }

    debug!("{}: {} bars from {:?}", code, bars.len(), path);
    Ok(bars)
}

#[async_trait]
impl MarketDataSource for CsvDirectorySource {
    async fn fetch_symbol_list(&self, _code_prefix: Option<&str>) -> Result<Vec<Symbol>> {
        load_symbols(&self.dir.join(SYMBOLS_FILE))
    }

    /// Files hold whatever adjustment they were exported with.
    async fn fetch_daily_bars(
        &self,
        code: &str,
        window: &ScanWindow,
        _adjustment: Adjustment,
    ) -> Result<Vec<DailyBar>> {
        let path = self.bars_path(code);
        let bars = load_bars(code, &path)?;
        Ok(bars.into_iter().filter(|b| window.contains(b.date)).collect())
    }
}
