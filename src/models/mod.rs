use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

// ── Symbol ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symbol {
    pub code: String, // "300750"
    pub name: String,
}

impl Symbol {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

// ── Equity daily bar ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Traded value in the provider's currency unit (CNY).
    pub turnover: f64,
    pub turnover_rate: Option<f64>,
}

// ── Limit-up event ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitUpEvent {
    pub symbol: Symbol,
    pub date: NaiveDate,
    pub close_price: f64,
    pub previous_close: f64,
    /// Close-to-close gain in percent, rounded to 2 decimals.
    pub percent_change: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub turnover: f64,
    pub turnover_rate: Option<f64>,
}

// ── Scan window ───────────────────────────────────────────────────────────────

/// Inclusive calendar range of bars requested from a source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ScanWindow {
    /// `None` when the start would fall before the earliest representable date.
    pub fn ending_on(end: NaiveDate, lookback_days: u32) -> Option<Self> {
        let start = end.checked_sub_days(Days::new(u64::from(lookback_days)))?;
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// ── Price adjustment ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Adjustment {
    None,
    /// Forward-adjusted ("qfq"): history rescaled to today's price level.
    #[default]
    Forward,
    Backward,
}

// ── Raw provider rows ─────────────────────────────────────────────────────────

/// One comma-separated kline entry from the quote API:
/// date, open, close, high, low, volume, turnover, amplitude, pct, change, turnover rate
#[derive(Debug, Clone, Default)]
pub struct RawKlineRow {
    pub date: Option<String>,
    pub open: Option<String>,
    pub close: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub volume: Option<String>,
    pub turnover: Option<String>,
    pub turnover_rate: Option<String>,
}

/// Offline CSV layout: date, open, high, low, close, volume, turnover, turnover_rate
#[derive(Debug, Clone, Default)]
pub struct RawCsvRow {
    pub date: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
    pub turnover: Option<String>,
    pub turnover_rate: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawSymbolRow {
    pub code: Option<String>,
    pub name: Option<String>,
}
