//! Limit-up detection over one symbol's daily series.
//!
//! A limit-up day is a close-to-close gain of at least `threshold` percent.
//! ChiNext boards are capped at +20% per session, so 19.0 catches every
//! limit-up close while tolerating rounding of the tick grid.

use crate::models::{DailyBar, LimitUpEvent, Symbol};
use crate::utils::round2;
use chrono::NaiveDate;
use thiserror::Error;

/// Default gain (percent) that counts as limit-up on a 20% board.
pub const DEFAULT_THRESHOLD: f64 = 19.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectError {
    #[error("{code}: previous close {previous_close} before {date} is not positive")]
    NonPositivePreviousClose {
        code: String,
        date: NaiveDate,
        previous_close: f64,
    },

    #[error("{code}: duplicate bar for {date}")]
    DuplicateDate { code: String, date: NaiveDate },
}

// ── Ordered series ────────────────────────────────────────────────────────────

/// Daily bars for a single symbol, strictly ascending by date.
///
/// Sources return bars in whatever order the provider sends them; building a
/// `BarSeries` sorts them once (O(n log n)) and rejects duplicate dates, so
/// `detect` never has to re-check ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    code: String,
    bars: Vec<DailyBar>,
}

impl BarSeries {
    pub fn new(code: &str, mut bars: Vec<DailyBar>) -> Result<Self, DetectError> {
        bars.sort_by_key(|b| b.date);

        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(DetectError::DuplicateDate {
                code: code.to_string(),
                date: pair[1].date,
            });
        }

        Ok(Self {
            code: code.to_string(),
            bars,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

// ── Detection ─────────────────────────────────────────────────────────────────

/// Close-to-close change in percent, rounded to 2 decimals.
///
/// Callers must ensure `previous_close > 0`.
pub fn percent_change(previous_close: f64, close: f64) -> f64 {
    round2((close - previous_close) / previous_close * 100.0)
}

/// Scan adjacent bar pairs and emit an event for every day whose rounded
/// gain over the previous close is `>= threshold`.
///
/// The threshold is compared against the rounded percent, so a raw 18.996% gain
/// counts at a 19.0 threshold and every event's stored `percent_change` is
/// `>= threshold`.
///
/// The first bar has no predecessor and never produces an event. A
/// non-positive previous close rejects the whole series.
pub fn detect(
    symbol: &Symbol,
    series: &BarSeries,
    threshold: f64,
) -> Result<Vec<LimitUpEvent>, DetectError> {
    let mut events = Vec::new();

    for pair in series.bars().windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);

        // `!(x > 0)` also rejects NaN
        if !(prev.close > 0.0) {
            return Err(DetectError::NonPositivePreviousClose {
                code: symbol.code.clone(),
                date: bar.date,
                previous_close: prev.close,
            });
        }

        let pct = percent_change(prev.close, bar.close);
        if pct >= threshold {
            events.push(LimitUpEvent {
                symbol: symbol.clone(),
                date: bar.date,
                close_price: bar.close,
                previous_close: prev.close,
                percent_change: pct,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                volume: bar.volume,
                turnover: bar.turnover,
                turnover_rate: bar.turnover_rate,
            });
        }
    }

    Ok(events)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
