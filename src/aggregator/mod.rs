//! Summary statistics over a set of limit-up events.
//!
//! Every table is a partition of the events by some key followed by the same
//! reduction (`Fold`), so the per-symbol rows and the overall counters cannot
//! drift apart.

use crate::models::LimitUpEvent;
use crate::utils::round2;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

// ── Report types ──────────────────────────────────────────────────────────────

/// Max/mean/min of `percent_change`, rounded to 2 decimals.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PctStats {
    pub max: f64,
    pub mean: f64,
    pub min: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverallStats {
    pub total_records: usize,
    pub distinct_symbols: usize,
    /// `None` when there are no events: mean/max/min of nothing is undefined.
    pub percent: Option<PctStats>,
    pub total_turnover: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SymbolSummary {
    pub code: String,
    pub name: String,
    pub count: usize,
    pub percent: PctStats,
    pub total_volume: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DateSummary {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryReport {
    pub overall: OverallStats,
    /// Count desc, then code asc, then name asc.
    pub by_symbol: Vec<SymbolSummary>,
    /// Date desc.
    pub by_date: Vec<DateSummary>,
}

impl SummaryReport {
    pub fn is_empty(&self) -> bool {
        self.overall.total_records == 0
    }
}

// ── Reduction ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Fold {
    count: usize,
    pct_sum: f64,
    pct_max: f64,
    pct_min: f64,
    volume: u64,
    turnover: f64,
}

impl Fold {
    fn over<'a>(events: impl IntoIterator<Item = &'a LimitUpEvent>) -> Self {
        events.into_iter().fold(Fold::default(), |mut acc, e| {
            if acc.count == 0 {
                acc.pct_max = e.percent_change;
                acc.pct_min = e.percent_change;
            } else {
                acc.pct_max = acc.pct_max.max(e.percent_change);
                acc.pct_min = acc.pct_min.min(e.percent_change);
            }
            acc.count += 1;
            acc.pct_sum += e.percent_change;
            acc.volume = acc.volume.saturating_add(e.volume);
            acc.turnover += e.turnover;
            acc
        })
    }

    fn pct_stats(&self) -> Option<PctStats> {
        if self.count == 0 {
            return None;
        }
        Some(PctStats {
            max: round2(self.pct_max),
            mean: round2(self.pct_sum / self.count as f64),
            min: round2(self.pct_min),
        })
    }
}

/// Fixed fold order so float sums do not depend on how the caller ordered
/// the events.
fn canonical_order(a: &&LimitUpEvent, b: &&LimitUpEvent) -> Ordering {
    a.symbol
        .code
        .cmp(&b.symbol.code)
        .then_with(|| a.date.cmp(&b.date))
        .then_with(|| a.percent_change.total_cmp(&b.percent_change))
}

// ── Summarize ─────────────────────────────────────────────────────────────────

pub fn summarize(events: &[LimitUpEvent]) -> SummaryReport {
    let mut ordered: Vec<&LimitUpEvent> = events.iter().collect();
    ordered.sort_by(canonical_order);

    // Pass 1: partition
    let mut by_symbol: BTreeMap<(&str, &str), Vec<&LimitUpEvent>> = BTreeMap::new();
    let mut by_date: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for e in ordered.iter().copied() {
        by_symbol
            .entry((e.symbol.code.as_str(), e.symbol.name.as_str()))
            .or_default()
            .push(e);
        *by_date.entry(e.date).or_default() += 1;
    }

    // Pass 2: reduce
    let mut symbol_rows: Vec<SymbolSummary> = by_symbol
        .into_iter()
        .filter_map(|((code, name), group)| {
            let fold = Fold::over(group);
            Some(SymbolSummary {
                code: code.to_string(),
                name: name.to_string(),
                count: fold.count,
                percent: fold.pct_stats()?,
                total_volume: fold.volume,
            })
        })
        .collect();

    // BTreeMap iteration is already (code, name) ascending; stable sort keeps it for ties
    symbol_rows.sort_by(|a, b| b.count.cmp(&a.count));

    let date_rows: Vec<DateSummary> = by_date
        .into_iter()
        .rev()
        .map(|(date, count)| DateSummary { date, count })
        .collect();

    let all = Fold::over(ordered.iter().copied());
    let distinct: BTreeSet<&str> = ordered
        .iter()
        .copied()
        .map(|e| e.symbol.code.as_str())
        .collect();

    SummaryReport {
        overall: OverallStats {
            total_records: all.count,
            distinct_symbols: distinct.len(),
            percent: all.pct_stats(),
            total_turnover: all.turnover,
        },
        by_symbol: symbol_rows,
        by_date: date_rows,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Symbol;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn event(code: &str, d: u32, pct: f64, volume: u64) -> LimitUpEvent {
        LimitUpEvent {
            symbol: Symbol::new(code, format!("name-{}", code)),
            date: day(d),
            close_price: 12.0,
            previous_close: 10.0,
            percent_change: pct,
            open: 10.2,
            high: 12.0,
            low: 10.1,
            volume,
            turnover: 1.0e8,
            turnover_rate: Some(3.2),
        }
    }

    fn two_symbols() -> Vec<LimitUpEvent> {
        vec![
            event("300002", 6, 19.7, 50),
            event("300001", 5, 19.5, 10),
            event("300001", 6, 20.0, 20),
            event("300001", 7, 19.0, 30),
        ]
    }

    #[test]
    fn test_empty_has_no_data_marker() {
        let r = summarize(&[]);
        assert!(r.is_empty());
        assert_eq!(r.overall.total_records, 0);
        assert_eq!(r.overall.distinct_symbols, 0);
        assert_eq!(r.overall.percent, None);
        assert_eq!(r.overall.total_turnover, 0.0);
        assert!(r.by_symbol.is_empty());
        assert!(r.by_date.is_empty());
    }

    #[test]
    fn test_per_symbol_breakdown() {
        let r = summarize(&two_symbols());
        assert_eq!(r.by_symbol.len(), 2);

        let a = &r.by_symbol[0];
        assert_eq!(a.code, "300001");
        assert_eq!(a.name, "name-300001");
        assert_eq!(a.count, 3);
        assert_eq!(a.percent.mean, 19.5);
        assert_eq!(a.percent.max, 20.0);
        assert_eq!(a.percent.min, 19.0);
        assert_eq!(a.total_volume, 60);

        let b = &r.by_symbol[1];
        assert_eq!(b.code, "300002");
        assert_eq!(b.count, 1);
        assert_eq!(b.percent.mean, 19.7);
    }

    #[test]
    fn test_overall_counters() {
        let r = summarize(&two_symbols());
        assert_eq!(r.overall.total_records, 4);
        assert_eq!(r.overall.distinct_symbols, 2);
        let pct = r.overall.percent.unwrap();
        assert_eq!(pct.max, 20.0);
        assert_eq!(pct.min, 19.0);
        assert_eq!(pct.mean, 19.55);
        assert_eq!(r.overall.total_turnover, 4.0e8);
    }

    #[test]
    fn test_count_ties_break_on_code() {
        let events = vec![
            event("300750", 5, 19.9, 1),
            event("300003", 5, 19.1, 1),
            event("300124", 6, 20.0, 1),
        ];
        let r = summarize(&events);
        let codes: Vec<&str> = r.by_symbol.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["300003", "300124", "300750"]);
    }

    #[test]
    fn test_by_date_descending() {
        let r = summarize(&two_symbols());
        assert_eq!(
            r.by_date,
            vec![
                DateSummary { date: day(7), count: 1 },
                DateSummary { date: day(6), count: 2 },
                DateSummary { date: day(5), count: 1 },
            ]
        );
    }

    #[test]
    fn test_summarize_is_order_independent() {
        let events = two_symbols();
        let mut reversed = events.clone();
        reversed.reverse();

        let first = summarize(&events);
        assert_eq!(first, summarize(&events));
        assert_eq!(first, summarize(&reversed));
    }

    #[test]
    fn test_same_code_different_names_are_separate_groups() {
        let mut renamed = event("300001", 8, 19.2, 5);
        renamed.symbol.name = "renamed".into();
        let mut events = two_symbols();
        events.push(renamed);

        let r = summarize(&events);
        assert_eq!(r.by_symbol.len(), 3);
        assert_eq!(r.overall.distinct_symbols, 2);
    }
}
