use crate::aggregator::SummaryReport;
use crate::models::LimitUpEvent;
use crate::report::{NO_RECORDS, turnover_in_display_unit};
use crate::utils::{fmt_number, fmt_opt_pct};
use std::fmt::Write;

const RULE: &str = "──────────────────────────────────────────────────────────────";

/// Plain-text preview of the first `rows` events and the overall statistics.
pub fn render(events: &[LimitUpEvent], summary: &SummaryReport, rows: usize) -> String {
    let mut out = String::new();
    let o = &summary.overall;

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "  GEM limit-up scan");
    let _ = writeln!(out, "{}", RULE);

    if events.is_empty() {
        let _ = writeln!(out, "  {}", NO_RECORDS);
        let _ = writeln!(out, "{}", RULE);
        return out;
    }

    let _ = writeln!(
        out,
        "  {:<8} {:<10} {:<10} {:>9} {:>8} {:>14}",
        "code", "name", "date", "close", "pct", "volume"
    );
    for e in events.iter().take(rows) {
        let _ = writeln!(
            out,
            "  {:<8} {:<10} {:<10} {:>9.2} {:>8.2} {:>14}",
            e.symbol.code,
            e.symbol.name,
            e.date.to_string(),
            e.close_price,
            e.percent_change,
            fmt_number(e.volume)
        );
    }
    if events.len() > rows {
        let _ = writeln!(out, "  … {} more", events.len() - rows);
    }

    let pct = o.percent;
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "  Records          : {}", o.total_records);
    let _ = writeln!(out, "  Symbols          : {}", o.distinct_symbols);
    let _ = writeln!(out, "  Mean gain (%)    : {}", fmt_opt_pct(pct.map(|p| p.mean)));
    let _ = writeln!(out, "  Max gain (%)     : {}", fmt_opt_pct(pct.map(|p| p.max)));
    let _ = writeln!(out, "  Min gain (%)     : {}", fmt_opt_pct(pct.map(|p| p.min)));
    let _ = writeln!(
        out,
        "  Turnover (100m)  : {:.2}",
        turnover_in_display_unit(o.total_turnover)
    );
    let _ = writeln!(out, "{}", RULE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::summarize;
    use crate::models::Symbol;
    use chrono::NaiveDate;

    fn event(d: u32) -> LimitUpEvent {
        LimitUpEvent {
            symbol: Symbol::new("300059", "东方财富"),
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            close_price: 24.0,
            previous_close: 20.0,
            percent_change: 20.0,
            open: 20.5,
            high: 24.0,
            low: 20.1,
            volume: 12_345_678,
            turnover: 250_000_000.0,
            turnover_rate: None,
        }
    }

    #[test]
    fn test_preview_lists_rows_and_stats() {
        let events: Vec<_> = (2..6).map(event).collect();
        let text = render(&events, &summarize(&events), 2);
        assert!(text.contains("12,345,678"));
        assert!(text.contains("… 2 more"));
        assert!(text.contains("Records          : 4"));
        assert!(text.contains("Mean gain (%)    : 20.00"));
        assert!(text.contains("Turnover (100m)  : 10.00"));
    }

    #[test]
    fn test_preview_empty() {
        let text = render(&[], &summarize(&[]), 10);
        assert!(text.contains(NO_RECORDS));
        assert!(!text.contains("Records"));
    }
}
