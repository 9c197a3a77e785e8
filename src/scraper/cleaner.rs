use crate::models::{DailyBar, RawCsvRow, RawKlineRow, RawSymbolRow, Symbol};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// The quote API sends "-" for missing numbers.
fn is_blank(s: &str) -> bool {
    s.is_empty() || s == "-"
}

/// Plain decimal: "12.00", "401234567.00", "8.12".
pub fn parse_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    if is_blank(s) {
        return None;
    }
    s.parse().ok()
}

/// Share volume as an integer; the API sometimes appends ".0".
pub fn parse_volume(s: &str) -> Option<u64> {
    let s = s.trim();
    if is_blank(s) {
        return None;
    }
    s.strip_suffix(".0").unwrap_or(s).parse().ok()
}

/// ISO dates from the API and CSV exports, or compact `YYYYMMDD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    ["%Y-%m-%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Exchange codes are six digits; strip market prefixes like "sz300750" / "300750.SZ".
pub fn normalise_code(s: &str) -> String {
    s.trim()
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

// ── Row → DailyBar ────────────────────────────────────────────────────────────

struct BarFields<'a> {
    date: Option<&'a str>,
    open: Option<&'a str>,
    high: Option<&'a str>,
    low: Option<&'a str>,
    close: Option<&'a str>,
    volume: Option<&'a str>,
    turnover: Option<&'a str>,
    turnover_rate: Option<&'a str>,
}

fn required<T>(name: &str, raw: Option<&str>, parse: fn(&str) -> Option<T>) -> Result<T> {
    let raw = raw.ok_or_else(|| anyhow!("missing {}", name))?;
    parse(raw).ok_or_else(|| anyhow!("unparseable {} {:?}", name, raw))
}

/// Blank is `None`; anything else must parse.
fn optional<T>(
    name: &str,
    raw: Option<&str>,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some(s) if is_blank(s) => Ok(None),
        Some(s) => parse(s)
            .map(Some)
            .ok_or_else(|| anyhow!("unparseable {} {:?}", name, s)),
    }
}

/// Prices are taken as-is, including zero or negative closes; the detector
/// owns the previous-close check.
fn fields_to_bar(f: BarFields<'_>) -> Result<DailyBar> {
    Ok(DailyBar {
        date: required("date", f.date, parse_date)?,
        open: required("open", f.open, parse_decimal)?,
        high: required("high", f.high, parse_decimal)?,
        low: required("low", f.low, parse_decimal)?,
        close: required("close", f.close, parse_decimal)?,
        volume: optional("volume", f.volume, parse_volume)?.unwrap_or(0),
        turnover: optional("turnover", f.turnover, parse_decimal)?.unwrap_or(0.0),
        turnover_rate: optional("turnover rate", f.turnover_rate, parse_decimal)?,
    })
}

pub fn kline_row_to_bar(row: &RawKlineRow) -> Result<DailyBar> {
    fields_to_bar(BarFields {
        date: row.date.as_deref(),
        open: row.open.as_deref(),
        high: row.high.as_deref(),
        low: row.low.as_deref(),
        close: row.close.as_deref(),
        volume: row.volume.as_deref(),
        turnover: row.turnover.as_deref(),
        turnover_rate: row.turnover_rate.as_deref(),
    })
}

pub fn csv_row_to_bar(row: &RawCsvRow) -> Result<DailyBar> {
    fields_to_bar(BarFields {
        date: row.date.as_deref(),
        open: row.open.as_deref(),
        high: row.high.as_deref(),
        low: row.low.as_deref(),
        close: row.close.as_deref(),
        volume: row.volume.as_deref(),
        turnover: row.turnover.as_deref(),
        turnover_rate: row.turnover_rate.as_deref(),
    })
}

/// All-or-nothing: a single unusable row fails the symbol, since skipping it
/// would pair the neighbouring bars as if they were adjacent sessions.
pub fn clean_kline_rows(code: &str, rows: Vec<RawKlineRow>) -> Result<Vec<DailyBar>> {
    rows.iter()
        .enumerate()
        .map(|(i, r)| {
            kline_row_to_bar(r)
                .with_context(|| format!("{}: kline row {} rejected", code, i + 1))
        })
        .collect()
}

// ── Row → Symbol ──────────────────────────────────────────────────────────────

pub fn symbol_row_to_symbol(row: &RawSymbolRow) -> Option<Symbol> {
    let code = normalise_code(row.code.as_deref()?);
    if code.is_empty() {
        return None;
    }
    let name = row.name.as_deref().unwrap_or_default().trim();
    Some(Symbol::new(code, name))
}

pub fn clean_symbol_rows(rows: Vec<RawSymbolRow>) -> Vec<Symbol> {
    rows.iter().filter_map(symbol_row_to_symbol).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::parsers::parse_kline_line;

    #[test]
    fn test_parse_volume() {
        assert_eq!(parse_volume("345678"), Some(345_678));
        assert_eq!(parse_volume("678.0"), Some(678));
        assert_eq!(parse_volume("1.2M"), None);
        assert_eq!(parse_volume("-"), None);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("12.00"), Some(12.0));
        assert_eq!(parse_decimal("1.2e3"), Some(1200.0));
        assert_eq!(parse_decimal("0"), Some(0.0));
        assert_eq!(parse_decimal("-"), None);
        assert_eq!(parse_decimal("¥12"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_date("2024-01-05"), Some(d));
        assert_eq!(parse_date("20240105"), Some(d));
        assert_eq!(parse_date("Jan 05, 2024"), None);
    }

    #[test]
    fn test_normalise_code() {
        assert_eq!(normalise_code("sz300750"), "300750");
        assert_eq!(normalise_code("300750.SZ"), "300750");
        assert_eq!(normalise_code(" 300001 "), "300001");
    }

    #[test]
    fn test_kline_row_to_bar() {
        let row = parse_kline_line(
            "2024-01-05,10.10,12.00,12.00,10.05,345678,401234567.00,19.40,20.00,2.00,8.12",
        );
        let bar = kline_row_to_bar(&row).unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(bar.open, 10.10);
        assert_eq!(bar.close, 12.0);
        assert_eq!(bar.high, 12.0);
        assert_eq!(bar.low, 10.05);
        assert_eq!(bar.volume, 345_678);
        assert_eq!(bar.turnover, 401_234_567.0);
        assert_eq!(bar.turnover_rate, Some(8.12));
    }

    #[test]
    fn test_zero_close_is_kept() {
        let rows = vec![
            parse_kline_line("2024-01-04,10,10,10,10,100,1000,0,0,0,1"),
            parse_kline_line("2024-01-05,0,0,0,0,0,0,0,0,0,-"),
            parse_kline_line("2024-01-08,10,10.5,10.6,9.9,100,1050,0,5,0.5,-"),
        ];
        let bars = clean_kline_rows("300001", rows).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[1].close, 0.0);
        assert_eq!(bars[2].turnover_rate, None);
    }

    #[test]
    fn test_unparseable_row_fails_the_series() {
        let rows = vec![
            parse_kline_line("2024-01-04,10,10,10,10,100,1000,0,0,0,1"),
            RawKlineRow {
                date: Some("not a date".into()),
                ..Default::default()
            },
        ];
        let err = clean_kline_rows("300001", rows).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("kline row 2"));
        assert!(msg.contains("not a date"));
    }

    #[test]
    fn test_missing_close_fails() {
        let row = parse_kline_line("2024-01-05,10.10");
        assert!(kline_row_to_bar(&row).is_err());
    }

    #[test]
    fn test_symbol_rows() {
        let rows = vec![
            RawSymbolRow {
                code: Some("300015".into()),
                name: Some(" 爱尔眼科 ".into()),
            },
            RawSymbolRow {
                code: None,
                name: Some("orphan".into()),
            },
        ];
        let symbols = clean_symbol_rows(rows);
        assert_eq!(symbols, vec![Symbol::new("300015", "爱尔眼科")]);
    }
}
