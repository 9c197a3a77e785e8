//! Report writers: raw events plus summary tables.
//!
//! A writer is always called, even with zero events, and must leave an
//! artifact behind with an explicit "no records found" marker in that case.

pub mod preview;

use crate::aggregator::SummaryReport;
use crate::models::LimitUpEvent;
use crate::utils::{fmt_opt_pct, round2};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const EVENTS_FILE: &str = "limit_up_events.csv";
pub const OVERALL_FILE: &str = "summary_overall.csv";
pub const BY_SYMBOL_FILE: &str = "summary_by_symbol.csv";
pub const BY_DATE_FILE: &str = "summary_by_date.csv";

pub const NO_RECORDS: &str = "no records found";

/// Turnover is reported in units of 100 million (亿) as well as raw CNY.
const TURNOVER_DISPLAY_UNIT: f64 = 100_000_000.0;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write CSV {path:?}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("cannot serialize report for {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Persists one scan's results. Returns the path of the written artifact.
pub trait ReportWriter: Send + Sync {
    fn write(
        &self,
        events: &[LimitUpEvent],
        summary: &SummaryReport,
    ) -> Result<PathBuf, ReportError>;
}

pub fn turnover_in_display_unit(turnover: f64) -> f64 {
    round2(turnover / TURNOVER_DISPLAY_UNIT)
}

fn ensure_dir(path: &Path) -> Result<(), ReportError> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| ReportError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

// ── Table rows ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EventRow<'a> {
    code: &'a str,
    name: &'a str,
    date: NaiveDate,
    close_price: f64,
    previous_close: f64,
    percent_change: f64,
    open: f64,
    high: f64,
    low: f64,
    volume: u64,
    turnover: f64,
    turnover_rate: Option<f64>,
}

impl<'a> From<&'a LimitUpEvent> for EventRow<'a> {
    fn from(e: &'a LimitUpEvent) -> Self {
        Self {
            code: &e.symbol.code,
            name: &e.symbol.name,
            date: e.date,
            close_price: e.close_price,
            previous_close: e.previous_close,
            percent_change: e.percent_change,
            open: e.open,
            high: e.high,
            low: e.low,
            volume: e.volume,
            turnover: e.turnover,
            turnover_rate: e.turnover_rate,
        }
    }
}

const EVENT_HEADERS: [&str; 12] = [
    "code",
    "name",
    "date",
    "close_price",
    "previous_close",
    "percent_change",
    "open",
    "high",
    "low",
    "volume",
    "turnover",
    "turnover_rate",
];

#[derive(Debug, Serialize)]
struct SymbolRow<'a> {
    code: &'a str,
    name: &'a str,
    count: usize,
    max_pct: f64,
    mean_pct: f64,
    min_pct: f64,
    total_volume: u64,
}

const SYMBOL_HEADERS: [&str; 7] = [
    "code",
    "name",
    "count",
    "max_pct",
    "mean_pct",
    "min_pct",
    "total_volume",
];

/// Overall statistics as `(section, item, value)` rows.
fn overall_rows(summary: &SummaryReport) -> Vec<(&'static str, &'static str, String)> {
    let o = &summary.overall;
    let pct = o.percent;
    let mut rows = Vec::new();

    if summary.is_empty() {
        rows.push(("overall", "status", NO_RECORDS.to_string()));
    }
    rows.push(("overall", "total_records", o.total_records.to_string()));
    rows.push(("overall", "distinct_symbols", o.distinct_symbols.to_string()));
    rows.push(("overall", "mean_pct", fmt_opt_pct(pct.map(|p| p.mean))));
    rows.push(("overall", "max_pct", fmt_opt_pct(pct.map(|p| p.max))));
    rows.push(("overall", "min_pct", fmt_opt_pct(pct.map(|p| p.min))));
    rows.push((
        "overall",
        "total_turnover_100m",
        format!("{:.2}", turnover_in_display_unit(o.total_turnover)),
    ));
    rows
}

// ── CSV bundle ────────────────────────────────────────────────────────────────

/// Writes one CSV file per table into `dir`.
pub struct CsvReportWriter {
    dir: PathBuf,
}

impl CsvReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn open(&self, name: &str) -> Result<(PathBuf, csv::Writer<fs::File>), ReportError> {
        let path = self.dir.join(name);
        let wtr = csv::Writer::from_path(&path).map_err(|source| ReportError::Csv {
            path: path.clone(),
            source,
        })?;
        Ok((path, wtr))
    }

    fn write_events(&self, events: &[LimitUpEvent]) -> Result<(), ReportError> {
        let (path, mut wtr) = self.open(EVENTS_FILE)?;
        let csv_err = |source| ReportError::Csv {
            path: path.clone(),
            source,
        };

        // serialize() only emits headers with the first row
        if events.is_empty() {
            wtr.write_record(EVENT_HEADERS).map_err(csv_err)?;
        }
        for e in events {
            wtr.serialize(EventRow::from(e)).map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })
    }

    fn write_overall(&self, summary: &SummaryReport) -> Result<(), ReportError> {
        let (path, mut wtr) = self.open(OVERALL_FILE)?;
        let csv_err = |source| ReportError::Csv {
            path: path.clone(),
            source,
        };

        wtr.write_record(["section", "item", "value"]).map_err(csv_err)?;
        for (section, item, value) in overall_rows(summary) {
            wtr.write_record([section, item, value.as_str()])
                .map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })
    }

    fn write_by_symbol(&self, summary: &SummaryReport) -> Result<(), ReportError> {
        let (path, mut wtr) = self.open(BY_SYMBOL_FILE)?;
        let csv_err = |source| ReportError::Csv {
            path: path.clone(),
            source,
        };

        if summary.by_symbol.is_empty() {
            wtr.write_record(SYMBOL_HEADERS).map_err(csv_err)?;
        }
        for s in &summary.by_symbol {
            wtr.serialize(SymbolRow {
                code: &s.code,
                name: &s.name,
                count: s.count,
                max_pct: s.percent.max,
                mean_pct: s.percent.mean,
                min_pct: s.percent.min,
                total_volume: s.total_volume,
            })
            .map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })
    }

    fn write_by_date(&self, summary: &SummaryReport) -> Result<(), ReportError> {
        let (path, mut wtr) = self.open(BY_DATE_FILE)?;
        let csv_err = |source| ReportError::Csv {
            path: path.clone(),
            source,
        };

        wtr.write_record(["date", "count"]).map_err(csv_err)?;
        for d in &summary.by_date {
            wtr.write_record([d.date.to_string(), d.count.to_string()])
                .map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })
    }
}

impl ReportWriter for CsvReportWriter {
    fn write(
        &self,
        events: &[LimitUpEvent],
        summary: &SummaryReport,
    ) -> Result<PathBuf, ReportError> {
        ensure_dir(&self.dir)?;

        self.write_events(events)?;
        self.write_overall(summary)?;
        self.write_by_symbol(summary)?;
        self.write_by_date(summary)?;

        info!("Report written to {:?}", self.dir);
        Ok(self.dir.clone())
    }
}

// ── JSON document ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    status: &'static str,
    total_turnover_100m: f64,
    events: &'a [LimitUpEvent],
    summary: &'a SummaryReport,
}

/// Writes a single pretty-printed JSON document.
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut path = path.into();
        if path.extension().is_none() {
            path.set_extension("json");
        }
        Self { path }
    }
}

impl ReportWriter for JsonReportWriter {
    fn write(
        &self,
        events: &[LimitUpEvent],
        summary: &SummaryReport,
    ) -> Result<PathBuf, ReportError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }

        let doc = JsonReport {
            status: if events.is_empty() { "no_records" } else { "ok" },
            total_turnover_100m: turnover_in_display_unit(summary.overall.total_turnover),
            events,
            summary,
        };
        let body = serde_json::to_string_pretty(&doc).map_err(|source| ReportError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, body).map_err(|source| ReportError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!("Report written to {:?}", self.path);
        Ok(self.path.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::summarize;
    use crate::models::Symbol;

    fn events() -> Vec<LimitUpEvent> {
        let mk = |code: &str, d: u32, pct: f64| LimitUpEvent {
            symbol: Symbol::new(code, "测试"),
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            close_price: 12.0,
            previous_close: 10.0,
            percent_change: pct,
            open: 10.0,
            high: 12.0,
            low: 9.9,
            volume: 1000,
            turnover: 150_000_000.0,
            turnover_rate: Some(4.2),
        };
        vec![mk("300001", 9, 20.0), mk("300002", 8, 19.5)]
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_csv_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report");
        let events = events();

        let written = CsvReportWriter::new(&out)
            .write(&events, &summarize(&events))
            .unwrap();
        assert_eq!(written, out);

        let ev = read(&out.join(EVENTS_FILE));
        let mut lines = ev.lines();
        assert_eq!(lines.next(), Some(EVENT_HEADERS.join(",").as_str()));
        assert!(lines.next().unwrap().starts_with("300001,测试,2024-01-09,12.0,10.0,20.0"));

        let overall = read(&out.join(OVERALL_FILE));
        assert!(overall.contains("overall,total_records,2"));
        assert!(overall.contains("overall,mean_pct,19.75"));
        assert!(overall.contains("overall,total_turnover_100m,3.00"));
        assert!(!overall.contains(NO_RECORDS));

        let by_symbol = read(&out.join(BY_SYMBOL_FILE));
        assert!(by_symbol.starts_with("code,name,count,max_pct,mean_pct,min_pct,total_volume\n"));
        assert!(by_symbol.contains("300001,测试,1,20.0,20.0,20.0,1000"));

        let by_date = read(&out.join(BY_DATE_FILE));
        assert_eq!(by_date, "date,count\n2024-01-09,1\n2024-01-08,1\n");
    }

    #[test]
    fn test_csv_bundle_without_events_has_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        CsvReportWriter::new(dir.path())
            .write(&[], &summarize(&[]))
            .unwrap();

        let ev = read(&dir.path().join(EVENTS_FILE));
        assert_eq!(ev.trim_end(), EVENT_HEADERS.join(","));

        let overall = read(&dir.path().join(OVERALL_FILE));
        assert!(overall.contains("overall,status,no records found"));
        assert!(overall.contains("overall,mean_pct,n/a"));
        assert!(overall.contains("overall,total_records,0"));

        assert_eq!(
            read(&dir.path().join(BY_SYMBOL_FILE)),
            "code,name,count,max_pct,mean_pct,min_pct,total_volume\n"
        );
    }

    #[test]
    fn test_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let events = events();
        let path = JsonReportWriter::new(dir.path().join("scan"))
            .write(&events, &summarize(&events))
            .unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));

        let v: serde_json::Value = serde_json::from_str(&read(&path)).unwrap();
        assert_eq!(v["status"], "ok");
        assert_eq!(v["events"].as_array().unwrap().len(), 2);
        assert_eq!(v["summary"]["overall"]["total_records"], 2);
        assert_eq!(v["summary"]["by_symbol"][0]["code"], "300001");
    }

    #[test]
    fn test_json_report_without_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = JsonReportWriter::new(dir.path().join("empty.json"))
            .write(&[], &summarize(&[]))
            .unwrap();

        let v: serde_json::Value = serde_json::from_str(&read(&path)).unwrap();
        assert_eq!(v["status"], "no_records");
        assert!(v["summary"]["overall"]["percent"].is_null());
    }

    #[test]
    fn test_write_failure_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        fs::write(&blocker, "not a directory").unwrap();

        let err = CsvReportWriter::new(blocker.join("report"))
            .write(&[], &summarize(&[]))
            .unwrap_err();
        assert!(matches!(err, ReportError::CreateDir { .. }));
        assert!(err.to_string().contains("taken"));
    }
}
