use crate::models::{RawKlineRow, RawSymbolRow};
use serde::Deserialize;

// ── Listing endpoint (clist) ──────────────────────────────────────────────────

/// `{"rc":0,"data":{"total":1371,"diff":[{"f12":"300001","f14":"..."}]}}`
///
/// `data` is `null` once paging runs past the last page.
#[derive(Debug, Deserialize)]
pub struct ListingResponse {
    pub data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    pub total: usize,
    #[serde(default)]
    pub diff: Vec<ListingItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListingItem {
    #[serde(rename = "f12")]
    pub code: Option<String>,
    #[serde(rename = "f14")]
    pub name: Option<String>,
}

pub fn parse_listing(resp: ListingResponse) -> (usize, Vec<RawSymbolRow>) {
    let Some(data) = resp.data else {
        return (0, vec![]);
    };
    let rows = data
        .diff
        .into_iter()
        .map(|item| RawSymbolRow {
            code: item.code,
            name: item.name,
        })
        .collect();
    (data.total, rows)
}

// ── History endpoint (kline) ──────────────────────────────────────────────────

/// `{"rc":0,"data":{"code":"300001","name":"...","klines":["2024-01-02,..."]}}`
///
/// `data` is `null` for unknown codes and for windows without trading days.
#[derive(Debug, Deserialize)]
pub struct KlineResponse {
    pub data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
pub struct KlineData {
    #[serde(default)]
    pub klines: Vec<String>,
}

/// Split one kline line. Layout (fields2=f51..f61):
/// date | open | close | high | low | volume | turnover | amplitude | pct | change | turnover rate
pub fn parse_kline_line(line: &str) -> RawKlineRow {
    let cells: Vec<&str> = line.split(',').map(str::trim).collect();
    let cell = |i: usize| cells.get(i).map(|s| s.to_string());

    RawKlineRow {
        date: cell(0),
        open: cell(1),
        close: cell(2),
        high: cell(3),
        low: cell(4),
        volume: cell(5),
        turnover: cell(6),
        turnover_rate: cell(10),
    }
}

pub fn parse_klines(resp: KlineResponse) -> Vec<RawKlineRow> {
    resp.data
        .map(|d| d.klines.iter().map(|l| parse_kline_line(l)).collect())
        .unwrap_or_default()
}
