pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::ProviderConfig;
use crate::models::{Adjustment, DailyBar, ScanWindow, Symbol};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use self::cleaner::{clean_kline_rows, clean_symbol_rows};
use self::http_client::HttpClient;
use self::parsers::{KlineResponse, ListingResponse, parse_klines, parse_listing};

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable data source abstraction.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Listed symbols. Sources may use `code_prefix` to narrow the request;
    /// callers still filter the result.
    async fn fetch_symbol_list(&self, code_prefix: Option<&str>) -> Result<Vec<Symbol>>;

    /// Daily bars for `code` inside `window`, in any order.
    async fn fetch_daily_bars(
        &self,
        code: &str,
        window: &ScanWindow,
        adjustment: Adjustment,
    ) -> Result<Vec<DailyBar>>;
}

// ── Eastmoney quote API ───────────────────────────────────────────────────────

/// Market filter for the Shenzhen ChiNext board.
const CHINEXT_FILTER: &str = "m:0 t:80";
/// Market filter for every Shanghai and Shenzhen A share.
const ALL_A_FILTER: &str = "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23";
const MAX_LISTING_PAGES: u32 = 100;

pub struct EastmoneyClient {
    client: HttpClient,
    list_url: Url,
    kline_url: Url,
    page_size: u32,
}

impl EastmoneyClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            list_url: Url::parse(&config.list_url)
                .with_context(|| format!("Invalid list_url {:?}", config.list_url))?,
            kline_url: Url::parse(&config.kline_url)
                .with_context(|| format!("Invalid kline_url {:?}", config.kline_url))?,
            page_size: config.page_size.max(1),
        })
    }

    fn listing_url(&self, page: u32, market_filter: &str) -> Url {
        let mut url = self.list_url.clone();
        url.query_pairs_mut()
            .append_pair("pn", &page.to_string())
            .append_pair("pz", &self.page_size.to_string())
            .append_pair("po", "1")
            .append_pair("np", "1")
            .append_pair("fltt", "2")
            .append_pair("invt", "2")
            .append_pair("fid", "f12")
            .append_pair("fs", market_filter)
            .append_pair("fields", "f12,f14");
        url
    }

    fn kline_url(&self, code: &str, window: &ScanWindow, adjustment: Adjustment) -> Url {
        let mut url = self.kline_url.clone();
        url.query_pairs_mut()
            .append_pair("secid", &secid(code))
            .append_pair("klt", "101")
            .append_pair("fqt", fqt(adjustment))
            .append_pair("beg", &window.start.format("%Y%m%d").to_string())
            .append_pair("end", &window.end.format("%Y%m%d").to_string())
            .append_pair("fields1", "f1,f2,f3,f4,f5,f6")
            .append_pair("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61");
        url
    }
}

/// `<market>.<code>`: 1 = Shanghai, 0 = Shenzhen.
fn secid(code: &str) -> String {
    let market = if code.starts_with('6') { 1 } else { 0 };
    format!("{}.{}", market, code)
}

fn fqt(adjustment: Adjustment) -> &'static str {
    match adjustment {
        Adjustment::None => "0",
        Adjustment::Forward => "1",
        Adjustment::Backward => "2",
    }
}

fn market_filter(code_prefix: Option<&str>) -> &'static str {
    match code_prefix {
        Some(p) if p.starts_with("30") => CHINEXT_FILTER,
        _ => ALL_A_FILTER,
    }
}

#[async_trait]
impl MarketDataSource for EastmoneyClient {
    async fn fetch_symbol_list(&self, code_prefix: Option<&str>) -> Result<Vec<Symbol>> {
        let filter = market_filter(code_prefix);
        let mut all_symbols = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.listing_url(page, filter);
            debug!("Fetching listing page {}", page);

            let resp: ListingResponse = self
                .client
                .get_json(&url)
                .await
                .with_context(|| format!("Failed to fetch listing page {}", page))?;

            let (total, raw_rows) = parse_listing(resp);
            if raw_rows.is_empty() {
                debug!("Empty page {}, stopping pagination", page);
                break;
            }

            let symbols = clean_symbol_rows(raw_rows);
            debug!("  Page {}: {} symbols", page, symbols.len());
            all_symbols.extend(symbols);

            if all_symbols.len() >= total {
                break;
            }

            page += 1;
            if page > MAX_LISTING_PAGES {
                warn!("Reached page limit ({}), stopping", MAX_LISTING_PAGES);
                break;
            }
        }

        info!("Total symbols discovered: {}", all_symbols.len());
        Ok(all_symbols)
    }

    async fn fetch_daily_bars(
        &self,
        code: &str,
        window: &ScanWindow,
        adjustment: Adjustment,
    ) -> Result<Vec<DailyBar>> {
        let url = self.kline_url(code, window, adjustment);

        let resp: KlineResponse = self
            .client
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to fetch daily bars for {}", code))?;

        let raw_rows = parse_klines(resp);
        if raw_rows.is_empty() {
            debug!("{}: no bars between {} and {}", code, window.start, window.end);
        }

        clean_kline_rows(code, raw_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client() -> EastmoneyClient {
        EastmoneyClient::new(&ProviderConfig::default()).unwrap()
    }

    #[test]
    fn test_secid() {
        assert_eq!(secid("300750"), "0.300750");
        assert_eq!(secid("600519"), "1.600519");
    }

    #[test]
    fn test_kline_url() {
        let window = ScanWindow {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        };
        let url = client().kline_url("300001", &window, Adjustment::Forward);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());

        assert_eq!(get("secid"), Some("0.300001"));
        assert_eq!(get("fqt"), Some("1"));
        assert_eq!(get("beg"), Some("20240101"));
        assert_eq!(get("end"), Some("20240131"));
        assert_eq!(get("klt"), Some("101"));
    }

    #[test]
    fn test_listing_url_uses_chinext_filter() {
        let c = client();
        let url = c.listing_url(2, market_filter(Some("300")));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("fs".to_string(), "m:0 t:80".to_string())));
        assert!(pairs.contains(&("pn".to_string(), "2".to_string())));
        assert_eq!(market_filter(None), ALL_A_FILTER);
    }
}
