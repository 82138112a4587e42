//! Chart-data HTTP provider.
//!
//! Calls `GET {base}/api/chart-data/{SYMBOL}/{timeframe}?limit=N` on the bar
//! store's API. The endpoint only understands `limit`, so `start`/`end` are
//! applied client-side after the response is parsed.

use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use super::provider::{BarProvider, BarQuery, DataError, DataSource, FetchResult, RawBar};

/// Server default when the query carries no limit.
pub const DEFAULT_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChartDataResponse {
    Bars {
        symbol: String,
        #[allow(dead_code)]
        timeframe: String,
        count: usize,
        bars: Vec<ChartBar>,
    },
    Error {
        error: String,
    },
}

#[derive(Debug, Deserialize)]
struct ChartBar {
    time: i64,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

pub struct HttpBarProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpBarProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build the chart-data URL for a query.
    pub fn chart_url(&self, query: &BarQuery) -> String {
        format!(
            "{}/api/chart-data/{}/{}?limit={}",
            self.base_url,
            query.symbol.to_uppercase(),
            query.timeframe.as_str(),
            query.limit.unwrap_or(DEFAULT_LIMIT)
        )
    }
}

impl BarProvider for HttpBarProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch(&self, query: &BarQuery) -> Result<FetchResult, DataError> {
        let url = self.chart_url(query);
        debug!(%url, "fetching chart data");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::Remote(format!("HTTP {status} from {url}")));
        }
        let body = resp
            .text()
            .map_err(|e| DataError::Network(e.to_string()))?;

        let bars = parse_chart_data(&body, query)?;
        Ok(FetchResult {
            symbol: query.symbol.to_uppercase(),
            timeframe: query.timeframe,
            bars: query.apply(bars),
            source: DataSource::Http,
        })
    }
}

/// Parse a chart-data response body into raw bars.
fn parse_chart_data(body: &str, query: &BarQuery) -> Result<Vec<RawBar>, DataError> {
    let parsed: ChartDataResponse =
        serde_json::from_str(body).map_err(|e| DataError::ResponseFormat(e.to_string()))?;

    match parsed {
        ChartDataResponse::Error { error } => Err(DataError::Remote(error)),
        ChartDataResponse::Bars {
            symbol,
            count,
            bars,
            ..
        } => {
            if bars.len() != count {
                return Err(DataError::ResponseFormat(format!(
                    "count {count} does not match {} bars for {symbol}",
                    bars.len()
                )));
            }
            if bars.is_empty() {
                return Err(DataError::SymbolNotFound {
                    symbol,
                    timeframe: query.timeframe,
                });
            }
            bars.into_iter()
                .map(|b| {
                    let timestamp = DateTime::from_timestamp(b.time, 0).ok_or_else(|| {
                        DataError::ResponseFormat(format!("invalid time {}", b.time))
                    })?;
                    Ok(RawBar {
                        timestamp,
                        open: b.open,
                        high: b.high,
                        low: b.low,
                        close: b.close,
                        volume: b.volume,
                    })
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::Timeframe;

    fn query() -> BarQuery {
        BarQuery::new("xauusd", Timeframe::Min15)
    }

    #[test]
    fn url_uses_uppercase_symbol_and_default_limit() {
        let provider = HttpBarProvider::new("http://localhost:8000/").unwrap();
        assert_eq!(
            provider.chart_url(&query()),
            "http://localhost:8000/api/chart-data/XAUUSD/15min?limit=1000"
        );
    }

    #[test]
    fn parses_bars_response() {
        let body = r#"{"symbol":"XAUUSD","timeframe":"15min","count":2,"bars":[
            {"time":1704067200,"open":2060.1,"high":2062.0,"low":2059.5,"close":2061.3,"volume":120},
            {"time":1704068100,"open":2061.3,"high":2063.2,"low":2060.9,"close":null,"volume":98}
        ]}"#;
        let bars = parse_chart_data(body, &query()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp.timestamp(), 1_704_067_200);
        assert_eq!(bars[0].volume, Some(120.0));
        assert_eq!(bars[1].close, None);
    }

    #[test]
    fn error_body_becomes_remote_error() {
        let body = r#"{"error":"Invalid timeframe: 2H","valid_timeframes":["1min"]}"#;
        let err = parse_chart_data(body, &query()).unwrap_err();
        assert!(matches!(err, DataError::Remote(msg) if msg.contains("Invalid timeframe")));
    }

    #[test]
    fn empty_bars_is_symbol_not_found() {
        let body = r#"{"symbol":"ZZZ","timeframe":"15min","count":0,"bars":[]}"#;
        let err = parse_chart_data(body, &query()).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn garbage_is_format_error() {
        let err = parse_chart_data("[1,2,3]", &query()).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormat(_)));
    }
}
