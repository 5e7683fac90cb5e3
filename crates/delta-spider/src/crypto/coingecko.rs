use super::assets::Asset;
use super::{from_epoch_millis, Series, SeriesPoint};
use crate::api::MarketSource;
use crate::error::FetchError;
use crate::http::*;
use serde::Deserialize;
use tracing::{debug, trace};

// market chart = `https://pro-api.coingecko.com/api/v3/coins/{id}/market_chart`, per coin
//
// the free tier shares the same paths under `https://api.coingecko.com/api/v3`

pub const DEFAULT_URL: &str = "https://pro-api.coingecko.com/api/v3";
pub const API_KEY_HEADER: &str = "x-cg-pro-api-key";

/// Days of daily history requested per coin.
pub const DEFAULT_DAYS: u32 = 180;

/////////////////////////////////////////////////////////////////////////////////
// core
/////////////////////////////////////////////////////////////////////////////////

/// Market chart client for the CoinGecko API.
#[derive(Clone, Debug)]
pub struct CoinGecko {
    http_client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    days: u32,
    drop_partial: bool,
}

impl CoinGecko {
    pub fn new(http_client: HttpClient, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            days: DEFAULT_DAYS,
            drop_partial: true,
        }
    }

    /// Build from `COINGECKO_API` (optional key) and `COINGECKO_URL` (optional base url).
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let base_url = var_opt("COINGECKO_URL").unwrap_or_else(|| DEFAULT_URL.to_string());
        let api_key = var_opt("COINGECKO_API");
        Ok(Self::new(crate::std_client_build()?, base_url, api_key))
    }

    /// Number of days of history to request.
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    /// Whether to drop the trailing (still in progress) day from each series.
    pub fn with_drop_partial(mut self, drop_partial: bool) -> Self {
        self.drop_partial = drop_partial;
        self
    }

    fn url(&self, coin_id: &str) -> String {
        format!("{}/coins/{coin_id}/market_chart", self.base_url)
    }

    async fn fetch(&self, coin_id: &str) -> Result<MarketChart, FetchError> {
        let days = self.days.to_string();
        let mut request = self.http_client.get(self.url(coin_id)).query(&[
            ("vs_currency", "usd"),
            ("days", days.as_str()),
            ("interval", "daily"),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        trace!("fetching CoinGecko market chart for {coin_id}");
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        trace!("deserializing CoinGecko market chart for {coin_id}");
        let chart = parse_market_chart(&body, self.drop_partial)?;
        debug!(
            "CoinGecko market chart for {coin_id}: {} prices, {} volumes",
            chart.prices.len(),
            chart.total_volumes.len()
        );
        Ok(chart)
    }
}

impl MarketSource for CoinGecko {
    async fn market_chart(&self, asset: &Asset) -> Result<MarketChart, FetchError> {
        self.fetch(&asset.coin_id).await
    }
}

/// Parse a market chart body; `drop_partial` removes the last point of each series.
pub fn parse_market_chart(body: &[u8], drop_partial: bool) -> Result<MarketChart, FetchError> {
    let raw: RawMarketChart = serde_json::from_slice(body)?;
    let mut prices = into_series(raw.prices)?;
    let mut total_volumes = into_series(raw.total_volumes)?;
    if drop_partial {
        prices.pop();
        total_volumes.pop();
    }
    Ok(MarketChart {
        prices,
        total_volumes,
    })
}

fn into_series(points: Vec<RawPoint>) -> Result<Series, FetchError> {
    points
        .into_iter()
        .map(|RawPoint(millis, value)| {
            let time = from_epoch_millis(millis)
                .ok_or_else(|| FetchError::Malformed(format!("timestamp out of range: {millis}")))?;
            Ok(SeriesPoint { time, value })
        })
        .collect()
}

/////////////////////////////////////////////////////////////////////////////////
// endpoints
/////////////////////////////////////////////////////////////////////////////////
//
// market chart
// ----------------------------------------------------------------
// {
//   "prices": [
//     [1711843200000, 69702.3087473573],
//     [1711929600000, 71246.9514406015],
//     ...
//   ],
//   "market_caps": [ ... ],
//   "total_volumes": [
//     [1711843200000, 16408802301.8374],
//     [1711929600000, 19723005998.215],
//     ...
//   ]
// }

#[derive(Debug, Deserialize)]
struct RawMarketChart {
    prices: Vec<RawPoint>,
    total_volumes: Vec<RawPoint>,
}

// `[timestamp millis, value]`, the timestamp may come as a float
#[derive(Debug, Deserialize)]
struct RawPoint(f64, f64);

/// Daily price & volume series for one coin.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarketChart {
    pub prices: Series,
    pub total_volumes: Series,
}

impl MarketChart {
    pub fn price_values(&self) -> Vec<f64> {
        self.prices.iter().map(|point| point.value).collect()
    }

    pub fn volume_values(&self) -> Vec<f64> {
        self.total_volumes.iter().map(|point| point.value).collect()
    }
}
