use super::{from_epoch_millis, Series, SeriesPoint};
use crate::api::VolumeSource;
use crate::error::FetchError;
use crate::http::*;
use serde::Deserialize;
use tracing::{debug, trace};

// cex volume = `https://api.spotonchain.com/api/smart_trader/get_cex_volume`, per token

pub const DEFAULT_URL: &str = "https://api.spotonchain.com/api";

/// Days of CEX volume requested per token.
pub const DEFAULT_DAYS: u32 = 30;

const SUCCESS: &str = "success";

/// CEX volume client for the Spot On Chain API.
#[derive(Clone, Debug)]
pub struct SpotOnChain {
    http_client: HttpClient,
    base_url: String,
    days: u32,
}

impl SpotOnChain {
    pub fn new(http_client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            days: DEFAULT_DAYS,
        }
    }

    /// Build from `SPOTONCHAIN_URL` (optional base url).
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let base_url = var_opt("SPOTONCHAIN_URL").unwrap_or_else(|| DEFAULT_URL.to_string());
        Ok(Self::new(crate::std_client_build()?, base_url))
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    async fn fetch(&self, token: &str) -> Result<Series, FetchError> {
        let url = format!("{}/smart_trader/get_cex_volume", self.base_url);
        let days = self.days.to_string();

        trace!("fetching Spot On Chain CEX volume for {token}");
        let response = self
            .http_client
            .get(url)
            .query(&[("token", token), ("days", days.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        trace!("deserializing Spot On Chain CEX volume for {token}");
        let series = parse_cex_volume(&body)?;
        debug!("Spot On Chain CEX volume for {token}: {} points", series.len());
        Ok(series)
    }
}

impl VolumeSource for SpotOnChain {
    async fn cex_volume(&self, token: &str) -> Result<Series, FetchError> {
        self.fetch(token).await
    }
}

/// Parse a CEX volume envelope, rejecting any `result` other than `"success"`.
pub fn parse_cex_volume(body: &[u8]) -> Result<Series, FetchError> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    if envelope.result != SUCCESS {
        return Err(FetchError::Unsuccessful {
            result: envelope.result,
        });
    }

    let data = envelope
        .data
        .ok_or_else(|| FetchError::Malformed("missing field `data`".to_string()))?;
    data.volume_data
        .into_iter()
        .map(|RawPoint(secs, value)| {
            let time = from_epoch_millis(secs * 1000.0)
                .ok_or_else(|| FetchError::Malformed(format!("timestamp out of range: {secs}")))?;
            Ok(SeriesPoint { time, value })
        })
        .collect()
}

// cex volume
// ----------------------------------------------------------------
// {
//   "result": "success",
//   "data": {
//     "volume_data": [
//       [1719792000, 1234567.89],
//       [1719878400, 2345678.9],
//       ...
//     ]
//   }
// }
#[derive(Debug, Deserialize)]
struct Envelope {
    result: String,
    data: Option<VolumeData>,
}

#[derive(Debug, Deserialize)]
struct VolumeData {
    volume_data: Vec<RawPoint>,
}

// `[timestamp secs, volume]`, the timestamp may come as a float
#[derive(Debug, Deserialize)]
struct RawPoint(f64, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_success() {
        let body = br#"{"result": "success", "data": {"volume_data": [[1719792000, 1.5], [1719878400, 2.5]]}}"#;
        let series = parse_cex_volume(body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].time.format("%Y-%m-%d").to_string(), "2024-07-01");
        assert_eq!(series[1].value, 2.5);
    }

    #[test]
    fn float_timestamps() {
        let body = br#"{"result": "success", "data": {"volume_data": [[1719792000.0, 1.5], [1719878400, 2.5]]}}"#;
        let series = parse_cex_volume(body).unwrap();
        let dates: Vec<String> = series
            .iter()
            .map(|point| point.time.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(dates, vec!["2024-07-01", "2024-07-02"]);
        assert_eq!(series[0].time.timestamp(), 1_719_792_000);

        let body = br#"{"result": "success", "data": {"volume_data": [[1e300, 1.5]]}}"#;
        assert!(matches!(
            parse_cex_volume(body).unwrap_err(),
            FetchError::Malformed(_)
        ));
    }

    #[test]
    fn unsuccessful_result() {
        let body = br#"{"result": "error", "data": null}"#;
        match parse_cex_volume(body).unwrap_err() {
            FetchError::Unsuccessful { result } => assert_eq!(result, "error"),
            err => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn missing_volume_data() {
        let body = br#"{"result": "success", "data": {}}"#;
        assert!(matches!(
            parse_cex_volume(body).unwrap_err(),
            FetchError::Malformed(_)
        ));

        let body = br#"{"result": "success"}"#;
        assert!(matches!(
            parse_cex_volume(body).unwrap_err(),
            FetchError::Malformed(_)
        ));
    }
}
