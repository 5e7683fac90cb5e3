use chrono::{DateTime, Utc};

/// Configured asset lists.
pub mod assets;

/// [CoinGecko Pro API](https://docs.coingecko.com/reference/coins-id-market-chart)
pub mod coingecko;

/// [Spot On Chain API](https://docs.spotonchain.ai), CEX trading volume per token.
pub mod spotonchain;

/// One observation of a metric (price or volume) at a point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesPoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Ordered observations of one metric for one asset, ascending by time.
pub type Series = Vec<SeriesPoint>;

/// Convert an epoch timestamp in milliseconds, as read from a JSON payload.
///
/// Payloads write epochs both as integers and as floats (`1719792000` or
/// `1719792000.0`), so they are read as `f64`; non-finite or out of range
/// values give `None`.
pub(crate) fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_millis() {
        let time = from_epoch_millis(1_719_792_000_000.0).unwrap();
        assert_eq!(time.to_rfc3339(), "2024-07-01T00:00:00+00:00");
        let time = from_epoch_millis(1_719_792_000_500.4).unwrap();
        assert_eq!(time.timestamp_millis(), 1_719_792_000_500);
        assert!(from_epoch_millis(f64::NAN).is_none());
        assert!(from_epoch_millis(1e300).is_none());
    }
}
