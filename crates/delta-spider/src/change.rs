use crate::crypto::coingecko::MarketChart;
use std::fmt;

/// A single percentage change cell.
///
/// `NotAvailable` means there was not enough history to look back over the
/// period; `ZeroBase` means the history was there but the reference value
/// was zero, so the percentage is undefined. Both encode as `N/A` in CSV, but
/// they are kept apart so a skipped calculation is never mistaken for `0.00`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Delta {
    Value(f64),
    NotAvailable,
    ZeroBase,
}

impl Delta {
    pub fn value(&self) -> Option<f64> {
        match self {
            Delta::Value(val) => Some(*val),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Delta::Value(_))
    }

    /// Round to the [`DECIMALS`] places written out, so a row holds exactly
    /// what its CSV cell carries.
    pub fn rounded(self) -> Self {
        match self {
            Delta::Value(val) => {
                let scale = 10f64.powi(DECIMALS as i32);
                let rounded = (val * scale).round() / scale;
                if rounded.is_finite() {
                    Delta::Value(rounded)
                } else {
                    Delta::ZeroBase
                }
            }
            other => other,
        }
    }

    // percentage change from `base` to `current`
    fn between(base: f64, current: f64) -> Self {
        if base == 0.0 {
            return Delta::ZeroBase;
        }
        let pct = (current - base) / base * 100.0;
        if pct.is_finite() {
            Delta::Value(pct)
        } else {
            Delta::ZeroBase
        }
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delta::Value(val) => write!(f, "{val:.prec$}", prec = DECIMALS),
            Delta::NotAvailable | Delta::ZeroBase => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// Sentinel written in place of a missing or undefined delta.
pub const NOT_AVAILABLE: &str = "N/A";

/// Decimal places kept for a percentage change.
pub const DECIMALS: usize = 2;

/// Price & volume change over one trailing period (in days).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodChange {
    pub period: u32,
    pub price: Delta,
    pub volume: Delta,
}

impl PeriodChange {
    pub fn not_available(period: u32) -> Self {
        Self {
            period,
            price: Delta::NotAvailable,
            volume: Delta::NotAvailable,
        }
    }

    pub fn rounded(self) -> Self {
        Self {
            period: self.period,
            price: self.price.rounded(),
            volume: self.volume.rounded(),
        }
    }
}

/// Calculate the price and volume change for a trailing `period`.
///
/// - price: last value against the value `period` points before it,
/// - volume: sum of the last `period` points against the sum of the
///   `period` points preceding them.
///
/// Series are expected in ascending time order, one point per day.
pub fn calculate(prices: &[f64], volumes: &[f64], period: u32) -> PeriodChange {
    let p = period as usize;
    if p == 0 || prices.len() < p {
        return PeriodChange::not_available(period);
    }

    let price = match prices.len().checked_sub(p + 1) {
        Some(start) => Delta::between(prices[start], prices[prices.len() - 1]),
        None => Delta::NotAvailable,
    };

    let volume = if volumes.len() >= 2 * p {
        let split = volumes.len() - p;
        let previous: f64 = volumes[split - p..split].iter().sum();
        let recent: f64 = volumes[split..].iter().sum();
        Delta::between(previous, recent)
    } else {
        Delta::NotAvailable
    };

    PeriodChange {
        period,
        price,
        volume,
    }
}

/// Calculate every period for one asset's market chart, in `periods` order.
pub fn calculate_all(chart: &MarketChart, periods: &[u32]) -> Vec<PeriodChange> {
    let prices = chart.price_values();
    let volumes = chart.volume_values();
    periods
        .iter()
        .map(|period| calculate(&prices, &volumes, *period))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(delta: Delta, expected: f64) {
        let val = delta.value().expect("delta value");
        assert!((val - expected).abs() < 1e-9, "{val} != {expected}");
    }

    #[test]
    fn price_change_looks_back_one_period() {
        let change = calculate(&[100.0, 110.0, 121.0], &[], 2);
        approx(change.price, 21.0);
        assert_eq!(change.price.to_string(), "21.00");
    }

    #[test]
    fn volume_change_compares_adjacent_windows() {
        let change = calculate(&[1.0, 1.0, 1.0, 1.0], &[10.0, 20.0, 30.0, 40.0], 2);
        approx(change.volume, 400.0 / 3.0);
        assert_eq!(change.volume.to_string(), "133.33");
    }

    #[test]
    fn short_series_is_not_available() {
        let change = calculate(&[1.0, 2.0], &[1.0, 2.0], 7);
        assert_eq!(change, PeriodChange::not_available(7));

        let change = calculate(&[], &[], 1);
        assert_eq!(change, PeriodChange::not_available(1));
    }

    #[test]
    fn zero_period_is_not_available() {
        let change = calculate(&[1.0, 2.0], &[1.0, 2.0], 0);
        assert_eq!(change, PeriodChange::not_available(0));
    }

    #[test]
    fn price_needs_one_point_before_the_window() {
        // exactly `period` points: no reference value yet
        let change = calculate(&[100.0, 110.0], &[1.0, 1.0, 1.0, 1.0], 2);
        assert_eq!(change.price, Delta::NotAvailable);
        approx(change.volume, 0.0);
    }

    #[test]
    fn volume_needs_two_windows() {
        let change = calculate(&[100.0, 110.0, 121.0], &[10.0, 20.0, 30.0], 2);
        approx(change.price, 21.0);
        assert_eq!(change.volume, Delta::NotAvailable);
    }

    #[test]
    fn zero_reference_is_zero_base() {
        let change = calculate(&[0.0, 5.0, 6.0], &[0.0, 0.0, 3.0, 4.0], 2);
        assert_eq!(change.price, Delta::ZeroBase);
        assert_eq!(change.volume, Delta::ZeroBase);
        assert_eq!(change.price.to_string(), NOT_AVAILABLE);
        assert!(!change.volume.is_available());
    }

    #[test]
    fn only_the_trailing_points_count() {
        let prices = [1.0, 1.0, 1.0, 50.0, 100.0];
        let volumes = [999.0, 999.0, 10.0, 10.0, 20.0, 20.0];
        let change = calculate(&prices, &volumes, 1);
        approx(change.price, 100.0);
        approx(change.volume, 0.0);

        let change = calculate(&prices, &volumes, 2);
        approx(change.price, 9900.0);
        approx(change.volume, 100.0);
    }

    #[test]
    fn rounding_matches_the_written_cell() {
        let prices = [100.0, 110.0, 121.0, 130.0];
        let change = calculate(&prices, &[10.0, 20.0, 30.0, 40.0], 2).rounded();
        assert_eq!(change.price, Delta::Value(18.18));
        assert_eq!(change.volume, Delta::Value(133.33));
        assert_eq!(change.price.to_string().parse::<f64>().unwrap(), 18.18);

        assert_eq!(Delta::Value(-0.004).rounded().to_string(), "-0.00");
        assert_eq!(Delta::Value(f64::MAX).rounded(), Delta::ZeroBase);
        assert_eq!(Delta::NotAvailable.rounded(), Delta::NotAvailable);
    }

    #[test]
    fn negative_change() {
        let change = calculate(&[200.0, 150.0, 100.0], &[40.0, 30.0, 20.0, 10.0], 2);
        approx(change.price, -50.0);
        approx(change.volume, -100.0 * 40.0 / 70.0);
        assert_eq!(change.volume.to_string(), "-57.14");
    }
}
