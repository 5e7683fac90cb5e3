use crate::api::{MarketSource, VolumeSource};
use crate::change::{calculate_all, PeriodChange};
use crate::crypto::assets::Asset;
use crate::tui::Progress;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// Default look-back periods, in days.
pub const DEFAULT_PERIODS: [u32; 4] = [7, 30, 60, 90];

/// One asset's price & volume changes, as of `date`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub coin_id: String,
    pub changes: Vec<PeriodChange>,
}

/// Change records sharing one set of periods; the periods define the columns.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeTable {
    pub periods: Vec<u32>,
    pub records: Vec<ChangeRecord>,
}

/// One day of CEX trading volume for one token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub token: String,
    pub date: NaiveDate,
    pub volume: f64,
}

/// The outcome of a best-effort collection: the rows that were built, and
/// the items that were skipped because their fetch failed.
#[derive(Clone, Debug, PartialEq)]
pub struct Build<T> {
    pub rows: T,
    pub skipped: Vec<String>,
}

impl<T> Build<T> {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Fetch every asset in order and compute its changes over `periods`.
///
/// A failed fetch is logged and the asset is skipped; the remaining assets
/// are still collected. `delay` is slept between consecutive fetches.
pub async fn build_change_table<S: MarketSource>(
    source: &S,
    assets: &[Asset],
    periods: &[u32],
    date: NaiveDate,
    delay: Duration,
    progress: &Progress,
) -> Build<ChangeTable> {
    let time = std::time::Instant::now();
    let mut records = Vec::with_capacity(assets.len());
    let mut skipped = Vec::new();

    for (i, asset) in assets.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        info!("fetching data for {asset} ...");
        progress.start(&asset.symbol);
        let chart = match source.market_chart(asset).await {
            Ok(chart) => chart,
            Err(err) => {
                error!("failed to fetch market data for {asset}, skipping, error({err})");
                skipped.push(asset.symbol.clone());
                progress.fail();
                continue;
            }
        };

        // rows keep the precision the CSV carries
        let changes: Vec<PeriodChange> = calculate_all(&chart, periods)
            .into_iter()
            .map(PeriodChange::rounded)
            .collect();
        trace!("{asset} changes: {changes:?}");
        records.push(ChangeRecord {
            date,
            symbol: asset.symbol.clone(),
            coin_id: asset.coin_id.clone(),
            changes,
        });
        progress.succeed();
    }
    progress.finish();

    debug!(
        "change table built, {} rows, {} skipped, {}",
        records.len(),
        skipped.len(),
        crate::time_elapsed(time)
    );

    Build {
        rows: ChangeTable {
            periods: periods.to_vec(),
            records,
        },
        skipped,
    }
}

/// Fetch every token's CEX volume in order and flatten it into daily rows.
///
/// Same soft-failure policy as [`build_change_table`].
pub async fn build_volume_table<S: VolumeSource>(
    source: &S,
    tokens: &[String],
    delay: Duration,
    progress: &Progress,
) -> Build<Vec<VolumeRecord>> {
    let time = std::time::Instant::now();
    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        info!("fetching data for {token} ...");
        progress.start(token);
        match source.cex_volume(token).await {
            Ok(series) => {
                rows.extend(series.into_iter().map(|point| VolumeRecord {
                    token: token.clone(),
                    date: point.time.date_naive(),
                    volume: point.value,
                }));
                progress.succeed();
            }
            Err(err) => {
                error!("failed to fetch CEX volume for {token}, skipping, error({err})");
                skipped.push(token.clone());
                progress.fail();
            }
        }
    }
    progress.finish();

    debug!(
        "volume table built, {} rows, {} skipped, {}",
        rows.len(),
        skipped.len(),
        crate::time_elapsed(time)
    );

    Build { rows, skipped }
}
