//! CSV encoding of collected tables, and the local file copy.
//!
//! Change table columns: `date, symbol, coin_id`, then per period (in the
//! table's order) `volume_change_{p}d, price_change_{p}d`. Missing or
//! undefined deltas are written as `N/A`.

use crate::change::{Delta, PeriodChange, NOT_AVAILABLE};
use crate::table::{ChangeRecord, ChangeTable, VolumeRecord};
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use tracing::{debug, trace};

const DATE_FORMAT: &str = "%Y-%m-%d";
const KEY_COLUMNS: [&str; 3] = ["date", "symbol", "coin_id"];

/// Column names for a change table with the given periods.
pub fn change_header(periods: &[u32]) -> Vec<String> {
    let mut header: Vec<String> = KEY_COLUMNS.iter().map(|col| col.to_string()).collect();
    for period in periods {
        header.push(format!("volume_change_{period}d"));
        header.push(format!("price_change_{period}d"));
    }
    header
}

/// Encode a change table to CSV text, header first.
pub fn encode_change_table(table: &ChangeTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(change_header(&table.periods))?;

    for record in &table.records {
        let mut row = vec![
            record.date.format(DATE_FORMAT).to_string(),
            record.symbol.clone(),
            record.coin_id.clone(),
        ];
        // cells follow the header's period order, not the record's
        for period in &table.periods {
            let change = record
                .changes
                .iter()
                .find(|change| change.period == *period)
                .copied()
                .unwrap_or_else(|| PeriodChange::not_available(*period));
            row.push(change.volume.to_string());
            row.push(change.price.to_string());
        }
        wtr.write_record(&row)?;
    }

    let bytes = wtr.into_inner().context("failed to flush change table CSV")?;
    String::from_utf8(bytes).context("change table CSV is not valid UTF-8")
}

/// Decode CSV text produced by [`encode_change_table`].
///
/// `N/A` cells decode as [`Delta::NotAvailable`].
pub fn decode_change_table(csv_text: &str) -> Result<ChangeTable> {
    let mut rdr = csv::Reader::from_reader(csv_text.as_bytes());
    let header = rdr.headers().context("failed to read CSV header")?.clone();
    let periods = parse_header(&header)?;

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("failed to read CSV row {}", i + 1))?;
        if row.len() != header.len() {
            bail!("row {} has {} columns, expected {}", i + 1, row.len(), header.len());
        }

        let date = NaiveDate::parse_from_str(&row[0], DATE_FORMAT)
            .with_context(|| format!("invalid date \"{}\" in row {}", &row[0], i + 1))?;
        let changes = periods
            .iter()
            .enumerate()
            .map(|(j, period)| {
                let col = KEY_COLUMNS.len() + 2 * j;
                Ok(PeriodChange {
                    period: *period,
                    volume: parse_delta(&row[col])?,
                    price: parse_delta(&row[col + 1])?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        records.push(ChangeRecord {
            date,
            symbol: row[1].to_string(),
            coin_id: row[2].to_string(),
            changes,
        });
    }

    Ok(ChangeTable { periods, records })
}

fn parse_header(header: &csv::StringRecord) -> Result<Vec<u32>> {
    let cols: Vec<&str> = header.iter().collect();
    if cols.len() < KEY_COLUMNS.len() || cols[..KEY_COLUMNS.len()] != KEY_COLUMNS {
        bail!("CSV header must start with {KEY_COLUMNS:?}, got {cols:?}");
    }

    let rest = &cols[KEY_COLUMNS.len()..];
    if rest.len() % 2 != 0 {
        bail!("CSV header has an unpaired change column");
    }

    rest.chunks(2)
        .map(|pair| {
            let period = period_of(pair[0], "volume_change_")?;
            if period_of(pair[1], "price_change_")? != period {
                bail!("mismatched change columns {} / {}", pair[0], pair[1]);
            }
            Ok(period)
        })
        .collect()
}

fn period_of(column: &str, prefix: &str) -> Result<u32> {
    column
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix('d'))
        .and_then(|days| days.parse().ok())
        .ok_or_else(|| anyhow!("unexpected column \"{column}\", expected {prefix}<days>d"))
}

fn parse_delta(cell: &str) -> Result<Delta> {
    if cell == NOT_AVAILABLE {
        return Ok(Delta::NotAvailable);
    }
    cell.parse::<f64>()
        .map(Delta::Value)
        .with_context(|| format!("invalid change value \"{cell}\""))
}

/// Encode CEX volume rows to CSV text with the `token, date, volume` header.
pub fn encode_volume_table(rows: &[VolumeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    if rows.is_empty() {
        wtr.write_record(["token", "date", "volume"])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }

    let bytes = wtr.into_inner().context("failed to flush volume CSV")?;
    String::from_utf8(bytes).context("volume CSV is not valid UTF-8")
}

/// Write `csv_text` to `path`, creating parent directories as needed.
pub async fn write_file(path: &str, csv_text: &str) -> Result<()> {
    trace!("checking directory path: {path:?}");
    if let Some(dir) = std::path::Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir).await?;
        }
    }

    tokio::fs::write(path, csv_text)
        .await
        .with_context(|| format!("failed to write {path}"))?;
    debug!("{} bytes written to {path}", csv_text.len());

    Ok(())
}
