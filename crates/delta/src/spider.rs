use crate::cli::{DeltaArgs, UploadArgs, VolumeArgs};
use delta_spider::api::Warehouse;
use delta_spider::crypto::assets::{default_assets, default_cex_tokens};
use delta_spider::crypto::coingecko::CoinGecko;
use delta_spider::crypto::spotonchain::SpotOnChain;
use delta_spider::dune::{change_schema, Dune, TableSpec, Upload};
use delta_spider::{export, table, tui::Progress};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

const DELTA_DESCRIPTION: &str = "Cryptocurrency market data including price and volume changes";
const VOLUME_DESCRIPTION: &str = "Token CEX volume data";

/// Collect price & volume changes, upload them to Dune and write the local copy.
pub(crate) async fn deltas(args: DeltaArgs, tui: bool) -> anyhow::Result<()> {
    let time = std::time::Instant::now();
    let periods = validate_periods(&args.periods)?;
    if let Some(longest) = periods.iter().max() {
        if args.days < 2 * longest {
            warn!(
                "{} days of history cannot cover the {longest}d volume window, expect N/A values",
                args.days
            );
        }
    }
    let assets = args.assets.unwrap_or_else(default_assets);

    // check credentials before the (slow) collection run
    let (dune, namespace) = if args.upload.no_upload {
        (None, None)
    } else {
        let namespace = args.namespace.clone().ok_or_else(|| {
            anyhow::anyhow!("a Dune namespace is required, set DUNE_NAMESPACE or --namespace")
        })?;
        (Some(Dune::from_env()?), Some(namespace))
    };

    trace!("building CoinGecko client");
    let source = CoinGecko::from_env()?
        .with_days(args.days)
        .with_drop_partial(!args.keep_partial);

    // 1. fetch & transform
    let progress = Progress::new(assets.len(), tui)?;
    let today = chrono::Utc::now().date_naive();
    let build = table::build_change_table(
        &source,
        &assets,
        &periods,
        today,
        Duration::from_millis(args.delay_ms),
        &progress,
    )
    .await;

    // 2. serialize
    let csv = export::encode_change_table(&build.rows)?;
    debug!("CSV data:\n{csv}");

    // 3. upload & local copy
    let description = args.upload.description.as_deref().unwrap_or(DELTA_DESCRIPTION);
    let target = Publish {
        spec: namespace.map(|namespace| TableSpec {
            namespace,
            table_name: args.table.clone(),
            description: description.to_string(),
            schema: change_schema(&periods),
            is_private: args.upload.private,
        }),
        table_name: &args.table,
        description,
        is_private: args.upload.private,
    };
    let uploaded = publish(
        dune.as_ref(),
        &target,
        &csv,
        build.rows.records.len(),
        Some(args.output.as_str()),
    )
    .await?;

    report(
        "market data",
        build.rows.records.len(),
        &build.skipped,
        uploaded,
        &args.upload,
        tui,
        time,
    )
}

/// Collect CEX volume per token, upload it to Dune and optionally write a local copy.
pub(crate) async fn volume(args: VolumeArgs, tui: bool) -> anyhow::Result<()> {
    let time = std::time::Instant::now();
    let tokens = args.tokens.unwrap_or_else(default_cex_tokens);

    let dune = if args.upload.no_upload {
        None
    } else {
        Some(Dune::from_env()?)
    };

    trace!("building Spot On Chain client");
    let source = SpotOnChain::from_env()?.with_days(args.days);

    let progress = Progress::new(tokens.len(), tui)?;
    let build = table::build_volume_table(
        &source,
        &tokens,
        Duration::from_millis(args.delay_ms),
        &progress,
    )
    .await;

    let csv = export::encode_volume_table(&build.rows)?;
    debug!("CSV data:\n{csv}");

    let target = Publish {
        spec: None,
        table_name: &args.table,
        description: args.upload.description.as_deref().unwrap_or(VOLUME_DESCRIPTION),
        is_private: args.upload.private,
    };
    let uploaded = publish(
        dune.as_ref(),
        &target,
        &csv,
        build.rows.len(),
        args.output.as_deref(),
    )
    .await?;

    report(
        "volume data",
        build.rows.len(),
        &build.skipped,
        uploaded,
        &args.upload,
        tui,
        time,
    )
}

/// Destination of one encoded table.
pub(crate) struct Publish<'a> {
    /// Table to create (or find existing) before the upload, if any.
    pub spec: Option<TableSpec>,
    pub table_name: &'a str,
    pub description: &'a str,
    pub is_private: bool,
}

/// Upload `csv` to the warehouse, then write the local copy to `output`.
///
/// Warehouse failures are logged and reported through the returned flag,
/// never propagated: a failed create skips the upload, and the local copy is
/// written whatever happened upstream. No warehouse means uploads are
/// disabled, which counts as complete. Only a failed file write is an error.
pub(crate) async fn publish<W: Warehouse>(
    warehouse: Option<&W>,
    target: &Publish<'_>,
    csv: &str,
    rows: usize,
    output: Option<&str>,
) -> anyhow::Result<bool> {
    let uploaded = match warehouse {
        None => {
            info!("upload disabled, skipping Dune");
            true
        }
        Some(_) if rows == 0 => {
            warn!("no rows collected, skipping Dune upload");
            false
        }
        Some(warehouse) => {
            let ready = match &target.spec {
                Some(spec) => match warehouse.create_table(spec).await {
                    Ok(_) => true,
                    Err(err) => {
                        error!("failed to create or verify Dune table, skipping upload, error({err})");
                        false
                    }
                },
                None => true,
            };
            ready && upload(warehouse, csv, target).await
        }
    };

    if let Some(output) = output {
        export::write_file(output, csv).await.map_err(|err| {
            error!("failed to write {output}, error({err})");
            err
        })?;
        info!("data has been written to {output}");
    }

    Ok(uploaded)
}

async fn upload<W: Warehouse>(warehouse: &W, csv: &str, target: &Publish<'_>) -> bool {
    info!("uploading data to Dune ...");
    let request = Upload {
        data: csv,
        description: target.description,
        table_name: target.table_name,
        is_private: target.is_private,
    };
    match warehouse.upload_csv(&request).await {
        Ok(body) => {
            info!("data uploaded to Dune successfully: {body}");
            true
        }
        Err(err) => {
            error!("failed to upload to Dune, error({err})");
            false
        }
    }
}

// final summary; `--strict` turns partial results into an error
fn report(
    what: &str,
    rows: usize,
    skipped: &[String],
    uploaded: bool,
    args: &UploadArgs,
    tui: bool,
    time: std::time::Instant,
) -> anyhow::Result<()> {
    if !skipped.is_empty() {
        warn!("skipped {} due to fetch failures: {}", skipped.len(), skipped.join(", "));
    }
    info!(
        "{what} collected, {rows} rows, time elapsed: {:?}",
        time.elapsed()
    );

    if tui {
        println!("collecting {what} ... done ({rows} rows, {} skipped)", skipped.len());
        if !uploaded {
            println!("Dune upload did not complete, rerun with --trace WARN for details");
        }
    }

    if args.strict {
        if !skipped.is_empty() {
            anyhow::bail!("{} items skipped: {}", skipped.len(), skipped.join(", "));
        }
        if !uploaded {
            anyhow::bail!("Dune upload did not complete");
        }
    }

    Ok(())
}

/// Periods must be non-zero and unique; they become column names.
pub(crate) fn validate_periods(periods: &[u32]) -> anyhow::Result<Vec<u32>> {
    if periods.is_empty() {
        anyhow::bail!("at least one period is required");
    }
    let mut seen = Vec::with_capacity(periods.len());
    for period in periods {
        if *period == 0 {
            anyhow::bail!("periods must be at least 1 day");
        }
        if seen.contains(period) {
            anyhow::bail!("duplicate period {period}d");
        }
        seen.push(*period);
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use delta_spider::change::PeriodChange;
    use delta_spider::dune::TableStatus;
    use delta_spider::error::UploadError;
    use delta_spider::http::StatusCode;
    use delta_spider::table::{ChangeRecord, ChangeTable};
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    #[test]
    fn periods_keep_order() {
        assert_eq!(validate_periods(&[30, 7, 90]).unwrap(), vec![30, 7, 90]);
    }

    #[test]
    fn bad_periods() {
        assert!(validate_periods(&[]).is_err());
        assert!(validate_periods(&[7, 0]).is_err());
        assert!(validate_periods(&[7, 30, 7]).is_err());
    }

    fn upload_args(strict: bool) -> UploadArgs {
        UploadArgs {
            description: None,
            private: false,
            no_upload: false,
            strict,
        }
    }

    #[test]
    fn partial_results_pass_unless_strict() {
        let now = std::time::Instant::now();
        let skipped = vec!["SOL".to_string()];
        assert!(report("test", 1, &skipped, false, &upload_args(false), false, now).is_ok());
        assert!(report("test", 1, &skipped, true, &upload_args(true), false, now).is_err());
        assert!(report("test", 1, &[], false, &upload_args(true), false, now).is_err());
        assert!(report("test", 1, &[], true, &upload_args(true), false, now).is_ok());
    }

    // Records every call; fails with the configured status when set.
    #[derive(Default)]
    struct FakeWarehouse {
        create_fails: Option<StatusCode>,
        upload_fails: Option<StatusCode>,
        calls: RefCell<Vec<String>>,
        data: RefCell<Option<String>>,
    }

    impl Warehouse for FakeWarehouse {
        async fn create_table(&self, spec: &TableSpec) -> Result<TableStatus, UploadError> {
            self.calls.borrow_mut().push(format!("create {}", spec.table_name));
            match self.create_fails {
                Some(status) => Err(UploadError::Status {
                    status,
                    body: "create failed".to_string(),
                }),
                None => Ok(TableStatus::AlreadyExists),
            }
        }

        async fn upload_csv(&self, upload: &Upload<'_>) -> Result<String, UploadError> {
            self.calls.borrow_mut().push(format!("upload {}", upload.table_name));
            *self.data.borrow_mut() = Some(upload.data.to_string());
            match self.upload_fails {
                Some(status) => Err(UploadError::Status {
                    status,
                    body: "upload failed".to_string(),
                }),
                None => Ok(r#"{"success":true}"#.to_string()),
            }
        }
    }

    fn target(create: bool) -> Publish<'static> {
        Publish {
            spec: create.then(|| TableSpec {
                namespace: "team".to_string(),
                table_name: "market".to_string(),
                description: "desc".to_string(),
                schema: change_schema(&[7]),
                is_private: false,
            }),
            table_name: "market",
            description: "desc",
            is_private: false,
        }
    }

    fn change_csv(rows: usize) -> String {
        let record = ChangeRecord {
            date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            symbol: "ETH".to_string(),
            coin_id: "ethereum".to_string(),
            changes: vec![PeriodChange::not_available(7)],
        };
        let table = ChangeTable {
            periods: vec![7],
            records: vec![record; rows],
        };
        export::encode_change_table(&table).unwrap()
    }

    // unique per test, tests run concurrently
    fn output(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("delta-{}", std::process::id()))
            .join(name)
    }

    async fn read_and_remove(path: &Path) -> String {
        let text = tokio::fs::read_to_string(path).await.unwrap();
        tokio::fs::remove_file(path).await.unwrap();
        text
    }

    #[tokio::test]
    async fn failed_create_skips_upload_but_writes_file() {
        let warehouse = FakeWarehouse {
            create_fails: Some(StatusCode::INTERNAL_SERVER_ERROR),
            upload_fails: Some(StatusCode::INTERNAL_SERVER_ERROR),
            ..Default::default()
        };
        let csv = change_csv(1);
        let path = output("failed_create.csv");

        let uploaded = publish(Some(&warehouse), &target(true), &csv, 1, path.to_str())
            .await
            .unwrap();

        assert!(!uploaded);
        assert_eq!(*warehouse.calls.borrow(), vec!["create market"]);
        assert_eq!(read_and_remove(&path).await, csv);
    }

    #[tokio::test]
    async fn failed_upload_is_reported_not_raised() {
        let warehouse = FakeWarehouse {
            upload_fails: Some(StatusCode::BAD_REQUEST),
            ..Default::default()
        };
        let csv = change_csv(2);
        let path = output("failed_upload.csv");

        let uploaded = publish(Some(&warehouse), &target(true), &csv, 2, path.to_str())
            .await
            .unwrap();

        assert!(!uploaded);
        assert_eq!(*warehouse.calls.borrow(), vec!["create market", "upload market"]);
        assert_eq!(read_and_remove(&path).await, csv);
    }

    #[tokio::test]
    async fn existing_table_is_uploaded() {
        let warehouse = FakeWarehouse::default();
        let csv = change_csv(1);
        let path = output("existing_table.csv");

        let uploaded = publish(Some(&warehouse), &target(true), &csv, 1, path.to_str())
            .await
            .unwrap();

        assert!(uploaded);
        assert_eq!(*warehouse.calls.borrow(), vec!["create market", "upload market"]);
        assert_eq!(warehouse.data.borrow().as_deref(), Some(csv.as_str()));
        assert_eq!(read_and_remove(&path).await, csv);
    }

    #[tokio::test]
    async fn empty_build_skips_upload() {
        let warehouse = FakeWarehouse::default();
        let csv = change_csv(0);
        let path = output("empty_build.csv");

        let uploaded = publish(Some(&warehouse), &target(true), &csv, 0, path.to_str())
            .await
            .unwrap();

        assert!(!uploaded);
        assert!(warehouse.calls.borrow().is_empty());
        // header only
        assert_eq!(read_and_remove(&path).await.lines().count(), 1);
    }

    #[tokio::test]
    async fn upload_without_create_step() {
        let warehouse = FakeWarehouse::default();

        let uploaded = publish(Some(&warehouse), &target(false), "token,date,volume\n", 1, None)
            .await
            .unwrap();

        assert!(uploaded);
        assert_eq!(*warehouse.calls.borrow(), vec!["upload market"]);
    }

    #[tokio::test]
    async fn disabled_upload_counts_as_complete() {
        let csv = change_csv(1);
        let path = output("disabled_upload.csv");

        let uploaded = publish(None::<&FakeWarehouse>, &target(true), &csv, 1, path.to_str())
            .await
            .unwrap();

        assert!(uploaded);
        assert_eq!(read_and_remove(&path).await, csv);
    }
}
