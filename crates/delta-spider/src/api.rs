use crate::crypto::assets::Asset;
use crate::crypto::coingecko::MarketChart;
use crate::crypto::Series;
use crate::dune::{TableSpec, TableStatus, Upload};
use crate::error::{FetchError, UploadError};

// Spider API calls are made up the following components:
// 1. HTTP
//     a) client
//     b) request
//     c) deserializer
//     d) OPTIONAL: transformation
//
// 2. Warehouse
//     a) table creation
//     b) csv upload
//
// The table builders and the publish step only see the traits below, so a
// fetch or an upload can be swapped for an in-memory fake in tests.

/// A provider of daily price & volume history per asset.
#[allow(async_fn_in_trait)]
pub trait MarketSource {
    async fn market_chart(&self, asset: &Asset) -> Result<MarketChart, FetchError>;
}

/// A provider of daily CEX trading volume per token.
#[allow(async_fn_in_trait)]
pub trait VolumeSource {
    async fn cex_volume(&self, token: &str) -> Result<Series, FetchError>;
}

/// A destination table store; an existing table is not an error.
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    async fn create_table(&self, spec: &TableSpec) -> Result<TableStatus, UploadError>;

    /// Replace the table's contents with CSV text, returning the response body.
    async fn upload_csv(&self, upload: &Upload<'_>) -> Result<String, UploadError>;
}
