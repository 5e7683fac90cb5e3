use crate::api::Warehouse;
use crate::error::UploadError;
use crate::http::*;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

// create = `https://api.dune.com/api/v1/table/create`
//
// upload = `https://api.dune.com/api/v1/table/upload/csv`

pub const DEFAULT_URL: &str = "https://api.dune.com/api/v1";
pub const API_KEY_HEADER: &str = "x-dune-api-key";

/////////////////////////////////////////////////////////////////////////////////
// core
/////////////////////////////////////////////////////////////////////////////////

/// Client for the Dune table API.
#[derive(Clone, Debug)]
pub struct Dune {
    http_client: HttpClient,
    base_url: String,
}

/// Result of a table creation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableStatus {
    Created,
    AlreadyExists,
}

impl Dune {
    pub fn new(base_url: impl Into<String>, api_key: &str) -> Result<Self, UploadError> {
        Self::with_client_builder(reqwest::ClientBuilder::new(), base_url, api_key)
    }

    /// Same as [`Dune::new`], on top of a preconfigured client builder.
    pub fn with_client_builder(
        builder: reqwest::ClientBuilder,
        base_url: impl Into<String>,
        api_key: &str,
    ) -> Result<Self, UploadError> {
        // dune http client requires "X-DUNE-API-KEY"
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = builder.default_headers(headers).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build from `DUNE_API` (required key) and `DUNE_URL` (optional base url).
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = var_opt("DUNE_API")
            .ok_or_else(|| anyhow::anyhow!("environment variable DUNE_API is not set"))?;
        let base_url = var_opt("DUNE_URL").unwrap_or_else(|| DEFAULT_URL.to_string());
        Ok(Self::new(base_url, &api_key)?)
    }
}

impl Warehouse for Dune {
    /// Create the table; an existing table (409) counts as success.
    async fn create_table(&self, spec: &TableSpec) -> Result<TableStatus, UploadError> {
        let url = format!("{}/table/create", self.base_url);
        trace!("creating Dune table {}.{}", spec.namespace, spec.table_name);

        let response = self.http_client.post(url).json(spec).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let outcome = create_outcome(status, body);
        match &outcome {
            Ok(TableStatus::Created) => info!("Dune table {} created", spec.table_name),
            Ok(TableStatus::AlreadyExists) => {
                info!("Dune table {} already exists, proceeding with upload", spec.table_name)
            }
            Err(err) => warn!("failed to create Dune table {}, error({err})", spec.table_name),
        }
        outcome
    }

    async fn upload_csv(&self, upload: &Upload<'_>) -> Result<String, UploadError> {
        let url = format!("{}/table/upload/csv", self.base_url);
        let time = std::time::Instant::now();
        trace!("uploading {} bytes to Dune table {}", upload.data.len(), upload.table_name);

        let response = self.http_client.post(url).json(upload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(UploadError::Status { status, body });
        }

        debug!(
            "uploaded to Dune table {}: {body}, {}",
            upload.table_name,
            crate::time_elapsed(time)
        );
        Ok(body)
    }
}

/// Interpret a table creation response.
pub fn create_outcome(status: StatusCode, body: String) -> Result<TableStatus, UploadError> {
    if status.is_success() {
        Ok(TableStatus::Created)
    } else if status == StatusCode::CONFLICT {
        Ok(TableStatus::AlreadyExists)
    } else {
        Err(UploadError::Status { status, body })
    }
}

/////////////////////////////////////////////////////////////////////////////////
// payloads
/////////////////////////////////////////////////////////////////////////////////

/// `POST /table/create` body.
#[derive(Clone, Debug, Serialize)]
pub struct TableSpec {
    pub namespace: String,
    pub table_name: String,
    pub description: String,
    pub schema: Vec<Column>,
    pub is_private: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Timestamp,
    String,
    Double,
}

impl Column {
    fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: None,
        }
    }

    fn nullable(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            nullable: Some(true),
            ..Self::new(name, kind)
        }
    }
}

/// Schema matching [`crate::export::change_header`] for the given periods.
pub fn change_schema(periods: &[u32]) -> Vec<Column> {
    let mut schema = vec![
        Column::new("date", ColumnType::Timestamp),
        Column::new("symbol", ColumnType::String),
        Column::new("coin_id", ColumnType::String),
    ];
    for period in periods {
        schema.push(Column::nullable(format!("volume_change_{period}d"), ColumnType::Double));
        schema.push(Column::nullable(format!("price_change_{period}d"), ColumnType::Double));
    }
    schema
}

/// `POST /table/upload/csv` body.
#[derive(Clone, Debug, Serialize)]
pub struct Upload<'a> {
    pub data: &'a str,
    pub description: &'a str,
    pub table_name: &'a str,
    pub is_private: bool,
}
