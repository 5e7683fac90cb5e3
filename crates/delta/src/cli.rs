use clap::{Args, Parser, Subcommand, ValueEnum};
use delta_spider::crypto::assets::Asset;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing.
    ///
    /// If no level is provided, progress bars are drawn instead.
    #[arg(short, long, global = true)]
    pub trace: Option<TraceLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Price & volume changes per asset, from CoinGecko market charts.
    Deltas(DeltaArgs),

    /// Daily CEX trading volume per token, from Spot On Chain.
    Volume(VolumeArgs),
}

#[derive(Args, Debug)]
pub struct DeltaArgs {
    /// Look-back periods, in days.
    #[arg(short, long, value_delimiter = ',', default_values_t = [7, 30, 60, 90])]
    pub periods: Vec<u32>,

    /// Days of daily history to request per asset.
    #[arg(short, long, default_value_t = 180)]
    pub days: u32,

    /// Assets to collect as `SYMBOL:coin-id`; defaults to the built-in list.
    #[arg(short, long, value_delimiter = ',')]
    pub assets: Option<Vec<Asset>>,

    /// Milliseconds to wait between asset requests.
    #[arg(long, default_value_t = 100)]
    pub delay_ms: u64,

    /// Keep the last (still in progress) day of each series.
    #[arg(long)]
    pub keep_partial: bool,

    /// Local CSV copy of the table.
    #[arg(short, long, default_value = "crypto_market_data.csv")]
    pub output: String,

    /// Dune namespace the table is created in.
    #[arg(long, env = "DUNE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Dune table name.
    #[arg(long, default_value = "crypto_market_data")]
    pub table: String,

    #[command(flatten)]
    pub upload: UploadArgs,
}

#[derive(Args, Debug)]
pub struct VolumeArgs {
    /// Days of volume history to request per token.
    #[arg(short, long, default_value_t = 30)]
    pub days: u32,

    /// Tokens to collect; defaults to the built-in list.
    #[arg(long, value_delimiter = ',')]
    pub tokens: Option<Vec<String>>,

    /// Milliseconds to wait between token requests.
    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,

    /// Local CSV copy of the table, if wanted.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Dune table name.
    #[arg(long, default_value = "token_volume_data")]
    pub table: String,

    #[command(flatten)]
    pub upload: UploadArgs,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Table description shown on Dune.
    #[arg(long)]
    pub description: Option<String>,

    /// Make the Dune table private.
    #[arg(long)]
    pub private: bool,

    /// Skip the Dune upload; only write the local copy.
    #[arg(long)]
    pub no_upload: bool,

    /// Fail the run if any asset was skipped or the upload failed.
    #[arg(long)]
    pub strict: bool,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    DEBUG,
    ERROR,
    INFO,
    TRACE,
    WARN,
}
