pub mod api;
pub mod change;
pub mod crypto;
pub mod dune;
pub mod error;
pub mod export;
pub mod table;
pub mod tui;

/// Shortcut for required API elements.
pub mod http {
    pub use dotenv::var;
    pub use reqwest::Client as HttpClient;
    pub use reqwest::StatusCode;

    /// Read an optional environment variable, treating an empty value as unset.
    pub fn var_opt(key: &str) -> Option<String> {
        var(key).ok().filter(|val| !val.trim().is_empty())
    }
}

/// Default http client; every spider endpoint shares the same user agent.
pub(crate) fn std_client_build() -> Result<http::HttpClient, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .user_agent(concat!("deltadump/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Formats the time elapsed since `time`, for debug lines.
pub(crate) fn time_elapsed(time: std::time::Instant) -> String {
    format!(
        "\x1b[38;5;208melapsed time: {} ms\x1b[0m",
        time.elapsed().as_millis()
    )
}
