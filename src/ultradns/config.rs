use super::grouping::DirectionalSkipMode;

/// Public API endpoint used when `url` is not set.
pub const DEFAULT_URL: &str = "https://ultra-api.ultradns.com:8443/UltraDNS_WS/v01";

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Clone, serde::Deserialize)]
pub struct Config {
    pub url: Option<url::Url>,

    pub username: String,
    /// The password, or `@/path/to/file` holding it.
    pub password: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub directional_skip_mode: DirectionalSkipMode,
}
