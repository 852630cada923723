use eyre::{Result, WrapErr, bail};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::cli::Cli;
use crate::poll::{PollPolicy, RetryPolicy};

/// Everything one run needs, built once at startup and passed by reference.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub base_url: Url,
    pub app_name: Option<String>,
    pub scan_config_name: String,
    pub poll_interval: Duration,
    pub scan_timeout: Duration,
    pub launch_timeout: Duration,
    pub submit_retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let api_key = cli.api_key.trim().to_string();
        if api_key.is_empty() {
            bail!("API key is empty (set RAPID7_API_KEY or --api-key)");
        }

        let scan_config_name = cli.scan_config_name.clone();
        if scan_config_name.trim().is_empty() {
            bail!("scan configuration name is empty (set SCAN_CONFIG_NAME or --scan-config-name)");
        }

        if cli.poll_interval_secs == 0 {
            bail!("poll interval must be at least one second");
        }

        let base_url = match &cli.base_url {
            Some(raw) => Url::parse(raw).wrap_err_with(|| format!("Invalid base URL: {}", raw))?,
            None => default_base_url(&cli.region)?,
        };

        let app_name = cli
            .app_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from);

        Ok(Self {
            api_key,
            base_url,
            app_name,
            scan_config_name,
            poll_interval: Duration::from_secs(cli.poll_interval_secs),
            scan_timeout: Duration::from_secs(cli.timeout_secs),
            launch_timeout: Duration::from_secs(cli.launch_timeout_secs),
            submit_retry: RetryPolicy::new(cli.submit_retries, Duration::from_secs(cli.submit_retry_delay_secs)),
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
        })
    }

    /// Scan-id acquisition after an id-less start response.
    pub fn acquire_policy(&self) -> PollPolicy {
        PollPolicy::new(self.poll_interval, self.launch_timeout).delay_first(true)
    }
}

// The API key must never end up in logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("app_name", &self.app_name)
            .field("scan_config_name", &self.scan_config_name)
            .field("poll_interval", &self.poll_interval)
            .field("scan_timeout", &self.scan_timeout)
            .field("launch_timeout", &self.launch_timeout)
            .field("submit_retry", &self.submit_retry)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

pub fn default_base_url(region: &str) -> Result<Url> {
    let region = region.trim();
    if region.is_empty() || !region.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        bail!("Invalid region: {:?}", region);
    }
    let raw = format!("https://{}.api.insight.rapid7.com/ias/v1/", region.to_ascii_lowercase());
    Url::parse(&raw).wrap_err_with(|| format!("Invalid base URL for region {}", region))
}
