use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scan-gate")]
#[command(about = "Trigger an InsightAppSec scan and fail the pipeline unless it succeeds")]
#[command(version)]
pub struct Cli {
    /// API key sent as the x-api-key header
    #[arg(long, env = "RAPID7_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Only consider scan configurations owned by this application
    #[arg(long, env = "APP_NAME")]
    pub app_name: Option<String>,

    /// Exact (case-sensitive) name of the scan configuration to run
    #[arg(long, env = "SCAN_CONFIG_NAME", default_value = "nodejsscan")]
    pub scan_config_name: String,

    /// Platform region used to build the default API URL
    #[arg(long, env = "RAPID7_REGION", default_value = "us3")]
    pub region: String,

    /// Full API base URL, overrides --region
    #[arg(long, env = "RAPID7_BASE_URL")]
    pub base_url: Option<String>,

    /// Seconds between scan status polls
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "60")]
    pub poll_interval_secs: u64,

    /// Seconds to wait for the scan to finish
    #[arg(long, env = "SCAN_TIMEOUT_SECS", default_value = "3600")]
    pub timeout_secs: u64,

    /// Seconds to wait for a scan id when the start request returns none
    #[arg(long, env = "LAUNCH_TIMEOUT_SECS", default_value = "300")]
    pub launch_timeout_secs: u64,

    /// Attempts at the scan start request on transient failures
    #[arg(long, env = "SUBMIT_RETRIES", default_value = "3")]
    pub submit_retries: u32,

    /// Seconds between scan start attempts
    #[arg(long, env = "SUBMIT_RETRY_DELAY_SECS", default_value = "5")]
    pub submit_retry_delay_secs: u64,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Print the available scan configurations and exit
    #[arg(long)]
    pub list_configs: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, env = "SCAN_GATE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
