pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod poll;
pub mod pretty;
pub mod scan;
pub mod types;

// Re-export key types and functions at the crate root
pub use client::{HttpTransport, Transport};
pub use config::Config;
pub use error::{HttpError, LaunchError, ResolveError};
pub use logging::init_logging;
pub use orchestrator::Orchestrator;
pub use poll::{PollPolicy, PollResult, RetryPolicy};
pub use scan::{ConfigResolver, MonitorState, ScanLauncher, ScanMonitor};
pub use types::{RunReport, ScanConfiguration, ScanHandle, ScanOutcome};
