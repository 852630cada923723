pub mod launch;
pub mod monitor;
pub mod resolve;

pub use launch::ScanLauncher;
pub use monitor::{MonitorReport, MonitorState, ScanMonitor};
pub use resolve::ConfigResolver;
