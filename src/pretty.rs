use crate::types::{RunReport, ScanConfiguration, ScanOutcome, StatusClass};
use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;
const SEPARATOR_WIDTH: usize = 80;

pub fn print_separator() {
    println!("{}", "─".repeat(SEPARATOR_WIDTH));
}

pub fn print_header(config_name: &str, app_name: Option<&str>) {
    match app_name {
        Some(app) => println!("🎯 Scan configuration: {} (application: {})", config_name, app),
        None => println!("🎯 Scan configuration: {}", config_name),
    }
    print_separator();
}

pub fn print_fetching_configs() {
    println!("🔍 Fetching scan configurations...");
}

pub fn print_config_found(config: &ScanConfiguration) {
    println!("✅ Found scan configuration: {}, ID: {}", config.name, config.id);
}

pub fn print_scan_started(scan_id: &str) {
    println!("🚀 Scan triggered successfully! Scan ID: {}", scan_id);
}

pub fn print_awaiting_scan_id(configuration_id: &str) {
    println!("⏳ Scan accepted without an ID, looking it up for configuration {}...", configuration_id);
}

pub fn print_status(scan_id: &str, status: &str) {
    println!("{}", status_line(scan_id, status));
}

pub fn print_failure(stage: &str, error: &dyn std::fmt::Display) {
    println!("❌ {} failed: {}", stage, error);
}

pub fn print_configurations(configs: &[ScanConfiguration]) {
    if configs.is_empty() {
        println!("No scan configurations found.");
        return;
    }
    println!("Scan configurations:");
    for config in configs {
        match &config.application_id {
            Some(app) => println!("- Name: {}, ID: {}, Application: {}", config.name, config.id, app),
            None => println!("- Name: {}, ID: {}", config.name, config.id),
        }
    }
}

pub fn print_report(report: &RunReport, elapsed: Duration) {
    print_separator();
    println!("{}", report_line(report, elapsed));
}

fn status_line(scan_id: &str, status: &str) -> String {
    let icon = match StatusClass::classify(status) {
        StatusClass::Queued => "🕒",
        StatusClass::InProgress => "🔄",
        StatusClass::Success => "✅",
        StatusClass::Failed | StatusClass::Cancelled => "❌",
    };
    format!("{} Scan {} status: {}", icon, scan_id, status)
}

fn outcome_icon(outcome: ScanOutcome) -> &'static str {
    match outcome {
        ScanOutcome::Success => "✅",
        ScanOutcome::TimedOut => "⏳",
        _ => "❌",
    }
}

fn report_line(report: &RunReport, elapsed: Duration) -> String {
    let mut line = format!("{} Result: {}", outcome_icon(report.outcome), report.outcome);
    if let Some(handle) = &report.handle {
        line.push_str(&format!(" (scan {}", handle.scan_id));
        if let Some(status) = &report.last_status {
            line.push_str(&format!(", last status {}", status));
        }
        line.push(')');
    } else if let Some(config) = &report.configuration {
        line.push_str(&format!(" (configuration {})", config.id));
    }
    line.push_str(&format!(" after {}", format_duration(elapsed)));
    line
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs < SECONDS_PER_MINUTE {
        format!("{}s", total_secs)
    } else if total_secs < SECONDS_PER_HOUR {
        format!("{}m{}s", total_secs / SECONDS_PER_MINUTE, total_secs % SECONDS_PER_MINUTE)
    } else {
        let hours = total_secs / SECONDS_PER_HOUR;
        let minutes = (total_secs % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
        format!("{}h{}m", hours, minutes)
    }
}
