use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::time::Duration;

use crate::client::Transport;
use crate::poll::{PollPolicy, PollResult};
use crate::pretty;
use crate::types::{ScanOutcome, ScanSummary, StatusClass};

use super::launch::SCANS_PATH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Running,
    Success,
    Failed,
    Cancelled,
    TimedOut,
}

impl MonitorState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MonitorState::Running)
    }

    /// Apply one observed status. Terminal states absorb everything.
    pub fn observe(self, status: &str) -> Self {
        if self.is_terminal() {
            return self;
        }
        match StatusClass::classify(status) {
            StatusClass::Success => MonitorState::Success,
            StatusClass::Failed => MonitorState::Failed,
            StatusClass::Cancelled => MonitorState::Cancelled,
            StatusClass::Queued | StatusClass::InProgress => MonitorState::Running,
        }
    }

    pub fn expire(self) -> Self {
        if self.is_terminal() { self } else { MonitorState::TimedOut }
    }

    pub fn outcome(self) -> Option<ScanOutcome> {
        match self {
            MonitorState::Running => None,
            MonitorState::Success => Some(ScanOutcome::Success),
            MonitorState::Failed => Some(ScanOutcome::Failed),
            MonitorState::Cancelled => Some(ScanOutcome::Cancelled),
            MonitorState::TimedOut => Some(ScanOutcome::TimedOut),
        }
    }
}

/// Result of watching one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    pub outcome: ScanOutcome,
    pub last_status: Option<String>,
    pub polls: u32,
}

pub struct ScanMonitor<'a, T: Transport + ?Sized> {
    transport: &'a T,
    interval: Duration,
}

impl<'a, T: Transport + ?Sized> ScanMonitor<'a, T> {
    pub fn new(transport: &'a T, interval: Duration) -> Self {
        Self { transport, interval }
    }

    pub async fn monitor(&self, scan_id: &str, budget: Duration) -> ScanOutcome {
        self.watch(scan_id, budget).await.outcome
    }

    /// Poll `scans/{scan_id}` until a terminal status or until `budget`
    /// elapses. Polling errors are logged and retried on the next tick.
    pub async fn watch(&self, scan_id: &str, budget: Duration) -> MonitorReport {
        let path = format!("{}/{}", SCANS_PATH, scan_id);
        let policy = PollPolicy::new(self.interval, budget);
        let state = Cell::new(MonitorState::Running);
        let last_status: RefCell<Option<String>> = RefCell::new(None);

        log::info!("[scan::monitor] watch: scan_id={} interval={}s budget={}s",
            scan_id, self.interval.as_secs(), budget.as_secs());

        let result = policy
            .run(
                "scan status",
                || self.transport.get(&path),
                |body: Value| {
                    let status = status_of(&body)?;
                    pretty::print_status(scan_id, &status);
                    let next = state.get().observe(&status);
                    log::debug!("[scan::monitor] polled: scan_id={} status={} state={:?}", scan_id, status, next);
                    state.set(next);
                    *last_status.borrow_mut() = Some(status);
                    next.outcome()
                },
            )
            .await;

        let last_status = last_status.into_inner();
        match result {
            PollResult::Ready { value: outcome, attempts } => {
                log::info!("[scan::monitor] terminal: scan_id={} outcome={} last_status={:?} polls={}",
                    scan_id, outcome, last_status, attempts);
                MonitorReport { outcome, last_status, polls: attempts }
            }
            PollResult::Expired { attempts, elapsed } => {
                log::error!("[scan::monitor] timed_out: stage=monitor scan_id={} last_status={:?} polls={} elapsed={}s",
                    scan_id, last_status, attempts, elapsed.as_secs());
                let outcome = state.get().expire().outcome().unwrap_or(ScanOutcome::TimedOut);
                MonitorReport { outcome, last_status, polls: attempts }
            }
        }
    }
}

fn status_of(body: &Value) -> Option<String> {
    match serde_json::from_value::<ScanSummary>(body.clone()) {
        Ok(ScanSummary { status: Some(status), .. }) => Some(status),
        Ok(_) => {
            log::warn!("[scan::monitor] status_missing: body={}", body);
            None
        }
        Err(_) => body.get("status").and_then(Value::as_str).map(str::to_string).or_else(|| {
            log::warn!("[scan::monitor] status_undecodable: body={}", body);
            None
        }),
    }
}
