use chrono::Utc;
use serde_json::Value;

use crate::client::Transport;
use crate::error::{HttpError, LaunchError};
use crate::poll::{PollPolicy, PollResult, RetryPolicy};
use crate::pretty;
use crate::types::{ScanHandle, ScanRequest, ScanSummary, StatusClass, decode_list, response_id};

pub const SCANS_PATH: &str = "scans";

/// Starts exactly one scan for a configuration.
///
/// An accepted start request may come back without a scan id. In that case
/// the id is recovered by watching `GET scans` for this configuration; the
/// start request is never sent again, which would risk a duplicate scan.
pub struct ScanLauncher<'a, T: Transport + ?Sized> {
    transport: &'a T,
    submit_retry: RetryPolicy,
    acquire: PollPolicy,
}

impl<'a, T: Transport + ?Sized> ScanLauncher<'a, T> {
    /// `acquire` should have `delay_first` set; the service needs a moment
    /// before the new scan shows up in the list.
    pub fn new(transport: &'a T, submit_retry: RetryPolicy, acquire: PollPolicy) -> Self {
        Self {
            transport,
            submit_retry,
            acquire,
        }
    }

    pub async fn launch(&self, configuration_id: &str) -> Result<ScanHandle, LaunchError> {
        let request = ScanRequest::new(configuration_id);
        let body = request.to_body()?;
        let submitted_at = Utc::now();

        log::info!("[scan::launch] submit: configuration_id={}", request.configuration_id());

        let response = self
            .submit_retry
            .run("submit scan", HttpError::is_transient, || self.transport.post(SCANS_PATH, &body))
            .await
            .map_err(|e| {
                log::error!("[scan::launch] submit_failed: stage=launch configuration_id={} attempts={} error={}",
                    configuration_id, e.attempts, e.error);
                LaunchError::Submit {
                    attempts: e.attempts,
                    source: e.error,
                }
            })?;

        if let Some(scan_id) = response_id(&response) {
            log::info!("[scan::launch] submitted: configuration_id={} scan_id={}", configuration_id, scan_id);
            return Ok(ScanHandle { scan_id, submitted_at });
        }

        log::warn!("[scan::launch] missing_scan_id: configuration_id={} response={}", configuration_id, response);
        pretty::print_awaiting_scan_id(configuration_id);

        self.acquire_scan_id(configuration_id)
            .await
            .map(|scan_id| ScanHandle { scan_id, submitted_at })
    }

    async fn acquire_scan_id(&self, configuration_id: &str) -> Result<String, LaunchError> {
        let result = self
            .acquire
            .run(
                "acquire scan id",
                || self.transport.get(SCANS_PATH),
                |body: Value| started_scan_for(&body, configuration_id),
            )
            .await;

        match result {
            PollResult::Ready { value, attempts } => {
                log::info!("[scan::launch] scan_id_acquired: configuration_id={} scan_id={} lookups={}",
                    configuration_id, value, attempts);
                Ok(value)
            }
            PollResult::Expired { attempts, elapsed } => {
                log::error!("[scan::launch] acquire_timeout: stage=launch configuration_id={} lookups={} elapsed={}s",
                    configuration_id, attempts, elapsed.as_secs());
                Err(LaunchError::Timeout {
                    configuration_id: configuration_id.to_string(),
                    waited: elapsed,
                    attempts,
                })
            }
        }
    }
}

/// First scan of `configuration_id` that is currently running.
///
/// Finished scans are skipped: the list also holds earlier runs of the same
/// configuration, and their final status would stand in for this one.
fn started_scan_for(body: &Value, configuration_id: &str) -> Option<String> {
    let scans: Vec<ScanSummary> = decode_list(body, "scans");
    scans
        .into_iter()
        .find(|scan| {
            scan.configuration_id.as_deref() == Some(configuration_id)
                && scan
                    .status
                    .as_deref()
                    .is_some_and(|status| StatusClass::classify(status) == StatusClass::InProgress)
        })
        .map(|scan| scan.id)
}
