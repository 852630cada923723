use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// A named scan template held by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawScanConfiguration")]
pub struct ScanConfiguration {
    pub id: String,
    pub name: String,
    pub application_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScanConfiguration {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    name: String,
    #[serde(default)]
    app: Option<IdRef>,
    #[serde(default)]
    application_id: Option<String>,
}

impl From<RawScanConfiguration> for ScanConfiguration {
    fn from(raw: RawScanConfiguration) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            application_id: raw.application_id.or(raw.app.map(|app| app.id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Application {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
struct IdRef {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
}

/// Body of a scan-start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    #[serde(rename = "scan_config")]
    config: IdRef,
}

impl ScanRequest {
    pub fn new(configuration_id: &str) -> Self {
        Self {
            config: IdRef {
                id: configuration_id.to_string(),
            },
        }
    }

    pub fn configuration_id(&self) -> &str {
        &self.config.id
    }

    pub fn to_body(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// A submitted scan whose identifier is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHandle {
    pub scan_id: String,
    pub submitted_at: DateTime<Utc>,
}

/// One scan as reported by `GET scans` or `GET scans/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawScanSummary")]
pub struct ScanSummary {
    pub id: String,
    pub configuration_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScanSummary {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(default, rename = "scan_config", alias = "scanConfig")]
    scan_config: Option<IdRef>,
    #[serde(default, alias = "scanConfigId")]
    configuration_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<RawScanSummary> for ScanSummary {
    fn from(raw: RawScanSummary) -> Self {
        Self {
            id: raw.id,
            configuration_id: raw.configuration_id.or(raw.scan_config.map(|c| c.id)),
            status: raw.status,
        }
    }
}

/// Canonical reading of a service status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Queued,
    InProgress,
    Success,
    Failed,
    Cancelled,
}

impl StatusClass {
    /// Service versions disagree on spelling ("COMPLETE", "Completed",
    /// "Blacked Out"), so compare on an upper-cased, underscore-joined form.
    pub fn classify(status: &str) -> Self {
        let normalized: String = status
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "QUEUED" | "PENDING" => StatusClass::Queued,
            "SUCCESS" | "COMPLETE" | "COMPLETED" => StatusClass::Success,
            "FAILED" | "FAILURE" | "ERROR" => StatusClass::Failed,
            "CANCELED" | "CANCELLED" | "BLACKED_OUT" | "ABORTED" => StatusClass::Cancelled,
            _ => StatusClass::InProgress,
        }
    }
}

/// Final result of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Success,
    Failed,
    Cancelled,
    TimedOut,
    SubmissionError,
    ConfigNotFound,
}

impl ScanOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, ScanOutcome::Success)
    }

    pub fn exit_code(self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScanOutcome::Success => "success",
            ScanOutcome::Failed => "failed",
            ScanOutcome::Cancelled => "cancelled",
            ScanOutcome::TimedOut => "timed out",
            ScanOutcome::SubmissionError => "submission error",
            ScanOutcome::ConfigNotFound => "configuration not found",
        };
        f.write_str(label)
    }
}

/// Everything the entry point needs to report once the run is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: ScanOutcome,
    pub configuration: Option<ScanConfiguration>,
    pub handle: Option<ScanHandle>,
    pub last_status: Option<String>,
}

impl RunReport {
    pub fn new(outcome: ScanOutcome) -> Self {
        Self {
            outcome,
            configuration: None,
            handle: None,
            last_status: None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// Pull the item array out of a list response. The service has shipped
/// bare arrays, `{"data": [...]}` and `{"resources": [...]}`.
pub fn list_items(body: &Value) -> Option<&Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(map) => ["data", "resources"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    }
}

/// Decode every element of a list response, skipping ones that don't fit `T`.
pub fn decode_list<T: DeserializeOwned>(body: &Value, what: &str) -> Vec<T> {
    let Some(items) = list_items(body) else {
        log::warn!("[types] decode_list: what={} - response is not a list envelope", what);
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match T::deserialize(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                log::warn!("[types] decode_list: what={} index={} skipped error={}", what, index, e);
                None
            }
        })
        .collect()
}

/// The `id` of an object response, if present and non-empty.
pub fn response_id(body: &Value) -> Option<String> {
    id_string(body.get("id")?)
}

// Ids are opaque; some service versions send them as numbers.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    id_string(&value).ok_or_else(|| de::Error::custom(format!("expected a non-empty string or numeric id, got {}", value)))
}
