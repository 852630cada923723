use crate::client::Transport;
use crate::config::Config;
use crate::error::ResolveError;
use crate::pretty;
use crate::scan::{ConfigResolver, ScanLauncher, ScanMonitor};
use crate::types::{RunReport, ScanConfiguration, ScanOutcome};

/// Runs one scan from configuration lookup to a terminal outcome.
///
/// Stages run strictly in order and a failed stage ends the run; nothing
/// here exits the process.
pub struct Orchestrator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    config: &'a Config,
}

impl<'a, T: Transport + ?Sized> Orchestrator<'a, T> {
    pub fn new(transport: &'a T, config: &'a Config) -> Self {
        Self { transport, config }
    }

    pub async fn run(&self) -> RunReport {
        log::info!("[orchestrator] run: config={:?}", self.config);

        pretty::print_fetching_configs();
        let configuration = match self.resolve().await {
            Ok(configuration) => configuration,
            Err(e) => {
                log::error!("[orchestrator] resolve_failed: stage=resolve name={} error={}",
                    self.config.scan_config_name, e);
                pretty::print_failure("Scan configuration lookup", &e);
                return RunReport::new(ScanOutcome::ConfigNotFound);
            }
        };
        pretty::print_config_found(&configuration);

        let mut report = RunReport::new(ScanOutcome::SubmissionError);
        report.configuration = Some(configuration.clone());

        let launcher = ScanLauncher::new(self.transport, self.config.submit_retry, self.config.acquire_policy());
        let handle = match launcher.launch(&configuration.id).await {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("[orchestrator] launch_failed: stage=launch configuration_id={} error={}",
                    configuration.id, e);
                pretty::print_failure("Scan start", &e);
                return report;
            }
        };
        pretty::print_scan_started(&handle.scan_id);
        report.handle = Some(handle.clone());

        let monitor = ScanMonitor::new(self.transport, self.config.poll_interval);
        let watched = monitor.watch(&handle.scan_id, self.config.scan_timeout).await;

        log::info!("[orchestrator] finished: scan_id={} outcome={} last_status={:?}",
            handle.scan_id, watched.outcome, watched.last_status);

        report.outcome = watched.outcome;
        report.last_status = watched.last_status;
        report
    }

    /// Resolve the configuration, scoped to the application when one is set.
    async fn resolve(&self) -> Result<ScanConfiguration, ResolveError> {
        let resolver = ConfigResolver::new(self.transport);
        let application_id = self.application_id(&resolver).await?;
        resolver
            .resolve_scoped(&self.config.scan_config_name, application_id.as_deref())
            .await
    }

    /// List configurations (scoped like [`run`](Self::run)) without starting anything.
    pub async fn list_configurations(&self) -> Result<Vec<ScanConfiguration>, ResolveError> {
        let resolver = ConfigResolver::new(self.transport);
        let application_id = self.application_id(&resolver).await?;
        resolver.list(application_id.as_deref()).await
    }

    async fn application_id(&self, resolver: &ConfigResolver<'_, T>) -> Result<Option<String>, ResolveError> {
        match &self.config.app_name {
            Some(app_name) => Ok(Some(resolver.resolve_application(app_name).await?.id)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::ScriptedTransport;
    use crate::error::HttpError;
    use crate::poll::RetryPolicy;
    use crate::scan::launch::SCANS_PATH;
    use crate::scan::resolve::{APPS_PATH, SCAN_CONFIGS_PATH};
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;
    use url::Url;

    fn config(name: &str) -> Config {
        Config {
            api_key: "key".to_string(),
            base_url: Url::parse("https://example.test/ias/v1/").unwrap(),
            app_name: None,
            scan_config_name: name.to_string(),
            poll_interval: Duration::from_secs(30),
            scan_timeout: Duration::from_secs(600),
            launch_timeout: Duration::from_secs(120),
            submit_retry: RetryPolicy::new(3, Duration::from_secs(5)),
            request_timeout: Duration::from_secs(10),
        }
    }

    fn nodejsscan_configs() -> serde_json::Value {
        json!({"data": [{"id": "cfg1", "name": "nodejsscan"}]})
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_exits_zero() {
        let transport = ScriptedTransport::new()
            .on_get(SCAN_CONFIGS_PATH, nodejsscan_configs())
            .on_post(SCANS_PATH, json!({"id": "scan1"}))
            .on_get("scans/scan1", json!({"id": "scan1", "status": "QUEUED"}))
            .on_get("scans/scan1", json!({"id": "scan1", "status": "RUNNING"}))
            .on_get("scans/scan1", json!({"id": "scan1", "status": "COMPLETE"}));
        let config = config("nodejsscan");

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::Success);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.configuration.map(|c| c.id).as_deref(), Some("cfg1"));
        assert_eq!(report.handle.map(|h| h.scan_id).as_deref(), Some("scan1"));
        assert_eq!(report.last_status.as_deref(), Some("COMPLETE"));

        let paths: Vec<(Method, String)> = transport.calls().into_iter().map(|c| (c.method, c.path)).collect();
        assert_eq!(paths, vec![
            (Method::GET, SCAN_CONFIGS_PATH.to_string()),
            (Method::POST, SCANS_PATH.to_string()),
            (Method::GET, "scans/scan1".to_string()),
            (Method::GET, "scans/scan1".to_string()),
            (Method::GET, "scans/scan1".to_string()),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_configuration_never_starts_a_scan() {
        let transport = ScriptedTransport::new().on_get(SCAN_CONFIGS_PATH, nodejsscan_configs());
        let config = config("ghost-config");

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::ConfigNotFound);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(transport.count(Method::POST, SCANS_PATH), 0);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_list_failure_short_circuits() {
        let transport = ScriptedTransport::new().on(
            Method::GET,
            SCAN_CONFIGS_PATH,
            Err(HttpError::Connection("dns".to_string())),
        );
        let config = config("nodejsscan");

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::ConfigNotFound);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_scan_id_is_recovered() {
        let transport = ScriptedTransport::new()
            .on_get(SCAN_CONFIGS_PATH, nodejsscan_configs())
            .on_post(SCANS_PATH, json!({}))
            .on_get(SCANS_PATH, json!({"data": [{"id": "scan2", "scan_config": {"id": "cfg1"}, "status": "QUEUED"}]}))
            .on_get(SCANS_PATH, json!({"data": [{"id": "scan2", "scan_config": {"id": "cfg1"}, "status": "RUNNING"}]}))
            .on_get("scans/scan2", json!({"id": "scan2", "status": "COMPLETED"}));
        let config = config("nodejsscan");

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::Success);
        assert_eq!(report.handle.map(|h| h.scan_id).as_deref(), Some("scan2"));
        assert_eq!(transport.count(Method::POST, SCANS_PATH), 1);
        assert_eq!(transport.count(Method::GET, "scans/scan2"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_finished_scan_is_not_mistaken_for_this_run() {
        let transport = ScriptedTransport::new()
            .on_get(SCAN_CONFIGS_PATH, nodejsscan_configs())
            .on_post(SCANS_PATH, json!({}))
            .on_get(SCANS_PATH, json!([
                {"id": "yesterday", "scan_config": {"id": "cfg1"}, "status": "COMPLETE"},
                {"id": "new", "scan_config": {"id": "cfg1"}, "status": "QUEUED"},
            ]))
            .on_get(SCANS_PATH, json!([
                {"id": "yesterday", "scan_config": {"id": "cfg1"}, "status": "COMPLETE"},
                {"id": "new", "scan_config": {"id": "cfg1"}, "status": "RUNNING"},
            ]))
            .on_get("scans/new", json!({"id": "new", "status": "RUNNING"}))
            .on_get("scans/new", json!({"id": "new", "status": "FAILED"}));
        let config = config("nodejsscan");

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::Failed);
        assert_eq!(report.handle.map(|h| h.scan_id).as_deref(), Some("new"));
        assert_eq!(transport.count(Method::GET, "scans/yesterday"), 0);
        assert_eq!(transport.count(Method::GET, "scans/new"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_scan_timeout_still_polls() {
        let transport = ScriptedTransport::new()
            .on_get(SCAN_CONFIGS_PATH, nodejsscan_configs())
            .on_post(SCANS_PATH, json!({"id": "scan1"}))
            .on_get("scans/scan1", json!({"id": "scan1", "status": "RUNNING"}))
            .on_get("scans/scan1", json!({"id": "scan1", "status": "COMPLETE"}));
        let mut config = config("nodejsscan");
        config.scan_timeout = Duration::from_secs(u64::MAX);

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::Success);
        assert_eq!(transport.count(Method::GET, "scans/scan1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_id_never_found_is_submission_error() {
        let transport = ScriptedTransport::new()
            .on_get(SCAN_CONFIGS_PATH, nodejsscan_configs())
            .on_post(SCANS_PATH, json!({}))
            .on_get(SCANS_PATH, json!([]));
        let config = config("nodejsscan");

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::SubmissionError);
        assert_eq!(report.exit_code(), 1);
        assert!(report.handle.is_none());
        assert_eq!(transport.count(Method::POST, SCANS_PATH), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_running_scan_times_out() {
        let transport = ScriptedTransport::new()
            .on_get(SCAN_CONFIGS_PATH, nodejsscan_configs())
            .on_post(SCANS_PATH, json!({"id": "scan1"}))
            .on_get("scans/scan1", json!({"id": "scan1", "status": "RUNNING"}));
        let config = config("nodejsscan");
        let started = Instant::now();

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::TimedOut);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.last_status.as_deref(), Some("RUNNING"));
        assert_eq!(started.elapsed(), config.scan_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_scan_stops_polling() {
        let transport = ScriptedTransport::new()
            .on_get(SCAN_CONFIGS_PATH, nodejsscan_configs())
            .on_post(SCANS_PATH, json!({"id": "scan1"}))
            .on_get("scans/scan1", json!({"id": "scan1", "status": "RUNNING"}))
            .on_get("scans/scan1", json!({"id": "scan1", "status": "FAILED"}))
            .on_get("scans/scan1", json!({"id": "scan1", "status": "COMPLETE"}));
        let config = config("nodejsscan");

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::Failed);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(transport.count(Method::GET, "scans/scan1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_application_scoping() {
        let transport = ScriptedTransport::new()
            .on_get(APPS_PATH, json!({"data": [{"id": "app2", "name": "shop"}]}))
            .on_get(SCAN_CONFIGS_PATH, json!({"data": [
                {"id": "cfg1", "name": "nodejsscan", "app": {"id": "app1"}},
                {"id": "cfg2", "name": "nodejsscan", "app": {"id": "app2"}},
            ]}))
            .on_post(SCANS_PATH, json!({"id": "scan7"}))
            .on_get("scans/scan7", json!({"id": "scan7", "status": "SUCCESS"}));
        let mut config = config("nodejsscan");
        config.app_name = Some("shop".to_string());

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::Success);
        let posted = transport.calls().into_iter().find(|c| c.method == Method::POST).unwrap();
        assert_eq!(posted.body, Some(json!({"scan_config": {"id": "cfg2"}})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_application_is_config_not_found() {
        let transport = ScriptedTransport::new().on_get(APPS_PATH, json!({"data": []}));
        let mut config = config("nodejsscan");
        config.app_name = Some("nowhere".to_string());

        let report = Orchestrator::new(&transport, &config).run().await;

        assert_eq!(report.outcome, ScanOutcome::ConfigNotFound);
        assert_eq!(transport.count(Method::GET, SCAN_CONFIGS_PATH), 0);
    }

    #[tokio::test]
    async fn test_list_configurations() {
        let transport = ScriptedTransport::new()
            .on_get(APPS_PATH, json!([{"id": "app1", "name": "devopssphere.site"}]))
            .on_get(SCAN_CONFIGS_PATH, json!({"data": [
                {"id": "cfg1", "name": "nodejsscan", "app": {"id": "app1"}},
                {"id": "cfg2", "name": "other", "app": {"id": "app9"}},
            ]}));
        let mut config = config("unused");
        config.app_name = Some("devopssphere.site".to_string());

        let configs = Orchestrator::new(&transport, &config).list_configurations().await.unwrap();

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].id, "cfg1");
        assert_eq!(transport.count(Method::POST, SCANS_PATH), 0);
    }
}
