use crate::client::Transport;
use crate::error::ResolveError;
use crate::types::{Application, ScanConfiguration, decode_list};

pub const SCAN_CONFIGS_PATH: &str = "scan-configs";
pub const APPS_PATH: &str = "apps";

/// Looks up scan configurations (and optionally their application) by name.
///
/// The service has no filter-by-name, so every lookup fetches the whole list
/// once and matches exactly and case-sensitively on the client.
pub struct ConfigResolver<'a, T: Transport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: Transport + ?Sized> ConfigResolver<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn resolve(&self, name: &str) -> Result<ScanConfiguration, ResolveError> {
        self.resolve_scoped(name, None).await
    }

    /// Like [`resolve`](Self::resolve) but only considers configurations
    /// owned by `application_id` when one is given.
    pub async fn resolve_scoped(
        &self,
        name: &str,
        application_id: Option<&str>,
    ) -> Result<ScanConfiguration, ResolveError> {
        log::debug!("[scan::resolve] resolve: name={} application_id={:?}", name, application_id);

        let configs = self.list(application_id).await?;
        let mut matches = configs.iter().filter(|c| c.name == name);

        let Some(found) = matches.next() else {
            log::error!("[scan::resolve] config_not_found: name={} application_id={:?} available={}",
                name, application_id, configs.len());
            return Err(ResolveError::ConfigNotFound {
                name: name.to_string(),
                available: configs.len(),
            });
        };

        let duplicates = matches.count();
        if duplicates > 0 {
            log::warn!("[scan::resolve] ambiguous_name: name={} extra_matches={} using_id={}",
                name, duplicates, found.id);
        }

        log::info!("[scan::resolve] config_found: name={} id={}", found.name, found.id);
        Ok(found.clone())
    }

    /// Every configuration, optionally restricted to one application.
    pub async fn list(&self, application_id: Option<&str>) -> Result<Vec<ScanConfiguration>, ResolveError> {
        let body = self
            .transport
            .get(SCAN_CONFIGS_PATH)
            .await
            .map_err(|source| {
                log::error!("[scan::resolve] list_failed: stage=resolve error={}", source);
                ResolveError::Transport { what: "scan configurations", source }
            })?;

        let mut configs: Vec<ScanConfiguration> = decode_list(&body, "scan configurations");
        if let Some(app_id) = application_id {
            configs.retain(|c| c.application_id.as_deref() == Some(app_id));
        }

        log::debug!("[scan::resolve] list: count={} application_id={:?}", configs.len(), application_id);
        Ok(configs)
    }

    pub async fn resolve_application(&self, name: &str) -> Result<Application, ResolveError> {
        let body = self
            .transport
            .get(APPS_PATH)
            .await
            .map_err(|source| {
                log::error!("[scan::resolve] apps_failed: stage=resolve error={}", source);
                ResolveError::Transport { what: "applications", source }
            })?;

        let apps: Vec<Application> = decode_list(&body, "applications");
        match apps.iter().find(|app| app.name == name) {
            Some(app) => {
                log::info!("[scan::resolve] application_found: name={} id={}", app.name, app.id);
                Ok(app.clone())
            }
            None => {
                log::error!("[scan::resolve] application_not_found: name={} available={}", name, apps.len());
                Err(ResolveError::ApplicationNotFound {
                    name: name.to_string(),
                    available: apps.len(),
                })
            }
        }
    }
}
