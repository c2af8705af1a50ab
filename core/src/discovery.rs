// Remote topology discovery
//
// Fetches topology descriptors from the services registered in a
// ServiceDirectory. A failing service is reported, never fatal for the batch.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::directory::ServiceDirectory;
use crate::model::ServiceTopology;
use crate::{Result, TapestryError, TOPOLOGY_PATH};

const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Outcome of one discovery pass
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    /// One entry per registered URL, `None` where the fetch failed
    pub topologies: Vec<Option<ServiceTopology>>,
    /// `"<url> (<reason>)"` for every failed fetch
    pub failed: Vec<String>,
}

impl DiscoveryReport {
    pub fn discovered_count(&self) -> usize {
        self.topologies.len()
    }
}

/// HTTP client for remote topology endpoints
#[derive(Clone)]
pub struct RemoteDiscovery {
    http_client: reqwest::Client,
}

impl Default for RemoteDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteDiscovery {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent("tapestry/0.1")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { http_client }
    }

    /// GET `<base_url>/q/messaging-topology`
    pub async fn fetch_topology(&self, base_url: &str) -> Result<ServiceTopology> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), TOPOLOGY_PATH);
        debug!(target: "discovery", url = %url, "Fetching remote topology");

        let resp = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(TapestryError::UnexpectedStatus {
                url: base_url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(resp.json::<ServiceTopology>().await?)
    }

    /// Fetch every registered service in registration order
    pub async fn discover(&self, directory: &ServiceDirectory) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for url in directory.urls() {
            match self.fetch_topology(&url).await {
                Ok(topology) => {
                    directory.record_name(&url, &topology.service_name);
                    report.topologies.push(Some(topology));
                }
                Err(TapestryError::UnexpectedStatus { status, .. }) => {
                    warn!(target: "discovery", url = %url, status, "Remote topology unavailable");
                    report.failed.push(format!("{} (HTTP {})", url, status));
                    report.topologies.push(None);
                }
                Err(e) => {
                    warn!(target: "discovery", url = %url, error = %e, "Remote topology fetch failed");
                    report.failed.push(format!("{} ({})", url, e));
                    report.topologies.push(None);
                }
            }
        }

        info!(
            target: "discovery",
            services = report.topologies.len(),
            failed = report.failed.len(),
            "Discovery pass finished"
        );
        report
    }

    /// Locate the base URL of a service by its reported name.
    ///
    /// Uses names learned from earlier fetches first, then probes every
    /// registered URL until one reports a matching name.
    pub async fn find_service_url(
        &self,
        directory: &ServiceDirectory,
        service_name: &str,
    ) -> Option<String> {
        if let Some(url) = directory.url_for(service_name) {
            return Some(url);
        }

        for url in directory.urls() {
            match self.fetch_topology(&url).await {
                Ok(topology) => {
                    directory.record_name(&url, &topology.service_name);
                    if topology.service_name == service_name {
                        return Some(url);
                    }
                }
                Err(e) => {
                    debug!(target: "discovery", url = %url, error = %e, "Probe failed, continuing");
                }
            }
        }
        None
    }

    /// Fetch the topology of a named remote service
    pub async fn fetch_service(
        &self,
        directory: &ServiceDirectory,
        service_name: &str,
    ) -> Option<ServiceTopology> {
        let url = self.find_service_url(directory, service_name).await?;
        match self.fetch_topology(&url).await {
            Ok(topology) => Some(topology),
            Err(e) => {
                warn!(target: "discovery", url = %url, error = %e, "Failed to fetch service topology");
                None
            }
        }
    }
}
