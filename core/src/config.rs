use std::fs;
use std::path::{Path, PathBuf};

use crate::model::ServiceTopology;
use crate::Result;

/// Viewer and discovery configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TopologyConfig {
    pub enabled: bool,
    /// Overrides the service name reported by the local descriptor
    pub service_name: Option<String>,
    /// Serve channel schemas and example payloads with the local topology
    pub include_schema: bool,
    /// JSON file holding the local topology descriptor
    pub descriptor: Option<PathBuf>,
    /// Base URLs of remote services
    pub services: Vec<String>,
    pub auto_discover: bool,
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: None,
            include_schema: true,
            descriptor: None,
            services: Vec::new(),
            auto_discover: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_ms: 2_000,
        }
    }
}

impl TopologyConfig {
    /// Defaults overlaid with `TAPESTRY_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.is_empty());
        let flag = |key: &str, default: bool| {
            var(key)
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(default)
        };
        let base = Self::default();

        Self {
            enabled: flag("TAPESTRY_ENABLED", base.enabled),
            service_name: var("TAPESTRY_SERVICE_NAME"),
            include_schema: flag("TAPESTRY_INCLUDE_SCHEMA", base.include_schema),
            descriptor: var("TAPESTRY_DESCRIPTOR").map(PathBuf::from),
            services: var("TAPESTRY_SERVICES")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            auto_discover: flag("TAPESTRY_AUTO_DISCOVER", base.auto_discover),
            host: var("TAPESTRY_HOST").unwrap_or(base.host),
            port: var("TAPESTRY_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(base.port),
            request_timeout_ms: var("TAPESTRY_REQUEST_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.request_timeout_ms),
        }
    }

    /// Load configuration: defaults, then env, then the TOML file named by
    /// `TAPESTRY_CONFIG` (or ./tapestry.toml) when it exists.
    pub fn load() -> Self {
        let base = Self::from_env();
        let path = std::env::var("TAPESTRY_CONFIG").unwrap_or_else(|_| "tapestry.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "config", path = %path, "No TOML config found; using defaults/env");
            return base;
        }
        match Self::load_file(p, base.clone()) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(target: "config", path = %path, error = %e, "Failed to load TOML config; using defaults/env");
                base
            }
        }
    }

    /// Overlay the TOML file at `path` onto `base`
    pub fn load_file(path: &Path, base: Self) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let overlay: TopologyToml = toml::from_str(&s)?;
        Ok(overlay.apply(base))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Local topology from the configured descriptor file.
    ///
    /// A missing or unreadable descriptor yields an empty topology named after
    /// `service_name`, or "Unknown".
    pub fn local_topology(&self) -> ServiceTopology {
        let mut topology = match &self.descriptor {
            Some(path) => match read_descriptor(path) {
                Ok(topology) => topology,
                Err(e) => {
                    tracing::warn!(
                        target: "config",
                        path = %path.display(),
                        error = %e,
                        "Failed to read local topology descriptor"
                    );
                    ServiceTopology::default()
                }
            },
            None => ServiceTopology::default(),
        };

        if let Some(name) = &self.service_name {
            topology.service_name = name.clone();
        }
        if topology.service_name.is_empty() {
            topology.service_name = "Unknown".to_string();
        }
        topology
    }
}

fn read_descriptor(path: &Path) -> Result<ServiceTopology> {
    let s = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TopologyToml {
    pub enabled: Option<bool>,
    pub service_name: Option<String>,
    pub include_schema: Option<bool>,
    pub descriptor: Option<PathBuf>,
    pub services: Option<Vec<String>>,
    pub auto_discover: Option<bool>,
    pub server: Option<ServerToml>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ServerToml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_ms: Option<u64>,
}

impl TopologyToml {
    fn apply(self, mut base: TopologyConfig) -> TopologyConfig {
        if let Some(v) = self.enabled {
            base.enabled = v;
        }
        if let Some(v) = self.service_name {
            base.service_name = Some(v);
        }
        if let Some(v) = self.include_schema {
            base.include_schema = v;
        }
        if let Some(v) = self.descriptor {
            base.descriptor = Some(v);
        }
        if let Some(v) = self.services {
            base.services = v;
        }
        if let Some(v) = self.auto_discover {
            base.auto_discover = v;
        }
        if let Some(s) = self.server {
            if let Some(v) = s.host {
                base.host = v;
            }
            if let Some(v) = s.port {
                base.port = v;
            }
            if let Some(v) = s.request_timeout_ms {
                base.request_timeout_ms = v;
            }
        }
        base
    }
}
