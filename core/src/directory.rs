use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Remote service known to the directory
#[derive(Debug, Clone, Default)]
pub struct ServiceEntry {
    pub url: String,
    /// Name reported by the service's last topology fetch
    pub service_name: Option<String>,
    order: u64,
}

/// In-memory directory of remote service base URLs.
///
/// Nothing is persisted; the directory lives as long as the process.
#[derive(Debug, Default)]
pub struct ServiceDirectory {
    services: DashMap<String, ServiceEntry>, // url -> entry
    next_order: AtomicU64,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dir = Self::new();
        for url in urls {
            dir.register(url.as_ref());
        }
        dir
    }

    /// Register a base URL. Re-registering keeps the original position.
    pub fn register(&self, url: &str) {
        let url = normalize(url);
        if url.is_empty() {
            return;
        }
        let order = &self.next_order;
        self.services
            .entry(url.clone())
            .or_insert_with(|| ServiceEntry {
                url,
                service_name: None,
                order: order.fetch_add(1, Ordering::Relaxed),
            });
    }

    pub fn unregister(&self, url: &str) -> bool {
        self.services.remove(&normalize(url)).is_some()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.services.contains_key(&normalize(url))
    }

    /// Remember which service answered at `url`
    pub fn record_name(&self, url: &str, service_name: &str) {
        if let Some(mut entry) = self.services.get_mut(&normalize(url)) {
            entry.service_name = Some(service_name.to_string());
        }
    }

    /// Base URL of a service whose name was already learned
    pub fn url_for(&self, service_name: &str) -> Option<String> {
        self.all()
            .into_iter()
            .find(|e| e.service_name.as_deref() == Some(service_name))
            .map(|e| e.url)
    }

    /// Registered URLs in registration order
    pub fn urls(&self) -> Vec<String> {
        self.all().into_iter().map(|e| e.url).collect()
    }

    pub fn all(&self) -> Vec<ServiceEntry> {
        let mut entries: Vec<ServiceEntry> = self.services.iter().map(|e| e.clone()).collect();
        entries.sort_by_key(|e| e.order);
        entries
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

fn normalize(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
