use std::net::IpAddr;

use dashmap::DashMap;

/// Concurrent mapping `domain -> ordered IP set`, the fast read path for
/// resolution.
#[derive(Debug, Default)]
pub(crate) struct RecordCache {
    records: DashMap<String, Vec<IpAddr>>,
}

impl RecordCache {
    pub(crate) fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Returns the cached address list, or `None` when the domain is absent
    /// or has no addresses to hand out. Callers cannot distinguish the two,
    /// which is intended.
    pub(crate) fn lookup(&self, domain: &str) -> Option<Vec<IpAddr>> {
        let ips = self.records.get(domain)?;
        if ips.is_empty() {
            return None;
        }
        Some(ips.value().clone())
    }

    /// Replaces the domain's entry wholesale so stale addresses never linger.
    pub(crate) fn replace(&self, domain: &str, ips: Vec<IpAddr>) {
        self.records.insert(domain.to_string(), ips);
    }

    pub(crate) fn remove(&self, domain: &str) {
        self.records.remove(domain);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}
