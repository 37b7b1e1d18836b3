use dashmap::DashMap;

/// Concurrent mapping `domain -> raw per-node payloads`, the input to
/// topology aggregation. Payload order matches per-node listing order.
#[derive(Debug, Default)]
pub(crate) struct DetailCache {
    details: DashMap<String, Vec<Vec<u8>>>,
}

impl DetailCache {
    pub(crate) fn new() -> Self {
        Self {
            details: DashMap::new(),
        }
    }

    /// Replaces the domain's payload list wholesale.
    pub(crate) fn replace(&self, domain: &str, payloads: Vec<Vec<u8>>) {
        self.details.insert(domain.to_string(), payloads);
    }

    pub(crate) fn remove(&self, domain: &str) {
        self.details.remove(domain);
    }

    /// Clones the full map for one aggregation pass. The snapshot is
    /// decoupled from concurrent writers; a rebuild never observes a
    /// half-replaced entry.
    pub(crate) fn snapshot(&self) -> Vec<(String, Vec<Vec<u8>>)> {
        self.details
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.details.len()
    }
}
