use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;

use crate::cache::DetailCache;
use crate::cache::RecordCache;
use crate::client::join_path;
use crate::client::node_address;
use crate::client::ChildChangeEvent;
use crate::client::RegistryClient;
use crate::topology::Activity;
use crate::Result;

/// Per-domain reload loop.
///
/// Reloads are strictly sequential within one domain; across domains the
/// loops run fully concurrently, which the caches tolerate because every
/// entry is replaced wholesale.
pub(crate) struct DomainWatcher {
    domain: String,
    path: String,
    client: Arc<dyn RegistryClient>,
    records: Arc<RecordCache>,
    details: Arc<DetailCache>,
    activity: Arc<Activity>,
    shutdown_signal: watch::Receiver<()>,
}

impl DomainWatcher {
    pub(crate) fn new(
        domain: String,
        path: String,
        client: Arc<dyn RegistryClient>,
        records: Arc<RecordCache>,
        details: Arc<DetailCache>,
        activity: Arc<Activity>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            domain,
            path,
            client,
            records,
            details,
            activity,
            shutdown_signal,
        }
    }

    /// Dispatch loop: one reload per notification, plus one up front so the
    /// caches are warm before the first change arrives. Ends on shutdown or
    /// when the tracker closes the watcher feeding `notify`.
    pub(crate) async fn dispatch(mut self, mut notify: mpsc::Receiver<ChildChangeEvent>) {
        if let Err(e) = self.reload().await {
            error!("initial load of {} failed: {}", self.domain, e);
        }
        loop {
            tokio::select! {
                _ = self.shutdown_signal.changed() => {
                    debug!("[DomainWatcher:{}] shutdown signal received.", self.domain);
                    return;
                }
                event = notify.recv() => {
                    match event {
                        Some(_) => {
                            if let Err(e) = self.reload().await {
                                error!("reload of {} failed: {}", self.domain, e);
                            }
                        }
                        // watcher closed, the domain is gone
                        None => return,
                    }
                }
            }
        }
    }

    /// Fetches the domain's child nodes and every node value, then replaces
    /// both cache entries wholesale. Nothing is published until every fetch
    /// succeeded, so a partial failure leaves the previous values intact.
    pub(crate) async fn reload(&self) -> Result<()> {
        let (children, _) = self.client.get_children(&self.path).await?;

        let ips = parse_records(&children);
        let mut payloads = Vec::with_capacity(children.len());
        for node in &children {
            let (value, _) = self.client.get_value(&join_path(&self.path, node)).await?;
            payloads.push(value);
        }

        if ips.is_empty() {
            // withdrawn: no addresses to hand out
            self.records.remove(&self.domain);
        } else {
            self.records.replace(&self.domain, ips);
        }
        self.details.replace(&self.domain, payloads);

        self.activity.touch();
        Ok(())
    }
}

/// Parses node names into addresses: the portion before the first
/// underscore is the address, malformed entries are dropped silently and
/// duplicates collapse keeping first-seen order.
pub(crate) fn parse_records(names: &[String]) -> Vec<IpAddr> {
    let mut ips: Vec<IpAddr> = Vec::with_capacity(names.len());
    for name in names {
        if let Ok(ip) = node_address(name).parse::<IpAddr>() {
            if !ips.contains(&ip) {
                ips.push(ip);
            }
        }
    }
    ips
}
