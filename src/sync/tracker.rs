use std::collections::HashSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::DomainWatcher;
use crate::cache::DetailCache;
use crate::cache::RecordCache;
use crate::client::join_path;
use crate::client::trim_domain;
use crate::client::ChildChangeEvent;
use crate::client::ChildWatcher;
use crate::client::RegistryClient;
use crate::topology::Activity;
use crate::Result;

/// One tracked domain: its watcher lease and its dispatch loop handle. The
/// watcher must be closed exactly once, on domain removal or on shutdown.
struct WatcherLease {
    watcher: Box<dyn ChildWatcher>,
    join: JoinHandle<()>,
}

/// Supervises the watcher tree: owns the root watcher and the table of
/// per-domain leases, and is the sole mutator of that table.
///
/// Per-domain tasks only ever report up through the shared caches; they
/// never touch the table, which rules out concurrent double-registration.
pub(crate) struct DomainTracker {
    client: Arc<dyn RegistryClient>,
    root: String,
    records: Arc<RecordCache>,
    details: Arc<DetailCache>,
    activity: Arc<Activity>,
    leases: DashMap<String, WatcherLease>,
    shutdown_signal: watch::Receiver<()>,
}

impl DomainTracker {
    pub(crate) fn new(
        client: Arc<dyn RegistryClient>,
        root: String,
        records: Arc<RecordCache>,
        details: Arc<DetailCache>,
        activity: Arc<Activity>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            client,
            root,
            records,
            details,
            activity,
            leases: DashMap::new(),
            shutdown_signal,
        }
    }

    /// Establishes the root watcher, runs one reconciliation pass up front
    /// and spawns the dispatch loop. Watcher creation failure is fatal;
    /// a failed initial pass is only logged and retried on the next
    /// notification.
    pub(crate) async fn start(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        let mut watcher = self.client.child_watcher(vec![self.root.clone()])?;
        let notify = watcher.start().await?;

        if let Err(e) = self.reconcile().await {
            error!("initial reconciliation failed: {}", e);
        }

        let tracker = self.clone();
        Ok(tokio::spawn(tracker.dispatch(watcher, notify)))
    }

    async fn dispatch(
        self: Arc<Self>,
        watcher: Box<dyn ChildWatcher>,
        mut notify: mpsc::Receiver<ChildChangeEvent>,
    ) {
        let mut shutdown_signal = self.shutdown_signal.clone();
        loop {
            tokio::select! {
                _ = shutdown_signal.changed() => {
                    debug!("[DomainTracker] shutdown signal received.");
                    watcher.close();
                    return;
                }
                event = notify.recv() => {
                    match event {
                        Some(_) => {
                            if let Err(e) = self.reconcile().await {
                                error!("reconciliation failed: {}", e);
                            }
                        }
                        None => return,
                    }
                }
            }
        }
    }

    /// Diffs the tracked domain set against the store's live set.
    ///
    /// Stale domains are dropped first, before their watchers can fire
    /// again; missing domains are then claimed and given a watcher. A
    /// registry read failure abandons the pass; the next notification
    /// retries it.
    pub(crate) async fn reconcile(&self) -> Result<()> {
        let (children, _) = self.client.get_children(&self.root).await?;
        let live: HashSet<String> = children
            .iter()
            .map(|name| trim_domain(name).to_string())
            .collect();

        let stale: Vec<String> = self
            .leases
            .iter()
            .filter(|entry| !live.contains(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        for domain in stale {
            if let Some((domain, lease)) = self.leases.remove(&domain) {
                lease.watcher.close();
                self.records.remove(&domain);
                self.details.remove(&domain);
                info!("stopped tracking {}", domain);
            }
        }

        for domain in live {
            if self.leases.contains_key(&domain) {
                // already claimed
                continue;
            }
            if let Err(e) = self.track(domain.clone()).await {
                error!("failed to watch {}: {}", domain, e);
            }
        }
        Ok(())
    }

    /// Claims one domain: starts a scoped child watcher and spawns its
    /// dispatch loop. The claim is re-checked when the lease is inserted;
    /// losing that race closes the redundant watcher, which in turn ends
    /// the redundant loop.
    async fn track(&self, domain: String) -> Result<()> {
        let path = join_path(&self.root, &domain);
        let mut watcher = self.client.child_watcher(vec![path.clone()])?;
        let notify = watcher.start().await?;

        let worker = DomainWatcher::new(
            domain.clone(),
            path,
            self.client.clone(),
            self.records.clone(),
            self.details.clone(),
            self.activity.clone(),
            self.shutdown_signal.clone(),
        );
        let join = tokio::spawn(worker.dispatch(notify));

        match self.leases.entry(domain.clone()) {
            Entry::Occupied(_) => {
                // lost the claim race: closing the watcher ends the
                // redundant loop on its next receive
                watcher.close();
                drop(join);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(WatcherLease { watcher, join });
                info!("tracking {}", domain);
            }
        }
        Ok(())
    }

    /// Closes every per-domain watcher and hands back the loop handles so
    /// the caller can await their exit. Called once, after the shutdown
    /// signal has been broadcast.
    pub(crate) fn close(&self) -> Vec<JoinHandle<()>> {
        let domains: Vec<String> = self.leases.iter().map(|entry| entry.key().clone()).collect();
        let mut joins = Vec::with_capacity(domains.len());
        for domain in domains {
            if let Some((_, lease)) = self.leases.remove(&domain) {
                lease.watcher.close();
                joins.push(lease.join);
            }
        }
        joins
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self, domain: &str) -> bool {
        self.leases.contains_key(domain)
    }

    #[cfg(test)]
    pub(crate) fn tracked_count(&self) -> usize {
        self.leases.len()
    }
}
