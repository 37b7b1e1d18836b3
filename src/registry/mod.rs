//! The public facade of the synchronization engine.
//!
//! [`Registry`] composes the watcher tree, the shared caches and the
//! aggregation loop behind a small API consumed by the DNS answer path and
//! the HTTP handlers. Read paths never fail: absent data simply means
//! nothing to return. Write paths propagate registry errors directly.


use std::net::IpAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::DetailCache;
use crate::cache::RecordCache;
use crate::client::join_path;
use crate::client::RegistryClient;
use crate::sync::DomainTracker;
use crate::topology::Activity;
use crate::topology::Aggregator;
use crate::topology::TopologyView;
use crate::Error;
use crate::RegistryError;
use crate::Result;
use crate::Settings;
use crate::PLACEHOLDER;

pub struct Registry {
    client: Arc<dyn RegistryClient>,
    root: String,
    records: Arc<RecordCache>,
    topology: Arc<ArcSwap<TopologyView>>,
    tracker: Arc<DomainTracker>,
    // consumed by start(); the loop is built up front so no activity
    // recorded between construction and start is lost
    aggregator: Mutex<Option<(Aggregator, mpsc::Receiver<()>)>>,
    shutdown_tx: watch::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Registry {
    pub fn new(client: Arc<dyn RegistryClient>, settings: Arc<Settings>) -> Self {
        let records = Arc::new(RecordCache::new());
        let details = Arc::new(DetailCache::new());
        let topology = Arc::new(ArcSwap::from_pointee(TopologyView::new()));
        let (activity, wake_rx) = Activity::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(());

        let root = settings.registry.root_path.trim_end_matches('/').to_string();
        let tracker = Arc::new(DomainTracker::new(
            client.clone(),
            root.clone(),
            records.clone(),
            details.clone(),
            activity.clone(),
            shutdown_rx.clone(),
        ));
        let aggregator = Aggregator::new(
            details,
            topology.clone(),
            activity,
            settings.aggregator.debounce_window(),
            settings.aggregator.idle_interval(),
            shutdown_rx,
        );

        Self {
            client,
            root,
            records,
            topology,
            tracker,
            aggregator: Mutex::new(Some((aggregator, wake_rx))),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Starts the synchronization engine: the root dispatch loop (which
    /// reconciles once immediately) and the aggregation loop.
    ///
    /// # Errors
    /// - [`crate::RegistryError`] if the root watcher cannot be established;
    ///   the service must not come up in that case
    /// - [`crate::Error::Fatal`] when called twice
    pub async fn start(&self) -> Result<()> {
        let (aggregator, wake_rx) = self
            .aggregator
            .lock()
            .take()
            .ok_or_else(|| Error::Fatal("registry already started".to_string()))?;

        let root_task = self.tracker.start().await?;
        let aggregator_task = tokio::spawn(aggregator.run(wake_rx));
        self.tasks.lock().extend([root_task, aggregator_task]);
        Ok(())
    }

    /// Resolves a domain from the record cache.
    ///
    /// Returns `None` when the domain is unknown or currently has no
    /// addresses; the two cases are indistinguishable on purpose.
    pub fn lookup(&self, domain: &str) -> Option<Vec<IpAddr>> {
        self.records.lookup(domain)
    }

    /// The last-published topology snapshot. Never blocks on a rebuild in
    /// progress; a snapshot is immutable once published.
    pub fn domain_details(&self) -> Arc<TopologyView> {
        self.topology.load_full()
    }

    /// Upserts one node at `root/<domain>/<ip>`. Without an explicit value
    /// the placeholder `{}` is stored. Idempotent; when a create loses a
    /// race to a concurrent create the value is written via update, so the
    /// latest write wins either way.
    ///
    /// # Errors
    /// - [`crate::RegistryError`] on store failures
    pub async fn create_or_update(&self, domain: &str, ip: &str, value: Option<&str>) -> Result<()> {
        let path = join_path(&join_path(&self.root, domain), ip);
        let value = value.unwrap_or(PLACEHOLDER);
        if self.client.exists(&path).await? {
            return self.client.update(&path, value).await;
        }
        match self.client.create_persistent_node(&path, value).await {
            Err(Error::Registry(RegistryError::NodeExists(_))) => {
                self.client.update(&path, value).await
            }
            result => result,
        }
    }

    /// Replaces a domain's entire node set: the subtree is deleted, then
    /// one placeholder node is created per supplied address.
    ///
    /// Not atomic: a watcher firing mid-operation may observe a transient
    /// empty domain. Reconciliation converges to the final set once every
    /// create has completed.
    ///
    /// # Errors
    /// - [`crate::RegistryError`] on store failures; a partial failure may
    ///   leave a subset of the addresses registered
    pub async fn update(
        &self,
        domain: &str,
        ips: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<()> {
        let domain_path = join_path(&self.root, domain);
        if self.client.exists(&domain_path).await? {
            self.client.delete(&domain_path).await?;
        }
        for ip in ips {
            self.client
                .create_persistent_node(&join_path(&domain_path, ip.as_ref()), PLACEHOLDER)
                .await?;
        }
        Ok(())
    }

    /// Broadcasts shutdown, closes the root watcher and every per-domain
    /// watcher and waits for all dispatch loops to exit. Loops mid-reload
    /// finish their pass first; their late failures are only logged.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(());
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        tasks.extend(self.tracker.close());
        for task in tasks {
            let _ = task.await;
        }
    }

    #[cfg(test)]
    pub(crate) fn seed_records(&self, domain: &str, ips: Vec<IpAddr>) {
        self.records.replace(domain, ips);
    }
}
