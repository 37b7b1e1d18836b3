use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::Error;
use crate::ResolverError;
use crate::ResolverSettings;
use crate::Result;

/// Default public resolvers written when the names file is missing.
pub const DEFAULT_NAMES: [&str; 2] = ["114.114.114.114", "8.8.8.8"];

/// The local fallback nameserver list.
///
/// `lookup` hands out `ip:port` strings ordered by measured responsiveness.
/// The backing file is created with [`DEFAULT_NAMES`] when absent and
/// reloaded on every file-change notification.
pub struct NameServers {
    settings: ResolverSettings,
    names: Mutex<Vec<String>>,
    // dropping the watcher stops file notifications and ends the loop
    watcher: Mutex<Option<RecommendedWatcher>>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown_signal: watch::Receiver<()>,
}

impl NameServers {
    pub fn new(settings: ResolverSettings, shutdown_signal: watch::Receiver<()>) -> Self {
        Self {
            settings,
            names: Mutex::new(Vec::new()),
            watcher: Mutex::new(None),
            task: Mutex::new(None),
            shutdown_signal,
        }
    }

    /// Creates the names file when absent, performs the initial load and
    /// spawns the reload loop.
    ///
    /// # Errors
    /// File creation and watcher registration failures are fatal; the
    /// service must not come up without its fallback list.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.ensure_names_file().await?;

        let file_name = self
            .settings
            .names_file
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| Error::Fatal("resolver.names_file must name a file".to_string()))?;

        let (tx, mut rx) = mpsc::channel(8);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let Ok(event) = res else { return };
            if !event.kind.is_modify() && !event.kind.is_create() {
                return;
            }
            if event.paths.iter().any(|p| p.file_name() == Some(file_name.as_os_str())) {
                // lossy: one pending wake-up is enough
                let _ = tx.try_send(());
            }
        })
        .map_err(ResolverError::Notify)?;

        // the directory is watched, not the file: editors and atomic
        // replaces would otherwise drop the subscription
        let watch_dir = self
            .settings
            .names_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .map_err(ResolverError::Notify)?;
        *self.watcher.lock() = Some(watcher);

        self.reload().await?;
        info!("upstream nameservers enabled, {} entries", self.len());

        let servers = self.clone();
        let task = tokio::spawn(async move {
            let mut shutdown_signal = servers.shutdown_signal.clone();
            loop {
                tokio::select! {
                    _ = shutdown_signal.changed() => {
                        debug!("[NameServers] shutdown signal received.");
                        return;
                    }
                    event = rx.recv() => {
                        match event {
                            Some(_) => {
                                if let Err(e) = servers.reload().await {
                                    error!("reload of nameserver list failed: {}", e);
                                    continue;
                                }
                                info!("upstream nameservers reloaded, {} entries", servers.len());
                            }
                            None => return,
                        }
                    }
                }
            }
        });
        *self.task.lock() = Some(task);
        Ok(())
    }

    /// The current upstream addresses, best-ranked first.
    pub fn lookup(&self) -> Vec<String> {
        self.names.lock().clone()
    }

    /// Stops file notifications and waits for the reload loop to exit.
    pub async fn close(&self) {
        *self.watcher.lock() = None;
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    fn len(&self) -> usize {
        self.names.lock().len()
    }

    pub(crate) async fn reload(&self) -> Result<()> {
        let raw = tokio::fs::read_to_string(&self.settings.names_file)
            .await
            .map_err(ResolverError::Io)?;
        let parsed = parse_names(&raw);
        let ranked = rank_by_rtt(parsed, self.settings.port, self.settings.probe_timeout()).await;

        let port = self.settings.port;
        let addrs = ranked.into_iter().map(|ip| host_port(&ip, port)).collect();
        *self.names.lock() = addrs;
        Ok(())
    }

    async fn ensure_names_file(&self) -> Result<()> {
        let path = &self.settings.names_file;
        if tokio::fs::try_exists(path).await.map_err(ResolverError::Io)? {
            return Ok(());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(ResolverError::Io)?;
        }
        tokio::fs::write(path, DEFAULT_NAMES.join("\n"))
            .await
            .map_err(ResolverError::Io)?;
        Ok(())
    }
}

/// Parses the hosts-style file: blank lines and `#` comments are ignored,
/// malformed addresses are expected noise from hand-edited files and are
/// dropped silently, duplicates collapse keeping first-seen order.
pub(crate) fn parse_names(raw: &str) -> Vec<IpAddr> {
    let mut names = Vec::new();
    for line in raw.lines() {
        let line = line.replace('\t', " ");
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Ok(ip) = line.parse::<IpAddr>() {
            if !names.contains(&ip) {
                names.push(ip);
            }
        }
    }
    names
}

/// Orders addresses by connect round-trip, fastest first. Unreachable
/// entries rank last; when every probe fails the file order is kept.
pub(crate) async fn rank_by_rtt(ips: Vec<IpAddr>, port: u16, limit: Duration) -> Vec<IpAddr> {
    let rtts = join_all(ips.iter().map(|ip| probe(*ip, port, limit))).await;
    if rtts.iter().all(Option::is_none) {
        return ips;
    }

    let mut ranked: Vec<(Duration, IpAddr)> = ips
        .into_iter()
        .zip(rtts)
        .map(|(ip, rtt)| (rtt.unwrap_or(Duration::MAX), ip))
        .collect();
    // stable sort: equally ranked entries keep file order
    ranked.sort_by_key(|(rtt, _)| *rtt);
    ranked.into_iter().map(|(_, ip)| ip).collect()
}

async fn probe(ip: IpAddr, port: u16, limit: Duration) -> Option<Duration> {
    let started = Instant::now();
    match time::timeout(limit, TcpStream::connect((ip, port))).await {
        Ok(Ok(_)) => Some(started.elapsed()),
        _ => None,
    }
}

pub(crate) fn host_port(ip: &IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(_) => format!("{ip}:{port}"),
        IpAddr::V6(_) => format!("[{ip}]:{port}"),
    }
}
