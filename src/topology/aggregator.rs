use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time;
use tokio::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use super::TopologyView;
use crate::cache::DetailCache;

/// Shared handle the per-domain watcher tasks bump after every successful
/// detail reload: records the instant and re-arms the short debounce.
pub(crate) struct Activity {
    last: Mutex<Instant>,
    wake: mpsc::Sender<()>,
}

impl Activity {
    pub(crate) fn new() -> (Arc<Self>, mpsc::Receiver<()>) {
        // capacity 1 and a lossy send: one pending wake-up is enough to
        // re-arm the timer, further bumps within the window coalesce
        let (wake, wake_rx) = mpsc::channel(1);
        let activity = Arc::new(Self {
            last: Mutex::new(Instant::now()),
            wake,
        });
        (activity, wake_rx)
    }

    pub(crate) fn touch(&self) {
        *self.last.lock() = Instant::now();
        let _ = self.wake.try_send(());
    }

    /// Whether a touch was recorded at or after `mark`.
    fn recorded_since(&self, mark: Instant) -> bool {
        *self.last.lock() >= mark
    }
}

/// Debounced background loop rebuilding the topology view from the detail
/// cache whenever activity settles.
///
/// Two timer regimes: a short debounce window coalescing bursts of updates
/// into one rebuild, and a long idle period once nothing has changed since
/// the previous pass. A full rebuild walks every domain, so batching many
/// domain changes into one pass bounds total rebuild cost.
pub(crate) struct Aggregator {
    details: Arc<DetailCache>,
    view: Arc<ArcSwap<TopologyView>>,
    activity: Arc<Activity>,
    debounce_window: Duration,
    idle_interval: Duration,
    // Activity at or after this instant triggers a rebuild; captured at
    // construction so reloads finishing before the loop is spawned still
    // count.
    mark: Instant,
    // Shutdown signal
    shutdown_signal: watch::Receiver<()>,
}

impl Aggregator {
    pub(crate) fn new(
        details: Arc<DetailCache>,
        view: Arc<ArcSwap<TopologyView>>,
        activity: Arc<Activity>,
        debounce_window: Duration,
        idle_interval: Duration,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            details,
            view,
            activity,
            debounce_window,
            idle_interval,
            mark: Instant::now(),
            shutdown_signal,
        }
    }

    pub(crate) async fn run(mut self, mut wake: mpsc::Receiver<()>) {
        let mut period = self.debounce_window;
        let mut mark = self.mark;

        loop {
            tokio::select! {
                _ = self.shutdown_signal.changed() => {
                    debug!("[Aggregator] shutdown signal received.");
                    return;
                }

                _ = time::sleep(period) => {
                    // the next mark is taken before the check: a touch
                    // racing the check is counted now and at worst once
                    // more on the next fire, never lost
                    let fired_at = Instant::now();
                    if self.activity.recorded_since(mark) {
                        // more activity may still be arriving, stay on the
                        // short window
                        self.publish();
                        period = self.debounce_window;
                    } else {
                        period = self.idle_interval;
                    }
                    mark = fired_at;
                }

                Some(_) = wake.recv() => {
                    period = self.debounce_window;
                }
            }
        }
    }

    /// Builds a brand-new view off to the side and swaps it in atomically;
    /// readers see either the old or the new view, never a partial one.
    fn publish(&self) {
        let mut view = TopologyView::new();
        for (domain, payloads) in self.details.snapshot() {
            for payload in payloads {
                if let Err(e) = view.append(&domain, &payload) {
                    warn!("skipping entry: {}", e);
                }
            }
        }
        self.view.store(Arc::new(view));
    }
}
