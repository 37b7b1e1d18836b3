//! The consumed registry surface.
//!
//! The synchronization engine talks to the distributed hierarchical store
//! exclusively through [`RegistryClient`] and [`ChildWatcher`]. The concrete
//! transport (TCP/TLS, retries, session handling) lives behind these traits
//! and is supplied by the embedding process.

mod path;
pub use path::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::Result;

/// Fired whenever the child set under a watched path changes.
#[derive(Debug, Clone)]
pub struct ChildChangeEvent {
    /// The watched path whose children changed
    pub path: String,
    /// Current child names under `path`
    pub children: Vec<String>,
}

/// Node metadata returned alongside read operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStat {
    pub version: u32,
}

/// A subscription yielding one notification per child-set change of the
/// watched paths.
///
/// `close` must end the notification stream: receivers observe channel
/// closure and dispatch loops exit. Closing an already-closed watcher is a
/// no-op.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChildWatcher: Send + Sync {
    async fn start(&mut self) -> Result<mpsc::Receiver<ChildChangeEvent>>;

    fn close(&self);
}

/// CRUD and children-listing primitives against the distributed store.
///
/// No method retries internally; transient failures surface as
/// [`crate::RegistryError`] and the caller decides whether the enclosing
/// pass is abandoned or propagated.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegistryClient: Send + Sync + 'static {
    async fn exists(&self, path: &str) -> Result<bool>;

    async fn create_persistent_node(&self, path: &str, value: &str) -> Result<()>;

    async fn update(&self, path: &str, value: &str) -> Result<()>;

    /// Deletes the node at `path` together with its subtree.
    async fn delete(&self, path: &str) -> Result<()>;

    async fn get_children(&self, path: &str) -> Result<(Vec<String>, NodeStat)>;

    async fn get_value(&self, path: &str) -> Result<(Vec<u8>, NodeStat)>;

    /// Creates a watcher over the child sets of `paths`. The watcher is
    /// inert until [`ChildWatcher::start`] is called.
    fn child_watcher(&self, paths: Vec<String>) -> Result<Box<dyn ChildWatcher>>;
}
