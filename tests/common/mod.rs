//! In-memory stand-in for the coordination service: a path tree with
//! working child watchers, shared by the integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ddns::ChildChangeEvent;
use ddns::ChildWatcher;
use ddns::NodeStat;
use ddns::RegistryClient;
use ddns::RegistryError;
use ddns::Result;
use parking_lot::Mutex;
use tokio::sync::mpsc;

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, Vec<u8>>,
    watchers: Vec<WatcherEntry>,
    next_watcher_id: u64,
}

struct WatcherEntry {
    id: u64,
    paths: Vec<String>,
    tx: mpsc::Sender<ChildChangeEvent>,
}

/// Behavioral notes, matching the consumed store surface:
/// - intermediate nodes spring into existence on create
/// - delete removes the whole subtree
/// - listing children of a missing node yields an empty set
/// - child watchers fire on child creation/removal and on child value
///   updates
#[derive(Default)]
pub struct InMemoryRegistry {
    state: Arc<Mutex<State>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn parent_of(path: &str) -> Option<String> {
        let (parent, _) = path.rsplit_once('/')?;
        if parent.is_empty() {
            None
        } else {
            Some(parent.to_string())
        }
    }

    fn children_of(nodes: &BTreeMap<String, Vec<u8>>, path: &str) -> Vec<String> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        nodes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(|rest| rest.to_string())
            .collect()
    }

    fn notify(state: &mut State, mut parents: Vec<String>) {
        parents.sort();
        parents.dedup();
        for parent in parents {
            let children = Self::children_of(&state.nodes, &parent);
            for watcher in &state.watchers {
                if watcher.paths.iter().any(|p| p == &parent) {
                    let _ = watcher.tx.try_send(ChildChangeEvent {
                        path: parent.clone(),
                        children: children.clone(),
                    });
                }
            }
        }
    }

    fn insert_with_parents(state: &mut State, path: &str, value: Vec<u8>) {
        let mut touched_parents = Vec::new();

        let ancestors: Vec<String> = path
            .char_indices()
            .skip(1)
            .filter(|(_, c)| *c == '/')
            .map(|(i, _)| path[..i].to_string())
            .collect();
        for ancestor in ancestors {
            if !state.nodes.contains_key(&ancestor) {
                state.nodes.insert(ancestor.clone(), Vec::new());
                if let Some(parent) = Self::parent_of(&ancestor) {
                    touched_parents.push(parent);
                }
            }
        }

        state.nodes.insert(path.to_string(), value);
        if let Some(parent) = Self::parent_of(path) {
            touched_parents.push(parent);
        }
        Self::notify(state, touched_parents);
    }
}

struct FakeWatcher {
    state: Arc<Mutex<State>>,
    id: u64,
    paths: Vec<String>,
}

#[async_trait]
impl ChildWatcher for FakeWatcher {
    async fn start(&mut self) -> Result<mpsc::Receiver<ChildChangeEvent>> {
        let (tx, rx) = mpsc::channel(64);
        self.state.lock().watchers.push(WatcherEntry {
            id: self.id,
            paths: self.paths.clone(),
            tx,
        });
        Ok(rx)
    }

    fn close(&self) {
        // dropping the sender ends the notification stream
        self.state.lock().watchers.retain(|watcher| watcher.id != self.id);
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.state.lock().nodes.contains_key(path))
    }

    async fn create_persistent_node(&self, path: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.nodes.contains_key(path) {
            return Err(RegistryError::NodeExists(path.to_string()).into());
        }
        Self::insert_with_parents(&mut state, path, value.as_bytes().to_vec());
        Ok(())
    }

    async fn update(&self, path: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        if !state.nodes.contains_key(path) {
            return Err(RegistryError::NotFound(path.to_string()).into());
        }
        state.nodes.insert(path.to_string(), value.as_bytes().to_vec());
        let parents = Self::parent_of(path).into_iter().collect();
        Self::notify(&mut state, parents);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock();
        if !state.nodes.contains_key(path) {
            return Err(RegistryError::NotFound(path.to_string()).into());
        }
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let removed: Vec<String> = state
            .nodes
            .keys()
            .filter(|key| *key == path || key.starts_with(&prefix))
            .cloned()
            .collect();
        let parents: Vec<String> = removed
            .iter()
            .filter_map(|key| Self::parent_of(key))
            .collect();
        for key in &removed {
            state.nodes.remove(key);
        }
        Self::notify(&mut state, parents);
        Ok(())
    }

    async fn get_children(&self, path: &str) -> Result<(Vec<String>, NodeStat)> {
        let state = self.state.lock();
        Ok((Self::children_of(&state.nodes, path), NodeStat::default()))
    }

    async fn get_value(&self, path: &str) -> Result<(Vec<u8>, NodeStat)> {
        let state = self.state.lock();
        match state.nodes.get(path) {
            Some(value) => Ok((value.clone(), NodeStat::default())),
            None => Err(RegistryError::NotFound(path.to_string()).into()),
        }
    }

    fn child_watcher(&self, paths: Vec<String>) -> Result<Box<dyn ChildWatcher>> {
        let mut state = self.state.lock();
        state.next_watcher_id += 1;
        Ok(Box::new(FakeWatcher {
            state: self.state.clone(),
            id: state.next_watcher_id,
            paths,
        }))
    }
}
