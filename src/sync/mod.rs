//! The watcher tree keeping the caches synchronized with the store.
//!
//! One dispatch loop per watched scope: [`DomainTracker`] owns the root
//! watcher and reconciles the tracked domain set; each tracked domain gets
//! its own [`DomainWatcher`] loop reloading that domain's records and
//! details. Loops communicate only through the shared caches and the
//! aggregator's activity handle.

mod domain_watcher;
mod tracker;

pub(crate) use domain_watcher::*;
pub(crate) use tracker::*;

#[cfg(test)]
mod domain_watcher_test;
