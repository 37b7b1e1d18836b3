//! Upstream resolver list for queries the registry cannot answer.
//!
//! A hosts-style file of fallback nameserver addresses, reloaded whenever
//! the file changes and reordered by measured responsiveness.

mod name_servers;
pub use name_servers::*;
