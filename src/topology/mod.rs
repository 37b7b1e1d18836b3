//! The aggregated service-topology view and the debounced loop that
//! rebuilds it from raw per-node payloads.

mod aggregator;
mod conf;
mod view;

pub(crate) use aggregator::*;
pub use conf::*;
pub use view::*;
