use std::collections::HashMap;

use serde::Serialize;

use super::conf::is_placeholder;
use super::DnsConf;
use crate::DecodeError;

/// Bucket for placeholder registrations carrying no topology metadata.
pub const DEFAULT_TAG: &str = "-";

/// One system entry inside a platform's cluster map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct System {
    pub system_name: String,
    pub system_display_name: String,
    pub server_type: String,
    pub server_name: String,
    pub service_address: String,
    pub ip: String,
    pub url: String,
}

/// A platform with its clusters, unique by name within one server-type
/// bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub plat_name: String,
    pub plat_display_name: String,
    pub clusters: HashMap<String, System>,
}

impl Platform {
    /// Minimal entry for an externally registered domain: a single
    /// default-tag cluster whose system only carries the domain.
    fn placeholder(domain: &str) -> Self {
        let system = System {
            url: domain.to_string(),
            ..System::default()
        };
        Self {
            clusters: HashMap::from([(DEFAULT_TAG.to_string(), system)]),
            ..Platform::default()
        }
    }
}

/// The aggregated platform/cluster/system tree, bucketed by server type.
///
/// Rebuilt wholesale on each aggregation pass and published atomically;
/// never mutated after publication.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TopologyView {
    buckets: HashMap<String, Vec<Platform>>,
}

impl TopologyView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platforms registered under `tag` (a server type or [`DEFAULT_TAG`]).
    pub fn platforms(&self, tag: &str) -> Option<&[Platform]> {
        self.buckets.get(tag).map(|platforms| platforms.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Folds one node payload into the view.
    ///
    /// Placeholders each append one default-tag entry (duplicates for the
    /// same domain are not merged). Typed records land under
    /// `server_type -> plat_name -> cluster_name`; a same-named platform is
    /// merged into, and a same-named cluster is overwritten in place.
    /// Records with an unaccepted server type are skipped.
    pub fn append(&mut self, domain: &str, payload: &[u8]) -> Result<(), DecodeError> {
        if is_placeholder(payload) {
            self.buckets
                .entry(DEFAULT_TAG.to_string())
                .or_default()
                .push(Platform::placeholder(domain));
            return Ok(());
        }

        let conf: DnsConf = serde_json::from_slice(payload).map_err(|source| DecodeError::Payload {
            domain: domain.to_string(),
            source,
        })?;
        if !conf.is_routable() {
            return Ok(());
        }

        let system = System {
            system_name: conf.system_name.clone(),
            system_display_name: conf.system_display_name.clone(),
            server_type: conf.server_type.clone(),
            server_name: conf.server_name.clone(),
            service_address: conf.service_address.clone(),
            ip: conf.ip.clone(),
            url: conf.public_url(domain),
        };

        let bucket = self.buckets.entry(conf.server_type.clone()).or_default();
        if let Some(platform) = bucket.iter_mut().find(|platform| platform.plat_name == conf.plat_name) {
            platform.clusters.insert(conf.cluster_name, system);
            return Ok(());
        }
        bucket.push(Platform {
            plat_name: conf.plat_name,
            plat_display_name: conf.plat_display_name,
            clusters: HashMap::from([(conf.cluster_name, system)]),
        });
        Ok(())
    }
}
