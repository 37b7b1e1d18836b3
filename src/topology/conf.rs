use serde::Deserialize;
use serde::Serialize;

/// Server type tag accepted into the API bucket.
pub const SERVER_TYPE_API: &str = "API";
/// Server type tag accepted into the WEB bucket.
pub const SERVER_TYPE_WEB: &str = "WEB";

/// Value stored for externally registered addresses carrying no topology
/// metadata.
pub const PLACEHOLDER: &str = "{}";

/// Returns true for the empty-object placeholder (or a missing value).
pub(crate) fn is_placeholder(payload: &[u8]) -> bool {
    payload.is_empty() || payload == PLACEHOLDER.as_bytes()
}

/// The per-node configuration record stored at `root/<domain>/<node>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsConf {
    #[serde(default)]
    pub plat_name: String,
    #[serde(default)]
    pub plat_display_name: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub system_name: String,
    #[serde(default)]
    pub system_display_name: String,
    #[serde(default)]
    pub server_type: String,
    #[serde(default)]
    pub server_name: String,
    /// The service's own listener address, `host:port`
    #[serde(default)]
    pub service_address: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub url: String,
}

impl DnsConf {
    /// Only API and WEB registrations participate in the topology view.
    pub fn is_routable(&self) -> bool {
        self.server_type == SERVER_TYPE_API || self.server_type == SERVER_TYPE_WEB
    }

    /// Public endpoint for the record: the domain paired with the port the
    /// service declared for itself in `service_address`.
    pub(crate) fn public_url(&self, domain: &str) -> String {
        match self.service_address.rsplit_once(':') {
            Some((_, port)) => format!("{domain}:{port}"),
            None => domain.to_string(),
        }
    }
}
