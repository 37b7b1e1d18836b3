use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Parameters of the upstream resolver list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Newline-delimited file of fallback nameserver addresses
    #[serde(default = "default_names_file")]
    pub names_file: PathBuf,

    /// Port appended to every upstream address
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for one responsiveness probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_in_ms: u64,
}

fn default_names_file() -> PathBuf {
    PathBuf::from("conf/names")
}

fn default_port() -> u16 {
    53
}

fn default_probe_timeout() -> u64 {
    1_000
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            names_file: default_names_file(),
            port: default_port(),
            probe_timeout_in_ms: default_probe_timeout(),
        }
    }
}

impl ResolverSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_in_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.names_file.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "resolver.names_file must not be empty".into(),
            )));
        }
        if self.port == 0 {
            return Err(Error::Config(ConfigError::Message(
                "resolver.port must not be 0".into(),
            )));
        }
        if self.probe_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "resolver.probe_timeout_in_ms must be at least 1ms".into(),
            )));
        }
        Ok(())
    }
}
