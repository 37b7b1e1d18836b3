use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Registry-side parameters of the synchronization engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Fixed prefix under which domains are registered, e.g. `/dns`
    #[serde(default = "default_root_path")]
    pub root_path: String,
}

fn default_root_path() -> String {
    "/dns".to_string()
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
        }
    }
}

impl RegistrySettings {
    pub fn validate(&self) -> Result<()> {
        if !self.root_path.starts_with('/') {
            return Err(Error::Config(ConfigError::Message(
                "registry.root_path must be absolute".into(),
            )));
        }
        if self.root_path.trim_end_matches('/').is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "registry.root_path must not be the tree root".into(),
            )));
        }
        Ok(())
    }
}
