//! Settings for the synchronization engine.
//!
//! Loading priority:
//! 1. Default values (hardcoded)
//! 2. Optional explicit config file
//! 3. `config/ddns.toml` next to the process, when present
//! 4. Environment variables (highest priority, `DDNS__` prefix)

mod aggregator;
mod registry;
mod resolver;
pub use aggregator::*;
pub use registry::*;
pub use resolver::*;


use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Registry root path and write defaults
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Two-speed rebuild timer parameters
    #[serde(default)]
    pub aggregator: AggregatorSettings,

    /// Upstream resolver list parameters
    #[serde(default)]
    pub resolver: ResolverSettings,
}

impl Settings {
    /// Loads settings from the optional `path`, the conventional
    /// `config/ddns.toml` and the environment, then validates the merged
    /// result.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(p) = path {
            builder = builder.add_source(File::with_name(p).required(true));
        }
        builder = builder.add_source(File::with_name("config/ddns").required(false));

        // Environment variables win, e.g. DDNS__REGISTRY__ROOT_PATH=/names
        builder = builder.add_source(
            Environment::with_prefix("DDNS")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize().map_err(crate::Error::Config)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        self.aggregator.validate()?;
        self.resolver.validate()?;
        Ok(())
    }
}
