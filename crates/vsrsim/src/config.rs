//! Simulation configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `vsrsim.ron` file (if exists)
//! 3. Environment variables prefixed with `VSRSIM_`
//!
//! Example environment variable: `VSRSIM_ENGINE__DT=0.01`

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use vsrsim_agents::SelfAssemblyConfig;
use vsrsim_core::EngineConfig;

use crate::tasks::{BalancingConfig, LocomotionConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub locomotion: LocomotionConfig,
    #[serde(default)]
    pub balancing: BalancingConfig,
    #[serde(default)]
    pub self_assembly: SelfAssemblyConfig,
}

impl SimulationConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `vsrsim.ron` file (if exists)
    /// 3. Environment variables prefixed with `VSRSIM_` (highest priority)
    pub fn load() -> Result<Self> {
        Self::build(File::with_name("vsrsim").format(FileFormat::Ron).required(false))
    }

    /// Same layering, with an explicit file that must exist
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::build(File::from(path).format(FileFormat::Ron).required(true))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let defaults = Self::default();
        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("engine.dt", defaults.engine.dt)?
            .set_default("engine.gravity", defaults.engine.gravity)?
            .set_default("locomotion.duration", defaults.locomotion.duration)?
            .set_default("locomotion.initial_x_gap", defaults.locomotion.initial_x_gap)?
            .set_default("locomotion.initial_y_gap", defaults.locomotion.initial_y_gap)?
            .set_default("balancing.duration", defaults.balancing.duration)?
            // Layer 2: Config file
            .add_source(file)
            // Layer 3: Environment variables (VSRSIM_ENGINE__DT, etc.)
            .add_source(
                Environment::with_prefix("VSRSIM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build().context("Failed to build configuration")?;
        let loaded: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        log::debug!("SimulationConfig: loaded {:?}", loaded);
        Ok(loaded)
    }

    /// Save configuration to a RON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let ron = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize configuration to RON")?;
        std::fs::write(path.as_ref(), ron).with_context(|| {
            format!("Failed to write configuration file: {}", path.as_ref().display())
        })?;
        Ok(())
    }
}
