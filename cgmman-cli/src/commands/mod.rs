pub mod daemon;
pub mod scan;
pub mod translators;

use std::path::PathBuf;

use anyhow::{Context, Result};

use cgmman_core::config::{
    default_config_path, load_manager_settings, load_translators, SETTINGS_FILE, TRANSLATORS_FILE,
};
use cgmman_core::{ManagerSettings, TranslatorRegistry};

/// Locations of the two INI files, after applying defaults.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub settings: PathBuf,
    pub translators: PathBuf,
}

impl ConfigPaths {
    pub fn resolve(settings: Option<PathBuf>, translators: Option<PathBuf>) -> Self {
        Self {
            settings: settings.unwrap_or_else(|| default_config_path(SETTINGS_FILE)),
            translators: translators.unwrap_or_else(|| default_config_path(TRANSLATORS_FILE)),
        }
    }

    pub fn load_settings(&self) -> Result<ManagerSettings> {
        load_manager_settings(&self.settings)
            .with_context(|| format!("failed to load settings from {}", self.settings.display()))
    }

    pub fn load_registry(&self) -> Result<TranslatorRegistry> {
        load_translators(&self.translators).with_context(|| {
            format!(
                "failed to load translators from {}",
                self.translators.display()
            )
        })
    }
}

/// The working directory is scratch space; create it on demand.
pub fn ensure_work_dir(settings: &ManagerSettings) -> Result<()> {
    std::fs::create_dir_all(&settings.work_dir).with_context(|| {
        format!(
            "failed to create working directory {}",
            settings.work_dir.display()
        )
    })
}
