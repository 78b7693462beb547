use std::{
    env,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{output::CleanPathPolicy, profile::EntityProfile};

/// Settings injected into every validator run. Loaded from YAML; every field
/// has a default so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where generated scripts and workbooks are written.
    pub artifact_dir: PathBuf,
    /// Name written into the header comment of insert scripts.
    pub generator: String,
    /// System the data is being loaded into, used in diagnostics.
    pub upstream_system: String,
    pub clean_path_policy: CleanPathPolicy,
    /// Additional entity profiles. A profile reusing a built-in label
    /// replaces the built-in one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityProfile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifact_dir: env::temp_dir(),
            generator: "DataMend".to_string(),
            upstream_system: "Agvance".to_string(),
            clean_path_policy: CleanPathPolicy::default(),
            entities: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: AppConfig =
            serde_yaml::from_reader(reader).with_context(|| format!("Parsing config {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for profile in &self.entities {
            ensure!(
                !profile.label.trim().is_empty(),
                "Entity profiles require a non-empty label"
            );
            ensure!(
                !profile.table.trim().is_empty(),
                "Entity profile '{}' requires a table",
                profile.label
            );
            if let Some(identity) = &profile.identity {
                ensure!(
                    !identity.field.trim().is_empty(),
                    "Entity profile '{}' has an identity rule without a field",
                    profile.label
                );
            }
        }
        Ok(())
    }
}
