use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use log::debug;
use uuid::Uuid;

/// Destination for generated artifacts. Returns a reference the caller can
/// later hand to whatever delivers the file.
pub trait ArtifactStore {
    fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<String>;
}

/// Writes artifacts into one directory. Names combine the suggested stem, a
/// timestamp and a random token so concurrent runs never collide.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactStore for DirectoryStore {
    fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<String> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Creating artifact directory {:?}", self.root))?;
        let file_name = unique_file_name(suggested_name);
        let path = self.root.join(&file_name);
        fs::write(&path, bytes).with_context(|| format!("Writing artifact {path:?}"))?;
        debug!("Wrote {} byte(s) to {:?}", bytes.len(), path);
        Ok(path.display().to_string())
    }
}

pub fn unique_file_name(suggested_name: &str) -> String {
    let suggested = Path::new(suggested_name);
    let stem = suggested
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("artifact");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let token = Uuid::new_v4().simple();
    match suggested.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{stem}_{timestamp}_{token}.{ext}"),
        None => format!("{stem}_{timestamp}_{token}"),
    }
}
