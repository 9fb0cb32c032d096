use anyhow::Context;
use std::path::{Path, PathBuf};
use widget_core::config::WidgetConfig;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> anyhow::Result<WidgetConfig> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read config: {}", self.path.display()))?;
        let cfg: WidgetConfig = serde_json::from_slice(&bytes).context("decode config JSON")?;
        Ok(cfg)
    }

    /// Loads the config file, or the built-in defaults if there is none yet.
    pub fn load_or_default(&self) -> anyhow::Result<WidgetConfig> {
        if !self.exists() {
            log::info!("no config at {}; using defaults", self.path.display());
            return Ok(crate::defaults::default_widget_config());
        }
        self.load()
    }

    pub fn save(&self, cfg: &WidgetConfig) -> anyhow::Result<()> {
        crate::files::write_json_atomic(&self.path, cfg)
            .with_context(|| format!("save config: {}", self.path.display()))
    }
}
