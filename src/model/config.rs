use std::path::{Path, PathBuf};

use anyhow::{Context, ensure};
use serde::{Deserialize, Serialize};

/// Flat `flow_config.json` shared by every operation so the operator is not
/// re-asked for the same paths. Every key is optional; operations that need a
/// missing key fail with a descriptive error instead of prompting.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_preset: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens_map_left: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens_map_right: Option<PathBuf>,
}

impl FlowConfig {
    /// Read the config file. A missing file yields defaults; a present but
    /// unparsable file is an error the caller reports.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config JSON {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<(), anyhow::Error> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("cannot write config {}", path.display()))
    }

    pub fn flow_path(&self) -> Result<&Path, anyhow::Error> {
        self.flow_path
            .as_deref()
            .context("flowPath not set in flow_config.json")
    }

    pub fn media_dir(&self) -> Result<&Path, anyhow::Error> {
        self.media_dir
            .as_deref()
            .context("mediaDir not set in flow_config.json")
    }

    pub fn render_settings(&self) -> Result<RenderSettings, anyhow::Error> {
        let preset = self
            .render_preset
            .clone()
            .context("renderPreset not set in flow_config.json")?;
        let output = self
            .render_output
            .clone()
            .context("renderOutput not set in flow_config.json")?;
        ensure!(
            preset.is_file(),
            "render preset not found: {}",
            preset.display()
        );
        ensure!(
            output.is_dir(),
            "render output dir not found: {}",
            output.display()
        );
        Ok(RenderSettings {
            preset_path: preset,
            output_dir: output,
        })
    }
}

/// Validated render configuration handed to the render planners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub preset_path: PathBuf,
    pub output_dir: PathBuf,
}
