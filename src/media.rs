//! Media directory index and relink planning. Clips in a showflow are
//! referenced by base name; the media folder holds one file per base name
//! with an arbitrary extension.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Flat index of a media directory, matched case-insensitively by
/// `<base name>.` filename prefix.
#[derive(Debug, Clone, Default)]
pub struct MediaIndex {
    files: Vec<(String, PathBuf)>,
}

impl MediaIndex {
    pub fn scan(dir: &Path) -> Result<Self, anyhow::Error> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("cannot read media dir {}", dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_lowercase();
            files.push((name, entry.path()));
        }
        files.sort();
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// First file whose name starts with `<base>.`, ignoring case.
    pub fn resolve(&self, base: &str) -> Option<&Path> {
        if base.is_empty() {
            return None;
        }
        let prefix = format!("{}.", base.to_lowercase());
        self.files
            .iter()
            .find(|(name, _)| name.starts_with(&prefix))
            .map(|(_, path)| path.as_path())
    }
}

/// One planned relink the host applies to a project item.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelinkAction {
    pub clip_name: String,
    pub media_path: PathBuf,
}

/// Map clip names to media files. Unresolved names become warnings, not
/// failures; the host skips what it never receives.
pub fn plan_relink(
    clip_names: &[String],
    media: &MediaIndex,
) -> (Vec<RelinkAction>, Vec<String>) {
    let mut actions = Vec::new();
    let mut warnings = Vec::new();
    for name in clip_names {
        match media.resolve(name) {
            Some(path) => actions.push(RelinkAction {
                clip_name: name.clone(),
                media_path: path.to_path_buf(),
            }),
            None => warnings.push(format!("media not found: {}", name)),
        }
    }
    (actions, warnings)
}
