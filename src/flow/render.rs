//! Render planning: marker segments and slot renders become encoder jobs
//! the host queues. Planning is non-destructive; the timeline's in/out
//! points are part of the job, not an edit left behind.

use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::model::ShowflowModel;
use crate::model::config::RenderSettings;
use crate::model::slot::Branch;
use crate::model::snapshot::MarkerInfo;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    pub file_name: String,
    pub output_path: PathBuf,
    pub preset_path: PathBuf,
    pub in_frame: i64,
    pub out_frame: i64,
    /// When set, the host solos these video tracks for the job (branch
    /// isolation); `None` renders the timeline as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_tracks: Option<Vec<u32>>,
}

/// Replace anything outside `[A-Za-z0-9_-]` so the encoder accepts the name.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "clip".to_string()
    } else {
        cleaned
    }
}

/// Output extension derived from the preset path, the way the scripts
/// guessed it: `.mov` and `.mxf` presets keep their container, everything
/// else is mp4.
pub fn preset_extension(preset: &Path) -> &'static str {
    let lower = preset.to_string_lossy().to_lowercase();
    if lower.contains("mov") {
        ".mov"
    } else if lower.contains("mxf") {
        ".mxf"
    } else {
        ".mp4"
    }
}

/// One job per consecutive marker pair. Needs at least two markers; the
/// final marker only closes the last segment.
pub fn plan_marker_segments(
    markers: &[MarkerInfo],
    fps: u32,
    sequence_name: &str,
    settings: &RenderSettings,
) -> Result<Vec<RenderJob>, anyhow::Error> {
    if markers.len() < 2 {
        bail!(
            "not enough markers to define segments (need at least 2, have {})",
            markers.len()
        );
    }
    let mut sorted = markers.to_vec();
    sorted.sort_by_key(|m| m.start_ticks);

    let ext = preset_extension(&settings.preset_path);
    let mut jobs = Vec::with_capacity(sorted.len() - 1);
    for (i, pair) in sorted.windows(2).enumerate() {
        let start = &pair[0];
        let file_name = if start.name.is_empty() {
            format!("{}_{}{}", sequence_name, i + 1, ext)
        } else {
            format!("{}{}", sanitize_file_name(&start.name), ext)
        };
        jobs.push(RenderJob {
            output_path: settings.output_dir.join(&file_name),
            file_name,
            preset_path: settings.preset_path.clone(),
            in_frame: start.frame(fps),
            out_frame: pair[1].frame(fps),
            enabled_tracks: None,
        });
    }
    Ok(jobs)
}

/// Jobs for selected slots, optionally isolating a set of branches by
/// restricting the enabled tracks. Bad indexes and zero-length slots are
/// skipped with collected warnings.
pub fn plan_slot_renders(
    model: &ShowflowModel,
    sequence_name: &str,
    slot_indexes: &[usize],
    branches: Option<&[Branch]>,
    settings: &RenderSettings,
) -> (Vec<RenderJob>, Vec<String>) {
    let ext = preset_extension(&settings.preset_path);
    let enabled_tracks = branches.map(|list| {
        let mut tracks: Vec<u32> = list
            .iter()
            .filter_map(|b| model.tracks.get(b).copied())
            .collect();
        tracks.sort_unstable();
        tracks.dedup();
        tracks
    });

    let mut jobs = Vec::new();
    let mut warnings = Vec::new();
    for &index in slot_indexes {
        let Some(slot) = model.slots.get(index) else {
            warnings.push(format!("no slot at index {}", index));
            continue;
        };
        if slot.duration <= 0 {
            warnings.push(format!("slot {} skipped (invalid duration)", index));
            continue;
        }
        let base = slot
            .name
            .clone()
            .unwrap_or_else(|| format!("slot_{}", index + 1));
        let file_name = format!(
            "{}_{}{}",
            sequence_name,
            sanitize_file_name(&base),
            ext
        );
        jobs.push(RenderJob {
            output_path: settings.output_dir.join(&file_name),
            file_name,
            preset_path: settings.preset_path.clone(),
            in_frame: slot.time,
            out_frame: slot.end(),
            enabled_tracks: enabled_tracks.clone(),
        });
    }
    (jobs, warnings)
}
