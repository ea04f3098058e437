//! Placement planning: turn a showflow document plus a media index into the
//! batch of clip insertions the host applies. The host never decides
//! anything; it clears the mapped tracks and inserts exactly what the plan
//! says.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::media::MediaIndex;
use crate::model::ShowflowModel;
use crate::model::slot::{Branch, ClipEntry, ClipKey, ClipRef};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementAction {
    pub slot_index: usize,
    pub key: ClipKey,
    pub branch: Branch,
    pub track_index: u32,
    pub clip_name: String,
    pub media_path: PathBuf,
    pub start_frame: i64,
    pub duration_frames: i64,
    /// Linked audio is deleted everywhere except branch A.
    pub keep_audio: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlacementPlan {
    /// Video tracks the host must have (highest mapped index in use + 1).
    /// When the timeline has fewer, the operator adds them manually and
    /// re-runs; the plan itself never shrinks.
    pub required_video_tracks: u32,
    pub required_audio_tracks: u32,
    pub clear_tracks: Vec<u32>,
    pub actions: Vec<PlacementAction>,
    pub warnings: Vec<String>,
}

/// Build the placement batch for every slot of the document. Missing media
/// and unmapped branches skip that entry with a collected warning.
pub fn plan_placement(model: &ShowflowModel, media: &MediaIndex) -> PlacementPlan {
    let mut plan = PlacementPlan::default();

    let max_index = model.max_track_index();
    plan.required_video_tracks = max_index.map_or(0, |i| i + 1);
    // One audio track is enough: only branch A keeps its audio.
    plan.required_audio_tracks = u32::from(plan.required_video_tracks > 0);

    plan.clear_tracks = model.tracks.values().copied().collect();
    plan.clear_tracks.sort_unstable();
    plan.clear_tracks.dedup();

    for (slot_index, slot) in model.slots.iter().enumerate() {
        for (&key, entry) in &slot.clips {
            let clip_name = entry.name().to_string();
            if clip_name.is_empty() {
                plan.warnings
                    .push(format!("slot {}: clip for '{}' has no name", slot_index, key));
                continue;
            }
            let Some(media_path) = media.resolve(&clip_name) else {
                plan.warnings
                    .push(format!("media not found: {}", clip_name));
                continue;
            };

            for branch in key.branches() {
                let Some(&track_index) = model.tracks.get(&branch) else {
                    plan.warnings.push(format!(
                        "slot {}: branch {} has no track mapping",
                        slot_index, branch
                    ));
                    continue;
                };
                plan.actions.push(PlacementAction {
                    slot_index,
                    key,
                    branch,
                    track_index,
                    clip_name: clip_name.clone(),
                    media_path: media_path.to_path_buf(),
                    start_frame: slot.time,
                    duration_frames: slot.duration,
                    keep_audio: branch == Branch::A,
                });
            }
        }
    }
    plan
}

/// Write placement results back into the document: every placed entry gets
/// the full descriptor form with planned duration and slot-relative in/out.
pub fn apply_plan_metadata(model: &mut ShowflowModel, plan: &PlacementPlan) {
    for action in &plan.actions {
        let Some(slot) = model.slots.get_mut(action.slot_index) else {
            continue;
        };
        let duration = action.duration_frames;
        slot.clips.insert(
            action.key,
            ClipEntry::Clip(ClipRef {
                name: action.clip_name.clone(),
                duration: Some(duration),
                slot_in: Some(0),
                slot_out: Some(duration),
            }),
        );
    }
}
