use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::slot::{Branch, Slot};

pub mod config;
pub mod slot;
pub mod snapshot;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShowflowModel {
    pub show_id: String,
    pub fps: u32,
    #[serde(default = "default_track_map")]
    pub tracks: BTreeMap<Branch, u32>,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl Default for ShowflowModel {
    fn default() -> Self {
        Self {
            show_id: String::new(),
            fps: crate::flow::timecode::DEFAULT_FPS,
            tracks: default_track_map(),
            slots: Vec::new(),
        }
    }
}

impl ShowflowModel {
    /// Highest video track index referenced by any clip key in any slot.
    /// `None` when no slot places anything on a mapped track.
    pub fn max_track_index(&self) -> Option<u32> {
        let mut max = None;
        for slot in &self.slots {
            for key in slot.clips.keys() {
                for branch in key.branches() {
                    if let Some(&idx) = self.tracks.get(&branch) {
                        max = Some(max.map_or(idx, |m: u32| m.max(idx)));
                    }
                }
            }
        }
        max
    }

    /// All distinct clip base names across slots, in slot order.
    pub fn clip_names(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut names = Vec::new();
        for slot in &self.slots {
            for entry in slot.clips.values() {
                let name = entry.name();
                if !name.is_empty() && seen.insert(name.to_string()) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}

/// The fixed eight-branch layout used when a showflow omits its track map.
pub fn default_track_map() -> BTreeMap<Branch, u32> {
    use Branch::*;
    [A, B, C, D, E, F, G, H]
        .into_iter()
        .enumerate()
        .map(|(i, b)| (b, i as u32))
        .collect()
}
