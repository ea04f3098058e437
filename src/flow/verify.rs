//! Integrity check between timeline markers and the recorded showflow slots.
//! All mismatches are collected into one report; the operator sees the whole
//! batch, never just the first failure.

use serde::{Deserialize, Serialize};

use crate::model::slot::Slot;
use crate::model::snapshot::MarkerInfo;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "param", rename_all = "camelCase")]
pub enum Mismatch {
    Count {
        markers: usize,
        slots: usize,
    },
    Time {
        index: usize,
        marker_frame: i64,
        slot_frame: i64,
    },
    Name {
        index: usize,
        marker: String,
        slot: String,
    },
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mismatch::Count { markers, slots } => {
                write!(f, "count mismatch: {} markers vs {} slots", markers, slots)
            }
            Mismatch::Time {
                index,
                marker_frame,
                slot_frame,
            } => write!(
                f,
                "[{}] time mismatch: marker {}f vs slot {}f",
                index, marker_frame, slot_frame
            ),
            Mismatch::Name {
                index,
                marker,
                slot,
            } => write!(
                f,
                "[{}] name mismatch: marker '{}' vs slot '{}'",
                index, marker, slot
            ),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub marker_count: usize,
    pub slot_count: usize,
    pub mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_clean() {
            format!("markers and showflow match ({} slots)", self.slot_count)
        } else {
            let lines: Vec<String> =
                self.mismatches.iter().map(|m| m.to_string()).collect();
            format!("{} mismatch(es): {}", lines.len(), lines.join("; "))
        }
    }
}

/// Compare sorted markers against sorted slots at the given frame rate.
pub fn verify_markers(slots: &[Slot], markers: &[MarkerInfo], fps: u32) -> VerifyReport {
    let mut sorted_markers = markers.to_vec();
    sorted_markers.sort_by_key(|m| m.start_ticks);
    let mut sorted_slots = slots.to_vec();
    sorted_slots.sort_by_key(|s| s.time);

    let mut mismatches = Vec::new();
    if sorted_markers.len() != sorted_slots.len() {
        mismatches.push(Mismatch::Count {
            markers: sorted_markers.len(),
            slots: sorted_slots.len(),
        });
    }

    for (index, (marker, slot)) in
        sorted_markers.iter().zip(sorted_slots.iter()).enumerate()
    {
        let marker_frame = marker.frame(fps);
        if marker_frame != slot.time {
            mismatches.push(Mismatch::Time {
                index,
                marker_frame,
                slot_frame: slot.time,
            });
        }
        if let Some(slot_name) = slot.name.as_deref() {
            if !slot_name.is_empty() && marker.name != slot_name {
                mismatches.push(Mismatch::Name {
                    index,
                    marker: marker.name.clone(),
                    slot: slot_name.to_string(),
                });
            }
        }
    }

    VerifyReport {
        marker_count: sorted_markers.len(),
        slot_count: sorted_slots.len(),
        mismatches,
    }
}
