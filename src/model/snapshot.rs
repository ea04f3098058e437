use serde::{Deserialize, Serialize};

use crate::flow::timecode;

/// Host timeline state as posted by the host-side script. This is the
/// explicit request object that replaces live traversal of the host's
/// sequence/marker/track objects.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    pub sequence_name: String,
    pub fps: u32,
    #[serde(default)]
    pub markers: Vec<MarkerInfo>,
    #[serde(default)]
    pub video_tracks: Vec<TrackSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarkerInfo {
    pub start_ticks: i64,
    #[serde(default)]
    pub name: String,
}

impl MarkerInfo {
    pub fn frame(&self, fps: u32) -> i64 {
        timecode::ticks_to_frames(self.start_ticks, fps)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackSnapshot {
    pub index: u32,
    #[serde(default)]
    pub clips: Vec<ClipSpan>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClipSpan {
    pub name: String,
    pub start_ticks: i64,
    pub end_ticks: i64,
}

impl ClipSpan {
    pub fn start_frame(&self, fps: u32) -> i64 {
        timecode::ticks_to_frames(self.start_ticks, fps)
    }

    pub fn end_frame(&self, fps: u32) -> i64 {
        timecode::ticks_to_frames(self.end_ticks, fps)
    }
}

impl TimelineSnapshot {
    /// Markers sorted ascending by position, the way every script consumed them.
    pub fn sorted_markers(&self) -> Vec<MarkerInfo> {
        let mut markers = self.markers.clone();
        markers.sort_by_key(|m| m.start_ticks);
        markers
    }

    pub fn track(&self, index: u32) -> Option<&TrackSnapshot> {
        self.video_tracks.iter().find(|t| t.index == index)
    }

    /// Furthest clip end across all video tracks, in frames.
    pub fn max_clip_end_frame(&self) -> i64 {
        self.video_tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .map(|c| c.end_frame(self.fps))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::timecode::TICKS_PER_SECOND;

    fn marker(seconds: i64, name: &str) -> MarkerInfo {
        MarkerInfo {
            start_ticks: seconds * TICKS_PER_SECOND,
            name: name.to_string(),
        }
    }

    #[test]
    fn sorted_markers_orders_by_ticks() {
        let snapshot = TimelineSnapshot {
            sequence_name: "seq".to_string(),
            fps: 60,
            markers: vec![marker(10, "b"), marker(0, "a"), marker(5, "m")],
            video_tracks: vec![],
        };
        let sorted = snapshot.sorted_markers();
        let names: Vec<_> = sorted.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["a", "m", "b"]);
        assert_eq!(sorted[1].frame(60), 300);
    }

    #[test]
    fn max_clip_end_spans_all_tracks() {
        let snapshot = TimelineSnapshot {
            sequence_name: "seq".to_string(),
            fps: 30,
            markers: vec![],
            video_tracks: vec![
                TrackSnapshot {
                    index: 0,
                    clips: vec![ClipSpan {
                        name: "a".to_string(),
                        start_ticks: 0,
                        end_ticks: 2 * TICKS_PER_SECOND,
                    }],
                },
                TrackSnapshot {
                    index: 3,
                    clips: vec![ClipSpan {
                        name: "b".to_string(),
                        start_ticks: TICKS_PER_SECOND,
                        end_ticks: 7 * TICKS_PER_SECOND,
                    }],
                },
            ],
        };
        assert_eq!(snapshot.max_clip_end_frame(), 210);
    }
}
