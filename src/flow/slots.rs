//! Marker-to-slot segmentation: rebuild the showflow slot list from the
//! current timeline markers and clip layout.

use std::collections::BTreeMap;

use anyhow::{bail, ensure};

use crate::flow::timecode::DEFAULT_SLOT_FRAMES;
use crate::model::slot::{Branch, ClipEntry, ClipKey, ClipRef, Slot};
use crate::model::snapshot::TimelineSnapshot;

/// Segment the timeline at its markers and record, per slot and branch, the
/// first clip intersecting the slot window.
///
/// Each marker opens a slot. A slot ends one frame before the next marker;
/// the last slot runs to the furthest clip end, or a fixed default length
/// when nothing bounds it.
pub fn build_slots(
    snapshot: &TimelineSnapshot,
    tracks: &BTreeMap<Branch, u32>,
) -> Result<Vec<Slot>, anyhow::Error> {
    ensure!(snapshot.fps > 0, "snapshot fps must be positive");
    let fps = snapshot.fps;

    let markers = snapshot.sorted_markers();
    if markers.is_empty() {
        bail!("no markers in sequence '{}'", snapshot.sequence_name);
    }

    let max_track = tracks.values().copied().max().unwrap_or(0);
    let have_tracks = snapshot.video_tracks.iter().map(|t| t.index).max();
    if have_tracks.map_or(true, |n| n < max_track) {
        log::warn!(
            "track map wants index {} but snapshot only has {:?}",
            max_track,
            have_tracks
        );
    }

    let max_end = snapshot
        .max_clip_end_frame()
        .max(markers.last().map(|m| m.frame(fps)).unwrap_or(0) + DEFAULT_SLOT_FRAMES);

    let mut slots = Vec::with_capacity(markers.len());
    for (i, marker) in markers.iter().enumerate() {
        let start = marker.frame(fps);
        let mut end = match markers.get(i + 1) {
            Some(next) => next.frame(fps) - 1,
            None => (start + DEFAULT_SLOT_FRAMES).max(max_end - 1),
        };
        if end < start {
            end = start;
        }

        let mut slot = Slot {
            time: start,
            name: (!marker.name.is_empty()).then(|| marker.name.clone()),
            duration: end - start + 1,
            clips: BTreeMap::new(),
        };

        for (&branch, &track_index) in tracks {
            let Some(track) = snapshot.track(track_index) else {
                continue;
            };
            // First clip overlapping [start, end], in track order.
            let found = track.clips.iter().find_map(|clip| {
                let clip_start = clip.start_frame(fps);
                let clip_end = clip.end_frame(fps) - 1;
                (clip_end >= start && clip_start <= end)
                    .then_some((clip, clip_start, clip_end))
            });
            let Some((clip, clip_start, clip_end)) = found else {
                continue;
            };

            let clip_dur = (clip_end - clip_start + 1).max(1);
            let name = if clip.name.is_empty() {
                branch.letter().to_string()
            } else {
                clip.name.clone()
            };
            slot.clips.insert(
                ClipKey::Branch(branch),
                ClipEntry::Clip(ClipRef {
                    name,
                    duration: Some(clip_dur),
                    slot_in: Some((start - clip_start).max(0)),
                    slot_out: Some((end - clip_start + 1).min(clip_dur)),
                }),
            );
        }
        slots.push(slot);
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::timecode::frames_to_ticks;
    use crate::model::default_track_map;
    use crate::model::snapshot::{ClipSpan, MarkerInfo, TrackSnapshot};

    const FPS: u32 = 60;

    fn marker(frame: i64, name: &str) -> MarkerInfo {
        MarkerInfo {
            start_ticks: frames_to_ticks(frame, FPS),
            name: name.to_string(),
        }
    }

    fn clip(name: &str, start: i64, end: i64) -> ClipSpan {
        ClipSpan {
            name: name.to_string(),
            start_ticks: frames_to_ticks(start, FPS),
            end_ticks: frames_to_ticks(end, FPS),
        }
    }

    fn snapshot(markers: Vec<MarkerInfo>, tracks: Vec<TrackSnapshot>) -> TimelineSnapshot {
        TimelineSnapshot {
            sequence_name: "TXTB".to_string(),
            fps: FPS,
            markers,
            video_tracks: tracks,
        }
    }

    #[test]
    fn n_markers_yield_n_slots_with_matching_times() {
        let snap = snapshot(
            vec![marker(0, ""), marker(300, ""), marker(900, "")],
            vec![],
        );
        let slots = build_slots(&snap, &default_track_map()).unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].time, 0);
        assert_eq!(slots[1].time, 300);
        assert_eq!(slots[2].time, 900);
        for slot in &slots {
            assert!(slot.duration >= 1);
        }
    }

    #[test]
    fn interior_slot_ends_one_frame_before_next_marker() {
        let snap = snapshot(vec![marker(0, ""), marker(300, "")], vec![]);
        let slots = build_slots(&snap, &default_track_map()).unwrap();
        assert_eq!(slots[0].duration, 300);
    }

    #[test]
    fn unsorted_markers_are_sorted_first() {
        let snap = snapshot(vec![marker(300, "b"), marker(0, "a")], vec![]);
        let slots = build_slots(&snap, &default_track_map()).unwrap();
        assert_eq!(slots[0].time, 0);
        assert_eq!(slots[0].name.as_deref(), Some("a"));
        assert_eq!(slots[1].time, 300);
    }

    #[test]
    fn last_slot_defaults_to_600_frames_without_clips() {
        let snap = snapshot(vec![marker(100, "")], vec![]);
        let slots = build_slots(&snap, &default_track_map()).unwrap();
        assert_eq!(slots[0].duration, DEFAULT_SLOT_FRAMES + 1);
    }

    #[test]
    fn last_slot_extends_to_furthest_clip_end() {
        let snap = snapshot(
            vec![marker(0, "")],
            vec![TrackSnapshot {
                index: 0,
                clips: vec![clip("long", 0, 2000)],
            }],
        );
        let slots = build_slots(&snap, &default_track_map()).unwrap();
        // End is maxEnd - 1, so 2000 frames total.
        assert_eq!(slots[0].duration, 2000);
    }

    #[test]
    fn records_first_intersecting_clip_with_relative_offsets() {
        let snap = snapshot(
            vec![marker(0, ""), marker(300, "")],
            vec![TrackSnapshot {
                index: 1,
                clips: vec![clip("b_clip", 250, 700)],
            }],
        );
        let slots = build_slots(&snap, &default_track_map()).unwrap();

        // Clip [250, 699] intersects both slots.
        let key = ClipKey::Branch(Branch::B);
        let ClipEntry::Clip(first) = &slots[0].clips[&key] else {
            panic!("expected descriptor");
        };
        assert_eq!(first.name, "b_clip");
        assert_eq!(first.duration, Some(450));
        assert_eq!(first.slot_in, Some(0));
        assert_eq!(first.slot_out, Some(50)); // slot end 299 - clip start 250 + 1

        let ClipEntry::Clip(second) = &slots[1].clips[&key] else {
            panic!("expected descriptor");
        };
        assert_eq!(second.slot_in, Some(50));
        assert_eq!(second.slot_out, Some(450));
    }

    #[test]
    fn branch_without_intersecting_clip_is_omitted() {
        let snap = snapshot(
            vec![marker(0, "")],
            vec![TrackSnapshot {
                index: 2,
                clips: vec![clip("late", 5000, 5100)],
            }],
        );
        let slots = build_slots(&snap, &default_track_map()).unwrap();
        assert!(!slots[0].clips.contains_key(&ClipKey::Branch(Branch::A)));
        // Track 2 is branch C; its clip starts inside the extended last slot
        // window [0, 5099], so it does intersect.
        assert!(slots[0].clips.contains_key(&ClipKey::Branch(Branch::C)));
    }

    #[test]
    fn zero_markers_is_an_error() {
        let snap = snapshot(vec![], vec![]);
        let err = build_slots(&snap, &default_track_map()).unwrap_err();
        assert!(err.to_string().contains("no markers"));
    }
}
