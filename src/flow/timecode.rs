//! Conversions between the host's tick clock and frame counts.

/// Host ticks per second; the host API reports all times in this unit.
pub const TICKS_PER_SECOND: i64 = 254_016_000_000;

pub const DEFAULT_FPS: u32 = 60;

/// Slot length used when nothing bounds the last slot.
pub const DEFAULT_SLOT_FRAMES: i64 = 600;

pub fn ticks_to_frames(ticks: i64, fps: u32) -> i64 {
    (ticks as f64 * fps as f64 / TICKS_PER_SECOND as f64).round() as i64
}

pub fn frames_to_ticks(frames: i64, fps: u32) -> i64 {
    (frames as f64 * TICKS_PER_SECOND as f64 / fps as f64).round() as i64
}

pub fn frames_to_seconds(frames: i64, fps: u32) -> f64 {
    frames as f64 / fps as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_of_ticks_is_fps_frames() {
        assert_eq!(ticks_to_frames(TICKS_PER_SECOND, 60), 60);
        assert_eq!(ticks_to_frames(TICKS_PER_SECOND, 30), 30);
    }

    #[test]
    fn frame_tick_round_trip() {
        for fps in [24u32, 30, 60] {
            for frame in [0i64, 1, 599, 600, 86_400] {
                assert_eq!(ticks_to_frames(frames_to_ticks(frame, fps), fps), frame);
            }
        }
    }

    #[test]
    fn fractional_ticks_round_to_nearest_frame() {
        // Half a frame past frame 10 at 60fps rounds up.
        let half_frame = TICKS_PER_SECOND / 120;
        assert_eq!(ticks_to_frames(frames_to_ticks(10, 60) + half_frame, 60), 11);
    }

    #[test]
    fn frames_to_seconds_matches_fps() {
        assert_eq!(frames_to_seconds(600, 60), 10.0);
        assert_eq!(frames_to_seconds(90, 30), 3.0);
    }
}
