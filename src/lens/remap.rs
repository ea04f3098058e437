//! UV composition for the stereo preview: optional de-convex correction,
//! then the HVMap lookup on the corrected UV, then folding into the selected
//! half of the side-by-side frame. VR eye modes flip Y going into and coming
//! out of the map; the flat 2D plane does not.

use serde::{Deserialize, Serialize};

use crate::lens::deconvex::CurvatureTable;
use crate::lens::hvmap::HvMap;

/// Which output the remap is computed for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EyeMode {
    Left,
    Right,
    /// Side-by-side 2D plane; the eye offset picks the display half.
    Both,
    Hemisphere,
}

/// The loaded correction assets for one preview session. Any piece may be
/// absent; a missing map degrades to an identity lookup.
#[derive(Debug, Default)]
pub struct LensRig {
    pub deconvex: Option<CurvatureTable>,
    pub left: Option<HvMap>,
    pub right: Option<HvMap>,
    pub swap_eyes: bool,
}

impl LensRig {
    /// Map one output UV back to a source UV for the given eye mode.
    /// `eye_offset` is the viewer-relative offset the compositor reports;
    /// only `Both` and `Hemisphere` consult it to pick the eye.
    ///
    /// Order matters: de-convex and the map lookup run on the full-frame
    /// UV, and only the corrected coordinate is folded into the half.
    pub fn remap(&self, u: f32, v: f32, mode: EyeMode, eye_offset: f32) -> (f32, f32) {
        let (x, y) = match &self.deconvex {
            Some(table) => table.apply(u, v),
            None => (u, v),
        };

        let show_left = eye_offset < 0.25;
        // The flat plane reads the opposite eye's map for each display and
        // skips the Y flip.
        let (map_left_eye, flip_y) = match mode {
            EyeMode::Left => (true, true),
            EyeMode::Right => (false, true),
            EyeMode::Hemisphere => (show_left, true),
            EyeMode::Both => (!show_left, false),
        };

        let map = if map_left_eye != self.swap_eyes {
            self.left.as_ref()
        } else {
            self.right.as_ref()
        };
        let (cx, cy) = match map {
            Some(map) if flip_y => {
                let (mx, my) = map.sample(x, 1.0 - y);
                (mx, 1.0 - my)
            }
            Some(map) => map.sample(x, y),
            None => (x, y),
        };

        let (fx, fy) = match mode {
            EyeMode::Left => self.vr_half(true, cx, cy),
            EyeMode::Right => self.vr_half(false, cx, cy),
            EyeMode::Hemisphere => self.vr_half(show_left, cx, cy),
            EyeMode::Both => self.plane_half(show_left, cx, cy),
        };
        (fx.clamp(0.0, 1.0), fy.clamp(0.0, 1.0))
    }

    /// VR eye halves mirror X into their half of the shared frame.
    fn vr_half(&self, left: bool, x: f32, y: f32) -> (f32, f32) {
        match (left, self.swap_eyes) {
            (true, true) => (1.0 - x * 0.5, y),
            (true, false) => (0.5 - x * 0.5, y),
            (false, true) => (0.5 - x * 0.5, y),
            (false, false) => (1.0 - x * 0.5, y),
        }
    }

    /// The flat plane packs both eyes side by side without mirroring.
    fn plane_half(&self, left_display: bool, x: f32, y: f32) -> (f32, f32) {
        match (left_display, self.swap_eyes) {
            (true, true) => (0.5 + x * 0.5, y),
            (true, false) => (x * 0.5, y),
            (false, true) => (x * 0.5, y),
            (false, false) => (0.5 + x * 0.5, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::hvmap::Compression;

    // 2x2 identity map: sampling it returns the input coordinate.
    fn identity_map() -> HvMap {
        HvMap {
            width: 2,
            height: 2,
            compression: Compression::Full,
            map_x: vec![0.0, 1.0, 0.0, 1.0],
            map_y: vec![0.0, 0.0, 1.0, 1.0],
        }
    }

    // Constant map so tests can see which eye's map was consulted and
    // whether the Y flip ran on the way out.
    fn constant_map(x: f32, y: f32) -> HvMap {
        HvMap {
            width: 2,
            height: 2,
            compression: Compression::Full,
            map_x: vec![x; 4],
            map_y: vec![y; 4],
        }
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6
    }

    #[test]
    fn eye_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EyeMode::Hemisphere).unwrap(), "\"hemisphere\"");
        let mode: EyeMode = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(mode, EyeMode::Both);
    }

    #[test]
    fn missing_maps_pass_the_half_coordinate_through() {
        let rig = LensRig::default();
        // Left eye mirrors into the left half of the shared frame.
        assert_eq!(rig.remap(0.0, 0.3, EyeMode::Left, 0.0), (0.5, 0.3));
        assert_eq!(rig.remap(1.0, 0.3, EyeMode::Left, 0.0), (0.0, 0.3));
        // Right eye mirrors into the right half.
        assert_eq!(rig.remap(0.0, 0.3, EyeMode::Right, 0.0), (1.0, 0.3));
        assert_eq!(rig.remap(1.0, 0.3, EyeMode::Right, 0.0), (0.5, 0.3));
    }

    #[test]
    fn map_output_is_folded_into_the_selected_half() {
        // The map says the corrected UV is (0.9, 0.5); the left eye must
        // still land in the left half of the frame.
        let rig = LensRig {
            left: Some(constant_map(0.9, 0.5)),
            right: Some(constant_map(0.9, 0.5)),
            ..LensRig::default()
        };
        let result = rig.remap(0.5, 0.5, EyeMode::Left, 0.0);
        assert!(close(result, (0.05, 0.5)));
        assert!(result.0 <= 0.5, "left eye sampled outside its half");
    }

    #[test]
    fn swap_flag_swaps_halves_and_maps() {
        let mut rig = LensRig {
            left: Some(constant_map(0.1, 0.2)),
            right: Some(constant_map(0.8, 0.9)),
            ..LensRig::default()
        };

        // Without swap: left map, Y flipped out, folded into the left half.
        assert!(close(rig.remap(0.5, 0.5, EyeMode::Left, 0.0), (0.45, 0.8)));

        // With swap: right map, folded into the opposite half.
        rig.swap_eyes = true;
        assert!(close(rig.remap(0.5, 0.5, EyeMode::Left, 0.0), (0.6, 0.1)));

        // Swapped left eye also mirrors into the other half with no maps.
        let identity = LensRig {
            swap_eyes: true,
            ..LensRig::default()
        };
        assert_eq!(identity.remap(0.0, 0.3, EyeMode::Left, 0.0), (1.0, 0.3));
    }

    #[test]
    fn vr_modes_flip_y_through_the_map() {
        // Identity map + the in/out flips cancel, so only the half fold
        // remains.
        let rig = LensRig {
            left: Some(identity_map()),
            right: Some(identity_map()),
            ..LensRig::default()
        };
        assert!(close(rig.remap(0.5, 0.25, EyeMode::Left, 0.0), (0.25, 0.25)));

        // A constant map exposes the outgoing flip; the fold then mirrors
        // the corrected x into the right half.
        let rig = LensRig {
            left: Some(constant_map(0.5, 0.3)),
            right: Some(constant_map(0.5, 0.3)),
            ..LensRig::default()
        };
        assert!(close(rig.remap(0.5, 0.5, EyeMode::Right, 0.0), (0.75, 0.7)));
    }

    #[test]
    fn hemisphere_picks_the_eye_from_the_offset() {
        let rig = LensRig::default();
        // Offset below the threshold behaves like the left eye.
        assert_eq!(
            rig.remap(0.0, 0.3, EyeMode::Hemisphere, 0.1),
            rig.remap(0.0, 0.3, EyeMode::Left, 0.0)
        );
        // At or above it, the right eye.
        assert_eq!(
            rig.remap(0.0, 0.3, EyeMode::Hemisphere, 0.5),
            rig.remap(0.0, 0.3, EyeMode::Right, 0.0)
        );
    }

    #[test]
    fn plane_mode_does_not_mirror_or_flip() {
        let rig = LensRig::default();
        // Left display covers the left half, unmirrored.
        assert_eq!(rig.remap(0.0, 0.3, EyeMode::Both, 0.0), (0.0, 0.3));
        assert_eq!(rig.remap(1.0, 0.3, EyeMode::Both, 0.0), (0.5, 0.3));
        // Right display covers the right half.
        assert_eq!(rig.remap(0.0, 0.3, EyeMode::Both, 0.5), (0.5, 0.3));

        // No Y flip in plane mode: the constant map's y survives the fold.
        let rig = LensRig {
            left: Some(constant_map(0.5, 0.3)),
            right: Some(constant_map(0.5, 0.3)),
            ..LensRig::default()
        };
        assert!(close(rig.remap(0.5, 0.5, EyeMode::Both, 0.0), (0.25, 0.3)));
    }

    #[test]
    fn plane_mode_inverts_the_map_selection() {
        let rig = LensRig {
            left: Some(constant_map(0.1, 0.1)),
            right: Some(constant_map(0.9, 0.9)),
            ..LensRig::default()
        };
        // Left display reads the right eye's map in plane mode.
        assert!(close(rig.remap(0.5, 0.5, EyeMode::Both, 0.0), (0.45, 0.9)));
        // Right display reads the left eye's map.
        assert!(close(rig.remap(0.5, 0.5, EyeMode::Both, 0.5), (0.55, 0.1)));
    }

    #[test]
    fn deconvex_coordinate_feeds_the_half_fold() {
        // A single coefficient replaces both axes before the fold:
        // (1.0, 0.4) corrects to (0.5, 0.5), then mirrors to 0.25.
        let rig = LensRig {
            deconvex: Some(CurvatureTable::new(vec![0.5]).unwrap()),
            ..LensRig::default()
        };
        assert!(close(rig.remap(1.0, 0.4, EyeMode::Left, 0.0), (0.25, 0.5)));
    }

    #[test]
    fn final_uv_is_clamped() {
        // A map pointing far outside the frame cannot escape [0, 1] after
        // the fold.
        let rig = LensRig {
            left: Some(constant_map(0.0, 1.0)),
            right: Some(constant_map(0.0, 1.0)),
            ..LensRig::default()
        };
        let (x, y) = rig.remap(0.5, 0.5, EyeMode::Right, 0.0);
        assert!((0.0..=1.0).contains(&x));
        assert!((0.0..=1.0).contains(&y));
    }
}
