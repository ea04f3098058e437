//! Pure showflow logic: segmentation, verification, and the planners that
//! turn a showflow document into host edit batches.

pub mod groups;
pub mod placement;
pub mod render;
pub mod slots;
pub mod timecode;
pub mod verify;
