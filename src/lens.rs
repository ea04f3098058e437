//! Lens-correction support for the stereo preview: the HVMap lookup-table
//! format, the de-convex curvature table, and the per-coordinate UV
//! composition the preview shader performs.

pub mod deconvex;
pub mod hvmap;
pub mod remap;
