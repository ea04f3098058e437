//! Branch-group expansion. The two group keys are a fixed production
//! convention; any new group is a code change, not data.

use crate::model::slot::{Branch, ClipKey};

/// Expand a clip key to the branches it places onto.
pub fn expand(key: ClipKey) -> Vec<Branch> {
    key.branches()
}
