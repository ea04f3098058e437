use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// One of the eight parallel story paths, each bound to a video track index
/// through the showflow's `tracks` map.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Branch {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl Branch {
    pub fn letter(&self) -> &'static str {
        match self {
            Branch::A => "A",
            Branch::B => "B",
            Branch::C => "C",
            Branch::D => "D",
            Branch::E => "E",
            Branch::F => "F",
            Branch::G => "G",
            Branch::H => "H",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

impl FromStr for Branch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Branch::A),
            "B" => Ok(Branch::B),
            "C" => Ok(Branch::C),
            "D" => Ok(Branch::D),
            "E" => Ok(Branch::E),
            "F" => Ok(Branch::F),
            "G" => Ok(Branch::G),
            "H" => Ok(Branch::H),
            other => Err(format!("unknown branch '{}'", other)),
        }
    }
}

/// Key of a slot's `clips` map: a single branch letter or one of the two
/// fixed group keys that clone a clip onto four branches at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClipKey {
    Branch(Branch),
    GroupAdfh,
    GroupBceg,
}

impl ClipKey {
    /// Expand to the real branches this key addresses.
    pub fn branches(&self) -> Vec<Branch> {
        use Branch::*;
        match self {
            ClipKey::Branch(b) => vec![*b],
            ClipKey::GroupAdfh => vec![A, D, F, H],
            ClipKey::GroupBceg => vec![B, C, E, G],
        }
    }
}

impl fmt::Display for ClipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipKey::Branch(b) => f.write_str(b.letter()),
            ClipKey::GroupAdfh => f.write_str("groupADFH"),
            ClipKey::GroupBceg => f.write_str("groupBCEG"),
        }
    }
}

impl FromStr for ClipKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "groupADFH" => Ok(ClipKey::GroupAdfh),
            "groupBCEG" => Ok(ClipKey::GroupBceg),
            other => other
                .parse::<Branch>()
                .map(ClipKey::Branch)
                .map_err(|_| format!("unknown clip key '{}'", other)),
        }
    }
}

// Hand-rolled so ClipKey can serve as a JSON map key.
impl Serialize for ClipKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ClipKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Full clip descriptor. `slot_in`/`slot_out` are offsets relative to the
/// slot window, in frames.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClipRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub slot_in: Option<i64>,
    #[serde(rename = "out", default, skip_serializing_if = "Option::is_none")]
    pub slot_out: Option<i64>,
}

/// A clip assignment is either the cleaned-up bare name form or a full
/// descriptor with placement metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ClipEntry {
    Clip(ClipRef),
    Name(String),
}

impl ClipEntry {
    pub fn name(&self) -> &str {
        match self {
            ClipEntry::Clip(c) => &c.name,
            ClipEntry::Name(n) => n,
        }
    }
}

/// A time window bounded by markers, holding at most one clip per branch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Slot {
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub duration: i64,
    #[serde(default)]
    pub clips: BTreeMap<ClipKey, ClipEntry>,
}

impl Slot {
    pub fn end(&self) -> i64 {
        self.time + self.duration
    }
}
