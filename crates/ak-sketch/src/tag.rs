//! Topology Tags
//!
//! Every face produced by a sketch builder carries exactly one tag of the
//! form `<signedIndex>_<roleTag>`, e.g. `-1_holeTopo`. The role tells later
//! queries which builder role created the face; `-1` marks a freshly drawn
//! region that does not derive from an existing curve.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SketchError;
use crate::sketch::Face;

/// Index stamped on regions created by a draw operation
pub const DRAWN_INDEX: i32 = -1;

/// Role of a sketch face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TopoRole {
    /// Opening cut into a slab or floor face
    #[serde(rename = "holeTopo")]
    Hole,
    /// Plain face (slab profile, outdoor drawing face)
    #[serde(rename = "faceTopo")]
    Face,
    /// Roof drawing region
    #[serde(rename = "regionTopo")]
    Region,
}

impl TopoRole {
    /// Role tag string as written into topology tags
    pub fn as_str(&self) -> &'static str {
        match self {
            TopoRole::Hole => "holeTopo",
            TopoRole::Face => "faceTopo",
            TopoRole::Region => "regionTopo",
        }
    }

    /// All roles
    pub fn all() -> &'static [TopoRole] {
        &[TopoRole::Hole, TopoRole::Face, TopoRole::Region]
    }
}

impl fmt::Display for TopoRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopoRole {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TopoRole::all()
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| SketchError::InvalidTopoTag(s.to_string()))
    }
}

/// A topology tag attached to a sketch face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TopoTag {
    /// Signed source index (`-1` for drawn regions)
    pub index: i32,
    /// Role of the tagged face
    pub role: TopoRole,
}

impl TopoTag {
    /// Create a tag with an explicit index
    pub fn new(index: i32, role: TopoRole) -> Self {
        Self { index, role }
    }

    /// Tag stamped on a newly drawn region
    pub fn drawn(role: TopoRole) -> Self {
        Self::new(DRAWN_INDEX, role)
    }

    /// Check whether this tag passes a role filter
    pub fn matches(&self, filter: TopoRole) -> bool {
        self.role == filter
    }

    /// Whether the tag marks a freshly drawn region
    pub fn is_drawn(&self) -> bool {
        self.index == DRAWN_INDEX
    }
}

impl fmt::Display for TopoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.index, self.role)
    }
}

impl FromStr for TopoTag {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (index, role) = s
            .split_once('_')
            .ok_or_else(|| SketchError::InvalidTopoTag(s.to_string()))?;
        let index = index
            .parse::<i32>()
            .map_err(|_| SketchError::InvalidTopoTag(s.to_string()))?;
        let role = role
            .parse::<TopoRole>()
            .map_err(|_| SketchError::InvalidTopoTag(s.to_string()))?;
        Ok(Self { index, role })
    }
}

impl TryFrom<String> for TopoTag {
    type Error = SketchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TopoTag> for String {
    fn from(tag: TopoTag) -> Self {
        tag.to_string()
    }
}

/// Iterate over the faces whose tag matches `role`
pub fn filter_faces(faces: &[Face], role: TopoRole) -> impl Iterator<Item = &Face> {
    faces.iter().filter(move |face| face.tag.matches(role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::FaceId;
    use glam::DVec2;

    fn square(tag: TopoTag) -> Face {
        Face::new(
            FaceId::new(),
            vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(1.0, 0.0),
                DVec2::new(1.0, 1.0),
                DVec2::new(0.0, 1.0),
            ],
            Vec::new(),
            tag,
        )
    }

    #[test]
    fn test_drawn_tag_format() {
        assert_eq!(TopoTag::drawn(TopoRole::Hole).to_string(), "-1_holeTopo");
        assert_eq!(TopoTag::drawn(TopoRole::Region).to_string(), "-1_regionTopo");
        assert!(TopoTag::drawn(TopoRole::Face).is_drawn());
    }

    #[test]
    fn test_parse() {
        let tag: TopoTag = "-1_faceTopo".parse().unwrap();
        assert_eq!(tag, TopoTag::drawn(TopoRole::Face));

        let tag: TopoTag = "7_regionTopo".parse().unwrap();
        assert_eq!(tag.index, 7);
        assert_eq!(tag.role, TopoRole::Region);

        assert!("-1_unknownTopo".parse::<TopoTag>().is_err());
        assert!("holeTopo".parse::<TopoTag>().is_err());
        assert!("x_holeTopo".parse::<TopoTag>().is_err());
    }

    #[test]
    fn test_filters_are_disjoint() {
        let faces = vec![
            square(TopoTag::drawn(TopoRole::Hole)),
            square(TopoTag::drawn(TopoRole::Face)),
            square(TopoTag::new(3, TopoRole::Hole)),
        ];

        let holes: Vec<_> = filter_faces(&faces, TopoRole::Hole).map(|f| f.id).collect();
        let plain: Vec<_> = filter_faces(&faces, TopoRole::Face).map(|f| f.id).collect();

        assert_eq!(holes.len(), 2);
        assert_eq!(plain.len(), 1);
        assert!(holes.iter().all(|id| !plain.contains(id)));
    }
}
