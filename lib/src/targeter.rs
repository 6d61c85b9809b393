//! Data exposed by the host's orbit targeter: precomputed intersection
//! and closest-approach markers.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::time::UT;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    /// Orbit-intersect marker against a vessel target.
    VesselIntersect,
    /// Closest-approach marker against a celestial target.
    BodyApproach,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    /// The host numbers intersect markers 1 and 2.
    pub sequence: u32,
    /// Separation at the marker (`m`).
    pub separation: f64,
    /// Relative speed at the marker (`m/s`).
    pub relative_speed: f64,
    pub time: UT,
}

impl Marker {
    fn is_usable(&self) -> bool {
        self.separation.is_finite()
            && self.separation >= 0.0
            && self.relative_speed.is_finite()
            && self.relative_speed >= 0.0
            && self.time.is_finite()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Targeter {
    #[serde(default)]
    pub markers: Vec<Marker>,
    /// Time of closest approach to a celestial target, as computed by
    /// the host.
    #[serde(default)]
    pub closest_approach: Option<UT>,
}

impl Targeter {
    /// The usable marker of `kind` with the smallest separation. Ties
    /// go to the lower sequence number.
    pub fn nearest(&self, kind: MarkerKind) -> Option<&Marker> {
        self.markers
            .iter()
            .filter(|m| m.kind == kind && m.is_usable())
            .filter(|m| kind != MarkerKind::VesselIntersect || matches!(m.sequence, 1 | 2))
            .min_by_key(|m| (OrderedFloat(m.separation), m.sequence))
    }
}
