//! Chains of patched conics.

use std::sync::Arc;

use color_eyre::eyre::{self, bail};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{kepler::orbits::OrbitSegment, time::UT};

/// An ordered, non-overlapping sequence of orbit segments.
///
/// Cloning is cheap; the segments are shared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<OrbitSegment>", into = "Vec<OrbitSegment>")]
pub struct Trajectory {
    segments: Arc<[OrbitSegment]>,
}

impl Trajectory {
    pub fn new(segments: Vec<OrbitSegment>) -> eyre::Result<Self> {
        if segments.is_empty() {
            bail!("trajectory has no segments");
        }
        for (k, seg) in segments.iter().enumerate() {
            if !seg.start.is_finite() || !(seg.start < seg.end) {
                bail!("segment {k} has an empty window [{}, {})", seg.start, seg.end);
            }
        }
        for ((k, a), (_, b)) in segments.iter().enumerate().tuple_windows() {
            if b.start < a.end {
                bail!(
                    "segment {} starting at {} overlaps segment {k} ending at {}",
                    k + 1,
                    b.start,
                    a.end
                );
            }
        }
        Ok(Self {
            segments: segments.into(),
        })
    }

    pub fn single(segment: OrbitSegment) -> eyre::Result<Self> {
        Self::new(vec![segment])
    }

    pub fn segments(&self) -> &[OrbitSegment] {
        &self.segments
    }

    /// The segment valid at `t`, if any.
    pub fn segment_at(&self, t: UT) -> Option<&OrbitSegment> {
        self.segments.iter().find(|seg| seg.contains(t))
    }

    /// Segments that have not ended by `t`, in order.
    pub fn segments_after(&self, t: UT) -> impl Iterator<Item = &OrbitSegment> {
        self.segments.iter().filter(move |seg| seg.end > t)
    }
}

impl TryFrom<Vec<OrbitSegment>> for Trajectory {
    type Error = eyre::Report;

    fn try_from(segments: Vec<OrbitSegment>) -> Result<Self, Self::Error> {
        Self::new(segments)
    }
}

impl From<Trajectory> for Vec<OrbitSegment> {
    fn from(trajectory: Trajectory) -> Self {
        trajectory.segments.to_vec()
    }
}
