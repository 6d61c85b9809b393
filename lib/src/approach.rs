//! Closest approach between the active vessel's trajectory and its
//! target.
//!
//! Each method either produces a complete [`Approach`] or nothing; the
//! methods are tried in order and the first usable answer wins:
//!
//! 1. For a vessel target, the analytic closest points of the two conics
//!    around a shared body.
//! 2. For a celestial target, the lowest periapsis inside the target's
//!    sphere of influence, then the host's closest-approach time.
//! 3. The nearest orbit targeter marker.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    bodies::Body,
    config::EngineConfig,
    kepler::{closest::closest_points, orbits::OrbitSegment},
    target::Target,
    targeter::{MarkerKind, Targeter},
    time::UT,
    trajectory::Trajectory,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApproachMethod {
    Intersection,
    Periapsis,
    ApproachHint,
    Marker,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Approach {
    /// Separation at `time` (`m`). Periapsis altitude for a periapsis
    /// approach.
    pub distance: f64,
    pub time: UT,
    /// Magnitude of the relative velocity at `time` (`m/s`).
    pub relative_velocity: f64,
    pub method: ApproachMethod,
}

impl Approach {
    fn is_usable(&self) -> bool {
        self.distance.is_finite()
            && self.distance >= 0.0
            && self.relative_velocity.is_finite()
            && self.relative_velocity >= 0.0
            && self.time.is_finite()
    }
}

/// A cached proximity readout.
///
/// `distance`, `time` and `relative_velocity` only carry meaning while
/// `intersects` is set. When a search fails they keep their previous
/// values.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProximityResult {
    pub intersects: bool,
    pub distance: f64,
    pub time: UT,
    pub relative_velocity: f64,
}

impl ProximityResult {
    /// Replace every value with `approach`, or clear the intersect flag
    /// and keep the rest when there is none.
    #[must_use]
    pub fn refreshed(self, approach: Option<Approach>) -> Self {
        match approach {
            Some(approach) => Self {
                intersects: true,
                distance: approach.distance,
                time: approach.time,
                relative_velocity: approach.relative_velocity,
            },
            None => self.cleared(),
        }
    }

    #[must_use]
    pub fn cleared(self) -> Self {
        Self {
            intersects: false,
            ..self
        }
    }
}

/// Per-tick inputs of a search besides the two trajectories.
#[derive(Copy, Clone, Debug, Default)]
pub struct SearchContext<'a> {
    pub now: UT,
    pub targeter: Option<&'a Targeter>,
}

#[derive(Clone, Debug, Default)]
pub struct ClosestApproachSolver {
    config: EngineConfig,
}

impl ClosestApproachSolver {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// A fresh proximity result for `reference` against `target`.
    pub fn find_closest(
        &self,
        reference: &Trajectory,
        target: &Target,
        search_from: UT,
        cx: &SearchContext,
    ) -> ProximityResult {
        ProximityResult::default().refreshed(self.search(reference, target, search_from, cx))
    }

    /// Search `reference` for its closest approach to `target`, looking
    /// only at segments that have not ended by `search_from` and at
    /// times no earlier than `cx.now`.
    pub fn search(
        &self,
        reference: &Trajectory,
        target: &Target,
        search_from: UT,
        cx: &SearchContext,
    ) -> Option<Approach> {
        let analytic = match target {
            Target::Vehicle(vessel) => self
                .intersection(reference, &vessel.current, search_from, cx.now)
                .filter(Approach::is_usable),
            Target::Celestial(body) => self
                .lowest_periapsis(reference, body, search_from, cx.now)
                .filter(Approach::is_usable)
                .or_else(|| self.approach_hint(reference, body, cx).filter(Approach::is_usable)),
        };
        let approach = analytic.or_else(|| nearest_marker(target, cx).filter(Approach::is_usable));
        trace!(?approach, "closest approach search finished");
        approach
    }

    /// The first pair of segments, one from each trajectory, that share
    /// a reference body and overlap in time.
    fn relevant_pair<'t>(
        &self,
        reference: &'t Trajectory,
        target: &'t Trajectory,
        search_from: UT,
    ) -> Option<(&'t OrbitSegment, &'t OrbitSegment)> {
        let limit = self.config.patch_limit;
        reference
            .segments_after(search_from)
            .take(limit)
            .find_map(|ours| {
                target
                    .segments_after(search_from)
                    .take(limit)
                    .find(|theirs| theirs.body == ours.body && theirs.overlaps(ours))
                    .map(|theirs| (ours, theirs))
            })
    }

    fn intersection(
        &self,
        reference: &Trajectory,
        target: &Trajectory,
        search_from: UT,
        now: UT,
    ) -> Option<Approach> {
        let Some((ours, theirs)) = self.relevant_pair(reference, target, search_from) else {
            debug!("no segment pair around a shared body");
            return None;
        };

        let margin = self.config.envelope_margin;
        if ours.periapsis_radius() > theirs.apoapsis_radius() + margin
            || theirs.periapsis_radius() > ours.apoapsis_radius() + margin
        {
            debug!(body = %ours.body, "periapsis/apoapsis envelopes do not overlap");
            return None;
        }

        let from = ours.start.max(search_from).max(now);
        let Some(seed) = ours.ta_at(from) else {
            debug!(%from, "reference conic cannot be evaluated");
            return None;
        };
        let candidates = closest_points(
            ours,
            theirs,
            seed,
            self.config.scan_samples,
            self.config.tolerance,
            self.config.max_iterations,
        )
        .into_iter()
        .filter_map(|ta| {
            let Some(t) = ours.next_time_at_ta(ta, from) else {
                debug!(ta, "candidate is never reached");
                return None;
            };
            if !ours.contains(t) {
                debug!(ta, %t, "candidate lies outside the segment window");
                return None;
            }
            let (r1, v1) = ours.state_at(t)?;
            let (r2, v2) = target
                .segment_at(t)
                .filter(|seg| seg.body == ours.body)?
                .state_at(t)?;
            Some(Approach {
                distance: (r1 - r2).norm(),
                time: t,
                relative_velocity: (v1 - v2).norm(),
                method: ApproachMethod::Intersection,
            })
        });
        closest_candidate(candidates)
    }

    fn lowest_periapsis(
        &self,
        reference: &Trajectory,
        body: &Body,
        search_from: UT,
        now: UT,
    ) -> Option<Approach> {
        reference
            .segments()
            .iter()
            .filter(|seg| seg.start >= search_from)
            .take(self.config.patch_limit)
            .filter(|seg| seg.body == body.name)
            .filter_map(|seg| {
                let pe = seg.periapsis_radius();
                if !(body.radius < pe && pe < body.soi) {
                    trace!(pe, "periapsis is outside the body's usable range");
                    return None;
                }
                let t = seg.next_periapsis(seg.start.max(search_from).max(now))?;
                if !(t < seg.end) {
                    debug!(%t, end = %seg.end, "periapsis falls after the segment ends");
                    return None;
                }
                Some(Approach {
                    distance: pe - body.radius,
                    time: t,
                    relative_velocity: seg.velocity_at(t)?.norm(),
                    method: ApproachMethod::Periapsis,
                })
            })
            .filter(Approach::is_usable)
            .min_by_key(|approach| OrderedFloat(approach.distance))
    }

    /// Evaluate the host's closest-approach time against the body's own
    /// orbit around its parent.
    fn approach_hint(
        &self,
        reference: &Trajectory,
        body: &Body,
        cx: &SearchContext,
    ) -> Option<Approach> {
        let t = cx.targeter?.closest_approach?;
        let (Some(parent), Some(ephem)) = (body.parent.as_ref(), body.ephem.as_ref()) else {
            debug!(body = %body.name, "target body has no orbit");
            return None;
        };
        if t < cx.now {
            debug!(%t, "closest approach time already passed");
            return None;
        }
        let ours = reference
            .segments()
            .iter()
            .take(self.config.patch_limit)
            .find(|seg| seg.contains(t) && &seg.body == parent)?;
        let (r1, v1) = ours.state_at(t)?;
        let (r2, v2) = ephem.conic_state_at(t)?;
        Some(Approach {
            distance: (r1 - r2).norm(),
            time: t,
            relative_velocity: (v1 - v2).norm(),
            method: ApproachMethod::ApproachHint,
        })
    }
}

/// The usable candidate with the smallest distance; on equal distances,
/// the earlier one.
fn closest_candidate(candidates: impl IntoIterator<Item = Approach>) -> Option<Approach> {
    candidates
        .into_iter()
        .filter(Approach::is_usable)
        .min_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.time.total_cmp(&b.time))
        })
}

fn nearest_marker(target: &Target, cx: &SearchContext) -> Option<Approach> {
    let kind = match target {
        Target::Vehicle(_) => MarkerKind::VesselIntersect,
        Target::Celestial(_) => MarkerKind::BodyApproach,
    };
    let marker = cx.targeter?.nearest(kind)?;
    debug!(?kind, sequence = marker.sequence, "using targeter marker");
    Some(Approach {
        distance: marker.separation,
        time: marker.time,
        relative_velocity: marker.relative_speed,
        method: ApproachMethod::Marker,
    })
}
