use color_eyre::eyre::{self, OptionExt};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    bodies::Body, kepler::orbits::OrbitSegment, time::UT, trajectory::Trajectory,
    vessel::VesselId,
};

pub mod burn;

use burn::BurnEstimator;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManeuverNode {
    /// Nominal execution time.
    pub ut: UT,
    /// Delta-V vector in the Frenet frame.
    pub deltav: Vector3<f64>,
    /// The patch the node sits on.
    pub patch: OrbitSegment,
    /// The orbit after the burn.
    pub next_patch: OrbitSegment,
}

impl ManeuverNode {
    /// Plan a burn of `deltav` (Frenet frame) at `ut` on `patch`.
    ///
    /// Recommended tolerance (`tol`): `1e-8`.
    pub fn plan(
        body: &Body,
        patch: OrbitSegment,
        ut: UT,
        deltav: Vector3<f64>,
        tol: f64,
    ) -> Option<Self> {
        let (position, velocity) = patch.state_at(ut)?;
        let velocity = velocity + frenet(&position, &velocity) * deltav;
        let next_patch = OrbitSegment::from_state_vector(body, position, velocity, ut, tol)?;
        Some(Self {
            ut,
            deltav,
            patch,
            next_patch,
        })
    }

    pub fn delta_v_total(&self) -> f64 {
        self.deltav.norm()
    }

    /// The velocity change still separating the node's patch from the
    /// post-burn orbit at the node time.
    pub fn delta_v_remaining(&self) -> Option<f64> {
        let (_, before) = self.patch.conic_state_at(self.ut)?;
        let (_, after) = self.next_patch.conic_state_at(self.ut)?;
        let dv = (after - before).norm();
        dv.is_finite().then_some(dv)
    }

    /// `current` up to the node, followed by the post-burn orbit.
    pub fn planned_trajectory(&self, current: &Trajectory) -> eyre::Result<Trajectory> {
        let mut segments = current
            .segments()
            .iter()
            .filter(|seg| seg.start < self.ut)
            .cloned()
            .collect::<Vec<_>>();
        let last = segments
            .last_mut()
            .ok_or_eyre("maneuver node is before the trajectory starts")?;
        last.end = self.ut;
        segments.push(self.next_patch.clone().with_window(self.ut, UT::NEVER));
        Trajectory::new(segments)
    }
}

/// Returns the Frenet frame to IJK conversion matrix for the given
/// position and velocity.
pub fn frenet(position: &Vector3<f64>, velocity: &Vector3<f64>) -> Matrix3<f64> {
    let t = velocity.normalize();
    let n = position.cross(velocity).normalize();
    let b = t.cross(&n);
    Matrix3::from_columns(&[t, n, b])
}

/// Delta-V and timing of the next burn.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManeuverBurn {
    pub delta_v_total: f64,
    pub delta_v_remaining: f64,
    /// When to start burning. The node time unless `refined`.
    pub burn_start_time: UT,
    /// Zero unless `refined`.
    pub burn_length: f64,
    /// Whether an external burn time estimate was applied.
    pub refined: bool,
}

pub struct BurnContext<'a> {
    pub estimator: &'a dyn BurnEstimator,
    pub vessel: VesselId,
    pub now: UT,
}

/// Never fails: missing or unusable estimates give the nominal burn.
pub fn estimate(node: &ManeuverNode, cx: &BurnContext) -> ManeuverBurn {
    let delta_v_total = node.delta_v_total();
    let delta_v_remaining = node.delta_v_remaining().unwrap_or_else(|| {
        debug!(ut = %node.ut, "cannot evaluate the node patches, assuming no progress");
        delta_v_total
    });
    let nominal = ManeuverBurn {
        delta_v_total,
        delta_v_remaining,
        burn_start_time: node.ut,
        burn_length: 0.0,
        refined: false,
    };

    let Some(report) = cx.estimator.report(cx.vessel) else {
        return nominal;
    };
    if !report.burn_type.eq_ignore_ascii_case("maneuver") {
        debug!(burn_type = %report.burn_type, "estimate is not for a maneuver");
        return nominal;
    }
    if !(report.length.is_finite() && report.length >= 0.0 && report.time_until.is_finite()) {
        debug!(?report, "unusable burn time estimate");
        return nominal;
    }

    let burn_start_time = cx.now + report.time_until - report.length / 2.0;
    if !burn_start_time.is_finite() {
        return nominal;
    }
    ManeuverBurn {
        burn_start_time,
        burn_length: report.length,
        refined: true,
        ..nominal
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use approx::assert_relative_eq;

    use super::{
        burn::{BurnReport, NoEstimator},
        *,
    };
    use crate::kepler::orbits::tests::{circular, kerbin};

    struct Fixed(BurnReport);

    impl BurnEstimator for Fixed {
        fn report(&self, _vessel: VesselId) -> Option<BurnReport> {
            Some(self.0.clone())
        }
    }

    /// A node of `total` m/s on a 700 km orbit whose post-burn patch
    /// is only `remaining` m/s away.
    pub(crate) fn partial_node(total: f64, remaining: f64) -> ManeuverNode {
        let kerbin = kerbin();
        let patch = circular(&kerbin, 700_000.0, 0.0, 0.0, UT::default());
        let ut = UT::new_seconds(300.0);
        let mut node =
            ManeuverNode::plan(&kerbin, patch, ut, Vector3::new(remaining, 0.0, 0.0), 1e-8)
                .unwrap();
        node.deltav = Vector3::new(total, 0.0, 0.0);
        node
    }

    #[test]
    fn prograde_burn_raises_apoapsis() {
        let kerbin = kerbin();
        let patch = circular(&kerbin, 700_000.0, 0.0, 0.0, UT::default());
        let node = ManeuverNode::plan(
            &kerbin,
            patch,
            UT::new_seconds(100.0),
            Vector3::new(100.0, 0.0, 0.0),
            1e-8,
        )
        .unwrap();
        assert_relative_eq!(node.next_patch.periapsis_radius(), 700_000.0, max_relative = 1e-6);
        assert!(node.next_patch.apoapsis_radius() > 800_000.0);
        assert_relative_eq!(node.delta_v_remaining().unwrap(), 100.0, max_relative = 1e-6);
    }

    #[test]
    fn nominal_without_estimator() {
        let node = partial_node(1200.0, 600.0);
        let cx = BurnContext {
            estimator: &NoEstimator,
            vessel: VesselId(1),
            now: UT::new_seconds(10.0),
        };
        let burn = estimate(&node, &cx);
        assert_eq!(burn.delta_v_total, 1200.0);
        assert_relative_eq!(burn.delta_v_remaining, 600.0, max_relative = 1e-6);
        assert!(!burn.refined);
        assert_eq!(burn.burn_length, 0.0);
        assert_eq!(burn.burn_start_time, node.ut);
    }

    #[test]
    fn maneuver_estimate_centres_the_burn() {
        let node = partial_node(1200.0, 600.0);
        let estimator = Fixed(BurnReport {
            burn_type: "Maneuver".to_owned(),
            length: 40.0,
            time_until: 290.0,
        });
        let cx = BurnContext {
            estimator: &estimator,
            vessel: VesselId(1),
            now: UT::new_seconds(10.0),
        };
        let burn = estimate(&node, &cx);
        assert!(burn.refined);
        assert_eq!(burn.burn_length, 40.0);
        assert_eq!(burn.burn_start_time, UT::new_seconds(280.0));
    }

    #[test]
    fn other_burn_types_and_bad_numbers_fall_back() {
        let node = partial_node(1200.0, 600.0);
        for report in [
            BurnReport {
                burn_type: "impact".to_owned(),
                length: 40.0,
                time_until: 290.0,
            },
            BurnReport {
                burn_type: "maneuver".to_owned(),
                length: f64::INFINITY,
                time_until: 290.0,
            },
            BurnReport {
                burn_type: "maneuver".to_owned(),
                length: -1.0,
                time_until: 290.0,
            },
            BurnReport {
                burn_type: "maneuver".to_owned(),
                length: 40.0,
                time_until: f64::NAN,
            },
        ] {
            let estimator = Fixed(report);
            let cx = BurnContext {
                estimator: &estimator,
                vessel: VesselId(1),
                now: UT::new_seconds(10.0),
            };
            let burn = estimate(&node, &cx);
            assert!(!burn.refined);
            assert_eq!(burn.burn_start_time, node.ut);
            assert_eq!(burn.burn_length, 0.0);
        }
    }

    #[test]
    fn planned_trajectory_splices_at_the_node() {
        let node = partial_node(100.0, 100.0);
        let current = Trajectory::single(node.patch.clone()).unwrap();
        let planned = node.planned_trajectory(&current).unwrap();
        assert_eq!(planned.segments().len(), 2);
        assert_eq!(planned.segments()[0].end, node.ut);
        assert_eq!(planned.segment_at(node.ut).unwrap().e, node.next_patch.e);

        let late = Trajectory::single(node.patch.clone().with_window(UT::new_seconds(400.0), UT::NEVER))
            .unwrap();
        assert!(node.planned_trajectory(&late).is_err());
    }
}
