//! The cache behind the proximity readouts.

use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    approach::{ClosestApproachSolver, ProximityResult, SearchContext},
    config::EngineConfig,
    flight::Flight,
    maneuver::{burn::BurnEstimator, estimate, BurnContext, ManeuverBurn},
    target::{Target, TargetKind, TargetResolver},
};

/// What the display reads between ticks.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Readout {
    /// Current trajectory against the target.
    pub target: ProximityResult,
    /// Planned trajectory, after the next node, against the target.
    pub maneuver: ProximityResult,
    /// The next maneuver node's burn, if one is planned.
    pub burn: Option<ManeuverBurn>,
    pub target_kind: Option<TargetKind>,
    pub target_name: Option<String>,
    /// Tick of the last recomputation.
    pub updated: Option<u64>,
}

impl Readout {
    fn clear_intersects(&mut self) {
        self.target = self.target.cleared();
        self.maneuver = self.maneuver.cleared();
    }
}

/// Owned for the duration of a flight: created by [`begin`], updated at
/// most once per tick and reset by [`clear`].
///
/// [`begin`]: ProximityState::begin
/// [`clear`]: ProximityState::clear
pub struct ProximityState {
    solver: ClosestApproachSolver,
    estimator: Box<dyn BurnEstimator>,
    readout: Readout,
}

impl ProximityState {
    pub fn begin(config: EngineConfig, estimator: Box<dyn BurnEstimator>) -> Self {
        Self {
            solver: ClosestApproachSolver::new(config),
            estimator,
            readout: Readout::default(),
        }
    }

    pub fn readout(&self) -> &Readout {
        &self.readout
    }

    pub fn clear(&mut self) {
        self.readout = Readout::default();
    }

    /// Recompute the readouts for `flight`, unless they were already
    /// computed for its tick.
    pub fn request_update(&mut self, flight: &Flight) -> &Readout {
        if self.readout.updated == Some(flight.tick) {
            trace!(tick = flight.tick, "readouts are current");
            return &self.readout;
        }
        self.readout.updated = Some(flight.tick);

        let (Some(id), Some(vessel)) = (flight.active, flight.active_vessel()) else {
            debug!("no active vessel");
            self.readout.clear_intersects();
            return &self.readout;
        };

        let node = vessel.nodes.first();
        self.readout.burn = node.map(|node| {
            estimate(
                node,
                &BurnContext {
                    estimator: self.estimator.as_ref(),
                    vessel: id,
                    now: flight.now,
                },
            )
        });

        let target = TargetResolver::new(flight).resolve();
        self.readout.target_kind = target.as_ref().map(Target::kind);
        self.readout.target_name = target.as_ref().map(|target| target.name().to_owned());

        if vessel.situation.is_surface() {
            debug!(situation = ?vessel.situation, "on the surface, skipping proximity search");
            self.readout.clear_intersects();
            return &self.readout;
        }
        let Some(target) = target else {
            self.readout.clear_intersects();
            return &self.readout;
        };

        let cx = SearchContext {
            now: flight.now,
            targeter: flight.targeter.as_ref(),
        };
        let search_from = vessel
            .current
            .segment_at(flight.now)
            .map_or(flight.now, |seg| seg.start);
        self.readout.target = self.readout.target.refreshed(self.solver.search(
            &vessel.current,
            &target,
            search_from,
            &cx,
        ));
        self.readout.maneuver = match (node, vessel.planned.as_ref()) {
            (Some(node), Some(planned)) => self
                .readout
                .maneuver
                .refreshed(self.solver.search(planned, &target, node.ut, &cx)),
            _ => self.readout.maneuver.cleared(),
        };
        trace!(readout = ?self.readout, "readouts updated");
        &self.readout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flight::tests::{flight_with, track},
        maneuver::{burn::NoEstimator, tests::partial_node},
        target::TargetRef,
        time::UT,
        vessel::{Situation, VesselId},
    };

    fn crossing_flight() -> Flight {
        let mut flight = flight_with(vec![
            (VesselId(1), track("Ship", 700_000.0)),
            (VesselId(2), track("Station", 700_000.0)),
        ]);
        flight.target = Some(TargetRef::Vessel {
            id: VesselId(2),
            port: None,
        });
        flight
    }

    #[test]
    fn at_most_once_per_tick() {
        let mut flight = crossing_flight();
        let mut state = ProximityState::begin(EngineConfig::default(), Box::new(NoEstimator));
        let first = state.request_update(&flight).clone();
        assert!(first.target.intersects);
        assert_eq!(first.target_name.as_deref(), Some("Station"));

        // Same tick: the changed target is not picked up.
        flight.target = None;
        assert_eq!(state.request_update(&flight), &first);

        flight.tick += 1;
        let second = state.request_update(&flight).clone();
        assert!(!second.target.intersects);
        assert_eq!(second.target.distance, first.target.distance);
        assert_eq!(second.target_name, None);
    }

    #[test]
    fn surface_vessels_skip_the_search() {
        let mut flight = crossing_flight();
        let mut state = ProximityState::begin(EngineConfig::default(), Box::new(NoEstimator));
        assert!(state.request_update(&flight).target.intersects);

        flight.tick += 1;
        flight
            .vessels
            .get_mut(&VesselId(1))
            .unwrap()
            .situation = Situation::PreLaunch;
        let readout = state.request_update(&flight);
        assert!(!readout.target.intersects);
        assert_eq!(readout.target_name.as_deref(), Some("Station"));
    }

    #[test]
    fn clear_forgets_everything() {
        let flight = crossing_flight();
        let mut state = ProximityState::begin(EngineConfig::default(), Box::new(NoEstimator));
        state.request_update(&flight);
        state.clear();
        assert_eq!(state.readout(), &Readout::default());
        assert_eq!(state.request_update(&flight).updated, Some(flight.tick));
    }

    #[test]
    fn maneuver_panel_needs_a_node() {
        let flight = crossing_flight();
        let mut state = ProximityState::begin(EngineConfig::default(), Box::new(NoEstimator));
        let readout = state.request_update(&flight);
        assert!(!readout.maneuver.intersects);
        assert_eq!(readout.burn, None);
        assert_eq!(readout.maneuver.time, UT::default());
    }

    #[test]
    fn burn_survives_a_tick_without_an_active_vessel() {
        let mut flight = crossing_flight();
        flight
            .vessels
            .get_mut(&VesselId(1))
            .unwrap()
            .nodes
            .push(partial_node(1200.0, 600.0));
        let mut state = ProximityState::begin(EngineConfig::default(), Box::new(NoEstimator));
        let first = state.request_update(&flight).burn.clone();
        assert!(first.is_some());

        flight.tick += 1;
        flight.active = None;
        let readout = state.request_update(&flight);
        assert_eq!(readout.burn, first);
        assert!(!readout.target.intersects);

        // An active vessel without a node does drop it.
        flight.tick += 1;
        flight.active = Some(VesselId(2));
        assert_eq!(state.request_update(&flight).burn, None);
    }
}
