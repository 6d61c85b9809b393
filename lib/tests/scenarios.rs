use std::{collections::HashMap, sync::Arc};

use approx::assert_relative_eq;
use basicorbit::{
    approach::{ClosestApproachSolver, SearchContext},
    bodies::{Body, SolarSystem},
    config::EngineConfig,
    flight::Flight,
    kepler::orbits::OrbitSegment,
    maneuver::{
        burn::{self, FieldValue, ModuleTable, NoEstimator, BETTER_BURN_TIME},
        estimate, BurnContext, ManeuverNode,
    },
    state::ProximityState,
    target::{Target, TargetRef, TargetVessel},
    time::UT,
    trajectory::Trajectory,
    vessel::{Situation, VesselId, VesselTrack},
};
use nalgebra::Vector3;

fn kerbin() -> Body {
    Body {
        name: Arc::from("Kerbin"),
        mu: 3.5316e12,
        radius: 600_000.0,
        soi: 84e9,
        ephem: None,
        parent: None,
    }
}

fn circle(body: &Body, radius: f64, ta: f64) -> OrbitSegment {
    OrbitSegment::new(body, radius, 0.0, 0.0, 0.0, 0.0, UT::default(), ta)
}

fn vessel_target(seg: OrbitSegment) -> Target {
    Target::Vehicle(TargetVessel {
        id: VesselId(2),
        name: "Station".to_owned(),
        current: Trajectory::single(seg).unwrap(),
        planned: None,
    })
}

fn track(name: &str, current: Trajectory) -> VesselTrack {
    VesselTrack {
        name: name.to_owned(),
        situation: Situation::Orbiting,
        loaded: true,
        current,
        planned: None,
        nodes: vec![],
    }
}

/// A node worth `total` m/s whose remaining burn is `remaining` m/s.
fn partial_node(body: &Body, total: f64, remaining: f64) -> ManeuverNode {
    let mut node = ManeuverNode::plan(
        body,
        circle(body, 700_000.0, 0.0),
        UT::new_seconds(300.0),
        Vector3::new(remaining, 0.0, 0.0),
        1e-8,
    )
    .unwrap();
    node.deltav = Vector3::new(total, 0.0, 0.0);
    node
}

#[test]
fn neighbouring_circular_orbits_never_meet() {
    let kerbin = kerbin();
    let ours = Trajectory::single(circle(&kerbin, 700_000.0, 0.0)).unwrap();
    let target = vessel_target(circle(&kerbin, 710_000.0, 0.0));
    let solver = ClosestApproachSolver::new(EngineConfig::default());
    let result = solver.find_closest(&ours, &target, UT::default(), &SearchContext::default());
    assert!(!result.intersects);
}

#[test]
fn periapsis_inside_the_target_body() {
    let kerbin = kerbin();
    let now = UT::new_seconds(5000.0);
    // 650 km periapsis, reached 120 s from now.
    let seg = OrbitSegment::new(&kerbin, 715_000.0, 0.1, 0.0, 0.0, 0.0, now + 120.0, 0.0)
        .with_window(now, UT::NEVER);
    let ours = Trajectory::single(seg).unwrap();
    let target = Target::Celestial(Arc::new(kerbin));

    let solver = ClosestApproachSolver::new(EngineConfig::default());
    let cx = SearchContext {
        now,
        targeter: None,
    };
    let result = solver.find_closest(&ours, &target, now, &cx);
    assert!(result.intersects);
    assert_relative_eq!(result.distance, 50_000.0, max_relative = 1e-9);
    assert_relative_eq!(result.time.into_seconds(), 5120.0, epsilon = 1e-6);
    assert!(result.relative_velocity > 0.0);

    // Unchanged inputs give the same answer.
    assert_eq!(solver.find_closest(&ours, &target, now, &cx), result);
}

#[test]
fn burn_without_estimator() {
    let node = partial_node(&kerbin(), 1200.0, 600.0);
    let cx = BurnContext {
        estimator: &NoEstimator,
        vessel: VesselId(1),
        now: UT::default(),
    };
    let burn = estimate(&node, &cx);
    assert_eq!(burn.delta_v_total, 1200.0);
    assert_relative_eq!(burn.delta_v_remaining, 600.0, max_relative = 1e-6);
    assert!(!burn.refined);
    assert_eq!(burn.burn_length, 0.0);
    assert_eq!(burn.burn_start_time, node.ut);
    assert_eq!(estimate(&node, &cx), burn);
}

#[test]
fn non_finite_estimates_are_ignored() {
    let node = partial_node(&kerbin(), 1200.0, 600.0);
    let modules: ModuleTable = HashMap::from([(
        VesselId(1),
        HashMap::from([(
            BETTER_BURN_TIME.to_owned(),
            HashMap::from([
                ("burnType".to_owned(), FieldValue::Text("maneuver".to_owned())),
                ("burnTime".to_owned(), FieldValue::Number(f64::NAN)),
                ("timeUntil".to_owned(), FieldValue::Number(200.0)),
            ]),
        )]),
    )]);
    let estimator = burn::detect(modules);
    let cx = BurnContext {
        estimator: estimator.as_ref(),
        vessel: VesselId(1),
        now: UT::new_seconds(100.0),
    };
    let burn = estimate(&node, &cx);
    assert!(!burn.refined);
    assert_eq!(burn.burn_start_time, node.ut);
    assert_eq!(burn.burn_length, 0.0);
}

#[test]
fn planned_orbit_reaches_the_station() {
    let kerbin = kerbin();
    let mut system = SolarSystem::default();
    system.insert(kerbin.clone());

    let current = Trajectory::single(circle(&kerbin, 700_000.0, 0.0)).unwrap();
    let node = ManeuverNode::plan(
        &kerbin,
        current.segments()[0].clone(),
        UT::new_seconds(300.0),
        Vector3::new(100.0, 0.0, 0.0),
        1e-8,
    )
    .unwrap();
    let mut ship = track("Ship", current.clone());
    ship.planned = Some(node.planned_trajectory(&current).unwrap());
    ship.nodes.push(node);
    let station = track(
        "Station",
        Trajectory::single(circle(&kerbin, 800_000.0, 1.0)).unwrap(),
    );

    let flight = Flight {
        system: Arc::new(system),
        vessels: HashMap::from([(VesselId(1), ship), (VesselId(2), station)]),
        active: Some(VesselId(1)),
        target: Some(TargetRef::Vessel {
            id: VesselId(2),
            port: Some("Docking Port Jr.".to_owned()),
        }),
        now: UT::default(),
        tick: 17,
        targeter: None,
    };

    let mut state = ProximityState::begin(EngineConfig::default(), Box::new(NoEstimator));
    let readout = state.request_update(&flight).clone();
    assert!(!readout.target.intersects);
    assert!(readout.maneuver.intersects);
    assert!(readout.maneuver.time > UT::new_seconds(300.0));
    assert!(readout.maneuver.distance >= 0.0);
    assert_eq!(readout.target_name.as_deref(), Some("Station [Docking Port Jr.]"));
    let burn = readout.burn.unwrap();
    assert_eq!(burn.delta_v_total, 100.0);
    assert!(!burn.refined);

    assert_eq!(state.request_update(&flight), &readout);
}
