//! Resolution of the active vessel's target.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    bodies::{Body, BodyId},
    flight::Flight,
    trajectory::Trajectory,
    vessel::VesselId,
};

/// What the host has selected as the active vessel's target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetRef {
    Body(BodyId),
    Vessel {
        id: VesselId,
        #[serde(default)]
        port: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TargetVessel {
    pub id: VesselId,
    pub name: String,
    pub current: Trajectory,
    pub planned: Option<Trajectory>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    Celestial(Arc<Body>),
    Vehicle(TargetVessel),
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Celestial(body) => &body.name,
            Target::Vehicle(vessel) => &vessel.name,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Celestial(_) => TargetKind::Celestial,
            Target::Vehicle(_) => TargetKind::Vehicle,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Celestial,
    Vehicle,
}

/// Reads the target selection out of a flight snapshot. Never modifies
/// the snapshot.
pub struct TargetResolver<'a> {
    flight: &'a Flight,
}

impl<'a> TargetResolver<'a> {
    pub fn new(flight: &'a Flight) -> Self {
        Self { flight }
    }

    pub fn resolve(&self) -> Option<Target> {
        let active = self.flight.active?;
        if !self.flight.vessels.contains_key(&active) {
            debug!(?active, "active vessel is not tracked");
            return None;
        }
        match self.flight.target.as_ref()? {
            TargetRef::Body(name) => {
                let Some(body) = self.flight.system.get(name) else {
                    debug!(%name, "target body is not in the solar system");
                    return None;
                };
                Some(Target::Celestial(body.clone()))
            }
            TargetRef::Vessel { id, port } => {
                if *id == active {
                    debug!("active vessel targets itself");
                    return None;
                }
                let track = self.flight.vessels.get(id)?;
                if !track.loaded {
                    debug!(?id, "target vessel is not loaded");
                    return None;
                }
                let name = match port {
                    Some(port) => format!("{} [{port}]", track.name),
                    None => track.name.clone(),
                };
                Some(Target::Vehicle(TargetVessel {
                    id: *id,
                    name,
                    current: track.current.clone(),
                    planned: track.planned.clone(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::tests::{flight_with, track};

    #[test]
    fn no_active_or_no_target() {
        let mut flight = flight_with(vec![(VesselId(1), track("Ship", 700_000.0))]);
        assert_eq!(TargetResolver::new(&flight).resolve(), None);
        flight.target = Some(TargetRef::Body(Arc::from("Kerbin")));
        flight.active = None;
        assert_eq!(TargetResolver::new(&flight).resolve(), None);
    }

    #[test]
    fn vessel_target_with_port() {
        let mut flight = flight_with(vec![
            (VesselId(1), track("Ship", 700_000.0)),
            (VesselId(2), track("Station", 710_000.0)),
        ]);
        flight.target = Some(TargetRef::Vessel {
            id: VesselId(2),
            port: Some("Clamp-O-Tron".to_owned()),
        });
        let target = TargetResolver::new(&flight).resolve().unwrap();
        assert_eq!(target.name(), "Station [Clamp-O-Tron]");
        assert_eq!(target.kind(), TargetKind::Vehicle);
    }

    #[test]
    fn self_unloaded_and_unknown_targets() {
        let mut flight = flight_with(vec![
            (VesselId(1), track("Ship", 700_000.0)),
            (VesselId(2), track("Debris", 710_000.0)),
        ]);
        flight.target = Some(TargetRef::Vessel {
            id: VesselId(1),
            port: None,
        });
        assert_eq!(TargetResolver::new(&flight).resolve(), None);

        flight.vessels.get_mut(&VesselId(2)).unwrap().loaded = false;
        flight.target = Some(TargetRef::Vessel {
            id: VesselId(2),
            port: None,
        });
        assert_eq!(TargetResolver::new(&flight).resolve(), None);

        flight.target = Some(TargetRef::Body(Arc::from("Jool")));
        assert_eq!(TargetResolver::new(&flight).resolve(), None);
    }

    #[test]
    fn celestial_target() {
        let mut flight = flight_with(vec![(VesselId(1), track("Ship", 700_000.0))]);
        flight.target = Some(TargetRef::Body(Arc::from("Kerbin")));
        let target = TargetResolver::new(&flight).resolve().unwrap();
        assert!(matches!(target, Target::Celestial(ref body) if &*body.name == "Kerbin"));
    }
}
