//! The per-tick snapshot of what the host knows about the flight.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    bodies::SolarSystem,
    target::TargetRef,
    targeter::Targeter,
    time::UT,
    vessel::{VesselId, VesselTrack},
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub system: Arc<SolarSystem>,
    pub vessels: HashMap<VesselId, VesselTrack>,
    pub active: Option<VesselId>,
    pub target: Option<TargetRef>,
    pub now: UT,
    /// Monotonic frame counter of the host.
    pub tick: u64,
    /// The orbit targeter's output for the active vessel, when it is
    /// running.
    pub targeter: Option<Targeter>,
}

impl Flight {
    pub fn active_vessel(&self) -> Option<&VesselTrack> {
        self.vessels.get(&self.active?)
    }
}
