use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};

use crate::{maneuver::ManeuverNode, trajectory::Trajectory};

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct VesselId(pub u64);

/// A vessel's situation, using the host's bit values.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromPrimitive,
    IntoPrimitive,
)]
#[repr(u8)]
pub enum Situation {
    Landed = 1,
    Splashed = 2,
    PreLaunch = 4,
    Flying = 8,
    SubOrbital = 16,
    Orbiting = 32,
    Escaping = 64,
    Docked = 128,
    #[default]
    Unknown = 0,
}

impl Situation {
    /// Resting on a surface, where proximity readouts are not computed.
    pub fn is_surface(self) -> bool {
        matches!(
            self,
            Situation::Landed | Situation::Splashed | Situation::PreLaunch
        )
    }
}

/// What the host reports about a vessel each tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VesselTrack {
    pub name: String,
    #[serde(default)]
    pub situation: Situation,
    /// `false` once the vessel is destroyed or unloaded.
    #[serde(default = "loaded")]
    pub loaded: bool,
    /// The vessel's predicted path without further maneuvers.
    pub current: Trajectory,
    /// The path after the planned maneuvers, if any are planned.
    #[serde(default)]
    pub planned: Option<Trajectory>,
    #[serde(default)]
    pub nodes: Vec<ManeuverNode>,
}

fn loaded() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn situation_from_host_bits() {
        assert_eq!(Situation::from(4u8), Situation::PreLaunch);
        assert_eq!(Situation::from(32u8), Situation::Orbiting);
        assert_eq!(Situation::from(3u8), Situation::Unknown);
        assert_eq!(Situation::default(), Situation::Unknown);
        assert!(Situation::from(2u8).is_surface());
        assert!(!Situation::SubOrbital.is_surface());
        assert_eq!(u8::from(Situation::Docked), 128);
    }
}
