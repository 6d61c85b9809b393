//! Replay scenarios: a solar system, some vessels and a list of ticks,
//! read from RON.

use std::{collections::HashMap, sync::Arc};

use basicorbit::{
    bodies::{Body, SolarSystem},
    flight::Flight,
    maneuver::{burn::ModuleTable, ManeuverNode},
    target::TargetRef,
    targeter::Targeter,
    time::UT,
    trajectory::Trajectory,
    vessel::{Situation, VesselId, VesselTrack},
};
use color_eyre::eyre::{self, eyre, OptionExt, WrapErr};
use nalgebra::Vector3;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub bodies: Vec<Body>,
    pub vessels: Vec<VesselEntry>,
    #[serde(default)]
    pub active: Option<VesselId>,
    #[serde(default)]
    pub target: Option<TargetRef>,
    /// Data modules per vessel, as an installed add-on would publish them.
    #[serde(default)]
    pub modules: ModuleTable,
    pub ticks: Vec<Tick>,
}

#[derive(Debug, Deserialize)]
pub struct VesselEntry {
    pub id: VesselId,
    pub name: String,
    #[serde(default)]
    pub situation: Situation,
    #[serde(default = "loaded")]
    pub loaded: bool,
    pub current: Trajectory,
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
}

fn loaded() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct NodeEntry {
    pub ut: UT,
    /// Prograde, normal and binormal components (`m/s`).
    pub deltav: Vector3<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Tick {
    pub now: UT,
    /// Replaces the scenario's target from this tick on.
    #[serde(default)]
    pub retarget: Option<Option<TargetRef>>,
    #[serde(default)]
    pub targeter: Option<Targeter>,
    /// Marks the active vessel as landed, splashed or in orbit.
    #[serde(default)]
    pub situation: Option<Situation>,
    /// Replaces the published data modules from this tick on.
    #[serde(default)]
    pub modules: Option<ModuleTable>,
}

/// One tick of the replay.
pub struct Frame {
    pub flight: Flight,
    /// Data modules as published during this tick.
    pub modules: ModuleTable,
}

pub struct Replay {
    /// Data modules present when the flight begins.
    pub modules: ModuleTable,
    pub frames: Vec<Frame>,
}

impl Scenario {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {path}"))?;
        ron::from_str(&text).wrap_err_with(|| format!("parsing scenario {path}"))
    }

    pub fn build(self) -> eyre::Result<Replay> {
        let mut system = SolarSystem::default();
        for body in self.bodies {
            system.insert(body);
        }

        let mut vessels = HashMap::new();
        for entry in self.vessels {
            let id = entry.id;
            let track = entry
                .into_track(&system)
                .wrap_err_with(|| format!("vessel {id:?}"))?;
            if vessels.insert(id, track).is_some() {
                return Err(eyre!("vessel {id:?} is defined twice"));
            }
        }
        info!(bodies = system.bodies.len(), vessels = vessels.len(), "scenario loaded");

        let system = Arc::new(system);
        let mut target = self.target;
        let mut modules = self.modules.clone();
        let mut frames = Vec::with_capacity(self.ticks.len());
        for (tick, entry) in (1..).zip(self.ticks) {
            if let Some(retarget) = entry.retarget {
                target = retarget;
            }
            if let Some(published) = entry.modules {
                modules = published;
            }
            if let (Some(situation), Some(active)) = (entry.situation, self.active) {
                if let Some(track) = vessels.get_mut(&active) {
                    track.situation = situation;
                }
            }
            frames.push(Frame {
                flight: Flight {
                    system: system.clone(),
                    vessels: vessels.clone(),
                    active: self.active,
                    target: target.clone(),
                    now: entry.now,
                    tick,
                    targeter: entry.targeter,
                },
                modules: modules.clone(),
            });
        }

        Ok(Replay {
            modules: self.modules,
            frames,
        })
    }
}

impl VesselEntry {
    fn into_track(self, system: &SolarSystem) -> eyre::Result<VesselTrack> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut planned: Option<Trajectory> = None;
        for entry in self.nodes {
            let path = planned.as_ref().unwrap_or(&self.current);
            let patch = path
                .segment_at(entry.ut)
                .ok_or_eyre("maneuver node is outside the trajectory")?;
            let body = system
                .get(&patch.body)
                .ok_or_else(|| eyre!("unknown body {}", patch.body))?;
            let node = ManeuverNode::plan(body, patch.clone(), entry.ut, entry.deltav, 1e-8)
                .ok_or_eyre("maneuver node does not give an orbit")?;
            planned = Some(node.planned_trajectory(path)?);
            nodes.push(node);
        }
        Ok(VesselTrack {
            name: self.name,
            situation: self.situation,
            loaded: self.loaded,
            current: self.current,
            planned,
            nodes,
        })
    }
}
