//! Definitions of celestial bodies.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::kepler::orbits::OrbitSegment;

/// Identity of a celestial body: its name as the host reports it.
pub type BodyId = Arc<str>;

/// A celestial body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Name of this body as displayed in KSP
    pub name: BodyId,
    /// Standard gravitational parameter (`m^3/s^2`)
    pub mu: f64,
    /// Mean radius of the body's sphere (`m`)
    pub radius: f64,
    /// Radius of this body's sphere of influence (`m`)
    pub soi: f64,
    /// The body's own orbit around its parent, if any. Stars have none.
    pub ephem: Option<OrbitSegment>,
    /// The name of the parent body of this body, if any.
    pub parent: Option<BodyId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SolarSystem {
    pub bodies: HashMap<BodyId, Arc<Body>>,
}

impl SolarSystem {
    pub fn get(&self, name: &str) -> Option<&Arc<Body>> {
        self.bodies.get(name)
    }

    pub fn insert(&mut self, body: Body) {
        self.bodies.insert(body.name.clone(), Arc::new(body));
    }
}
