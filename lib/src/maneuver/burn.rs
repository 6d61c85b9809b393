//! External burn time estimates.
//!
//! The engine does not model engines or fuel; when a burn time add-on
//! is installed, its per-vessel data module is read instead.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::vessel::VesselId;

/// Name of the data module published by Better Burn Time.
pub const BETTER_BURN_TIME: &str = "BetterBurnTimeData";

#[derive(Clone, Debug, PartialEq)]
pub struct BurnReport {
    pub burn_type: String,
    /// Burn duration (`s`).
    pub length: f64,
    /// Seconds from now until the burn's reference time.
    pub time_until: f64,
}

pub trait BurnEstimator {
    /// The estimator's current report for `vessel`, if it has one.
    fn report(&self, vessel: VesselId) -> Option<BurnReport>;
}

/// Used when no estimator is installed.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoEstimator;

impl BurnEstimator for NoEstimator {
    fn report(&self, _vessel: VesselId) -> Option<BurnReport> {
        None
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

/// Named-field access to a data module.
pub trait FieldLookup {
    fn field(&self, name: &str) -> Option<FieldValue>;
}

/// Access to the data modules attached to each vessel.
pub trait VesselModules {
    /// The current fields of the module `name` on `vessel`.
    fn module(&self, vessel: VesselId, name: &str) -> Option<ModuleFields>;

    /// Whether any vessel carries a module called `name`.
    fn has_module(&self, name: &str) -> bool;
}

pub type ModuleFields = HashMap<String, FieldValue>;

/// Modules per vessel, keyed by module name.
pub type ModuleTable = HashMap<VesselId, HashMap<String, ModuleFields>>;

impl FieldLookup for ModuleFields {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.get(name).cloned()
    }
}

impl VesselModules for ModuleTable {
    fn module(&self, vessel: VesselId, name: &str) -> Option<ModuleFields> {
        self.get(&vessel)?.get(name).cloned()
    }

    fn has_module(&self, name: &str) -> bool {
        self.values().any(|modules| modules.contains_key(name))
    }
}

/// Modules the host keeps publishing while the flight runs.
impl<M: VesselModules> VesselModules for Arc<RwLock<M>> {
    fn module(&self, vessel: VesselId, name: &str) -> Option<ModuleFields> {
        self.read().module(vessel, name)
    }

    fn has_module(&self, name: &str) -> bool {
        self.read().has_module(name)
    }
}

/// Reads the `BetterBurnTimeData` module.
#[derive(Clone, Debug)]
pub struct BetterBurnTime<M> {
    modules: M,
}

impl<M: VesselModules> BetterBurnTime<M> {
    pub fn new(modules: M) -> Self {
        Self { modules }
    }
}

fn text(module: &dyn FieldLookup, name: &str) -> Option<String> {
    match module.field(name)? {
        FieldValue::Text(text) => Some(text),
        other => {
            warn!(name, ?other, "expected a text field");
            None
        }
    }
}

fn number(module: &dyn FieldLookup, name: &str) -> Option<f64> {
    match module.field(name)? {
        FieldValue::Number(x) => Some(x),
        other => {
            warn!(name, ?other, "expected a numeric field");
            None
        }
    }
}

impl<M: VesselModules> BurnEstimator for BetterBurnTime<M> {
    fn report(&self, vessel: VesselId) -> Option<BurnReport> {
        let module = self.modules.module(vessel, BETTER_BURN_TIME)?;
        Some(BurnReport {
            burn_type: text(&module, "burnType")?,
            length: number(&module, "burnTime")?,
            time_until: number(&module, "timeUntil")?,
        })
    }
}

/// Pick the estimator once, when flight begins.
pub fn detect<M: VesselModules + 'static>(modules: M) -> Box<dyn BurnEstimator> {
    if modules.has_module(BETTER_BURN_TIME) {
        info!("using Better Burn Time estimates");
        Box::new(BetterBurnTime::new(modules))
    } else {
        info!("no burn time estimator found");
        Box::new(NoEstimator)
    }
}
