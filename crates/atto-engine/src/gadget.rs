//! Gadgets: named bundles of contacts with an optional behavior and a
//! private gain pool.
//!
//! A behavior is a polymorphic function object over a fixed input/output
//! contract, not an untyped callback: it declares the input contacts it
//! requires and the outputs it produces, and its invocation is a pure
//! function from input values to output values. The resource- and
//! topology-touching gadgets (transistor, minter, spawner, evolver,
//! iterator) are engine-handled kinds because they need sanctioned access to
//! gain pools or the arena; everything else goes through [`Behavior`].

use std::collections::BTreeMap;
use std::rc::Rc;

use atto_signal::{Signal, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contact::ContactId;

/// Arena index of a gadget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GadgetId(pub u32);

/// Invocation failure of a gadget behavior.
///
/// These are reported values, never faults: a failed invocation emits no
/// signal and leaves the wave intact.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BehaviorError {
    #[error("required input '{0}' holds no value")]
    MissingInput(String),
    #[error("input '{input}' expected {expected}, got {got}")]
    TypeMismatch {
        input: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("input '{0}' holds a contradiction")]
    ContradictoryInput(String),
    #[error("no contact for output '{0}'")]
    MissingOutput(String),
    #[error("no behavior named '{0}' in the catalog")]
    UnknownBehavior(String),
    #[error("input '{input}' is negative: {value}")]
    NegativeAmount { input: String, value: i64 },
}

/// Input signals gathered for one invocation, keyed by contact name.
#[derive(Debug, Clone, Default)]
pub struct BehaviorInputs {
    map: BTreeMap<String, Signal>,
}

impl BehaviorInputs {
    pub fn new(map: BTreeMap<String, Signal>) -> Self {
        BehaviorInputs { map }
    }

    pub fn get(&self, name: &str) -> Result<&Signal, BehaviorError> {
        match self.map.get(name) {
            Some(sig) if !sig.value.is_nothing() => Ok(sig),
            _ => Err(BehaviorError::MissingInput(name.to_string())),
        }
    }

    /// Signal if the contact exists and holds a value; `None` otherwise.
    /// For optional inputs.
    pub fn get_opt(&self, name: &str) -> Option<&Signal> {
        self.map.get(name).filter(|s| !s.value.is_nothing())
    }

    pub fn int(&self, name: &str) -> Result<i64, BehaviorError> {
        let sig = self.get(name)?;
        sig.value.as_int().ok_or_else(|| self.mismatch(name, "int", sig))
    }

    pub fn bool(&self, name: &str) -> Result<bool, BehaviorError> {
        let sig = self.get(name)?;
        sig.value.as_bool().ok_or_else(|| self.mismatch(name, "bool", sig))
    }

    pub fn str(&self, name: &str) -> Result<&str, BehaviorError> {
        let sig = self.get(name)?;
        sig.value.as_str().ok_or_else(|| self.mismatch(name, "str", sig))
    }

    /// A non-negative integer amount (gain units, strength ticks).
    pub fn amount(&self, name: &str) -> Result<u64, BehaviorError> {
        let n = self.int(name)?;
        if n < 0 {
            return Err(BehaviorError::NegativeAmount {
                input: name.to_string(),
                value: n,
            });
        }
        Ok(n as u64)
    }

    /// All gathered signals, for the min-of-inputs strength policy.
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.map.values()
    }

    fn mismatch(&self, name: &str, expected: &'static str, sig: &Signal) -> BehaviorError {
        if sig.value.is_contradiction() {
            BehaviorError::ContradictoryInput(name.to_string())
        } else {
            BehaviorError::TypeMismatch {
                input: name.to_string(),
                expected,
                got: sig.value.type_name(),
            }
        }
    }
}

/// A pure compute behavior: values in, values out, no graph effects.
pub trait Behavior {
    /// Catalog name, lower-case.
    fn name(&self) -> &'static str;

    /// Input contact names that must all hold fresh values before firing.
    fn inputs(&self) -> &'static [&'static str];

    /// Output contact names this behavior produces.
    fn outputs(&self) -> &'static [&'static str];

    /// Compute outputs from inputs. Output strength is decided by the
    /// engine (min of inputs); behaviors return values only.
    fn invoke(&self, inputs: &BehaviorInputs) -> Result<Vec<(String, Value)>, BehaviorError>;
}

/// What a gadget does when its inputs are fresh.
#[derive(Clone)]
pub enum GadgetKind {
    /// Plain container: holds contacts and gain, never fires.
    Inert,
    /// A catalog behavior; fires when all declared inputs are newer than the
    /// last invocation.
    Pure(Rc<dyn Behavior>),
    /// Amplifier: spends its own gain to raise a relayed signal's strength.
    Transistor,
    /// Authorized gain minting.
    GainMinter,
    /// Instantiates a template at the next quiescent point.
    Spawner,
    /// Gradual gain migration between two instances.
    Evolver,
    /// Mass production: `count` instantiations seeded from a data list.
    Iterator,
}

impl GadgetKind {
    /// Input contacts consulted by the firing rule.
    pub fn required_inputs(&self) -> &[&'static str] {
        match self {
            GadgetKind::Inert => &[],
            GadgetKind::Pure(b) => b.inputs(),
            GadgetKind::Transistor => &["input", "control"],
            GadgetKind::GainMinter => &["amount", "validator"],
            GadgetKind::Spawner => &["template", "initial_strength", "initial_gain", "trigger"],
            GadgetKind::Evolver => &["old", "new", "rate", "threshold"],
            GadgetKind::Iterator => &["template", "count", "data", "trigger"],
        }
    }

    /// Inputs consulted when present but not required for firing.
    pub fn optional_inputs(&self) -> &[&'static str] {
        match self {
            GadgetKind::GainMinter => &["target"],
            GadgetKind::Iterator => &["initial_strength", "initial_gain"],
            _ => &[],
        }
    }

    /// Output contacts produced on firing.
    pub fn output_names(&self) -> &[&'static str] {
        match self {
            GadgetKind::Inert => &[],
            GadgetKind::Pure(b) => b.outputs(),
            GadgetKind::Transistor => &["output"],
            GadgetKind::GainMinter => &["success"],
            GadgetKind::Spawner => &["spawned"],
            GadgetKind::Evolver => &["transferred", "old_gain", "new_gain", "complete"],
            GadgetKind::Iterator => &["spawned"],
        }
    }

    /// Pure behaviors fire only when every input is newer than the last
    /// invocation (the strict dataflow rule). The resource and topology
    /// kinds are edge-triggered: all inputs present, any one fresh.
    pub fn fires_on_any_fresh_input(&self) -> bool {
        !matches!(self, GadgetKind::Inert | GadgetKind::Pure(_))
    }
}

impl std::fmt::Debug for GadgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GadgetKind::Inert => f.write_str("Inert"),
            GadgetKind::Pure(b) => write!(f, "Pure({})", b.name()),
            GadgetKind::Transistor => f.write_str("Transistor"),
            GadgetKind::GainMinter => f.write_str("GainMinter"),
            GadgetKind::Spawner => f.write_str("Spawner"),
            GadgetKind::Evolver => f.write_str("Evolver"),
            GadgetKind::Iterator => f.write_str("Iterator"),
        }
    }
}

/// A named bundle of contacts, children, a kind and a gain pool.
#[derive(Debug)]
pub struct Gadget {
    pub id: GadgetId,
    pub name: String,
    pub kind: GadgetKind,
    /// Contact name → arena id. Boundary contacts carry a direction tag.
    pub contacts: BTreeMap<String, ContactId>,
    /// Child gadgets for hierarchical composition.
    pub children: BTreeMap<String, GadgetId>,
    /// Conserved resource pool. Mutated only through the ledger-recorded
    /// mint/transfer/consume operations.
    pub gain_pool: u64,
    /// Cleared when the dynamic topology manager retires this gadget.
    pub alive: bool,
    /// Network step of the last behavior invocation.
    pub last_fired: u64,
}

impl Gadget {
    pub fn new(id: GadgetId, name: impl Into<String>, kind: GadgetKind) -> Self {
        Gadget {
            id,
            name: name.into(),
            kind,
            contacts: BTreeMap::new(),
            children: BTreeMap::new(),
            gain_pool: 0,
            alive: true,
            last_fired: 0,
        }
    }

    pub fn contact(&self, name: &str) -> Option<ContactId> {
        self.contacts.get(name).copied()
    }
}
