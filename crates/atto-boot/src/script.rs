//! The declarative boot script.
//!
//! A versioned JSON document describing the initial topology and the
//! one-time bootstrap grants. The `policy` section does not configure
//! anything - the engine implements exactly one semantics - but it makes the
//! document self-describing, and a script written against a different
//! semantics is rejected instead of silently misread.

use serde::{Deserialize, Serialize};

use atto_engine::{Direction, WireKind};

use crate::BootError;

/// The one script version this loader understands.
pub const SCRIPT_VERSION: u32 = 1;

/// Top-level boot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootScript {
    pub version: u32,
    pub bootstrap: BootstrapSection,
    pub policy: PolicySection,
}

/// Initial topology and gain grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSection {
    /// The genesis pool: the gadget representing the operator, holding the
    /// initially minted gain.
    pub user_control: UserControl,
    #[serde(default)]
    pub initial_gadgets: Vec<GadgetEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserControl {
    pub gain: u64,
}

/// One initial gadget. `behavior` names a catalog entry; without it the
/// gadget is an inert container and `contacts` declares its slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GadgetEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
    /// Bootstrap grant into this gadget's pool.
    #[serde(default)]
    pub gain: u64,
    #[serde(default)]
    pub contacts: Vec<ContactEntry>,
    /// Wires whose endpoints are `"gadget.contact"` paths. Targets may name
    /// gadgets declared later in the script.
    #[serde(default)]
    pub wires: Vec<WireEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEntry {
    pub from: String,
    pub to: String,
    #[serde(default = "WireEntry::default_kind")]
    pub kind: WireKind,
}

impl WireEntry {
    fn default_kind() -> WireKind {
        WireKind::Directed
    }
}

/// Declared semantics. Checked, not interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySection {
    pub gain_conservation: String,
    pub propagation_semantics: String,
}

impl BootScript {
    /// Parse a script from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, BootError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reject scripts this loader cannot honor.
    pub fn validate(&self) -> Result<(), BootError> {
        if self.version != SCRIPT_VERSION {
            return Err(BootError::UnsupportedVersion(self.version));
        }
        if self.policy.gain_conservation != "strict" {
            return Err(BootError::UnsupportedPolicy {
                field: "gain_conservation",
                value: self.policy.gain_conservation.clone(),
            });
        }
        if self.policy.propagation_semantics != "argmax-strict" {
            return Err(BootError::UnsupportedPolicy {
                field: "propagation_semantics",
                value: self.policy.propagation_semantics.clone(),
            });
        }
        Ok(())
    }
}
