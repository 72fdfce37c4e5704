//! Dynamic topology: declarative gadget specs, templates and instances.
//!
//! Structure is created eagerly, behavior is bound late: a spawned
//! instance's contacts and wires exist immediately, while its compute
//! behavior arrives afterwards as an ordinary `Value::Behavior` signal
//! through the contact named by the spec's `behavior` binding. New structure
//! starts weak - the caller supplies a low initial strength and gain - so it
//! cannot out-argmax established paths until it earns trust.
//!
//! Validation is all-or-nothing per instantiation: a spec is checked in
//! full *before* any arena mutation, so a malformed spec aborts that one
//! instance and never leaves partial topology wired into the live graph.

use std::collections::BTreeMap;

use atto_signal::{InstanceInfo, TemplateId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contact::Direction;
use crate::gadget::GadgetId;
use crate::wire::WireKind;

/// A declared contact on a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

/// A declared wire. Endpoints are contact paths: `"name"` for a contact on
/// the spec itself, `"child.name"` for one on a direct child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSpec {
    pub from: String,
    pub to: String,
    #[serde(default = "WireSpec::default_kind")]
    pub kind: WireKind,
}

impl WireSpec {
    fn default_kind() -> WireKind {
        WireKind::Directed
    }
}

/// Declarative description of a gadget: contacts, wires, children and the
/// bindings that name special-purpose contacts (`behavior` for late
/// behavior binding, `data` for iterator seeding).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DynamicGadgetSpec {
    #[serde(default)]
    pub contacts: Vec<ContactSpec>,
    #[serde(default)]
    pub wires: Vec<WireSpec>,
    #[serde(default)]
    pub children: BTreeMap<String, DynamicGadgetSpec>,
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
}

/// Malformed spec, detected before materialization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("duplicate contact '{0}'")]
    DuplicateContact(String),
    #[error("wire endpoint '{0}' does not resolve to a contact")]
    UnresolvedEndpoint(String),
    #[error("binding '{name}' points at missing contact '{path}'")]
    UnresolvedBinding { name: String, path: String },
    #[error("in child '{child}': {source}")]
    InChild {
        child: String,
        #[source]
        source: Box<SpecError>,
    },
}

impl DynamicGadgetSpec {
    /// Check the whole spec tree. Nothing is created if this fails.
    pub fn validate(&self) -> Result<(), SpecError> {
        let mut seen = std::collections::BTreeSet::new();
        for c in &self.contacts {
            if !seen.insert(c.name.as_str()) {
                return Err(SpecError::DuplicateContact(c.name.clone()));
            }
        }

        for (name, child) in &self.children {
            child.validate().map_err(|e| SpecError::InChild {
                child: name.clone(),
                source: Box::new(e),
            })?;
        }

        for w in &self.wires {
            for endpoint in [&w.from, &w.to] {
                if !self.resolves(endpoint) {
                    return Err(SpecError::UnresolvedEndpoint(endpoint.clone()));
                }
            }
        }

        for (name, path) in &self.bindings {
            if !self.resolves(path) {
                return Err(SpecError::UnresolvedBinding {
                    name: name.clone(),
                    path: path.clone(),
                });
            }
        }

        Ok(())
    }

    /// Whether a dotted contact path resolves against this spec.
    fn resolves(&self, path: &str) -> bool {
        match path.split_once('.') {
            None => self.contacts.iter().any(|c| c.name == path),
            Some((child, rest)) => self
                .children
                .get(child)
                .map(|spec| spec.resolves(rest))
                .unwrap_or(false),
        }
    }

    /// The contact path bound under `name`, if declared.
    pub fn binding(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }
}

/// A registered, named spec ready for instantiation.
#[derive(Debug, Clone)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub spec: DynamicGadgetSpec,
    /// Generation counter: how many instances this template has produced.
    pub generation: u64,
}

/// A live (or retired) instantiation, owned by the dynamic topology
/// manager. `gadget` is an arena index guarded by the gadget's own `alive`
/// flag - never a pointer - so a superseded generation can be retired
/// without dangling references.
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    pub info: InstanceInfo,
    pub template: TemplateId,
    pub gadget: GadgetId,
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str) -> ContactSpec {
        ContactSpec {
            name: name.to_string(),
            direction: None,
        }
    }

    fn wire(from: &str, to: &str) -> WireSpec {
        WireSpec {
            from: from.to_string(),
            to: to.to_string(),
            kind: WireKind::Directed,
        }
    }

    #[test]
    fn valid_spec_passes() {
        let mut children = BTreeMap::new();
        children.insert(
            "inner".to_string(),
            DynamicGadgetSpec {
                contacts: vec![contact("in"), contact("out")],
                ..Default::default()
            },
        );
        let spec = DynamicGadgetSpec {
            contacts: vec![contact("a"), contact("b")],
            wires: vec![wire("a", "inner.in"), wire("inner.out", "b")],
            children,
            bindings: BTreeMap::from([("behavior".to_string(), "a".to_string())]),
        };
        spec.validate().unwrap();
    }

    #[test]
    fn duplicate_contact_rejected() {
        let spec = DynamicGadgetSpec {
            contacts: vec![contact("a"), contact("a")],
            ..Default::default()
        };
        assert_eq!(
            spec.validate(),
            Err(SpecError::DuplicateContact("a".into()))
        );
    }

    #[test]
    fn unresolved_wire_endpoint_rejected() {
        let spec = DynamicGadgetSpec {
            contacts: vec![contact("a")],
            wires: vec![wire("a", "ghost")],
            ..Default::default()
        };
        assert_eq!(
            spec.validate(),
            Err(SpecError::UnresolvedEndpoint("ghost".into()))
        );
    }

    #[test]
    fn unresolved_binding_rejected() {
        let spec = DynamicGadgetSpec {
            contacts: vec![contact("a")],
            bindings: BTreeMap::from([("data".to_string(), "seed".to_string())]),
            ..Default::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(SpecError::UnresolvedBinding { .. })
        ));
    }

    #[test]
    fn child_errors_carry_the_child_name() {
        let mut children = BTreeMap::new();
        children.insert(
            "broken".to_string(),
            DynamicGadgetSpec {
                contacts: vec![contact("x"), contact("x")],
                ..Default::default()
            },
        );
        let spec = DynamicGadgetSpec {
            children,
            ..Default::default()
        };
        match spec.validate() {
            Err(SpecError::InChild { child, .. }) => assert_eq!(child, "broken"),
            other => panic!("expected InChild, got {other:?}"),
        }
    }

    #[test]
    fn specs_roundtrip_through_json() {
        let spec = DynamicGadgetSpec {
            contacts: vec![ContactSpec {
                name: "out".to_string(),
                direction: Some(Direction::Output),
            }],
            ..Default::default()
        };
        let json = serde_json::to_string(&spec).unwrap();
        let back: DynamicGadgetSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
