//! Atto Boot - Network Bootstrap
//!
//! Builds a live [`Network`] from a declarative, versioned boot script: the
//! initial gadgets and wiring, then the one-time bootstrap mint (one receipt
//! per granted pool), then a conservation audit before the network is handed
//! back. This is the only place bootstrap minting may occur; the engine's
//! ledger refuses a second bootstrap on the same network.

pub mod script;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use atto_engine::{ContactId, GadgetId, Network};

pub use script::{
    BootScript, BootstrapSection, ContactEntry, GadgetEntry, PolicySection, UserControl,
    WireEntry, SCRIPT_VERSION,
};

/// Name of the gadget holding the operator's genesis pool.
pub const USER_CONTROL: &str = "user_control";

/// Failure to turn a script into a network.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("malformed boot script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported script version {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported {field} policy '{value}'")]
    UnsupportedPolicy { field: &'static str, value: String },

    #[error("duplicate gadget name '{0}'")]
    DuplicateGadget(String),

    #[error("wire endpoint '{0}' does not name a gadget.contact pair")]
    MalformedEndpoint(String),

    #[error("wire endpoint '{0}' does not resolve")]
    UnknownEndpoint(String),

    #[error(transparent)]
    Engine(#[from] atto_engine::Error),
}

/// Build, wire, mint and audit a network from a validated script.
pub fn boot_network(script: &BootScript) -> Result<Network, BootError> {
    script.validate()?;

    let mut net = Network::new();
    let mut by_name: BTreeMap<&str, GadgetId> = BTreeMap::new();

    let user = net.add_gadget(USER_CONTROL);
    by_name.insert(USER_CONTROL, user);

    // First pass: gadgets and contacts, so wires may point forward.
    for entry in &script.bootstrap.initial_gadgets {
        if by_name.contains_key(entry.name.as_str()) {
            return Err(BootError::DuplicateGadget(entry.name.clone()));
        }
        let gid = match &entry.behavior {
            Some(behavior) => net.add_catalog_gadget(entry.name.clone(), behavior)?,
            None => net.add_gadget(entry.name.clone()),
        };
        for contact in &entry.contacts {
            // Catalog gadgets already carry their contract contacts.
            if net.contact_id(gid, &contact.name).is_err() {
                net.add_contact(gid, contact.name.clone(), contact.direction)?;
            }
        }
        info!(
            gadget = %entry.name,
            behavior = entry.behavior.as_deref().unwrap_or("inert"),
            "boot: gadget constructed"
        );
        by_name.insert(entry.name.as_str(), gid);
    }

    // Second pass: wires.
    for entry in &script.bootstrap.initial_gadgets {
        for wire in &entry.wires {
            let from = resolve_endpoint(&net, &by_name, &wire.from)?;
            let to = resolve_endpoint(&net, &by_name, &wire.to)?;
            net.wire(from, to, wire.kind)?;
        }
    }

    // The one-time mint: one receipt per *funded* pool. A zero grant gets no
    // receipt, but the mint still closes the bootstrap window.
    let mut grants = Vec::new();
    if script.bootstrap.user_control.gain > 0 {
        grants.push((user, script.bootstrap.user_control.gain));
    }
    for entry in &script.bootstrap.initial_gadgets {
        if entry.gain > 0 {
            grants.push((by_name[entry.name.as_str()], entry.gain));
        }
    }
    net.bootstrap_mint(&grants)?;
    for (gadget, amount) in &grants {
        info!(gadget = gadget.0, amount, "boot: pool granted");
    }

    net.audit()?;
    Ok(net)
}

fn resolve_endpoint(
    net: &Network,
    by_name: &BTreeMap<&str, GadgetId>,
    path: &str,
) -> Result<ContactId, BootError> {
    let (gadget, contact) = path
        .split_once('.')
        .ok_or_else(|| BootError::MalformedEndpoint(path.to_string()))?;
    let gid = by_name
        .get(gadget)
        .copied()
        .ok_or_else(|| BootError::UnknownEndpoint(path.to_string()))?;
    net.contact_id(gid, contact)
        .map_err(|_| BootError::UnknownEndpoint(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atto_engine::{ReceiptReason, Signal, Strength, Value};

    fn script(text: &str) -> BootScript {
        BootScript::from_json(text).unwrap()
    }

    const POLICY: &str = r#""policy": {
        "gain_conservation": "strict",
        "propagation_semantics": "argmax-strict"
    }"#;

    #[test]
    fn boot_mints_one_receipt_per_pool_and_audits() {
        let text = format!(
            r#"{{
                "version": 1,
                "bootstrap": {{
                    "user_control": {{ "gain": 100000 }},
                    "initial_gadgets": [
                        {{ "name": "amp", "behavior": "transistor", "gain": 10000 }},
                        {{ "name": "panel", "contacts": [ {{ "name": "out" }} ] }}
                    ]
                }},
                {POLICY}
            }}"#
        );
        let net = boot_network(&script(&text)).unwrap();

        let receipts = net.receipts();
        assert_eq!(receipts.len(), 2);
        assert!(receipts.iter().all(|r| r.reason == ReceiptReason::Bootstrap));
        assert_eq!(
            receipts.iter().map(|r| r.amount).sum::<u64>(),
            110_000
        );
        net.audit().unwrap();
    }

    #[test]
    fn zero_gain_pools_get_no_receipt() {
        let text = format!(
            r#"{{
                "version": 1,
                "bootstrap": {{
                    "user_control": {{ "gain": 0 }},
                    "initial_gadgets": [
                        {{ "name": "amp", "behavior": "transistor", "gain": 500 }}
                    ]
                }},
                {POLICY}
            }}"#
        );
        let net = boot_network(&script(&text)).unwrap();

        let receipts = net.receipts();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].amount, 500);
        net.audit().unwrap();
    }

    #[test]
    fn booted_topology_propagates() {
        let text = format!(
            r#"{{
                "version": 1,
                "bootstrap": {{
                    "user_control": {{ "gain": 0 }},
                    "initial_gadgets": [
                        {{ "name": "panel", "contacts": [ {{ "name": "out" }} ] }},
                        {{
                            "name": "sink",
                            "contacts": [ {{ "name": "in" }} ],
                            "wires": [ {{ "from": "panel.out", "to": "sink.in" }} ]
                        }}
                    ]
                }},
                {POLICY}
            }}"#
        );
        let mut net = boot_network(&script(&text)).unwrap();

        let panel = net.find_gadget("panel").unwrap();
        let sink = net.find_gadget("sink").unwrap();
        let out = net.contact_id(panel, "out").unwrap();
        let inn = net.contact_id(sink, "in").unwrap();

        net.propagate(out, Signal::new(9i64, Strength::new(4_000)))
            .unwrap();
        assert_eq!(net.signal(inn).unwrap().value, Value::Int(9));
    }

    #[test]
    fn second_bootstrap_on_booted_network_fails() {
        let text = format!(
            r#"{{
                "version": 1,
                "bootstrap": {{ "user_control": {{ "gain": 1000 }} }},
                {POLICY}
            }}"#
        );
        let mut net = boot_network(&script(&text)).unwrap();
        let user = net.find_gadget(USER_CONTROL).unwrap();
        assert!(net.bootstrap_mint(&[(user, 1)]).is_err());
    }

    #[test]
    fn duplicate_gadget_name_rejected() {
        let text = format!(
            r#"{{
                "version": 1,
                "bootstrap": {{
                    "user_control": {{ "gain": 0 }},
                    "initial_gadgets": [
                        {{ "name": "x" }},
                        {{ "name": "x" }}
                    ]
                }},
                {POLICY}
            }}"#
        );
        assert!(matches!(
            boot_network(&script(&text)),
            Err(BootError::DuplicateGadget(name)) if name == "x"
        ));
    }

    #[test]
    fn dangling_wire_endpoint_rejected() {
        let text = format!(
            r#"{{
                "version": 1,
                "bootstrap": {{
                    "user_control": {{ "gain": 0 }},
                    "initial_gadgets": [
                        {{
                            "name": "panel",
                            "contacts": [ {{ "name": "out" }} ],
                            "wires": [ {{ "from": "panel.out", "to": "ghost.in" }} ]
                        }}
                    ]
                }},
                {POLICY}
            }}"#
        );
        assert!(matches!(
            boot_network(&script(&text)),
            Err(BootError::UnknownEndpoint(_))
        ));
    }
}
