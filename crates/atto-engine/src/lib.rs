//! Atto Engine - Strength-Based Signal Propagation
//!
//! The core of the atto network: contacts that hold signals, wires that
//! carry them, and gadgets that compute over them. Propagation is governed
//! by one rule - a contact accepts a signal only if it is strictly stronger
//! than the one it holds - which buys three properties at once:
//!
//! - **Termination**: strength is drawn from a bounded integer range, so a
//!   contact can change at most `MAX_STRENGTH` times and every wave reaches
//!   a fixed point.
//! - **Idempotence**: redelivering a signal the contact already holds is a
//!   no-op, so cycles and duplicate wiring are harmless.
//! - **Contradiction detection**: two equal-strength signals with differing
//!   values are a genuine conflict, recorded in place instead of silently
//!   overwritten.
//!
//! Alongside propagation, the engine maintains a conserved resource
//! ("gain") with an append-only ledger, and a dynamic topology layer that
//! instantiates declarative gadget specs at quiescent points between waves.
//!
//! # Example
//!
//! ```
//! use atto_engine::{Network, Signal, Strength};
//!
//! let mut net = Network::new();
//! let adder = net.add_catalog_gadget("adder", "adder").unwrap();
//! let a = net.contact_id(adder, "a").unwrap();
//! let b = net.contact_id(adder, "b").unwrap();
//! let sum = net.contact_id(adder, "sum").unwrap();
//!
//! net.propagate(a, Signal::new(2i64, Strength::new(5_000))).unwrap();
//! net.propagate(b, Signal::new(40i64, Strength::new(5_000))).unwrap();
//! assert_eq!(net.signal(sum).unwrap().value.as_int(), Some(42));
//! ```

pub mod catalog;
pub mod contact;
pub mod dynamic;
pub mod error;
pub mod events;
pub mod gadget;
pub mod gain;
pub mod network;
pub mod wire;

pub use atto_signal::{
    InstanceId, InstanceInfo, Signal, Strength, TemplateId, Value, MAX_STRENGTH, STRENGTH_UNIT,
};

pub use catalog::BehaviorCatalog;
pub use contact::{Contact, ContactId, Direction, Outcome};
pub use dynamic::{ContactSpec, DynamicGadgetSpec, InstanceRecord, SpecError, Template, WireSpec};
pub use error::{Error, Result};
pub use events::NetworkEvent;
pub use gadget::{Behavior, BehaviorError, BehaviorInputs, Gadget, GadgetId, GadgetKind};
pub use gain::{ConservationViolation, GainLedger, GainReceipt, LedgerError, ReceiptReason};
pub use network::Network;
pub use wire::{Wire, WireId, WireKind};
