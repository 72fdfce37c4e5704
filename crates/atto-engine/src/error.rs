//! Error types for the engine.

use atto_signal::{InstanceId, TemplateId};
use thiserror::Error;

use crate::contact::ContactId;
use crate::dynamic::SpecError;
use crate::gadget::{BehaviorError, GadgetId};
use crate::gain::{ConservationViolation, LedgerError};
use crate::wire::WireId;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the network API.
///
/// Dropped deliveries, contradictions, failed validations and exhausted gain
/// are *not* errors - they are ordinary outcomes reported as values. What is
/// left here is misuse of the API (dangling ids) and the two conditions that
/// are programming defects by definition: a broken conservation law and a
/// propagation wave that exceeds its proven step bound.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no contact {0:?}")]
    UnknownContact(ContactId),

    #[error("no wire {0:?}")]
    UnknownWire(WireId),

    #[error("no gadget {0:?}")]
    UnknownGadget(GadgetId),

    #[error("gadget '{gadget}' has no contact named '{name}'")]
    UnknownContactName { gadget: String, name: String },

    #[error("no template {0:?}")]
    UnknownTemplate(TemplateId),

    #[error("no instance {0:?}")]
    UnknownInstance(InstanceId),

    #[error("instance {0:?} is retired")]
    DeadInstance(InstanceId),

    #[error(transparent)]
    Behavior(#[from] BehaviorError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Conservation(#[from] ConservationViolation),

    /// The wave ran past `|contacts| × strength-range × fan-out` steps,
    /// which the halting argument proves impossible. Indicates a defect in
    /// the propagation rule, not in the caller's graph.
    #[error("propagation exceeded its step budget of {budget} (defect)")]
    StepBudgetExhausted { budget: u64 },
}
