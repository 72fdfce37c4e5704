//! Atto Signal Foundation
//!
//! The unit of information in an atto network is the [`Signal`]: an immutable
//! value/strength pair. Strength is a bounded integer, not a float - the
//! bound is what makes every contact's state space finite and the
//! propagation fixed point reachable in a provable number of steps.
//!
//! # Strength Arbitration
//!
//! Contacts accept a delivery only on strictly greater strength. Equal
//! strength with a differing value is recorded as a [`Value::Contradiction`]
//! rather than silently resolved - conflicts are data, not faults.

mod signal;
mod strength;
mod value;

pub use signal::Signal;
pub use strength::{Strength, StrengthParseError, MAX_STRENGTH, STRENGTH_UNIT};
pub use value::{InstanceId, InstanceInfo, TemplateId, Value};
