//! The value/strength pair flowing through the network.

use crate::{Strength, Value};

/// An immutable value/strength pair.
///
/// Signals are never mutated in place; a contact replaces its whole signal
/// when it accepts a delivery.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signal {
    pub value: Value,
    pub strength: Strength,
}

impl Signal {
    pub fn new(value: impl Into<Value>, strength: Strength) -> Self {
        Signal {
            value: value.into(),
            strength,
        }
    }

    /// The `(Nothing, 0)` start state of every contact.
    pub fn nothing() -> Self {
        Signal {
            value: Value::Nothing,
            strength: Strength::ZERO,
        }
    }

    /// Weakest strength among a set of input signals.
    ///
    /// The default strength policy for a pure gadget output: a derived value
    /// is no more trustworthy than its least trusted input. Empty input sets
    /// yield zero.
    pub fn min_strength(signals: &[&Signal]) -> Strength {
        signals
            .iter()
            .map(|s| s.strength)
            .reduce(Strength::min_of)
            .unwrap_or(Strength::ZERO)
    }
}

impl Default for Signal {
    fn default() -> Self {
        Signal::nothing()
    }
}
