//! Contacts and the strict-argmax delivery rule.
//!
//! A contact is a named slot holding the most recent accepted [`Signal`],
//! owned by exactly one gadget. Every incoming delivery is arbitrated by
//! [`Contact::consider`]:
//!
//! - strictly greater strength → accept and re-arm propagation;
//! - equal strength, equal value → drop (idempotent reconvergence);
//! - equal strength, differing value → record a contradiction at the same
//!   strength; the one exemption is the never-accepted `(Nothing, 0)` start
//!   state, which holds no information to contradict and accepts instead;
//! - lower strength → drop without mutation.
//!
//! Across a contact's lifetime strength never decreases, and the value only
//! changes together with the strength - the single exception is the
//! equal-strength contradiction transition. Because strength is drawn from a
//! bounded range, a contact can change at most `MAX_STRENGTH` times; that
//! bound is what makes whole-network propagation halt on arbitrary, cyclic
//! wiring.

use std::cmp::Ordering;

use atto_signal::{Signal, Strength, Value};
use serde::{Deserialize, Serialize};

use crate::gadget::GadgetId;

/// Arena index of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub u32);

/// Boundary role of a contact on its gadget's interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

/// Result of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Accepted at strictly greater strength; propagation re-arms.
    Changed,
    /// Equal-strength conflict recorded; peers are notified one hop.
    Contradiction,
    /// Stale or duplicate delivery; no mutation, no propagation.
    Dropped,
}

/// A named signal slot owned by one gadget.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: ContactId,
    pub owner: GadgetId,
    pub name: String,
    pub direction: Option<Direction>,
    pub signal: Signal,
    /// Network step at which the current signal was accepted. Used by the
    /// gadget firing rule to decide input freshness.
    pub stamp: u64,
}

impl Contact {
    pub fn new(id: ContactId, owner: GadgetId, name: impl Into<String>, direction: Option<Direction>) -> Self {
        Contact {
            id,
            owner,
            name: name.into(),
            direction,
            signal: Signal::nothing(),
            stamp: 0,
        }
    }

    /// Apply the delivery rule. Mutates the held signal on acceptance and
    /// stamps it with `step`.
    pub fn consider(&mut self, incoming: &Signal, step: u64) -> Outcome {
        match incoming.strength.cmp(&self.signal.strength) {
            Ordering::Greater => {
                self.signal = incoming.clone();
                self.stamp = step;
                Outcome::Changed
            }
            Ordering::Equal => {
                if incoming.value == self.signal.value {
                    return Outcome::Dropped;
                }
                // Only the untouched (Nothing, 0) start state holds no
                // information to contradict; there an equal-strength first
                // delivery is a plain acceptance. A Nothing accepted at
                // positive strength is held information like any other value.
                if self.signal.value.is_nothing() && self.signal.strength == Strength::ZERO {
                    self.signal = incoming.clone();
                    self.stamp = step;
                    return Outcome::Changed;
                }
                // Contradiction is terminal at its strength: once recorded,
                // further equal-strength conflicts are dropped. Strictly
                // stronger deliveries are still accepted above.
                if self.signal.value.is_contradiction() {
                    return Outcome::Dropped;
                }
                let held = std::mem::replace(&mut self.signal.value, Value::Nothing);
                self.signal.value = Value::contradiction(held, incoming.value.clone());
                self.stamp = step;
                Outcome::Contradiction
            }
            Ordering::Less => Outcome::Dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atto_signal::Strength;

    fn contact() -> Contact {
        Contact::new(ContactId(0), GadgetId(0), "c", None)
    }

    #[test]
    fn stronger_signal_accepted() {
        let mut c = contact();
        let out = c.consider(&Signal::new(42i64, Strength::new(5_000)), 1);
        assert_eq!(out, Outcome::Changed);
        assert_eq!(c.signal.value, Value::Int(42));
        assert_eq!(c.stamp, 1);
    }

    #[test]
    fn duplicate_delivery_dropped() {
        let mut c = contact();
        let sig = Signal::new(42i64, Strength::new(5_000));
        assert_eq!(c.consider(&sig, 1), Outcome::Changed);
        assert_eq!(c.consider(&sig, 2), Outcome::Dropped);
        // No re-stamp on drop.
        assert_eq!(c.stamp, 1);
    }

    #[test]
    fn weaker_delivery_dropped_without_mutation() {
        let mut c = contact();
        c.consider(&Signal::new(42i64, Strength::new(5_000)), 1);
        let out = c.consider(&Signal::new(7i64, Strength::new(100)), 2);
        assert_eq!(out, Outcome::Dropped);
        assert_eq!(c.signal.value, Value::Int(42));
    }

    #[test]
    fn equal_strength_conflict_records_contradiction() {
        let mut c = contact();
        c.consider(&Signal::new(42i64, Strength::new(5_000)), 1);
        let out = c.consider(&Signal::new(99i64, Strength::new(5_000)), 2);
        assert_eq!(out, Outcome::Contradiction);
        assert_eq!(c.signal.strength, Strength::new(5_000));
        assert_eq!(
            c.signal.value,
            Value::contradiction(Value::Int(42), Value::Int(99))
        );
    }

    #[test]
    fn contradiction_is_terminal_at_its_strength() {
        let mut c = contact();
        c.consider(&Signal::new(42i64, Strength::new(5_000)), 1);
        c.consider(&Signal::new(99i64, Strength::new(5_000)), 2);
        // A third conflicting value at the same strength is dropped.
        let out = c.consider(&Signal::new(7i64, Strength::new(5_000)), 3);
        assert_eq!(out, Outcome::Dropped);
        // But a strictly stronger signal is still accepted.
        let out = c.consider(&Signal::new(7i64, Strength::new(6_000)), 4);
        assert_eq!(out, Outcome::Changed);
        assert_eq!(c.signal.value, Value::Int(7));
    }

    #[test]
    fn first_delivery_at_zero_strength_is_accepted() {
        let mut c = contact();
        let out = c.consider(&Signal::new(1i64, Strength::ZERO), 1);
        assert_eq!(out, Outcome::Changed);
        assert_eq!(c.signal.value, Value::Int(1));
    }

    #[test]
    fn nothing_held_at_positive_strength_contradicts() {
        let mut c = contact();
        // An explicit Nothing injection is an acceptance like any other.
        let out = c.consider(&Signal::new(Value::Nothing, Strength::new(5_000)), 1);
        assert_eq!(out, Outcome::Changed);
        let out = c.consider(&Signal::new(7i64, Strength::new(5_000)), 2);
        assert_eq!(out, Outcome::Contradiction);
        assert_eq!(
            c.signal.value,
            Value::contradiction(Value::Nothing, Value::Int(7))
        );
    }

    #[test]
    fn strength_is_monotone_across_any_sequence() {
        let mut c = contact();
        let deliveries = [5_000u32, 100, 5_000, 7_000, 7_000, 3_000, 9_000];
        let mut last = Strength::ZERO;
        for (i, raw) in deliveries.iter().enumerate() {
            c.consider(&Signal::new(i as i64, Strength::new(*raw)), i as u64);
            assert!(c.signal.strength >= last);
            last = c.signal.strength;
        }
    }
}
