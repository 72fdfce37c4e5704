//! Wires: directed or bidirectional edges between contacts.
//!
//! A bidirectional wire is one id applying the delivery rule independently
//! in both directions, so convergence does not depend on which side fires
//! first.

use serde::{Deserialize, Serialize};

use crate::contact::ContactId;

/// Arena index of a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireKind {
    Directed,
    Bidirectional,
}

/// An edge between two contacts.
#[derive(Debug, Clone)]
pub struct Wire {
    pub id: WireId,
    pub from: ContactId,
    pub to: ContactId,
    pub kind: WireKind,
    /// Cleared by `unwire`; dead wires stay in the arena so ids never
    /// dangle.
    pub alive: bool,
}

impl Wire {
    pub fn new(id: WireId, from: ContactId, to: ContactId, kind: WireKind) -> Self {
        Wire {
            id,
            from,
            to,
            kind,
            alive: true,
        }
    }

    /// The peer this wire re-delivers to when `source` changed, if any.
    pub fn delivers_to(&self, source: ContactId) -> Option<ContactId> {
        if !self.alive {
            return None;
        }
        if self.from == source {
            Some(self.to)
        } else if self.to == source && self.kind == WireKind::Bidirectional {
            Some(self.from)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directed_delivers_one_way() {
        let w = Wire::new(WireId(0), ContactId(1), ContactId(2), WireKind::Directed);
        assert_eq!(w.delivers_to(ContactId(1)), Some(ContactId(2)));
        assert_eq!(w.delivers_to(ContactId(2)), None);
    }

    #[test]
    fn bidirectional_delivers_both_ways() {
        let w = Wire::new(WireId(0), ContactId(1), ContactId(2), WireKind::Bidirectional);
        assert_eq!(w.delivers_to(ContactId(1)), Some(ContactId(2)));
        assert_eq!(w.delivers_to(ContactId(2)), Some(ContactId(1)));
    }

    #[test]
    fn dead_wire_delivers_nothing() {
        let mut w = Wire::new(WireId(0), ContactId(1), ContactId(2), WireKind::Bidirectional);
        w.alive = false;
        assert_eq!(w.delivers_to(ContactId(1)), None);
        assert_eq!(w.delivers_to(ContactId(2)), None);
    }
}
