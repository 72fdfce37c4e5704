//! Network events for audit and visualization consumers.
//!
//! The engine records what happened - acceptances, contradictions, gain
//! movement, topology growth - as a serializable event stream. External
//! collaborators (monitoring, editors) drain it through
//! [`crate::Network::drain_events`]; the engine itself never interprets it.

use atto_signal::{InstanceId, Strength, TemplateId};
use serde::{Deserialize, Serialize};

use crate::contact::ContactId;
use crate::gadget::GadgetId;
use crate::wire::WireId;

/// Something observable that happened inside the network.
///
/// `step` is the network's logical clock at the time of the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetworkEvent {
    /// A contact accepted a strictly stronger signal.
    SignalAccepted {
        contact: ContactId,
        strength: Strength,
        step: u64,
    },

    /// An equal-strength conflict was recorded as a contradiction.
    ContradictionDetected {
        contact: ContactId,
        strength: Strength,
        step: u64,
    },

    /// A gadget behavior fired and emitted outputs.
    GadgetFired { gadget: GadgetId, step: u64 },

    /// A behavior invocation failed; no signal was emitted.
    BehaviorFault {
        gadget: GadgetId,
        error: String,
        step: u64,
    },

    /// A late-bound behavior was resolved and installed.
    BehaviorBound {
        gadget: GadgetId,
        behavior: String,
        step: u64,
    },

    /// A wire was added to the topology.
    WireAdded {
        wire: WireId,
        from: ContactId,
        to: ContactId,
        step: u64,
    },

    /// A wire was removed.
    WireRemoved { wire: WireId, step: u64 },

    /// Gain entered the system (bootstrap or authorized mint).
    GainMinted {
        gadget: GadgetId,
        amount: u64,
        step: u64,
    },

    /// Gain moved between pools, zero-sum.
    GainTransferred {
        from: GadgetId,
        to: GadgetId,
        amount: u64,
        step: u64,
    },

    /// Gain was spent on amplification and left circulation.
    GainConsumed {
        gadget: GadgetId,
        amount: u64,
        step: u64,
    },

    /// A template instantiation committed.
    InstanceSpawned {
        instance: InstanceId,
        template: TemplateId,
        generation: u64,
        step: u64,
    },

    /// An instantiation was aborted; the live graph is untouched.
    SpawnFailed {
        template: TemplateId,
        error: String,
        step: u64,
    },

    /// An instance was retired by the dynamic topology manager.
    InstanceRetired { instance: InstanceId, step: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = NetworkEvent::SignalAccepted {
            contact: ContactId(3),
            strength: Strength::new(5_000),
            step: 7,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"SignalAccepted\""));
        assert!(json.contains("\"contact\":3"));

        let back: NetworkEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn gain_events_carry_amounts() {
        let event = NetworkEvent::GainTransferred {
            from: GadgetId(1),
            to: GadgetId(2),
            amount: 300,
            step: 12,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"amount\":300"));
    }
}
