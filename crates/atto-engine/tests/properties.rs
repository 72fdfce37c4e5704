//! Property-based tests for the propagation and conservation invariants.
//!
//! These check the claims the engine's halting argument rests on against
//! randomized inputs: strength monotonicity, idempotent redelivery,
//! termination on arbitrary cyclic wiring, order-independence of the final
//! state, and the gain conservation law over random ledger traces.

use atto_engine::{
    GadgetId, GainLedger, Network, Outcome, Signal, Strength, WireKind, MAX_STRENGTH,
};
use proptest::prelude::*;

fn arb_strength() -> impl Strategy<Value = Strength> {
    (0..=MAX_STRENGTH.raw()).prop_map(Strength::new)
}

fn arb_signal() -> impl Strategy<Value = Signal> {
    (any::<i64>(), arb_strength()).prop_map(|(v, s)| Signal::new(v, s))
}

/// A wave of deliveries with pairwise distinct strengths, then shuffled.
fn arb_distinct_wave() -> impl Strategy<Value = Vec<(i64, Strength)>> {
    proptest::collection::vec(any::<i64>(), 1..16)
        .prop_map(|vals| {
            vals.into_iter()
                .enumerate()
                .map(|(i, v)| (v, Strength::new((i as u32 + 1) * 1_000)))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

/// One distinct-strength wave aimed at graph contacts, in two independent
/// orders.
fn arb_confluence_case(
) -> impl Strategy<Value = (Vec<(usize, i64, Strength)>, Vec<(usize, i64, Strength)>)> {
    proptest::collection::vec((0usize..6, any::<i64>()), 1..12)
        .prop_map(|targets| {
            targets
                .into_iter()
                .enumerate()
                .map(|(i, (t, v))| (t, v, Strength::new((i as u32 + 1) * 1_000)))
                .collect::<Vec<_>>()
        })
        .prop_flat_map(|wave| {
            let shuffled = Just(wave.clone()).prop_shuffle();
            (Just(wave), shuffled)
        })
}

proptest! {
    /// Held strength never decreases, whatever the delivery sequence.
    #[test]
    fn held_strength_is_monotone(signals in proptest::collection::vec(arb_signal(), 1..40)) {
        let mut net = Network::new();
        let g = net.add_gadget("g");
        let c = net.add_contact(g, "c", None).unwrap();

        let mut prev = Strength::ZERO;
        for sig in signals {
            net.propagate(c, sig).unwrap();
            let held = net.signal(c).unwrap().strength;
            prop_assert!(held >= prev);
            prev = held;
        }
    }

    /// Redelivering exactly what a contact holds is always a no-op.
    #[test]
    fn redelivery_is_dropped(sig in arb_signal()) {
        let mut net = Network::new();
        let g = net.add_gadget("g");
        let c = net.add_contact(g, "c", None).unwrap();

        prop_assert_eq!(net.propagate(c, sig.clone()).unwrap(), Outcome::Changed);
        let held = net.signal(c).unwrap().clone();
        prop_assert_eq!(net.propagate(c, sig).unwrap(), Outcome::Dropped);
        prop_assert_eq!(net.signal(c).unwrap(), &held);
    }

    /// With pairwise distinct strengths, delivery order is irrelevant: the
    /// strongest signal ends up held.
    #[test]
    fn strongest_signal_wins_regardless_of_order(wave in arb_distinct_wave()) {
        let mut net = Network::new();
        let g = net.add_gadget("g");
        let c = net.add_contact(g, "c", None).unwrap();

        let expected = wave
            .iter()
            .max_by_key(|(_, s)| *s)
            .cloned()
            .unwrap();
        for (v, s) in wave {
            net.propagate(c, Signal::new(v, s)).unwrap();
        }

        let held = net.signal(c).unwrap();
        prop_assert_eq!(held.strength, expected.1);
        prop_assert_eq!(held.value.as_int(), Some(expected.0));
    }

    /// Non-conflicting waves are confluent across a wired graph: the same
    /// distinct-strength signal set delivered in two different orders
    /// reaches the same fixed point at every contact.
    #[test]
    fn confluence_over_a_wired_graph((wave, shuffled) in arb_confluence_case()) {
        let run = |order: &[(usize, i64, Strength)]| {
            let mut net = Network::new();
            let g = net.add_gadget("g");
            let contacts: Vec<_> = (0..6)
                .map(|i| net.add_contact(g, format!("c{i}"), None).unwrap())
                .collect();
            // A chain with one bidirectional cross edge.
            for pair in contacts.windows(2) {
                net.wire(pair[0], pair[1], WireKind::Directed).unwrap();
            }
            net.wire(contacts[4], contacts[1], WireKind::Bidirectional)
                .unwrap();

            for (t, v, s) in order {
                net.propagate(contacts[*t], Signal::new(*v, *s)).unwrap();
            }
            contacts
                .iter()
                .map(|&c| net.signal(c).unwrap().clone())
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(run(&wave), run(&shuffled));
    }

    /// Propagation over arbitrary cyclic wiring reaches a fixed point within
    /// the step budget, and the fixed point really is one: redelivering what
    /// every contact holds changes nothing.
    #[test]
    fn waves_terminate_on_cyclic_graphs(
        n in 2usize..8,
        edges in proptest::collection::vec((0usize..8, 0usize..8, any::<bool>()), 0..20),
        deliveries in proptest::collection::vec((0usize..8, arb_signal()), 1..10),
    ) {
        let mut net = Network::new();
        let g = net.add_gadget("g");
        let contacts: Vec<_> = (0..n)
            .map(|i| net.add_contact(g, format!("c{i}"), None).unwrap())
            .collect();
        for (from, to, bidi) in edges {
            let kind = if bidi { WireKind::Bidirectional } else { WireKind::Directed };
            net.wire(contacts[from % n], contacts[to % n], kind).unwrap();
        }

        for (target, sig) in deliveries {
            // Ok means the wave halted; budget exhaustion would be Err.
            net.propagate(contacts[target % n], sig).unwrap();
        }

        for &c in &contacts {
            let held = net.signal(c).unwrap().clone();
            prop_assert_eq!(net.propagate(c, held).unwrap(), Outcome::Dropped);
        }
    }

    /// The conservation law survives any interleaving of mints, transfers
    /// and consumes.
    #[test]
    fn conservation_holds_over_random_traces(
        grants in proptest::collection::vec(0u64..10_000, 1..5),
        ops in proptest::collection::vec((0usize..5, 0usize..5, 0u64..5_000, any::<bool>()), 0..40),
    ) {
        let mut ledger = GainLedger::new();
        let mut pools = grants.clone();
        ledger.begin_bootstrap().unwrap();
        for (i, amount) in grants.iter().enumerate() {
            ledger.record_bootstrap(GadgetId(i as u32), *amount, 0);
        }

        let n = pools.len();
        for (step, (a, b, amount, consume)) in ops.into_iter().enumerate() {
            let (a, b) = (a % n, b % n);
            if consume {
                let spend = amount.min(pools[a]);
                pools[a] -= spend;
                ledger.record_consume(GadgetId(a as u32), spend, step as u64);
            } else if a != b {
                let moved = amount.min(pools[a]);
                pools[a] -= moved;
                pools[b] += moved;
                ledger.record_transfer(GadgetId(a as u32), GadgetId(b as u32), moved, step as u64);
            }
        }

        prop_assert!(ledger.audit(pools).is_ok());
    }
}
