//! The propagation network.
//!
//! # Wavefront
//!
//! [`Network::propagate`] is the sole entry point for injecting values. It
//! runs a breadth-first work queue to a fixed point before returning: an
//! accepted signal fans out to every wire peer, acceptances mark their owner
//! gadget dirty, and dirty gadgets fire once the queue drains, feeding their
//! outputs back into the same queue. No recursion, so convergence does not
//! depend on wiring depth.
//!
//! # Halting
//!
//! Strength is drawn from a bounded integer range and a contact re-arms
//! propagation only on a strict strength increase (a contradiction notifies
//! peers exactly one hop and never re-arms). Each contact therefore changes
//! at most `MAX_STRENGTH` times, and the wave reaches its fixed point in a
//! bounded number of steps on any finite graph, cycles included. A step
//! budget derived from that bound turns a violation - impossible unless the
//! rule itself is broken - into an explicit defect error instead of a hang.
//!
//! # Two-Phase Topology
//!
//! Structural mutation never interleaves with value propagation. Spawns and
//! behavior rebinds requested during a wave are queued and committed at the
//! quiescent point after the wave drains; commits that emit signals
//! (instance announcements) start a fresh wave. Public `wire`/`unwire` are
//! only callable between `propagate` calls, which are themselves run to
//! completion, so external callers always mutate a quiescent graph.

use std::collections::{BTreeMap, HashMap, VecDeque};

use atto_signal::{InstanceId, InstanceInfo, Signal, Strength, TemplateId, Value, MAX_STRENGTH};
use tracing::{debug, trace, warn};

use crate::catalog::BehaviorCatalog;
use crate::contact::{Contact, ContactId, Direction, Outcome};
use crate::dynamic::{DynamicGadgetSpec, InstanceRecord, Template};
use crate::error::{Error, Result};
use crate::events::NetworkEvent;
use crate::gadget::{BehaviorError, BehaviorInputs, Gadget, GadgetId, GadgetKind};
use crate::gain::{GainLedger, GainReceipt, LedgerError};
use crate::wire::{Wire, WireId, WireKind};

/// One queued delivery. `final_hop` marks deliveries born from a
/// contradiction acceptance: they may mutate their target but never enqueue
/// further.
#[derive(Debug, Clone)]
struct Delivery {
    target: ContactId,
    signal: Signal,
    final_hop: bool,
}

/// Structural mutation queued for the next quiescent point.
#[derive(Debug)]
enum TopologyEdit {
    Rebind {
        gadget: GadgetId,
        behavior: String,
    },
    Spawn {
        spawner: GadgetId,
        template: TemplateId,
        strength: Strength,
        gain: u64,
    },
    SpawnBatch {
        spawner: GadgetId,
        template: TemplateId,
        count: u64,
        data: Vec<Value>,
        strength: Strength,
        gain: u64,
    },
}

/// A strength-based signal propagation network.
///
/// Owns the contact/wire/gadget arenas, the gain ledger, the behavior
/// catalog, the dynamic-topology registries and the event log. All state is
/// tied to this value's lifetime; nothing is process-global.
pub struct Network {
    contacts: Vec<Contact>,
    wires: Vec<Wire>,
    /// Contact → wires touching it (direction filtered at delivery time).
    attached: HashMap<ContactId, Vec<WireId>>,
    gadgets: Vec<Gadget>,
    ledger: GainLedger,
    catalog: BehaviorCatalog,
    templates: Vec<Template>,
    instances: Vec<InstanceRecord>,
    pending: Vec<TopologyEdit>,
    /// Gadgets whose inputs changed since their last firing check.
    dirty: Vec<GadgetId>,
    events: Vec<NetworkEvent>,
    /// Logical clock: one tick per processed delivery.
    step: u64,
}

impl Network {
    /// A network with the standard behavior catalog.
    pub fn new() -> Self {
        Self::with_catalog(BehaviorCatalog::default())
    }

    pub fn with_catalog(catalog: BehaviorCatalog) -> Self {
        Network {
            contacts: Vec::new(),
            wires: Vec::new(),
            attached: HashMap::new(),
            gadgets: Vec::new(),
            ledger: GainLedger::new(),
            catalog,
            templates: Vec::new(),
            instances: Vec::new(),
            pending: Vec::new(),
            dirty: Vec::new(),
            events: Vec::new(),
            step: 0,
        }
    }

    /// Register additional behaviors before wiring the graph.
    pub fn catalog_mut(&mut self) -> &mut BehaviorCatalog {
        &mut self.catalog
    }

    /// Current logical time.
    pub fn step(&self) -> u64 {
        self.step
    }

    // ---- topology construction ------------------------------------------

    /// Add a plain container gadget with no behavior.
    pub fn add_gadget(&mut self, name: impl Into<String>) -> GadgetId {
        self.add_gadget_internal(name.into(), GadgetKind::Inert)
    }

    /// Add a gadget running a catalog behavior, with its input and output
    /// contacts created from the behavior's declared contract.
    pub fn add_catalog_gadget(&mut self, name: impl Into<String>, behavior: &str) -> Result<GadgetId> {
        let kind = self.catalog.resolve(behavior)?;
        let gid = self.add_gadget_internal(name.into(), kind.clone());
        for input in kind.required_inputs() {
            self.add_contact_internal(gid, input, Some(Direction::Input));
        }
        for input in kind.optional_inputs() {
            self.add_contact_internal(gid, input, Some(Direction::Input));
        }
        for output in kind.output_names() {
            self.add_contact_internal(gid, output, Some(Direction::Output));
        }
        Ok(gid)
    }

    /// Add a named contact to a gadget.
    pub fn add_contact(
        &mut self,
        gadget: GadgetId,
        name: impl Into<String>,
        direction: Option<Direction>,
    ) -> Result<ContactId> {
        self.check_gadget(gadget)?;
        Ok(self.add_contact_internal(gadget, &name.into(), direction))
    }

    /// Connect two contacts. The graph must be quiescent, which it always is
    /// between `propagate` calls.
    pub fn wire(&mut self, from: ContactId, to: ContactId, kind: WireKind) -> Result<WireId> {
        self.check_contact(from)?;
        self.check_contact(to)?;
        let id = WireId(self.wires.len() as u32);
        self.wires.push(Wire::new(id, from, to, kind));
        self.attached.entry(from).or_default().push(id);
        if from != to {
            self.attached.entry(to).or_default().push(id);
        }
        self.events.push(NetworkEvent::WireAdded {
            wire: id,
            from,
            to,
            step: self.step,
        });
        Ok(id)
    }

    /// Disconnect a wire. The id stays allocated; re-unwiring is an error.
    pub fn unwire(&mut self, wire: WireId) -> Result<()> {
        let w = self
            .wires
            .get_mut(wire.0 as usize)
            .filter(|w| w.alive)
            .ok_or(Error::UnknownWire(wire))?;
        w.alive = false;
        let (from, to) = (w.from, w.to);
        for endpoint in [from, to] {
            if let Some(ids) = self.attached.get_mut(&endpoint) {
                ids.retain(|id| *id != wire);
            }
        }
        self.events.push(NetworkEvent::WireRemoved {
            wire,
            step: self.step,
        });
        Ok(())
    }

    // ---- lookups --------------------------------------------------------

    pub fn gadget(&self, id: GadgetId) -> Result<&Gadget> {
        self.gadgets
            .get(id.0 as usize)
            .ok_or(Error::UnknownGadget(id))
    }

    /// First live gadget with the given name, if any. Names are not keys;
    /// spawned instances reuse their template's naming.
    pub fn find_gadget(&self, name: &str) -> Option<GadgetId> {
        self.gadgets
            .iter()
            .find(|g| g.alive && g.name == name)
            .map(|g| g.id)
    }

    /// Contact id by gadget and name.
    pub fn contact_id(&self, gadget: GadgetId, name: &str) -> Result<ContactId> {
        let g = self.gadget(gadget)?;
        g.contact(name).ok_or_else(|| Error::UnknownContactName {
            gadget: g.name.clone(),
            name: name.to_string(),
        })
    }

    /// The signal a contact currently holds.
    pub fn signal(&self, contact: ContactId) -> Result<&Signal> {
        self.contacts
            .get(contact.0 as usize)
            .map(|c| &c.signal)
            .ok_or(Error::UnknownContact(contact))
    }

    pub fn gain_pool(&self, gadget: GadgetId) -> Result<u64> {
        Ok(self.gadget(gadget)?.gain_pool)
    }

    /// Full ordered receipt history.
    pub fn receipts(&self) -> &[GainReceipt] {
        self.ledger.receipts()
    }

    pub fn ledger(&self) -> &GainLedger {
        &self.ledger
    }

    /// Hand the accumulated event log to a consumer.
    pub fn drain_events(&mut self) -> Vec<NetworkEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check the gain conservation law against the live pools.
    pub fn audit(&self) -> Result<()> {
        self.ledger
            .audit(self.gadgets.iter().map(|g| g.gain_pool))
            .map_err(Error::from)
    }

    // ---- gain operations ------------------------------------------------

    /// One-time bootstrap mint, boot loader only. One receipt per granted
    /// pool; a second call fails.
    pub fn bootstrap_mint(&mut self, grants: &[(GadgetId, u64)]) -> Result<()> {
        for (gadget, _) in grants {
            self.check_gadget(*gadget)?;
        }
        self.ledger.begin_bootstrap()?;
        for (gadget, amount) in grants {
            self.gadgets[gadget.0 as usize].gain_pool += amount;
            self.ledger.record_bootstrap(*gadget, *amount, self.step);
            self.events.push(NetworkEvent::GainMinted {
                gadget: *gadget,
                amount: *amount,
                step: self.step,
            });
        }
        Ok(())
    }

    /// Allow `minter` to mint into `target`'s pool.
    pub fn grant_mint_authority(&mut self, minter: GadgetId, target: GadgetId) -> Result<()> {
        self.check_gadget(minter)?;
        self.check_gadget(target)?;
        self.ledger.grant_authority(minter, target);
        Ok(())
    }

    // ---- dynamic topology ------------------------------------------------

    /// Register a template. The spec is validated here; instantiation of a
    /// registered template cannot leave partial topology behind.
    pub fn register_template(
        &mut self,
        name: impl Into<String>,
        spec: DynamicGadgetSpec,
    ) -> Result<TemplateId> {
        spec.validate()?;
        let id = TemplateId(self.templates.len() as u64);
        self.templates.push(Template {
            id,
            name: name.into(),
            spec,
            generation: 0,
        });
        Ok(id)
    }

    pub fn template(&self, id: TemplateId) -> Result<&Template> {
        self.templates
            .get(id.0 as usize)
            .ok_or(Error::UnknownTemplate(id))
    }

    pub fn instance(&self, id: InstanceId) -> Result<&InstanceRecord> {
        self.instances
            .get(id.0 as usize)
            .ok_or(Error::UnknownInstance(id))
    }

    pub fn instances(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.instances.iter()
    }

    /// Retire an instance: its gadget stops firing and its record is marked
    /// dead. Any gain still in its pool stays counted by the audit until an
    /// evolver drains it first.
    pub fn retire_instance(&mut self, id: InstanceId) -> Result<()> {
        let record = self
            .instances
            .get_mut(id.0 as usize)
            .ok_or(Error::UnknownInstance(id))?;
        if !record.alive {
            return Err(Error::DeadInstance(id));
        }
        record.alive = false;
        let gadget = record.gadget;
        self.gadgets[gadget.0 as usize].alive = false;
        self.events.push(NetworkEvent::InstanceRetired {
            instance: id,
            step: self.step,
        });
        Ok(())
    }

    // ---- propagation -----------------------------------------------------

    /// Inject a signal and run the network to quiescence.
    ///
    /// Returns the outcome of the initial delivery; everything downstream is
    /// observable through contact signals and the event log.
    pub fn propagate(&mut self, contact: ContactId, signal: Signal) -> Result<Outcome> {
        self.check_contact(contact)?;
        trace!(contact = contact.0, strength = %signal.strength, "propagate");

        let mut queue = VecDeque::new();
        queue.push_back(Delivery {
            target: contact,
            signal,
            final_hop: false,
        });

        let mut first = None;
        let mut spent: u64 = 0;
        loop {
            // Phase one: value wave and behavior firings to a fixed point.
            while !queue.is_empty() || !self.dirty.is_empty() {
                while let Some(delivery) = queue.pop_front() {
                    spent += 1;
                    let budget = self.step_budget();
                    if spent > budget {
                        return Err(Error::StepBudgetExhausted { budget });
                    }
                    let outcome = self.deliver(&delivery, &mut queue);
                    if first.is_none() {
                        first = Some(outcome);
                    }
                }
                for gadget in std::mem::take(&mut self.dirty) {
                    self.try_fire(gadget, &mut queue);
                }
            }
            // Phase two: commit queued structural edits at the quiescent
            // point. Commits may emit signals, which start a fresh wave.
            if self.pending.is_empty() {
                break;
            }
            for edit in std::mem::take(&mut self.pending) {
                self.apply_edit(edit, &mut queue);
            }
            if queue.is_empty() && self.dirty.is_empty() && self.pending.is_empty() {
                break;
            }
        }
        Ok(first.unwrap_or(Outcome::Dropped))
    }

    /// Upper bound on deliveries one call may process: every acceptance
    /// strictly raises one contact's bounded strength, and each acceptance
    /// fans out over at most all wires.
    fn step_budget(&self) -> u64 {
        let contacts = self.contacts.len() as u64 + 1;
        let fan_out = self.wires.len() as u64 + 2;
        contacts
            .saturating_mul(MAX_STRENGTH.raw() as u64 + 1)
            .saturating_mul(fan_out)
    }

    fn deliver(&mut self, delivery: &Delivery, queue: &mut VecDeque<Delivery>) -> Outcome {
        self.step += 1;
        let step = self.step;

        let (outcome, owner, accepted, is_behavior_slot) = {
            // Ids handed out by this network are always in range.
            let contact = &mut self.contacts[delivery.target.0 as usize];
            let outcome = contact.consider(&delivery.signal, step);
            (
                outcome,
                contact.owner,
                contact.signal.clone(),
                contact.name == "behavior",
            )
        };

        match outcome {
            Outcome::Changed => {
                trace!(
                    contact = delivery.target.0,
                    strength = %accepted.strength,
                    "accepted"
                );
                self.events.push(NetworkEvent::SignalAccepted {
                    contact: delivery.target,
                    strength: accepted.strength,
                    step,
                });
                if is_behavior_slot {
                    if let Value::Behavior(name) = &accepted.value {
                        self.pending.push(TopologyEdit::Rebind {
                            gadget: owner,
                            behavior: name.clone(),
                        });
                    }
                }
                self.mark_dirty(owner);
                if !delivery.final_hop {
                    self.fan_out(delivery.target, &accepted, false, queue);
                }
            }
            Outcome::Contradiction => {
                debug!(contact = delivery.target.0, "contradiction recorded");
                self.events.push(NetworkEvent::ContradictionDetected {
                    contact: delivery.target,
                    strength: accepted.strength,
                    step,
                });
                self.mark_dirty(owner);
                // Subscribers get one hop of notification; the conflict does
                // not re-arm propagation at its strength.
                if !delivery.final_hop {
                    self.fan_out(delivery.target, &accepted, true, queue);
                }
            }
            Outcome::Dropped => {}
        }
        outcome
    }

    fn fan_out(
        &self,
        source: ContactId,
        signal: &Signal,
        final_hop: bool,
        queue: &mut VecDeque<Delivery>,
    ) {
        let Some(wire_ids) = self.attached.get(&source) else {
            return;
        };
        for wire_id in wire_ids {
            let wire = &self.wires[wire_id.0 as usize];
            if let Some(peer) = wire.delivers_to(source) {
                queue.push_back(Delivery {
                    target: peer,
                    signal: signal.clone(),
                    final_hop,
                });
            }
        }
    }

    fn mark_dirty(&mut self, gadget: GadgetId) {
        let g = &self.gadgets[gadget.0 as usize];
        if matches!(g.kind, GadgetKind::Inert) || !g.alive {
            return;
        }
        if !self.dirty.contains(&gadget) {
            self.dirty.push(gadget);
        }
    }

    // ---- gadget firing ---------------------------------------------------

    fn try_fire(&mut self, gid: GadgetId, queue: &mut VecDeque<Delivery>) {
        let (kind, last_fired, alive) = {
            let g = &self.gadgets[gid.0 as usize];
            (g.kind.clone(), g.last_fired, g.alive)
        };
        if !alive {
            return;
        }
        let required = kind.required_inputs();
        if required.is_empty() {
            return;
        }

        let mut map = BTreeMap::new();
        let mut any_fresh = false;
        let mut all_fresh = true;
        for name in required {
            let Some(cid) = self.gadgets[gid.0 as usize].contact(name) else {
                // Structurally incomplete (e.g. a late-bound behavior whose
                // spec never declared this input). Reported, not thrown.
                self.fault(gid, BehaviorError::MissingInput(name.to_string()));
                return;
            };
            let contact = &self.contacts[cid.0 as usize];
            if contact.signal.value.is_nothing() {
                // Not ready yet; it will be re-marked when the input lands.
                return;
            }
            if contact.stamp > last_fired {
                any_fresh = true;
            } else {
                all_fresh = false;
            }
            map.insert(name.to_string(), contact.signal.clone());
        }
        let ready = if kind.fires_on_any_fresh_input() {
            any_fresh
        } else {
            all_fresh && any_fresh
        };
        if !ready {
            return;
        }
        for name in kind.optional_inputs() {
            if let Some(cid) = self.gadgets[gid.0 as usize].contact(name) {
                let signal = &self.contacts[cid.0 as usize].signal;
                // An empty optional slot carries no information and must not
                // drag the min-of-inputs strength to zero.
                if !signal.value.is_nothing() {
                    map.insert(name.to_string(), signal.clone());
                }
            }
        }

        let inputs = BehaviorInputs::new(map);
        let strength = {
            let gathered: Vec<&Signal> = inputs.signals().collect();
            Signal::min_strength(&gathered)
        };
        self.gadgets[gid.0 as usize].last_fired = self.step;

        match kind {
            GadgetKind::Inert => {}
            GadgetKind::Pure(behavior) => match behavior.invoke(&inputs) {
                Ok(outputs) => {
                    self.events.push(NetworkEvent::GadgetFired {
                        gadget: gid,
                        step: self.step,
                    });
                    for (name, value) in outputs {
                        self.emit(gid, &name, Signal::new(value, strength), queue);
                    }
                }
                Err(e) => self.fault(gid, e),
            },
            GadgetKind::Transistor => self.fire_transistor(gid, &inputs, queue),
            GadgetKind::GainMinter => self.fire_minter(gid, &inputs, strength, queue),
            GadgetKind::Spawner => self.fire_spawner(gid, &inputs),
            GadgetKind::Evolver => self.fire_evolver(gid, &inputs, strength, queue),
            GadgetKind::Iterator => self.fire_iterator(gid, &inputs),
        }
    }

    /// Deliver a firing output to the gadget's named output contact.
    fn emit(&mut self, gid: GadgetId, name: &str, signal: Signal, queue: &mut VecDeque<Delivery>) {
        match self.gadgets[gid.0 as usize].contact(name) {
            Some(cid) => queue.push_back(Delivery {
                target: cid,
                signal,
                final_hop: false,
            }),
            None => self.fault(gid, BehaviorError::MissingOutput(name.to_string())),
        }
    }

    fn fault(&mut self, gadget: GadgetId, error: BehaviorError) {
        debug!(gadget = gadget.0, %error, "behavior fault");
        self.events.push(NetworkEvent::BehaviorFault {
            gadget,
            error: error.to_string(),
            step: self.step,
        });
    }

    /// Amplifier. Policy: the `control` input is the requested boost in
    /// strength ticks, and one gain unit buys one strength tick. The boost
    /// actually applied is `min(requested, pool, headroom)` and exactly that
    /// amount is consumed - output strength can never exceed
    /// `input.strength + available gain`, and insufficient gain degrades to
    /// pass-through rather than failing.
    fn fire_transistor(&mut self, gid: GadgetId, inputs: &BehaviorInputs, queue: &mut VecDeque<Delivery>) {
        let parsed = (|| {
            let input = inputs.get("input")?.clone();
            let requested = inputs.amount("control")?;
            Ok::<_, BehaviorError>((input, requested))
        })();
        let (input, requested) = match parsed {
            Ok(p) => p,
            Err(e) => return self.fault(gid, e),
        };

        let pool = self.gadgets[gid.0 as usize].gain_pool;
        let headroom = input.strength.headroom() as u64;
        let applied = requested.min(pool).min(headroom);
        if applied > 0 {
            self.gadgets[gid.0 as usize].gain_pool -= applied;
            self.ledger.record_consume(gid, applied, self.step);
            self.events.push(NetworkEvent::GainConsumed {
                gadget: gid,
                amount: applied,
                step: self.step,
            });
        }
        self.events.push(NetworkEvent::GadgetFired {
            gadget: gid,
            step: self.step,
        });
        let boosted = Signal::new(
            input.value.clone(),
            input.strength.saturating_add(applied as u32),
        );
        self.emit(gid, "output", boosted, queue);
    }

    /// Authorized minting. Unauthorized, unvalidated or unresolvable mints
    /// are pure no-ops with a `success=false` output - no mutation, no
    /// receipt, no fault.
    fn fire_minter(
        &mut self,
        gid: GadgetId,
        inputs: &BehaviorInputs,
        strength: Strength,
        queue: &mut VecDeque<Delivery>,
    ) {
        let parsed = (|| {
            let amount = inputs.amount("amount")?;
            let validator = inputs.bool("validator")?;
            Ok::<_, BehaviorError>((amount, validator))
        })();
        let (amount, validator) = match parsed {
            Ok(p) => p,
            Err(e) => return self.fault(gid, e),
        };

        let target = inputs
            .get_opt("target")
            .and_then(|s| s.value.as_instance())
            .and_then(|info| self.live_instance_gadget(info.id))
            .or_else(|| self.sole_authorized_target(gid));

        let success = match target {
            Some(target) if validator && self.ledger.is_authorized(gid, target) => {
                self.gadgets[target.0 as usize].gain_pool += amount;
                self.ledger.record_authorized(gid, target, amount, self.step);
                self.events.push(NetworkEvent::GainMinted {
                    gadget: target,
                    amount,
                    step: self.step,
                });
                true
            }
            _ => false,
        };
        self.events.push(NetworkEvent::GadgetFired {
            gadget: gid,
            step: self.step,
        });
        self.emit(gid, "success", Signal::new(success, strength), queue);
    }

    fn live_instance_gadget(&self, id: InstanceId) -> Option<GadgetId> {
        self.instances
            .get(id.0 as usize)
            .filter(|r| r.alive)
            .map(|r| r.gadget)
    }

    /// The minter's implicit target when no `target` input is wired: usable
    /// only when exactly one authority grant exists for it.
    fn sole_authorized_target(&self, minter: GadgetId) -> Option<GadgetId> {
        let mut targets = self.ledger.targets_of(minter);
        let first = targets.next()?;
        if targets.next().is_some() {
            None
        } else {
            Some(first)
        }
    }

    fn fire_spawner(&mut self, gid: GadgetId, inputs: &BehaviorInputs) {
        let parsed = (|| {
            let sig = inputs.get("template")?;
            let template = sig.value.as_template().ok_or_else(|| BehaviorError::TypeMismatch {
                input: "template".to_string(),
                expected: "template",
                got: sig.value.type_name(),
            })?;
            let strength = inputs.amount("initial_strength")?;
            let gain = inputs.amount("initial_gain")?;
            let trigger = inputs.bool("trigger")?;
            Ok::<_, BehaviorError>((template, strength, gain, trigger))
        })();
        let (template, strength, gain, trigger) = match parsed {
            Ok(p) => p,
            Err(e) => return self.fault(gid, e),
        };
        if !trigger {
            return;
        }
        self.pending.push(TopologyEdit::Spawn {
            spawner: gid,
            template,
            strength: Strength::new(strength.min(u32::MAX as u64) as u32),
            gain,
        });
    }

    fn fire_iterator(&mut self, gid: GadgetId, inputs: &BehaviorInputs) {
        let parsed = (|| {
            let sig = inputs.get("template")?;
            let template = sig.value.as_template().ok_or_else(|| BehaviorError::TypeMismatch {
                input: "template".to_string(),
                expected: "template",
                got: sig.value.type_name(),
            })?;
            let count = inputs.amount("count")?;
            let data_sig = inputs.get("data")?;
            let data = data_sig
                .value
                .as_list()
                .ok_or_else(|| BehaviorError::TypeMismatch {
                    input: "data".to_string(),
                    expected: "list",
                    got: data_sig.value.type_name(),
                })?
                .to_vec();
            let trigger = inputs.bool("trigger")?;
            Ok::<_, BehaviorError>((template, count, data, trigger))
        })();
        let (template, count, data, trigger) = match parsed {
            Ok(p) => p,
            Err(e) => return self.fault(gid, e),
        };
        if !trigger {
            return;
        }
        // New structure starts weak unless the caller says otherwise.
        let strength = inputs
            .get_opt("initial_strength")
            .and_then(|s| s.value.as_int())
            .filter(|n| *n >= 0)
            .map(|n| Strength::new(n.min(u32::MAX as i64) as u32))
            .unwrap_or(Strength::new(1));
        let gain = inputs
            .get_opt("initial_gain")
            .and_then(|s| s.value.as_int())
            .filter(|n| *n >= 0)
            .unwrap_or(0) as u64;
        self.pending.push(TopologyEdit::SpawnBatch {
            spawner: gid,
            template,
            count,
            data,
            strength,
            gain,
        });
    }

    /// Gradual migration: move `min(rate, old.pool - threshold)` from the
    /// old generation to the new, never taking the old below `threshold`.
    fn fire_evolver(
        &mut self,
        gid: GadgetId,
        inputs: &BehaviorInputs,
        strength: Strength,
        queue: &mut VecDeque<Delivery>,
    ) {
        let parsed = (|| {
            let old_sig = inputs.get("old")?;
            let old = old_sig
                .value
                .as_instance()
                .ok_or_else(|| BehaviorError::TypeMismatch {
                    input: "old".to_string(),
                    expected: "instance",
                    got: old_sig.value.type_name(),
                })?;
            let new_sig = inputs.get("new")?;
            let new = new_sig
                .value
                .as_instance()
                .ok_or_else(|| BehaviorError::TypeMismatch {
                    input: "new".to_string(),
                    expected: "instance",
                    got: new_sig.value.type_name(),
                })?;
            let rate = inputs.amount("rate")?;
            let threshold = inputs.amount("threshold")?;
            Ok::<_, BehaviorError>((old, new, rate, threshold))
        })();
        let (old, new, rate, threshold) = match parsed {
            Ok(p) => p,
            Err(e) => return self.fault(gid, e),
        };

        let (Some(old_g), Some(new_g)) = (
            self.live_instance_gadget(old.id),
            self.live_instance_gadget(new.id),
        ) else {
            return self.fault(gid, BehaviorError::MissingInput("live instance".to_string()));
        };

        let old_pool = self.gadgets[old_g.0 as usize].gain_pool;
        let moved = old_pool.saturating_sub(threshold).min(rate);
        if moved > 0 {
            self.gadgets[old_g.0 as usize].gain_pool -= moved;
            self.gadgets[new_g.0 as usize].gain_pool += moved;
            self.ledger.record_transfer(old_g, new_g, moved, self.step);
            self.events.push(NetworkEvent::GainTransferred {
                from: old_g,
                to: new_g,
                amount: moved,
                step: self.step,
            });
        }
        let old_after = self.gadgets[old_g.0 as usize].gain_pool;
        let new_after = self.gadgets[new_g.0 as usize].gain_pool;
        let complete = old_after <= threshold;

        self.events.push(NetworkEvent::GadgetFired {
            gadget: gid,
            step: self.step,
        });
        self.emit(gid, "transferred", Signal::new(moved as i64, strength), queue);
        self.emit(gid, "old_gain", Signal::new(old_after as i64, strength), queue);
        self.emit(gid, "new_gain", Signal::new(new_after as i64, strength), queue);
        self.emit(gid, "complete", Signal::new(complete, strength), queue);
    }

    // ---- topology edits --------------------------------------------------

    fn apply_edit(&mut self, edit: TopologyEdit, queue: &mut VecDeque<Delivery>) {
        match edit {
            TopologyEdit::Rebind { gadget, behavior } => match self.catalog.resolve(&behavior) {
                Ok(kind) => {
                    debug!(gadget = gadget.0, behavior, "behavior bound");
                    let g = &mut self.gadgets[gadget.0 as usize];
                    g.kind = kind;
                    // A freshly bound behavior has never fired; every held
                    // input counts as new for it.
                    g.last_fired = 0;
                    self.events.push(NetworkEvent::BehaviorBound {
                        gadget,
                        behavior,
                        step: self.step,
                    });
                    self.mark_dirty(gadget);
                }
                Err(e) => self.fault(gadget, e),
            },
            TopologyEdit::Spawn {
                spawner,
                template,
                strength,
                gain,
            } => match self.commit_spawn(spawner, template, gain) {
                Ok(info) => {
                    if let Some(cid) = self.gadgets[spawner.0 as usize].contact("spawned") {
                        queue.push_back(Delivery {
                            target: cid,
                            signal: Signal::new(Value::Instance(info), strength),
                            final_hop: false,
                        });
                    }
                }
                Err(e) => self.spawn_failed(template, e),
            },
            TopologyEdit::SpawnBatch {
                spawner,
                template,
                count,
                data,
                strength,
                gain,
            } => {
                let mut spawned = Vec::new();
                for i in 0..count as usize {
                    match self.commit_spawn(spawner, template, gain) {
                        Ok(info) => {
                            // Bind element i into the instance's data
                            // contact, when the template names one.
                            let seed = data.get(i).cloned().unwrap_or(Value::Nothing);
                            if !seed.is_nothing() {
                                if let Some(target) = self.data_contact(template, info.id) {
                                    queue.push_back(Delivery {
                                        target,
                                        signal: Signal::new(seed, strength),
                                        final_hop: false,
                                    });
                                }
                            }
                            spawned.push(Value::Instance(info));
                        }
                        Err(e) => self.spawn_failed(template, e),
                    }
                }
                if let Some(cid) = self.gadgets[spawner.0 as usize].contact("spawned") {
                    queue.push_back(Delivery {
                        target: cid,
                        signal: Signal::new(Value::List(spawned), strength),
                        final_hop: false,
                    });
                }
            }
        }
    }

    fn spawn_failed(&mut self, template: TemplateId, error: Error) {
        warn!(template = template.0, %error, "instantiation aborted");
        self.events.push(NetworkEvent::SpawnFailed {
            template,
            error: error.to_string(),
            step: self.step,
        });
    }

    /// Build one instance of a registered template. All-or-nothing: the
    /// spec was validated at registration and the spawner's funding is
    /// checked before anything is created.
    fn commit_spawn(&mut self, spawner: GadgetId, template: TemplateId, gain: u64) -> Result<InstanceInfo> {
        let (spec, template_name) = {
            let t = self.template(template)?;
            (t.spec.clone(), t.name.clone())
        };
        // Spawners fund new pools out of their own; topology growth cannot
        // create gain.
        let funding = self.gadgets[spawner.0 as usize].gain_pool;
        if funding < gain {
            return Err(Error::Ledger(LedgerError::InsufficientGain {
                gadget: spawner,
                have: funding,
                need: gain,
            }));
        }

        let generation = {
            let t = &mut self.templates[template.0 as usize];
            t.generation += 1;
            t.generation
        };
        let instance_name = format!("{template_name}#{generation}");
        let root = self.materialize(&spec, &instance_name)?;

        let info = InstanceInfo {
            id: InstanceId(self.instances.len() as u64),
            generation,
            born: self.step,
        };
        self.instances.push(InstanceRecord {
            info,
            template,
            gadget: root,
            alive: true,
        });

        if gain > 0 {
            self.gadgets[spawner.0 as usize].gain_pool -= gain;
            self.gadgets[root.0 as usize].gain_pool += gain;
            self.ledger.record_transfer(spawner, root, gain, self.step);
            self.events.push(NetworkEvent::GainTransferred {
                from: spawner,
                to: root,
                amount: gain,
                step: self.step,
            });
        }

        debug!(
            template = template.0,
            generation,
            gadget = root.0,
            "instance spawned"
        );
        self.events.push(NetworkEvent::InstanceSpawned {
            instance: info.id,
            template,
            generation,
            step: self.step,
        });
        Ok(info)
    }

    /// Create the gadget tree a spec describes. The spec has already been
    /// validated, so path resolution cannot fail here.
    fn materialize(&mut self, spec: &DynamicGadgetSpec, name: &str) -> Result<GadgetId> {
        let gid = self.add_gadget_internal(name.to_string(), GadgetKind::Inert);
        for c in &spec.contacts {
            self.add_contact_internal(gid, &c.name, c.direction);
        }
        for (child_name, child_spec) in &spec.children {
            let child = self.materialize(child_spec, &format!("{name}.{child_name}"))?;
            self.gadgets[gid.0 as usize].children.insert(child_name.clone(), child);
        }
        for w in &spec.wires {
            let from = self
                .resolve_path(gid, &w.from)
                .ok_or_else(|| Error::Spec(crate::dynamic::SpecError::UnresolvedEndpoint(w.from.clone())))?;
            let to = self
                .resolve_path(gid, &w.to)
                .ok_or_else(|| Error::Spec(crate::dynamic::SpecError::UnresolvedEndpoint(w.to.clone())))?;
            self.wire(from, to, w.kind)?;
        }
        Ok(gid)
    }

    /// The contact an iterator seeds with its data element, per the
    /// template's `data` binding.
    fn data_contact(&self, template: TemplateId, instance: InstanceId) -> Option<ContactId> {
        let record = self.instances.get(instance.0 as usize)?;
        let path = self.templates.get(template.0 as usize)?.spec.binding("data")?;
        self.resolve_path(record.gadget, path)
    }

    fn resolve_path(&self, gadget: GadgetId, path: &str) -> Option<ContactId> {
        let g = self.gadgets.get(gadget.0 as usize)?;
        match path.split_once('.') {
            None => g.contact(path),
            Some((child, rest)) => self.resolve_path(*g.children.get(child)?, rest),
        }
    }

    // ---- internals -------------------------------------------------------

    fn add_gadget_internal(&mut self, name: String, kind: GadgetKind) -> GadgetId {
        let id = GadgetId(self.gadgets.len() as u32);
        self.gadgets.push(Gadget::new(id, name, kind));
        id
    }

    fn add_contact_internal(
        &mut self,
        gadget: GadgetId,
        name: &str,
        direction: Option<Direction>,
    ) -> ContactId {
        let id = ContactId(self.contacts.len() as u32);
        self.contacts.push(Contact::new(id, gadget, name, direction));
        self.gadgets[gadget.0 as usize]
            .contacts
            .insert(name.to_string(), id);
        id
    }

    fn check_contact(&self, id: ContactId) -> Result<()> {
        if (id.0 as usize) < self.contacts.len() {
            Ok(())
        } else {
            Err(Error::UnknownContact(id))
        }
    }

    fn check_gadget(&self, id: GadgetId) -> Result<()> {
        if (id.0 as usize) < self.gadgets.len() {
            Ok(())
        } else {
            Err(Error::UnknownGadget(id))
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
