//! The primitive gadget catalog.
//!
//! A small fixed set of building blocks registered by name. The catalog is
//! also the resolution point for late-bound behaviors: a
//! `Value::Behavior(name)` accepted on a gadget's `behavior` contact is
//! looked up here at the next quiescent point, which is what makes hot-swap
//! possible.

use std::collections::HashMap;
use std::rc::Rc;

use atto_signal::Value;

use crate::gadget::{Behavior, BehaviorError, BehaviorInputs, GadgetKind};

/// Integer addition: `a + b → sum`.
pub struct Adder;

impl Behavior for Adder {
    fn name(&self) -> &'static str {
        "adder"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["a", "b"]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["sum"]
    }

    fn invoke(&self, inputs: &BehaviorInputs) -> Result<Vec<(String, Value)>, BehaviorError> {
        let sum = inputs.int("a")?.wrapping_add(inputs.int("b")?);
        Ok(vec![("sum".to_string(), Value::Int(sum))])
    }
}

/// Integer comparison: `a > b → result`.
pub struct GreaterThan;

impl Behavior for GreaterThan {
    fn name(&self) -> &'static str {
        "greater_than"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["a", "b"]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["result"]
    }

    fn invoke(&self, inputs: &BehaviorInputs) -> Result<Vec<(String, Value)>, BehaviorError> {
        let result = inputs.int("a")? > inputs.int("b")?;
        Ok(vec![("result".to_string(), Value::Bool(result))])
    }
}

/// Boolean conjunction: `a && b → result`.
pub struct And;

impl Behavior for And {
    fn name(&self) -> &'static str {
        "and"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["a", "b"]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["result"]
    }

    fn invoke(&self, inputs: &BehaviorInputs) -> Result<Vec<(String, Value)>, BehaviorError> {
        let result = inputs.bool("a")? && inputs.bool("b")?;
        Ok(vec![("result".to_string(), Value::Bool(result))])
    }
}

/// Boolean disjunction: `a || b → result`.
pub struct Or;

impl Behavior for Or {
    fn name(&self) -> &'static str {
        "or"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["a", "b"]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["result"]
    }

    fn invoke(&self, inputs: &BehaviorInputs) -> Result<Vec<(String, Value)>, BehaviorError> {
        let result = inputs.bool("a")? || inputs.bool("b")?;
        Ok(vec![("result".to_string(), Value::Bool(result))])
    }
}

/// Boolean negation: `a → result`.
pub struct Not;

impl Behavior for Not {
    fn name(&self) -> &'static str {
        "not"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["a"]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["result"]
    }

    fn invoke(&self, inputs: &BehaviorInputs) -> Result<Vec<(String, Value)>, BehaviorError> {
        Ok(vec![("result".to_string(), Value::Bool(!inputs.bool("a")?))])
    }
}

/// String concatenation: `a ++ b → result`.
pub struct Concat;

impl Behavior for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["a", "b"]
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["result"]
    }

    fn invoke(&self, inputs: &BehaviorInputs) -> Result<Vec<(String, Value)>, BehaviorError> {
        let mut s = inputs.str("a")?.to_string();
        s.push_str(inputs.str("b")?);
        Ok(vec![("result".to_string(), Value::Str(s))])
    }
}

/// Name-keyed behavior registry.
pub struct BehaviorCatalog {
    pure: HashMap<String, Rc<dyn Behavior>>,
}

impl BehaviorCatalog {
    /// Empty catalog.
    pub fn empty() -> Self {
        BehaviorCatalog {
            pure: HashMap::new(),
        }
    }

    /// Register a behavior under its own name. Re-registration replaces.
    pub fn register(&mut self, behavior: Rc<dyn Behavior>) {
        self.pure.insert(behavior.name().to_string(), behavior);
    }

    /// Resolve a behavior name to a gadget kind. The engine-handled kinds
    /// (transistor, minter, spawner, evolver, iterator) are built in; all
    /// other names go through the pure registry.
    pub fn resolve(&self, name: &str) -> Result<GadgetKind, BehaviorError> {
        match name {
            "transistor" => Ok(GadgetKind::Transistor),
            "gain_minter" => Ok(GadgetKind::GainMinter),
            "spawner" => Ok(GadgetKind::Spawner),
            "evolver" => Ok(GadgetKind::Evolver),
            "iterator" => Ok(GadgetKind::Iterator),
            _ => self
                .pure
                .get(name)
                .map(|b| GadgetKind::Pure(Rc::clone(b)))
                .ok_or_else(|| BehaviorError::UnknownBehavior(name.to_string())),
        }
    }
}

impl Default for BehaviorCatalog {
    /// The standard catalog: arithmetic, comparison, boolean combinators and
    /// string concatenation.
    fn default() -> Self {
        let mut catalog = BehaviorCatalog::empty();
        catalog.register(Rc::new(Adder));
        catalog.register(Rc::new(GreaterThan));
        catalog.register(Rc::new(And));
        catalog.register(Rc::new(Or));
        catalog.register(Rc::new(Not));
        catalog.register(Rc::new(Concat));
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atto_signal::{Signal, Strength};
    use std::collections::BTreeMap;

    fn ints(pairs: &[(&str, i64)]) -> BehaviorInputs {
        let map: BTreeMap<String, Signal> = pairs
            .iter()
            .map(|(n, v)| (n.to_string(), Signal::new(*v, Strength::new(1_000))))
            .collect();
        BehaviorInputs::new(map)
    }

    #[test]
    fn adder_sums() {
        let out = Adder.invoke(&ints(&[("a", 2), ("b", 40)])).unwrap();
        assert_eq!(out, vec![("sum".to_string(), Value::Int(42))]);
    }

    #[test]
    fn greater_than_compares() {
        let out = GreaterThan.invoke(&ints(&[("a", 5), ("b", 3)])).unwrap();
        assert_eq!(out, vec![("result".to_string(), Value::Bool(true))]);
        let out = GreaterThan.invoke(&ints(&[("a", 3), ("b", 3)])).unwrap();
        assert_eq!(out, vec![("result".to_string(), Value::Bool(false))]);
    }

    #[test]
    fn boolean_combinators() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Signal::new(true, Strength::new(1)));
        map.insert("b".to_string(), Signal::new(false, Strength::new(1)));
        let ins = BehaviorInputs::new(map);

        assert_eq!(
            And.invoke(&ins).unwrap(),
            vec![("result".to_string(), Value::Bool(false))]
        );
        assert_eq!(
            Or.invoke(&ins).unwrap(),
            vec![("result".to_string(), Value::Bool(true))]
        );
        assert_eq!(
            Not.invoke(&ins).unwrap(),
            vec![("result".to_string(), Value::Bool(false))]
        );
    }

    #[test]
    fn concat_joins_strings() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Signal::new("foo", Strength::new(1)));
        map.insert("b".to_string(), Signal::new("bar", Strength::new(1)));
        let out = Concat.invoke(&BehaviorInputs::new(map)).unwrap();
        assert_eq!(out, vec![("result".to_string(), Value::Str("foobar".into()))]);
    }

    #[test]
    fn adder_rejects_strings() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Signal::new("x", Strength::new(1)));
        map.insert("b".to_string(), Signal::new(1i64, Strength::new(1)));
        let err = Adder.invoke(&BehaviorInputs::new(map)).unwrap_err();
        assert!(matches!(err, BehaviorError::TypeMismatch { .. }));
    }

    #[test]
    fn catalog_resolves_builtin_and_pure_names() {
        let catalog = BehaviorCatalog::default();
        assert!(matches!(
            catalog.resolve("adder").unwrap(),
            GadgetKind::Pure(_)
        ));
        assert!(matches!(
            catalog.resolve("transistor").unwrap(),
            GadgetKind::Transistor
        ));
        assert!(matches!(
            catalog.resolve("spawner").unwrap(),
            GadgetKind::Spawner
        ));
        assert!(matches!(
            catalog.resolve("warp_drive"),
            Err(BehaviorError::UnknownBehavior(name)) if name == "warp_drive"
        ));
    }
}
