//! Per-attempt resolution context.
//!
//! A context is the scratchpad shared by a rule's matcher and its producer
//! during one resolution attempt. It carries:
//! 1. the operation name being resolved,
//! 2. a weak back-reference to the receiver that triggered resolution,
//! 3. an open map of named slots.
//!
//! Slots written while matching are still there when the same rule
//! produces, which is how a matcher hands a parsed suffix or a captured
//! group to synthesis. Contexts are passed explicitly and never stored on
//! a type, so two attempts cannot observe each other's slots.

use crate::instance::Instance;
use crate::operation::OperationName;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

#[derive(Debug)]
pub struct Context {
    operation_name: OperationName,
    original_receiver: Weak<Instance>,
    slots: BTreeMap<String, Value>,
}

impl Context {
    /// Start a resolution attempt for `operation_name` on `receiver`.
    pub fn new(operation_name: OperationName, receiver: &Arc<Instance>) -> Self {
        Self {
            operation_name,
            original_receiver: Arc::downgrade(receiver),
            slots: BTreeMap::new(),
        }
    }

    /// A context with no receiver, for evaluating rules in isolation.
    pub fn detached(operation_name: OperationName) -> Self {
        Self {
            operation_name,
            original_receiver: Weak::new(),
            slots: BTreeMap::new(),
        }
    }

    pub fn operation_name(&self) -> &OperationName {
        &self.operation_name
    }

    /// The instance that triggered this attempt, if it is still alive.
    pub fn original_receiver(&self) -> Option<Arc<Instance>> {
        self.original_receiver.upgrade()
    }

    /// Read a slot. `None` means the slot was never written.
    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.slots.get(slot)
    }

    pub fn get_str(&self, slot: &str) -> Option<&str> {
        self.get(slot).and_then(Value::as_str)
    }

    pub fn get_int(&self, slot: &str) -> Option<i64> {
        self.get(slot).and_then(Value::as_int)
    }

    /// Write a slot, returning the previous value.
    pub fn set(&mut self, slot: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.slots.insert(slot.into(), value.into())
    }

    pub fn take(&mut self, slot: &str) -> Option<Value> {
        self.slots.remove(slot)
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    /// Iterate written slots in name order.
    pub fn slots(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drop scratch data left by a matcher that did not match.
    pub(crate) fn clear_slots(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_start_unset() {
        let ctx = Context::detached(OperationName::new("aaa"));
        assert_eq!(ctx.operation_name().as_str(), "aaa");
        assert!(ctx.get("anything").is_none());
        assert!(ctx.original_receiver().is_none());
    }

    #[test]
    fn typed_accessors() {
        let mut ctx = Context::detached(OperationName::new("get_x"));
        assert!(ctx.set("attr", "x").is_none());
        ctx.set("width", 3);
        assert_eq!(ctx.get_str("attr"), Some("x"));
        assert_eq!(ctx.get_int("width"), Some(3));
        assert_eq!(ctx.get_int("attr"), None);

        let previous = ctx.set("attr", "y");
        assert_eq!(previous, Some(Value::Str("x".into())));
        assert_eq!(ctx.take("attr"), Some(Value::Str("y".into())));
        assert!(!ctx.contains("attr"));

        let names: Vec<&str> = ctx.slots().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["width"]);
        ctx.clear_slots();
        assert_eq!(ctx.slots().count(), 0);
    }
}
