//! Types: operation tables, rule registries, and fallback hooks.
//!
//! A [`Class`] is the owning type of everything the resolver touches:
//! - the operation table, holding native operations and every
//!   implementation the resolver installed,
//! - the [`Registry`] of rules, which composes the resolver into the type
//!   as soon as it is non-empty,
//! - an optional [`Fallback`], the type's own unknown-operation handler,
//!   consulted only after the rules found nothing.
//!
//! Static lookup walks the lineage (the type, then its parents). Rules do
//! not: a subtype only sees its parent's rules when built with
//! [`ClassBuilder::inherit_rules`].

use crate::error::DispatchError;
use crate::implementation::{Block, Implementation, Origin};
use crate::instance::Instance;
use crate::operation::OperationName;
use crate::registry::Registry;
use crate::rule::Rule;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, hash_map::Entry};
use std::fmt;
use std::sync::Arc;

type FallbackHandler = dyn Fn(&Arc<Instance>, &OperationName, &[Value], Option<&Block>) -> Result<Value, DispatchError>
    + Send
    + Sync;

type RespondsPredicate = dyn Fn(&OperationName) -> bool + Send + Sync;

/// A type's own unknown-operation handler.
///
/// Fallbacks answer calls but never install anything, so every call that
/// reaches one reaches it again next time.
#[derive(Clone)]
pub struct Fallback {
    handler: Arc<FallbackHandler>,
    responds: Option<Arc<RespondsPredicate>>,
}

impl Fallback {
    pub fn new(
        handler: impl Fn(&Arc<Instance>, &OperationName, &[Value], Option<&Block>) -> Result<Value, DispatchError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            responds: None,
        }
    }

    /// Claim names during capability queries. Fallbacks claim nothing by
    /// default.
    pub fn responding(
        mut self,
        predicate: impl Fn(&OperationName) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.responds = Some(Arc::new(predicate));
        self
    }

    pub fn handle(
        &self,
        receiver: &Arc<Instance>,
        operation: &OperationName,
        args: &[Value],
        block: Option<&Block>,
    ) -> Result<Value, DispatchError> {
        (self.handler)(receiver, operation, args, block)
    }

    pub fn claims(&self, operation: &OperationName) -> bool {
        self.responds
            .as_ref()
            .is_some_and(|predicate| predicate(operation))
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback")
            .field("responds", &self.responds.is_some())
            .finish_non_exhaustive()
    }
}

pub struct Class {
    name: String,
    parent: Option<Arc<Class>>,
    fields: BTreeMap<String, Value>,
    operations: RwLock<HashMap<OperationName, Implementation>>,
    registry: Registry,
    fallback: Option<Fallback>,
    inherit_rules: bool,
}

impl Class {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            parent: None,
            fields: BTreeMap::new(),
            natives: Vec::new(),
            rules: Vec::new(),
            fallback: None,
            inherit_rules: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Class>> {
        self.parent.as_ref()
    }

    /// This type followed by each ancestor, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    /// Whether `self` is `other` or descends from it.
    pub fn is_a(&self, other: &Class) -> bool {
        self.lineage().any(|class| std::ptr::eq(class, other))
    }

    pub fn inherits_rules(&self) -> bool {
        self.inherit_rules
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        self.fallback.as_ref()
    }

    /// Field defaults, parents first so subtypes override.
    pub fn default_fields(&self) -> BTreeMap<String, Value> {
        let lineage: Vec<&Class> = self.lineage().collect();
        let mut fields = BTreeMap::new();
        for class in lineage.into_iter().rev() {
            fields.extend(class.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        fields
    }

    /// Append a rule to this type's registry.
    pub fn add_operation_rule(&self, rule: Rule) {
        tracing::debug!(
            class = %self.name,
            rule = rule.label().unwrap_or("<unlabeled>"),
            position = self.registry.len(),
            "registered operation rule"
        );
        self.registry.append(rule);
    }

    /// This type's own rules, in match order.
    pub fn operation_rules(&self) -> Vec<Arc<Rule>> {
        self.registry.all()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether the resolver is composed into this type.
    pub fn composes_resolver(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Whether this type itself (not an ancestor) defines `operation`.
    pub fn defines(&self, operation: &str) -> bool {
        self.operations.read().contains_key(operation)
    }

    /// Static lookup over the lineage.
    pub fn lookup(&self, operation: &str) -> Option<Implementation> {
        self.lineage()
            .find_map(|class| class.operations.read().get(operation).cloned())
    }

    /// Install `implementation` under `operation` unless something is
    /// already there. Returns whichever implementation ends up installed.
    pub fn install(&self, operation: OperationName, implementation: Implementation) -> Implementation {
        match self.operations.write().entry(operation) {
            Entry::Occupied(existing) => {
                tracing::debug!(
                    class = %self.name,
                    operation = %existing.key(),
                    "operation already installed; keeping first implementation"
                );
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                tracing::debug!(
                    class = %self.name,
                    operation = %slot.key(),
                    origin = ?implementation.origin(),
                    "installed operation"
                );
                slot.insert(implementation).clone()
            }
        }
    }

    /// Operations defined on this type with their origins, sorted by name.
    pub fn installed_operations(&self) -> Vec<(OperationName, Origin)> {
        let mut operations: Vec<(OperationName, Origin)> = self
            .operations
            .read()
            .iter()
            .map(|(name, implementation)| (name.clone(), implementation.origin()))
            .collect();
        operations.sort_by(|a, b| a.0.cmp(&b.0));
        operations
    }

    pub fn instantiate(self: &Arc<Self>) -> Arc<Instance> {
        Instance::new(Arc::clone(self))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("rules", &self.registry.len())
            .field("inherit_rules", &self.inherit_rules)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Class`].
pub struct ClassBuilder {
    name: String,
    parent: Option<Arc<Class>>,
    fields: BTreeMap<String, Value>,
    natives: Vec<(OperationName, Implementation)>,
    rules: Vec<Rule>,
    fallback: Option<Fallback>,
    inherit_rules: bool,
}

impl ClassBuilder {
    pub fn parent(mut self, parent: Arc<Class>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn native(mut self, name: impl Into<OperationName>, implementation: Implementation) -> Self {
        self.natives
            .push((name.into(), implementation.with_origin(Origin::Native)));
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Let the resolver walk the parent's rules after this type's own.
    pub fn inherit_rules(mut self) -> Self {
        self.inherit_rules = true;
        self
    }

    pub fn build(self) -> Arc<Class> {
        let class = Class {
            name: self.name,
            parent: self.parent,
            fields: self.fields,
            operations: RwLock::new(self.natives.into_iter().collect()),
            registry: Registry::new(),
            fallback: self.fallback,
            inherit_rules: self.inherit_rules,
        };
        for rule in self.rules {
            class.add_operation_rule(rule);
        }
        Arc::new(class)
    }
}
