//! The resolver: what an instance does with an operation it cannot serve.
//!
//! One unknown-operation event runs through
//!
//! ```text
//! START → MATCHING ─┬─ SYNTHESIZING → INSTALLED → RETRY-DISPATCH
//!                   └─ NO-MATCH → fallback chain | Unresolved
//! ```
//!
//! The first matching rule wins outright. Its implementation is installed
//! on the receiver's type, and the original call is dispatched again
//! through [`Instance::call_with_block`], which now hits the static table.
//! A synthesis failure ends the attempt; later rules are not tried.

use crate::context::Context;
use crate::error::DispatchError;
use crate::implementation::Block;
use crate::instance::Instance;
use crate::operation::OperationName;
use crate::rule::Rule;
use crate::value::Value;
use std::sync::Arc;
use tracing::{debug, trace};

pub struct Resolver<'a> {
    receiver: &'a Arc<Instance>,
}

impl<'a> Resolver<'a> {
    pub fn new(receiver: &'a Arc<Instance>) -> Self {
        Self { receiver }
    }

    /// Rules visible to the receiver's type, in match order.
    ///
    /// The type's own registry comes first. Parent registries follow only
    /// while each level opted into rule inheritance.
    pub fn rules_in_scope(&self) -> Vec<Arc<Rule>> {
        let mut rules = Vec::new();
        for class in self.receiver.class().lineage() {
            rules.extend(class.operation_rules());
            if !class.inherits_rules() {
                break;
            }
        }
        rules
    }

    /// MATCHING: the first rule whose matcher accepts `context`.
    ///
    /// Slots are cleared before each matcher so a rejecting rule cannot
    /// leave data behind for a later one.
    pub fn find_match(&self, context: &mut Context) -> Option<Arc<Rule>> {
        for (position, rule) in self.rules_in_scope().into_iter().enumerate() {
            context.clear_slots();
            let matched = rule.matches(context);
            trace!(
                operation = %context.operation_name(),
                rule = rule.label().unwrap_or("<unlabeled>"),
                position,
                matched,
                "evaluated rule matcher"
            );
            if matched {
                return Some(rule);
            }
        }
        None
    }

    /// Capability query: run MATCHING only.
    ///
    /// Not idempotent when matchers have side effects outside the context.
    pub fn can_resolve(&self, operation: &OperationName) -> bool {
        let mut context = Context::new(operation.clone(), self.receiver);
        self.find_match(&mut context).is_some()
    }

    /// Whether any fallback in the lineage claims `operation`.
    pub fn fallback_claims(&self, operation: &OperationName) -> bool {
        self.receiver
            .class()
            .lineage()
            .filter_map(|class| class.fallback())
            .any(|fallback| fallback.claims(operation))
    }

    /// Resolve a call that missed static lookup.
    pub fn try_resolve(
        &self,
        operation: OperationName,
        args: &[Value],
        block: Option<&Block>,
    ) -> Result<Value, DispatchError> {
        let class = self.receiver.class();
        let mut context = Context::new(operation.clone(), self.receiver);

        let Some(rule) = self.find_match(&mut context) else {
            return self.delegate_to_fallback(&operation, args, block);
        };

        let implementation = rule
            .produce(&mut context)
            .map_err(|source| DispatchError::Synthesis {
                operation: operation.to_string(),
                source,
            })?;
        drop(context);

        debug!(
            class = class.name(),
            operation = %operation,
            rule = rule.label().unwrap_or("<unlabeled>"),
            "resolved missing operation"
        );
        class.install(operation.clone(), implementation);

        self.receiver.call_with_block(operation.as_str(), args, block)
    }

    /// NO-MATCH: the nearest fallback in the lineage answers, or the call
    /// is unresolved.
    fn delegate_to_fallback(
        &self,
        operation: &OperationName,
        args: &[Value],
        block: Option<&Block>,
    ) -> Result<Value, DispatchError> {
        let class = self.receiver.class();
        for level in class.lineage() {
            if let Some(fallback) = level.fallback() {
                debug!(
                    class = class.name(),
                    fallback_class = level.name(),
                    operation = %operation,
                    "no rule matched; delegating to fallback"
                );
                return fallback.handle(self.receiver, operation, args, block);
            }
        }
        debug!(class = class.name(), operation = %operation, "no rule or fallback");
        Err(DispatchError::Unresolved {
            operation: operation.to_string(),
            type_name: class.name().to_string(),
        })
    }
}
