//! Instances and the host dispatch path.

use crate::class::Class;
use crate::error::DispatchError;
use crate::implementation::Block;
use crate::operation::OperationName;
use crate::resolver::Resolver;
use crate::value::{InstanceId, Value};
use parking_lot::RwLock;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Deepest chain of nested dispatches allowed on one thread.
pub const MAX_DISPATCH_DEPTH: usize = 64;

thread_local! {
    static DISPATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of dispatch depth until dropped.
struct DepthGuard;

impl DepthGuard {
    fn enter(operation: &str) -> Result<Self, DispatchError> {
        DISPATCH_DEPTH.with(|depth| {
            if depth.get() >= MAX_DISPATCH_DEPTH {
                tracing::debug!(
                    operation,
                    limit = MAX_DISPATCH_DEPTH,
                    "dispatch nesting limit hit"
                );
                return Err(DispatchError::RecursionLimit {
                    operation: operation.to_string(),
                    limit: MAX_DISPATCH_DEPTH,
                });
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DISPATCH_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

pub struct Instance {
    id: InstanceId,
    class: Arc<Class>,
    fields: RwLock<BTreeMap<String, Value>>,
}

impl Instance {
    pub(crate) fn new(class: Arc<Class>) -> Arc<Self> {
        let fields = class.default_fields();
        Arc::new(Self {
            id: InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)),
            class,
            fields: RwLock::new(fields),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.read().get(name).cloned()
    }

    /// Write a field, returning the previous value.
    pub fn set_field(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.write().insert(name.into(), value)
    }

    pub fn fields(&self) -> BTreeMap<String, Value> {
        self.fields.read().clone()
    }

    pub fn call(self: &Arc<Self>, operation: &str, args: &[Value]) -> Result<Value, DispatchError> {
        self.call_with_block(operation, args, None)
    }

    /// Dispatch `operation`: static lookup first, the resolver on a miss.
    ///
    /// Nested dispatches on one thread are capped at
    /// [`MAX_DISPATCH_DEPTH`]; past it the call fails with
    /// [`DispatchError::RecursionLimit`].
    pub fn call_with_block(
        self: &Arc<Self>,
        operation: &str,
        args: &[Value],
        block: Option<&Block>,
    ) -> Result<Value, DispatchError> {
        let _depth = DepthGuard::enter(operation)?;
        if let Some(implementation) = self.class.lookup(operation) {
            return implementation.invoke(self, args, block);
        }
        Resolver::new(self).try_resolve(OperationName::new(operation), args, block)
    }

    /// Capability query: would a call to `operation` be answered?
    ///
    /// Never installs anything. Matchers do run, so this is only as
    /// side-effect free as the registered matchers are.
    pub fn responds_to(self: &Arc<Self>, operation: &str) -> bool {
        if self.class.lookup(operation).is_some() {
            return true;
        }
        let operation = OperationName::new(operation);
        let resolver = Resolver::new(self);
        resolver.can_resolve(&operation) || resolver.fallback_claims(&operation)
    }

    /// A callable handle for `operation`, if [`Instance::responds_to`]
    /// accepts it. Nothing is installed until the handle is invoked.
    pub fn method(self: &Arc<Self>, operation: &str) -> Result<BoundOperation, DispatchError> {
        if self.responds_to(operation) {
            Ok(BoundOperation {
                receiver: Arc::clone(self),
                operation: OperationName::new(operation),
            })
        } else {
            Err(DispatchError::Unresolved {
                operation: operation.to_string(),
                type_name: self.class.name().to_string(),
            })
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("class", &self.class.name())
            .finish_non_exhaustive()
    }
}

/// An operation bound to a receiver, as returned by [`Instance::method`].
#[derive(Debug, Clone)]
pub struct BoundOperation {
    receiver: Arc<Instance>,
    operation: OperationName,
}

impl BoundOperation {
    pub fn name(&self) -> &OperationName {
        &self.operation
    }

    pub fn receiver(&self) -> &Arc<Instance> {
        &self.receiver
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, DispatchError> {
        self.receiver.call(self.operation.as_str(), args)
    }

    pub fn call_with_block(&self, args: &[Value], block: &Block) -> Result<Value, DispatchError> {
        self.receiver
            .call_with_block(self.operation.as_str(), args, Some(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementation::Implementation;

    #[test]
    fn instances_get_distinct_ids_and_own_fields() {
        let class = Class::builder("Point").field("x", 0).build();
        let a = class.instantiate();
        let b = class.instantiate();
        assert_ne!(a.id(), b.id());

        a.set_field("x", Value::Int(5));
        assert_eq!(a.get_field("x"), Some(Value::Int(5)));
        assert_eq!(b.get_field("x"), Some(Value::Int(0)));
        assert!(a.get_field("z").is_none());
    }

    #[test]
    fn missing_operation_without_rules_is_unresolved() {
        let class = Class::builder("Plain")
            .native("present", Implementation::constant(true))
            .build();
        let instance = class.instantiate();

        assert_eq!(instance.call("present", &[]).expect("native"), Value::Bool(true));
        assert!(instance.responds_to("present"));
        assert!(!instance.responds_to("absent"));

        let err = instance.call("absent", &[]).unwrap_err();
        assert_eq!(
            err,
            DispatchError::Unresolved {
                operation: "absent".into(),
                type_name: "Plain".into(),
            }
        );
        assert!(instance.method("absent").unwrap_err().is_unresolved());
    }

    #[test]
    fn natives_receive_arguments_and_blocks() {
        let class = Class::builder("Adder")
            .native(
                "sum",
                Implementation::new(|_, args, block| {
                    let total: i64 = args.iter().filter_map(Value::as_int).sum();
                    match block {
                        Some(block) => block(&[Value::Int(total)]),
                        None => Ok(Value::Int(total)),
                    }
                }),
            )
            .build();
        let instance = class.instantiate();
        let args = [Value::Int(2), Value::Int(3)];
        assert_eq!(instance.call("sum", &args).expect("sum"), Value::Int(5));

        let double: Block = Arc::new(|args: &[Value]| -> Result<Value, DispatchError> {
            Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
        });
        let bound = instance.method("sum").expect("sum is defined");
        assert_eq!(
            bound.call_with_block(&args, &double).expect("sum with block"),
            Value::Int(10)
        );
    }
}
