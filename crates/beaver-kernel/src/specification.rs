//! Typed synthesis templates.
//!
//! A specification producer describes the operation it wants instead of
//! handing over code. [`Specification::compile`] validates the description
//! and turns it into an [`Implementation`]; malformed descriptions fail with
//! a [`SynthesisError`] before anything is installed.

use crate::error::{DispatchError, SynthesisError};
use crate::implementation::{Implementation, Origin};
use crate::operation::OperationName;
use crate::value::Value;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specification {
    /// Return a fixed value.
    Constant(Value),

    /// Read a receiver field, falling back to `default` (nil when unset).
    Field {
        name: String,
        #[serde(default)]
        default: Value,
    },

    /// Store the first argument into a receiver field and return it.
    SetField(String),

    /// Return one positional argument, nil when missing.
    Argument(usize),

    /// Return every argument as a list.
    Arguments,

    /// Return the name the operation was resolved under.
    OperationName,

    /// Return a reference to the receiver being called.
    ReceiverId,

    /// Dispatch another operation on the receiver with the same arguments.
    Delegate(String),

    /// Hand the arguments to the trailing block; nil without a block.
    YieldBlock,

    /// Run each step in order and return the last result.
    Sequence(Vec<Specification>),

    /// Raise a domain error.
    Fail(String),
}

/// Whether `name` can be used as a field or operation name in a template.
pub fn is_identifier(name: &str) -> bool {
    identifier_re().is_match(name)
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\A[A-Za-z_][A-Za-z0-9_]*\z").expect("identifier regex must compile")
    })
}

impl Specification {
    /// Check the template against the operation it will be installed as.
    pub fn validate(&self, operation: &OperationName) -> Result<(), SynthesisError> {
        match self {
            Specification::Field { name, .. } | Specification::SetField(name) => {
                if !is_identifier(name) {
                    return Err(SynthesisError::InvalidFieldName(name.clone()));
                }
            }
            Specification::Delegate(target) => {
                if !is_identifier(target) {
                    return Err(SynthesisError::InvalidOperationName(target.clone()));
                }
                if target == operation.as_str() {
                    return Err(SynthesisError::SelfDelegation(target.clone()));
                }
            }
            Specification::Sequence(steps) => {
                if steps.is_empty() {
                    return Err(SynthesisError::EmptySequence);
                }
                for step in steps {
                    step.validate(operation)?;
                }
            }
            Specification::Constant(_)
            | Specification::Argument(_)
            | Specification::Arguments
            | Specification::OperationName
            | Specification::ReceiverId
            | Specification::YieldBlock
            | Specification::Fail(_) => {}
        }
        Ok(())
    }

    /// Compile into an implementation for `operation`.
    pub fn compile(self, operation: &OperationName) -> Result<Implementation, SynthesisError> {
        self.validate(operation)?;
        Ok(self.lower(operation).with_origin(Origin::Synthesized))
    }

    fn lower(self, operation: &OperationName) -> Implementation {
        match self {
            Specification::Constant(value) => Implementation::constant(value),
            Specification::Field { name, default } => Implementation::new(move |receiver, _, _| {
                Ok(receiver.get_field(&name).unwrap_or_else(|| default.clone()))
            }),
            Specification::SetField(name) => Implementation::new(move |receiver, args, _| {
                let value = args.first().cloned().unwrap_or_default();
                receiver.set_field(name.clone(), value.clone());
                Ok(value)
            }),
            Specification::Argument(index) => {
                Implementation::new(move |_, args, _| Ok(args.get(index).cloned().unwrap_or_default()))
            }
            Specification::Arguments => {
                Implementation::new(|_, args, _| Ok(Value::List(args.to_vec())))
            }
            Specification::OperationName => Implementation::constant(operation.as_str()),
            Specification::ReceiverId => {
                Implementation::new(|receiver, _, _| Ok(Value::Ref(receiver.id())))
            }
            Specification::Delegate(target) => Implementation::new(move |receiver, args, block| {
                receiver.call_with_block(&target, args, block)
            }),
            Specification::YieldBlock => Implementation::new(|_, args, block| match block {
                Some(block) => block(args),
                None => Ok(Value::Nil),
            }),
            Specification::Sequence(steps) => {
                let steps: Vec<Implementation> =
                    steps.into_iter().map(|step| step.lower(operation)).collect();
                Implementation::new(move |receiver, args, block| {
                    let mut last = Value::Nil;
                    for step in &steps {
                        last = step.invoke(receiver, args, block)?;
                    }
                    Ok(last)
                })
            }
            Specification::Fail(message) => {
                let operation = operation.to_string();
                Implementation::new(move |_, _, _| {
                    Err(DispatchError::raised(operation.clone(), message.clone()))
                })
            }
        }
    }
}
