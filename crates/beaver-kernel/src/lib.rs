//! # Beaver Kernel
//!
//! Rule-driven resolution of missing operations: when an instance is asked
//! for an operation its type does not define, the type's ordered rules are
//! consulted, the first match materializes an implementation, that
//! implementation is installed on the type for good, and the original call
//! is dispatched again.
//!
//! ## Architecture
//!
//! ```text
//! Instance::call        ← Static lookup over the type lineage
//!     │ (miss)
//! Resolver              ← START → MATCHING → SYNTHESIZING → INSTALLED → RETRY
//!     │
//! Registry              ← Ordered, append-only Rules per type
//!     │
//! Rule                  ← Matcher + (Implementation | Specification producer)
//!     │
//! Context               ← Per-attempt scratchpad: name, receiver, slots
//!     │
//! Specification         ← Typed templates compiled into Implementations
//! ```
//!
//! Nothing is compiled from text. Producers return [`Specification`] values
//! and the kernel interprets them.

pub mod class;
pub mod context;
pub mod error;
pub mod implementation;
pub mod instance;
pub mod operation;
pub mod registry;
pub mod resolver;
pub mod rule;
pub mod specification;
pub mod value;

pub use class::{Class, ClassBuilder, Fallback};
pub use context::Context;
pub use error::{ConfigurationError, DispatchError, SynthesisError};
pub use implementation::{Block, Implementation, Origin};
pub use instance::{BoundOperation, Instance, MAX_DISPATCH_DEPTH};
pub use operation::OperationName;
pub use registry::Registry;
pub use resolver::Resolver;
pub use rule::{Rule, RuleConfig};
pub use specification::{Specification, is_identifier};
pub use value::{InstanceId, Value};
