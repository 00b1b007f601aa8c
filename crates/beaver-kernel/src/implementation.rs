//! Operation bodies.

use crate::error::DispatchError;
use crate::instance::Instance;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Trailing continuation handed to a call and forwarded unchanged on retry.
pub type Block = Arc<dyn Fn(&[Value]) -> Result<Value, DispatchError> + Send + Sync>;

type Body =
    dyn Fn(&Arc<Instance>, &[Value], Option<&Block>) -> Result<Value, DispatchError> + Send + Sync;

/// Where an installed implementation came from.
///
/// Informational only: dispatch treats every origin the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Defined with the type.
    Native,
    /// Supplied ready-made by a rule.
    Rule,
    /// Compiled from a [`Specification`](crate::Specification).
    Synthesized,
}

/// A callable operation body.
#[derive(Clone)]
pub struct Implementation {
    origin: Origin,
    body: Arc<Body>,
}

impl Implementation {
    pub fn new(
        body: impl Fn(&Arc<Instance>, &[Value], Option<&Block>) -> Result<Value, DispatchError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            origin: Origin::Native,
            body: Arc::new(body),
        }
    }

    /// An implementation that ignores its inputs and returns `value`.
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::new(move |_, _, _| Ok(value.clone()))
    }

    pub(crate) fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn invoke(
        &self,
        receiver: &Arc<Instance>,
        args: &[Value],
        block: Option<&Block>,
    ) -> Result<Value, DispatchError> {
        (self.body)(receiver, args, block)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
