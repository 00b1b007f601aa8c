//! Rules: a matcher paired with a way to produce an implementation.
//!
//! A rule is built from a configuration block that must set a matcher and
//! exactly one producer kind:
//! - a ready-made [`Implementation`], installed as is, or
//! - a specification producer, whose [`Specification`] is compiled for the
//!   operation being resolved.
//!
//! Both the matcher and the producer receive the same [`Context`] during
//! one resolution attempt.

use crate::context::Context;
use crate::error::{ConfigurationError, SynthesisError};
use crate::implementation::{Implementation, Origin};
use crate::specification::Specification;
use std::fmt;
use std::sync::Arc;

pub type Matcher = Arc<dyn Fn(&mut Context) -> bool + Send + Sync>;

pub type SpecificationProducer =
    Arc<dyn Fn(&mut Context) -> Result<Specification, SynthesisError> + Send + Sync>;

#[derive(Clone)]
enum Producer {
    Direct(Implementation),
    Specification(SpecificationProducer),
}

/// Configuration block passed to [`Rule::configure`].
#[derive(Default)]
pub struct RuleConfig {
    label: Option<String>,
    matcher: Option<Matcher>,
    implementation: Option<Implementation>,
    specification_producer: Option<SpecificationProducer>,
}

impl RuleConfig {
    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    pub fn matcher(
        &mut self,
        matcher: impl Fn(&mut Context) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    pub fn implementation(&mut self, implementation: Implementation) -> &mut Self {
        self.implementation = Some(implementation);
        self
    }

    pub fn specification_producer(
        &mut self,
        producer: impl Fn(&mut Context) -> Result<Specification, SynthesisError>
        + Send
        + Sync
        + 'static,
    ) -> &mut Self {
        self.specification_producer = Some(Arc::new(producer));
        self
    }

    pub fn build(self) -> Result<Rule, ConfigurationError> {
        let matcher = self.matcher.ok_or(ConfigurationError::MissingMatcher)?;
        let producer = match (self.implementation, self.specification_producer) {
            (Some(implementation), None) => {
                Producer::Direct(implementation.with_origin(Origin::Rule))
            }
            (None, Some(producer)) => Producer::Specification(producer),
            (None, None) => return Err(ConfigurationError::MissingProducer),
            (Some(_), Some(_)) => return Err(ConfigurationError::ConflictingProducers),
        };
        Ok(Rule {
            label: self.label,
            matcher,
            producer,
        })
    }
}

/// An immutable matcher/producer pair registered on a type.
#[derive(Clone)]
pub struct Rule {
    label: Option<String>,
    matcher: Matcher,
    producer: Producer,
}

impl Rule {
    /// Build a rule from a configuration block.
    ///
    /// ```
    /// use beaver_kernel::{Rule, Specification, Value};
    ///
    /// let rule = Rule::configure(|rule| {
    ///     rule.label("readers")
    ///         .matcher(|ctx| ctx.operation_name().as_str().starts_with("get_"))
    ///         .specification_producer(|_| Ok(Specification::Constant(Value::Int(0))));
    /// })
    /// .unwrap();
    /// assert_eq!(rule.label(), Some("readers"));
    /// ```
    pub fn configure(block: impl FnOnce(&mut RuleConfig)) -> Result<Self, ConfigurationError> {
        let mut config = RuleConfig::default();
        block(&mut config);
        config.build()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether the rule carries a ready-made implementation.
    pub fn is_direct(&self) -> bool {
        matches!(self.producer, Producer::Direct(_))
    }

    /// Evaluate the matcher. Slot writes stay on `context`.
    pub fn matches(&self, context: &mut Context) -> bool {
        (self.matcher)(context)
    }

    /// Materialize the implementation for `context.operation_name()`.
    ///
    /// Only meaningful after [`Rule::matches`] returned true for the same
    /// context.
    pub fn produce(&self, context: &mut Context) -> Result<Implementation, SynthesisError> {
        match &self.producer {
            Producer::Direct(implementation) => Ok(implementation.clone()),
            Producer::Specification(producer) => {
                let specification = producer(context)?;
                specification.compile(context.operation_name())
            }
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("label", &self.label)
            .field("direct", &self.is_direct())
            .finish_non_exhaustive()
    }
}
