//! Building live kernel types from a rulebook.

use crate::decl::{ClassDecl, RuleDecl, Rulebook, SpecDecl};
use crate::error::RulebookError;
use crate::matcher::CompiledMatcher;
use crate::template::render;
use beaver_kernel::{
    Class, ConfigurationError, Context, DispatchError, Fallback, Implementation, OperationName,
    Rule, Specification, SynthesisError,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Types built from one rulebook, keyed by name, in declaration order.
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: BTreeMap<String, Arc<Class>>,
    order: Vec<String>,
}

/// Load a rulebook file and build its types.
pub fn load_table(path: impl AsRef<Path>) -> Result<ClassTable, RulebookError> {
    let rulebook = Rulebook::load(path)?;
    ClassTable::from_rulebook(&rulebook)
}

impl ClassTable {
    pub fn from_rulebook(rulebook: &Rulebook) -> Result<Self, RulebookError> {
        let mut table = ClassTable::default();
        for decl in &rulebook.classes {
            if table.classes.contains_key(&decl.name) {
                return Err(RulebookError::DuplicateClass(decl.name.clone()));
            }
            let class = table.build_class(decl)?;
            tracing::debug!(
                class = %decl.name,
                rules = decl.rules.len(),
                operations = decl.operations.len(),
                "built class from rulebook"
            );
            table.order.push(decl.name.clone());
            table.classes.insert(decl.name.clone(), class);
        }
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Class>> {
        self.classes.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Arc<Class>, RulebookError> {
        self.get(name)
            .ok_or_else(|| RulebookError::UnknownClass(name.to_string()))
    }

    /// Classes in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<Class>> {
        self.order.iter().filter_map(|name| self.classes.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn build_class(&self, decl: &ClassDecl) -> Result<Arc<Class>, RulebookError> {
        let mut builder = Class::builder(decl.name.clone());

        if let Some(parent) = &decl.parent {
            let parent_class = self.classes.get(parent).ok_or_else(|| {
                RulebookError::UnknownParent {
                    class: decl.name.clone(),
                    parent: parent.clone(),
                }
            })?;
            builder = builder.parent(Arc::clone(parent_class));
        }
        if decl.inherit_rules {
            builder = builder.inherit_rules();
        }
        for (name, value) in &decl.fields {
            builder = builder.field(name.clone(), value.clone());
        }
        for (name, spec) in &decl.operations {
            builder = builder.native(name.clone(), native_operation(&decl.name, name, spec)?);
        }
        if let Some(spec) = &decl.fallback {
            builder = builder.fallback(fallback(&decl.name, spec)?);
        }
        for (index, rule) in decl.rules.iter().enumerate() {
            builder = builder.rule(build_rule(&decl.name, index, rule)?);
        }
        Ok(builder.build())
    }
}

fn native_operation(
    class: &str,
    operation: &str,
    spec: &SpecDecl,
) -> Result<Implementation, RulebookError> {
    let invalid = |reason: String| RulebookError::InvalidOperation {
        class: class.to_string(),
        operation: operation.to_string(),
        reason,
    };
    let name = OperationName::new(operation);
    let template = spec.to_specification().map_err(invalid)?;
    let rendered = render(&template, &Context::detached(name.clone()))
        .map_err(|err| invalid(err.to_string()))?;
    rendered.compile(&name).map_err(|err| invalid(err.to_string()))
}

/// A fallback renders and compiles its template per call, against the name
/// that fell through.
fn fallback(class: &str, spec: &SpecDecl) -> Result<Fallback, RulebookError> {
    let template = spec
        .to_specification()
        .map_err(|reason| RulebookError::InvalidOperation {
            class: class.to_string(),
            operation: "fallback".to_string(),
            reason,
        })?;
    Ok(Fallback::new(move |receiver, operation, args, block| {
        let synthesis = |source: SynthesisError| DispatchError::Synthesis {
            operation: operation.to_string(),
            source,
        };
        let context = Context::detached(operation.clone());
        let rendered = render(&template, &context).map_err(synthesis)?;
        let implementation = rendered.compile(operation).map_err(synthesis)?;
        implementation.invoke(receiver, args, block)
    }))
}

fn build_rule(class: &str, index: usize, decl: &RuleDecl) -> Result<Rule, RulebookError> {
    let label = decl
        .label
        .clone()
        .unwrap_or_else(|| format!("{class}#{index}"));
    let invalid = |source: ConfigurationError| RulebookError::InvalidRule {
        class: class.to_string(),
        label: label.clone(),
        source,
    };
    let reject = |reason: String| {
        invalid(ConfigurationError::Invalid {
            label: label.clone(),
            reason,
        })
    };

    let matcher = decl
        .matcher
        .as_ref()
        .map(CompiledMatcher::compile)
        .transpose()
        .map_err(|err| reject(format!("invalid matcher: {err}")))?;
    let template: Option<Specification> = decl
        .produce
        .as_ref()
        .map(SpecDecl::to_specification)
        .transpose()
        .map_err(reject)?;

    Rule::configure(|rule| {
        rule.label(label.clone());
        if let Some(matcher) = matcher {
            rule.matcher(move |ctx| matcher.evaluate(ctx));
        }
        if let Some(template) = template {
            rule.specification_producer(move |ctx| render(&template, ctx));
        }
    })
    .map_err(invalid)
}
