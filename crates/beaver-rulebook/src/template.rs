//! Placeholder substitution for produce templates.
//!
//! `{name}` is replaced by the context slot `name`, rendered with
//! `Value`'s `Display`. `{operation}` always means the operation being
//! resolved. A placeholder naming an unset slot is a synthesis error, so a
//! rule whose matcher forgot to capture fails loudly instead of installing
//! a half-rendered operation.

use beaver_kernel::{Context, Specification, SynthesisError, Value};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const OPERATION_PLACEHOLDER: &str = "operation";

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex must compile")
    })
}

/// Render every string position of `template` against `context`.
pub fn render(template: &Specification, context: &Context) -> Result<Specification, SynthesisError> {
    Ok(match template {
        Specification::Constant(value) => Specification::Constant(render_value(value, context)?),
        Specification::Field { name, default } => Specification::Field {
            name: render_str(name, context)?,
            default: render_value(default, context)?,
        },
        Specification::SetField(name) => Specification::SetField(render_str(name, context)?),
        Specification::Delegate(target) => Specification::Delegate(render_str(target, context)?),
        Specification::Fail(message) => Specification::Fail(render_str(message, context)?),
        Specification::Sequence(steps) => Specification::Sequence(
            steps
                .iter()
                .map(|step| render(step, context))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Specification::Argument(_)
        | Specification::Arguments
        | Specification::OperationName
        | Specification::ReceiverId
        | Specification::YieldBlock => template.clone(),
    })
}

fn render_value(value: &Value, context: &Context) -> Result<Value, SynthesisError> {
    Ok(match value {
        Value::Str(s) => Value::Str(render_str(s, context)?),
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| render_value(item, context))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), render_value(item, context)?)))
                .collect::<Result<BTreeMap<_, _>, SynthesisError>>()?,
        ),
        Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Ref(_) => value.clone(),
    })
}

/// Substitute placeholders in one string.
pub fn render_str(template: &str, context: &Context) -> Result<String, SynthesisError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for captures in placeholder_re().captures_iter(template) {
        let whole = captures.get(0).expect("capture 0 is the whole match");
        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&lookup(&captures, context)?);
        last = whole.end();
    }
    rendered.push_str(&template[last..]);
    Ok(rendered)
}

fn lookup(captures: &Captures<'_>, context: &Context) -> Result<String, SynthesisError> {
    let name = &captures[1];
    if name == OPERATION_PLACEHOLDER {
        return Ok(context.operation_name().to_string());
    }
    context
        .get(name)
        .map(Value::to_string)
        .ok_or_else(|| SynthesisError::UnsetSlot(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beaver_kernel::OperationName;

    #[test]
    fn substitutes_slots_and_operation() {
        let mut ctx = Context::detached(OperationName::new("get_width"));
        ctx.set("rest", "width");
        ctx.set("n", 3);
        assert_eq!(
            render_str("{operation} reads {rest} x{n}", &ctx).unwrap(),
            "get_width reads width x3"
        );
        assert_eq!(render_str("no placeholders", &ctx).unwrap(), "no placeholders");
    }

    #[test]
    fn unset_slot_is_a_synthesis_error() {
        let ctx = Context::detached(OperationName::new("get_width"));
        assert_eq!(
            render_str("{attr}", &ctx).unwrap_err(),
            SynthesisError::UnsetSlot("attr".into())
        );
    }

    #[test]
    fn renders_nested_constants() {
        let mut ctx = Context::detached(OperationName::new("hello"));
        ctx.set("who", "world");
        let template = Specification::Sequence(vec![Specification::Constant(Value::List(vec![
            Value::Str("{operation}, {who}".into()),
            Value::Int(1),
        ]))]);
        assert_eq!(
            render(&template, &ctx).unwrap(),
            Specification::Sequence(vec![Specification::Constant(Value::List(vec![
                Value::Str("hello, world".into()),
                Value::Int(1),
            ]))])
        );
    }
}
