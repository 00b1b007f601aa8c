use beaver_kernel::{Class, Origin, Value};
use beaver_rulebook::{ClassTable, load_table};
use std::sync::Arc;

/// Exit status when a rulebook cannot be loaded or the command line is unusable.
pub const EXIT_SETUP: i32 = 1;
/// Exit status when at least one call failed.
pub const EXIT_CALL_FAILED: i32 = 2;

/// One `name` or `name:<json array>` argument from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub operation: String,
    pub args: Vec<Value>,
}

pub fn parse_invocation(raw: &str) -> Result<Invocation, String> {
    let (operation, args) = match raw.split_once(':') {
        Some((operation, encoded)) => {
            let args: Vec<Value> = serde_json::from_str(encoded)
                .map_err(|e| format!("arguments for `{operation}` must be a JSON array: {e}"))?;
            (operation, args)
        }
        None => (raw, Vec::new()),
    };
    if operation.is_empty() {
        return Err(format!("missing operation name in `{raw}`"));
    }
    Ok(Invocation {
        operation: operation.to_string(),
        args,
    })
}

pub fn parse_invocations_or_exit(raw: &[String]) -> Vec<Invocation> {
    raw.iter()
        .map(|item| {
            parse_invocation(item).unwrap_or_else(|e| {
                eprintln!("error: {e}");
                std::process::exit(EXIT_SETUP);
            })
        })
        .collect()
}

pub fn load_table_or_exit(path: &str) -> ClassTable {
    load_table(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load rulebook at {path}: {e}");
        std::process::exit(EXIT_SETUP);
    })
}

pub fn require_class_or_exit(table: &ClassTable, name: &str) -> Arc<Class> {
    table.require(name).map(Arc::clone).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(EXIT_SETUP);
    })
}

pub fn origin_name(origin: Origin) -> &'static str {
    match origin {
        Origin::Native => "native",
        Origin::Rule => "rule",
        Origin::Synthesized => "synthesized",
    }
}

pub fn print_json(payload: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}
