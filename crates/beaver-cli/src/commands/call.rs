use crate::support::{
    EXIT_CALL_FAILED, Invocation, load_table_or_exit, origin_name, parse_invocations_or_exit,
    print_json, require_class_or_exit,
};
use beaver_kernel::{Class, DispatchError, Instance, Origin, Value};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct CallReport {
    operation: String,
    args: Vec<Value>,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome {
    Ok {
        result: Value,
        /// This call attached a new implementation to the class.
        installed: bool,
        origin: Option<Origin>,
    },
    Error {
        kind: &'static str,
        error: String,
    },
}

pub fn run(rulebook: String, class: String, operations: Vec<String>, json_output: bool) {
    let invocations = parse_invocations_or_exit(&operations);
    let table = load_table_or_exit(&rulebook);
    let class = require_class_or_exit(&table, &class);
    let instance = class.instantiate();

    let reports: Vec<CallReport> = invocations
        .into_iter()
        .map(|invocation| call_one(&class, &instance, invocation))
        .collect();
    let failed = reports
        .iter()
        .filter(|report| matches!(report.outcome, Outcome::Error { .. }))
        .count();

    if json_output {
        print_json(&serde_json::json!({
            "rulebook": rulebook,
            "class": class.name(),
            "instance": instance.id().to_string(),
            "calls": reports,
            "failed": failed,
        }));
    } else {
        println!("beaver call {} {}", rulebook, class.name());
        println!("  Instance: {}", instance.id());
        for report in &reports {
            print_report(report);
        }
        if failed > 0 {
            println!("  Failed: {failed}");
        }
    }

    if failed > 0 {
        std::process::exit(EXIT_CALL_FAILED);
    }
}

fn call_one(class: &Arc<Class>, instance: &Arc<Instance>, invocation: Invocation) -> CallReport {
    let Invocation { operation, args } = invocation;
    let defined_before = class.defines(&operation);
    let outcome = match instance.call(&operation, &args) {
        Ok(result) => Outcome::Ok {
            result,
            installed: !defined_before && class.defines(&operation),
            origin: class
                .lookup(&operation)
                .map(|implementation| implementation.origin()),
        },
        Err(err) => {
            tracing::debug!(operation = %operation, error = %err, "call failed");
            Outcome::Error {
                kind: error_kind(&err),
                error: err.to_string(),
            }
        }
    };
    CallReport {
        operation,
        args,
        outcome,
    }
}

fn error_kind(err: &DispatchError) -> &'static str {
    match err {
        DispatchError::Unresolved { .. } => "unresolved",
        DispatchError::Synthesis { .. } => "synthesis",
        DispatchError::Raised { .. } => "raised",
        DispatchError::RecursionLimit { .. } => "recursion_limit",
    }
}

fn print_report(report: &CallReport) {
    match &report.outcome {
        Outcome::Ok {
            result,
            installed,
            origin,
        } => {
            let note = match (installed, origin) {
                (true, Some(origin)) => format!(" [installed, {}]", origin_name(*origin)),
                (true, None) => " [installed]".to_string(),
                (false, None) => " [fallback]".to_string(),
                (false, Some(_)) => String::new(),
            };
            println!("  {} => {result}{note}", report.operation);
        }
        Outcome::Error { error, .. } => println!("  {} !! {error}", report.operation),
    }
}
