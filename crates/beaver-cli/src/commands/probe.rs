use crate::support::{load_table_or_exit, print_json, require_class_or_exit};
use serde_json::json;

pub fn run(rulebook: String, class: String, operations: Vec<String>, json_output: bool) {
    let table = load_table_or_exit(&rulebook);
    let class = require_class_or_exit(&table, &class);
    let instance = class.instantiate();

    let probes: Vec<(String, bool, bool)> = operations
        .into_iter()
        .map(|operation| {
            let defined = class.lookup(&operation).is_some();
            let responds = instance.responds_to(&operation);
            (operation, defined, responds)
        })
        .collect();

    if json_output {
        let rows: Vec<_> = probes
            .iter()
            .map(|(operation, defined, responds)| {
                json!({
                    "operation": operation,
                    "defined": defined,
                    "responds": responds,
                })
            })
            .collect();
        print_json(&json!({
            "rulebook": rulebook,
            "class": class.name(),
            "probes": rows,
        }));
    } else {
        println!("beaver probe {} {}", rulebook, class.name());
        for (operation, defined, responds) in &probes {
            let answer = match (defined, responds) {
                (true, _) => "defined",
                (false, true) => "resolvable",
                (false, false) => "no",
            };
            println!("  {operation}: {answer}");
        }
    }
}
