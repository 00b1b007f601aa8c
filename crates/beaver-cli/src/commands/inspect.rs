use crate::support::{load_table_or_exit, origin_name, print_json};
use beaver_kernel::Class;
use serde_json::{Value, json};

pub fn run(rulebook: String, json_output: bool) {
    let table = load_table_or_exit(&rulebook);

    if json_output {
        let classes: Vec<Value> = table.classes().map(|class| describe(class)).collect();
        print_json(&json!({
            "rulebook": rulebook,
            "class_count": table.len(),
            "classes": classes,
        }));
        return;
    }

    println!("beaver inspect {rulebook}");
    println!("  Classes: {}", table.len());
    for class in table.classes() {
        match class.parent() {
            Some(parent) => println!("  {} < {}", class.name(), parent.name()),
            None => println!("  {}", class.name()),
        }
        if class.inherits_rules() {
            println!("    inherits rules");
        }
        if class.fallback().is_some() {
            println!("    fallback");
        }
        for (name, value) in class.default_fields() {
            println!("    field {name} = {value}");
        }
        for (name, origin) in class.installed_operations() {
            println!("    operation {name} ({})", origin_name(origin));
        }
        for label in rule_labels(class) {
            println!("    rule {label}");
        }
    }
}

fn describe(class: &Class) -> Value {
    let operations: Vec<Value> = class
        .installed_operations()
        .into_iter()
        .map(|(name, origin)| json!({ "name": name, "origin": origin }))
        .collect();
    json!({
        "name": class.name(),
        "parent": class.parent().map(|parent| parent.name().to_string()),
        "inherit_rules": class.inherits_rules(),
        "fallback": class.fallback().is_some(),
        "fields": class.default_fields(),
        "operations": operations,
        "rules": rule_labels(class),
    })
}

fn rule_labels(class: &Class) -> Vec<String> {
    class
        .registry()
        .labels()
        .into_iter()
        .enumerate()
        .map(|(index, label)| label.unwrap_or_else(|| format!("#{index}")))
        .collect()
}
