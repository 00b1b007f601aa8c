//! Rulebook document shapes.
//!
//! ```toml
//! [[class]]
//! name = "Record"
//! fields = { x = 1 }
//! fallback = { constant = 10 }
//! operations = { hello = { constant = "hi" } }
//!
//! [[class.rule]]
//! label = "reader"
//! match = { regex = "^get_(?P<attr>\\w+)$" }
//! produce = { field = "{attr}", default = 0 }
//! ```

use crate::error::RulebookError;
use beaver_kernel::{Specification, Value};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rulebook {
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassDecl>,
}

impl Rulebook {
    pub fn from_toml_str(source: &str) -> Result<Self, RulebookError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, RulebookError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load a rulebook, picking the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulebookError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| RulebookError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let rulebook = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source)?,
            Some("json") => Self::from_json_str(&source)?,
            _ => return Err(RulebookError::UnsupportedFormat(path.display().to_string())),
        };
        tracing::debug!(
            path = %path.display(),
            classes = rulebook.classes.len(),
            "loaded rulebook"
        );
        Ok(rulebook)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassDecl {
    pub name: String,

    /// Must name a class declared earlier in the same rulebook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default)]
    pub inherit_rules: bool,

    #[serde(default)]
    pub fields: BTreeMap<String, Value>,

    /// Native operations, compiled when the class is built.
    #[serde(default)]
    pub operations: BTreeMap<String, SpecDecl>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<SpecDecl>,

    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleDecl>,
}

/// One `[[class.rule]]` entry. Missing pieces surface as configuration
/// errors from the kernel when the rule is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub matcher: Option<MatchDecl>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produce: Option<SpecDecl>,
}

/// How a rule decides whether it applies to an operation name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum MatchDecl {
    Exact(String),
    /// Stores the remainder in slot `rest`.
    Prefix(String),
    /// Stores the stem in slot `stem`.
    Suffix(String),
    /// Stores every named capture group in the slot of the same name. The
    /// group name `operation` is reserved.
    Regex(String),
    Any(bool),
}

/// A produce template, written as a table with exactly one kind key.
///
/// String positions may contain `{slot}` placeholders; see
/// [`render`](crate::template::render).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecDecl {
    /// A present `null` is a nil constant, not a missing key.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub constant: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Only valid together with `field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<usize>,
    #[serde(default)]
    pub arguments: bool,
    #[serde(default)]
    pub operation_name: bool,
    #[serde(default)]
    pub receiver_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<String>,
    #[serde(default)]
    pub yield_block: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<SpecDecl>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl SpecDecl {
    /// Convert into a kernel specification whose strings are still
    /// unrendered templates.
    pub fn to_specification(&self) -> Result<Specification, String> {
        let mut kinds: Vec<(&'static str, Specification)> = Vec::new();

        if let Some(value) = &self.constant {
            kinds.push(("constant", Specification::Constant(value.clone())));
        }
        if let Some(name) = &self.field {
            kinds.push((
                "field",
                Specification::Field {
                    name: name.clone(),
                    default: self.default.clone().unwrap_or_default(),
                },
            ));
        } else if self.default.is_some() {
            return Err("`default` is only valid together with `field`".to_string());
        }
        if let Some(name) = &self.set_field {
            kinds.push(("set_field", Specification::SetField(name.clone())));
        }
        if let Some(index) = self.argument {
            kinds.push(("argument", Specification::Argument(index)));
        }
        if self.arguments {
            kinds.push(("arguments", Specification::Arguments));
        }
        if self.operation_name {
            kinds.push(("operation_name", Specification::OperationName));
        }
        if self.receiver_id {
            kinds.push(("receiver_id", Specification::ReceiverId));
        }
        if let Some(target) = &self.delegate {
            kinds.push(("delegate", Specification::Delegate(target.clone())));
        }
        if self.yield_block {
            kinds.push(("yield_block", Specification::YieldBlock));
        }
        if let Some(steps) = &self.sequence {
            let steps = steps
                .iter()
                .map(SpecDecl::to_specification)
                .collect::<Result<Vec<_>, _>>()?;
            kinds.push(("sequence", Specification::Sequence(steps)));
        }
        if let Some(message) = &self.fail {
            kinds.push(("fail", Specification::Fail(message.clone())));
        }

        match kinds.len() {
            0 => Err("produce template must set exactly one kind, got none".to_string()),
            1 => Ok(kinds.remove(0).1),
            _ => {
                let names: Vec<&str> = kinds.iter().map(|(name, _)| *name).collect();
                Err(format!(
                    "produce template must set exactly one kind, got {}",
                    names.join(", ")
                ))
            }
        }
    }
}
