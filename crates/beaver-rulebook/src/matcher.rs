//! Matchers compiled from rulebook declarations.

use crate::decl::MatchDecl;
use crate::error::MatcherError;
use crate::template::OPERATION_PLACEHOLDER;
use beaver_kernel::Context;
use regex::Regex;

pub const REST_SLOT: &str = "rest";
pub const STEM_SLOT: &str = "stem";

#[derive(Debug, Clone)]
pub enum CompiledMatcher {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Regex(Regex),
    Any(bool),
}

impl CompiledMatcher {
    /// Named groups become slots, so a group may not be called `operation`.
    pub fn compile(decl: &MatchDecl) -> Result<Self, MatcherError> {
        Ok(match decl {
            MatchDecl::Exact(name) => CompiledMatcher::Exact(name.clone()),
            MatchDecl::Prefix(prefix) => CompiledMatcher::Prefix(prefix.clone()),
            MatchDecl::Suffix(suffix) => CompiledMatcher::Suffix(suffix.clone()),
            MatchDecl::Regex(pattern) => {
                let regex = Regex::new(pattern)?;
                if regex
                    .capture_names()
                    .flatten()
                    .any(|group| group == OPERATION_PLACEHOLDER)
                {
                    return Err(MatcherError::ReservedGroup(OPERATION_PLACEHOLDER.to_string()));
                }
                CompiledMatcher::Regex(regex)
            }
            MatchDecl::Any(any) => CompiledMatcher::Any(*any),
        })
    }

    /// Test the context's operation name, writing captures into slots.
    pub fn evaluate(&self, context: &mut Context) -> bool {
        let name = context.operation_name().as_str().to_string();
        match self {
            CompiledMatcher::Exact(expected) => name == *expected,
            CompiledMatcher::Prefix(prefix) => match name.strip_prefix(prefix.as_str()) {
                Some(rest) => {
                    context.set(REST_SLOT, rest);
                    true
                }
                None => false,
            },
            CompiledMatcher::Suffix(suffix) => match name.strip_suffix(suffix.as_str()) {
                Some(stem) => {
                    context.set(STEM_SLOT, stem);
                    true
                }
                None => false,
            },
            CompiledMatcher::Regex(regex) => {
                let Some(captures) = regex.captures(&name) else {
                    return false;
                };
                for group in regex.capture_names().flatten() {
                    if let Some(found) = captures.name(group) {
                        context.set(group, found.as_str());
                    }
                }
                true
            }
            CompiledMatcher::Any(any) => *any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beaver_kernel::OperationName;

    fn ctx(name: &str) -> Context {
        Context::detached(OperationName::new(name))
    }

    #[test]
    fn prefix_and_suffix_capture() {
        let prefix = CompiledMatcher::compile(&MatchDecl::Prefix("get_".into())).unwrap();
        let mut hit = ctx("get_width");
        assert!(prefix.evaluate(&mut hit));
        assert_eq!(hit.get_str(REST_SLOT), Some("width"));
        assert!(!prefix.evaluate(&mut ctx("set_width")));

        let suffix = CompiledMatcher::compile(&MatchDecl::Suffix("_count".into())).unwrap();
        let mut hit = ctx("item_count");
        assert!(suffix.evaluate(&mut hit));
        assert_eq!(hit.get_str(STEM_SLOT), Some("item"));
    }

    #[test]
    fn regex_named_groups_become_slots() {
        let matcher = CompiledMatcher::compile(&MatchDecl::Regex(
            r"^(?P<verb>find|count)_by_(?P<attr>\w+)$".into(),
        ))
        .unwrap();
        let mut hit = ctx("find_by_name");
        assert!(matcher.evaluate(&mut hit));
        assert_eq!(hit.get_str("verb"), Some("find"));
        assert_eq!(hit.get_str("attr"), Some("name"));

        let mut miss = ctx("delete_by_name");
        assert!(!matcher.evaluate(&mut miss));
        assert_eq!(miss.slots().count(), 0);
    }

    #[test]
    fn invalid_regex_fails_to_compile() {
        assert!(CompiledMatcher::compile(&MatchDecl::Regex("(unclosed".into())).is_err());
    }

    #[test]
    fn operation_group_is_reserved() {
        let err = CompiledMatcher::compile(&MatchDecl::Regex(
            r"^get_(?P<operation>\w+)$".into(),
        ))
        .unwrap_err();
        assert!(matches!(err, MatcherError::ReservedGroup(ref name) if name == "operation"));
        assert_eq!(
            err.to_string(),
            "capture group `operation` is reserved for the operation name"
        );
    }

    #[test]
    fn exact_and_any() {
        let exact = CompiledMatcher::compile(&MatchDecl::Exact("aaa".into())).unwrap();
        assert!(exact.evaluate(&mut ctx("aaa")));
        assert!(!exact.evaluate(&mut ctx("aaaa")));
        let never = CompiledMatcher::compile(&MatchDecl::Any(false)).unwrap();
        assert!(!never.evaluate(&mut ctx("aaa")));
    }
}
