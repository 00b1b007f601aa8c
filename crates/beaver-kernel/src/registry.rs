//! Per-type ordered rule lists.

use crate::rule::Rule;
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered, append-only list of rules owned by one type.
///
/// Insertion order is match priority. There is no removal or reordering.
#[derive(Debug, Default)]
pub struct Registry {
    rules: RwLock<Vec<Arc<Rule>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. No deduplication or validation against existing rules.
    pub fn append(&self, rule: Rule) {
        self.rules.write().push(Arc::new(rule));
    }

    /// Snapshot of the rules in insertion order.
    ///
    /// Matchers run against the snapshot, so a matcher that registers more
    /// rules does not deadlock and does not see its own additions.
    pub fn all(&self) -> Vec<Arc<Rule>> {
        self.rules.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Labels in insertion order; unlabeled rules show as `None`.
    pub fn labels(&self) -> Vec<Option<String>> {
        self.rules
            .read()
            .iter()
            .map(|rule| rule.label().map(str::to_string))
            .collect()
    }
}
