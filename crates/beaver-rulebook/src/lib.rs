//! # beaver-rulebook
//!
//! Declarative front end for the kernel:
//! - rulebook documents (`[[class]]` tables with fields, native operations,
//!   a fallback, and ordered `[[class.rule]]` entries) in TOML or JSON
//! - matchers that write captures into context slots
//! - produce templates whose `{slot}` placeholders are filled from the
//!   context at synthesis time
//! - a [`ClassTable`] of live kernel types built from a rulebook

pub mod decl;
pub mod error;
pub mod matcher;
pub mod table;
pub mod template;

pub use decl::{ClassDecl, MatchDecl, RuleDecl, Rulebook, SpecDecl};
pub use error::{MatcherError, RulebookError};
pub use matcher::CompiledMatcher;
pub use table::{ClassTable, load_table};
pub use template::render;
