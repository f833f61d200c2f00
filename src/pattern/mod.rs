//! Glob pattern compilation and matching: brace expansion, matcher
//! classification, the Aho-Corasick automaton, and the compiled ruleset's
//! `match_all` hot loop.

mod automaton;
mod brace;
mod classify;
mod ruleset;

pub use automaton::Automaton;
pub use brace::expand_braces;
pub use classify::{classify, CompiledGlob, Matcher};
pub use ruleset::{compile_ruleset, CompiledRuleSet};
