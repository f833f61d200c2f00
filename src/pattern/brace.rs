//! Brace expansion: `pat{a,b,c}suf` → `pata.suf, patb.suf, patc.suf`.
//!
//! Expansion is recursive, so nested/multiple brace groups all get expanded,
//! and a pattern with no `{...}` expands to itself unchanged; unmatched
//! braces pass through untouched rather than erroring.

/// Expand every `{...}` group in `pattern`, recursively.
#[must_use]
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(start) = pattern.find('{') else {
        return vec![pattern.to_owned()];
    };
    let Some(end_rel) = pattern[start + 1..].find('}') else {
        return vec![pattern.to_owned()];
    };
    let end = start + 1 + end_rel;

    let prefix = &pattern[..start];
    let choices = &pattern[start + 1..end];
    let suffix = &pattern[end + 1..];

    let mut expanded = Vec::new();
    for choice in choices.split(',') {
        let candidate = format!("{prefix}{choice}{suffix}");
        expanded.extend(expand_braces(&candidate));
    }
    expanded
}
