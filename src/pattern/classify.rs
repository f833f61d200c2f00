//! Turns one expanded glob pattern into a fast matcher kind.
//!
//! All matcher values are lowercased at classification time so the hot loop
//! can compare against a pre-lowercased path with no further case-folding.

/// Result of classifying one expanded glob pattern.
///
/// `Contains` carries both an any-position key (`/segment/`) and an
/// end-anchored key (`/segment`, for paths ending in the segment without a
/// trailing separator, e.g. `/a/node_modules`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Exact(String),
    Contains { value: String, alt: String },
    EndsWith(String),
    StartsWith(String),
    Glob(String),
}

fn has_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}

/// Classify one already brace-expanded pattern.
#[must_use]
pub fn classify(pattern: &str) -> Matcher {
    let Some(rest) = pattern.strip_prefix("**/") else {
        return Matcher::Glob(pattern.to_lowercase());
    };

    if let Some(middle) = rest.strip_suffix("/**") {
        if !has_glob_chars(middle) {
            let mid = middle.to_lowercase();
            return Matcher::Contains {
                value: format!("/{mid}/"),
                alt: format!("/{mid}"),
            };
        }
        return Matcher::Glob(pattern.to_lowercase());
    }

    if let Some(tail) = rest.strip_prefix('*') {
        if !has_glob_chars(tail) {
            return Matcher::EndsWith(tail.to_lowercase());
        }
    }

    if let Some(head) = rest.strip_suffix('*') {
        if !has_glob_chars(head) {
            return Matcher::StartsWith(head.to_lowercase());
        }
    }

    if !has_glob_chars(rest) {
        return Matcher::Exact(rest.to_lowercase());
    }

    Matcher::Glob(pattern.to_lowercase())
}

/// fnmatch-style translation of a glob pattern (`*`, `?`, `[...]`, no `**`
/// traversal) into an anchored regex.
fn fnmatch_to_regex(pattern: &str) -> String {
    let mut out = String::from("(?s)^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::from("[");
                if matches!(chars.peek(), Some('!')) {
                    class.push('^');
                    chars.next();
                }
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next == ']' {
                        break;
                    }
                    if next == '\\' || next == '^' {
                        class.push('\\');
                    }
                    class.push(next);
                }
                class.push(']');
                out.push_str(&class);
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

/// A GLOB-tier matcher, precompiled once at ruleset build time rather than
/// per scanned node: `match_all` runs over every node in the tree, so
/// recompiling a regex on each call would be a real hot-loop cost.
pub struct CompiledGlob {
    /// Set when the source pattern ends in `/**`: matches the directory
    /// itself, not just descendants under it.
    base: Option<regex::Regex>,
    full: regex::Regex,
}

impl CompiledGlob {
    /// # Panics
    /// Never: `fnmatch_to_regex`'s output is always a valid regex.
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        let full = regex::Regex::new(&fnmatch_to_regex(pattern)).expect("fnmatch translation is always valid regex");
        let base = pattern
            .strip_suffix("/**")
            .map(|base_pattern| regex::Regex::new(&fnmatch_to_regex(base_pattern)).expect("fnmatch translation is always valid regex"));
        Self { base, full }
    }

    /// Fallback matcher for patterns too irregular to classify into a fast
    /// string operation. A pattern ending in `/**` also matches the
    /// directory named by the part before `/**` (not just its
    /// descendants).
    #[must_use]
    pub fn matches(&self, normalized_path: &str, basename: &str) -> bool {
        if let Some(base) = &self.base {
            if base.is_match(normalized_path) {
                return true;
            }
        }
        self.full.is_match(normalized_path) || self.full.is_match(basename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_exact() {
        assert_eq!(classify("**/thumbs.db"), Matcher::Exact("thumbs.db".to_owned()));
    }

    #[test]
    fn classifies_contains() {
        assert_eq!(
            classify("**/node_modules/**"),
            Matcher::Contains {
                value: "/node_modules/".to_owned(),
                alt: "/node_modules".to_owned(),
            }
        );
    }

    #[test]
    fn classifies_endswith() {
        assert_eq!(classify("**/*.log"), Matcher::EndsWith(".log".to_owned()));
    }

    #[test]
    fn classifies_startswith() {
        assert_eq!(classify("**/tmp_*"), Matcher::StartsWith("tmp_".to_owned()));
    }

    #[test]
    fn falls_back_to_glob_for_irregular_patterns() {
        assert_eq!(classify("**/*.ba?"), Matcher::Glob("**/*.ba?".to_owned()));
        assert_eq!(classify("/abs/path/*"), Matcher::Glob("/abs/path/*".to_owned()));
    }

    #[test]
    fn glob_fallback_matches_basename_and_full_path() {
        let glob = CompiledGlob::compile("*.ba?");
        assert!(glob.matches("/a/b/file.bak", "file.bak"));
        assert!(!glob.matches("/a/b/file.txt", "file.txt"));
    }

    #[test]
    fn glob_fallback_trailing_double_star_matches_directory_itself() {
        let glob = CompiledGlob::compile("/proj/build/**");
        assert!(glob.matches("/proj/build", "build"));
    }
}
