//! Compiles [`PatternRule`]s into a dispatch structure split by node kind,
//! and the hot-loop `match_all` query over it.

use super::automaton::Automaton;
use super::brace::expand_braces;
use super::classify::{classify, CompiledGlob, Matcher};
use crate::config::{InsightCategory, PatternRule};
use std::collections::HashMap;

/// Whether an Aho-Corasick hit must land exactly at the end of the path
/// (ENDSWITH, and the end-anchored form of CONTAINS) or may occur anywhere
/// (the any-position form of CONTAINS).
#[derive(Debug, Clone, Copy)]
struct AcEntry {
    rule_index: u32,
    end_only: bool,
}

/// All pattern rules for one node kind (file or dir), indexed by matcher
/// kind so `match_all` never branches on pattern shape.
#[derive(Default)]
pub struct ByKind {
    exact: HashMap<String, Vec<u32>>,
    ac: Option<Automaton<Vec<AcEntry>>>,
    startswith: Vec<(String, u32)>,
    glob: Vec<(CompiledGlob, u32)>,
    additional: Vec<(String, u32)>,
}

/// All pattern rules from every category, split by file/dir at compile
/// time, plus the owning list of rules referenced by index.
#[derive(Default)]
pub struct CompiledRuleSet {
    rules: Vec<PatternRule>,
    for_file: ByKind,
    for_dir: ByKind,
}

#[derive(Default)]
struct ByKindBuilder {
    exact: HashMap<String, Vec<u32>>,
    ac_entries: Vec<(String, String, u32)>,
    startswith: Vec<(String, u32)>,
    glob: Vec<(CompiledGlob, u32)>,
    additional: Vec<(String, u32)>,
}

impl ByKindBuilder {
    fn add(&mut self, matcher: &Matcher, rule_index: u32) {
        match matcher {
            Matcher::Exact(value) => self.exact.entry(value.clone()).or_default().push(rule_index),
            Matcher::Contains { value, alt } => self.ac_entries.push((value.clone(), alt.clone(), rule_index)),
            Matcher::EndsWith(value) => self.ac_entries.push((String::new(), value.clone(), rule_index)),
            Matcher::StartsWith(value) => self.startswith.push((value.clone(), rule_index)),
            Matcher::Glob(pattern) => self.glob.push((CompiledGlob::compile(pattern), rule_index)),
        }
    }

    fn build(self) -> ByKind {
        ByKind {
            exact: self.exact,
            ac: build_ac(self.ac_entries),
            startswith: self.startswith,
            glob: self.glob,
            additional: self.additional,
        }
    }
}

fn build_ac(entries: Vec<(String, String, u32)>) -> Option<Automaton<Vec<AcEntry>>> {
    if entries.is_empty() {
        return None;
    }
    let mut by_key: HashMap<String, Vec<AcEntry>> = HashMap::new();
    for (value, alt, rule_index) in entries {
        if !value.is_empty() {
            by_key.entry(value).or_default().push(AcEntry { rule_index, end_only: false });
        }
        if !alt.is_empty() {
            by_key.entry(alt).or_default().push(AcEntry { rule_index, end_only: true });
        }
    }
    let mut automaton = Automaton::new();
    for (key, value) in by_key {
        automaton.add_word(key, value).expect("building a fresh automaton never fails");
    }
    automaton.make_automaton().expect("building a fresh automaton exactly once never fails");
    Some(automaton)
}

/// Build a single [`CompiledRuleSet`] from every configured rule.
///
/// `additional_paths` are pre-normalized `(lowercased_base_path, rule)`
/// pairs synthesized by the insight generator for user-marked directories.
#[must_use]
pub fn compile_ruleset(rules: &[PatternRule], additional_paths: &[(String, PatternRule)]) -> CompiledRuleSet {
    let mut all_rules: Vec<PatternRule> = rules.to_vec();
    let mut file_builder = ByKindBuilder::default();
    let mut dir_builder = ByKindBuilder::default();

    // `all_rules`'s prefix mirrors `rules` index-for-index; additional-path
    // rules are appended (and indexed) after this loop.
    for (rule_index, rule) in rules.iter().enumerate() {
        let rule_index = rule_index as u32;
        for expanded in expand_braces(&rule.pattern) {
            let matcher = classify(&expanded);
            if rule.apply_to.matches_file() {
                file_builder.add(&matcher, rule_index);
            }
            if rule.apply_to.matches_dir() {
                dir_builder.add(&matcher, rule_index);
            }
        }
    }

    for (base, rule) in additional_paths {
        let rule_index = all_rules.len() as u32;
        all_rules.push(rule.clone());
        if rule.apply_to.matches_file() {
            file_builder.additional.push((base.clone(), rule_index));
        }
        if rule.apply_to.matches_dir() {
            dir_builder.additional.push((base.clone(), rule_index));
        }
    }

    CompiledRuleSet {
        rules: all_rules,
        for_file: file_builder.build(),
        for_dir: dir_builder.build(),
    }
}

impl CompiledRuleSet {
    #[must_use]
    pub fn rule(&self, index: u32) -> &PatternRule {
        &self.rules[index as usize]
    }

    /// Evaluate every tier (EXACT → AC → STARTSWITH → GLOB → additional) for
    /// one node, in order, keeping at most one match per
    /// [`InsightCategory`] (first tier to match for a category wins).
    ///
    /// `lpath`/`lbase` must already be lowercased; `raw_path` keeps its
    /// original case for additional-path prefix matching.
    #[must_use]
    pub fn match_all(&self, lpath: &str, lbase: &str, is_dir: bool, raw_path: &str) -> Vec<&PatternRule> {
        let bucket = if is_dir { &self.for_dir } else { &self.for_file };
        let mut matched: Vec<&PatternRule> = Vec::new();
        let mut seen: [bool; 3] = [false; 3];
        let category_slot = |category: InsightCategory| -> usize {
            match category {
                InsightCategory::Temp => 0,
                InsightCategory::Cache => 1,
                InsightCategory::BuildArtifact => 2,
            }
        };
        let try_rule = |rule_index: u32, matched: &mut Vec<&PatternRule>, seen: &mut [bool; 3]| {
            let rule = self.rule(rule_index);
            let slot = category_slot(rule.category);
            if !seen[slot] {
                seen[slot] = true;
                matched.push(rule);
            }
        };

        if let Some(hits) = bucket.exact.get(lbase) {
            for &rule_index in hits {
                try_rule(rule_index, &mut matched, &mut seen);
            }
        }

        if let Some(ac) = &bucket.ac {
            let end_of_path = lpath.len().saturating_sub(1);
            if let Ok(hits) = ac.find_overlapping(lpath.as_bytes()) {
                for (end_index, entries) in hits {
                    for entry in entries {
                        if entry.end_only && end_index != end_of_path {
                            continue;
                        }
                        try_rule(entry.rule_index, &mut matched, &mut seen);
                    }
                }
            }
        }

        for (prefix, rule_index) in &bucket.startswith {
            if lbase.starts_with(prefix.as_str()) {
                try_rule(*rule_index, &mut matched, &mut seen);
            }
        }

        for (glob, rule_index) in &bucket.glob {
            if glob.matches(lpath, lbase) {
                try_rule(*rule_index, &mut matched, &mut seen);
            }
        }

        for (base, rule_index) in &bucket.additional {
            if raw_path == base || raw_path.starts_with(&format!("{base}/")) {
                try_rule(*rule_index, &mut matched, &mut seen);
            }
        }

        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApplyTo;

    #[test]
    fn exact_contains_endswith_startswith_and_glob_each_fire() {
        let rules = vec![
            PatternRule::new("thumbs", "**/thumbs.db", InsightCategory::Cache),
            PatternRule::new("nm", "**/node_modules/**", InsightCategory::BuildArtifact).stopping(),
            PatternRule::new("logs", "**/*.log", InsightCategory::Temp),
            PatternRule::new("tmpfiles", "**/tmp_*", InsightCategory::Temp),
        ];
        let rs = compile_ruleset(&rules, &[]);

        let hits = rs.match_all("/a/thumbs.db", "thumbs.db", false, "/a/thumbs.db");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "thumbs");

        // CONTAINS matches anywhere the segment appears, with or without a
        // trailing separator; descendant-pruning under a stop_recursion
        // match is the insight traversal's job, not match_all's.
        let hits = rs.match_all("/a/node_modules/pkg", "pkg", true, "/a/node_modules/pkg");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "nm");
        let hits = rs.match_all("/a/node_modules", "node_modules", true, "/a/node_modules");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "nm");

        let hits = rs.match_all("/a/run.log", "run.log", false, "/a/run.log");
        assert_eq!(hits[0].name, "logs");

        let hits = rs.match_all("/a/tmp_file", "tmp_file", false, "/a/tmp_file");
        assert_eq!(hits[0].name, "tmpfiles");
    }

    #[test]
    fn first_match_per_category_wins() {
        let rules = vec![
            PatternRule::new("a", "**/*.log", InsightCategory::Temp),
            PatternRule::new("b", "**/app.log", InsightCategory::Temp),
        ];
        let rs = compile_ruleset(&rules, &[]);
        let hits = rs.match_all("/a/app.log", "app.log", false, "/a/app.log");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn apply_to_restricts_file_or_dir_bucket() {
        let rules = vec![PatternRule::new("f", "**/*.log", InsightCategory::Temp).applying_to(ApplyTo::File)];
        let rs = compile_ruleset(&rules, &[]);
        assert!(rs.match_all("/a/x.log", "x.log", false, "/a/x.log").len() == 1);
        assert!(rs.match_all("/a/x.log", "x.log", true, "/a/x.log").is_empty());
    }

    #[test]
    fn additional_paths_match_by_prefix() {
        let rule = PatternRule::new("Additional cache path", "/home/u/.cache", InsightCategory::Cache);
        let rs = compile_ruleset(&[], &[("/home/u/.cache".to_owned(), rule)]);
        let hits = rs.match_all("/home/u/.cache/pip", "pip", true, "/home/u/.cache/pip");
        assert_eq!(hits.len(), 1);
    }
}
