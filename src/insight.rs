//! Insight generation: a single DFS traversal of the finalized scan tree
//! that feeds every node through the compiled ruleset, keeps a bounded
//! per-category top-K, and tallies unbounded aggregate stats.

use crate::config::{AppConfig, InsightCategory, PatternRule};
use crate::pattern::compile_ruleset;
use crate::tree::{NodeKind, ScanNode};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// A classification record attached to one path: why it was flagged, and
/// the finalized size/usage it carried at the time of the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub path: String,
    pub size_bytes: u64,
    pub disk_usage: u64,
    pub category: InsightCategory,
    pub summary: String,
    pub kind: NodeKind,
}

/// Unbounded per-category totals: every match counts here, regardless of
/// whether it made the bounded top-K kept in [`InsightBundle::insights`].
#[derive(Debug, Clone, Default)]
pub struct CategoryStats {
    pub count: u64,
    pub size_bytes: u64,
    pub disk_usage: u64,
    pub paths: HashSet<String>,
}

/// The result of [`generate_insights`]: a disk_usage-descending ranked list
/// (bounded per category at `config.max_insights_per_category`) plus
/// unbounded per-category aggregate stats.
#[derive(Debug, Clone)]
pub struct InsightBundle {
    pub insights: Vec<Insight>,
    pub by_category: HashMap<InsightCategory, CategoryStats>,
}

/// Heap entries order by `(disk_usage, path)` ascending so a [`BinaryHeap`]
/// behaves as a bounded min-heap: the smallest retained entry is evicted
/// first, with `path` breaking ties when `disk_usage` matches.
struct HeapEntry {
    disk_usage: u64,
    path: String,
    insight: Insight,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.disk_usage == other.disk_usage && self.path == other.path
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Keyed on (disk_usage, path), both ascending, then reversed so the
        // smallest tuple sorts greatest: BinaryHeap::peek returns the
        // greatest element, and the smallest tuple is what a bounded
        // min-heap must surface as its eviction candidate. The path
        // tiebreaker keeps eviction deterministic when disk_usage ties.
        (other.disk_usage, &other.path).cmp(&(self.disk_usage, &self.path))
    }
}

/// Push `insight` into a bounded min-heap, deduplicating by path.
///
/// `seen` tracks the highest `disk_usage` recorded per path so far; an
/// insight for a path already seen at an equal-or-higher usage is dropped.
/// Stale (superseded) entries may remain in the heap, they are filtered
/// out when [`generate_insights`] extracts the final sorted list.
fn heap_push(heap: &mut BinaryHeap<HeapEntry>, seen: &mut HashMap<String, u64>, insight: Insight, max_size: usize) {
    if let Some(&prev_usage) = seen.get(&insight.path) {
        if insight.disk_usage <= prev_usage {
            return;
        }
    }
    seen.insert(insight.path.clone(), insight.disk_usage);
    let entry = HeapEntry {
        disk_usage: insight.disk_usage,
        path: insight.path.clone(),
        insight,
    };
    if heap.len() < max_size {
        heap.push(entry);
    } else if let Some(top) = heap.peek() {
        if entry.disk_usage > top.disk_usage {
            heap.pop();
            heap.push(entry);
        }
    }
}

fn insight_from_rule(node: &ScanNode, rule: &PatternRule) -> Insight {
    Insight {
        path: node.path.clone(),
        size_bytes: node.size_bytes,
        disk_usage: node.disk_usage,
        category: rule.category,
        summary: rule.name.clone(),
        kind: node.kind,
    }
}

/// Walk the finalized scan tree and produce an [`InsightBundle`].
///
/// 1. Synthesize one [`PatternRule`] per `(category, base_path)` in
///    `config.additional_paths`, registered in the `additional` tier of the
///    compiled ruleset.
/// 2. Compile every rule (configured patterns plus the synthesized ones)
///    into a [`crate::pattern::CompiledRuleSet`].
/// 3. A single iterative DFS: match each node, record matches into
///    per-category bounded min-heaps and unbounded aggregate counters,
///    pruning subtrees under TEMP/CACHE matches and under
///    `stop_recursion`-tagged matches.
/// 4. Flatten and dedup the heaps into one disk_usage-descending list.
#[must_use]
pub fn generate_insights(root: &ScanNode, config: &AppConfig) -> InsightBundle {
    let mut additional_paths: Vec<(String, PatternRule)> = Vec::new();
    for (category, bases) in &config.additional_paths {
        for raw_base in bases {
            let base = raw_base.trim_end_matches('/').to_lowercase();
            additional_paths.push((
                base.clone(),
                PatternRule::new(format!("Additional {} path", category.label().to_lowercase()), base, *category),
            ));
        }
    }

    let ruleset = compile_ruleset(&config.patterns, &additional_paths);

    let max_size = config.max_insights_per_category as usize;
    let mut heaps: HashMap<InsightCategory, BinaryHeap<HeapEntry>> =
        InsightCategory::all().into_iter().map(|c| (c, BinaryHeap::new())).collect();
    let mut seen: HashMap<InsightCategory, HashMap<String, u64>> =
        InsightCategory::all().into_iter().map(|c| (c, HashMap::new())).collect();
    let mut by_category: HashMap<InsightCategory, CategoryStats> =
        InsightCategory::all().into_iter().map(|c| (c, CategoryStats::default())).collect();

    // Stack entries carry whether an ancestor already matched TEMP/CACHE:
    // such a subtree's size is already captured by the ancestor's insight,
    // so descending further would only inflate category counters.
    let mut stack: Vec<(&ScanNode, bool)> = vec![(root, false)];

    while let Some((node, in_temp_or_cache)) = stack.pop() {
        if in_temp_or_cache {
            continue;
        }

        let lpath = node.path.to_lowercase();
        let lbase = node.name.to_lowercase();
        let is_dir = node.is_dir();

        let matched_rules = ruleset.match_all(&lpath, &lbase, is_dir, &node.path);

        let mut local_in_temp_cache = false;
        let mut stop_recursion = false;
        for rule in &matched_rules {
            let insight = insight_from_rule(node, rule);
            let stats = by_category.get_mut(&rule.category).expect("every category has a stats entry");
            stats.count += 1;
            stats.size_bytes += insight.size_bytes;
            stats.disk_usage += insight.disk_usage;
            stats.paths.insert(insight.path.clone());
            heap_push(
                heaps.get_mut(&rule.category).expect("every category has a heap"),
                seen.get_mut(&rule.category).expect("every category has a seen map"),
                insight,
                max_size,
            );

            if matches!(rule.category, InsightCategory::Temp | InsightCategory::Cache) {
                local_in_temp_cache = true;
            }
            if rule.stop_recursion {
                stop_recursion = true;
            }
        }

        if is_dir {
            if stop_recursion {
                continue;
            }
            // Children are sorted disk_usage-descending by finalize_sizes;
            // push in reverse so popping the LIFO stack visits them in that
            // original, largest-first order.
            for child in node.children.iter().rev() {
                stack.push((child, local_in_temp_cache));
            }
        }
    }

    let mut all_insights: Vec<Insight> = Vec::new();
    for category in InsightCategory::all() {
        let mut entries: Vec<HeapEntry> = heaps.remove(&category).unwrap_or_default().into_vec();
        entries.sort_by(|a, b| b.disk_usage.cmp(&a.disk_usage));
        let mut cat_seen: HashSet<String> = HashSet::new();
        for entry in entries {
            if cat_seen.insert(entry.path.clone()) {
                all_insights.push(entry.insight);
            }
        }
    }
    all_insights.sort_by(|a, b| b.disk_usage.cmp(&a.disk_usage));

    InsightBundle {
        insights: all_insights,
        by_category,
    }
}

/// Keep only the insights whose category is in `categories`.
#[must_use]
pub fn filter_insights<'a>(bundle: &'a InsightBundle, categories: &HashSet<InsightCategory>) -> Vec<&'a Insight> {
    bundle.insights.iter().filter(|insight| categories.contains(&insight.category)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternRule;
    use crate::tree::finalize_sizes;

    fn file(path: &str, name: &str, size: u64) -> ScanNode {
        ScanNode::file(path, name, size, size)
    }

    #[test]
    fn stop_recursion_prunes_descendants_and_dedups_the_match() {
        let inner = file("/r/node_modules/pkg/a.js", "a.js", 10);
        let mut pkg = ScanNode::directory("/r/node_modules/pkg", "pkg");
        pkg.children.push(inner);
        let mut nm = ScanNode::directory("/r/node_modules", "node_modules");
        nm.children.push(pkg);
        let mut root = ScanNode::directory("/r", "r");
        root.children.push(nm);
        finalize_sizes(&mut root);

        let mut config = AppConfig {
            patterns: vec![PatternRule::new("nm", "**/node_modules/**", InsightCategory::BuildArtifact).stopping()],
            ..AppConfig::default()
        };
        config.max_insights_per_category = 10;

        let bundle = generate_insights(&root, &config);
        let matched: Vec<&str> = bundle.insights.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(matched, vec!["/r/node_modules"]);
        assert_eq!(bundle.by_category[&InsightCategory::BuildArtifact].count, 1);
    }

    #[test]
    fn heap_push_ties_break_on_path_for_deterministic_eviction() {
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
        let mut seen: HashMap<String, u64> = HashMap::new();

        let insight = |path: &str, disk_usage: u64| Insight {
            path: path.to_owned(),
            size_bytes: disk_usage,
            disk_usage,
            category: InsightCategory::Temp,
            summary: "test".to_owned(),
            kind: NodeKind::File,
        };

        // A and B tie on disk_usage; B's path sorts first lexicographically,
        // so B is the eviction candidate once C forces the heap over size 2.
        heap_push(&mut heap, &mut seen, insight("/z", 10), 2);
        heap_push(&mut heap, &mut seen, insight("/a", 10), 2);
        heap_push(&mut heap, &mut seen, insight("/m", 20), 2);

        let mut remaining: Vec<&str> = heap.iter().map(|e| e.path.as_str()).collect();
        remaining.sort_unstable();
        assert_eq!(remaining, vec!["/m", "/z"]);
    }

    #[test]
    fn heap_eviction_keeps_only_the_largest_k() {
        let mut root = ScanNode::directory("/r", "r");
        let mut tmp = ScanNode::directory("/r/tmp", "tmp");
        for i in 0..20u64 {
            tmp.children.push(file(&format!("/r/tmp/{i}.log"), &format!("{i}.log"), i * 10));
        }
        root.children.push(tmp);
        finalize_sizes(&mut root);

        let mut config = AppConfig {
            patterns: vec![PatternRule::new("logs", "**/*.log", InsightCategory::Temp)],
            ..AppConfig::default()
        };
        config.max_insights_per_category = 5;

        let bundle = generate_insights(&root, &config);
        let temp_insights: Vec<&Insight> = bundle.insights.iter().filter(|i| i.category == InsightCategory::Temp).collect();
        assert_eq!(temp_insights.len(), 5);
        assert!(temp_insights.iter().all(|i| i.disk_usage >= 100));
    }

    #[test]
    fn filter_insights_keeps_only_requested_categories() {
        let mut root = ScanNode::directory("/r", "r");
        root.children.push(file("/r/a.log", "a.log", 10));
        root.children.push(file("/r/b.tmp", "b.tmp", 20));
        finalize_sizes(&mut root);

        let config = AppConfig {
            patterns: vec![
                PatternRule::new("logs", "**/*.log", InsightCategory::Temp),
                PatternRule::new("tmps", "**/*.tmp", InsightCategory::Temp),
            ],
            ..AppConfig::default()
        };
        let bundle = generate_insights(&root, &config);
        let only_cache: HashSet<InsightCategory> = [InsightCategory::Cache].into_iter().collect();
        assert!(filter_insights(&bundle, &only_cache).is_empty());
        let only_temp: HashSet<InsightCategory> = [InsightCategory::Temp].into_iter().collect();
        assert_eq!(filter_insights(&bundle, &only_temp).len(), 2);
    }
}
