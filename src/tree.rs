//! The scan result tree: [`ScanNode`] plus the bottom-up size pass that
//! turns raw per-file stats into aggregated directory totals.
//!
//! File nodes could share one empty children list to save an allocation,
//! but `Vec::new()` is already non-allocating until pushed to, so there is
//! no such trick to play here.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Whether a [`ScanNode`] represents a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Directory,
}

/// One entry in the scanned tree.
///
/// For files, `size_bytes`/`disk_usage` are the stat'd values and never
/// change after construction. For directories they start at zero and are
/// filled in by [`finalize_sizes`], which also sorts `children` by
/// `disk_usage` descending.
#[derive(Debug, Clone)]
pub struct ScanNode {
    pub path: String,
    pub name: String,
    pub kind: NodeKind,
    pub size_bytes: u64,
    pub disk_usage: u64,
    pub children: Vec<ScanNode>,
}

impl ScanNode {
    #[must_use]
    pub fn file(path: impl Into<String>, name: impl Into<String>, size_bytes: u64, disk_usage: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind: NodeKind::File,
            size_bytes,
            disk_usage,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn directory(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind: NodeKind::Directory,
            size_bytes: 0,
            disk_usage: 0,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// Bottom-up pass: sum children's sizes into each directory node and sort
/// `children` by `disk_usage` descending.
///
/// Iterative rather than recursive so a deeply nested tree can't blow the
/// call stack: a first pass collects every directory node (pre-order, via an
/// explicit stack), then a second pass drains that collection in reverse,
/// which visits children before their parents.
pub fn finalize_sizes(root: &mut ScanNode) {
    let mut dirs: Vec<*mut ScanNode> = Vec::new();
    let mut visit: Vec<*mut ScanNode> = vec![root as *mut ScanNode];

    while let Some(node_ptr) = visit.pop() {
        // SAFETY: every pointer in `visit`/`dirs` is derived from the single
        // `&mut root` we hold for the duration of this function, and we only
        // ever dereference one at a time, so there is no aliasing.
        let node = unsafe { &mut *node_ptr };
        if !node.is_dir() {
            continue;
        }
        dirs.push(node_ptr);
        for child in &mut node.children {
            visit.push(child as *mut ScanNode);
        }
    }

    for node_ptr in dirs.into_iter().rev() {
        let node = unsafe { &mut *node_ptr };
        let mut size_bytes = 0u64;
        let mut disk_usage = 0u64;
        for child in &node.children {
            size_bytes += child.size_bytes;
            disk_usage += child.disk_usage;
        }
        node.size_bytes = size_bytes;
        node.disk_usage = disk_usage;
        node.children.sort_by(|a, b| b.disk_usage.cmp(&a.disk_usage));
    }
}

/// Depth-first iterator over every node in a tree, root included.
pub struct IterNodes<'a> {
    stack: Vec<&'a ScanNode>,
}

impl<'a> Iterator for IterNodes<'a> {
    type Item = &'a ScanNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter());
        Some(node)
    }
}

#[must_use]
pub fn iter_nodes(root: &ScanNode) -> IterNodes<'_> {
    IterNodes { stack: vec![root] }
}

/// Orders by `disk_usage` ascending so a [`BinaryHeap`] of these behaves as
/// a min-heap, letting us keep only the `n` largest nodes seen so far.
struct ByDiskUsage<'a>(&'a ScanNode);

impl PartialEq for ByDiskUsage<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.disk_usage == other.0.disk_usage
    }
}
impl Eq for ByDiskUsage<'_> {}
impl PartialOrd for ByDiskUsage<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ByDiskUsage<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.disk_usage.cmp(&self.0.disk_usage)
    }
}

/// Return the `n` largest nodes by `disk_usage`, excluding `root` itself.
///
/// When `kind` is given, only nodes of that kind are considered.
#[must_use]
pub fn top_nodes<'a>(root: &'a ScanNode, n: usize, kind: Option<NodeKind>) -> Vec<&'a ScanNode> {
    if n == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<ByDiskUsage<'a>> = BinaryHeap::with_capacity(n + 1);
    for node in iter_nodes(root) {
        if std::ptr::eq(node, root) {
            continue;
        }
        if let Some(k) = kind {
            if node.kind != k {
                continue;
            }
        }
        heap.push(ByDiskUsage(node));
        if heap.len() > n {
            heap.pop();
        }
    }
    let mut out: Vec<&ScanNode> = heap.into_iter().map(|w| w.0).collect();
    out.sort_by(|a, b| b.disk_usage.cmp(&a.disk_usage));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, size: u64) -> ScanNode {
        ScanNode::file(format!("/root/{name}"), name, size, size)
    }

    #[test]
    fn finalize_sizes_sums_bottom_up() {
        let mut root = ScanNode::directory("/root", "root");
        let mut sub = ScanNode::directory("/root/sub", "sub");
        sub.children.push(leaf("a.txt", 10));
        sub.children.push(leaf("b.txt", 30));
        root.children.push(sub);
        root.children.push(leaf("c.txt", 5));

        finalize_sizes(&mut root);

        assert_eq!(root.size_bytes, 45);
        assert_eq!(root.disk_usage, 45);
        // sorted by disk_usage descending: sub (40) before c.txt (5)
        assert_eq!(root.children[0].name, "sub");
        assert_eq!(root.children[0].disk_usage, 40);
        assert_eq!(root.children[1].name, "c.txt");
    }

    #[test]
    fn top_nodes_excludes_root_and_respects_kind() {
        let mut root = ScanNode::directory("/root", "root");
        root.children.push(leaf("small.txt", 1));
        root.children.push(leaf("big.txt", 100));
        let mut sub = ScanNode::directory("/root/sub", "sub");
        sub.children.push(leaf("mid.txt", 50));
        root.children.push(sub);
        finalize_sizes(&mut root);

        let top = top_nodes(&root, 2, None);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].disk_usage, 100);

        let top_files = top_nodes(&root, 10, Some(NodeKind::File));
        assert!(top_files.iter().all(|n| n.kind == NodeKind::File));
    }
}
