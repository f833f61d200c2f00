//! The threaded scanner: worker pool, depth gating, cancellation, progress
//! reporting and batched stats flushing.
//!
//! Each in-flight node is an `Arc<BuildNode>` with its own child-list
//! `Mutex`, so worker threads can append children to a shared parent without
//! a data race; the tree converts to the plain owned [`ScanNode`] form once
//! the scan completes.

mod portable;

pub use portable::PortableReader;

use crate::error::{ScanError, ScanErrorCode};
use crate::fs::FileSystem;
use crate::queue::WorkQueue;
use crate::tree::{NodeKind, ScanNode};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, warn};

/// `max_depth: None` = unlimited; `Some(0)` means the root is read but its
/// subdirectories' contents are not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub max_depth: Option<u32>,
}

/// Counters mutated only via the batched-flush discipline described in the
/// module docs: workers accumulate locally and flush under one lock per
/// processed directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files: u64,
    pub directories: u64,
    pub access_errors: u64,
}

/// The immutable result of a successful scan.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    pub root: ScanNode,
    pub stats: ScanStats,
}

pub type ScanResult = Result<ScanSnapshot, ScanError>;

/// A node under construction: directories gain children concurrently from
/// whichever worker is assigned to read them, guarded by one `Mutex` per
/// node so siblings never contend with each other.
pub(crate) struct BuildNode {
    pub path: String,
    pub name: String,
    pub kind: NodeKind,
    pub size_bytes: u64,
    pub disk_usage: u64,
    pub children: Mutex<Vec<Arc<BuildNode>>>,
}

impl BuildNode {
    fn directory(path: String, name: String) -> Arc<Self> {
        Arc::new(Self {
            path,
            name,
            kind: NodeKind::Directory,
            size_bytes: 0,
            disk_usage: 0,
            children: Mutex::new(Vec::new()),
        })
    }
}

struct Task {
    node: Arc<BuildNode>,
    depth: u32,
}

/// A directory-reading strategy, called once per directory task.
///
/// Reads `path`, appends FILE and DIRECTORY children to `parent.children`
/// under one lock acquisition, and returns the subset of children that are
/// directories (so the caller knows what to re-enqueue) plus `(files,
/// dirs, errors)` counters for this call.
pub(crate) trait DirectoryReader: Send + Sync {
    fn scan_dir(&self, parent: &Arc<BuildNode>, path: &str) -> (Vec<Arc<BuildNode>>, u64, u64, u64);
}

/// Validate and resolve a scan root: `expanduser` → existence check →
/// `absolute` → `stat`, mapping failures to the matching [`ScanErrorCode`].
pub fn resolve_root(path: &str, fs: &dyn FileSystem) -> Result<String, ScanError> {
    let expanded = fs.expanduser(path);
    if !fs.exists(&expanded) {
        return Err(ScanError::new(ScanErrorCode::NotFound, expanded, "Path does not exist"));
    }
    let resolved = fs.absolute(&expanded);
    let root_stat = fs.stat(&resolved).map_err(|e| {
        ScanError::new(ScanErrorCode::RootStatFailed, resolved.clone(), format!("Cannot stat root: {e}"))
    })?;
    if !root_stat.is_dir {
        return Err(ScanError::new(ScanErrorCode::NotDirectory, resolved, "Path is not a directory"));
    }
    Ok(resolved)
}

/// Scan `path` with a fixed-size worker pool, honoring `options.max_depth`,
/// an optional `progress_callback`, and an optional `cancel_check`.
///
/// Validates the root, then drives a shared [`WorkQueue`] of directory
/// tasks, cooperative cancellation via a shared flag, and the
/// batched-flush/batched-progress discipline.
pub fn scan(
    path: &str,
    options: ScanOptions,
    workers: usize,
    fs: Arc<dyn FileSystem>,
    progress_callback: Option<&(dyn Fn(&str, u64, u64) + Sync)>,
    cancel_check: Option<&(dyn Fn() -> bool + Sync)>,
) -> ScanResult {
    let resolved_root = resolve_root(path, fs.as_ref())?;
    let reader = PortableReader::new(fs);
    run_scan(&resolved_root, options, workers, &reader, progress_callback, cancel_check)
}

fn run_scan(
    resolved_root: &str,
    options: ScanOptions,
    workers: usize,
    reader: &(dyn DirectoryReader + Sync),
    progress_callback: Option<&(dyn Fn(&str, u64, u64) + Sync)>,
    cancel_check: Option<&(dyn Fn() -> bool + Sync)>,
) -> ScanResult {
    let workers = workers.max(1);
    let root_name = resolved_root.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(resolved_root);
    let root_node = BuildNode::directory(resolved_root.to_owned(), root_name.to_owned());

    let queue: WorkQueue<Task> = WorkQueue::new();
    queue.put(Task {
        node: Arc::clone(&root_node),
        depth: 0,
    });

    let files = AtomicU64::new(0);
    let directories = AtomicU64::new(1); // the root itself
    let access_errors = AtomicU64::new(0);
    let cancelled = AtomicBool::new(false);

    let is_cancelled = || -> bool {
        if cancelled.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(check) = cancel_check {
            if check() {
                cancelled.store(true, Ordering::Relaxed);
                return true;
            }
        }
        false
    };

    let emit_progress = |current_path: &str, local_files: u64, local_dirs: u64| {
        if let Some(cb) = progress_callback {
            let f = files.load(Ordering::Relaxed) + local_files;
            let d = directories.load(Ordering::Relaxed) + local_dirs;
            cb(current_path, f, d);
        }
    };

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                let mut local_files = 0u64;
                let mut local_dirs = 0u64;
                let mut local_errors = 0u64;

                let flush_local = |local_files: &mut u64, local_dirs: &mut u64, local_errors: &mut u64| {
                    if *local_files != 0 || *local_dirs != 0 || *local_errors != 0 {
                        files.fetch_add(*local_files, Ordering::Relaxed);
                        directories.fetch_add(*local_dirs, Ordering::Relaxed);
                        access_errors.fetch_add(*local_errors, Ordering::Relaxed);
                        *local_files = 0;
                        *local_dirs = 0;
                        *local_errors = 0;
                    }
                };

                loop {
                    let Some(task) = queue.get() else {
                        flush_local(&mut local_files, &mut local_dirs, &mut local_errors);
                        break;
                    };

                    if is_cancelled() {
                        queue.task_done();
                        continue;
                    }

                    let prev_total = local_files + local_dirs;
                    let (dir_children, added_files, added_dirs, added_errors) =
                        reader.scan_dir(&task.node, &task.node.path);
                    local_files += added_files;
                    local_dirs += added_dirs;
                    local_errors += added_errors;

                    let within_depth = options.max_depth.is_none_or(|max| task.depth < max);
                    if within_depth && !dir_children.is_empty() {
                        let next_depth = task.depth + 1;
                        queue.put_many(dir_children.into_iter().map(|node| Task { node, depth: next_depth }));
                    }

                    let new_total = local_files + local_dirs;
                    if new_total / 100 > prev_total / 100 {
                        emit_progress(&task.node.path, local_files, local_dirs);
                    }

                    flush_local(&mut local_files, &mut local_dirs, &mut local_errors);
                    queue.task_done();
                }
            });
        }

        queue.join();
        // Load-bearing ordering: every enqueued task must be accounted for
        // (q.join() returned) before workers are told to stop waiting.
        queue.shutdown();
    });

    if cancelled.load(Ordering::Relaxed) {
        warn!(path = resolved_root, "scan cancelled");
        return Err(ScanError::new(ScanErrorCode::Cancelled, resolved_root.to_owned(), "Scan cancelled"));
    }

    let stats = ScanStats {
        files: files.load(Ordering::Relaxed),
        directories: directories.load(Ordering::Relaxed),
        access_errors: access_errors.load(Ordering::Relaxed),
    };
    debug!(path = resolved_root, files = stats.files, directories = stats.directories, "scan complete");

    let mut root = build_into_scan_node(root_node);
    crate::tree::finalize_sizes(&mut root);
    Ok(ScanSnapshot { root, stats })
}

/// Convert the concurrently-built `BuildNode` tree into an owned
/// [`ScanNode`] tree. Recursion depth here tracks filesystem nesting depth
/// rather than total node count, unlike [`crate::tree::finalize_sizes`]'s
/// hot path, so a direct recursive walk is acceptable.
fn build_into_scan_node(node: Arc<BuildNode>) -> ScanNode {
    let node = Arc::try_unwrap(node).unwrap_or_else(|shared| BuildNode {
        path: shared.path.clone(),
        name: shared.name.clone(),
        kind: shared.kind,
        size_bytes: shared.size_bytes,
        disk_usage: shared.disk_usage,
        children: Mutex::new(shared.children.lock().unwrap().clone()),
    });
    let children = node.children.into_inner().unwrap();
    let mut scan_node = match node.kind {
        NodeKind::File => ScanNode::file(node.path, node.name, node.size_bytes, node.disk_usage),
        NodeKind::Directory => ScanNode::directory(node.path, node.name),
    };
    scan_node.children = children.into_iter().map(build_into_scan_node).collect();
    scan_node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanErrorCode;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn three_files_two_directories_aggregate_correctly() {
        let memfs = MemoryFileSystem::new();
        memfs.add_dir("/r");
        memfs.add_dir("/r/sub");
        memfs.add_file("/r/big.bin", 128, 128);
        memfs.add_file("/r/small.bin", 32, 32);
        memfs.add_file("/r/sub/nested.bin", 64, 64);
        let fs: Arc<dyn FileSystem> = Arc::new(memfs);

        let snapshot = scan("/r", ScanOptions::default(), 2, fs, None, None).unwrap();
        assert_eq!(snapshot.stats.files, 3);
        assert!(snapshot.stats.directories >= 2);
        assert_eq!(snapshot.root.size_bytes, 224);
        assert_eq!(snapshot.root.disk_usage, 224);
    }

    #[test]
    fn children_are_sorted_by_disk_usage_descending() {
        let memfs = MemoryFileSystem::new();
        memfs.add_dir("/r");
        memfs.add_file("/r/a", 10, 10);
        memfs.add_file("/r/b", 100, 100);
        memfs.add_file("/r/c", 50, 50);
        let fs: Arc<dyn FileSystem> = Arc::new(memfs);

        let snapshot = scan("/r", ScanOptions::default(), 1, fs, None, None).unwrap();
        let names: Vec<&str> = snapshot.root.children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn max_depth_zero_reads_root_but_not_its_subdirectories() {
        let memfs = MemoryFileSystem::new();
        memfs.add_dir("/r");
        memfs.add_dir("/r/lvl1");
        memfs.add_dir("/r/lvl1/lvl2");
        memfs.add_file("/r/lvl1/lvl2/f", 20, 20);
        let fs: Arc<dyn FileSystem> = Arc::new(memfs);

        let snapshot = scan("/r", ScanOptions { max_depth: Some(0) }, 2, fs, None, None).unwrap();
        let lvl1 = snapshot.root.children.iter().find(|n| n.name == "lvl1").expect("lvl1 present");
        assert!(lvl1.children.is_empty());
    }

    #[test]
    fn cancel_check_returning_true_aborts_the_scan() {
        let memfs = MemoryFileSystem::new();
        memfs.add_dir("/r");
        for i in 0..5 {
            memfs.add_dir(&format!("/r/d{i}"));
            memfs.add_file(&format!("/r/d{i}/f"), 1, 1);
        }
        let fs: Arc<dyn FileSystem> = Arc::new(memfs);

        // One worker keeps task ordering deterministic: the root is
        // processed first, then each `dN` subdirectory in turn, so the
        // third cancel_check invocation lands on the second subdirectory.
        let calls = AtomicU64::new(0);
        let cb = move || calls.fetch_add(1, Ordering::SeqCst) >= 2;

        let result = scan("/r", ScanOptions::default(), 1, fs, None, Some(&cb));
        let err = result.expect_err("cancellation must surface as an error");
        assert_eq!(err.code, ScanErrorCode::Cancelled);
    }

    #[test]
    fn unreadable_root_entry_is_counted_as_access_error_not_fatal() {
        let memfs = MemoryFileSystem::new();
        memfs.add_dir("/r");
        memfs.add_file("/r/ok.txt", 5, 5);
        memfs.mark_broken("/r/ghost");
        let fs: Arc<dyn FileSystem> = Arc::new(memfs);

        let snapshot = scan("/r", ScanOptions::default(), 2, fs, None, None).unwrap();
        assert_eq!(snapshot.stats.access_errors, 1);
        assert_eq!(snapshot.stats.files, 1);
    }

    #[test]
    fn resolve_root_maps_missing_path_to_not_found() {
        let memfs = MemoryFileSystem::new();
        let fs: Arc<dyn FileSystem> = Arc::new(memfs);
        let err = scan("/nope", ScanOptions::default(), 1, fs, None, None).unwrap_err();
        assert_eq!(err.code, ScanErrorCode::NotFound);
    }

    #[test]
    fn resolve_root_rejects_a_file_as_root() {
        let memfs = MemoryFileSystem::new();
        memfs.add_file("/r.txt", 1, 1);
        let fs: Arc<dyn FileSystem> = Arc::new(memfs);
        let err = scan("/r.txt", ScanOptions::default(), 1, fs, None, None).unwrap_err();
        assert_eq!(err.code, ScanErrorCode::NotDirectory);
    }
}
