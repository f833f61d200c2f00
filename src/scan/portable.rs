//! The portable directory reader: reads one directory via the
//! [`FileSystem`] port's `scandir`, with no assumptions about the
//! underlying storage beyond that trait's contract.
//!
//! This is the only reader the crate ships; a platform-accelerated reader
//! is an optional, purely-performance alternative and is not required for
//! correct behavior.

use super::{BuildNode, DirectoryReader};
use crate::fs::FileSystem;
use crate::tree::NodeKind;
use std::sync::Arc;

pub struct PortableReader {
    fs: Arc<dyn FileSystem>,
}

impl PortableReader {
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl DirectoryReader for PortableReader {
    fn scan_dir(&self, parent: &Arc<BuildNode>, path: &str) -> (Vec<Arc<BuildNode>>, u64, u64, u64) {
        let entries = match self.fs.scandir(path) {
            Ok(entries) => entries,
            Err(_) => return (Vec::new(), 0, 0, 1),
        };

        let mut all_children = Vec::with_capacity(entries.len());
        let mut dir_children = Vec::new();
        let mut files = 0u64;
        let mut dirs = 0u64;
        let mut errors = 0u64;

        for entry in entries {
            let Some(stat) = entry.stat else {
                errors += 1;
                continue;
            };
            if stat.is_dir {
                let node = BuildNode {
                    path: entry.path,
                    name: entry.name,
                    kind: NodeKind::Directory,
                    size_bytes: 0,
                    disk_usage: 0,
                    children: std::sync::Mutex::new(Vec::new()),
                };
                let node = Arc::new(node);
                dirs += 1;
                dir_children.push(Arc::clone(&node));
                all_children.push(node);
            } else {
                let node = Arc::new(BuildNode {
                    path: entry.path,
                    name: entry.name,
                    kind: NodeKind::File,
                    size_bytes: stat.size,
                    disk_usage: stat.disk_usage,
                    children: std::sync::Mutex::new(Vec::new()),
                });
                files += 1;
                all_children.push(node);
            }
        }

        if !all_children.is_empty() {
            parent.children.lock().unwrap().extend(all_children);
        }

        (dir_children, files, dirs, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn scan_dir_splits_files_and_directories() {
        let memfs = MemoryFileSystem::new();
        memfs.add_dir("/r");
        memfs.add_dir("/r/sub");
        memfs.add_file("/r/a.txt", 10, 10);
        let fs: Arc<dyn FileSystem> = Arc::new(memfs);
        let reader = PortableReader::new(fs);

        let root = BuildNode {
            path: "/r".to_owned(),
            name: "r".to_owned(),
            kind: NodeKind::Directory,
            size_bytes: 0,
            disk_usage: 0,
            children: std::sync::Mutex::new(Vec::new()),
        };
        let root = Arc::new(root);

        let (dir_children, files, dirs, errors) = reader.scan_dir(&root, "/r");
        assert_eq!(files, 1);
        assert_eq!(dirs, 1);
        assert_eq!(errors, 0);
        assert_eq!(dir_children.len(), 1);
        assert_eq!(root.children.lock().unwrap().len(), 2);
    }

    #[test]
    fn scan_dir_counts_unreadable_entries_as_errors() {
        let memfs = MemoryFileSystem::new();
        memfs.add_dir("/r");
        memfs.mark_broken("/r/ghost");
        let fs: Arc<dyn FileSystem> = Arc::new(memfs);
        let reader = PortableReader::new(fs);
        let root = Arc::new(BuildNode {
            path: "/r".to_owned(),
            name: "r".to_owned(),
            kind: NodeKind::Directory,
            size_bytes: 0,
            disk_usage: 0,
            children: std::sync::Mutex::new(Vec::new()),
        });

        let (dir_children, files, dirs, errors) = reader.scan_dir(&root, "/r");
        assert_eq!(errors, 1);
        assert_eq!(files, 0);
        assert_eq!(dirs, 0);
        assert!(dir_children.is_empty());
    }
}
