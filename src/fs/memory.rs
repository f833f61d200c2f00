use super::{Entry, FileSystem, StatInfo};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Node {
    File {
        size: u64,
        disk_usage: u64,
        text: Option<String>,
    },
    Dir,
    /// An entry whose stat should fail, to exercise the access-error path.
    Broken,
}

/// An in-memory [`FileSystem`] double for scanner tests.
///
/// Paths are plain `/`-joined strings; no attempt is made to model symlinks
/// or permissions beyond [`MemoryFileSystem::mark_broken`].
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    // path -> node; children are derived from path prefixes at scandir time.
    nodes: Mutex<BTreeMap<String, Node>>,
}

impl MemoryFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn add_dir(&self, path: &str) {
        self.nodes
            .lock()
            .unwrap()
            .insert(path.trim_end_matches('/').to_owned(), Node::Dir);
    }

    pub fn add_file(&self, path: &str, size: u64, disk_usage: u64) {
        self.nodes.lock().unwrap().insert(
            path.to_owned(),
            Node::File {
                size,
                disk_usage,
                text: None,
            },
        );
    }

    pub fn add_text_file(&self, path: &str, text: &str) {
        let size = text.len() as u64;
        self.nodes.lock().unwrap().insert(
            path.to_owned(),
            Node::File {
                size,
                disk_usage: size,
                text: Some(text.to_owned()),
            },
        );
    }

    /// Mark an entry so that `stat` on it fails, simulating a broken
    /// symlink or a permission-denied entry.
    pub fn mark_broken(&self, path: &str) {
        self.nodes.lock().unwrap().insert(path.to_owned(), Node::Broken);
    }

    fn direct_children(&self, path: &str) -> Vec<String> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let nodes = self.nodes.lock().unwrap();
        nodes
            .keys()
            .filter_map(|key| {
                let rest = key.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    return None;
                }
                Some(key.clone())
            })
            .collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn expanduser(&self, path: &str) -> String {
        path.to_owned()
    }

    fn exists(&self, path: &str) -> bool {
        let key = path.trim_end_matches('/');
        self.nodes.lock().unwrap().contains_key(key)
    }

    fn absolute(&self, path: &str) -> String {
        path.trim_end_matches('/').to_owned()
    }

    fn stat(&self, path: &str) -> std::io::Result<StatInfo> {
        let key = path.trim_end_matches('/');
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(key) {
            Some(Node::Dir) => Ok(StatInfo {
                is_dir: true,
                size: 0,
                disk_usage: 0,
                mtime: None,
            }),
            Some(Node::File { size, disk_usage, .. }) => Ok(StatInfo {
                is_dir: false,
                size: *size,
                disk_usage: *disk_usage,
                mtime: None,
            }),
            Some(Node::Broken) | None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such entry: {key}"),
            )),
        }
    }

    fn read_text(&self, path: &str) -> std::io::Result<String> {
        let key = path.trim_end_matches('/');
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(key) {
            Some(Node::File { text: Some(text), .. }) => Ok(text.clone()),
            _ => Err(std::io::Error::new(std::io::ErrorKind::NotFound, format!("no such text file: {key}"))),
        }
    }

    fn scandir(&self, path: &str) -> std::io::Result<Vec<Entry>> {
        let children = self.direct_children(path);
        let mut out = Vec::with_capacity(children.len());
        for child_path in children {
            let name = child_path.rsplit('/').next().unwrap_or(&child_path).to_owned();
            let stat = self.stat(&child_path).ok();
            out.push(Entry {
                path: child_path,
                name,
                stat,
            });
        }
        Ok(out)
    }
}
