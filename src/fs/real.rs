use super::{Entry, FileSystem, StatInfo};
use std::path::{Path, PathBuf};

/// The portable [`FileSystem`] implementation, backed by `std::fs`.
///
/// This is the reference implementation: any platform-accelerated reader
/// must match its behavior exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

#[cfg(unix)]
fn disk_usage_of(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    // blocks() is always in 512-byte units regardless of the filesystem's
    // native block size; see stat(2).
    meta.blocks() * 512
}

#[cfg(not(unix))]
fn disk_usage_of(meta: &std::fs::Metadata) -> u64 {
    meta.len()
}

fn stat_info(meta: &std::fs::Metadata) -> StatInfo {
    StatInfo {
        is_dir: meta.is_dir(),
        size: meta.len(),
        disk_usage: disk_usage_of(meta),
        mtime: meta.modified().ok(),
    }
}

impl FileSystem for RealFileSystem {
    fn expanduser(&self, path: &str) -> String {
        if let Some(rest) = path.strip_prefix('~') {
            if rest.is_empty() || rest.starts_with('/') {
                if let Some(home) = std::env::var_os("HOME") {
                    let mut expanded = PathBuf::from(home);
                    if let Some(rest) = rest.strip_prefix('/') {
                        expanded.push(rest);
                    }
                    return expanded.to_string_lossy().into_owned();
                }
            }
        }
        path.to_owned()
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn absolute(&self, path: &str) -> String {
        let p = Path::new(path);
        let absolute = if p.is_absolute() {
            p.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(p))
                .unwrap_or_else(|_| p.to_path_buf())
        };
        // std::fs::canonicalize resolves symlinks, which we don't want here:
        // the root's identity should stay the path the caller asked for, so
        // a lexical normalization is all that's needed.
        normalize_lexically(&absolute).to_string_lossy().into_owned()
    }

    fn stat(&self, path: &str) -> std::io::Result<StatInfo> {
        std::fs::symlink_metadata(path).and_then(|meta| {
            if meta.file_type().is_symlink() {
                std::fs::metadata(path).map(|m| stat_info(&m))
            } else {
                Ok(stat_info(&meta))
            }
        })
    }

    fn read_text(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn scandir(&self, path: &str) -> std::io::Result<Vec<Entry>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let entry_path = entry.path().to_string_lossy().into_owned();
            let stat = entry.metadata().ok().map(|m| stat_info(&m));
            out.push(Entry {
                path: entry_path,
                name,
                stat,
            });
        }
        Ok(out)
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !matches!(out.components().next_back(), Some(Component::RootDir) | None) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
