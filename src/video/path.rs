use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` segments, fold `..` into the
/// preceding segment and collapse repeated separators. The file system is
/// not consulted, so symlinks are not resolved.
///
/// `..` directly under the root is dropped; leading `..` segments of a
/// relative path are kept. An empty result becomes `.`.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut normalized = PathBuf::new();
    // Segments that a later `..` may remove
    let mut depth = 0usize;

    for component in path.as_ref().components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    normalized.pop();
                    depth -= 1;
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(segment) => {
                normalized.push(segment);
                depth += 1;
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}
