//! Lexical path helpers.
//!
//! Directive files are keyed by their path relative to the working directory
//! with `/` separators, which is also how the Go toolchain prints positions.

use crate::error::{GcAssertError, Result};
use std::path::{Component, Path, PathBuf};

/// Remove `.` components and fold `..` where a preceding normal component
/// allows it, without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Express `path` relative to `base`.
///
/// Fails when one path is absolute and the other is not, or when `base`
/// climbs out through `..` in a way that cannot be reversed lexically.
pub fn relative_to(base: &Path, path: &Path) -> Result<PathBuf> {
    let fail = || GcAssertError::Relativize {
        path: path.to_path_buf(),
        base: base.to_path_buf(),
    };
    if base.is_absolute() != path.is_absolute() {
        return Err(fail());
    }
    let base_norm = normalize(base);
    let path_norm = normalize(path);
    let base_parts: Vec<_> = base_norm
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();
    let path_parts: Vec<_> = path_norm
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();

    let common = base_parts
        .iter()
        .zip(path_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if base_parts[common..].contains(&Component::ParentDir) {
        return Err(fail());
    }

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[common..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Ok(rel)
}

/// Render a relative path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Key under which a compiler-emitted position path is looked up.
pub fn diagnostic_key(path: &str) -> String {
    to_slash(&normalize(Path::new(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("./a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn test_relative_to() {
        let rel = relative_to(Path::new("/work"), Path::new("/work/pkg/a.go")).unwrap();
        assert_eq!(rel, PathBuf::from("pkg/a.go"));
        let rel = relative_to(Path::new("/work/sub"), Path::new("/work/pkg/a.go")).unwrap();
        assert_eq!(rel, PathBuf::from("../pkg/a.go"));
        let rel = relative_to(Path::new("/work"), Path::new("/work")).unwrap();
        assert_eq!(rel, PathBuf::from("."));
    }

    #[test]
    fn test_relative_to_mixed_kinds_fails() {
        let err = relative_to(Path::new("/work"), Path::new("pkg/a.go")).unwrap_err();
        assert!(matches!(err, GcAssertError::Relativize { .. }));
    }

    #[test]
    fn test_diagnostic_key() {
        assert_eq!(diagnostic_key("./pkg/a.go"), "pkg/a.go");
        assert_eq!(diagnostic_key("pkg/a.go"), "pkg/a.go");
        assert_eq!(diagnostic_key("./a.go"), "a.go");
    }
}
