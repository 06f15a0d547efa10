//! Package loading
//!
//! Finds the Go files `go build` would compile for a package path and parses
//! them. A path ending in `/...` includes every package below it.

use crate::error::{GcAssertError, Result};
use crate::index::SourceFile;
use crate::parser::ParsedFile;
use crate::paths;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// A package path as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePattern {
    pub dir: PathBuf,
    pub recursive: bool,
}

impl PackagePattern {
    pub fn parse(package: &str) -> Self {
        let (dir, recursive) = match package.strip_suffix("...") {
            Some(rest) => (rest.trim_end_matches('/'), true),
            None => (package, false),
        };
        let dir = if dir.is_empty() { "." } else { dir };
        PackagePattern {
            dir: PathBuf::from(dir),
            recursive,
        }
    }
}

/// The package argument handed to `go build`, which needs a leading `./`
/// for paths relative to the module.
pub fn build_target(package: &str) -> String {
    let path = Path::new(package);
    if path.is_absolute() || package == "." || package.starts_with("./") || package.starts_with("../") {
        package.to_string()
    } else {
        format!("./{package}")
    }
}

/// Go files of the package(s), sorted by path.
pub fn discover_go_files(work_dir: &Path, pattern: &PackagePattern) -> Result<Vec<PathBuf>> {
    let root = paths::normalize(&work_dir.join(&pattern.dir));
    let max_depth = if pattern.recursive { usize::MAX } else { 1 };

    let mut files = Vec::new();
    let walker = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_compiled_go_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata" || name == "vendor"
}

fn is_compiled_go_file(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    name.ends_with(".go")
        && !name.ends_with("_test.go")
        && !name.starts_with('.')
        && !name.starts_with('_')
}

/// `//go:build ignore` (or the older `// +build ignore`) before the package
/// clause excludes a file from the build.
pub fn is_build_ignored(source: &str) -> bool {
    for line in source.lines() {
        let line = line.trim();
        if line.starts_with("package ") {
            break;
        }
        if line == "//go:build ignore" {
            return true;
        }
        if let Some(rest) = line.strip_prefix("// +build ") {
            if rest.split_whitespace().any(|term| term == "ignore") {
                return true;
            }
        }
    }
    false
}

/// Read and parse every compiled Go file of `package`.
pub fn load_package(work_dir: &Path, package: &str) -> Result<Vec<SourceFile>> {
    let pattern = PackagePattern::parse(package);
    let mut files = Vec::new();
    for path in discover_go_files(work_dir, &pattern)? {
        let source = std::fs::read_to_string(&path).map_err(|source| GcAssertError::Read {
            path: path.clone(),
            source,
        })?;
        if is_build_ignored(&source) {
            debug!(path = %path.display(), "skipping file excluded by build constraint");
            continue;
        }
        let parsed = ParsedFile::parse(source).map_err(|e| GcAssertError::Syntax {
            path: path.clone(),
            line: e.line,
            message: e.message,
        })?;
        let key = paths::to_slash(&paths::relative_to(work_dir, &path)?);
        files.push(SourceFile { path, key, parsed });
    }
    if files.is_empty() {
        return Err(GcAssertError::NoSourceFiles(pattern.dir));
    }
    Ok(files)
}
