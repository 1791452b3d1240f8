//! File-tree helpers: suffix handling, directory snapshots, copy and delete.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::classify::LinePattern;
use crate::error::{BuildError, Result};
use crate::logging::LogSink;

/// `dir/name.ext` becomes `dir/name<suffix>`; only the last extension is replaced
pub fn replace_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, suffix))
}

/// Suffix of a file name including the dot, or `None` without one
pub fn suffix_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

/// Final path component as a string, as passed to tools run in its directory
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory containing `path`, `.` for a bare file name
pub fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Remove a file, tolerating its absence
pub fn delete_if_exists(path: &Path, log: &dyn LogSink) {
    match fs::remove_file(path) {
        Ok(()) => log.debug(&format!("Deleted '{}'", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log.warn_with(&format!("Cannot delete file '{}'", path.display()), &e),
    }
}

/// Regular files directly in `dir` whose names match `pattern`, sorted
pub fn matching_files(dir: &Path, pattern: &LinePattern) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if pattern.is_match(&entry.file_name().to_string_lossy()) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Output directory mirroring `doc_dir`'s position below `source_root`
pub fn target_directory(source_root: &Path, output_root: &Path, doc_dir: &Path) -> Result<PathBuf> {
    let relative = doc_dir.strip_prefix(source_root).unwrap_or(Path::new(""));
    let target = output_root.join(relative);
    fs::create_dir_all(&target).map_err(|source| BuildError::TargetDir {
        path: target.clone(),
        source,
    })?;
    Ok(target)
}

/// Copy the files of `source_dir` matching `pattern` into `target_dir`
pub fn copy_matching(
    source_dir: &Path,
    pattern: &LinePattern,
    target_dir: &Path,
    log: &dyn LogSink,
) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    for file in matching_files(source_dir, pattern)? {
        let Some(name) = file.file_name() else {
            continue;
        };
        let dest = target_dir.join(name);
        if dest == file {
            copied.push(dest);
            continue;
        }
        fs::copy(&file, &dest)?;
        log.debug(&format!("Copied '{}' to '{}'", file.display(), dest.display()));
        copied.push(dest);
    }
    if copied.is_empty() {
        log.warn(&format!(
            "No output files matching '{}' found in '{}'",
            pattern.as_str(),
            source_dir.display()
        ));
    }
    Ok(copied)
}

/// Snapshot of a directory tree.
///
/// A directory that cannot be listed is kept with `readable == false` and no
/// entries, so callers can tell it apart from an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirNode {
    pub path: PathBuf,
    pub readable: bool,
    pub files: BTreeSet<PathBuf>,
    pub subdirs: Vec<DirNode>,
}

impl DirNode {
    pub fn new(path: &Path, log: &dyn LogSink) -> Self {
        let mut node = Self {
            path: path.to_path_buf(),
            readable: true,
            files: BTreeSet::new(),
            subdirs: Vec::new(),
        };

        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                log.warn_with(&format!("Cannot read directory '{}'", path.display()), &e);
                node.readable = false;
                return node;
            }
        };

        let mut dirs = Vec::new();
        for entry in entries.flatten() {
            let entry_path = entry.path();
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => dirs.push(entry_path),
                Ok(ft) if ft.is_file() => {
                    node.files.insert(entry_path);
                }
                _ => {}
            }
        }
        dirs.sort();
        node.subdirs = dirs.iter().map(|d| DirNode::new(d, log)).collect();
        node
    }

    /// This node and all readable descendants, parents before children
    pub fn walk(&self) -> Vec<&DirNode> {
        let mut nodes = vec![self];
        for sub in &self.subdirs {
            nodes.extend(sub.walk());
        }
        nodes
    }

    /// Delete every file under this tree that was not present in the
    /// snapshot, except those in `keep`.
    ///
    /// Directories created after the snapshot are left alone.
    pub fn delete_new_files(&self, keep: &HashSet<PathBuf>, log: &dyn LogSink) {
        if !self.readable {
            return;
        }
        let current = DirNode::new(&self.path, log);
        for file in current.files.difference(&self.files) {
            if !keep.contains(file) {
                delete_if_exists(file, log);
            }
        }
        for sub in &self.subdirs {
            sub.delete_new_files(keep, log);
        }
    }
}
