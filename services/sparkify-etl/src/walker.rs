//!
//! src/walker.rs  Andrew Belles  Oct 19th, 2026
//!
//! Recursive discovery of input artifacts under a data root
//!

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Every file under root whose extension is ext, as absolute paths.
/// Traversal order, each path at most once. A missing root is empty.
/// Symlinks below the root are not followed, so a linked directory
/// cannot hand back a file the walk already reached.
pub fn discover(root: &Path, ext: &str) -> Vec<PathBuf> {
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "walker.root_missing");
        return Vec::new();
    }

    let mut seen  = HashSet::new();
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // keep walking, one bad entry does not sink the root
                tracing::warn!(error = %e, "walker.entry_error");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }

        let path = match std::path::absolute(entry.path()) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "walker.absolute");
                continue;
            }
        };
        if seen.insert(path.clone()) {
            files.push(path);
        }
    }

    tracing::debug!(root = %root.display(), count = files.len(), "walker.discovered");
    files
}
