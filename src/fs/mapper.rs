//! Remote-to-local path mapping
//!
//! Every remote entry under a traversal root maps to a destination under
//! the local base, keeping the root's base name as the first segment:
//!
//! ```text
//! root  /home/user/data
//! entry /home/user/data/sub/file.txt      base /tmp/out
//!   ->  /tmp/out/data/sub/file.txt
//! ```
//!
//! The split point is the root's component count, so a base name that
//! recurs further down the tree cannot confuse the mapping.

use crate::error::{OwlError, Result};
use std::path::{Component, Path, PathBuf};

/// Maps remote entries below one traversal root to local destinations
#[derive(Debug, Clone)]
pub struct PathMapper {
    /// Normalized traversal root components
    root: Vec<PathBuf>,
    /// How many root components are stripped from each entry
    anchor: usize,
    /// Local destination base
    base: PathBuf,
}

impl PathMapper {
    /// Create a mapper for `root` writing under `base`
    pub fn new(root: &Path, base: &Path) -> Self {
        let root = normalized(root);
        // Keep the last segment when it is a name; `/` and `..` have none
        let anchor = match root.last() {
            Some(last) if is_name(last) => root.len() - 1,
            _ => root.len(),
        };

        Self {
            root,
            anchor,
            base: base.to_path_buf(),
        }
    }

    /// Map a remote entry to its local destination
    pub fn map(&self, entry: &Path) -> Result<PathBuf> {
        let entry_components = normalized(entry);

        if entry_components.len() < self.root.len()
            || entry_components[..self.root.len()] != self.root[..]
        {
            return Err(OwlError::InvalidPath(format!(
                "{} is not inside the traversal root",
                entry.display()
            )));
        }

        let mut dest = self.base.clone();
        for segment in &entry_components[self.anchor..] {
            if !is_name(segment) {
                return Err(OwlError::InvalidPath(format!(
                    "{} contains an unsafe segment {:?}",
                    entry.display(),
                    segment
                )));
            }
            dest.push(segment);
        }

        Ok(dest)
    }
}

/// Map `entry` under traversal `root` to a path under `base`
pub fn map_path(root: &Path, entry: &Path, base: &Path) -> Result<PathBuf> {
    PathMapper::new(root, base).map(entry)
}

/// Check that a single name from a directory listing is a plain file name
pub fn is_safe_name(name: &Path) -> bool {
    let mut components = name.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn normalized(path: &Path) -> Vec<PathBuf> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| PathBuf::from(c.as_os_str()))
        .collect()
}

fn is_name(segment: &Path) -> bool {
    matches!(segment.components().next(), Some(Component::Normal(_)))
}
