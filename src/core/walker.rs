//! Remote tree enumeration
//!
//! [`TreeWalker`] turns a traversal root into an ordered stream of
//! [`TransferUnit`]s. Traversal is depth-first pre-order, so every
//! directory is produced before anything it contains. Children are visited
//! in name order to keep runs reproducible.
//!
//! A directory that cannot be listed does not end the walk: its unit is
//! still produced, the listing failure is yielded as an `Err` item, and
//! the walk continues with its siblings.

use crate::error::{OwlError, Result};
use crate::fs::{is_safe_name, PathMapper};
use crate::remote::{EntryKind, RemoteFs, RemoteStat};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// One directory-creation or file-copy action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferUnit {
    /// Path on the source side
    pub remote_path: PathBuf,
    /// Local destination
    pub dest_path: PathBuf,
    /// Entry type
    pub kind: EntryKind,
    /// Size captured at enumeration time
    pub size: u64,
    /// Permission bits captured at enumeration time
    pub permissions: u32,
}

impl TransferUnit {
    fn new(remote_path: PathBuf, dest_path: PathBuf, stat: RemoteStat) -> Self {
        Self {
            remote_path,
            dest_path,
            kind: stat.kind,
            size: stat.size,
            permissions: stat.permissions,
        }
    }
}

/// A subtree or entry the walk had to leave out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkFailure {
    /// Remote path that failed
    pub path: PathBuf,
    /// Why
    pub message: String,
}

impl WalkFailure {
    fn new(path: &Path, error: &OwlError) -> Self {
        Self {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    NotStarted,
    Enumerating,
    Done,
}

/// Pre-order iterator over the units of one traversal
pub struct TreeWalker<'a, R: RemoteFs> {
    remote: &'a R,
    root: PathBuf,
    root_stat: RemoteStat,
    destination: PathBuf,
    mapper: PathMapper,
    state: WalkState,
    /// Entries discovered but not yet produced, next on top
    stack: Vec<(PathBuf, RemoteStat)>,
    /// Directory produced last, listed on the following call
    to_list: Option<PathBuf>,
    /// Failures waiting to be yielded
    failures: VecDeque<WalkFailure>,
}

impl<'a, R: RemoteFs> TreeWalker<'a, R> {
    /// Resolve the traversal root.
    ///
    /// Fails when the root cannot be stat'ed or is neither a directory nor a
    /// regular file; nothing can be transferred in that case.
    pub fn new(remote: &'a R, root: &Path, destination: &Path) -> Result<Self> {
        let root_stat = remote.stat(root)?;

        if root_stat.kind == EntryKind::Other {
            return Err(OwlError::InvalidPath(format!(
                "{} is neither a regular file nor a directory",
                root.display()
            )));
        }

        Ok(Self {
            remote,
            root: root.to_path_buf(),
            root_stat,
            destination: destination.to_path_buf(),
            mapper: PathMapper::new(root, destination),
            state: WalkState::NotStarted,
            stack: Vec::new(),
            to_list: None,
            failures: VecDeque::new(),
        })
    }

    fn start(&mut self) -> Option<std::result::Result<TransferUnit, WalkFailure>> {
        self.state = WalkState::Enumerating;

        if self.root_stat.kind == EntryKind::RegularFile {
            // Single file: copied to the destination path itself
            self.state = WalkState::Done;
            return Some(Ok(TransferUnit::new(
                self.root.clone(),
                self.destination.clone(),
                self.root_stat,
            )));
        }

        self.stack.push((self.root.clone(), self.root_stat));
        self.advance()
    }

    fn list_children(&mut self, dir: PathBuf) {
        let mut children = match self.remote.list_dir(&dir) {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", dir.display(), e);
                self.failures.push_back(WalkFailure::new(&dir, &e));
                return;
            }
        };

        children.sort_by(|a, b| a.name.cmp(&b.name));

        // Reversed so the smallest name is popped first
        for child in children.into_iter().rev() {
            if child.name == Path::new(".") || child.name == Path::new("..") {
                continue;
            }
            let path = dir.join(&child.name);
            if !is_safe_name(&child.name) {
                let err = OwlError::InvalidPath(format!(
                    "server returned unsafe entry name {:?}",
                    child.name
                ));
                tracing::warn!("Skipping {}: {}", path.display(), err);
                self.failures.push_back(WalkFailure::new(&path, &err));
                continue;
            }
            self.stack.push((path, child.stat));
        }
    }

    fn advance(&mut self) -> Option<std::result::Result<TransferUnit, WalkFailure>> {
        loop {
            if let Some(failure) = self.failures.pop_front() {
                return Some(Err(failure));
            }

            if let Some(dir) = self.to_list.take() {
                self.list_children(dir);
                continue;
            }

            let Some((path, stat)) = self.stack.pop() else {
                self.state = WalkState::Done;
                return None;
            };

            let dest = match self.mapper.map(&path) {
                Ok(dest) => dest,
                Err(e) => return Some(Err(WalkFailure::new(&path, &e))),
            };

            if stat.kind == EntryKind::Directory {
                self.to_list = Some(path.clone());
            }

            return Some(Ok(TransferUnit::new(path, dest, stat)));
        }
    }
}

impl<R: RemoteFs> Iterator for TreeWalker<'_, R> {
    type Item = std::result::Result<TransferUnit, WalkFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            WalkState::NotStarted => self.start(),
            WalkState::Enumerating => self.advance(),
            WalkState::Done => None,
        }
    }
}

/// Everything one traversal produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Walk {
    /// Units in traversal order
    pub units: Vec<TransferUnit>,
    /// Entries or subtrees left out
    pub failures: Vec<WalkFailure>,
}

/// Enumerate `root` completely
pub fn walk<R: RemoteFs>(remote: &R, root: &Path, destination: &Path) -> Result<Walk> {
    let mut result = Walk::default();

    for item in TreeWalker::new(remote, root, destination)? {
        match item {
            Ok(unit) => result.units.push(unit),
            Err(failure) => result.failures.push(failure),
        }
    }

    Ok(result)
}
