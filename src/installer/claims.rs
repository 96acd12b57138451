//! First-come-first-served destination claims
//!
//! A destination is taken when it equals a prior claim, lies inside a
//! claimed directory, or contains a claimed path. The workarea root is
//! canonicalized once and every destination is keyed lexically beneath it,
//! so a symlink placed in the workarea is keyed by where it sits rather
//! than where it points.

use std::collections::BTreeSet;
use std::ops::Bound;
use std::path::{Component, Path, PathBuf};

#[derive(Debug)]
pub struct ClaimSet {
    workarea: PathBuf,
    root: PathBuf,
    claimed: BTreeSet<PathBuf>,
}

impl ClaimSet {
    pub fn new(workarea: &Path) -> Self {
        Self {
            workarea: workarea.to_path_buf(),
            root: dunce::canonicalize(workarea).unwrap_or_else(|_| workarea.to_path_buf()),
            claimed: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_taken(&self, path: &Path) -> bool {
        self.is_taken_key(&self.key(path))
    }

    /// Claim `path`. Returns `false` when it is already taken.
    pub fn claim(&mut self, path: &Path) -> bool {
        let key = self.key(path);
        if self.is_taken_key(&key) {
            return false;
        }
        self.claimed.insert(key)
    }

    /// Key of `path`: its location under the canonical workarea root
    pub fn key(&self, path: &Path) -> PathBuf {
        let relative = path.strip_prefix(&self.workarea).unwrap_or(path);
        normalize(&self.root.join(relative))
    }

    fn is_taken_key(&self, key: &Path) -> bool {
        if key.ancestors().any(|ancestor| self.claimed.contains(ancestor)) {
            return true;
        }
        // Descendants of `key` sort directly after it
        self.claimed
            .range::<Path, _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .is_some_and(|next| next.starts_with(key))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
