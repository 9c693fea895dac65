//! Branch and commit model.
//!
//! Branches form a path tree rooted at `MAIN` (`MAIN`, `MAIN/A`, `MAIN/A/B`).
//! Content on a branch layers over a snapshot of its parent taken at the
//! branch's `base` timepoint; parent versions hidden on the branch are
//! recorded in per-kind versions-replaced sets. A commit is an atomic write
//! transaction on one branch; commit listeners run between staged writes and
//! durability, and a listener error rolls the commit back.

use crate::component::ComponentKind;
use crate::error::Result;
use crate::ids::Timepoint;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Parent path of a branch path, or `None` for the root branch.
///
/// `parent_path("MAIN/A/B") == Some("MAIN/A")`, `parent_path("MAIN") == None`.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

fn empty_id_set() -> &'static HashSet<String> {
    static EMPTY: OnceLock<HashSet<String>> = OnceLock::new();
    EMPTY.get_or_init(HashSet::new)
}

/// A snapshot of one branch's version-control state.
#[derive(Debug, Clone)]
pub struct Branch {
    pub path: String,
    /// Timepoint of the parent snapshot this branch is based on
    pub base: Timepoint,
    /// Timepoint of the last successful commit on this branch
    pub head: Timepoint,
    /// Parent-branch component ids hidden on this branch, per kind
    pub versions_replaced: HashMap<ComponentKind, HashSet<String>>,
}

impl Branch {
    /// The ids of parent-branch versions hidden on this branch for `kind`
    pub fn versions_replaced(&self, kind: ComponentKind) -> &HashSet<String> {
        self.versions_replaced.get(&kind).unwrap_or_else(|| empty_id_set())
    }
}

/// Whether a commit writes content or re-parents the branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    /// Regular content commit
    Content,
    /// Re-parents the branch onto a newer snapshot of its parent
    Rebase,
}

/// An open write transaction on a branch.
///
/// The branch snapshot is taken when the commit opens; for rebase commits it
/// already carries the new `base`. `entities_deleted` is populated by the
/// store before commit listeners run.
#[derive(Debug, Clone)]
pub struct Commit {
    pub branch: Branch,
    pub timepoint: Timepoint,
    pub commit_type: CommitType,
    /// Component ids hard-deleted within this commit
    pub entities_deleted: HashSet<String>,
    /// Lock metadata describing why the commit was opened
    pub metadata: Option<String>,
}

impl Commit {
    /// Whether this commit re-parents the branch
    pub fn is_rebase(&self) -> bool {
        self.commit_type == CommitType::Rebase
    }

    /// Path of the branch this commit writes to
    pub fn branch_path(&self) -> &str {
        &self.branch.path
    }
}

/// Hook invoked for every commit between staged writes and durability.
///
/// An error return aborts the commit: the store rolls back all staged writes
/// and the commit is never marked successful.
#[async_trait]
pub trait CommitListener: Send + Sync {
    async fn pre_commit_completion(&self, commit: &Commit) -> Result<()>;
}
