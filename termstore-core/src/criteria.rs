//! Branch-criteria selectors.
//!
//! A [`BranchCriteria`] names a slice of a branch's versioned content without
//! committing to any query language; the store interprets it. The four
//! selectors mirror the version-control views the semantic-index pipeline
//! needs: committed content, the open commit's deltas, everything authored on
//! a branch, and committed-plus-open content.

use crate::branch::{Branch, Commit};
use crate::ids::Timepoint;

/// Which slice of a branch's content a query addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Content visible on the branch before the open commit (committed
    /// content only, as of `head`)
    BeforeOpenCommit { head: Timepoint },
    /// Versions created or ended within the open commit only
    WithinOpenCommit { timepoint: Timepoint },
    /// All versions authored on the branch itself, superseded ones included
    ChangesOnBranch,
    /// Content visible including the open commit's writes
    IncludingOpenCommit { timepoint: Timepoint },
}

/// A branch path plus a content [`Selector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCriteria {
    pub path: String,
    pub selector: Selector,
}

impl BranchCriteria {
    /// Committed content on the commit's branch, excluding the open commit
    pub fn before_open_commit(commit: &Commit) -> Self {
        Self {
            path: commit.branch.path.clone(),
            selector: Selector::BeforeOpenCommit {
                head: commit.branch.head,
            },
        }
    }

    /// Committed content visible on a branch (no commit open)
    pub fn committed(branch: &Branch) -> Self {
        Self {
            path: branch.path.clone(),
            selector: Selector::BeforeOpenCommit { head: branch.head },
        }
    }

    /// Versions created or ended within the open commit only
    pub fn within_open_commit(commit: &Commit) -> Self {
        Self {
            path: commit.branch.path.clone(),
            selector: Selector::WithinOpenCommit {
                timepoint: commit.timepoint,
            },
        }
    }

    /// Everything authored on the branch, for rebase-scope replay
    pub fn changes_on_branch(branch: &Branch) -> Self {
        Self {
            path: branch.path.clone(),
            selector: Selector::ChangesOnBranch,
        }
    }

    /// Content visible including the open commit's writes
    pub fn including_open_commit(commit: &Commit) -> Self {
        Self {
            path: commit.branch.path.clone(),
            selector: Selector::IncludingOpenCommit {
                timepoint: commit.timepoint,
            },
        }
    }
}
