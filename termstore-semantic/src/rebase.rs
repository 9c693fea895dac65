//! Rebase reconciliation.
//!
//! A rebase commit re-parents a branch onto a newer snapshot of its parent,
//! leaving the branch's own projection rows stale relative to the new base.
//! The reconciler ends every branch-authored row version and restores the
//! visibility of parent rows the branch had hidden; the normal pipeline then
//! replays all branch-local content over the new base and re-hides or
//! overwrites rows as needed.

use crate::error::Result;
use std::collections::HashSet;
use termstore_core::{Branch, Commit, ComponentKind, TermStore};

/// Invalidate the branch's own projection rows ahead of a rebase replay.
pub(crate) async fn remove_query_concept_changes_on_branch<S: TermStore>(
    store: &S,
    commit: &Commit,
) -> Result<()> {
    store.end_query_concept_versions_on_branch(commit).await?;

    let restored = store
        .clear_query_concept_versions_replaced(commit.branch_path())
        .await?;
    tracing::info!(
        restored,
        "Restored visibility of query concepts from parents"
    );
    Ok(())
}

/// The deletions a rebase replay must honor: every relationship and axiom
/// member the branch has hidden from its parent.
pub(crate) fn rebase_deletions(branch: &Branch) -> HashSet<String> {
    let mut deletions: HashSet<String> =
        branch.versions_replaced(ComponentKind::AxiomMember).clone();
    deletions.extend(
        branch
            .versions_replaced(ComponentKind::Relationship)
            .iter()
            .cloned(),
    );
    deletions
}
