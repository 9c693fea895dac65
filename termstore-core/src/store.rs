//! Versioned-store query surface for the semantic index.
//!
//! The trait models a search-index-backed document store: filtered streaming
//! range-scans with sort, count-with-filter, batched versioned upsert, and
//! batched end-version operations. Streams are bounded-memory iterators;
//! implementations may page with scroll cursors, search-after, or keyset
//! pagination, and the in-memory reference implementation pages trivially.
//!
//! Set-valued filters exist because identifier collections can exceed any
//! single-query upper bound the backing store imposes; implementations are
//! expected to apply them as filter clauses, not query criteria.

use crate::branch::{Branch, Commit};
use crate::component::{AxiomMember, QueryConcept, Relationship, StoredVersion};
use crate::criteria::BranchCriteria;
use crate::error::Result;
use crate::ids::{ConceptId, Timepoint};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashSet;

/// A bounded-memory stream of component versions
pub type VersionStream<T> = BoxStream<'static, Result<StoredVersion<T>>>;

/// Filters and sort for relationship version scans.
///
/// `replay_sorted` requests the `(effective_time, active, start)` ascending
/// order the delta replay depends on; unreleased content (no effective time)
/// sorts last.
#[derive(Debug, Clone, Default)]
pub struct RelationshipQuery {
    pub type_id: Option<ConceptId>,
    pub type_id_not: Option<ConceptId>,
    pub characteristic_type_ids: Option<Vec<ConceptId>>,
    pub active: Option<bool>,
    pub source_id_not_in: Option<HashSet<ConceptId>>,
    pub replay_sorted: bool,
}

/// Filters and sort for axiom-member version scans.
#[derive(Debug, Clone, Default)]
pub struct AxiomMemberQuery {
    pub refset_id: Option<ConceptId>,
    pub active: Option<bool>,
    pub replay_sorted: bool,
}

/// Filters for projection-row scans.
///
/// `exclude_ended_at` drops row versions ended at the given `(path,
/// timepoint)`, which skips rows the open commit itself already ended.
#[derive(Debug, Clone, Default)]
pub struct QueryConceptQuery {
    pub stated: Option<bool>,
    pub concept_ids: Option<HashSet<ConceptId>>,
    pub concept_id_forms: Option<HashSet<String>>,
    pub ancestors_any_of: Option<HashSet<ConceptId>>,
    pub exclude_ended_at: Option<(String, Timepoint)>,
}

/// The versioned-store operations the semantic-index pipeline requires.
#[async_trait]
pub trait TermStore: Send + Sync {
    /// Load a branch snapshot
    async fn load_branch(&self, path: &str) -> Result<Branch>;

    /// Open a commit on a branch, taking its write lock
    async fn open_commit(&self, path: &str, metadata: Option<String>) -> Result<Commit>;

    /// Finalize a commit's staged writes and advance the branch head
    async fn mark_commit_successful(&self, commit: &Commit) -> Result<()>;

    /// Discard a commit's staged writes and release the branch lock
    async fn rollback_commit(&self, commit: &Commit) -> Result<()>;

    /// Stream relationship versions matching `criteria` and `query`
    fn stream_relationships(
        &self,
        criteria: &BranchCriteria,
        query: RelationshipQuery,
    ) -> VersionStream<Relationship>;

    /// Stream axiom-member versions matching `criteria` and `query`
    fn stream_axiom_members(
        &self,
        criteria: &BranchCriteria,
        query: AxiomMemberQuery,
    ) -> VersionStream<AxiomMember>;

    /// Stream projection rows matching `criteria` and `query`
    fn stream_query_concepts(
        &self,
        criteria: &BranchCriteria,
        query: QueryConceptQuery,
    ) -> BoxStream<'static, Result<QueryConcept>>;

    /// Count active concepts whose id is in `concept_ids`
    async fn count_active_concepts(
        &self,
        criteria: &BranchCriteria,
        concept_ids: &HashSet<ConceptId>,
    ) -> Result<usize>;

    /// Stream the ids of active concepts whose id is in `concept_ids`
    fn stream_active_concept_ids(
        &self,
        criteria: &BranchCriteria,
        concept_ids: HashSet<ConceptId>,
    ) -> BoxStream<'static, Result<ConceptId>>;

    /// Versioned batch upsert of projection rows at this commit.
    ///
    /// A row marked deleted ends the current version without writing a new
    /// one. Writing over a parent-visible row records the replacement in the
    /// branch's versions-replaced set.
    async fn save_query_concepts(&self, commit: &Commit, batch: Vec<QueryConcept>) -> Result<()>;

    /// End every projection-row version authored on the commit's branch.
    /// Returns the number of versions ended.
    async fn end_query_concept_versions_on_branch(&self, commit: &Commit) -> Result<usize>;

    /// Clear the branch's projection-row versions-replaced set, restoring
    /// visibility of parent rows. Returns the number of entries cleared.
    async fn clear_query_concept_versions_replaced(&self, branch_path: &str) -> Result<usize>;
}
