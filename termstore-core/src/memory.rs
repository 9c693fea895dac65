//! In-memory reference implementation of the versioned store.
//!
//! `MemoryStore` implements [`TermStore`] plus the branch/commit lifecycle and
//! the authoring operations integration tests need. Visibility follows the
//! layered branch model: a version is visible on a branch if it was authored
//! there and is alive at the as-of timepoint, or if it is visible from the
//! parent branch at this branch's base timepoint and its component id is not
//! in the branch's versions-replaced set for that kind.
//!
//! Commits stage writes directly; completion runs the registered commit
//! listeners and either advances the branch head or rolls every staged write
//! back. Streams page trivially over an owned snapshot, which satisfies the
//! bounded-memory stream contract for in-memory data.

use crate::branch::{parent_path, Branch, Commit, CommitListener, CommitType};
use crate::component::{
    AxiomMember, ComponentKind, Concept, QueryConcept, Relationship, StoredVersion,
};
use crate::criteria::{BranchCriteria, Selector};
use crate::error::{Error, Result};
use crate::ids::{ConceptId, Timepoint};
use crate::store::{
    AxiomMemberQuery, QueryConceptQuery, RelationshipQuery, TermStore, VersionStream,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Versioned-document identity within one component collection.
trait Doc {
    const KIND: ComponentKind;
    fn doc_id(&self) -> String;
}

impl Doc for Concept {
    const KIND: ComponentKind = ComponentKind::Concept;
    fn doc_id(&self) -> String {
        self.concept_id.to_string()
    }
}

impl Doc for Relationship {
    const KIND: ComponentKind = ComponentKind::Relationship;
    fn doc_id(&self) -> String {
        self.id.clone()
    }
}

impl Doc for AxiomMember {
    const KIND: ComponentKind = ComponentKind::AxiomMember;
    fn doc_id(&self) -> String {
        self.member_id.clone()
    }
}

impl Doc for QueryConcept {
    const KIND: ComponentKind = ComponentKind::QueryConcept;
    fn doc_id(&self) -> String {
        self.concept_id_form.clone()
    }
}

#[derive(Debug)]
struct OpenCommit {
    timepoint: Timepoint,
    commit_type: CommitType,
    metadata: Option<String>,
    entities_deleted: HashSet<String>,
    /// versions-replaced entries added by this commit, for rollback
    replaced_added: Vec<(ComponentKind, String)>,
    /// snapshot of the projection versions-replaced set before it was cleared
    cleared_replaced: Option<HashSet<String>>,
    /// base before a rebase commit moved it
    prior_base: Timepoint,
}

#[derive(Debug)]
struct BranchState {
    base: Timepoint,
    head: Timepoint,
    versions_replaced: HashMap<ComponentKind, HashSet<String>>,
    open: Option<OpenCommit>,
}

impl BranchState {
    fn snapshot(&self, path: &str) -> Branch {
        Branch {
            path: path.to_string(),
            base: self.base,
            head: self.head,
            versions_replaced: self.versions_replaced.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    branches: HashMap<String, BranchState>,
    concepts: Vec<StoredVersion<Concept>>,
    relationships: Vec<StoredVersion<Relationship>>,
    axiom_members: Vec<StoredVersion<AxiomMember>>,
    query_concepts: Vec<StoredVersion<QueryConcept>>,
    clock: Timepoint,
}

/// Collect the versions of one kind visible on `path` as of `as_of` into
/// `out`: own live versions first, then parent contributions minus the
/// versions-replaced set, recursively up the branch tree.
fn collect_visible<T: Doc + Clone>(
    branches: &HashMap<String, BranchState>,
    docs: &[StoredVersion<T>],
    path: &str,
    as_of: Timepoint,
    out: &mut Vec<StoredVersion<T>>,
) {
    for version in docs {
        if version.path == path
            && version.start <= as_of
            && version.end.map_or(true, |end| end > as_of)
        {
            out.push(version.clone());
        }
    }
    if let (Some(parent), Some(state)) = (parent_path(path), branches.get(path)) {
        let replaced = state.versions_replaced.get(&T::KIND);
        let mut from_parent = Vec::new();
        collect_visible(branches, docs, parent, state.base.min(as_of), &mut from_parent);
        for version in from_parent {
            if replaced.map_or(true, |set| !set.contains(&version.component.doc_id())) {
                out.push(version);
            }
        }
    }
}

fn visible<T: Doc + Clone>(
    branches: &HashMap<String, BranchState>,
    docs: &[StoredVersion<T>],
    path: &str,
    as_of: Timepoint,
) -> Vec<StoredVersion<T>> {
    let mut out = Vec::new();
    collect_visible(branches, docs, path, as_of, &mut out);
    out
}

/// Resolve a branch-criteria selector over one component collection.
fn select<T: Doc + Clone>(
    branches: &HashMap<String, BranchState>,
    docs: &[StoredVersion<T>],
    criteria: &BranchCriteria,
) -> Vec<StoredVersion<T>> {
    match &criteria.selector {
        Selector::BeforeOpenCommit { head } => visible(branches, docs, &criteria.path, *head),
        Selector::IncludingOpenCommit { timepoint } => {
            visible(branches, docs, &criteria.path, *timepoint)
        }
        Selector::WithinOpenCommit { timepoint } => docs
            .iter()
            .filter(|v| {
                v.path == criteria.path && (v.start == *timepoint || v.end == Some(*timepoint))
            })
            .cloned()
            .collect(),
        Selector::ChangesOnBranch => docs
            .iter()
            .filter(|v| v.path == criteria.path)
            .cloned()
            .collect(),
    }
}

/// End the current own-branch version of `component`, stage the new version
/// (unless deleting), and report whether a parent-branch version must be
/// recorded as replaced.
fn upsert_into<T: Doc + Clone>(
    branches: &HashMap<String, BranchState>,
    docs: &mut Vec<StoredVersion<T>>,
    branch_path: &str,
    timepoint: Timepoint,
    component: T,
    delete: bool,
) -> Option<String> {
    let id = component.doc_id();
    if let Some(version) = docs
        .iter_mut()
        .find(|v| v.path == branch_path && v.end.is_none() && v.component.doc_id() == id)
    {
        version.end = Some(timepoint);
    }
    let head = branches.get(branch_path).map(|b| b.head).unwrap_or(0);
    let replaces_parent = visible(branches, docs, branch_path, head)
        .iter()
        .any(|v| v.path != branch_path && v.component.doc_id() == id);
    if !delete {
        docs.push(StoredVersion::new(branch_path, timepoint, component));
    }
    replaces_parent.then_some(id)
}

/// In-memory versioned store. Cheap to clone; all clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a branch. Non-root paths require the parent branch to exist;
    /// the new branch is based on the parent's current head.
    pub fn create_branch(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.branches.contains_key(path) {
            return Err(Error::branch(format!("branch already exists: {path}")));
        }
        let base = match parent_path(path) {
            Some(parent) => {
                inner
                    .branches
                    .get(parent)
                    .ok_or_else(|| Error::branch(format!("parent branch missing: {parent}")))?
                    .head
            }
            None => 0,
        };
        inner.clock += 1;
        let head = inner.clock;
        inner.branches.insert(
            path.to_string(),
            BranchState {
                base,
                head,
                versions_replaced: HashMap::new(),
                open: None,
            },
        );
        Ok(())
    }

    fn open_commit_inner(
        &self,
        path: &str,
        metadata: Option<String>,
        commit_type: CommitType,
    ) -> Result<Commit> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.clock += 1;
        let timepoint = inner.clock;
        let state = inner
            .branches
            .get_mut(path)
            .ok_or_else(|| Error::not_found(format!("branch {path}")))?;
        if state.open.is_some() {
            return Err(Error::branch(format!("commit already open on {path}")));
        }
        let prior_base = state.base;
        if commit_type == CommitType::Rebase {
            let parent = parent_path(path)
                .ok_or_else(|| Error::branch(format!("cannot rebase root branch {path}")))?
                .to_string();
            drop(state);
            let parent_head = inner
                .branches
                .get(&parent)
                .ok_or_else(|| Error::not_found(format!("branch {parent}")))?
                .head;
            let state = inner.branches.get_mut(path).expect("branch exists");
            state.base = parent_head;
            state.open = Some(OpenCommit {
                timepoint,
                commit_type,
                metadata: metadata.clone(),
                entities_deleted: HashSet::new(),
                replaced_added: Vec::new(),
                cleared_replaced: None,
                prior_base,
            });
            let branch = state.snapshot(path);
            return Ok(Commit {
                branch,
                timepoint,
                commit_type,
                entities_deleted: HashSet::new(),
                metadata,
            });
        }
        state.open = Some(OpenCommit {
            timepoint,
            commit_type,
            metadata: metadata.clone(),
            entities_deleted: HashSet::new(),
            replaced_added: Vec::new(),
            cleared_replaced: None,
            prior_base,
        });
        let branch = state.snapshot(path);
        Ok(Commit {
            branch,
            timepoint,
            commit_type,
            entities_deleted: HashSet::new(),
            metadata,
        })
    }

    /// Open a rebase commit: re-parents the branch onto the parent's current
    /// head before the commit runs.
    pub fn open_rebase_commit(&self, path: &str) -> Result<Commit> {
        self.open_commit_inner(path, None, CommitType::Rebase)
    }

    fn validate_open(state: &BranchState, commit: &Commit) -> Result<()> {
        match &state.open {
            Some(open) if open.timepoint == commit.timepoint => Ok(()),
            _ => Err(Error::branch(format!(
                "no open commit at timepoint {} on {}",
                commit.timepoint, commit.branch.path
            ))),
        }
    }

    fn record_replacements(
        state: &mut BranchState,
        kind: ComponentKind,
        replaced_ids: Vec<String>,
    ) {
        for id in replaced_ids {
            if state
                .versions_replaced
                .entry(kind)
                .or_default()
                .insert(id.clone())
            {
                if let Some(open) = state.open.as_mut() {
                    open.replaced_added.push((kind, id));
                }
            }
        }
    }

    /// Stage concept writes in an open commit.
    pub fn save_concepts(&self, commit: &Commit, concepts: Vec<Concept>) -> Result<()> {
        self.save_components(commit, concepts, |inner| &mut inner.concepts)
    }

    /// Stage relationship writes in an open commit.
    pub fn save_relationships(
        &self,
        commit: &Commit,
        relationships: Vec<Relationship>,
    ) -> Result<()> {
        self.save_components(commit, relationships, |inner| &mut inner.relationships)
    }

    /// Stage axiom-member writes in an open commit.
    pub fn save_axiom_members(&self, commit: &Commit, members: Vec<AxiomMember>) -> Result<()> {
        self.save_components(commit, members, |inner| &mut inner.axiom_members)
    }

    fn save_components<T: Doc + Clone>(
        &self,
        commit: &Commit,
        components: Vec<T>,
        collection: fn(&mut StoreInner) -> &mut Vec<StoredVersion<T>>,
    ) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let state = inner
            .branches
            .get(commit.branch_path())
            .ok_or_else(|| Error::not_found(format!("branch {}", commit.branch.path)))?;
        Self::validate_open(state, commit)?;

        let mut docs = std::mem::take(collection(&mut inner));
        let mut replaced_ids = Vec::new();
        for component in components {
            if let Some(id) = upsert_into(
                &inner.branches,
                &mut docs,
                commit.branch_path(),
                commit.timepoint,
                component,
                false,
            ) {
                replaced_ids.push(id);
            }
        }
        *collection(&mut *inner) = docs;
        let state = inner
            .branches
            .get_mut(commit.branch_path())
            .expect("branch exists");
        Self::record_replacements(state, T::KIND, replaced_ids);
        Ok(())
    }

    /// Hard-delete a component in an open commit: ends the branch-authored
    /// version, hides any parent version, and records the id in the commit's
    /// deleted-entity set.
    pub fn delete_component(&self, commit: &Commit, kind: ComponentKind, id: &str) -> Result<()> {
        fn delete_in<T: Doc + Clone>(
            branches: &HashMap<String, BranchState>,
            docs: &mut [StoredVersion<T>],
            branch_path: &str,
            timepoint: Timepoint,
            id: &str,
        ) -> Option<String> {
            if let Some(version) = docs
                .iter_mut()
                .find(|v| v.path == branch_path && v.end.is_none() && v.component.doc_id() == id)
            {
                version.end = Some(timepoint);
            }
            let head = branches.get(branch_path).map(|b| b.head).unwrap_or(0);
            let mut vis = Vec::new();
            collect_visible(branches, docs, branch_path, head, &mut vis);
            vis.iter()
                .any(|v| v.path != branch_path && v.component.doc_id() == id)
                .then(|| id.to_string())
        }

        let mut inner = self.inner.write().expect("store lock poisoned");
        let state = inner
            .branches
            .get(commit.branch_path())
            .ok_or_else(|| Error::not_found(format!("branch {}", commit.branch.path)))?;
        Self::validate_open(state, commit)?;

        let path = commit.branch_path().to_string();
        let tp = commit.timepoint;
        let replaced = match kind {
            ComponentKind::Concept => {
                let mut docs = std::mem::take(&mut inner.concepts);
                let r = delete_in(&inner.branches, &mut docs, &path, tp, id);
                inner.concepts = docs;
                r
            }
            ComponentKind::Relationship => {
                let mut docs = std::mem::take(&mut inner.relationships);
                let r = delete_in(&inner.branches, &mut docs, &path, tp, id);
                inner.relationships = docs;
                r
            }
            ComponentKind::AxiomMember => {
                let mut docs = std::mem::take(&mut inner.axiom_members);
                let r = delete_in(&inner.branches, &mut docs, &path, tp, id);
                inner.axiom_members = docs;
                r
            }
            ComponentKind::QueryConcept => {
                let mut docs = std::mem::take(&mut inner.query_concepts);
                let r = delete_in(&inner.branches, &mut docs, &path, tp, id);
                inner.query_concepts = docs;
                r
            }
        };
        let state = inner.branches.get_mut(&path).expect("branch exists");
        if let Some(replaced_id) = replaced {
            Self::record_replacements(state, kind, vec![replaced_id]);
        }
        if let Some(open) = state.open.as_mut() {
            open.entities_deleted.insert(id.to_string());
        }
        Ok(())
    }

    /// Run the registered listeners against the commit and finalize it, or
    /// roll every staged write back if a listener fails.
    pub async fn complete_commit(
        &self,
        commit: &Commit,
        listeners: &[Arc<dyn CommitListener>],
    ) -> Result<()> {
        let refreshed = {
            let inner = self.inner.read().expect("store lock poisoned");
            let state = inner
                .branches
                .get(commit.branch_path())
                .ok_or_else(|| Error::not_found(format!("branch {}", commit.branch.path)))?;
            Self::validate_open(state, commit)?;
            let open = state.open.as_ref().expect("validated open commit");
            Commit {
                branch: state.snapshot(commit.branch_path()),
                timepoint: open.timepoint,
                commit_type: open.commit_type,
                entities_deleted: open.entities_deleted.clone(),
                metadata: open.metadata.clone(),
            }
        };
        for listener in listeners {
            if let Err(listener_error) = listener.pre_commit_completion(&refreshed).await {
                self.rollback_commit(commit).await?;
                return Err(listener_error);
            }
        }
        self.mark_commit_successful(commit).await
    }
}

#[async_trait]
impl TermStore for MemoryStore {
    async fn load_branch(&self, path: &str) -> Result<Branch> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .branches
            .get(path)
            .map(|state| state.snapshot(path))
            .ok_or_else(|| Error::not_found(format!("branch {path}")))
    }

    async fn open_commit(&self, path: &str, metadata: Option<String>) -> Result<Commit> {
        self.open_commit_inner(path, metadata, CommitType::Content)
    }

    async fn mark_commit_successful(&self, commit: &Commit) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let state = inner
            .branches
            .get_mut(commit.branch_path())
            .ok_or_else(|| Error::not_found(format!("branch {}", commit.branch.path)))?;
        Self::validate_open(state, commit)?;
        state.head = commit.timepoint;
        state.open = None;
        Ok(())
    }

    async fn rollback_commit(&self, commit: &Commit) -> Result<()> {
        fn revert<T>(docs: &mut Vec<StoredVersion<T>>, path: &str, timepoint: Timepoint) {
            docs.retain(|v| !(v.path == path && v.start == timepoint));
            for version in docs.iter_mut() {
                if version.path == path && version.end == Some(timepoint) {
                    version.end = None;
                }
            }
        }

        let mut inner = self.inner.write().expect("store lock poisoned");
        let state = inner
            .branches
            .get_mut(commit.branch_path())
            .ok_or_else(|| Error::not_found(format!("branch {}", commit.branch.path)))?;
        Self::validate_open(state, commit)?;
        let open = state.open.take().expect("validated open commit");
        for (kind, id) in &open.replaced_added {
            if let Some(set) = state.versions_replaced.get_mut(kind) {
                set.remove(id);
            }
        }
        if let Some(snapshot) = open.cleared_replaced {
            state
                .versions_replaced
                .insert(ComponentKind::QueryConcept, snapshot);
        }
        state.base = open.prior_base;

        let path = commit.branch_path().to_string();
        let timepoint = commit.timepoint;
        revert(&mut inner.concepts, &path, timepoint);
        revert(&mut inner.relationships, &path, timepoint);
        revert(&mut inner.axiom_members, &path, timepoint);
        revert(&mut inner.query_concepts, &path, timepoint);
        Ok(())
    }

    fn stream_relationships(
        &self,
        criteria: &BranchCriteria,
        query: RelationshipQuery,
    ) -> VersionStream<Relationship> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut versions: Vec<_> = select(&inner.branches, &inner.relationships, criteria)
            .into_iter()
            .filter(|v| {
                let rel = &v.component;
                query.type_id.map_or(true, |t| rel.type_id == t)
                    && query.type_id_not.map_or(true, |t| rel.type_id != t)
                    && query
                        .characteristic_type_ids
                        .as_ref()
                        .map_or(true, |ids| ids.contains(&rel.characteristic_type_id))
                    && query.active.map_or(true, |a| rel.active == a)
                    && query
                        .source_id_not_in
                        .as_ref()
                        .map_or(true, |ids| !ids.contains(&rel.source_id))
            })
            .collect();
        drop(inner);
        if query.replay_sorted {
            versions.sort_by_key(|v| {
                (
                    v.component.effective_time.unwrap_or(i32::MAX),
                    v.component.active,
                    v.start,
                )
            });
        }
        stream::iter(versions.into_iter().map(Ok)).boxed()
    }

    fn stream_axiom_members(
        &self,
        criteria: &BranchCriteria,
        query: AxiomMemberQuery,
    ) -> VersionStream<AxiomMember> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut versions: Vec<_> = select(&inner.branches, &inner.axiom_members, criteria)
            .into_iter()
            .filter(|v| {
                let member = &v.component;
                query.refset_id.map_or(true, |r| member.refset_id == r)
                    && query.active.map_or(true, |a| member.active == a)
            })
            .collect();
        drop(inner);
        if query.replay_sorted {
            versions.sort_by_key(|v| {
                (
                    v.component.effective_time.unwrap_or(i32::MAX),
                    v.component.active,
                    v.start,
                )
            });
        }
        stream::iter(versions.into_iter().map(Ok)).boxed()
    }

    fn stream_query_concepts(
        &self,
        criteria: &BranchCriteria,
        query: QueryConceptQuery,
    ) -> BoxStream<'static, Result<QueryConcept>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let rows: Vec<QueryConcept> = select(&inner.branches, &inner.query_concepts, criteria)
            .into_iter()
            .filter(|v| {
                query
                    .exclude_ended_at
                    .as_ref()
                    .map_or(true, |(path, tp)| {
                        !(v.path == *path && v.end == Some(*tp))
                    })
            })
            .map(|v| v.component)
            .filter(|qc| {
                query.stated.map_or(true, |s| qc.stated == s)
                    && query
                        .concept_ids
                        .as_ref()
                        .map_or(true, |ids| ids.contains(&qc.concept_id))
                    && query
                        .concept_id_forms
                        .as_ref()
                        .map_or(true, |forms| forms.contains(&qc.concept_id_form))
                    && query
                        .ancestors_any_of
                        .as_ref()
                        .map_or(true, |ids| qc.ancestors.iter().any(|a| ids.contains(a)))
            })
            .collect();
        drop(inner);
        stream::iter(rows.into_iter().map(Ok)).boxed()
    }

    async fn count_active_concepts(
        &self,
        criteria: &BranchCriteria,
        concept_ids: &HashSet<ConceptId>,
    ) -> Result<usize> {
        let inner = self.inner.read().expect("store lock poisoned");
        let found: HashSet<ConceptId> = select(&inner.branches, &inner.concepts, criteria)
            .into_iter()
            .filter(|v| v.component.active && concept_ids.contains(&v.component.concept_id))
            .map(|v| v.component.concept_id)
            .collect();
        Ok(found.len())
    }

    fn stream_active_concept_ids(
        &self,
        criteria: &BranchCriteria,
        concept_ids: HashSet<ConceptId>,
    ) -> BoxStream<'static, Result<ConceptId>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let found: HashSet<ConceptId> = select(&inner.branches, &inner.concepts, criteria)
            .into_iter()
            .filter(|v| v.component.active && concept_ids.contains(&v.component.concept_id))
            .map(|v| v.component.concept_id)
            .collect();
        drop(inner);
        stream::iter(found.into_iter().map(Ok)).boxed()
    }

    async fn save_query_concepts(&self, commit: &Commit, batch: Vec<QueryConcept>) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let state = inner
            .branches
            .get(commit.branch_path())
            .ok_or_else(|| Error::not_found(format!("branch {}", commit.branch.path)))?;
        Self::validate_open(state, commit)?;

        let mut docs = std::mem::take(&mut inner.query_concepts);
        let mut replaced_ids = Vec::new();
        for row in batch {
            let delete = row.is_deleted();
            if let Some(id) = upsert_into(
                &inner.branches,
                &mut docs,
                commit.branch_path(),
                commit.timepoint,
                row,
                delete,
            ) {
                replaced_ids.push(id);
            }
        }
        inner.query_concepts = docs;
        let state = inner
            .branches
            .get_mut(commit.branch_path())
            .expect("branch exists");
        Self::record_replacements(state, ComponentKind::QueryConcept, replaced_ids);
        Ok(())
    }

    async fn end_query_concept_versions_on_branch(&self, commit: &Commit) -> Result<usize> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let state = inner
            .branches
            .get(commit.branch_path())
            .ok_or_else(|| Error::not_found(format!("branch {}", commit.branch.path)))?;
        Self::validate_open(state, commit)?;
        let path = commit.branch_path().to_string();
        let timepoint = commit.timepoint;
        let mut ended = 0;
        for version in inner.query_concepts.iter_mut() {
            if version.path == path && version.end.is_none() {
                version.end = Some(timepoint);
                ended += 1;
            }
        }
        Ok(ended)
    }

    async fn clear_query_concept_versions_replaced(&self, branch_path: &str) -> Result<usize> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let state = inner
            .branches
            .get_mut(branch_path)
            .ok_or_else(|| Error::not_found(format!("branch {branch_path}")))?;
        let replaced = state
            .versions_replaced
            .entry(ComponentKind::QueryConcept)
            .or_default();
        let cleared = replaced.len();
        let snapshot = std::mem::take(replaced);
        if let Some(open) = state.open.as_mut() {
            if open.cleared_replaced.is_none() {
                open.cleared_replaced = Some(snapshot);
            }
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    const INFERRED: ConceptId = 900000000000011006;

    fn isa(id: &str, source: ConceptId, destination: ConceptId) -> Relationship {
        Relationship::new(id, source, 116680003, destination, INFERRED)
    }

    async fn commit_relationships(store: &MemoryStore, path: &str, rels: Vec<Relationship>) {
        let commit = store.open_commit(path, None).await.unwrap();
        store.save_relationships(&commit, rels).unwrap();
        store.mark_commit_successful(&commit).await.unwrap();
    }

    async fn visible_relationship_ids(store: &MemoryStore, path: &str) -> Vec<String> {
        let branch = store.load_branch(path).await.unwrap();
        let criteria = BranchCriteria::committed(&branch);
        let mut ids: Vec<String> = store
            .stream_relationships(&criteria, RelationshipQuery::default())
            .map(|v| v.unwrap().component.id)
            .collect()
            .await;
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn child_branch_sees_parent_content_from_its_base() {
        let store = MemoryStore::new();
        store.create_branch("MAIN").unwrap();
        commit_relationships(&store, "MAIN", vec![isa("r1", 2, 1)]).await;
        store.create_branch("MAIN/A").unwrap();
        // Authored on MAIN after the branch point: invisible on MAIN/A
        commit_relationships(&store, "MAIN", vec![isa("r2", 3, 1)]).await;

        assert_eq!(visible_relationship_ids(&store, "MAIN/A").await, vec!["r1"]);
        assert_eq!(
            visible_relationship_ids(&store, "MAIN").await,
            vec!["r1", "r2"]
        );
    }

    #[tokio::test]
    async fn branch_write_hides_parent_version() {
        let store = MemoryStore::new();
        store.create_branch("MAIN").unwrap();
        commit_relationships(&store, "MAIN", vec![isa("r1", 2, 1)]).await;
        store.create_branch("MAIN/A").unwrap();
        commit_relationships(&store, "MAIN/A", vec![isa("r1", 2, 1).with_active(false)]).await;

        let branch = store.load_branch("MAIN/A").await.unwrap();
        assert!(branch
            .versions_replaced(ComponentKind::Relationship)
            .contains("r1"));

        // Exactly one version visible on the child, the inactive one
        let criteria = BranchCriteria::committed(&branch);
        let versions: Vec<_> = store
            .stream_relationships(&criteria, RelationshipQuery::default())
            .map(|v| v.unwrap())
            .collect()
            .await;
        assert_eq!(versions.len(), 1);
        assert!(!versions[0].component.active);

        // Parent unaffected
        let main = store.load_branch("MAIN").await.unwrap();
        let criteria = BranchCriteria::committed(&main);
        let versions: Vec<_> = store
            .stream_relationships(&criteria, RelationshipQuery::default())
            .map(|v| v.unwrap())
            .collect()
            .await;
        assert!(versions[0].component.active);
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes_and_restored_ends() {
        let store = MemoryStore::new();
        store.create_branch("MAIN").unwrap();
        commit_relationships(&store, "MAIN", vec![isa("r1", 2, 1)]).await;

        let commit = store.open_commit("MAIN", None).await.unwrap();
        store
            .save_relationships(&commit, vec![isa("r1", 2, 1).with_active(false), isa("r2", 3, 1)])
            .unwrap();
        store.rollback_commit(&commit).await.unwrap();

        let ids = visible_relationship_ids(&store, "MAIN").await;
        assert_eq!(ids, vec!["r1"]);
        let branch = store.load_branch("MAIN").await.unwrap();
        let criteria = BranchCriteria::committed(&branch);
        let versions: Vec<_> = store
            .stream_relationships(&criteria, RelationshipQuery::default())
            .map(|v| v.unwrap())
            .collect()
            .await;
        assert!(versions[0].component.active, "supersede must be undone");
    }

    #[tokio::test]
    async fn within_open_commit_sees_only_this_commits_deltas() {
        let store = MemoryStore::new();
        store.create_branch("MAIN").unwrap();
        commit_relationships(&store, "MAIN", vec![isa("r1", 2, 1)]).await;

        let commit = store.open_commit("MAIN", None).await.unwrap();
        store.save_relationships(&commit, vec![isa("r2", 3, 1)]).unwrap();
        let criteria = BranchCriteria::within_open_commit(&commit);
        let ids: Vec<String> = store
            .stream_relationships(&criteria, RelationshipQuery::default())
            .map(|v| v.unwrap().component.id)
            .collect()
            .await;
        assert_eq!(ids, vec!["r2"]);
        store.mark_commit_successful(&commit).await.unwrap();
    }

    #[tokio::test]
    async fn rebase_moves_base_to_parent_head() {
        let store = MemoryStore::new();
        store.create_branch("MAIN").unwrap();
        store.create_branch("MAIN/A").unwrap();
        commit_relationships(&store, "MAIN", vec![isa("r1", 2, 1)]).await;

        assert!(visible_relationship_ids(&store, "MAIN/A").await.is_empty());

        let commit = store.open_rebase_commit("MAIN/A").unwrap();
        assert!(commit.is_rebase());
        store.mark_commit_successful(&commit).await.unwrap();

        assert_eq!(visible_relationship_ids(&store, "MAIN/A").await, vec!["r1"]);
    }

    #[tokio::test]
    async fn delete_component_records_entity_deletion() {
        let store = MemoryStore::new();
        store.create_branch("MAIN").unwrap();
        commit_relationships(&store, "MAIN", vec![isa("r1", 2, 1)]).await;

        let commit = store.open_commit("MAIN", None).await.unwrap();
        store
            .delete_component(&commit, ComponentKind::Relationship, "r1")
            .unwrap();
        let completed = store.complete_commit(&commit, &[]).await;
        assert!(completed.is_ok());
        assert!(visible_relationship_ids(&store, "MAIN").await.is_empty());
    }
}
