//! Shared harness for semantic-index integration tests: an in-memory store
//! with the updater registered as its commit listener, plus component
//! constructors for the scenarios.

// Each integration test binary uses a different subset of the harness.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use termstore_core::{
    AxiomMember, BranchCriteria, Commit, CommitListener, ConceptId, JsonAxiomConverter,
    MemoryStore, QueryConcept, QueryConceptQuery, Relationship, TermStore,
};
use termstore_semantic::{Form, SemanticIndexConfig, SemanticIndexUpdater};
use termstore_vocab::{characteristic, model, refset};
use futures::StreamExt;

pub const ROOT: ConceptId = model::SNOMED_CT_ROOT;

pub struct Fixture {
    pub store: MemoryStore,
    pub updater: Arc<SemanticIndexUpdater<MemoryStore>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(SemanticIndexConfig::default())
    }

    pub fn with_config(config: SemanticIndexConfig) -> Self {
        let store = MemoryStore::new();
        store.create_branch("MAIN").expect("create MAIN");
        let updater = Arc::new(SemanticIndexUpdater::new(
            store.clone(),
            Arc::new(JsonAxiomConverter),
            config,
        ));
        Self { store, updater }
    }

    fn listeners(&self) -> [Arc<dyn CommitListener>; 1] {
        [self.updater.clone()]
    }

    /// Open a commit, hand it to `stage` for authoring, and complete it.
    pub async fn commit(
        &self,
        path: &str,
        stage: impl FnOnce(&MemoryStore, &Commit),
    ) -> termstore_core::Result<()> {
        let commit = self.store.open_commit(path, None).await?;
        stage(&self.store, &commit);
        self.store.complete_commit(&commit, &self.listeners()).await
    }

    pub async fn commit_relationships(
        &self,
        path: &str,
        relationships: Vec<Relationship>,
    ) -> termstore_core::Result<()> {
        self.commit(path, |store, commit| {
            store
                .save_relationships(commit, relationships)
                .expect("stage relationships");
        })
        .await
    }

    pub async fn commit_axiom_members(
        &self,
        path: &str,
        members: Vec<AxiomMember>,
    ) -> termstore_core::Result<()> {
        self.commit(path, |store, commit| {
            store
                .save_axiom_members(commit, members)
                .expect("stage axiom members");
        })
        .await
    }

    pub async fn rebase(&self, path: &str) -> termstore_core::Result<()> {
        let commit = self.store.open_rebase_commit(path)?;
        self.store.complete_commit(&commit, &self.listeners()).await
    }

    /// The visible projection row for a concept, or `None`.
    pub async fn query_concept(
        &self,
        path: &str,
        concept_id: ConceptId,
        form: Form,
    ) -> Option<QueryConcept> {
        let branch = self.store.load_branch(path).await.expect("load branch");
        let criteria = BranchCriteria::committed(&branch);
        let mut rows = self.store.stream_query_concepts(
            &criteria,
            QueryConceptQuery {
                stated: Some(form.is_stated()),
                concept_ids: Some(HashSet::from([concept_id])),
                ..QueryConceptQuery::default()
            },
        );
        rows.next().await.transpose().expect("stream row")
    }

    /// Every visible projection row on a branch, sorted for comparison.
    pub async fn all_query_concepts(&self, path: &str) -> Vec<QueryConcept> {
        let branch = self.store.load_branch(path).await.expect("load branch");
        let criteria = BranchCriteria::committed(&branch);
        let mut rows: Vec<QueryConcept> = self
            .store
            .stream_query_concepts(&criteria, QueryConceptQuery::default())
            .map(|row| row.expect("stream row"))
            .collect()
            .await;
        rows.sort_by(|a, b| a.concept_id_form.cmp(&b.concept_id_form));
        rows
    }
}

pub fn inferred_isa(id: &str, source: ConceptId, destination: ConceptId) -> Relationship {
    Relationship::new(
        id,
        source,
        model::IS_A,
        destination,
        characteristic::INFERRED_RELATIONSHIP,
    )
}

pub fn stated_isa(id: &str, source: ConceptId, destination: ConceptId) -> Relationship {
    Relationship::new(
        id,
        source,
        model::IS_A,
        destination,
        characteristic::STATED_RELATIONSHIP,
    )
}

pub fn inferred_attribute(
    id: &str,
    source: ConceptId,
    attribute_type: ConceptId,
    value: ConceptId,
    group: u8,
) -> Relationship {
    Relationship::new(
        id,
        source,
        attribute_type,
        value,
        characteristic::INFERRED_RELATIONSHIP,
    )
    .with_group(group)
}

/// An OWL axiom member whose expression the reference JSON converter
/// understands: `concept` is-a each of `parents`, plus grouped attributes.
pub fn axiom_member(
    member_id: &str,
    concept: ConceptId,
    parents: &[ConceptId],
    attributes: &[(ConceptId, ConceptId, u8)],
) -> AxiomMember {
    let mut relationships: Vec<serde_json::Value> = parents
        .iter()
        .map(|parent| {
            serde_json::json!({
                "type_id": model::IS_A,
                "destination_id": parent,
            })
        })
        .collect();
    relationships.extend(attributes.iter().map(|(attribute_type, value, group)| {
        serde_json::json!({
            "type_id": attribute_type,
            "destination_id": value,
            "group": group,
        })
    }));
    let expression = serde_json::json!({
        "named_concept": concept,
        "relationships": relationships,
    });
    AxiomMember::new(
        member_id,
        refset::OWL_AXIOM_REFERENCE_SET,
        concept,
        expression.to_string(),
    )
}

pub fn id_set(ids: &[ConceptId]) -> BTreeSet<ConceptId> {
    ids.iter().copied().collect()
}
