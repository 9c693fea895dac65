//! The semantic index update orchestrator.
//!
//! Runs as a commit listener: on every commit it drives the discovery →
//! load → replay → persist pipeline once for the stated form and once for the
//! inferred form, with scope criteria chosen by commit kind (incremental,
//! rebase, or manual rebuild).

use crate::axiom_stream::stream_axioms_as_relationships;
use crate::config::SemanticIndexConfig;
use crate::delta::{ComponentMeta, DeltaReplay};
use crate::error::Result;
use crate::form::Form;
use crate::graph::GraphBuilder;
use crate::loader::build_relevant_parts_of_existing_graph;
use crate::rebase::{rebase_deletions, remove_query_concept_changes_on_branch};
use crate::writer::save_changed_projections;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Once};
use termstore_core::{
    AxiomConverter, AxiomMemberQuery, BranchCriteria, Commit, CommitListener, ConceptId, Error,
    RelationshipQuery, TermStore,
};
use termstore_vocab::refset;

static DISABLED_NOTICE: Once = Once::new();

/// Maintains the stated and inferred semantic index across commits.
pub struct SemanticIndexUpdater<S> {
    store: S,
    converter: Arc<dyn AxiomConverter>,
    config: SemanticIndexConfig,
}

impl<S: TermStore> SemanticIndexUpdater<S> {
    pub fn new(store: S, converter: Arc<dyn AxiomConverter>, config: SemanticIndexConfig) -> Self {
        Self {
            store,
            converter,
            config,
        }
    }

    /// Rebuild both forms of the semantic index on a branch from scratch.
    ///
    /// Opens its own commit tagged with lock metadata; on success the commit
    /// is marked successful, on failure every staged write is rolled back.
    pub async fn rebuild(&self, branch_path: &str) -> Result<()> {
        let commit = self
            .store
            .open_commit(branch_path, Some("Rebuilding semantic index.".to_string()))
            .await?;
        let outcome = self.rebuild_in_commit(&commit).await;
        match outcome {
            Ok(()) => {
                self.store.mark_commit_successful(&commit).await?;
                Ok(())
            }
            Err(rebuild_error) => {
                self.store.rollback_commit(&commit).await?;
                Err(rebuild_error)
            }
        }
    }

    async fn rebuild_in_commit(&self, commit: &Commit) -> Result<()> {
        let branch_criteria = BranchCriteria::before_open_commit(commit);
        for form in Form::ALL {
            self.update_semantic_index(form, &branch_criteria, &HashSet::new(), commit, true)
                .await?;
        }
        Ok(())
    }

    async fn update_stated_and_inferred(&self, commit: &Commit) -> Result<()> {
        if commit.is_rebase() {
            // Recreate the projection over the new parent base plus the
            // content on this branch
            remove_query_concept_changes_on_branch(&self.store, commit).await?;

            let changes_criteria = BranchCriteria::changes_on_branch(&commit.branch);
            let deletions = rebase_deletions(&commit.branch);
            for form in Form::ALL {
                self.update_semantic_index(form, &changes_criteria, &deletions, commit, false)
                    .await?;
            }
        } else {
            // Update the projection from the changes in the current commit
            let changes_criteria = BranchCriteria::within_open_commit(commit);
            for form in Form::ALL {
                self.update_semantic_index(
                    form,
                    &changes_criteria,
                    &commit.entities_deleted,
                    commit,
                    false,
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn update_semantic_index(
        &self,
        form: Form,
        changes_criteria: &BranchCriteria,
        deletions: &HashSet<String>,
        commit: &Commit,
        rebuild: bool,
    ) -> Result<()> {
        let branch_path = commit.branch_path();
        let committed_criteria = BranchCriteria::before_open_commit(commit);

        // Identify concepts with modeling changes and load the relevant parts
        // of the existing node graph
        let mut graph = GraphBuilder::new();
        let updated_concepts = build_relevant_parts_of_existing_graph(
            &self.store,
            self.converter.as_ref(),
            &mut graph,
            rebuild,
            form,
            changes_criteria,
            &committed_criteria,
        )
        .await?;
        if updated_concepts.is_empty() {
            // Nothing to do
            return Ok(());
        }
        let new_graph = graph.node_count() == 0;

        // Replay this scope's deltas into the graph, collecting attribute
        // changes along the way
        let mut attribute_changes: HashMap<ConceptId, crate::changes::AttributeChanges> =
            HashMap::new();
        let mut required_active: HashSet<ConceptId> = HashSet::new();
        let (relationships_added, relationships_removed) = {
            let mut replay = DeltaReplay::new(
                branch_path,
                deletions,
                &mut graph,
                &mut attribute_changes,
                &mut required_active,
            );

            let mut relationship_versions = self.store.stream_relationships(
                changes_criteria,
                RelationshipQuery {
                    characteristic_type_ids: Some(form.characteristic_type_ids().to_vec()),
                    replay_sorted: true,
                    ..RelationshipQuery::default()
                },
            );
            while let Some(version) = relationship_versions.next().await {
                let version = version?;
                replay.accept(ComponentMeta::relationship(&version), &version.component);
            }
            drop(relationship_versions);
            tracing::debug!(form = form.name(), "graph updated from changed relationships");

            if form.is_stated() {
                let axiom_versions = self.store.stream_axiom_members(
                    changes_criteria,
                    AxiomMemberQuery {
                        refset_id: Some(refset::OWL_AXIOM_REFERENCE_SET),
                        replay_sorted: true,
                        ..AxiomMemberQuery::default()
                    },
                );
                stream_axioms_as_relationships(
                    axiom_versions,
                    self.converter.as_ref(),
                    |_| true,
                    |member_version, relationship| {
                        replay.accept(ComponentMeta::axiom_member(member_version), &relationship);
                    },
                )
                .await?;
                tracing::debug!(form = form.name(), "graph updated from changed axioms");
            }

            (replay.relationships_added, replay.relationships_removed)
        };
        tracing::debug!(
            form = form.name(),
            added = relationships_added,
            removed = relationships_removed,
            "relationships added and inactive/removed"
        );

        let inactive_or_missing = self
            .inactive_or_missing_concept_ids(
                &required_active,
                &BranchCriteria::including_open_commit(commit),
            )
            .await?;
        if !inactive_or_missing.is_empty() {
            tracing::warn!(
                concepts = ?inactive_or_missing,
                "concepts referred to in relationships but missing or inactive"
            );
        }

        save_changed_projections(
            &self.store,
            commit,
            form,
            &graph,
            rebuild,
            new_graph,
            &mut attribute_changes,
            &committed_criteria,
            self.config.batch_save_size,
        )
        .await?;
        Ok(())
    }

    /// Referential-integrity check over the concepts the replayed assertions
    /// require to be active. A bounded count query runs first; ids are only
    /// streamed when the count mismatches.
    async fn inactive_or_missing_concept_ids(
        &self,
        required_active: &HashSet<ConceptId>,
        criteria: &BranchCriteria,
    ) -> Result<HashSet<ConceptId>> {
        if required_active.is_empty() {
            return Ok(HashSet::new());
        }
        let active_count = self
            .store
            .count_active_concepts(criteria, required_active)
            .await?;
        if active_count == required_active.len() {
            return Ok(HashSet::new());
        }

        // Some concepts are missing; collect the ids that are present to work
        // out which are not
        let mut missing = required_active.clone();
        let mut active_ids = self
            .store
            .stream_active_concept_ids(criteria, required_active.clone());
        while let Some(concept_id) = active_ids.next().await {
            missing.remove(&concept_id?);
        }
        Ok(missing)
    }
}

#[async_trait]
impl<S: TermStore> CommitListener for SemanticIndexUpdater<S> {
    async fn pre_commit_completion(&self, commit: &Commit) -> termstore_core::Result<()> {
        if !self.config.enabled {
            DISABLED_NOTICE.call_once(|| {
                tracing::info!("Semantic indexing is disabled.");
            });
            return Ok(());
        }
        self.update_stated_and_inferred(commit)
            .await
            .map_err(|update_error| Error::commit_hook(update_error.to_string()))
    }
}
