//! Change-set discovery and delta replay.
//!
//! Discovery identifies the concepts whose projection may need recomputing
//! from a commit's relationship and axiom deltas. Replay routes every version
//! in scope through one uniform consumer that mutates the graph and the
//! attribute-change log.

use crate::axiom_stream::stream_axioms_as_relationships;
use crate::changes::AttributeChanges;
use crate::error::Result;
use crate::form::Form;
use crate::graph::GraphBuilder;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use termstore_core::{
    AxiomConverter, AxiomMember, AxiomMemberQuery, BranchCriteria, ConceptId, Relationship,
    RelationshipQuery, StoredVersion, TermStore, Timepoint,
};
use termstore_vocab::{model, refset};

/// The concepts a commit's deltas touch, split the way the loader needs them.
#[derive(Debug, Default)]
pub(crate) struct ChangeScope {
    /// Sources of changed IS_A relationship versions (active or not)
    pub update_source: HashSet<ConceptId>,
    /// Destinations of changed IS_A relationship versions
    pub update_destination: HashSet<ConceptId>,
    /// Every concept whose projection must be reconsidered
    pub updated_concepts: HashSet<ConceptId>,
}

/// Collect the change scope for `form` from the deltas selected by
/// `changes_criteria`. An empty `updated_concepts` means the commit is a
/// no-op for this form.
pub(crate) async fn collect_change_scope<S: TermStore>(
    store: &S,
    converter: &dyn AxiomConverter,
    form: Form,
    changes_criteria: &BranchCriteria,
) -> Result<ChangeScope> {
    let mut scope = ChangeScope::default();

    let mut changed_is_a = store.stream_relationships(
        changes_criteria,
        RelationshipQuery {
            type_id: Some(model::IS_A),
            characteristic_type_ids: Some(form.characteristic_type_ids().to_vec()),
            ..RelationshipQuery::default()
        },
    );
    while let Some(version) = changed_is_a.next().await {
        let relationship = version?.component;
        scope.update_source.insert(relationship.source_id);
        scope.update_destination.insert(relationship.destination_id);
    }

    if form.is_stated() {
        let changed_axioms = store.stream_axiom_members(
            changes_criteria,
            AxiomMemberQuery {
                refset_id: Some(refset::OWL_AXIOM_REFERENCE_SET),
                ..AxiomMemberQuery::default()
            },
        );
        let (sources, destinations) = (&mut scope.update_source, &mut scope.update_destination);
        stream_axioms_as_relationships(
            changed_axioms,
            converter,
            |relationship| relationship.type_id == model::IS_A,
            |_, relationship| {
                sources.insert(relationship.source_id);
                destinations.insert(relationship.destination_id);
            },
        )
        .await?;
    }

    scope.updated_concepts.extend(scope.update_source.iter());

    // Attribute-only changes still require a projection rewrite
    let mut other_changed = store.stream_relationships(
        changes_criteria,
        RelationshipQuery {
            type_id_not: Some(model::IS_A),
            characteristic_type_ids: Some(form.characteristic_type_ids().to_vec()),
            source_id_not_in: Some(scope.updated_concepts.clone()),
            ..RelationshipQuery::default()
        },
    );
    while let Some(version) = other_changed.next().await {
        scope.updated_concepts.insert(version?.component.source_id);
    }

    if scope
        .update_destination
        .contains(&model::CONCEPT_MODEL_OBJECT_ATTRIBUTE)
    {
        scope
            .update_destination
            .insert(model::CONCEPT_MODEL_ATTRIBUTE);
    }

    Ok(scope)
}

/// Where a replayed version came from. Axiom fragments whose member version
/// has ended are always treated as removals; there is no better information
/// at this level, and the fragments are re-added if a newer member version is
/// in the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeltaOrigin {
    Relationship,
    Axiom,
}

/// Version-level fields of the component a relationship delta was carried by:
/// the relationship itself, or the axiom member its fragment came from.
pub(crate) struct ComponentMeta<'a> {
    pub origin: DeltaOrigin,
    pub component_id: &'a str,
    pub end: Option<Timepoint>,
    pub active: bool,
    pub effective_time: Option<i32>,
}

impl<'a> ComponentMeta<'a> {
    pub fn relationship(version: &'a StoredVersion<Relationship>) -> Self {
        Self {
            origin: DeltaOrigin::Relationship,
            component_id: &version.component.id,
            end: version.end,
            active: version.component.active,
            effective_time: version.component.effective_time,
        }
    }

    pub fn axiom_member(version: &'a StoredVersion<AxiomMember>) -> Self {
        Self {
            origin: DeltaOrigin::Axiom,
            component_id: &version.component.member_id,
            end: version.end,
            active: version.component.active,
            effective_time: version.component.effective_time,
        }
    }
}

/// Uniform consumer for the delta-replay stream.
///
/// Versions must be fed in `(effective_time, active, start)` order so that a
/// deactivation and reactivation of the same assertion within one commit
/// window collapse to the later state.
pub(crate) struct DeltaReplay<'a> {
    branch_path: &'a str,
    deletions: &'a HashSet<String>,
    graph: &'a mut GraphBuilder,
    attribute_changes: &'a mut HashMap<ConceptId, AttributeChanges>,
    required_active: &'a mut HashSet<ConceptId>,
    pub relationships_added: u64,
    pub relationships_removed: u64,
}

impl<'a> DeltaReplay<'a> {
    pub fn new(
        branch_path: &'a str,
        deletions: &'a HashSet<String>,
        graph: &'a mut GraphBuilder,
        attribute_changes: &'a mut HashMap<ConceptId, AttributeChanges>,
        required_active: &'a mut HashSet<ConceptId>,
    ) -> Self {
        Self {
            branch_path,
            deletions,
            graph,
            attribute_changes,
            required_active,
            relationships_added: 0,
            relationships_removed: 0,
        }
    }

    pub fn accept(&mut self, meta: ComponentMeta<'_>, relationship: &Relationship) {
        let mut just_deleted = false;
        if meta.end.is_some() {
            if meta.origin == DeltaOrigin::Axiom || self.deletions.contains(meta.component_id) {
                just_deleted = true;
            } else {
                // Replaced, not deleted: a newer version is in the selection
                return;
            }
        }

        let concept_id = relationship.source_id;
        let type_id = relationship.type_id;
        let value = relationship.destination_id;

        if !just_deleted && meta.active {
            if type_id == model::IS_A {
                self.graph
                    .add_parent(concept_id, value)
                    .mark_updated(self.branch_path);
                self.relationships_added += 1;

                // Concept model object attribute is not linked to the
                // hierarchy by any axiom; the semantic index wants the link,
                // so add it here.
                if value == model::CONCEPT_MODEL_OBJECT_ATTRIBUTE {
                    self.graph
                        .add_parent(
                            model::CONCEPT_MODEL_OBJECT_ATTRIBUTE,
                            model::CONCEPT_MODEL_ATTRIBUTE,
                        )
                        .mark_updated(self.branch_path);
                }
            } else {
                self.attribute_changes
                    .entry(concept_id)
                    .or_default()
                    .add_attribute(meta.effective_time, relationship.group, type_id, value);
            }
            self.required_active.insert(concept_id);
            self.required_active.insert(type_id);
            self.required_active.insert(value);
        } else if type_id == model::IS_A {
            if let Some(node) = self.graph.remove_parent(concept_id, value) {
                node.mark_updated(self.branch_path);
            }
            self.relationships_removed += 1;
        } else {
            self.attribute_changes
                .entry(concept_id)
                .or_default()
                .remove_attribute(meta.effective_time, relationship.group, type_id, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termstore_vocab::characteristic;

    const PATH: &str = "MAIN";

    fn isa(id: &str, source: ConceptId, destination: ConceptId) -> StoredVersion<Relationship> {
        StoredVersion::new(
            PATH,
            1,
            Relationship::new(
                id,
                source,
                model::IS_A,
                destination,
                characteristic::INFERRED_RELATIONSHIP,
            ),
        )
    }

    struct Harness {
        graph: GraphBuilder,
        attribute_changes: HashMap<ConceptId, AttributeChanges>,
        required_active: HashSet<ConceptId>,
        deletions: HashSet<String>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                graph: GraphBuilder::new(),
                attribute_changes: HashMap::new(),
                required_active: HashSet::new(),
                deletions: HashSet::new(),
            }
        }

        fn replay(&mut self, versions: &[StoredVersion<Relationship>]) -> (u64, u64) {
            let mut replay = DeltaReplay::new(
                PATH,
                &self.deletions,
                &mut self.graph,
                &mut self.attribute_changes,
                &mut self.required_active,
            );
            for version in versions {
                replay.accept(ComponentMeta::relationship(version), &version.component);
            }
            (replay.relationships_added, replay.relationships_removed)
        }
    }

    #[test]
    fn active_is_a_adds_a_marked_edge() {
        let mut harness = Harness::new();
        let (added, removed) = harness.replay(&[isa("r1", 2, 1)]);
        assert_eq!((added, removed), (1, 0));
        assert!(harness.graph.node(2).unwrap().is_updated(PATH));
        assert_eq!(harness.required_active, HashSet::from([2, model::IS_A, 1]));
    }

    #[test]
    fn ended_version_without_deletion_is_ignored() {
        let mut harness = Harness::new();
        let mut replaced = isa("r1", 2, 1);
        replaced.end = Some(9);
        let (added, removed) = harness.replay(&[replaced]);
        assert_eq!((added, removed), (0, 0));
        assert_eq!(harness.graph.node_count(), 0);
    }

    #[test]
    fn ended_version_in_deletion_set_removes_the_edge() {
        let mut harness = Harness::new();
        harness.replay(&[isa("r1", 2, 1)]);

        harness.deletions.insert("r1".to_string());
        let mut deleted = isa("r1", 2, 1);
        deleted.end = Some(9);
        let (_, removed) = harness.replay(&[deleted]);
        assert_eq!(removed, 1);
        assert!(harness.graph.node(2).unwrap().parents().is_empty());
    }

    #[test]
    fn concept_model_object_attribute_gains_synthetic_parent() {
        let mut harness = Harness::new();
        harness.replay(&[isa("r1", 99, model::CONCEPT_MODEL_OBJECT_ATTRIBUTE)]);
        let ancestors = harness
            .graph
            .transitive_closure(model::CONCEPT_MODEL_OBJECT_ATTRIBUTE);
        assert!(ancestors.contains(&model::CONCEPT_MODEL_ATTRIBUTE));
    }

    #[test]
    fn non_is_a_deltas_land_in_the_attribute_log() {
        let mut harness = Harness::new();
        let mut attribute = isa("r1", 5, 8);
        attribute.component.type_id = 7;
        attribute.component.group = 1;
        let mut inactive = isa("r2", 5, 9);
        inactive.component.type_id = 7;
        inactive.component.active = false;
        harness.replay(&[attribute, inactive]);

        let mut changes = harness.attribute_changes.remove(&5).unwrap();
        let sorted = changes.effective_sorted_changes();
        assert_eq!(sorted.len(), 2);
        assert_eq!(harness.graph.node_count(), 0);
    }
}
