//! Existing-graph loading.
//!
//! For an incremental update the graph must contain each updated concept, its
//! pre-existing ancestors, and every concept that currently claims an updated
//! concept as ancestor (descendants whose closure will shrink or move). For a
//! rebuild the prior projection is ignored and the graph is rebuilt from all
//! active IS_A content on the branch.

use crate::axiom_stream::stream_axioms_as_relationships;
use crate::delta::{collect_change_scope, ChangeScope};
use crate::error::Result;
use crate::form::Form;
use crate::graph::GraphBuilder;
use futures::StreamExt;
use std::collections::HashSet;
use termstore_core::{
    AxiomConverter, AxiomMemberQuery, BranchCriteria, ConceptId, QueryConcept, QueryConceptQuery,
    RelationshipQuery, TermStore,
};
use termstore_vocab::{model, refset};

/// Load the relevant parts of the existing graph into `graph` and return the
/// set of concepts whose projection must be reconsidered. An empty return
/// means the commit is a no-op for this form.
pub(crate) async fn build_relevant_parts_of_existing_graph<S: TermStore>(
    store: &S,
    converter: &dyn AxiomConverter,
    graph: &mut GraphBuilder,
    rebuild: bool,
    form: Form,
    changes_criteria: &BranchCriteria,
    committed_criteria: &BranchCriteria,
) -> Result<HashSet<ConceptId>> {
    if rebuild {
        tracing::info!(form = form.name(), "Performing rebuild of semantic index");
        let updated_concepts =
            build_graph_from_all_content(store, converter, graph, form, committed_criteria).await?;
        tracing::info!(nodes = graph.node_count(), "existing nodes loaded");
        return Ok(updated_concepts);
    }

    let ChangeScope {
        update_source,
        update_destination,
        updated_concepts,
    } = collect_change_scope(store, converter, form, changes_criteria).await?;

    if updated_concepts.is_empty() {
        // Nothing to do
        return Ok(updated_concepts);
    }

    tracing::info!(
        form = form.name(),
        "Performing incremental update of semantic index"
    );

    // Identify parts of the graph that nodes are moving from or to.

    // Existing ancestors of the updated relationships' endpoints
    let mut existing_ancestors: HashSet<ConceptId> = HashSet::new();
    let endpoint_ids: HashSet<ConceptId> = update_source
        .union(&update_destination)
        .copied()
        .collect();
    let mut endpoint_rows = store.stream_query_concepts(
        committed_criteria,
        QueryConceptQuery {
            stated: Some(form.is_stated()),
            concept_ids: Some(endpoint_ids),
            ..QueryConceptQuery::default()
        },
    );
    while let Some(row) = endpoint_rows.next().await {
        existing_ancestors.extend(row?.ancestors.iter().copied());
    }
    drop(endpoint_rows);

    // Existing descendants: rows whose stored closure contains an updated source
    let mut existing_descendants: HashSet<ConceptId> = HashSet::new();
    let mut descendant_rows = store.stream_query_concepts(
        committed_criteria,
        QueryConceptQuery {
            stated: Some(form.is_stated()),
            ancestors_any_of: Some(update_source.clone()),
            ..QueryConceptQuery::default()
        },
    );
    while let Some(row) = descendant_rows.next().await {
        existing_descendants.insert(row?.concept_id);
    }
    drop(descendant_rows);

    tracing::debug!(
        existing_ancestors = existing_ancestors.len(),
        existing_descendants = existing_descendants.len(),
        "existing ancestors and descendants of updated relationships identified"
    );

    let mut nodes_to_load: HashSet<ConceptId> = HashSet::new();
    nodes_to_load.extend(existing_ancestors);
    nodes_to_load.extend(existing_descendants);
    nodes_to_load.extend(update_source.iter());
    nodes_to_load.extend(update_destination.iter());

    // Build the graph, collecting any alternative ancestors that were missed:
    // a multiple-inheritance diamond can route through a parent that is not
    // itself an ancestor of any updated or existing-descendant node, yet is
    // needed to preserve a descendant's alternative ancestry.
    let mut alternative_ancestors: HashSet<ConceptId> = HashSet::new();
    build_graph_from_existing_nodes(store, committed_criteria, form, &nodes_to_load, graph, |row| {
        alternative_ancestors.extend(
            row.ancestors
                .iter()
                .filter(|ancestor| !nodes_to_load.contains(*ancestor))
                .copied(),
        );
    })
    .await?;

    if !alternative_ancestors.is_empty() {
        // One more pass is enough; no need to collect again
        build_graph_from_existing_nodes(
            store,
            committed_criteria,
            form,
            &alternative_ancestors,
            graph,
            |_| {},
        )
        .await?;
    }
    tracing::debug!(
        alternative_ancestors = alternative_ancestors.len(),
        "existing graph built from nodes"
    );

    tracing::info!(nodes = graph.node_count(), "existing nodes loaded");
    Ok(updated_concepts)
}

/// Add `(concept -> parent)` edges for every stored projection row whose id is
/// in `nodes_to_load`, handing each row to `collect` for alternative-ancestor
/// gathering.
async fn build_graph_from_existing_nodes<S: TermStore>(
    store: &S,
    committed_criteria: &BranchCriteria,
    form: Form,
    nodes_to_load: &HashSet<ConceptId>,
    graph: &mut GraphBuilder,
    mut collect: impl FnMut(&QueryConcept),
) -> Result<()> {
    let mut rows = store.stream_query_concepts(
        committed_criteria,
        QueryConceptQuery {
            stated: Some(form.is_stated()),
            concept_ids: Some(nodes_to_load.clone()),
            ..QueryConceptQuery::default()
        },
    );
    while let Some(row) = rows.next().await {
        let row = row?;
        for parent in &row.parents {
            graph.add_parent(row.concept_id, *parent);
        }
        collect(&row);
    }
    Ok(())
}

/// Rebuild path: stream all active IS_A content on the branch (plus active
/// axiom IS_A fragments for the stated form) into the graph, seeding the
/// updated set with every source seen.
async fn build_graph_from_all_content<S: TermStore>(
    store: &S,
    converter: &dyn AxiomConverter,
    graph: &mut GraphBuilder,
    form: Form,
    committed_criteria: &BranchCriteria,
) -> Result<HashSet<ConceptId>> {
    let mut updated_concepts: HashSet<ConceptId> = HashSet::new();

    let mut is_a_versions = store.stream_relationships(
        committed_criteria,
        RelationshipQuery {
            type_id: Some(model::IS_A),
            characteristic_type_ids: Some(form.characteristic_type_ids().to_vec()),
            active: Some(true),
            ..RelationshipQuery::default()
        },
    );
    while let Some(version) = is_a_versions.next().await {
        let relationship = version?.component;
        graph.add_parent(relationship.source_id, relationship.destination_id);
        updated_concepts.insert(relationship.source_id);
    }
    drop(is_a_versions);

    if form.is_stated() {
        let axiom_versions = store.stream_axiom_members(
            committed_criteria,
            AxiomMemberQuery {
                refset_id: Some(refset::OWL_AXIOM_REFERENCE_SET),
                active: Some(true),
                ..AxiomMemberQuery::default()
            },
        );
        let updated = &mut updated_concepts;
        stream_axioms_as_relationships(
            axiom_versions,
            converter,
            |relationship| relationship.type_id == model::IS_A,
            |_, relationship| {
                graph.add_parent(relationship.source_id, relationship.destination_id);
                updated.insert(relationship.source_id);
            },
        )
        .await?;
    }

    Ok(updated_concepts)
}
