//! Projection persistence.
//!
//! Diffs recomputed hierarchy state against the stored projection and writes
//! changed rows back in fixed-size batches. Rows whose parent set ends up
//! empty are deleted unless the concept is the terminology root.

use crate::changes::AttributeChanges;
use crate::error::Result;
use crate::form::Form;
use crate::graph::GraphBuilder;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use termstore_core::{
    BranchCriteria, Commit, ConceptId, QueryConcept, QueryConceptQuery, TermStore,
};
use termstore_vocab::model;

/// Replay a concept's logged attribute changes onto a projection row.
fn apply_attribute_changes(
    row: &mut QueryConcept,
    concept_id: ConceptId,
    attribute_changes: &mut HashMap<ConceptId, AttributeChanges>,
) {
    if let Some(changes) = attribute_changes.get_mut(&concept_id) {
        for change in changes.effective_sorted_changes() {
            if change.is_add() {
                row.add_attribute(change.group(), change.attribute_type(), change.value());
            } else {
                row.remove_attribute(change.group(), change.attribute_type(), change.value());
            }
        }
    }
}

/// Write every projection row the commit changed. Returns the number of rows
/// written (deletions included).
#[allow(clippy::too_many_arguments)]
pub(crate) async fn save_changed_projections<S: TermStore>(
    store: &S,
    commit: &Commit,
    form: Form,
    graph: &GraphBuilder,
    rebuild: bool,
    new_graph: bool,
    attribute_changes: &mut HashMap<ConceptId, AttributeChanges>,
    committed_criteria: &BranchCriteria,
    batch_save_size: usize,
) -> Result<usize> {
    let branch_path = commit.branch_path();

    // Nodes whose closure (or attributes) changed as of this commit
    let nodes_to_save: HashSet<ConceptId> = graph
        .nodes()
        .filter(|node| {
            new_graph
                || rebuild
                || graph.is_ancestor_or_self_updated(node.id(), branch_path)
                || attribute_changes.contains_key(&node.id())
        })
        .map(|node| node.id())
        .collect();
    let mut nodes_not_found: HashSet<ConceptId> = nodes_to_save.clone();

    let mut concept_ids_to_update: HashSet<ConceptId> = nodes_to_save.clone();
    concept_ids_to_update.extend(attribute_changes.keys().copied());
    let concept_id_forms: HashSet<String> = concept_ids_to_update
        .iter()
        .map(|id| QueryConcept::to_concept_id_form(*id, form.is_stated()))
        .collect();

    let mut rows_to_save: Vec<QueryConcept> = Vec::new();

    // Overwrite hierarchy state on the rows that already exist, excluding any
    // row version this very commit already ended on this branch
    let mut existing_rows = store.stream_query_concepts(
        committed_criteria,
        QueryConceptQuery {
            stated: Some(form.is_stated()),
            concept_id_forms: Some(concept_id_forms),
            exclude_ended_at: Some((branch_path.to_string(), commit.timepoint)),
            ..QueryConceptQuery::default()
        },
    );
    while let Some(row) = existing_rows.next().await {
        let mut row = row?;
        let concept_id = row.concept_id;
        if nodes_to_save.contains(&concept_id) {
            let node = graph.node(concept_id).expect("node selected for saving");
            row.set_parents(node.parents().clone());
            row.set_ancestors(graph.transitive_closure(concept_id));
        }
        apply_attribute_changes(&mut row, concept_id, attribute_changes);
        rows_to_save.push(row);
        nodes_not_found.remove(&concept_id);
    }
    drop(existing_rows);

    // Fresh rows for nodes with no stored projection
    for concept_id in nodes_not_found {
        let node = graph.node(concept_id).expect("node selected for saving");
        let mut row = QueryConcept::new(
            concept_id,
            node.parents().clone(),
            graph.transitive_closure(concept_id),
            form.is_stated(),
        );
        apply_attribute_changes(&mut row, concept_id, attribute_changes);
        rows_to_save.push(row);
    }

    if rows_to_save.is_empty() {
        return Ok(0);
    }

    // A row with no parents no longer belongs in the index, root excepted
    for row in rows_to_save.iter_mut() {
        if row.parents.is_empty() && row.concept_id != model::SNOMED_CT_ROOT {
            row.mark_deleted();
        }
    }

    let written = rows_to_save.len();
    for batch in rows_to_save.chunks(batch_save_size) {
        store.save_query_concepts(commit, batch.to_vec()).await?;
    }
    tracing::debug!(
        rows = written,
        form = form.name(),
        "concepts updated within the semantic index"
    );
    Ok(written)
}
