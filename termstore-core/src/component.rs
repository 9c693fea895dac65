//! Versioned terminology components and the persisted semantic-index row.
//!
//! Components are plain data carriers: the store versions them (see
//! [`StoredVersion`]) and the semantic index consumes them. Descriptions and
//! other lexical content are out of scope.

use crate::ids::{ConceptId, Timepoint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The kinds of versioned component the store manages.
///
/// Used to key per-branch versions-replaced sets and deletion bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Concept,
    Relationship,
    AxiomMember,
    QueryConcept,
}

/// A concept, reduced to what referential-integrity checks need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: ConceptId,
    pub active: bool,
    /// Release date as a `yyyymmdd` integer; `None` for unreleased content.
    pub effective_time: Option<i32>,
}

impl Concept {
    /// Create an active, unreleased concept
    pub fn new(concept_id: ConceptId) -> Self {
        Self {
            concept_id,
            active: true,
            effective_time: None,
        }
    }
}

/// A relationship assertion: `source_id` has `type_id = destination_id` in
/// `group`. `type_id == IS_A` denotes a parent edge; all other types are
/// grouped attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Component identifier (SCTID or synthetic axiom-fragment id)
    pub id: String,
    pub source_id: ConceptId,
    pub destination_id: ConceptId,
    pub type_id: ConceptId,
    /// Relationship group; 0 is the ungrouped group
    pub group: u8,
    pub active: bool,
    /// Distinguishes stated, inferred and additional flavors
    pub characteristic_type_id: ConceptId,
    /// Release date as a `yyyymmdd` integer; `None` for unreleased content.
    pub effective_time: Option<i32>,
}

impl Relationship {
    /// Create an active, unreleased relationship in group 0
    pub fn new(
        id: impl Into<String>,
        source_id: ConceptId,
        type_id: ConceptId,
        destination_id: ConceptId,
        characteristic_type_id: ConceptId,
    ) -> Self {
        Self {
            id: id.into(),
            source_id,
            destination_id,
            type_id,
            group: 0,
            active: true,
            characteristic_type_id,
            effective_time: None,
        }
    }

    /// Set the relationship group
    pub fn with_group(mut self, group: u8) -> Self {
        self.group = group;
        self
    }

    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the effective time (`yyyymmdd`)
    pub fn with_effective_time(mut self, effective_time: i32) -> Self {
        self.effective_time = Some(effective_time);
        self
    }
}

/// A logical-axiom reference set member. The expression payload is opaque to
/// the store; the axiom conversion service decomposes it into relationship
/// fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxiomMember {
    /// Member identifier (UUID string)
    pub member_id: String,
    pub refset_id: ConceptId,
    /// The concept this axiom belongs to
    pub referenced_component_id: ConceptId,
    /// Opaque OWL expression payload
    pub owl_expression: String,
    pub active: bool,
    /// Release date as a `yyyymmdd` integer; `None` for unreleased content.
    pub effective_time: Option<i32>,
}

impl AxiomMember {
    /// Create an active, unreleased axiom member
    pub fn new(
        member_id: impl Into<String>,
        refset_id: ConceptId,
        referenced_component_id: ConceptId,
        owl_expression: impl Into<String>,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            refset_id,
            referenced_component_id,
            owl_expression: owl_expression.into(),
            active: true,
            effective_time: None,
        }
    }

    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Grouped non-hierarchical attributes: group number to attribute type to the
/// set of asserted values.
pub type AttributeGroups = BTreeMap<u8, BTreeMap<ConceptId, BTreeSet<ConceptId>>>;

/// The persisted semantic-index projection row for one concept in one form.
///
/// Keyed by `concept_id_form` (`"{concept_id}_s"` or `"{concept_id}_i"`)
/// within a branch version. `parents` holds the direct IS_A targets,
/// `ancestors` the full transitive closure, and `attribute_groups` the grouped
/// non-IS_A assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConcept {
    pub concept_id_form: String,
    pub concept_id: ConceptId,
    pub stated: bool,
    pub parents: BTreeSet<ConceptId>,
    pub ancestors: BTreeSet<ConceptId>,
    pub attribute_groups: AttributeGroups,
    /// Deletion marker consumed by the store's batch save; never persisted.
    #[serde(skip)]
    deleted: bool,
}

impl QueryConcept {
    /// Create a projection row with the given hierarchy state
    pub fn new(
        concept_id: ConceptId,
        parents: BTreeSet<ConceptId>,
        ancestors: BTreeSet<ConceptId>,
        stated: bool,
    ) -> Self {
        Self {
            concept_id_form: Self::to_concept_id_form(concept_id, stated),
            concept_id,
            stated,
            parents,
            ancestors,
            attribute_groups: AttributeGroups::new(),
            deleted: false,
        }
    }

    /// The `"{concept_id}_s" | "{concept_id}_i"` primary key within a branch
    /// version
    pub fn to_concept_id_form(concept_id: ConceptId, stated: bool) -> String {
        format!("{}_{}", concept_id, if stated { "s" } else { "i" })
    }

    /// Replace the direct-parent set
    pub fn set_parents(&mut self, parents: BTreeSet<ConceptId>) {
        self.parents = parents;
    }

    /// Replace the ancestor set
    pub fn set_ancestors(&mut self, ancestors: BTreeSet<ConceptId>) {
        self.ancestors = ancestors;
    }

    /// Insert a grouped attribute assertion
    pub fn add_attribute(&mut self, group: u8, attribute_type: ConceptId, value: ConceptId) {
        self.attribute_groups
            .entry(group)
            .or_default()
            .entry(attribute_type)
            .or_default()
            .insert(value);
    }

    /// Remove a grouped attribute assertion. Idempotent; empty sub-maps are
    /// pruned.
    pub fn remove_attribute(&mut self, group: u8, attribute_type: ConceptId, value: ConceptId) {
        if let Some(types) = self.attribute_groups.get_mut(&group) {
            if let Some(values) = types.get_mut(&attribute_type) {
                values.remove(&value);
                if values.is_empty() {
                    types.remove(&attribute_type);
                }
            }
            if types.is_empty() {
                self.attribute_groups.remove(&group);
            }
        }
    }

    /// Mark this row for deletion at the current commit
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Whether this row is marked for deletion
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// A component version as stored on a branch.
///
/// `end == None` means the version is current on its authoring branch;
/// `end == Some(t)` means it was superseded or deleted at timepoint `t`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVersion<T> {
    /// Authoring branch path
    pub path: String,
    pub start: Timepoint,
    pub end: Option<Timepoint>,
    pub component: T,
}

impl<T> StoredVersion<T> {
    /// Create a live version starting at `start` on `path`
    pub fn new(path: impl Into<String>, start: Timepoint, component: T) -> Self {
        Self {
            path: path.into(),
            start,
            end: None,
            component,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_id_form_key() {
        assert_eq!(QueryConcept::to_concept_id_form(101, true), "101_s");
        assert_eq!(QueryConcept::to_concept_id_form(101, false), "101_i");
    }

    #[test]
    fn attribute_add_and_remove_prunes_empty_maps() {
        let mut qc = QueryConcept::new(5, BTreeSet::new(), BTreeSet::new(), true);
        qc.add_attribute(1, 7, 8);
        qc.add_attribute(1, 7, 9);
        assert_eq!(qc.attribute_groups[&1][&7].len(), 2);

        qc.remove_attribute(1, 7, 8);
        assert_eq!(qc.attribute_groups[&1][&7].len(), 1);

        // Removing twice is a no-op
        qc.remove_attribute(1, 7, 8);
        qc.remove_attribute(1, 7, 9);
        assert!(qc.attribute_groups.is_empty());
    }

    #[test]
    fn deletion_marker_is_not_serialized() {
        let mut qc = QueryConcept::new(5, BTreeSet::new(), BTreeSet::new(), false);
        qc.mark_deleted();
        let json = serde_json::to_string(&qc).unwrap();
        let back: QueryConcept = serde_json::from_str(&json).unwrap();
        assert!(!back.is_deleted());
    }
}
