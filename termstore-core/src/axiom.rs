//! Axiom-conversion seam.
//!
//! The conversion service that decomposes OWL axiom expressions into
//! relationship fragments is an external collaborator; this module defines
//! its contract plus a JSON-expression reference converter used by tests and
//! tooling.

use crate::component::{AxiomMember, Relationship};
use crate::ids::ConceptId;
use serde::Deserialize;
use thiserror::Error;

/// A conversion failure. Fatal for the enclosing commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to convert axiom member {member_id}: {message}")]
pub struct ConversionError {
    pub member_id: String,
    pub message: String,
}

impl ConversionError {
    pub fn new(member_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            message: message.into(),
        }
    }
}

/// The decomposed form of a regular class axiom: a named concept on the left
/// and relationship fragments on the right. A missing side means the axiom is
/// not a regular axiom and does not affect the semantic index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxiomRepresentation {
    pub left_hand_side_named_concept: Option<ConceptId>,
    pub right_hand_side_relationships: Option<Vec<Relationship>>,
}

/// Decomposes axiom members into relationship fragments.
///
/// `Ok(None)` means "not a regular axiom" and must be skipped silently.
/// Conversion errors abort the commit the member was streamed for.
pub trait AxiomConverter: Send + Sync {
    fn convert(&self, member: &AxiomMember) -> Result<Option<AxiomRepresentation>, ConversionError>;
}

#[derive(Debug, Deserialize)]
struct ExpressionFragment {
    type_id: ConceptId,
    destination_id: ConceptId,
    #[serde(default)]
    group: u8,
}

#[derive(Debug, Deserialize)]
struct Expression {
    named_concept: Option<ConceptId>,
    relationships: Option<Vec<ExpressionFragment>>,
}

/// Reference converter reading a JSON encoding of the axiom representation
/// from the member's expression payload:
/// `{"named_concept": 5, "relationships": [{"type_id": 116680003,
/// "destination_id": 1, "group": 0}]}`.
///
/// Production deployments plug in the OWL-toolkit-backed service instead;
/// this implementation exists so the pipeline can be exercised end to end
/// without it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAxiomConverter;

impl AxiomConverter for JsonAxiomConverter {
    fn convert(&self, member: &AxiomMember) -> Result<Option<AxiomRepresentation>, ConversionError> {
        let expression: Expression = serde_json::from_str(&member.owl_expression)
            .map_err(|e| ConversionError::new(&member.member_id, e.to_string()))?;

        let relationships = expression.relationships.map(|fragments| {
            fragments
                .into_iter()
                .enumerate()
                .map(|(idx, fragment)| Relationship {
                    id: format!("{}_{}", member.member_id, idx),
                    // Stamped with the LHS concept by the axiom stream adapter
                    source_id: 0,
                    destination_id: fragment.destination_id,
                    type_id: fragment.type_id,
                    group: fragment.group,
                    active: true,
                    characteristic_type_id: 0,
                    effective_time: member.effective_time,
                })
                .collect()
        });

        Ok(Some(AxiomRepresentation {
            left_hand_side_named_concept: expression.named_concept,
            right_hand_side_relationships: relationships,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(expression: &str) -> AxiomMember {
        AxiomMember::new("m1", 733073007, 5, expression)
    }

    #[test]
    fn converts_regular_axiom() {
        let repr = JsonAxiomConverter
            .convert(&member(
                r#"{"named_concept": 5, "relationships": [{"type_id": 116680003, "destination_id": 1}]}"#,
            ))
            .unwrap()
            .unwrap();
        assert_eq!(repr.left_hand_side_named_concept, Some(5));
        let rels = repr.right_hand_side_relationships.unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].type_id, 116680003);
        assert_eq!(rels[0].destination_id, 1);
    }

    #[test]
    fn missing_sides_mean_not_a_regular_axiom() {
        let repr = JsonAxiomConverter
            .convert(&member(r#"{"named_concept": null, "relationships": null}"#))
            .unwrap()
            .unwrap();
        assert_eq!(repr.left_hand_side_named_concept, None);
        assert_eq!(repr.right_hand_side_relationships, None);
    }

    #[test]
    fn malformed_expression_is_a_conversion_error() {
        let err = JsonAxiomConverter
            .convert(&member("GCI(not json)"))
            .unwrap_err();
        assert_eq!(err.member_id, "m1");
    }
}
