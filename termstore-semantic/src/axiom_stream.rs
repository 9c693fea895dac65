//! Axiom-member streams as synthetic relationship streams.
//!
//! Each member is decomposed by the external conversion service; regular
//! axioms yield relationship fragments whose `source_id` is stamped with the
//! axiom's left-hand-side concept. Non-regular axioms (missing named LHS or
//! missing RHS relationships) do not affect the semantic index and are
//! skipped silently.
//!
//! A conversion failure does not stop stream consumption; the error is
//! carried to the end of the stream and returned there, aborting the commit.
//! Storage errors from the stream itself are fatal immediately.

use crate::error::Result;
use futures::StreamExt;
use termstore_core::{
    AxiomConverter, AxiomMember, ConversionError, Relationship, StoredVersion, VersionStream,
};

/// Stream `members` through `converter`, feeding each RHS relationship that
/// matches `predicate` to `consumer` together with the member version it came
/// from.
pub(crate) async fn stream_axioms_as_relationships<P, F>(
    mut members: VersionStream<AxiomMember>,
    converter: &dyn AxiomConverter,
    predicate: P,
    mut consumer: F,
) -> Result<()>
where
    P: Fn(&Relationship) -> bool,
    F: FnMut(&StoredVersion<AxiomMember>, Relationship),
{
    let mut conversion_failure: Option<ConversionError> = None;
    while let Some(version) = members.next().await {
        let version = version?;
        match converter.convert(&version.component) {
            Ok(Some(representation)) => {
                let (Some(concept_id), Some(relationships)) = (
                    representation.left_hand_side_named_concept,
                    representation.right_hand_side_relationships,
                ) else {
                    // Not a regular axiom so does not affect the semantic index
                    continue;
                };
                for mut relationship in relationships {
                    if predicate(&relationship) {
                        relationship.source_id = concept_id;
                        consumer(&version, relationship);
                    }
                }
            }
            Ok(None) => {
                // Not a regular axiom so does not affect the semantic index
            }
            Err(conversion_error) => {
                conversion_failure = Some(conversion_error);
            }
        }
    }
    match conversion_failure {
        Some(conversion_error) => Err(conversion_error.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SemanticError;
    use futures::stream;
    use termstore_core::{AxiomRepresentation, ConceptId};

    struct ScriptedConverter;

    impl AxiomConverter for ScriptedConverter {
        fn convert(
            &self,
            member: &AxiomMember,
        ) -> std::result::Result<Option<AxiomRepresentation>, ConversionError> {
            match member.owl_expression.as_str() {
                "regular" => Ok(Some(AxiomRepresentation {
                    left_hand_side_named_concept: Some(member.referenced_component_id),
                    right_hand_side_relationships: Some(vec![Relationship::new(
                        "frag", 0, 116680003, 1, 0,
                    )]),
                })),
                "gci" => Ok(None),
                _ => Err(ConversionError::new(&member.member_id, "bad expression")),
            }
        }
    }

    fn member_stream(expressions: &[(&str, &str)]) -> VersionStream<AxiomMember> {
        let versions: Vec<_> = expressions
            .iter()
            .map(|(id, expr)| {
                Ok(StoredVersion::new(
                    "MAIN",
                    1,
                    AxiomMember::new(*id, 733073007, 5, *expr),
                ))
            })
            .collect();
        Box::pin(stream::iter(versions))
    }

    #[tokio::test]
    async fn stamps_lhs_concept_onto_fragments() {
        let mut sources: Vec<ConceptId> = Vec::new();
        stream_axioms_as_relationships(
            member_stream(&[("m1", "regular")]),
            &ScriptedConverter,
            |_| true,
            |_, rel| sources.push(rel.source_id),
        )
        .await
        .unwrap();
        assert_eq!(sources, vec![5]);
    }

    #[tokio::test]
    async fn non_regular_axioms_are_skipped() {
        let mut count = 0;
        stream_axioms_as_relationships(
            member_stream(&[("m1", "gci"), ("m2", "regular")]),
            &ScriptedConverter,
            |_| true,
            |_, _| count += 1,
        )
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn conversion_error_is_returned_after_the_stream_drains() {
        let mut count = 0;
        let result = stream_axioms_as_relationships(
            member_stream(&[("m1", "broken"), ("m2", "regular")]),
            &ScriptedConverter,
            |_| true,
            |_, _| count += 1,
        )
        .await;
        assert!(matches!(result, Err(SemanticError::AxiomConversion(_))));
        assert_eq!(count, 1, "members after the failure are still consumed");
    }
}
