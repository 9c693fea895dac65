//! Well-Known SNOMED CT Concept Identifiers for Termstore
//!
//! This crate provides a centralized location for the SNOMED CT concept
//! identifiers (SCTIDs) that the termstore ecosystem treats as structural:
//! hierarchy and concept-model concepts, relationship characteristic types,
//! and reference set identifiers.
//!
//! # Organization
//!
//! Constants are organized by role:
//! - `model` - hierarchy and concept-model concepts
//! - `characteristic` - relationship characteristic types
//! - `refset` - reference set identifiers

/// Hierarchy and concept-model concepts
pub mod model {
    /// `116680003 | Is a (attribute) |` - the hierarchical relationship type
    pub const IS_A: i64 = 116680003;

    /// `138875005 | SNOMED CT Concept (SNOMED RT+CTV3) |` - the terminology root
    pub const SNOMED_CT_ROOT: i64 = 138875005;

    /// `410662002 | Concept model attribute (attribute) |`
    pub const CONCEPT_MODEL_ATTRIBUTE: i64 = 410662002;

    /// `762705008 | Concept model object attribute (attribute) |`
    ///
    /// Not linked to the concept hierarchy by any axiom; the semantic index
    /// adds a synthetic parent edge to [`CONCEPT_MODEL_ATTRIBUTE`].
    pub const CONCEPT_MODEL_OBJECT_ATTRIBUTE: i64 = 762705008;
}

/// Relationship characteristic types
pub mod characteristic {
    /// `900000000000010007 | Stated relationship (core metadata concept) |`
    pub const STATED_RELATIONSHIP: i64 = 900000000000010007;

    /// `900000000000011006 | Inferred relationship (core metadata concept) |`
    pub const INFERRED_RELATIONSHIP: i64 = 900000000000011006;

    /// `900000000000227009 | Additional relationship (core metadata concept) |`
    pub const ADDITIONAL_RELATIONSHIP: i64 = 900000000000227009;
}

/// Reference set identifiers
pub mod refset {
    /// `733073007 | OWL axiom reference set (foundation metadata concept) |`
    pub const OWL_AXIOM_REFERENCE_SET: i64 = 733073007;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characteristic_types_are_distinct() {
        let ids = [
            characteristic::STATED_RELATIONSHIP,
            characteristic::INFERRED_RELATIONSHIP,
            characteristic::ADDITIONAL_RELATIONSHIP,
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn concept_model_attributes_are_distinct_from_root() {
        assert_ne!(model::CONCEPT_MODEL_ATTRIBUTE, model::SNOMED_CT_ROOT);
        assert_ne!(
            model::CONCEPT_MODEL_OBJECT_ATTRIBUTE,
            model::CONCEPT_MODEL_ATTRIBUTE
        );
    }
}
