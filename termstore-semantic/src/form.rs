//! The two forms of the semantic index.

use termstore_core::ConceptId;
use termstore_vocab::characteristic;

/// Which projection of the logical structure an update maintains.
///
/// Each form selects a disjoint set of relationship characteristic types.
/// The stated form additionally consumes OWL axiom members; the inferred
/// form is fed purely by classifier-produced relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    Stated,
    Inferred,
}

impl Form {
    /// Both forms, in the order commits process them
    pub const ALL: [Form; 2] = [Form::Stated, Form::Inferred];

    /// Lowercase name used in log events
    pub fn name(&self) -> &'static str {
        match self {
            Form::Stated => "stated",
            Form::Inferred => "inferred",
        }
    }

    /// Whether this is the stated form (axioms are consumed, projection rows
    /// carry `stated == true`)
    pub fn is_stated(&self) -> bool {
        matches!(self, Form::Stated)
    }

    /// The relationship characteristic types feeding this form
    pub fn characteristic_type_ids(&self) -> &'static [ConceptId] {
        match self {
            Form::Stated => &[characteristic::STATED_RELATIONSHIP],
            Form::Inferred => &[
                characteristic::INFERRED_RELATIONSHIP,
                characteristic::ADDITIONAL_RELATIONSHIP,
            ],
        }
    }
}
