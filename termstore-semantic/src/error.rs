//! Error types for the semantic index updater

use termstore_core::ConversionError;
use thiserror::Error;

/// Semantic-index errors. Both variants are fatal for the enclosing commit.
#[derive(Error, Debug)]
pub enum SemanticError {
    /// Failed to convert OWL axioms
    #[error("Failed to convert OWL axioms: {0}")]
    AxiomConversion(#[from] ConversionError),

    /// Error from the versioned store
    #[error("Store error: {0}")]
    Store(#[from] termstore_core::Error),
}

/// Result type for semantic-index operations
pub type Result<T> = std::result::Result<T, SemanticError>;
