//! Identifier and timepoint aliases shared across the workspace.

/// SNOMED CT concept identifier (SCTID). SCTIDs are decimal integers of up to
/// 18 digits, so they fit in an `i64`.
pub type ConceptId = i64;

/// Commit timepoint on a branch (epoch milliseconds). Strictly increasing per
/// store; used as the `start`/`end` boundary of component versions.
pub type Timepoint = i64;
