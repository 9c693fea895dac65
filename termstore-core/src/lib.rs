//! # Termstore Core
//!
//! Core library for the termstore versioned terminology server.
//!
//! This crate provides:
//! - Versioned terminology components: `Concept`, `Relationship`,
//!   `AxiomMember`, and the persisted `QueryConcept` projection row
//! - The branch/commit model (`Branch`, `Commit`, `CommitListener`)
//! - Branch-criteria selectors and the `TermStore` query-surface trait
//! - An in-memory reference store implementation (`MemoryStore`)
//! - The axiom-conversion seam (`AxiomConverter`)
//!
//! ## Design Principles
//!
//! 1. **Async at the I/O seam only**: store traits are async; everything else
//!    is synchronous once data is in memory
//! 2. **Bounded-memory streams**: scans are `BoxStream`s an implementation may
//!    back with scroll cursors, search-after, or keyset pagination
//! 3. **Plain-data criteria**: branch criteria are values the store
//!    interprets, not query builders

pub mod axiom;
pub mod branch;
pub mod component;
pub mod criteria;
pub mod error;
pub mod ids;
pub mod memory;
pub mod store;

pub use axiom::{AxiomConverter, AxiomRepresentation, ConversionError, JsonAxiomConverter};
pub use branch::{parent_path, Branch, Commit, CommitListener, CommitType};
pub use component::{
    AttributeGroups, AxiomMember, ComponentKind, Concept, QueryConcept, Relationship,
    StoredVersion,
};
pub use criteria::{BranchCriteria, Selector};
pub use error::{Error, Result};
pub use ids::{ConceptId, Timepoint};
pub use memory::MemoryStore;
pub use store::{
    AxiomMemberQuery, QueryConceptQuery, RelationshipQuery, TermStore, VersionStream,
};
