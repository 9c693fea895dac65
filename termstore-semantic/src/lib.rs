//! # Termstore Semantic Index
//!
//! Incremental maintenance of the semantic index: a precomputed, per-branch
//! projection of the terminology's logical structure. For every concept the
//! index records its direct parents, its full ancestor set, and its grouped
//! non-hierarchical attributes, so subsumption queries, descendant
//! enumeration and grouped-attribute search run in near-constant time.
//!
//! Two variants of the index coexist: a *stated* form derived from
//! author-supplied axioms plus stated-hierarchy relationships, and an
//! *inferred* form derived from classifier-produced relationships. Both are
//! kept consistent with the source artifacts after every commit by
//! [`SemanticIndexUpdater`], which runs inside the commit lifecycle, and both
//! can be recomputed from scratch with [`SemanticIndexUpdater::rebuild`].
//!
//! ## Pipeline
//!
//! Per commit and per form: change-set discovery finds the concepts whose
//! projection may change; the loader pulls just enough of the prior graph to
//! re-derive closures correctly under multiple inheritance; the commit's
//! deltas are replayed into the graph and the attribute-change log; the
//! writer diffs recomputed state against stored rows and persists changes in
//! batches. Rebase commits first invalidate the branch's own rows and then
//! replay all branch-local content over the new parent base.

mod axiom_stream;
pub mod changes;
pub mod config;
mod delta;
pub mod error;
pub mod form;
pub mod graph;
mod loader;
mod rebase;
pub mod updater;
mod writer;

pub use changes::{AttributeChange, AttributeChanges, UNPUBLISHED_EFFECTIVE_TIME};
pub use config::{SemanticIndexConfig, DEFAULT_BATCH_SAVE_SIZE};
pub use error::{Result, SemanticError};
pub use form::Form;
pub use graph::{GraphBuilder, Node};
pub use updater::SemanticIndexUpdater;
