//! Core error types for svfir-core.
//!
//! Uses `thiserror` for structured, matchable variants covering the ways
//! the composed IR graph can reject an insertion.

use thiserror::Error;

use crate::id::BlockKey;

/// Errors produced while building an [`SvfIr`](crate::graph::SvfIr).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An entity with the same id already exists in its namespace.
    #[error("duplicate {kind} with id {id}")]
    DuplicateEntity { kind: &'static str, id: String },

    /// An edge endpoint or owner does not exist.
    #[error("{kind} {id} not found")]
    EntityNotFound { kind: &'static str, id: String },

    /// A basic-block edge names a block missing from its function.
    #[error("basic block {key} not found")]
    BlockNotFound { key: BlockKey },
}
