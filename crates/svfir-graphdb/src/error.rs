//! Error types for the graph-store layer.
//!
//! [`GraphDbError`] is what the RPC collaborator and backends report.
//! [`RecordError`] describes why one raw record could not become an entity;
//! it never escapes a load session, it is turned into a diagnostic.

use thiserror::Error;

use crate::codec::CodecError;
use crate::refs::Field;

/// Failures of a single statement against the graph store.
#[derive(Debug, Error)]
pub enum GraphDbError {
    /// The collaborator answered but reported failure.
    #[error("store '{store}' rejected statement: {message}")]
    Transport { store: String, message: String },

    /// A response could not be interpreted.
    #[error("malformed response from store '{store}': {reason}")]
    MalformedResponse { store: String, reason: String },

    /// An underlying SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A configuration value could not be parsed.
    #[error("invalid value '{value}' for option {key}")]
    InvalidOption { key: String, value: String },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a raw record was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("record is not an object with label and properties")]
    NotARecord,

    #[error("missing property '{key}'")]
    MissingProperty { key: String },

    #[error("property '{key}' is invalid: {reason}")]
    InvalidProperty { key: String, reason: String },

    #[error("property '{key}': {source}")]
    Codec {
        key: String,
        #[source]
        source: CodecError,
    },

    /// A mandatory reference was the sentinel or pointed at an id that is
    /// not loaded and cannot be deferred.
    #[error("{field:?} references missing {target}")]
    MissingReference { field: Field, target: String },
}
