//! Graph-store persistence for program-IR graphs.
//!
//! Writes an [`SvfIr`](svfir_core::SvfIr) into a graph store through the
//! [`GraphDbClient`] collaborator and reconstructs it again, page by page,
//! resolving cross references as kinds arrive.
//!
//! # Architecture
//!
//! Write path: [`marshal`] turns each entity into one [`Statement`];
//! [`writer::persist`] sends them store by store.
//!
//! Read path: [`PagedReader`] pulls raw records per kind; the
//! [`Reconstructor`] builds entities under the reference policies in
//! [`refs`], registering them in a [`LoadSession`]; after the final
//! deferred pass the [`GraphAssembler`] composes the graph and a
//! [`LoadReport`] of diagnostics.
//!
//! # Modules
//!
//! - [`codec`]: text encoding of collection-valued properties
//! - [`statement`]: parameterized statements and the quoting routine
//! - [`record`]: null-checked access to raw records
//! - [`kinds`]: stores, entity kinds and the load order
//! - [`refs`]: the reference policy table
//! - [`session`]: the per-load cross-reference index
//! - [`reconstruct`]: per-kind entity builders and the load driver
//! - [`memory`], [`sqlite`]: collaborator backends

pub mod assemble;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod kinds;
pub mod marshal;
pub mod memory;
pub mod reader;
pub mod reconstruct;
pub mod record;
pub mod refs;
pub mod schema;
pub mod session;
pub mod sqlite;
pub mod statement;
pub mod traits;
pub mod writer;

pub use assemble::{Assembly, GraphAssembler};
pub use config::DbOptions;
pub use diagnostics::{Diagnostic, LoadReport};
pub use error::{GraphDbError, RecordError};
pub use kinds::{load_order, EntityKind, Store};
pub use memory::InMemoryGraphDb;
pub use reader::PagedReader;
pub use reconstruct::{load, LoadPhase, Reconstructor};
pub use refs::{Field, RefPolicy};
pub use session::LoadSession;
pub use sqlite::SqliteGraphDb;
pub use statement::Statement;
pub use traits::GraphDbClient;
pub use writer::{persist, WriteReport};
