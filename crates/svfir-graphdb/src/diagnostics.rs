//! Diagnostics accumulated by a load session.
//!
//! Nothing a single record can do aborts a load. Each problem becomes one
//! [`Diagnostic`]; the caller inspects the final [`LoadReport`] and decides
//! whether any of them is fatal for its purpose.

use std::fmt;

use crate::error::RecordError;
use crate::kinds::{EntityKind, Store};
use crate::refs::Field;
use crate::session::{EntityRef, Target};

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A page request failed; the rest of that kind was not read.
    Transport {
        store: Store,
        kind: EntityKind,
        message: String,
    },
    /// A record could not be turned into an entity.
    MalformedRecord { kind: EntityKind, error: RecordError },
    /// A mandatory reference was absent; the record was skipped.
    MissingReference {
        kind: EntityKind,
        field: Field,
        target: String,
    },
    /// A deferred reference whose target never loaded.
    UnresolvedReference {
        owner: EntityRef,
        field: Field,
        target: Target,
    },
    /// A node id seen twice in one session; the first one is kept.
    DuplicateEntity { entity: EntityRef },
    /// The assembled graph rejected an entity or failed a consistency check.
    Inconsistent { detail: String },
}

impl Diagnostic {
    pub(crate) fn rejected(kind: EntityKind, error: RecordError) -> Self {
        match error {
            RecordError::MissingReference { field, target } => Diagnostic::MissingReference {
                kind,
                field,
                target,
            },
            error => Diagnostic::MalformedRecord { kind, error },
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Diagnostic::UnresolvedReference { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Transport {
                store,
                kind,
                message,
            } => write!(f, "reading {} from {} failed: {}", kind, store, message),
            Diagnostic::MalformedRecord { kind, error } => {
                write!(f, "skipped malformed {} record: {}", kind, error)
            }
            Diagnostic::MissingReference {
                kind,
                field,
                target,
            } => write!(
                f,
                "skipped {} record: {:?} references missing {}",
                kind, field, target
            ),
            Diagnostic::UnresolvedReference {
                owner,
                field,
                target,
            } => write!(f, "{} {:?} never resolved to {}", owner, field, target),
            Diagnostic::DuplicateEntity { entity } => {
                write!(f, "duplicate {}, keeping the first", entity)
            }
            Diagnostic::Inconsistent { detail } => f.write_str(detail),
        }
    }
}

/// Outcome of one load session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Raw records pulled from the store.
    pub records_read: usize,
    /// Records that became entities, duplicates excluded.
    pub entities_built: usize,
    pub pages_fetched: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_unresolved())
    }

    pub fn duplicates(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::DuplicateEntity { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svfir_core::{StmtTag, TypeId, VarId};

    #[test]
    fn test_rejected_splits_missing_references() {
        let kind = EntityKind::Stmt(StmtTag::Copy);
        let missing = Diagnostic::rejected(
            kind,
            RecordError::MissingReference {
                field: Field::StmtSrc,
                target: "Var 9".into(),
            },
        );
        assert!(matches!(missing, Diagnostic::MissingReference { field: Field::StmtSrc, .. }));

        let malformed = Diagnostic::rejected(kind, RecordError::NotARecord);
        assert!(matches!(malformed, Diagnostic::MalformedRecord { .. }));
    }

    #[test]
    fn test_report_filters() {
        let report = LoadReport {
            diagnostics: vec![
                Diagnostic::UnresolvedReference {
                    owner: EntityRef::Type(TypeId(1)),
                    field: Field::FunctionRet,
                    target: Target::Type(TypeId(99)),
                },
                Diagnostic::DuplicateEntity {
                    entity: EntityRef::Var(VarId(3)),
                },
            ],
            ..LoadReport::default()
        };
        assert!(!report.is_clean());
        assert_eq!(report.unresolved().count(), 1);
        assert_eq!(report.duplicates().count(), 1);
        assert_eq!(
            report.diagnostics[0].to_string(),
            "type 1 FunctionRet never resolved to type 99"
        );
    }
}
