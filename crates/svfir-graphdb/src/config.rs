//! Options controlling whether and how the graph store is used.
//!
//! Defaults can be overridden from environment variables:
//! - `SVFIR_READ_FROM_DB`: load the IR from the store (default: false)
//! - `SVFIR_WRITE2DB`: persist the IR after construction (default: false)
//! - `SVFIR_PAGE_SIZE`: records per page request (default: 1000)
//! - `SVFIR_CLEAR_BEFORE_WRITE`: empty each store before writing (default: false)
//! - `SVFIR_DB_PATH`: SQLite store file (default: "svfir.db")

use serde::{Deserialize, Serialize};

use crate::error::GraphDbError;
use crate::statement::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbOptions {
    pub read_from_db: bool,
    pub write_to_db: bool,
    pub page_size: usize,
    pub clear_before_write: bool,
    pub db_path: String,
}

impl Default for DbOptions {
    fn default() -> Self {
        DbOptions {
            read_from_db: false,
            write_to_db: false,
            page_size: DEFAULT_PAGE_SIZE,
            clear_before_write: false,
            db_path: "svfir.db".to_string(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, GraphDbError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(GraphDbError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl DbOptions {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, GraphDbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, starting from the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GraphDbError> {
        let mut options = DbOptions::default();
        if let Some(v) = lookup("SVFIR_READ_FROM_DB") {
            options.read_from_db = parse_bool("SVFIR_READ_FROM_DB", &v)?;
        }
        if let Some(v) = lookup("SVFIR_WRITE2DB") {
            options.write_to_db = parse_bool("SVFIR_WRITE2DB", &v)?;
        }
        if let Some(v) = lookup("SVFIR_CLEAR_BEFORE_WRITE") {
            options.clear_before_write = parse_bool("SVFIR_CLEAR_BEFORE_WRITE", &v)?;
        }
        if let Some(v) = lookup("SVFIR_PAGE_SIZE") {
            options.page_size = v
                .trim()
                .parse()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| GraphDbError::InvalidOption {
                    key: "SVFIR_PAGE_SIZE".to_string(),
                    value: v.clone(),
                })?;
        }
        if let Some(v) = lookup("SVFIR_DB_PATH") {
            options.db_path = v;
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = DbOptions::from_lookup(lookup(&[])).unwrap();
        assert_eq!(options, DbOptions::default());
        assert!(!options.read_from_db);
        assert!(!options.write_to_db);
        assert_eq!(options.page_size, 1000);
    }

    #[test]
    fn test_overrides() {
        let options = DbOptions::from_lookup(lookup(&[
            ("SVFIR_READ_FROM_DB", "true"),
            ("SVFIR_WRITE2DB", "1"),
            ("SVFIR_PAGE_SIZE", "250"),
            ("SVFIR_DB_PATH", "/tmp/ir.db"),
        ]))
        .unwrap();
        assert!(options.read_from_db);
        assert!(options.write_to_db);
        assert_eq!(options.page_size, 250);
        assert_eq!(options.db_path, "/tmp/ir.db");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(DbOptions::from_lookup(lookup(&[("SVFIR_PAGE_SIZE", "0")])).is_err());
        assert!(DbOptions::from_lookup(lookup(&[("SVFIR_WRITE2DB", "maybe")])).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: DbOptions = serde_json::from_str(r#"{"write_to_db": true}"#).unwrap();
        assert!(options.write_to_db);
        assert_eq!(options.page_size, DEFAULT_PAGE_SIZE);
    }
}
