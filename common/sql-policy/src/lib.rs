//! SQL Policy - acceptance rules for raw query text
//!
//! Decides whether a submitted SQL string may run against the database.
//! The rules are purely textual:
//!
//! - **Statement type**: the trimmed text must start with `SELECT` (any case)
//! - **Schema scoping**: the text must mention `<schema>.` somewhere (any case)
//!
//! This is a substring check, not a parser. `company.` appearing only in a
//! comment or string literal satisfies it, and comment-smuggled or
//! multi-statement payloads are not detected here.
//!
//! # Example
//!
//! ```rust
//! use sql_policy::{QueryPolicy, Rejection};
//!
//! let policy = QueryPolicy::default();
//! assert_eq!(policy.classify("  SELECT * FROM company.staff "), Ok("SELECT * FROM company.staff"));
//! assert_eq!(policy.classify("DROP TABLE company.staff"), Err(Rejection::NotReadOnly));
//! ```

use thiserror::Error;

/// Schema every accepted query must reference
pub const DEFAULT_SCHEMA: &str = "company";

const READ_ONLY_PREFIX: &str = "SELECT";

/// Why a query was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("query must not be empty")]
    Empty,

    #[error("Only SELECT statements are allowed.")]
    NotReadOnly,

    #[error("Only queries on the '{schema}' schema are allowed.")]
    SchemaNotPermitted { schema: String },
}

impl Rejection {
    /// Whether the query named a forbidden target, as opposed to being malformed
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Rejection::SchemaNotPermitted { .. })
    }
}

/// Read-only, single-schema acceptance policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    schema: String,
    qualifier: String,
}

impl QueryPolicy {
    /// Create a policy scoped to `schema`
    pub fn new(schema: impl Into<String>) -> Self {
        let schema = schema.into();
        let qualifier = format!("{}.", schema.to_lowercase());
        Self { schema, qualifier }
    }

    /// The schema this policy admits
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Classify a query, returning the trimmed text when accepted
    ///
    /// Rules run in a fixed order: emptiness, statement type, then schema.
    pub fn classify<'a>(&self, sql: &'a str) -> Result<&'a str, Rejection> {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Err(Rejection::Empty);
        }

        if !trimmed.to_uppercase().starts_with(READ_ONLY_PREFIX) {
            return Err(Rejection::NotReadOnly);
        }

        if !sql.to_lowercase().contains(&self.qualifier) {
            return Err(Rejection::SchemaNotPermitted {
                schema: self.schema.clone(),
            });
        }

        Ok(trimmed)
    }
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA)
    }
}

/// Classify against the default `company` schema
pub fn classify(sql: &str) -> Result<&str, Rejection> {
    QueryPolicy::default().classify(sql)
}
