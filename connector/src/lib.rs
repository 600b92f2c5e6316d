//! Company REST API Connector
//!
//! Accepts raw SQL over HTTP, admits only `SELECT` statements that reference
//! the `company` schema, runs them against Postgres and returns the rows as
//! JSON objects.

pub mod config;
pub mod db;
pub mod error;
pub mod init;
pub mod web;

pub use config::{AppConfig, ConfigError, DbConfig, ServerConfig};
pub use db::{Gate, PgExecutor, QueryExecutor, ResultSet, Row};
pub use error::GateError;
