//! Database access
//!
//! The [`Gate`] is the only path from a request to the database. It applies
//! the query policy and delegates accepted text to a [`QueryExecutor`].

pub mod executor;
pub mod gate;
pub mod value;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DbConfig;

pub use executor::{PgExecutor, QueryExecutor};
pub use gate::Gate;
pub use value::{ResultSet, Row};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a pool that opens connections on first use
///
/// An unreachable database is reported per request, not at startup.
pub fn connect_lazy(config: &DbConfig, max_connections: u32) -> PgPool {
    tracing::info!(
        host = config.host(),
        port = config.port(),
        database = config.database().unwrap_or_default(),
        max_connections,
        "Configured database pool"
    );

    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy_with(config.connect_options().clone())
}
