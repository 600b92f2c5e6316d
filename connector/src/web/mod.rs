//! HTTP front end
//!
//! A single query endpoint plus a health check. Each request runs as its own
//! task, so one slow query never holds up another.

pub mod api;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use sql_policy::QueryPolicy;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::AppConfig;
use crate::db::{self, Gate, PgExecutor};
use state::AppState;

/// Start the web server
pub async fn serve(config: &AppConfig) -> Result<()> {
    let pool = db::connect_lazy(&config.db, config.server.max_connections);
    let gate = Gate::new(
        QueryPolicy::new(config.server.schema.as_str()),
        Arc::new(PgExecutor::new(pool)),
    );

    let app = create_router(AppState::new(gate));

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!(
        bind_addr = %config.server.bind_addr,
        schema = %config.server.schema,
        "Company REST API Connector listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(api::health_check))
        .route("/health", get(api::health_check))
        .route("/query", post(api::query_db))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{QueryExecutor, ResultSet};
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use std::io;
    use std::sync::Mutex;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    /// Blocks statements mentioning `slow` until released
    struct GatedExecutor {
        release: Notify,
    }

    #[async_trait]
    impl QueryExecutor for GatedExecutor {
        async fn fetch_all(&self, sql: &str) -> Result<ResultSet, sqlx::Error> {
            if sql.contains("slow") {
                self.release.notified().await;
            }
            Ok(vec![])
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_query_does_not_stall_others() {
        let executor = Arc::new(GatedExecutor {
            release: Notify::new(),
        });
        let state = AppState::new(Gate::new(QueryPolicy::default(), executor.clone()));

        let slow_state = state.clone();
        let slow = tokio::spawn(async move {
            api::handle(&slow_state, Some("SELECT * FROM company.slow_view")).await
        });

        let fast = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            api::handle(&state, Some("SELECT * FROM company.employees")),
        )
        .await
        .expect("fast query should not wait for the slow one");
        assert!(fast.is_ok());
        assert!(!slow.is_finished());

        // notify_one stores a permit if the slow task has not parked yet
        executor.release.notify_one();
        let slow = slow.await.unwrap();
        assert!(slow.is_ok());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_request_trace_is_visible_at_info() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let executor = Arc::new(GatedExecutor {
            release: Notify::new(),
        });
        let app = create_router(AppState::new(Gate::new(QueryPolicy::default(), executor)));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_success());

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("finished processing request"), "logs: {logs}");
        assert!(logs.contains("INFO"), "logs: {logs}");
    }
}
