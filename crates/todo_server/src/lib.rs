//! HTTP service exposing the task store.
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | GET | `/tasks` | 200, tasks newest first |
//! | POST | `/tasks` | 201, created task |
//! | PUT | `/tasks/{id}` | 200, toggled task |
//! | DELETE | `/tasks/{id}` | 200, `{message}` |
//!
//! Errors are returned as `{ "error": "..." }`.

pub mod error;
pub mod handlers;

use axum::Router;
use axum::routing::{get, put};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use handlers::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/tasks/{id}",
            put(handlers::toggle_task).delete(handlers::delete_task),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        tracing::info!("listening on {}", address);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
