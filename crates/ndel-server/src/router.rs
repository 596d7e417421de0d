use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{middleware, Router};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handler;
use crate::request_id;
use crate::state::AppState;

/// Build the axum router with all ndel endpoints.
pub fn build_router(state: AppState, max_upload_size: usize) -> Router {
    Router::new()
        .route("/", get(handler::root))
        .route("/objects", get(handler::list_objects))
        .route("/objects/", get(handler::list_objects))
        .route(
            "/objects/:oid",
            get(handler::get_object)
                .head(handler::head_object)
                .put(handler::put_object),
        )
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_id::make_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(request_id::assign))
        .with_state(state)
}
