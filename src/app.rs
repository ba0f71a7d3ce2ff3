use axum::{
    Router,
    http::{
        HeaderName, Method,
        header::{
            ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE,
            ORIGIN,
        },
    },
    middleware,
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{create_todo, delete_todo, get_todo, healthcheck, list_todos, update_todo},
    metrics::{metrics_handler, track_requests},
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/metrics", get(metrics_handler))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_requests,
        ))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    // Credentials rule out wildcards, so the origin is mirrored and headers are listed.
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_headers([
            CONTENT_TYPE,
            CONTENT_LENGTH,
            ACCEPT_ENCODING,
            HeaderName::from_static("x-csrf-token"),
            AUTHORIZATION,
            ACCEPT,
            ORIGIN,
            CACHE_CONTROL,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
}
