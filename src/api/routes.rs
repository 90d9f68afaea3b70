//! Gateway route configuration

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, AppState};
use super::middleware::{logging_middleware, rate_limit_middleware};

/// Create the gateway router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    // The kiosk frontend and the panel are served from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health & panel
        .route("/health", get(handlers::health_check))
        .route("/queue", get(handlers::get_queue))
        // Intake
        .route("/patients", get(handlers::lookup_patient))
        .route("/patients", post(handlers::register_patient))
        .route("/convenios", get(handlers::list_insurances))
        .route("/especialidades", get(handlers::list_specialties))
        .route("/checkin", post(handlers::create_checkin));

    Router::new()
        .nest("/v1", api_v1)
        // Also expose health at root for platform liveness checks
        .route("/health", get(handlers::health_check))
        .with_state(state)
        // Middleware (order matters - bottom runs first)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(rate_limit_middleware))
}

/// Span for the HTTP trace layer. Records the path only: lookup query
/// strings carry patient documents, which must never reach the logs.
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "http",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_span_drops_query_string() {
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            let request = Request::builder()
                .uri("/v1/patients?documento=52998224725")
                .body(Body::empty())
                .unwrap();

            let span = request_span(&request);
            let fields = span.metadata().expect("span should be enabled").fields();
            assert!(fields.field("path").is_some());
            // The full URI (query string included) is never a span field
            assert!(fields.field("uri").is_none());
            assert!(fields.field("query").is_none());
        });
    }
}
