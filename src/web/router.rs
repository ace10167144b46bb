//! Web application router and middleware setup.

use crate::metrics::Probes;
use crate::web::config::ServiceConfig;
use crate::web::handlers;
use crate::web::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the axum application with all routes and middleware.
pub fn create_app<P: Probes + 'static>(config: &ServiceConfig, state: AppState<P>) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::dashboard))
        .route("/api/status", get(handlers::api_status::<P>))
        .route("/api/health", get(handlers::health_check))
        .route("/camera-config", post(handlers::update_camera::<P>))
        .fallback(handlers::not_found)
        .with_state(state);

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
