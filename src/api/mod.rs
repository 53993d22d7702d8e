pub mod error;
pub mod form;
pub mod health;
pub mod page;
pub mod response;
pub mod session;
pub mod v1;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

use crate::{config::Config, controller::AppState};

const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn router(state: AppState, cfg: &Config) -> Router {
    let mut router = Router::new()
        .route("/", get(form::index).post(form::submit))
        .route("/healthz", get(health::health_check))
        .nest("/api/v1", v1::router())
        .with_state(state);

    if cfg.server.enable_cors {
        match cfg.server.cors_origin.parse::<HeaderValue>() {
            Ok(origin) => {
                let cors = CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_headers([header::CONTENT_TYPE]);
                router = router.layer(cors);
            }
            Err(e) => {
                warn!(origin = %cfg.server.cors_origin, error = %e, "invalid CORS origin, CORS disabled");
            }
        }
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.server.request_timeout_secs))),
        )
        .layer(TraceLayer::new_for_http())
}
