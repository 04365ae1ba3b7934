//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use vgw_models::{format_video_route, VIDEO_ID_PARAM};

use crate::handlers::{
    cancel_object_detection, create_config, create_field, delete_config, delete_field,
    get_config, get_object_detection_status, health, list_configs, put_field, ready,
    start_object_detection, update_config,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::response::{CONFIG_FIELD_ROUTE, CONFIG_ROUTE};
use crate::state::AppState;

/// Turn a `{video_id}` template into an axum path.
fn video_path(template: &str) -> String {
    format_video_route(template, &format!(":{}", VIDEO_ID_PARAM))
}

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let detection = state.links.detection_routes().clone();

    let detection_routes = Router::new()
        .route(&video_path(&detection.start), post(start_object_detection))
        .route(&video_path(&detection.cancel), post(cancel_object_detection))
        .route(&video_path(&detection.status), get(get_object_detection_status));

    let detection_routes = match detection.sub_route.trim_end_matches('/') {
        "" => detection_routes,
        prefix => Router::new().nest(prefix, detection_routes),
    };

    let config_routes = Router::new()
        .route(CONFIG_ROUTE, get(list_configs).post(create_config))
        .route(
            &format!("{}/:id", CONFIG_ROUTE),
            get(get_config).put(update_config).delete(delete_config),
        )
        .route(&format!("{}/:config_id", CONFIG_FIELD_ROUTE), post(create_field))
        .route(
            &format!("{}/:config_id/:field_id", CONFIG_FIELD_ROUTE),
            axum::routing::put(put_field).delete(delete_field),
        );

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(detection_routes)
        .merge(config_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_path() {
        assert_eq!(video_path("/start/{video_id}"), "/start/:video_id");
        assert_eq!(video_path("/{video_id}/status"), "/:video_id/status");
    }
}
