pub mod handlers;
pub mod payload;
pub mod rejection;

use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

use crate::analysis::MealAnalyzer;
use crate::core::config::{is_valid_origin, ServerConfig};
use crate::core::{HealthChecker, ServiceMetrics};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<MealAnalyzer>,
    pub metrics: ServiceMetrics,
    pub health: HealthChecker,
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>(limit: u64) -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(limit).and(warp::body::json())
}

/// Metric label for a request path. Unknown paths share one label.
pub fn endpoint_label(path: &str) -> &'static str {
    match path.trim_end_matches('/') {
        "/analyze" => "analyze",
        "/calculate-insulin" => "calculate_insulin",
        "/calculate-kowalska" => "calculate_kowalska",
        "/health" => "health",
        "/metrics" => "metrics",
        _ => "other",
    }
}

/// Every route, with error recovery, CORS, request counting and tracing
/// applied. Rejections become `{ "error": ... }` replies both inside CORS,
/// so allowed origins can read them, and outside it, for forbidden origins.
pub fn routes(
    state: AppState,
    config: &ServerConfig,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let limit = config.max_body_bytes;
    let counters = state.metrics.clone();

    let analyze = warp::path!("analyze")
        .and(warp::post())
        .and(json_body(limit))
        .and(with_state(state.clone()))
        .and_then(handlers::analyze);

    let insulin = warp::path!("calculate-insulin")
        .and(warp::post())
        .and(json_body(limit))
        .and_then(handlers::calculate_insulin);

    let fat_protein = warp::path!("calculate-kowalska")
        .and(warp::post())
        .and(json_body(limit))
        .and_then(handlers::calculate_fat_protein);

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::health);

    let metrics = warp::path!("metrics")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::metrics);

    let origins: Vec<&str> = config
        .allowed_origins
        .iter()
        .map(String::as_str)
        .filter(|origin| {
            let valid = is_valid_origin(origin);
            if !valid {
                tracing::error!("Ignoring invalid CORS origin '{}'", origin);
            }
            valid
        })
        .collect();
    let cors = warp::cors()
        .allow_origins(origins)
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["Content-Type", "Authorization"]);

    let record = warp::log::custom(move |info: warp::log::Info<'_>| {
        counters.record_request(endpoint_label(info.path()), info.status().as_u16());
    });

    analyze
        .or(insulin)
        .or(fat_protein)
        .or(health)
        .or(metrics)
        .recover(rejection::handle_rejection)
        .with(cors)
        .recover(rejection::handle_rejection)
        .with(record)
        .with(warp::trace::request())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_label() {
        assert_eq!(endpoint_label("/analyze"), "analyze");
        assert_eq!(endpoint_label("/calculate-kowalska/"), "calculate_kowalska");
        assert_eq!(endpoint_label("/wp-admin/setup.php"), "other");
        assert_eq!(endpoint_label("/"), "other");
    }
}
