use serde::Serialize;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;
use warp::{Rejection, Reply};

use super::payload::{AnalyzeRequest, FatProteinRequest, InsulinRequest};
use super::AppState;
use crate::core::error::{Result, ServiceError};
use crate::dosing::{calculate_bolus, calculate_fat_protein_bolus};

/// Turns a handler outcome into a JSON reply or a rejection for
/// `handle_rejection`.
fn respond<T: Serialize>(
    result: Result<T>,
) -> std::result::Result<warp::reply::Json, Rejection> {
    result
        .map(|body| warp::reply::json(&body))
        .map_err(warp::reject::custom)
}

pub async fn analyze(
    body: AnalyzeRequest,
    state: AppState,
) -> std::result::Result<impl Reply, Rejection> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", %request_id);

    async move {
        info!(
            user_id = ?body.user_id,
            description_len = body.description.as_ref().map(|d| d.len()),
            image_len = body.image.as_ref().map(|i| i.len()),
            language = ?body.language,
            "📥 /analyze received"
        );

        let result = match body.into_meal_request() {
            Ok(meal) => state.analyzer.analyze(&meal).await,
            Err(e) => {
                warn!("⚠️ {}", e);
                Err(e)
            }
        };
        if let Err(e @ ServiceError::Upstream(_)) = &result {
            error!("❌ Analysis failed: {}", e);
        }

        respond(result)
    }
    .instrument(span)
    .await
}

pub async fn calculate_insulin(body: InsulinRequest) -> std::result::Result<impl Reply, Rejection> {
    let result = body
        .into_input()
        .and_then(|input| calculate_bolus(&input).map(|dose| (input, dose)));

    let result = match result {
        Ok((input, dose)) => {
            info!(
                "💉 Insulin: carbs={} ratio={} correction={} total={}",
                input.carbs, input.ic_ratio, dose.correction_bolus, dose.total_insulin
            );
            Ok(dose)
        }
        Err(e) => {
            warn!("⚠️ Insulin calculation rejected: {}", e);
            Err(e)
        }
    };

    respond(result)
}

pub async fn calculate_fat_protein(body: FatProteinRequest) -> std::result::Result<impl Reply, Rejection> {
    let input = body.into_input();
    let result = calculate_fat_protein_bolus(&input);

    match &result {
        Ok(dose) => info!(
            "🍗 Fat/protein bolus: proteins={} fats={} kcal={} extra={}",
            input.proteins, input.fats, dose.total_calories, dose.additional_bolus
        ),
        Err(e) => warn!("⚠️ Fat/protein calculation rejected: {}", e),
    }

    respond(result)
}

pub async fn health(state: AppState) -> std::result::Result<impl Reply, Rejection> {
    let status = state.health.get_status().await;
    Ok(warp::reply::json(&status))
}

pub async fn metrics(state: AppState) -> std::result::Result<impl Reply, Rejection> {
    let text = state.metrics.render().map_err(warp::reject::custom)?;
    Ok(warp::reply::with_header(
        text,
        "content-type",
        "text/plain; version=0.0.4",
    ))
}
