//! Single generation endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::debug;
use vgen_models::{GenerationKind, GenerationRequest, MediaLocator};
use vgen_worker::run_with_provider;

use super::reject_local_media;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct GenerationResponse {
    pub result: MediaLocator,
}

/// Run one request to completion and return its media.
pub async fn create_generation(
    State(state): State<AppState>,
    Json(mut request): Json<GenerationRequest>,
) -> ApiResult<Json<GenerationResponse>> {
    reject_local_media(&request.source_media)?;
    let provider = state.runner.registry().get(&request.provider)?;

    // Inline payloads the provider can't take must become URLs first.
    if provider.kind() == GenerationKind::ImageToVideo && request.source_media.is_some() {
        let image = state
            .normalizer
            .normalize(request.source_media.as_ref(), provider.accepts_inline_source())
            .await?;
        request.source_media = Some(image);
    }

    let result = run_with_provider(provider.as_ref(), &request, None, |p| {
        debug!(job_id = %p.job_id, status = %p.status, percent = p.percent, "Generation progress");
    })
    .await?;

    Ok(Json(GenerationResponse { result }))
}
