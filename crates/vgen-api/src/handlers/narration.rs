//! Batch narration endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use vgen_models::{BatchResult, Scene};
use vgen_worker::NarrationBatch;

use super::{check_batch_size, reject_local_media};
use crate::error::ApiResult;
use crate::metrics::record_batch;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NarrationBatchRequest {
    pub scenes: Vec<Scene>,
    /// Overrides the configured narration provider
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Serialize)]
pub struct NarrationBatchResponse {
    #[serde(flatten)]
    pub result: BatchResult,
    pub scenes: Vec<Scene>,
}

/// Synthesize narration for every scene at once.
pub async fn narrate_batch(
    State(state): State<AppState>,
    Json(request): Json<NarrationBatchRequest>,
) -> ApiResult<Json<NarrationBatchResponse>> {
    check_batch_size(&state, request.scenes.len())?;
    reject_local_media(request.scenes.iter().flat_map(|s| s.media()))?;

    let provider = request
        .provider
        .unwrap_or_else(|| state.settings.narration_provider.clone());
    state.runner.registry().get(&provider)?;

    let mut batch = NarrationBatch::new(state.runner.clone(), provider);
    if let Some(voice) = request.voice.or_else(|| state.settings.voice.clone()) {
        batch = batch.with_voice(voice);
    }

    let mut scenes = request.scenes;
    let result = batch.narrate(&mut scenes).await;
    record_batch("narration", result.success_count, result.total_count);

    Ok(Json(NarrationBatchResponse { result, scenes }))
}
