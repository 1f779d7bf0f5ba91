//! Scene motion endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use vgen_models::Scene;
use vgen_worker::{MotionPipeline, MotionSummary};

use super::{check_batch_size, reject_local_media};
use crate::error::ApiResult;
use crate::metrics::record_batch;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnimateRequest {
    pub scenes: Vec<Scene>,
    /// Overrides the configured image-to-video provider
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Serialize)]
pub struct AnimateResponse {
    pub scenes: Vec<Scene>,
    pub summary: MotionSummary,
    /// Present when at least one scene kept its still image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnimateResponse {
    fn new(scenes: Vec<Scene>, summary: MotionSummary) -> Self {
        let error = summary.error_message();
        Self { scenes, summary, error }
    }
}

fn pipeline(state: &AppState, provider: Option<String>) -> ApiResult<MotionPipeline> {
    let provider = provider.unwrap_or_else(|| state.settings.video_provider.clone());
    state.runner.registry().get(&provider)?;

    Ok(MotionPipeline::new(
        state.runner.clone(),
        state.normalizer.clone(),
        state.settings.clone(),
    )
    .with_provider(provider))
}

/// Animate every scene that has no video yet, in order.
pub async fn animate_scenes(
    State(state): State<AppState>,
    Json(request): Json<AnimateRequest>,
) -> ApiResult<Json<AnimateResponse>> {
    check_batch_size(&state, request.scenes.len())?;
    reject_local_media(request.scenes.iter().flat_map(|s| s.media()))?;
    let pipeline = pipeline(&state, request.provider)?;

    let mut scenes = request.scenes;
    let summary = pipeline.animate_all(&mut scenes).await;
    record_batch("motion", summary.succeeded, summary.succeeded + summary.failed);

    Ok(Json(AnimateResponse::new(scenes, summary)))
}

/// Re-animate one scene, replacing any video it already has.
pub async fn animate_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<String>,
    Json(request): Json<AnimateRequest>,
) -> ApiResult<Json<AnimateResponse>> {
    check_batch_size(&state, request.scenes.len())?;
    reject_local_media(request.scenes.iter().flat_map(|s| s.media()))?;
    let pipeline = pipeline(&state, request.provider)?;

    let mut scenes = request.scenes;
    let summary = pipeline.animate_scene(&mut scenes, &scene_id).await?;

    Ok(Json(AnimateResponse::new(scenes, summary)))
}
