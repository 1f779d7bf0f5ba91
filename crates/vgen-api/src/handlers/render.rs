//! Render endpoint.

use axum::extract::State;
use axum::Json;
use tracing::info;
use vgen_models::{RenderRequest, RenderResponse};

use super::reject_local_media;
use crate::error::ApiResult;
use crate::state::AppState;

/// Compose the scene list into one video.
///
/// With storage configured the file is uploaded and its URL returned;
/// otherwise the response carries the local output path.
pub async fn render_video(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> ApiResult<Json<RenderResponse>> {
    reject_local_media(request.media())?;
    let output = state.render.render(&request, None).await?;

    let location = match &state.uploader {
        Some(uploader) => uploader.upload_render(&output.path, &output.job_id).await?,
        None => output.path.display().to_string(),
    };
    info!(job_id = %output.job_id, output = %location, "Render delivered");

    Ok(Json(RenderResponse {
        job_id: output.job_id,
        output: location,
        duration_secs: output.duration_secs,
        expected_duration_secs: output.expected_duration_secs,
        warnings: output.warnings,
    }))
}
