//! Request handlers.

pub mod generation;
pub mod health;
pub mod narration;
pub mod providers;
pub mod render;
pub mod scenes;

pub use generation::*;
pub use health::*;
pub use narration::*;
pub use providers::*;
pub use render::*;
pub use scenes::*;

use vgen_models::MediaLocator;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Reject scene lists above the configured batch cap.
pub(crate) fn check_batch_size(state: &AppState, len: usize) -> ApiResult<()> {
    if len > state.config.max_batch_items {
        return Err(ApiError::bad_request(format!(
            "Batch of {} scenes exceeds the limit of {}",
            len, state.config.max_batch_items
        )));
    }
    Ok(())
}

/// Refuse server-side paths in client input; only URLs and inline data are accepted.
pub(crate) fn reject_local_media<'a>(
    media: impl IntoIterator<Item = &'a MediaLocator>,
) -> ApiResult<()> {
    if media.into_iter().any(MediaLocator::is_local) {
        return Err(ApiError::bad_request(
            "Media must be a URL or inline data; local file paths are not accepted",
        ));
    }
    Ok(())
}
