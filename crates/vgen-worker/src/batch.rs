//! Batch orchestrator.

use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use tracing::{info, warn};
use vgen_models::{BatchItemResult, BatchResult, MediaLocator};

/// Run `per_item` for every item concurrently and collect each outcome.
///
/// A failed item is recorded with its error and never affects its siblings.
/// Results keep input order.
pub async fn run_batch<T, F, Fut, E>(items: Vec<(String, T)>, per_item: F) -> BatchResult
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<MediaLocator, E>>,
    E: Display,
{
    let total = items.len();
    let tasks = items.into_iter().map(|(item_id, input)| {
        let fut = per_item(input);
        async move {
            match fut.await {
                Ok(media) => BatchItemResult::success(item_id, media),
                Err(e) => {
                    warn!(item_id = %item_id, "Batch item failed: {}", e);
                    BatchItemResult::failure(item_id, e.to_string())
                }
            }
        }
    });

    let result = BatchResult::from_items(join_all(tasks).await);
    info!(
        total,
        succeeded = result.success_count,
        failed = total - result.success_count,
        "Batch finished"
    );
    result
}
