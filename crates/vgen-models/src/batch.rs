//! Batch results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::MediaLocator;

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchItemResult {
    pub item_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_media: Option<MediaLocator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl BatchItemResult {
    pub fn success(item_id: impl Into<String>, media: MediaLocator) -> Self {
        Self {
            item_id: item_id.into(),
            success: true,
            result_media: Some(media),
            error_detail: None,
        }
    }

    pub fn failure(item_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            success: false,
            result_media: None,
            error_detail: Some(error.into()),
        }
    }
}

/// Aggregate report of a batch call. Item order follows input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchResult {
    pub items: Vec<BatchItemResult>,
    pub success_count: usize,
    pub total_count: usize,
}

impl BatchResult {
    pub fn from_items(items: Vec<BatchItemResult>) -> Self {
        let success_count = items.iter().filter(|i| i.success).count();
        let total_count = items.len();
        Self {
            items,
            success_count,
            total_count,
        }
    }

    /// All items succeeded (trivially true for an empty batch).
    pub fn is_success(&self) -> bool {
        self.success_count == self.total_count
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchItemResult> {
        self.items.iter().filter(|i| !i.success)
    }

    pub fn get(&self, item_id: &str) -> Option<&BatchItemResult> {
        self.items.iter().find(|i| i.item_id == item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let result = BatchResult::from_items(vec![
            BatchItemResult::success("a", MediaLocator::Url("https://x.test/a.mp3".into())),
            BatchItemResult::failure("b", "boom"),
            BatchItemResult::success("c", MediaLocator::Url("https://x.test/c.mp3".into())),
        ]);

        assert_eq!(result.total_count, 3);
        assert_eq!(result.success_count, 2);
        assert!(!result.is_success());
        assert_eq!(result.failures().count(), 1);
        assert_eq!(result.get("b").unwrap().error_detail.as_deref(), Some("boom"));
    }

    #[test]
    fn test_empty_batch_succeeds() {
        let result = BatchResult::from_items(Vec::new());
        assert_eq!(result.total_count, 0);
        assert!(result.is_success());
    }
}
