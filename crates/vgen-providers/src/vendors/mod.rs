//! Vendor adapters.

mod fal;
mod openai_tts;
mod replicate;

pub use fal::{map_fal_status, FalProvider};
pub use openai_tts::OpenAiTtsProvider;
pub use replicate::{extract_progress, map_replicate_status, ReplicateProvider};
