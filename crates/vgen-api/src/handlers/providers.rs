//! Provider listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use vgen_providers::ProviderDescriptor;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderDescriptor>,
}

/// List registered providers without instantiating them.
pub async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: state.runner.registry().descriptors(),
    })
}
