use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use crate::services::handle_resolver::{check_handle, HandleCheck};
use crate::AppState;

#[derive(Deserialize)]
pub struct ValidateQuery {
    #[serde(default)]
    pub username: String,
}

/// Always 200; the page reads `ok`/`reason` from the body.
pub async fn validate_telegram(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ValidateQuery>,
) -> Json<HandleCheck> {
    let check = check_handle(state.handle_resolver.as_ref(), &query.username).await;
    debug!("Handle check for {:?}: ok={} reason={:?}", query.username, check.ok, check.reason);
    Json(check)
}
