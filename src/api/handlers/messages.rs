use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::Result;
use crate::protocol::{MessageChannel, Reply, Request};

use super::super::state::AppState;

/// Message contract used by the page recorder
pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<Request>,
) -> Result<Json<Reply>> {
    tracing::debug!("Message: {:?}", request);
    let reply = state.coordinator.send(request).await?;
    Ok(Json(reply))
}
