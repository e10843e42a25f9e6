use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a health payload while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = match state.store().list_codes().await {
        Ok(codes) => codes.len(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            return HealthResponse::degraded(0);
        }
    };

    if let Err(err) = state.store().health_check().await {
        warn!(error = %err, "storage health check failed");
        return HealthResponse::degraded(rooms);
    }

    HealthResponse::ok(rooms)
}
