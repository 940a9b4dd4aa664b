//! Status API
//!
//! Read-only HTTP view of the poller. Nothing here can trigger an update.

use crate::{poller::StatusHandle, types::CycleReport};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub status: StatusHandle,
    pub networks: Vec<String>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/status", get(last_cycle))
        .with_state(state)
}

/// GET /api/v1/health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let last_cycle_at = state.status.read().await.as_ref().map(|r| r.finished_at);

    Json(HealthResponse {
        success: true,
        networks: state.networks.clone(),
        last_cycle_at,
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// GET /api/v1/status
///
/// Report of the most recent finished poll cycle.
async fn last_cycle(State(state): State<AppState>) -> Response {
    match state.status.read().await.clone() {
        Some(report) => Json(StatusResponse {
            success: true,
            data: report,
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": "No poll cycle has completed yet",
            })),
        )
            .into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub networks: Vec<String>,
    pub last_cycle_at: Option<i64>,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub data: CycleReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::types::{Outcome, PriceObservation, TargetReport, TxHandle};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    fn state(report: Option<CycleReport>) -> AppState {
        AppState {
            status: Arc::new(RwLock::new(report)),
            networks: vec!["devnet".to_string(), "testnet".to_string()],
        }
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_before_first_cycle() {
        let (status, body) = get_json(create_router(state(None)), "/api/v1/status").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_status_reports_outcomes() {
        let report = CycleReport {
            observation: PriceObservation {
                usd_price: dec!(300),
                observed_at: 1_700_000_000,
            },
            broadcast: true,
            targets: vec![
                TargetReport {
                    target: "devnet".to_string(),
                    outcome: Outcome::Updated(TxHandle("5sig".to_string())),
                },
                TargetReport {
                    target: "testnet".to_string(),
                    outcome: Outcome::Failed(SyncError::Unauthorized),
                },
            ],
            finished_at: 1_700_000_005,
        };

        let (status, body) = get_json(create_router(state(Some(report))), "/api/v1/status").await;

        assert_eq!(status, StatusCode::OK);
        let targets = &body["data"]["targets"];
        assert_eq!(targets[0]["outcome"]["status"], "updated");
        assert_eq!(targets[0]["outcome"]["detail"], "5sig");
        assert_eq!(targets[1]["outcome"]["status"], "failed");
        assert_eq!(targets[1]["outcome"]["detail"], "Signer is not the registry owner");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(create_router(state(None)), "/api/v1/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["networks"][1], "testnet");
        assert!(body["last_cycle_at"].is_null());
    }
}
