use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;

use crate::app_state::AppState;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    latency_ms: u64,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    version: &'static str,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

/// Readiness: the repository answers a round trip.
///
/// Returns `503 Service Unavailable` when storage is unreachable.
pub async fn readiness_check(state: web::Data<AppState>) -> impl Responder {
    let mut checks = HashMap::new();

    let start = std::time::Instant::now();
    let storage = match state.repo.ping().await {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "storage reachable".to_string(),
            latency_ms: start.elapsed().as_millis() as u64,
        },
        Err(e) => {
            tracing::warn!("readiness check failed: {}", e);
            ComponentCheck {
                status: ComponentStatus::Unhealthy,
                message: format!("storage unreachable: {}", e),
                latency_ms: start.elapsed().as_millis() as u64,
            }
        }
    };
    let status = storage.status;
    checks.insert("storage".to_string(), storage);

    let ready = status == ComponentStatus::Healthy;
    let response = ReadinessResponse {
        ready,
        status,
        version: env!("CARGO_PKG_VERSION"),
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
