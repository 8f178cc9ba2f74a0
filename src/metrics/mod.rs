//! Prometheus metrics for blog-service.
//!
//! Exposes page cache and content collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

lazy_static! {
    /// Page cache events (hit/miss/store/error).
    pub static ref PAGE_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "page_cache_events_total",
        "Full-page cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register page_cache_events_total");

    pub static ref POSTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "posts_created_total",
        "Posts published through the create form"
    )
    .expect("failed to register posts_created_total");

    pub static ref COMMENTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "comments_created_total",
        "Comments accepted under posts"
    )
    .expect("failed to register comments_created_total");

    /// Follow actions (follow/unfollow/ignored).
    pub static ref FOLLOW_EVENTS: IntCounterVec = register_int_counter_vec!(
        "follow_events_total",
        "Follow graph changes segmented by action",
        &["action"]
    )
    .expect("failed to register follow_events_total");
}

pub fn record_cache_event(event: &str) {
    PAGE_CACHE_EVENTS.with_label_values(&[event]).inc();
}

pub fn record_follow_event(action: &str) {
    FOLLOW_EVENTS.with_label_values(&[action]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_counter_is_labelled_by_action() {
        let before = FOLLOW_EVENTS.with_label_values(&["ignored"]).get();
        record_follow_event("ignored");
        assert!(FOLLOW_EVENTS.with_label_values(&["ignored"]).get() > before);
    }
}
