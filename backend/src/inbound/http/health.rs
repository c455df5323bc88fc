//! Health endpoints: liveness and readiness probes for orchestration.
//!
//! Readiness follows the ingestion pipeline: the service only accepts traffic
//! while the pipeline is running.

use actix_web::{HttpResponse, get, http::header, web};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::domain::ingestion::PipelineState;

/// Shared health state for readiness and liveness checks.
pub struct HealthState {
    pipeline: watch::Receiver<PipelineState>,
    live: AtomicBool,
}

impl HealthState {
    /// Track readiness through the pipeline's state channel. Starts live.
    pub fn new(pipeline: watch::Receiver<PipelineState>) -> Self {
        Self {
            pipeline,
            live: AtomicBool::new(true),
        }
    }

    /// Flag the service as unhealthy so liveness checks fail fast during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Ready only while the pipeline is [`PipelineState::Running`].
    pub fn is_ready(&self) -> bool {
        *self.pipeline.borrow() == PipelineState::Running
    }

    /// Return liveness state. When false, liveness probes emit 503.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };

        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Readiness probe. 200 while the pipeline runs, 503 otherwise.
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe. 200 while the process is marked alive and 503 once draining.
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test as actix_test};
    use rstest::rstest;

    async fn probe(state: web::Data<HealthState>, uri: &str) -> (StatusCode, Option<String>) {
        let app = actix_test::init_service(
            App::new().app_data(state).service(ready).service(live),
        )
        .await;
        let response =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
                .await;
        let cache = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        (response.status(), cache)
    }

    #[rstest]
    #[case(PipelineState::Init, StatusCode::SERVICE_UNAVAILABLE)]
    #[case(PipelineState::Running, StatusCode::OK)]
    #[case(PipelineState::Draining, StatusCode::SERVICE_UNAVAILABLE)]
    #[case(PipelineState::Stopped, StatusCode::SERVICE_UNAVAILABLE)]
    #[actix_rt::test]
    async fn readiness_follows_pipeline_state(
        #[case] pipeline: PipelineState,
        #[case] expected: StatusCode,
    ) {
        let (_tx, rx) = watch::channel(pipeline);
        let (status, cache) = probe(web::Data::new(HealthState::new(rx)), "/health/ready").await;
        assert_eq!(status, expected);
        assert_eq!(cache.as_deref(), Some("no-store"));
    }

    #[actix_rt::test]
    async fn readiness_tracks_transitions() {
        let (tx, rx) = watch::channel(PipelineState::Init);
        let state = web::Data::new(HealthState::new(rx));
        assert!(!state.is_ready());
        tx.send_replace(PipelineState::Running);
        assert!(state.is_ready());
        tx.send_replace(PipelineState::Draining);
        assert!(!state.is_ready());
    }

    #[actix_rt::test]
    async fn liveness_fails_after_mark_unhealthy() {
        let (_tx, rx) = watch::channel(PipelineState::Running);
        let state = web::Data::new(HealthState::new(rx));
        let (status, _) = probe(state.clone(), "/health/live").await;
        assert_eq!(status, StatusCode::OK);

        state.mark_unhealthy();
        let (status, _) = probe(state, "/health/live").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
