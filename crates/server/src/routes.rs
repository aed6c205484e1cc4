use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bombwire_core::{bomb_planted, BOMB_PLANTED_LINE};
use bombwire_serial::SerialLink;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub serial: SerialLink,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Game client posts every state update here
        .route("/", post(gsi_webhook))
        .route("/healthz", get(healthz))
        .route("/version", get(version))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn gsi_webhook(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    state.metrics.webhooks_received.inc();
    tracing::debug!("GSI payload:\n{:#}", payload);

    let planted = match bomb_planted(&payload) {
        Ok(planted) => planted,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed GSI payload");
            return (StatusCode::INTERNAL_SERVER_ERROR, "malformed payload").into_response();
        }
    };

    if planted {
        tracing::info!(port = %state.serial.label(), "Bomb planted, notifying device");
        if let Err(e) = state.serial.write_line(BOMB_PLANTED_LINE).await {
            state.metrics.serial_write_failures.inc();
            tracing::error!(error = %e, "Serial write failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "serial write failed").into_response();
        }
        state.metrics.bomb_planted.inc();
    }

    (StatusCode::OK, "OK").into_response()
}

async fn healthz() -> &'static str { "ok" }

async fn version() -> Json<Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok((content_type, body)) => ([(CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            tracing::warn!(?e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};

    use axum::body::Body;
    use axum::http::Request;
    use tokio::io::AsyncWrite;
    use tower::ServiceExt;

    /// Captures everything written to the fake serial device.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<u8>>>);

    impl Recorder {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl AsyncWrite for Recorder {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct Unplugged;

    impl AsyncWrite for Unplugged {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::NotConnected, "no device")))
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn state_with(serial: SerialLink) -> AppState {
        AppState { serial, metrics: Metrics::new().unwrap() }
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn planted_bomb_writes_line_once() {
        let rec = Recorder::default();
        let state = state_with(SerialLink::from_writer(rec.clone()));
        let resp = router(state.clone())
            .oneshot(post_json(r#"{"added": {"round": {"bomb": true}}}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "OK");
        assert_eq!(rec.contents(), "bombe_plantee\n");
        assert_eq!(state.metrics.bomb_planted.get(), 1);
    }

    #[tokio::test]
    async fn other_updates_are_acknowledged_without_writing() {
        let rec = Recorder::default();
        let state = state_with(SerialLink::from_writer(rec.clone()));
        let bodies = [
            r#"{}"#,
            r#"{"round": {"phase": "live"}}"#,
            r#"{"added": {"round": {"bomb": false}}}"#,
            r#"{"added": {"player": {"match_stats": true}}}"#,
        ];
        for body in bodies {
            let resp = router(state.clone()).oneshot(post_json(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "body: {body}");
            assert_eq!(body_text(resp).await, "OK");
        }

        assert_eq!(rec.contents(), "");
        assert_eq!(state.metrics.webhooks_received.get(), 4);
        assert_eq!(state.metrics.bomb_planted.get(), 0);
    }

    #[tokio::test]
    async fn each_plant_is_forwarded() {
        let rec = Recorder::default();
        let state = state_with(SerialLink::from_writer(rec.clone()));
        for _ in 0..2 {
            let resp = router(state.clone())
                .oneshot(post_json(r#"{"added": {"round": {"bomb": "planted"}}}"#))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        assert_eq!(rec.contents(), "bombe_plantee\nbombe_plantee\n");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_without_writing() {
        let rec = Recorder::default();
        let state = state_with(SerialLink::from_writer(rec.clone()));
        let resp = router(state.clone()).oneshot(post_json(r#"{"added": "#)).await.unwrap();

        assert!(resp.status().is_client_error());
        assert_eq!(rec.contents(), "");
        assert_eq!(state.metrics.webhooks_received.get(), 0);
    }

    #[tokio::test]
    async fn missing_content_type_is_rejected() {
        let state = state_with(SerialLink::from_writer(Recorder::default()));
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"added": {"round": {"bomb": true}}}"#))
            .unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn wrong_shaped_payloads_fail_without_writing() {
        let rec = Recorder::default();
        let state = state_with(SerialLink::from_writer(rec.clone()));
        let bodies = [
            "null",
            "[1,2]",
            r#"{"added": null}"#,
            r#"{"added": {"round": 5}}"#,
        ];
        for body in bodies {
            let resp = router(state.clone()).oneshot(post_json(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "body: {body}");
        }

        assert_eq!(rec.contents(), "");
        assert_eq!(state.metrics.bomb_planted.get(), 0);
    }

    #[tokio::test]
    async fn serial_failure_is_a_server_error() {
        let state = state_with(SerialLink::from_writer(Unplugged));
        let resp = router(state.clone())
            .oneshot(post_json(r#"{"added": {"round": {"bomb": true}}}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.metrics.serial_write_failures.get(), 1);
        assert_eq!(state.metrics.bomb_planted.get(), 0);
    }

    #[tokio::test]
    async fn serial_failure_does_not_affect_quiet_updates() {
        let state = state_with(SerialLink::from_writer(Unplugged));
        let resp = router(state).oneshot(post_json(r#"{"round": {"phase": "over"}}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_on_root_is_not_allowed() {
        let state = state_with(SerialLink::from_writer(Recorder::default()));
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn healthz_and_version() {
        let state = state_with(SerialLink::from_writer(Recorder::default()));

        let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let resp = router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(body_text(resp).await, "ok");

        let req = Request::builder().uri("/version").body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        let v: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(v["name"], "bombwire-server");
    }

    #[tokio::test]
    async fn metrics_reflect_forwarded_plants() {
        let state = state_with(SerialLink::from_writer(Recorder::default()));
        router(state.clone())
            .oneshot(post_json(r#"{"added": {"round": {"bomb": true}}}"#))
            .await
            .unwrap();

        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("bombwire_bomb_planted_total 1"));
        assert!(text.contains("bombwire_webhooks_received_total 1"));
    }
}
