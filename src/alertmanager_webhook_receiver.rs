//! The alertmanager webhook endpoint. Every accepted call is rendered and
//! forwarded before the response is sent.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
	body::Bytes,
	extract::{ConnectInfo, State},
	http::StatusCode,
	routing::post,
	Router,
};
use tokio::net::TcpListener;

use crate::{
	alert::AlertBatch, alert_renderer::Renderer, forwarder, matrix::Session, metrics::Metrics,
};

/// shared by all request handlers, never modified after startup
pub struct ReceiverState {
	session: Session,
	renderer: Renderer,
	metrics: Metrics,
}

impl ReceiverState {
	pub fn new(session: Session, renderer: Renderer, metrics: Metrics) -> Self {
		Self { session, renderer, metrics }
	}
}

/// Only POST is routed, other methods are answered with 405 by the router.
pub fn router(state: Arc<ReceiverState>, path: &str) -> Router {
	Router::new().route(path, post(prometheus_receiver)).with_state(state)
}

async fn prometheus_receiver(
	State(state): State<Arc<ReceiverState>>,
	remote: Option<ConnectInfo<SocketAddr>>,
	body: Bytes,
) -> StatusCode {
	let ReceiverState { session, renderer, metrics } = &*state;

	let remote = remote.map_or_else(|| String::from("unknown"), |ConnectInfo(addr)| addr.to_string());

	// decoded regardless of the content type header
	let batch = match serde_json::from_slice::<AlertBatch>(&body) {
		Ok(batch) => batch,
		Err(err) => {
			tracing::debug!("failed to deserialize alert from {remote}: {err:?}");
			metrics.record_webhook("bad_request");
			return StatusCode::BAD_REQUEST;
		}
	};

	tracing::info!(
		"received valid hook from {remote} with {} {} alerts",
		batch.alerts.len(),
		batch.status
	);
	metrics.record_webhook("accepted");

	let messages = renderer.render(&batch);
	let report = forwarder::forward_all(session, &messages, metrics).await;

	if report.failed > 0 {
		tracing::warn!(
			"{} of {} messages from {remote} could not be forwarded",
			report.failed,
			messages.len()
		);
	} else {
		tracing::debug!("forwarded {} messages from {remote}", report.sent);
	}

	StatusCode::OK
}

/// Serves the webhook endpoint on `listener` until ctrl-c is received.
pub async fn run_prometheus_receiver(
	listener: TcpListener,
	state: Arc<ReceiverState>,
	path: &str,
) -> Result<()> {
	let app = router(state, path);

	axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("alertmanager webhook endpoint crashed")?;

	Ok(())
}

async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => tracing::info!("received ctrl-c, shutting down"),
		Err(err) => {
			tracing::error!("can't listen for ctrl-c, running until killed: {err}");
			std::future::pending::<()>().await;
		}
	}
}
