//! Here we expose prometheus metrics about the receiver
use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use axum::{
	extract::State,
	http::{header::CONTENT_TYPE, StatusCode},
	response::{IntoResponse, Response},
	routing::get,
	Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::metrics::Metrics;

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryEndpointSettings {
	pub address: IpAddr,
	pub port: u16,
}

impl TelemetryEndpointSettings {
	pub fn to_socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.address, self.port)
	}
}

async fn metrics_handler(State(metrics): State<Metrics>) -> Response {
	let mut buffer = vec![];
	let encoder = TextEncoder::new();
	let metric_families = metrics.registry().gather();

	match encoder.encode(&metric_families, &mut buffer) {
		Ok(()) => ([(CONTENT_TYPE, encoder.format_type().to_owned())], buffer).into_response(),
		Err(err) => {
			tracing::error!("failed to encode metrics: {err}");
			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		}
	}
}

pub fn router(metrics: Metrics) -> Router {
	Router::new().route("/metrics", get(metrics_handler)).with_state(metrics)
}

pub async fn run_telemetry_endpoint(listener: TcpListener, metrics: Metrics) -> Result<()> {
	axum::serve(listener, router(metrics)).await.context("telemetry endpoint crashed")?;

	Ok(())
}
