//! prometheus alertmanager receiver that forwards alerts into a matrix room
//!
//! Features:
//! - alerts are rendered one by one in a fixed layout or per webhook call with
//!   a configurable jinja2 template
//! - the bot account joins the target room before alerts are accepted
//! - a failing message doesn't stop the other messages of the same call

use std::sync::Arc;

use anyhow::{Context, Result};
use settings::Settings;
use tokio::net::TcpListener;

use crate::{
	alert_renderer::Renderer, alertmanager_webhook_receiver::ReceiverState, metrics::Metrics,
};

mod alert;
mod alert_renderer;
mod alertmanager_webhook_receiver;
mod forwarder;
mod log;
mod matrix;
mod metrics;
mod rendered_message;
mod settings;
mod telemetry_endpoint;

/// exit the complete program if one thread panics
fn setup_panic_handler() {
	let default_panic = std::panic::take_hook();
	std::panic::set_hook(Box::new(move |info| {
		default_panic(info);
		std::process::exit(1);
	}));
}

/// the entry point of the program
#[tokio::main]
pub async fn main() -> Result<()> {
	setup_panic_handler();

	// tracing isn't set up before the settings are loaded, errors are printed by main
	let settings = Settings::load().context("failed to load config and command line arguments")?;

	log::setup_logging(settings.log_level()).context("could not setup logging")?;

	run(settings).await.map_err(|err| {
		tracing::error!("{err:#}");
		err
	})
}

async fn run(settings: Settings) -> Result<()> {
	let renderer =
		Renderer::from_settings(&settings.general).context("invalid general.html_template")?;
	tracing::info!("rendering alerts in {} mode", renderer.mode());

	let metrics = Metrics::new().context("failed to register metrics")?;

	let session = matrix::establish(&settings).await.context("failed to set up matrix session")?;

	let listener = TcpListener::bind((settings.http.address.as_str(), settings.http.port))
		.await
		.context(format!("could not listen on {}:{}", settings.http.address, settings.http.port))?;

	if let Some(telemetry) = &settings.telemetry {
		let addr = telemetry.to_socket_addr();
		let listener = TcpListener::bind(addr)
			.await
			.context(format!("could not listen on {addr} for telemetry"))?;

		tracing::info!("serving metrics on http://{addr}/metrics");

		let metrics = metrics.clone();
		tokio::spawn(async move {
			if let Err(err) = telemetry_endpoint::run_telemetry_endpoint(listener, metrics).await {
				tracing::error!("{err:#}");
			}
		});
	}

	tracing::info!(
		"listening for webhooks on {}{}",
		listener.local_addr().context("listener has no local address")?,
		settings.http.path
	);

	let state = Arc::new(ReceiverState::new(session, renderer, metrics));

	alertmanager_webhook_receiver::run_prometheus_receiver(listener, state, &settings.http.path).await
}
