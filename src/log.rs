use std::str::FromStr;

use anyhow::{Context, Result};
use tracing_subscriber::{
	fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// dependencies which are only interesting when something goes wrong
const NOISY_CRATES: &[&str] = &["matrix_sdk", "hyper", "reqwest", "tower_http"];

/// Installs the global subscriber. `RUST_LOG` directives are applied after the
/// defaults, so they can raise or lower single targets.
pub fn setup_logging(level: &str) -> Result<()> {
	let level = tracing::Level::from_str(level).context(format!("invalid log level {level:?}"))?;

	let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
	let filter_layer = EnvFilter::builder().parse_lossy(directives(level, env.as_deref()));

	tracing_subscriber::registry()
		.with(filter_layer)
		.with(fmt::layer())
		.try_init()
		.context("a global subscriber is already installed")?;

	Ok(())
}

/// Default level and caps for noisy crates, followed by the unmodified
/// `RUST_LOG` value. Later directives for the same target win.
fn directives(level: tracing::Level, env: Option<&str>) -> String {
	let mut directives = vec![level.as_str().to_ascii_lowercase()];
	directives.extend(NOISY_CRATES.iter().map(|target| format!("{target}=warn")));
	directives.extend(env.filter(|env| !env.trim().is_empty()).map(str::to_owned));

	directives.join(",")
}
