use std::fmt;

use anyhow::{ensure, Context, Result};
use clap::{Arg, Command};
use config::{Config, Environment, File, FileFormat};
use matrix_sdk::ruma::{OwnedDeviceId, OwnedRoomId, OwnedUserId};
use serde::Deserialize;
use url::Url;

use crate::telemetry_endpoint::TelemetryEndpointSettings;

/// default location of the config file
const DEFAULT_CONFIG_PATH: &str = "/etc/matrix-alertmanager-receiver.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
	pub matrix: MatrixSettings,
	pub user: UserSettings,
	#[serde(default)]
	pub http: HttpSettings,
	#[serde(default)]
	pub general: GeneralSettings,
	#[serde(default)]
	pub telemetry: Option<TelemetryEndpointSettings>,
	/// `--log` from the command line, wins over `general`
	#[serde(skip)]
	pub log_override: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// homeserver and target room
pub struct MatrixSettings {
	pub homeserver: Url,
	pub room_id: OwnedRoomId,
}

#[derive(Debug, Clone, Deserialize)]
/// account the alerts are sent from
pub struct UserSettings {
	pub id: OwnedUserId,
	pub token: AccessToken,
	/// device of the access token, only used to restore the session
	#[serde(default)]
	pub device_id: Option<OwnedDeviceId>,
}

/// access token of the bridge account, never printed
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for AccessToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("AccessToken([redacted])")
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// where the alertmanager webhook is served
pub struct HttpSettings {
	pub address: String,
	pub port: u16,
	pub path: String,
}

impl Default for HttpSettings {
	fn default() -> Self {
		Self { address: String::from("localhost"), port: 9088, path: String::from("/alert") }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
	/// log at debug level
	pub debug: bool,
	pub log_level: String,
	/// tera template rendering a whole batch into one message. Alerts are
	/// rendered one by one in a fixed layout if this isn't set. Tera fails on
	/// labels and annotations which aren't set, so optional ones have to be
	/// written as `{{ alert.labels.x | default(value="") }}`.
	pub html_template: Option<String>,
}

impl Default for GeneralSettings {
	fn default() -> Self {
		Self { debug: false, log_level: String::from("info"), html_template: None }
	}
}

impl Settings {
	/// Parses the command line and loads the config file it points to. The
	/// log level given on the command line overrides the configured one.
	pub fn load() -> Result<Self> {
		let opts = Command::new(clap::crate_name!())
			.version(clap::crate_version!())
			.about(clap::crate_description!())
			.author(clap::crate_authors!())
			.args([
				Arg::new("config")
					.help("path of config file")
					.short('c')
					.long("config")
					.default_value(DEFAULT_CONFIG_PATH),
				Arg::new("level")
					.help("log level")
					.value_parser(["error", "warn", "info", "debug", "trace"])
					.ignore_case(true)
					.long("log"),
			])
			.get_matches();

		let config_path = opts
			.get_one::<String>("config")
			.map_or(DEFAULT_CONFIG_PATH, String::as_str);

		let mut settings = Self::from_file(config_path)
			.context(format!("could not load configuration from {config_path}"))?;

		settings.log_override = opts.get_one::<String>("level").cloned();

		Ok(settings)
	}

	/// Loads settings from a toml file. Values can be overridden through
	/// `RECEIVER_<SECTION>__<KEY>` environment variables, e.g.
	/// `RECEIVER_USER__TOKEN`.
	pub fn from_file(path: &str) -> Result<Self> {
		let conf = Config::builder()
			.add_source(File::new(path, FileFormat::Toml))
			.add_source(Environment::with_prefix("RECEIVER").prefix_separator("_").separator("__"))
			.build()
			.context("can't load config")?;

		Self::from_config(conf)
	}

	/// Loads settings from toml source text.
	#[cfg(test)]
	pub fn from_toml(source: &str) -> Result<Self> {
		let conf = Config::builder()
			.add_source(File::from_str(source, FileFormat::Toml))
			.build()
			.context("can't load config")?;

		Self::from_config(conf)
	}

	fn from_config(conf: Config) -> Result<Self> {
		let settings: Self = conf.try_deserialize().context("invalid config")?;
		settings.validate()?;

		Ok(settings)
	}

	/// checks everything deserializing doesn't already check
	fn validate(&self) -> Result<()> {
		ensure!(
			matches!(self.matrix.homeserver.scheme(), "http" | "https"),
			"matrix.homeserver must be a http(s) url, got {}",
			self.matrix.homeserver
		);
		ensure!(!self.user.token.as_str().is_empty(), "user.token is required");
		ensure!(!self.http.address.is_empty(), "http.address must not be empty");
		ensure!(self.http.path.starts_with('/'), "http.path must start with '/', got {:?}", self.http.path);

		Ok(())
	}

	/// log level: `--log`, then `general.debug`, then `general.log_level`
	pub fn log_level(&self) -> &str {
		match &self.log_override {
			Some(level) => level.as_str(),
			None if self.general.debug => "debug",
			None => self.general.log_level.as_str(),
		}
	}
}
