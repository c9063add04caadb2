//! data structures for deserializing incoming alerts
//!
//! See <https://prometheus.io/docs/alerting/latest/configuration/#webhook_config>
use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// status of a single alert or of a whole batch
///
/// alertmanager only ever sends `firing` and `resolved`, anything else is kept
/// verbatim so it can still be shown in the room
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum AlertStatus {
	Firing,
	Resolved,
	Other(String),
}

impl AlertStatus {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Firing => "firing",
			Self::Resolved => "resolved",
			Self::Other(status) => status.as_str(),
		}
	}
}

impl From<String> for AlertStatus {
	fn from(status: String) -> Self {
		match status.as_str() {
			"firing" => Self::Firing,
			"resolved" => Self::Resolved,
			_ => Self::Other(status),
		}
	}
}

impl From<AlertStatus> for String {
	fn from(status: AlertStatus) -> Self {
		match status {
			AlertStatus::Other(status) => status,
			status => status.as_str().to_owned(),
		}
	}
}

impl fmt::Display for AlertStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// payload of one alertmanager webhook call
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::missing_docs_in_private_items)]
pub struct AlertBatch {
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub group_key: String,
	#[serde(default)]
	pub truncated_alerts: u64,
	#[serde(default)]
	pub receiver: String,
	pub status: AlertStatus,
	pub alerts: Vec<Alert>,
	#[serde(default)]
	pub group_labels: BTreeMap<String, String>,
	#[serde(default)]
	pub common_labels: BTreeMap<String, String>,
	#[serde(default)]
	pub common_annotations: BTreeMap<String, String>,
	#[serde(default, rename = "externalURL")]
	pub external_url: String,
}

/// a single alert of an [AlertBatch]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::missing_docs_in_private_items)]
pub struct Alert {
	pub status: AlertStatus,
	#[serde(default)]
	pub labels: BTreeMap<String, String>,
	#[serde(default)]
	pub annotations: BTreeMap<String, String>,
	#[serde(default)]
	pub starts_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub ends_at: Option<DateTime<Utc>>,
	#[serde(default, rename = "generatorURL")]
	pub generator_url: String,
	#[serde(default)]
	pub fingerprint: String,
}

impl Alert {
	/// label value or an empty string if the label isn't set
	pub fn label(&self, name: &str) -> &str {
		self.labels.get(name).map_or("", String::as_str)
	}

	/// annotation value or an empty string if the annotation isn't set
	pub fn annotation(&self, name: &str) -> &str {
		self.annotations.get(name).map_or("", String::as_str)
	}
}
