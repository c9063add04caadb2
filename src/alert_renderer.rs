//! Renders alert batches into room messages.
//!
//! Alerts are received from the
//! [webhook endpoint](crate::alertmanager_webhook_receiver), the rendered
//! messages are handed to the [forwarder](crate::forwarder).
//!
//! There are two modes. Without a configured template every alert becomes its
//! own message in a fixed layout. With `general.html_template` set the whole
//! batch is rendered once through that tera template.

use std::error::Error as StdError;

use tera::Tera;
use thiserror::Error;

use crate::{
	alert::{Alert, AlertBatch, AlertStatus},
	rendered_message::RenderedMessage,
	settings::GeneralSettings,
};

/// name the configured template is registered under, the `.html` suffix
/// enables tera's autoescaping
const TEMPLATE_NAME: &str = "alert.html";

#[derive(Error, Debug)]
pub enum TemplateError {
	#[error("failed to compile template: {}", error_chain(.0))]
	Compile(tera::Error),
}

/// A template which was successfully parsed at startup.
#[derive(Debug)]
pub struct AlertTemplate {
	tera: Tera,
}

impl AlertTemplate {
	/// Parses `source` without executing it.
	pub fn compile(source: &str) -> Result<Self, TemplateError> {
		let mut tera = Tera::default();
		tera.add_raw_template(TEMPLATE_NAME, source).map_err(TemplateError::Compile)?;

		Ok(Self { tera })
	}

	/// Renders the whole batch into a single message. The batch is the
	/// template context, so templates see `status`, `alerts`, `commonLabels`
	/// and the other webhook fields under their alertmanager names.
	///
	/// A template which parsed but fails while executing yields an error
	/// notice instead of the alert, so the batch still shows up in the room.
	/// Tera treats a lookup of a missing label or annotation as such a failure,
	/// optional values need `| default(value="")`.
	pub fn render(&self, batch: &AlertBatch) -> RenderedMessage {
		let rendered = tera::Context::from_serialize(batch)
			.and_then(|context| self.tera.render(TEMPLATE_NAME, &context));

		match rendered {
			Ok(html) => RenderedMessage::from_html(html),
			Err(err) => {
				let err = error_chain(&err);
				tracing::error!("failed to render alert batch from {}: {err}", batch.receiver);

				RenderedMessage::from_html(format!(
					"<strong><font color=\"#ff0000\">failed to render alert:</font></strong>\n<br>\n<code>{}</code>",
					tera::escape_html(&err)
				))
			}
		}
	}
}

/// Alert renderer
#[derive(Debug)]
pub enum Renderer {
	/// one message per alert
	FixedFormat,
	/// one message per batch
	Template(AlertTemplate),
}

impl Renderer {
	/// Chooses the rendering mode. A configured template is compiled here so
	/// a broken template stops the process before the webhook listener starts.
	pub fn from_settings(settings: &GeneralSettings) -> Result<Self, TemplateError> {
		match settings.html_template.as_deref() {
			Some(source) => Ok(Self::Template(AlertTemplate::compile(source)?)),
			None => Ok(Self::FixedFormat),
		}
	}

	pub fn mode(&self) -> &'static str {
		match self {
			Self::FixedFormat => "fixed format",
			Self::Template(_) => "template",
		}
	}

	/// Renders a batch into the messages to forward, in order.
	pub fn render(&self, batch: &AlertBatch) -> Vec<RenderedMessage> {
		match self {
			Self::FixedFormat => batch.alerts.iter().map(render_alert).collect(),
			Self::Template(template) => vec![template.render(batch)],
		}
	}
}

/// fixed layout: `<status> <name label> >> <summary annotation>`
pub fn render_alert(alert: &Alert) -> RenderedMessage {
	let prefix = match &alert.status {
		AlertStatus::Firing => "<strong><font color=\"#ff0000\">FIRING</font></strong>".to_owned(),
		AlertStatus::Resolved => {
			"<strong><font color=\"#33cc33\">RESOLVED</font></strong>".to_owned()
		}
		AlertStatus::Other(status) => format!("<strong>{}</strong>", tera::escape_html(status)),
	};

	RenderedMessage::from_html(format!(
		"{prefix} {} &gt;&gt; {}",
		tera::escape_html(alert.label("name")),
		tera::escape_html(alert.annotation("summary")),
	))
}

/// error message followed by all of its causes
fn error_chain(err: &(dyn StdError + 'static)) -> String {
	let mut out = err.to_string();
	let mut source = err.source();

	while let Some(cause) = source {
		out.push_str(": ");
		out.push_str(&cause.to_string());
		source = cause.source();
	}

	out
}
