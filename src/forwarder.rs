//! Sends rendered messages into the room. Delivery is best effort: every
//! message is tried exactly once and a failure never stops the rest of the
//! batch.

use matrix_sdk::ruma::{OwnedEventId, OwnedRoomId};
use thiserror::Error;

use crate::{matrix::Session, metrics::Metrics, rendered_message::RenderedMessage};

/// how much of a message is put into log lines
const LOG_PREVIEW_LEN: usize = 200;

#[derive(Error, Debug)]
#[error("could not forward message to {room_id}")]
pub struct DeliveryError {
	room_id: OwnedRoomId,
	#[source]
	source: anyhow::Error,
}

/// outcome of forwarding the messages of one webhook call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ForwardReport {
	pub sent: usize,
	pub failed: usize,
}

/// Sends a single message into the session's room.
pub async fn forward(
	session: &Session,
	message: &RenderedMessage,
) -> Result<OwnedEventId, DeliveryError> {
	session
		.client()
		.send_message(session.room_id(), message)
		.await
		.map_err(|source| DeliveryError { room_id: session.room_id().to_owned(), source })
}

/// Sends all messages in order, failures are logged and counted.
pub async fn forward_all(
	session: &Session,
	messages: &[RenderedMessage],
	metrics: &Metrics,
) -> ForwardReport {
	let mut report = ForwardReport::default();

	for message in messages {
		tracing::info!("> {}", message.plain());

		match forward(session, message).await {
			Ok(event_id) => {
				tracing::debug!("sent {event_id} to {}", session.room_id());
				metrics.record_forwarded();
				report.sent += 1;
			}
			Err(err) => {
				tracing::error!(
					">> {err}: {:#}, message: {:?}",
					err.source,
					message.preview(LOG_PREVIEW_LEN)
				);
				metrics.record_failed();
				report.failed += 1;
			}
		}
	}

	report
}
