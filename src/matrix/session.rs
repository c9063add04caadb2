//! Session bootstrap: log in and make sure the account sits in the target room
//! before the webhook endpoint accepts any alerts.

use std::sync::Arc;

use matrix_sdk::ruma::{OwnedRoomId, OwnedUserId, RoomId};
use thiserror::Error;
use url::Url;

use super::{client, ChatClient};
use crate::settings::Settings;

#[derive(Error, Debug)]
pub enum SessionError {
	#[error("could not log in to homeserver {homeserver} as {user_id}")]
	Auth {
		homeserver: Url,
		user_id: OwnedUserId,
		#[source]
		source: anyhow::Error,
	},
	#[error("access token belongs to {actual}, expected {expected}")]
	UserMismatch { expected: OwnedUserId, actual: OwnedUserId },
	#[error("could not fetch joined rooms")]
	RoomList(#[source] anyhow::Error),
	#[error("failed to join {room_id}")]
	RoomAccess {
		room_id: OwnedRoomId,
		#[source]
		source: anyhow::Error,
	},
}

/// Logged in client together with the room alerts are sent to. Built once at
/// startup and only read afterwards.
#[derive(Clone)]
pub struct Session {
	client: Arc<dyn ChatClient>,
	room_id: OwnedRoomId,
}

impl Session {
	/// Joins `room_id` unless the account already is a member.
	pub async fn bootstrap(
		client: Arc<dyn ChatClient>,
		room_id: OwnedRoomId,
	) -> Result<Self, SessionError> {
		let joined_rooms = client.joined_rooms().await.map_err(SessionError::RoomList)?;

		if joined_rooms.contains(&room_id) {
			tracing::info!("already joined {room_id}");
		} else {
			tracing::info!("joining {room_id}");
			client
				.join_room(&room_id)
				.await
				.map_err(|source| SessionError::RoomAccess { room_id: room_id.clone(), source })?;
		}

		Ok(Self { client, room_id })
	}

	pub fn client(&self) -> &dyn ChatClient {
		self.client.as_ref()
	}

	pub fn room_id(&self) -> &RoomId {
		&self.room_id
	}
}

/// Logs in with the configured credentials and joins the configured room.
pub async fn establish(settings: &Settings) -> Result<Session, SessionError> {
	let client = client::login(settings).await?;

	Session::bootstrap(Arc::new(client), settings.matrix.room_id.clone()).await
}
