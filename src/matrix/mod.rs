//! Everything talking to the homeserver.
//!
//! The rest of the receiver only sees the [ChatClient] trait, the
//! [matrix_sdk] backed implementation lives in [client].

use anyhow::Result;
use async_trait::async_trait;
use matrix_sdk::ruma::{OwnedEventId, OwnedRoomId, RoomId};

use crate::rendered_message::RenderedMessage;

pub mod client;
pub mod session;

#[cfg(test)]
pub mod testing;

pub use self::session::{establish, Session};

/// The homeserver requests the receiver needs. Implementations have to be
/// usable from many request tasks at once.
#[async_trait]
pub trait ChatClient: Send + Sync {
	/// rooms the logged in account is a member of
	async fn joined_rooms(&self) -> Result<Vec<OwnedRoomId>>;

	async fn join_room(&self, room_id: &RoomId) -> Result<()>;

	/// send `message` as m.room.message event
	async fn send_message(&self, room_id: &RoomId, message: &RenderedMessage)
		-> Result<OwnedEventId>;
}
