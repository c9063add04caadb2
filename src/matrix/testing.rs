//! recording [ChatClient] for tests

use std::{collections::HashSet, sync::Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use matrix_sdk::ruma::{OwnedEventId, OwnedRoomId, RoomId};

use super::ChatClient;
use crate::rendered_message::RenderedMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	JoinedRooms,
	Join(OwnedRoomId),
	Send(OwnedRoomId, RenderedMessage),
}

#[derive(Debug, Default)]
pub struct FakeClient {
	pub joined: Vec<OwnedRoomId>,
	pub fail_joined_rooms: bool,
	pub fail_join: bool,
	/// 1-based numbers of the send calls which fail
	pub failing_sends: HashSet<usize>,
	pub(crate) calls: Mutex<Vec<Call>>,
}

impl FakeClient {
	pub fn joined_to(rooms: &[&RoomId]) -> Self {
		Self { joined: rooms.iter().map(|room| (*room).to_owned()).collect(), ..Self::default() }
	}

	pub fn failing_sends(sends: &[usize]) -> Self {
		Self { failing_sends: sends.iter().copied().collect(), ..Self::default() }
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().unwrap().clone()
	}

	/// messages of all send attempts, failed ones included
	pub fn sent(&self) -> Vec<RenderedMessage> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Send(_, message) => Some(message),
				_ => None,
			})
			.collect()
	}

	fn record(&self, call: Call) -> usize {
		let mut calls = self.calls.lock().unwrap();
		calls.push(call);
		calls.iter().filter(|call| matches!(call, Call::Send(..))).count()
	}
}

#[async_trait]
impl ChatClient for FakeClient {
	async fn joined_rooms(&self) -> Result<Vec<OwnedRoomId>> {
		self.record(Call::JoinedRooms);

		if self.fail_joined_rooms {
			bail!("M_UNKNOWN_TOKEN");
		}

		Ok(self.joined.clone())
	}

	async fn join_room(&self, room_id: &RoomId) -> Result<()> {
		self.record(Call::Join(room_id.to_owned()));

		if self.fail_join {
			bail!("M_FORBIDDEN: you are not invited to this room");
		}

		Ok(())
	}

	async fn send_message(
		&self,
		room_id: &RoomId,
		message: &RenderedMessage,
	) -> Result<OwnedEventId> {
		let attempt = self.record(Call::Send(room_id.to_owned(), message.clone()));

		if self.failing_sends.contains(&attempt) {
			bail!("M_LIMIT_EXCEEDED");
		}

		Ok(OwnedEventId::try_from(format!("$event{attempt}"))?)
	}
}
