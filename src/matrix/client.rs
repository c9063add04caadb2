//! [ChatClient] implementation on top of [matrix_sdk::Client]

use anyhow::Result;
use async_trait::async_trait;
use matrix_sdk::{
	config::RequestConfig,
	matrix_auth::{MatrixSession, MatrixSessionTokens},
	ruma::{
		api::client::{account::whoami, membership::joined_rooms, message::send_message_event},
		device_id,
		events::room::message::RoomMessageEventContent,
		OwnedEventId, OwnedRoomId, RoomId, TransactionId,
	},
	Client, SessionMeta,
};

use super::{session::SessionError, ChatClient};
use crate::{rendered_message::RenderedMessage, settings::Settings};

/// client wrapper used by the receiver
#[derive(Debug, Clone)]
pub struct MatrixClient {
	client: Client,
}

/// Restores a session from the configured access token and checks it with a
/// whoami request. The token has to belong to the configured user.
pub async fn login(settings: &Settings) -> Result<MatrixClient, SessionError> {
	let homeserver = &settings.matrix.homeserver;
	let user_id = &settings.user.id;

	let auth_error = |source: anyhow::Error| SessionError::Auth {
		homeserver: homeserver.clone(),
		user_id: user_id.clone(),
		source,
	};

	tracing::info!("connecting to homeserver {homeserver} as {user_id}");

	let client = Client::builder()
		.homeserver_url(homeserver)
		.request_config(RequestConfig::new().disable_retry())
		.build()
		.await
		.map_err(|err| auth_error(err.into()))?;

	let device_id = settings
		.user
		.device_id
		.clone()
		.unwrap_or_else(|| device_id!("ALERTRECEIVER").to_owned());

	let session = MatrixSession {
		meta: SessionMeta { user_id: user_id.clone(), device_id },
		tokens: MatrixSessionTokens {
			access_token: settings.user.token.as_str().to_owned(),
			refresh_token: None,
		},
	};

	client.matrix_auth().restore_session(session).await.map_err(|err| auth_error(err.into()))?;

	let whoami = client
		.send(whoami::v3::Request::new(), None)
		.await
		.map_err(|err| auth_error(err.into()))?;

	if &whoami.user_id != user_id {
		return Err(SessionError::UserMismatch {
			expected: user_id.clone(),
			actual: whoami.user_id,
		});
	}

	tracing::info!("logged in as {}", whoami.user_id);

	Ok(MatrixClient { client })
}

#[async_trait]
impl ChatClient for MatrixClient {
	async fn joined_rooms(&self) -> Result<Vec<OwnedRoomId>> {
		let response = self.client.send(joined_rooms::v3::Request::new(), None).await?;

		Ok(response.joined_rooms)
	}

	async fn join_room(&self, room_id: &RoomId) -> Result<()> {
		self.client.join_room_by_id(room_id).await?;

		Ok(())
	}

	async fn send_message(
		&self,
		room_id: &RoomId,
		message: &RenderedMessage,
	) -> Result<OwnedEventId> {
		let content = RoomMessageEventContent::from(message);
		let request =
			send_message_event::v3::Request::new(room_id.to_owned(), TransactionId::new(), &content)?;

		let response = self.client.send(request, None).await?;

		Ok(response.event_id)
	}
}

#[cfg(test)]
mod tests {
	use axum::{http::StatusCode, routing::get, Json, Router};
	use serde_json::{json, Value};
	use tokio::net::TcpListener;

	use super::*;

	/// Serves the two endpoints a login needs, whoami answers with `whoami`.
	/// Returns the homeserver url.
	async fn homeserver(whoami: (StatusCode, Value)) -> String {
		let app = Router::new()
			.route(
				"/_matrix/client/versions",
				get(|| async { Json(json!({ "versions": ["v1.1", "v1.2", "v1.3", "v1.4", "v1.5"] })) }),
			)
			.route(
				"/_matrix/client/v3/account/whoami",
				get(move || {
					let (status, body) = whoami.clone();
					async move { (status, Json(body)) }
				}),
			);

		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

		format!("http://{addr}")
	}

	fn settings(homeserver: &str) -> Settings {
		Settings::from_toml(&format!(
			r#"
			[matrix]
			homeserver = "{homeserver}"
			room_id = "!alerts:example.org"

			[user]
			id = "@alertbot:example.org"
			token = "syt_secret"
			"#
		))
		.unwrap()
	}

	#[tokio::test]
	async fn token_of_configured_user_logs_in() {
		let homeserver =
			homeserver((StatusCode::OK, json!({ "user_id": "@alertbot:example.org" }))).await;

		assert!(login(&settings(&homeserver)).await.is_ok());
	}

	#[tokio::test]
	async fn token_of_other_user_is_rejected() {
		let homeserver =
			homeserver((StatusCode::OK, json!({ "user_id": "@intruder:example.org" }))).await;

		let err = login(&settings(&homeserver)).await.unwrap_err();

		match err {
			SessionError::UserMismatch { expected, actual } => {
				assert_eq!(expected.as_str(), "@alertbot:example.org");
				assert_eq!(actual.as_str(), "@intruder:example.org");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn unknown_token_is_an_auth_error() {
		let homeserver = homeserver((
			StatusCode::UNAUTHORIZED,
			json!({ "errcode": "M_UNKNOWN_TOKEN", "error": "Invalid access token passed." }),
		))
		.await;

		let err = login(&settings(&homeserver)).await.unwrap_err();

		assert!(matches!(err, SessionError::Auth { .. }), "unexpected error: {err:?}");
	}
}
