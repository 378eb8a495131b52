//! # Game Client Library
//!
//! Headless client for the paddle game server. It speaks the JSON wire protocol
//! over WebSocket: join with `READY`, receive an `INIT` carrying the assigned
//! player id, then report paddle positions while the server streams `UPDATE`
//! snapshots.
//!
//! Reading from the socket also answers the server's liveness pings, so a
//! client must keep calling [`GameClient::next_message`] to stay connected.
//!
//! ```rust,no_run
//! use client::GameClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), client::ClientError> {
//!     let mut client = GameClient::connect("ws://127.0.0.1:8080").await?;
//!     let (player, game) = client.ready().await?;
//!     println!("Joined as player {} with {} players", player, game.players.len());
//!
//!     client.send_position(120).await?;
//!     while let Some(message) = client.next_message().await? {
//!         println!("{:?}", message.game());
//!     }
//!     Ok(())
//! }
//! ```

use futures_util::{SinkExt, StreamExt};
use log::debug;
use shared::{
    decode_server_message, encode_client_message, ClientMessage, GameSnapshot, PlayerId,
    ProtocolError, ServerMessage,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("server rejected the connection: {0}")]
    Rejected(String),
    #[error("server closed the connection")]
    Disconnected,
}

pub struct GameClient<S = MaybeTlsStream<TcpStream>> {
    socket: WebSocketStream<S>,
    player_id: Option<PlayerId>,
}

impl GameClient {
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (socket, _response) = tokio_tungstenite::connect_async(url).await?;
        debug!("Connected to {}", url);
        Ok(Self::from_stream(socket))
    }
}

impl<S> GameClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn from_stream(socket: WebSocketStream<S>) -> Self {
        Self {
            socket,
            player_id: None,
        }
    }

    /// Player id assigned by the last successful [`ready`](GameClient::ready).
    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    /// Asks to join the game and waits for the `INIT` reply.
    ///
    /// A close frame from the server surfaces as [`ClientError::Rejected`].
    pub async fn ready(&mut self) -> Result<(PlayerId, GameSnapshot), ClientError> {
        self.send(&ClientMessage::Ready).await?;

        loop {
            match self.next_message().await? {
                Some(ServerMessage::Init { game, my_player_id }) => {
                    self.player_id = Some(my_player_id);
                    return Ok((my_player_id, game));
                }
                Some(ServerMessage::Update { .. }) => continue,
                None => return Err(ClientError::Disconnected),
            }
        }
    }

    pub async fn send_position(&mut self, y: i32) -> Result<(), ClientError> {
        self.send(&ClientMessage::UpdatePosition { y }).await
    }

    /// Waits for the next game message, skipping control frames.
    ///
    /// Returns `None` once the server has closed the connection normally.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        while let Some(frame) = self.socket.next().await {
            match frame? {
                Message::Text(text) => return Ok(Some(decode_server_message(text.as_bytes())?)),
                Message::Binary(bytes) => return Ok(Some(decode_server_message(&bytes)?)),
                Message::Close(Some(frame)) if frame.code != CloseCode::Normal => {
                    return Err(ClientError::Rejected(frame.reason.into_owned()));
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    /// Starts the closing handshake.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        let text = encode_client_message(message)?;
        self.socket.send(Message::Text(text)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PlayerSnapshot;
    use tokio::io::{duplex, DuplexStream};
    use tokio_test::assert_ok;
    use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Role};

    async fn pair() -> (GameClient<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client_io, server_io) = duplex(1 << 16);
        let (client, server) = tokio::join!(
            WebSocketStream::from_raw_socket(client_io, Role::Client, None),
            WebSocketStream::from_raw_socket(server_io, Role::Server, None),
        );
        (GameClient::from_stream(client), server)
    }

    fn game() -> GameSnapshot {
        GameSnapshot {
            width: 800,
            height: 600,
            players: vec![PlayerSnapshot { id: 1, y: 10 }],
        }
    }

    async fn reply(server: &mut WebSocketStream<DuplexStream>, message: &ServerMessage) {
        let text = shared::encode_server_message(message).unwrap();
        server.send(Message::Text(text)).await.unwrap();
    }

    #[tokio::test]
    async fn test_ready_skips_updates_until_init() {
        let (mut client, mut server) = pair().await;

        let fake_server = async move {
            let request = server.next().await.unwrap().unwrap();
            assert_eq!(request, Message::Text(r#"{"Type":"READY"}"#.into()));

            reply(&mut server, &ServerMessage::Update { game: game() }).await;
            reply(
                &mut server,
                &ServerMessage::Init {
                    game: game(),
                    my_player_id: 1,
                },
            )
            .await;
            server
        };

        let (joined, _server) = tokio::join!(client.ready(), fake_server);
        let (player, snapshot) = assert_ok!(joined);

        assert_eq!(player, 1);
        assert_eq!(snapshot, game());
        assert_eq!(client.player_id(), Some(1));
    }

    #[tokio::test]
    async fn test_close_frame_with_reason_is_rejection() {
        let (mut client, mut server) = pair().await;

        server
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "game is full".into(),
            })))
            .await
            .unwrap();

        match client.ready().await {
            Err(ClientError::Rejected(reason)) => assert_eq!(reason, "game is full"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_normal_close_ends_stream() {
        let (mut client, mut server) = pair().await;

        server.close(None).await.unwrap();
        assert!(assert_ok!(client.next_message().await).is_none());
    }

    #[tokio::test]
    async fn test_send_position_encodes_y() {
        let (mut client, mut server) = pair().await;

        client.send_position(42).await.unwrap();
        let frame = server.next().await.unwrap().unwrap();
        assert_eq!(
            frame,
            Message::Text(r#"{"Type":"UPDATEPOSITION","Y":42}"#.into())
        );
    }

    #[tokio::test]
    async fn test_malformed_server_message_is_protocol_error() {
        let (mut client, mut server) = pair().await;

        server.send(Message::Text("{}".into())).await.unwrap();
        assert!(matches!(
            client.next_message().await,
            Err(ClientError::Protocol(_))
        ));
    }
}
