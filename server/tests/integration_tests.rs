//! Integration tests for the paddle server
//!
//! These tests run the real accept loop on a loopback port and drive it with the
//! headless client.

use client::{ClientError, GameClient};
use server::config::ConnectionConfig;
use server::game::Game;
use server::lifecycle::ServerContext;
use server::network::Server;
use shared::ServerMessage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};

async fn start_server(max_players: usize) -> (String, Arc<ServerContext>) {
    let game = Arc::new(Game::new(max_players));
    let ctx = Arc::new(ServerContext::new(game, ConnectionConfig::default()));
    let server = Server::bind("127.0.0.1:0", ctx)
        .await
        .expect("Failed to bind server");

    let url = format!("ws://{}", server.local_addr().unwrap());
    let ctx = server.context();
    tokio::spawn(server.run());
    (url, ctx)
}

async fn wait_until(mut condition: impl FnMut() -> bool, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// CONNECTION LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// Test that a client joining over TCP receives INIT and then periodic UPDATEs
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn ready_then_updates_over_tcp() {
        let (url, ctx) = start_server(2).await;

        let mut client = GameClient::connect(&url).await.unwrap();
        let (player, game) = client.ready().await.unwrap();
        assert_eq!(player, 0);
        assert_eq!(game.players.len(), 1);

        let update = timeout(Duration::from_millis(250), client.next_message())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(update, Some(ServerMessage::Update { .. })));
        assert_eq!(ctx.registry.len(), 1);
    }

    /// Test that a position sent by one player shows up in the other player's updates
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn players_see_each_other_move() {
        let (url, _ctx) = start_server(2).await;

        let mut first = GameClient::connect(&url).await.unwrap();
        let mut second = GameClient::connect(&url).await.unwrap();
        let (first_id, _) = first.ready().await.unwrap();
        let (second_id, _) = second.ready().await.unwrap();
        assert_ne!(first_id, second_id);

        first.send_position(42).await.unwrap();

        let seen = timeout(Duration::from_secs(1), async {
            loop {
                if let Some(message) = second.next_message().await.unwrap() {
                    if message.game().player(first_id).map(|p| p.y) == Some(42) {
                        return true;
                    }
                }
            }
        })
        .await;
        assert_eq!(seen, Ok(true));
    }

    /// Test that a full game rejects with a reason and a departed player's slot is reusable
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_game_rejects_and_frees_slot_on_leave() {
        let (url, ctx) = start_server(1).await;

        let mut first = GameClient::connect(&url).await.unwrap();
        first.ready().await.unwrap();

        let mut second = GameClient::connect(&url).await.unwrap();
        match second.ready().await {
            Err(ClientError::Rejected(reason)) => assert!(reason.contains("full")),
            other => panic!("expected rejection, got {:?}", other),
        }
        drop(second);

        first.close().await.unwrap();
        assert!(wait_until(|| ctx.game.player_count() == 0, Duration::from_secs(2)).await);

        let mut third = GameClient::connect(&url).await.unwrap();
        let (player, _) = third.ready().await.unwrap();
        assert_eq!(player, 0);
    }

    /// Test that a client that stops answering pings is dropped after the read deadline
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unresponsive_client_is_removed_once() {
        let (url, ctx) = start_server(2).await;

        let mut client = GameClient::connect(&url).await.unwrap();
        client.ready().await.unwrap();
        assert!(wait_until(|| ctx.registry.len() == 1, Duration::from_secs(1)).await);

        // Stop reading: pings go unanswered from here on.
        let silent_since = Instant::now();
        assert!(wait_until(|| ctx.registry.is_empty(), Duration::from_secs(4)).await);
        assert!(silent_since.elapsed() >= Duration::from_millis(1500));
        assert_eq!(ctx.game.player_count(), 0);

        drop(client);
    }

    /// Test that a failed WebSocket handshake affects only that connection
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn handshake_failure_does_not_stop_server() {
        let (url, ctx) = start_server(2).await;
        let addr = url.trim_start_matches("ws://").to_string();

        let mut raw = tokio::net::TcpStream::connect(&addr).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut raw, b"GET / HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        drop(raw);

        let mut client = GameClient::connect(&url).await.unwrap();
        client.ready().await.unwrap();
        assert_eq!(ctx.registry.len(), 1);
    }
}

/// WIRE FORMAT TESTS
mod wire_tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::Value;
    use tokio_tungstenite::tungstenite::Message;

    /// Test the JSON shape of INIT and UPDATE frames as seen by a plain WebSocket peer
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn raw_frames_match_documented_shape() {
        let (url, _ctx) = start_server(2).await;
        let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

        socket
            .send(Message::Text("garbage".into()))
            .await
            .unwrap();
        socket
            .send(Message::Text(r#"{"Type":"READY"}"#.into()))
            .await
            .unwrap();

        let mut frames = Vec::new();
        while frames.len() < 2 {
            let frame = timeout(Duration::from_secs(1), socket.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let Message::Text(text) = frame {
                frames.push(serde_json::from_str::<Value>(&text).unwrap());
            }
        }

        assert_eq!(frames[0]["Type"], "INIT");
        assert_eq!(frames[0]["MyPlayerID"], 0);
        assert!(frames[0]["Game"]["Players"].is_array());
        assert_eq!(frames[1]["Type"], "UPDATE");
        assert!(frames[1].get("MyPlayerID").is_none());
    }
}
