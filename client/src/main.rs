use clap::Parser;
use client::GameClient;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{ServerMessage, FIELD_HEIGHT, PADDLE_HEIGHT};
use std::time::Duration;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL to connect to
    #[arg(short = 's', long, env = "PADDLE_SERVER", default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Milliseconds between paddle moves
    #[arg(short = 'm', long, default_value = "250")]
    move_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    let mut client = GameClient::connect(&args.server).await?;
    let (player, game) = client.ready().await?;
    info!(
        "Joined as player {} on a {}x{} field",
        player, game.width, game.height
    );

    let mut rng = StdRng::from_entropy();
    let mut moves = interval(Duration::from_millis(args.move_interval_ms.max(1)));

    loop {
        tokio::select! {
            _ = moves.tick() => {
                let y = rng.gen_range(0..=FIELD_HEIGHT - PADDLE_HEIGHT);
                client.send_position(y).await?;
            }
            message = client.next_message() => match message? {
                Some(ServerMessage::Update { game }) => {
                    let positions: Vec<(u32, i32)> = game.players.iter().map(|p| (p.id, p.y)).collect();
                    debug!("Update: {:?}", positions);
                }
                Some(ServerMessage::Init { .. }) => {}
                None => {
                    info!("Server closed the connection");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, leaving the game");
                client.close().await?;
                break;
            }
        }
    }

    Ok(())
}
