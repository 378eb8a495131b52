use clap::Parser;
use log::info;
use server::config::ServerArgs;
use server::game::Game;
use server::lifecycle::ServerContext;
use server::network::Server;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = ServerArgs::parse();
    let config = args.connection_config()?;

    info!(
        "Starting server: {} player slots, updates every {:?}, pings every {:?}",
        args.max_players, config.update_period, config.ping_period
    );

    let game = Arc::new(Game::new(args.max_players));
    let ctx = Arc::new(ServerContext::new(game, config));
    let server = Server::bind(&args.address(), ctx).await?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
