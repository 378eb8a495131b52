//! WebSocket accept loop

use crate::lifecycle::{serve_connection, ServerContext};
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Accepts players and hands each connection to its own pair of pumps
pub struct Server {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
}

impl Server {
    /// Binds the TCP listener on `addr`
    ///
    /// Use port 0 to let the OS pick one; [`Server::local_addr`] reports it.
    /// No connection is accepted until [`Server::run`] is awaited.
    pub async fn bind(addr: &str, ctx: Arc<ServerContext>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Server { listener, ctx })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared state handed to every connection
    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    /// Runs the accept loop until the listener fails
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            tokio::spawn(Self::handle_stream(stream, addr, Arc::clone(&self.ctx)));
        }
    }

    async fn handle_stream(stream: TcpStream, addr: SocketAddr, ctx: Arc<ServerContext>) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to disable Nagle for {}: {}", addr, e);
        }

        match tokio_tungstenite::accept_async(stream).await {
            Ok(socket) => serve_connection(socket, Some(addr), ctx).await,
            Err(e) => warn!("WebSocket handshake with {} failed: {}", addr, e),
        }
    }
}
