use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use clap::Parser;

use crate::{session::EditorSession, web::LiveServer};

use super::resolve_folder;

const DEFAULT_BIND_ADDRESS: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);
const DEFAULT_PORT: u16 = 34912;

/// Serve a folder to editor UI connections over HTTP and WebSocket.
#[derive(Debug, Parser)]
pub struct ServeCommand {
    /// Path to the folder to serve. Defaults to the current directory.
    #[clap(default_value = "")]
    pub root: PathBuf,

    /// The IP address to listen on. Defaults to `127.0.0.1`.
    #[clap(long)]
    pub address: Option<IpAddr>,

    /// The port to listen on. Defaults to `34912`.
    #[clap(long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub fn run(self) -> anyhow::Result<()> {
        let root = resolve_folder(&self.root);
        let session = Arc::new(EditorSession::new(&root)?);

        let ip = self.address.unwrap_or(DEFAULT_BIND_ADDRESS.into());
        let port = self.port.unwrap_or(DEFAULT_PORT);
        let addr: SocketAddr = (ip, port).into();

        let host = if ip.is_loopback() {
            "localhost".to_owned()
        } else {
            ip.to_string()
        };

        log::info!("Serving {}", session.project_name());
        log::info!("Listening: http://{}:{}", host, port);

        let server = LiveServer::new(session);
        server.start(addr);

        Ok(())
    }
}
