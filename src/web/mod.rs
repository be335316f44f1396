//! Defines the web interface the editor UI communicates with: JSON operation
//! endpoints under /api and a WebSocket push channel for change events.

mod api;
pub mod interface;
mod util;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

use crate::session::EditorSession;

use self::interface::OpResponse;

pub struct LiveServer {
    session: Arc<EditorSession>,
}

impl LiveServer {
    pub fn new(session: Arc<EditorSession>) -> Self {
        LiveServer { session }
    }

    /// Binds and serves until the process exits. Connections are served
    /// concurrently; each /api/subscribe upgrade spawns its own task.
    pub fn start(self, address: SocketAddr) {
        let session = Arc::clone(&self.session);

        let rt = Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = {
                const MAX_BIND_ATTEMPTS: u32 = 5;
                const BASE_BACKOFF_MS: u64 = 200;
                let mut attempts = 0u32;
                loop {
                    attempts += 1;
                    match TcpListener::bind(address).await {
                        Ok(listener) => break listener,
                        Err(err)
                            if err.kind() == std::io::ErrorKind::AddrInUse
                                && attempts < MAX_BIND_ATTEMPTS =>
                        {
                            let delay = BASE_BACKOFF_MS * 2u64.pow(attempts - 1);
                            log::warn!(
                                "Port {} in use, retrying in {}ms (attempt {}/{})",
                                address.port(),
                                delay,
                                attempts,
                                MAX_BIND_ATTEMPTS
                            );
                            tokio::time::sleep(Duration::from_millis(delay)).await;
                        }
                        Err(err) => {
                            panic!(
                                "Failed to bind to {}: {} (after {} attempts)",
                                address, err, attempts
                            );
                        }
                    }
                }
            };

            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        log::warn!("Failed to accept connection: {}", err);
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let session = Arc::clone(&session);

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let session = Arc::clone(&session);

                        async move {
                            if req.uri().path().starts_with("/api") {
                                Ok::<_, Infallible>(api::call(session, req).await)
                            } else {
                                Ok::<_, Infallible>(util::json(
                                    OpResponse::failure(format!(
                                        "Route not found: {}",
                                        req.uri().path()
                                    )),
                                    StatusCode::NOT_FOUND,
                                ))
                            }
                        }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        log::error!("Error serving connection: {err}");
                    }
                });
            }
        })
    }
}
