//! Defines the HTTP API the editor UI talks to, all under /api. Operation
//! endpoints take and return JSON; /api/subscribe upgrades to a WebSocket
//! that carries watch management frames in and change events out.

use std::sync::Arc;

use bytes::Bytes;
use futures::{sink::SinkExt, stream::StreamExt};
use http_body_util::{BodyExt, Full};
use hyper::{body::Incoming, Method, Request, Response, StatusCode};
use hyper_tungstenite::{is_upgrade_request, tungstenite::Message, upgrade, HyperWebsocket};
use serde::de::DeserializeOwned;

use dirwatch::ChangeEvent;

use crate::broadcast::ConnectionId;
use crate::ops::OpError;
use crate::search::search_text;
use crate::session::EditorSession;
use crate::web::interface::{
    CopyRequest, HelloMessage, ListDirectoryResponse, OpResponse, OpenFolderResponse, PathRequest,
    ReadFileResponse, RenameRequest, RunCommandRequest, SearchRequest, SearchResponse,
    ServerInfoResponse, SubscriberRequest, WriteFileRequest, SERVER_VERSION,
};
use crate::web::util::{json, json_ok};

pub async fn call(
    session: Arc<EditorSession>,
    mut request: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let service = ApiService { session };

    match (request.method(), request.uri().path()) {
        (&Method::GET, "/api/info") => service.handle_info(),
        (&Method::GET, "/api/subscribe") => {
            if is_upgrade_request(&request) {
                service.handle_subscribe(&mut request)
            } else {
                json(
                    OpResponse::failure("/api/subscribe must be a websocket upgrade request"),
                    StatusCode::BAD_REQUEST,
                )
            }
        }

        (&Method::POST, "/api/read-file") => service.handle_read_file(request).await,
        (&Method::POST, "/api/write-file") => service.handle_write_file(request).await,
        (&Method::POST, "/api/list-directory") => service.handle_list_directory(request).await,
        (&Method::POST, "/api/make-directory") => service.handle_make_directory(request).await,
        (&Method::POST, "/api/copy-file") => service.handle_copy(request, false).await,
        (&Method::POST, "/api/copy-directory") => service.handle_copy(request, true).await,
        (&Method::POST, "/api/rename") => service.handle_rename(request).await,
        (&Method::POST, "/api/delete-file") => service.handle_delete(request, false).await,
        (&Method::POST, "/api/delete-directory") => service.handle_delete(request, true).await,
        (&Method::POST, "/api/search") => service.handle_search(request).await,
        (&Method::POST, "/api/run-command") => service.handle_run_command(request).await,
        (&Method::POST, "/api/open-folder") => service.handle_open_folder(),

        (_method, path) => json(
            OpResponse::failure(format!("Route not found: {}", path)),
            StatusCode::NOT_FOUND,
        ),
    }
}

struct ApiService {
    session: Arc<EditorSession>,
}

impl ApiService {
    fn handle_info(&self) -> Response<Full<Bytes>> {
        json_ok(ServerInfoResponse {
            server_version: SERVER_VERSION.to_owned(),
            project_name: self.session.project_name(),
            root_path: self.session.root().to_path_buf(),
            uptime_secs: self.session.start_time().elapsed().as_secs(),
        })
    }

    fn handle_open_folder(&self) -> Response<Full<Bytes>> {
        json_ok(OpenFolderResponse {
            success: true,
            path: self.session.root().to_path_buf(),
        })
    }

    async fn handle_read_file(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let body: PathRequest = match parse_body(request).await {
            Ok(body) => body,
            Err(response) => return response,
        };

        match self.session.ops().read_file(&body.path) {
            Ok(contents) => json_ok(ReadFileResponse {
                success: true,
                contents,
            }),
            Err(err) => op_failure(err),
        }
    }

    async fn handle_write_file(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let body: WriteFileRequest = match parse_body(request).await {
            Ok(body) => body,
            Err(response) => return response,
        };

        match self.session.ops().write_file(&body.path, &body.contents) {
            Ok(()) => json_ok(OpResponse::ok()),
            Err(err) => op_failure(err),
        }
    }

    async fn handle_list_directory(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let body: PathRequest = match parse_body(request).await {
            Ok(body) => body,
            Err(response) => return response,
        };

        match self.session.ops().list_directory(&body.path) {
            Ok(entries) => json_ok(ListDirectoryResponse {
                success: true,
                entries,
            }),
            Err(err) => op_failure(err),
        }
    }

    async fn handle_make_directory(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let body: PathRequest = match parse_body(request).await {
            Ok(body) => body,
            Err(response) => return response,
        };

        match self.session.ops().make_directory(&body.path) {
            Ok(()) => json_ok(OpResponse::ok()),
            Err(err) => op_failure(err),
        }
    }

    async fn handle_copy(
        &self,
        request: Request<Incoming>,
        directory: bool,
    ) -> Response<Full<Bytes>> {
        let body: CopyRequest = match parse_body(request).await {
            Ok(body) => body,
            Err(response) => return response,
        };

        let result = if directory {
            self.session
                .ops()
                .copy_directory(&body.source, &body.destination)
        } else {
            self.session.ops().copy_file(&body.source, &body.destination)
        };

        match result {
            Ok(()) => json_ok(OpResponse::ok()),
            Err(err) => op_failure(err),
        }
    }

    async fn handle_rename(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let body: RenameRequest = match parse_body(request).await {
            Ok(body) => body,
            Err(response) => return response,
        };

        match self.session.ops().rename_or_move(&body.old_path, &body.new_path) {
            Ok(()) => {
                // Watches opened on the old path, under it, or above it now
                // describe stale paths; the UI re-watches what it still shows.
                self.session.registry().invalidate_subtree(&body.old_path);
                self.session.broadcaster().broadcast(
                    &ChangeEvent::Rename {
                        old_path: body.old_path,
                        new_path: body.new_path,
                    },
                    body.connection_id,
                );
                json_ok(OpResponse::ok())
            }
            Err(err) => op_failure(err),
        }
    }

    async fn handle_delete(
        &self,
        request: Request<Incoming>,
        directory: bool,
    ) -> Response<Full<Bytes>> {
        let body: PathRequest = match parse_body(request).await {
            Ok(body) => body,
            Err(response) => return response,
        };

        let result = if directory {
            self.session.ops().delete_directory(&body.path)
        } else {
            self.session.ops().delete_file(&body.path)
        };

        match result {
            Ok(()) => {
                let event = if directory {
                    // The watchers inside the deleted tree are gone with it.
                    self.session.registry().invalidate_subtree(&body.path);
                    ChangeEvent::UnlinkDir { path: body.path }
                } else {
                    ChangeEvent::Unlink { path: body.path }
                };
                self.session.broadcaster().broadcast(&event, body.connection_id);
                json_ok(OpResponse::ok())
            }
            Err(err) => op_failure(err),
        }
    }

    async fn handle_search(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let body: SearchRequest = match parse_body(request).await {
            Ok(body) => body,
            Err(response) => return response,
        };

        let matches = search_text(&body.query, &body.directory, body.max_results);
        json_ok(SearchResponse {
            success: true,
            matches,
        })
    }

    async fn handle_run_command(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let body: RunCommandRequest = match parse_body(request).await {
            Ok(body) => body,
            Err(response) => return response,
        };

        match self.session.ops().run_command(&body.command, &body.cwd) {
            Ok(output) => json_ok(output),
            Err(err) => op_failure(err),
        }
    }

    fn handle_subscribe(&self, request: &mut Request<Incoming>) -> Response<Full<Bytes>> {
        let (response, websocket) = match upgrade(request, None) {
            Ok(pair) => pair,
            Err(err) => {
                return json(
                    OpResponse::failure(format!("WebSocket upgrade failed: {}", err)),
                    StatusCode::INTERNAL_SERVER_ERROR,
                );
            }
        };

        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            if let Err(err) = handle_subscription(session, websocket).await {
                log::error!("Error in websocket subscription: {}", err);
            }
        });

        response.map(|_| Full::new(Bytes::new()))
    }
}

/// Runs one subscriber connection: pushes broadcast events out as JSON text
/// frames and applies incoming watch/unwatch frames under the connection's
/// identity. Teardown is unconditional: however the socket ends, the
/// connection's watches and broadcaster registration are released.
async fn handle_subscription(
    session: Arc<EditorSession>,
    websocket: HyperWebsocket,
) -> Result<(), hyper_tungstenite::tungstenite::Error> {
    let mut websocket = websocket.await?;

    let (event_sender, mut event_receiver) = tokio::sync::mpsc::unbounded_channel();
    let connection = session.broadcaster().register(event_sender);
    log::debug!("WebSocket subscription established as {}", connection);

    let hello = serde_json::to_string(&HelloMessage {
        connection_id: connection,
    })
    .expect("hello message is always serializable");

    let result = async {
        websocket.send(Message::Text(hello.into())).await?;

        loop {
            tokio::select! {
                event = event_receiver.recv() => {
                    match event {
                        Some(event) => {
                            let frame = serde_json::to_string(&event)
                                .expect("change events are always serializable");
                            websocket.send(Message::Text(frame.into())).await?;
                        }
                        // Broadcaster dropped us; the session is going away.
                        None => {
                            let _ = websocket.send(Message::Close(None)).await;
                            return Ok(());
                        }
                    }
                }

                incoming = websocket.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            handle_subscriber_frame(&session, connection, &text);
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            log::debug!("WebSocket subscription closed by client");
                            return Ok(());
                        }
                        // tungstenite answers pings on its own.
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err),
                    }
                }
            }
        }
    }
    .await;

    session.broadcaster().unregister(connection);
    let released = session.registry().remove_connection(connection);
    log::debug!(
        "WebSocket subscription for {} closed, released {} watches",
        connection,
        released
    );

    match result {
        // A transport error after teardown is just how sockets die.
        Err(hyper_tungstenite::tungstenite::Error::Protocol(_))
        | Err(hyper_tungstenite::tungstenite::Error::ConnectionClosed)
        | Err(hyper_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
        other => other,
    }
}

fn handle_subscriber_frame(session: &Arc<EditorSession>, connection: ConnectionId, text: &str) {
    let frame: SubscriberRequest = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            log::debug!("Ignoring malformed subscriber frame: {}", err);
            return;
        }
    };

    match frame {
        SubscriberRequest::Watch { path } => {
            if let Err(err) = session.registry().watch(connection, &path) {
                log::warn!("Could not watch {}: {}", path.display(), err);
                // Surface as an in-band error event to the requester; its UI
                // keeps the entries and just goes without live updates for
                // this directory.
                session.broadcaster().send_to(
                    connection,
                    &ChangeEvent::Error {
                        path,
                        message: err.to_string(),
                    },
                );
            }
        }
        SubscriberRequest::Unwatch { path } => {
            session.registry().unwatch(connection, &path);
        }
    }
}

fn op_failure(err: OpError) -> Response<Full<Bytes>> {
    json_ok(OpResponse::failure(err.to_string()))
}

async fn parse_body<T: DeserializeOwned>(
    request: Request<Incoming>,
) -> Result<T, Response<Full<Bytes>>> {
    let bytes = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return Err(json(
                OpResponse::failure(format!("Could not read request body: {}", err)),
                StatusCode::BAD_REQUEST,
            ));
        }
    };

    serde_json::from_slice(&bytes).map_err(|err| {
        json(
            OpResponse::failure(format!("Malformed request body: {}", err)),
            StatusCode::BAD_REQUEST,
        )
    })
}
