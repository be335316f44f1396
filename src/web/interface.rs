//! Types that represent the JSON messages crossing the HTTP and WebSocket
//! boundary. Everything here is camelCase on the wire.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::broadcast::ConnectionId;
use crate::ops::DirectoryEntry;
use crate::search::SearchMatch;

pub static SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generic outcome for operations with no payload. Failures always cross the
/// boundary in this shape with a human-readable message, never as a transport
/// error.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpResponse {
    pub fn ok() -> Self {
        OpResponse {
            success: true,
            error: None,
        }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        OpResponse {
            success: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfoResponse {
    pub server_version: String,
    pub project_name: String,
    pub root_path: PathBuf,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileResponse {
    pub success: bool,
    pub contents: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDirectoryResponse {
    pub success: bool,
    pub entries: Vec<DirectoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub matches: Vec<SearchMatch>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenFolderResponse {
    pub success: bool,
    pub path: PathBuf,
}

/// Request carrying one path. `connectionId` identifies the originating
/// connection so its own broadcast echo can be suppressed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRequest {
    pub path: PathBuf,
    #[serde(default)]
    pub connection_id: Option<ConnectionId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileRequest {
    pub path: PathBuf,
    pub contents: String,
    #[serde(default)]
    pub connection_id: Option<ConnectionId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    #[serde(default)]
    pub connection_id: Option<ConnectionId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub directory: PathBuf,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCommandRequest {
    pub command: String,
    pub cwd: PathBuf,
}

/// Text frames a subscriber sends over the WebSocket to manage its watches.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SubscriberRequest {
    Watch { path: PathBuf },
    Unwatch { path: PathBuf },
}

/// First frame the server pushes after the upgrade, telling the connection
/// the id to quote in `connectionId` fields.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename = "hello", rename_all = "camelCase")]
pub struct HelloMessage {
    pub connection_id: ConnectionId,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscriber_requests_parse() {
        let watch: SubscriberRequest =
            serde_json::from_value(json!({"action": "watch", "path": "/project/src"})).unwrap();
        assert!(matches!(watch, SubscriberRequest::Watch { path } if path == PathBuf::from("/project/src")));

        let unwatch: SubscriberRequest =
            serde_json::from_value(json!({"action": "unwatch", "path": "/project/src"})).unwrap();
        assert!(matches!(unwatch, SubscriberRequest::Unwatch { .. }));
    }

    #[test]
    fn failure_response_shape() {
        let value = serde_json::to_value(OpResponse::failure("Destination already exists")).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "error": "Destination already exists"})
        );
    }

    #[test]
    fn ok_response_omits_error_field() {
        let value = serde_json::to_value(OpResponse::ok()).unwrap();
        assert_eq!(value, json!({"success": true}));
    }

    #[test]
    fn requests_use_camel_case_fields() {
        let rename: RenameRequest = serde_json::from_value(json!({
            "oldPath": "/a/old.txt",
            "newPath": "/a/new.txt",
        }))
        .unwrap();
        assert_eq!(rename.old_path, PathBuf::from("/a/old.txt"));
        assert!(rename.connection_id.is_none());

        let search: SearchRequest = serde_json::from_value(json!({
            "query": "todo",
            "directory": "/a",
            "maxResults": 10,
        }))
        .unwrap();
        assert_eq!(search.max_results, Some(10));
    }
}
