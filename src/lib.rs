pub mod cli;
pub mod logging;

mod broadcast;
mod clipboard;
mod event_pump;
mod ops;
mod path_util;
mod search;
mod session;
mod tree;
mod watch_registry;
mod web;

pub use broadcast::{ConnectionId, EventBroadcaster};
pub use clipboard::{ClipboardCoordinator, ClipboardIntent, ClipboardOp};
pub use dirwatch::ChangeEvent;
pub use event_pump::EventPump;
pub use ops::{sort_entries, CommandOutput, DirectoryEntry, FsOperationService, OpError};
pub use path_util::{basename, contains, is_same, normalize, parent_is};
pub use search::{search_text, SearchMatch, SearchWalker};
pub use session::{EditorSession, SessionError};
pub use tree::{DirectoryNode, DraftEntry};
pub use watch_registry::{WatchKey, WatchRegistry};
pub use web::interface as web_api;
pub use web::LiveServer;
