//! Background thread that moves debounced filesystem events from the watch
//! channel to the broadcaster.
//!
//! One pump serves all watchers in a session. It owns the receiving end of
//! the shared event channel; shutdown is signaled through a dedicated channel
//! from `Drop`, and the `jod_thread` handle joins the thread before the rest
//! of the session is torn down.

use crossbeam_channel::{select, Receiver, Sender};
use std::sync::Arc;

use dirwatch::ChangeEvent;

use crate::broadcast::EventBroadcaster;

pub struct EventPump {
    shutdown_sender: Sender<()>,
    #[allow(unused)]
    job_thread: jod_thread::JoinHandle<()>,
}

impl EventPump {
    pub fn start(events: Receiver<ChangeEvent>, broadcaster: Arc<EventBroadcaster>) -> EventPump {
        let (shutdown_sender, shutdown_receiver) = crossbeam_channel::bounded(1);

        EventPump {
            shutdown_sender,
            job_thread: jod_thread::Builder::new()
                .name("quill-event-pump".to_owned())
                .spawn(move || {
                    log::trace!("EventPump thread started");
                    pump(events, shutdown_receiver, broadcaster);
                    log::trace!("EventPump thread stopped");
                })
                .expect("Could not start event pump thread"),
        }
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        let _ = self.shutdown_sender.send(());
    }
}

fn pump(
    events: Receiver<ChangeEvent>,
    shutdown: Receiver<()>,
    broadcaster: Arc<EventBroadcaster>,
) {
    loop {
        select! {
            recv(events) -> event => {
                match event {
                    Ok(event) => {
                        log::trace!("Filesystem event: {:?}", event);
                        broadcaster.broadcast(&event, None);
                    }
                    // All watchers and the registry are gone.
                    Err(_) => return,
                }
            }
            recv(shutdown) -> _ => {
                log::trace!("EventPump shutdown signal received");
                return;
            }
        }
    }
}
