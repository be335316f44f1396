//! Session-level tests: watches, broadcasts, and teardown working together
//! the way the server wires them.

use std::path::Path;
use std::time::{Duration, Instant};

use libquill::{ChangeEvent, EditorSession};
use tokio::sync::mpsc::UnboundedReceiver;

fn recv_event(rx: &mut UnboundedReceiver<ChangeEvent>) -> Option<ChangeEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match rx.try_recv() {
            Ok(event) => return Some(event),
            Err(_) => {
                if Instant::now() > deadline {
                    return None;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

fn drain_quiet(rx: &mut UnboundedReceiver<ChangeEvent>) {
    std::thread::sleep(Duration::from_millis(300));
    while rx.try_recv().is_ok() {}
}

#[test]
fn watcher_event_reaches_every_subscriber() {
    let dir = tempfile::tempdir().unwrap();
    let session = EditorSession::new(dir.path()).unwrap();

    let (tx_a, mut rx_a) = tokio::sync::mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = tokio::sync::mpsc::unbounded_channel();
    let a = session.broadcaster().register(tx_a);
    session.broadcaster().register(tx_b);

    session.registry().watch(a, dir.path()).unwrap();
    fs_err::write(dir.path().join("new.txt"), "contents").unwrap();

    let expected = dir.path().join("new.txt");
    let got_a = recv_event(&mut rx_a).expect("subscriber a should see the event");
    let got_b = recv_event(&mut rx_b).expect("subscriber b should see the event");
    assert_eq!(got_a.path(), expected.as_path());
    assert_eq!(got_b.path(), expected.as_path());
}

#[test]
fn connection_teardown_releases_all_watches() {
    let dir = tempfile::tempdir().unwrap();
    let sub_a = dir.path().join("a");
    let sub_b = dir.path().join("b");
    fs_err::create_dir(&sub_a).unwrap();
    fs_err::create_dir(&sub_b).unwrap();

    let session = EditorSession::new(dir.path()).unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let conn = session.broadcaster().register(tx);

    session.registry().watch(conn, dir.path()).unwrap();
    session.registry().watch(conn, &sub_a).unwrap();
    session.registry().watch(conn, &sub_b).unwrap();
    assert_eq!(session.registry().watch_count(), 3);

    // The socket handler runs both of these when the connection ends.
    session.broadcaster().unregister(conn);
    assert_eq!(session.registry().remove_connection(conn), 3);
    assert_eq!(session.registry().watch_count(), 0);

    // Nothing is delivered for mutations after teardown.
    drain_quiet(&mut rx);
    fs_err::write(sub_a.join("late.txt"), "x").unwrap();
    std::thread::sleep(Duration::from_millis(300));
    assert!(rx.try_recv().is_err());
}

#[test]
fn directory_delete_invalidates_watches_and_notifies_peers() {
    let dir = tempfile::tempdir().unwrap();
    let doomed = dir.path().join("doomed");
    let inside = doomed.join("inside");
    fs_err::create_dir_all(&inside).unwrap();

    let session = EditorSession::new(dir.path()).unwrap();
    let (tx_origin, mut rx_origin) = tokio::sync::mpsc::unbounded_channel();
    let (tx_peer, mut rx_peer) = tokio::sync::mpsc::unbounded_channel();
    let origin = session.broadcaster().register(tx_origin);
    let peer = session.broadcaster().register(tx_peer);

    session.registry().watch(peer, &doomed).unwrap();
    session.registry().watch(peer, &inside).unwrap();

    // What the delete-directory endpoint does for a request from `origin`.
    session.ops().delete_directory(&doomed).unwrap();
    session.registry().invalidate_subtree(&doomed);
    session.broadcaster().broadcast(
        &ChangeEvent::UnlinkDir {
            path: doomed.clone(),
        },
        Some(origin),
    );

    assert_eq!(session.registry().watch_count(), 0);

    // The peer hears about it; the originator does not get its own echo.
    let expected = Some(ChangeEvent::UnlinkDir {
        path: doomed.clone(),
    });
    let mut saw_unlink = false;
    while let Some(event) = recv_event(&mut rx_peer) {
        if Some(&event) == expected.as_ref() {
            saw_unlink = true;
            break;
        }
    }
    assert!(saw_unlink, "peer should receive the unlinkDir broadcast");

    drain_synthetic_only(&mut rx_origin, &doomed);
}

// The originator may still receive watcher-originated events for the delete,
// but never the synthetic broadcast it was excluded from.
fn drain_synthetic_only(rx: &mut UnboundedReceiver<ChangeEvent>, doomed: &Path) {
    std::thread::sleep(Duration::from_millis(300));
    while let Ok(event) = rx.try_recv() {
        if let ChangeEvent::UnlinkDir { path } = &event {
            assert_ne!(path, doomed, "originator must not get its own echo");
        }
    }
}

#[test]
fn rename_keeps_source_when_destination_taken() {
    let dir = tempfile::tempdir().unwrap();
    let session = EditorSession::new(dir.path()).unwrap();

    let src = dir.path().join("keep.txt");
    let dst = dir.path().join("taken.txt");
    fs_err::write(&src, "original").unwrap();
    fs_err::write(&dst, "occupied").unwrap();

    let err = session.ops().rename_or_move(&src, &dst).unwrap_err();
    assert_eq!(err.to_string(), "Destination already exists");
    assert_eq!(fs_err::read_to_string(&src).unwrap(), "original");
}
