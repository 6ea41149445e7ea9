#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! End-to-end tests for the console relay.
//!
//! Wires decoded wire frames through a socket instance into a relay backed
//! by an on-disk history store.

use std::sync::{Arc, Mutex};

use paneltty_core::events::{CHANNEL_COMMAND, decode_frame};
use paneltty_core::format::{PRELUDE, RESET};
use paneltty_core::history::JsonFileStore;
use paneltty_core::{
    ConsoleRelay, Direction, OutputSurface, Permissions, SessionContext, SocketInstance,
};

#[derive(Default)]
struct Recorded(Vec<String>);

impl OutputSurface for Recorded {
    fn write_line(&mut self, text: &str) {
        self.0.push(text.to_string());
    }
}

fn open_relay(
    history_file: &std::path::Path,
    server_id: &str,
) -> ConsoleRelay<Recorded, JsonFileStore> {
    let ctx = SessionContext::new(server_id, Permissions::new(["control.console"]));
    let store = JsonFileStore::open(history_file).unwrap();
    ConsoleRelay::new(ctx, Arc::new(Mutex::new(Recorded::default())), store).unwrap()
}

#[test]
fn frames_flow_to_surface_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut relay = open_relay(&dir.path().join("history.json"), "8e1a");
    let (instance, _outbound) = SocketInstance::new();
    relay.attach(Some(&instance));

    let frames = [
        r#"{"type":"power_change","data":"starting"}"#,
        r#"{"type":"console_output","data":"Loading libraries\r\n"}"#,
        r#"{"type":"stats","data":"{\"cpu\":1}"}"#,
        r#"{"type":"transfer_status","data":"pending"}"#,
        r#"{"type":"daemon_error_output","data":"exit code 1\n"}"#,
    ];
    for frame in frames {
        if let Some(event) = decode_frame(frame).unwrap() {
            instance.dispatch(&event);
        }
    }

    let lines = relay.surface().lock().unwrap().0.clone();
    assert_eq!(
        lines,
        vec![
            format!("{PRELUDE}Server marked as starting.{RESET}"),
            format!("{PRELUDE}Loading libraries{RESET}"),
            format!("{PRELUDE}\u{1b}[1m\u{1b}[41mexit code 1{RESET}"),
        ]
    );
}

#[test]
fn history_survives_restart_and_is_scoped_per_server() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("history.json");

    {
        let mut relay = open_relay(&file, "alpha");
        let (instance, mut outbound) = SocketInstance::new();
        relay.attach(Some(&instance));

        relay.edit_input("say hello");
        relay.accept_line();
        relay.edit_input("list");
        relay.accept_line();

        let frame = outbound.try_recv().unwrap();
        assert_eq!(frame.channel, CHANNEL_COMMAND);
        assert_eq!(frame.payload, "say hello");
    }

    let mut relay = open_relay(&file, "alpha");
    assert_eq!(relay.history().entries(), ["say hello", "list"]);
    relay.navigate(Direction::Up);
    assert_eq!(relay.input_value(), "list");

    let other = open_relay(&file, "beta");
    assert!(other.history().is_empty());

    let raw = std::fs::read_to_string(&file).unwrap();
    assert!(raw.contains("alpha:command_history"));
}

#[test]
fn reconnect_moves_subscription_to_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    let mut relay = open_relay(&dir.path().join("history.json"), "gamma");

    let (old, _r1) = SocketInstance::new();
    relay.attach(Some(&old));
    relay.detach();

    let (new, mut new_out) = SocketInstance::new();
    relay.attach(Some(&new));
    relay.edit_input("restart");
    relay.accept_line();

    assert_eq!(old.listener_count("event"), 0);
    assert_eq!(new.listener_count("event"), 1);
    assert_eq!(new_out.try_recv().unwrap().payload, "restart");
}
