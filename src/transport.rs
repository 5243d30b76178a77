//! Transport collaborator interface.
//!
//! The backend is a persistent, ordered, bidirectional message channel:
//! outbound sends serialize to `{"query": "..."}`, inbound frames are JSON
//! objects tagged by `"type"` with a string `"payload"`. Each connection
//! instance carries a generation number; events from a superseded connection
//! are discarded by the ingestor instead of being applied to the transcript.
//!
//! The real socket lives outside this crate. A loopback backend that speaks
//! the same frames on a spawned thread stands in for it, which keeps the
//! binary runnable and the whole ingestion path testable.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
    Errored,
}

/// Lifecycle of one connection attempt as observed by the UI. A reconnect
/// starts from a fresh `connecting()` value; it never resurrects a prior one.
#[derive(Clone, Debug)]
pub(crate) struct ConnectionState {
    pub(crate) status: ConnectionStatus,
    pub(crate) last_error: Option<String>,
}

impl ConnectionState {
    pub(crate) fn connecting() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            last_error: None,
        }
    }

    pub(crate) fn set_open(&mut self) {
        self.status = ConnectionStatus::Open;
        self.last_error = None;
    }

    pub(crate) fn set_closed(&mut self) {
        self.status = ConnectionStatus::Closed;
    }

    pub(crate) fn set_errored(&mut self, message: impl Into<String>) {
        self.status = ConnectionStatus::Errored;
        self.last_error = Some(message.into());
    }

    pub(crate) fn label(&self) -> &'static str {
        match self.status {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "connected",
            ConnectionStatus::Closed => "closed",
            ConnectionStatus::Errored => "error",
        }
    }
}

/// Inbound wire frame. Closed variant set so handling stays exhaustive.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub(crate) enum WireFrame {
    Stream(String),
    Final(String),
    Error(String),
}

#[derive(Debug, Deserialize, Serialize)]
struct QueryPayload {
    query: String,
}

/// Event delivered to the ingestor. Wire frames plus the channel-level
/// lifecycle signals that never appear as JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ServerEvent {
    Opened,
    Stream(String),
    Final(String),
    Error(String),
    Closed { clean: bool, code: Option<u16> },
}

#[derive(Clone, Debug)]
pub(crate) struct Envelope {
    pub(crate) generation: u64,
    pub(crate) event: ServerEvent,
}

#[derive(Debug, Error)]
pub(crate) enum TransportError {
    #[error("failed to encode outbound query: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("connection is no longer accepting messages")]
    ChannelClosed,
}

pub(crate) fn decode_frame(raw: &str) -> Result<ServerEvent, serde_json::Error> {
    Ok(match serde_json::from_str::<WireFrame>(raw)? {
        WireFrame::Stream(payload) => ServerEvent::Stream(payload),
        WireFrame::Final(payload) => ServerEvent::Final(payload),
        WireFrame::Error(payload) => ServerEvent::Error(payload),
    })
}

/// Owned handle for one connection instance.
pub(crate) struct Connection {
    generation: u64,
    events: Receiver<Envelope>,
    outbound: Sender<String>,
}

impl Connection {
    /// Opens a connection backed by the in-process loopback peer.
    pub(crate) fn open_loopback(generation: u64) -> Self {
        let (event_tx, event_rx) = unbounded::<Envelope>();
        let (out_tx, out_rx) = unbounded::<String>();
        std::thread::spawn(move || loopback::serve(generation, &out_rx, &event_tx));
        Self {
            generation,
            events: event_rx,
            outbound: out_tx,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        generation: u64,
        events: Receiver<Envelope>,
        outbound: Sender<String>,
    ) -> Self {
        Self {
            generation,
            events,
            outbound,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn events(&self) -> &Receiver<Envelope> {
        &self.events
    }

    /// Sends one user query as a single structured payload.
    pub(crate) fn send(&self, text: &str) -> Result<(), TransportError> {
        let raw = serde_json::to_string(&QueryPayload {
            query: text.to_string(),
        })?;
        self.outbound
            .send(raw)
            .map_err(|_| TransportError::ChannelClosed)
    }
}

mod loopback {
    use super::*;

    const FRAGMENT_PAUSE: Duration = Duration::from_millis(40);
    const INVALID_PAYLOAD: &str = "Invalid payload – expected { \"query\": \"...\" }.";

    /// In-process stand-in for the backend. Every inbound query is parsed
    /// exactly as the server would, and replies go out as serialized frames
    /// pushed back through the same decoder a real socket would feed.
    pub(super) fn serve(
        generation: u64,
        queries: &Receiver<String>,
        events: &Sender<Envelope>,
    ) {
        if !send_event(events, generation, ServerEvent::Opened) {
            return;
        }

        while let Ok(raw) = queries.recv() {
            match serde_json::from_str::<QueryPayload>(&raw) {
                Err(_) => {
                    if !emit_frame(events, generation, &WireFrame::Error(INVALID_PAYLOAD.into())) {
                        return;
                    }
                }
                Ok(payload) => {
                    for fragment in reply_fragments(&payload.query) {
                        if !emit_frame(events, generation, &WireFrame::Stream(fragment)) {
                            return;
                        }
                        std::thread::sleep(FRAGMENT_PAUSE);
                    }
                    if !emit_frame(events, generation, &WireFrame::Final(String::new())) {
                        return;
                    }
                }
            }
        }

        // Client dropped its handle; report a clean close.
        let _ = send_event(
            events,
            generation,
            ServerEvent::Closed {
                clean: true,
                code: Some(1000),
            },
        );
    }

    fn send_event(events: &Sender<Envelope>, generation: u64, event: ServerEvent) -> bool {
        events.send(Envelope { generation, event }).is_ok()
    }

    fn emit_frame(events: &Sender<Envelope>, generation: u64, frame: &WireFrame) -> bool {
        let Ok(raw) = serde_json::to_string(frame) else {
            return false;
        };
        let Ok(event) = decode_frame(&raw) else {
            return false;
        };
        send_event(events, generation, event)
    }

    fn reply_fragments(query: &str) -> Vec<String> {
        vec![
            format!("You asked: **{}**\n\n", query.trim()),
            "This is the built-in loopback backend; point the client at a real\n".to_string(),
            "Repository Insight server to get live answers. A sample block:\n".to_string(),
            "```rust\n".to_string(),
            "fn main() {\n".to_string(),
            "    println!(\"insight\");\n".to_string(),
            "}\n".to_string(),
            "```".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recv(events: &Receiver<Envelope>) -> ServerEvent {
        events
            .recv_timeout(Duration::from_secs(5))
            .expect("event within timeout")
            .event
    }

    #[test]
    fn outbound_send_serializes_to_a_query_payload() {
        let (event_tx, event_rx) = unbounded::<Envelope>();
        let (out_tx, out_rx) = unbounded::<String>();
        let conn = Connection::from_parts(7, event_rx, out_tx);
        drop(event_tx);

        conn.send("explain foo").expect("send");
        let raw = out_rx.recv().expect("payload");
        assert_eq!(raw, r#"{"query":"explain foo"}"#);
    }

    #[test]
    fn send_after_peer_is_gone_reports_a_closed_channel() {
        let (_event_tx, event_rx) = unbounded::<Envelope>();
        let (out_tx, out_rx) = unbounded::<String>();
        let conn = Connection::from_parts(1, event_rx, out_tx);
        drop(out_rx);

        assert!(matches!(
            conn.send("hello"),
            Err(TransportError::ChannelClosed)
        ));
    }

    #[test]
    fn decode_recognizes_every_frame_kind() {
        assert_eq!(
            decode_frame(r#"{"type":"stream","payload":"tok"}"#).expect("stream"),
            ServerEvent::Stream("tok".to_string())
        );
        assert_eq!(
            decode_frame(r#"{"type":"final","payload":"all"}"#).expect("final"),
            ServerEvent::Final("all".to_string())
        );
        assert_eq!(
            decode_frame(r#"{"type":"error","payload":"boom"}"#).expect("error"),
            ServerEvent::Error("boom".to_string())
        );
    }

    #[test]
    fn decode_rejects_unknown_or_malformed_frames() {
        assert!(decode_frame(r#"{"type":"surprise","payload":"x"}"#).is_err());
        assert!(decode_frame("not json").is_err());
        assert!(decode_frame(r#"{"payload":"x"}"#).is_err());
    }

    #[test]
    fn loopback_streams_fragments_then_a_final_frame() {
        let conn = Connection::open_loopback(3);
        assert_eq!(recv(conn.events()), ServerEvent::Opened);

        conn.send("explain foo").expect("send");
        let mut streamed = String::new();
        loop {
            match recv(conn.events()) {
                ServerEvent::Stream(fragment) => streamed.push_str(&fragment),
                ServerEvent::Final(rest) => {
                    assert!(rest.is_empty());
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(streamed.contains("explain foo"));
        assert!(streamed.contains("```rust"));
    }

    #[test]
    fn loopback_rejects_malformed_payloads_like_the_server() {
        let (event_tx, event_rx) = unbounded::<Envelope>();
        let (out_tx, out_rx) = unbounded::<String>();
        std::thread::spawn(move || loopback::serve(9, &out_rx, &event_tx));

        assert_eq!(recv(&event_rx), ServerEvent::Opened);
        out_tx.send("{\"nope\": true}".to_string()).expect("send");
        match recv(&event_rx) {
            ServerEvent::Error(message) => assert!(message.contains("Invalid payload")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn dropping_the_handle_closes_the_loopback_cleanly() {
        let conn = Connection::open_loopback(4);
        let events = conn.events().clone();
        assert_eq!(recv(&events), ServerEvent::Opened);

        drop(conn);
        assert_eq!(
            recv(&events),
            ServerEvent::Closed {
                clean: true,
                code: Some(1000)
            }
        );
    }

    #[test]
    fn envelopes_carry_the_connection_generation() {
        let conn = Connection::open_loopback(42);
        let envelope = conn
            .events()
            .recv_timeout(Duration::from_secs(5))
            .expect("opened envelope");
        assert_eq!(envelope.generation, 42);
        assert_eq!(conn.generation(), 42);
    }
}
