use super::*;
use crate::transport::ServerEvent;

impl App {
    /// Drains the current connection's event channel without blocking.
    /// Events are applied in arrival order; envelopes from a superseded
    /// connection generation are discarded. Returns true if anything was
    /// processed.
    pub(super) fn poll_transport(&mut self) -> bool {
        let Some(conn) = &self.conn else {
            return false;
        };
        let generation = conn.generation();
        let events = conn.events().clone();

        let mut processed_any = false;
        loop {
            match events.try_recv() {
                Ok(envelope) => {
                    processed_any = true;
                    if envelope.generation != generation {
                        tracing::debug!(
                            stale = envelope.generation,
                            current = generation,
                            "discarding event from superseded connection"
                        );
                        continue;
                    }
                    self.apply_server_event(envelope.event);
                }
                Err(crossbeam_channel::TryRecvError::Empty) => break,
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    processed_any = true;
                    tracing::warn!(generation, "connection channel dropped without close event");
                    self.conn = None;
                    self.conn_state.set_errored("connection lost");
                    self.finish_reply();
                    break;
                }
            }
        }

        if processed_any {
            self.follow_scroll();
        }
        processed_any
    }

    fn apply_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Opened => {
                self.conn_state.set_open();
                self.last_status = "connected".to_string();
            }
            ServerEvent::Stream(fragment) => {
                match self.transcript.append_to_open(&fragment) {
                    Ok(()) => {
                        self.had_fragment = true;
                        self.last_status = "streaming".to_string();
                    }
                    Err(err) => {
                        // Fragment with no message to receive it. Dropped, never fatal.
                        tracing::warn!(
                            len = fragment.len(),
                            %err,
                            "dropping stream fragment"
                        );
                    }
                }
            }
            ServerEvent::Final(text) => {
                // The final payload fills the reply only when nothing
                // streamed; already-streamed content is never clobbered.
                if !self.had_fragment && !text.is_empty() {
                    if let Err(err) = self.transcript.append_to_open(&text) {
                        tracing::warn!(%err, "dropping final payload");
                    }
                }
                self.finish_reply();
                self.last_status = "done".to_string();
            }
            ServerEvent::Error(message) => {
                tracing::warn!(%message, "server error frame");
                self.conn_state.set_errored(message);
                self.finish_reply();
                self.last_status = "error".to_string();
            }
            ServerEvent::Closed { clean, code } => {
                self.conn = None;
                if clean {
                    self.conn_state.set_closed();
                    self.last_status = "disconnected".to_string();
                } else {
                    let message = match code {
                        Some(code) => format!("connection closed unexpectedly (code {code})"),
                        None => "connection closed unexpectedly".to_string(),
                    };
                    tracing::warn!(?code, "unclean close");
                    self.conn_state.set_errored(message);
                    self.last_status = "error".to_string();
                }
                self.finish_reply();
            }
        }
    }

    /// Ends the reply in flight: the open message stops accepting fragments
    /// and the composer unblocks. Streamed content stays as-is.
    pub(super) fn finish_reply(&mut self) {
        self.transcript.close_open();
        self.awaiting_reply = false;
        self.had_fragment = false;
    }
}
