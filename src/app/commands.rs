use super::*;

impl App {
    pub(super) fn submit_current_line(&mut self) {
        let typed_line = self.input.trim().to_string();
        if typed_line.is_empty() {
            return;
        }
        self.notice = None;

        if typed_line.starts_with('/') {
            self.handle_command(&typed_line);
            return;
        }

        // One reply at a time; the composer stays blocked until the open
        // message closes.
        if self.awaiting_reply {
            self.notice = Some("a reply is still streaming, wait for it to finish".to_string());
            self.last_status = "busy".to_string();
            return;
        }

        self.history.push(typed_line.clone());
        self.history_pos = None;

        let query = self.consume_pending_pastes(&typed_line);

        // A dead connection never blocks a submit; open a fresh one first.
        if self.conn.is_none()
            || matches!(
                self.conn_state.status,
                ConnectionStatus::Closed | ConnectionStatus::Errored
            )
        {
            self.open_connection();
        }

        if let Err(err) = self.transcript.append_turn(&query) {
            tracing::warn!(%err, "submission rejected");
            self.last_status = "rejected".to_string();
            return;
        }
        self.awaiting_reply = true;
        self.had_fragment = false;

        if let Some(conn) = &self.conn {
            if let Err(err) = conn.send(&query) {
                tracing::warn!(%err, "send failed");
                self.conn_state.set_errored(err.to_string());
                self.finish_reply();
            }
        }

        self.autoscroll = true;
        self.scroll = self.scroll_max();
        self.last_status = "sent".to_string();
        self.clear_input_buffer();
    }

    fn handle_command(&mut self, line: &str) {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "/exit" | "/quit" => {
                self.should_quit = true;
            }
            "/new" => {
                self.transcript.reset();
                self.awaiting_reply = false;
                self.had_fragment = false;
                self.autoscroll = true;
                self.scroll = 0;
                // The old connection may still have fragments in flight for
                // the discarded reply; a fresh generation discards them.
                self.open_connection();
                self.last_status = "new chat".to_string();
            }
            "/reconnect" => {
                self.finish_reply();
                self.open_connection();
            }
            "/theme" => self.handle_theme_change(rest),
            "/help" => {
                self.notice = Some(
                    [
                        "commands: /new  /reconnect  /theme [graphite|paper]  /exit",
                        "keys: Enter send | Shift+Enter newline | Ctrl+R history | PgUp/PgDn scroll",
                    ]
                    .join("\n"),
                );
                self.last_status = "help".to_string();
            }
            _ => {
                self.notice = Some(format!(
                    "unknown command: {} (try /help)",
                    truncate(command, 32)
                ));
                self.last_status = "unknown command".to_string();
            }
        }
        self.clear_input_buffer();
    }

    pub(super) fn handle_theme_change(&mut self, target: &str) {
        if target.is_empty() {
            self.notice = Some(format!(
                "theme: {} | options: graphite, paper",
                self.theme.as_str()
            ));
            return;
        }
        let Some(theme) = ThemePreset::parse(target) else {
            self.notice = Some("usage: /theme [graphite|paper]".to_string());
            return;
        };
        self.theme = theme;
        self.invalidate_render_cache();
        self.last_status = format!("theme {}", self.theme.as_str());
    }
}
