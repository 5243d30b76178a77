use std::io::Stdout;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind, MouseEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Terminal;
use serde::{Deserialize, Serialize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::blocks::{normalize_language, segment, Block};
use crate::transcript::Transcript;
use crate::transport::{Connection, ConnectionState, ConnectionStatus};
use crate::{default_commands, input_cursor_position, truncate};

const COLLAPSED_PASTE_CHAR_THRESHOLD: usize = 800;
const COLLAPSED_PASTE_LINE_THRESHOLD: usize = 12;
const REPLY_PENDING_PLACEHOLDER: &str = "(waiting for reply...)";
const NO_OUTPUT_PLACEHOLDER: &str = "(no output)";
const ASSISTANT_LABEL: &str = "insight";
const ASSISTANT_DIVIDER: char = '│';

mod commands;
mod ingest;
mod input;
mod render;
mod runtime;
mod session;
#[cfg(test)]
mod tests;
mod text;
mod types;
pub(crate) mod ui;

pub(crate) use runtime::run_app;
use text::sanitize_stream_text;
pub(crate) use types::{default_theme, ThemePalette, ThemePreset};

#[derive(Clone, Debug)]
struct PendingPaste {
    marker: String,
    content: String,
}

#[derive(Clone, Copy, Debug)]
enum Mode {
    Normal,
    HistorySearch,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionSnapshot {
    #[serde(default = "default_theme")]
    theme: ThemePreset,
    history: Vec<String>,
}

/// Cached rendering state to avoid recomputing transcript lines and scroll
/// bounds every frame. Rebuilt when the transcript revision, the style
/// epoch, or the viewport changes.
struct RenderCache {
    revision: u64,
    epoch: u64,
    width: u16,
    height: u16,
    lines: Vec<Line<'static>>,
    scroll_max: u16,
}

impl RenderCache {
    fn new() -> Self {
        Self {
            revision: u64::MAX, // force first rebuild
            epoch: u64::MAX,
            width: 0,
            height: 0,
            lines: Vec::new(),
            scroll_max: 0,
        }
    }
}

struct App {
    transcript: Transcript,
    conn: Option<Connection>,
    conn_state: ConnectionState,
    /// Generation for the next connection instance; each reconnect takes a
    /// fresh value so late events from the replaced connection are discarded.
    next_generation: u64,
    /// Whether any stream fragment arrived for the reply in flight.
    had_fragment: bool,
    /// A query was sent and its reply has not finished streaming yet.
    awaiting_reply: bool,
    should_quit: bool,
    mode: Mode,

    input: String,
    cursor: usize,
    pending_pastes: Vec<PendingPaste>,
    scroll: u16,
    autoscroll: bool,
    viewport_width: u16,
    viewport_height: u16,

    history: Vec<String>,
    history_pos: Option<usize>,
    history_query: String,
    history_idx: usize,

    commands: Vec<String>,
    slash_hint_idx: usize,

    theme: ThemePreset,
    /// One-shot message shown above the composer (help text, gating notices).
    notice: Option<String>,
    last_status: String,

    /// Bumped for non-transcript changes that alter rendered lines.
    style_epoch: u64,
    render_cache: RenderCache,
}

impl App {
    fn new() -> Self {
        let mut app = Self {
            transcript: Transcript::new(),
            conn: None,
            conn_state: ConnectionState::connecting(),
            next_generation: 0,
            had_fragment: false,
            awaiting_reply: false,
            should_quit: false,
            mode: Mode::Normal,
            input: String::new(),
            cursor: 0,
            pending_pastes: Vec::new(),
            scroll: 0,
            autoscroll: true,
            viewport_width: 120,
            viewport_height: 36,
            history: Vec::new(),
            history_pos: None,
            history_query: String::new(),
            history_idx: 0,
            commands: default_commands(),
            slash_hint_idx: 0,
            theme: default_theme(),
            notice: None,
            last_status: "connecting".to_string(),
            style_epoch: 0,
            render_cache: RenderCache::new(),
        };
        if !cfg!(test) {
            app.restore_session();
            app.open_connection();
        }
        app
    }

    /// Replaces the current connection with a fresh instance. The old
    /// receiver is dropped; anything it still held is never applied.
    fn open_connection(&mut self) {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        tracing::info!(generation, "opening connection");
        self.conn = Some(Connection::open_loopback(generation));
        self.conn_state = ConnectionState::connecting();
        self.last_status = "connecting".to_string();
    }

    #[cfg(test)]
    fn attach_test_connection(
        &mut self,
        generation: u64,
    ) -> (
        crossbeam_channel::Sender<crate::transport::Envelope>,
        crossbeam_channel::Receiver<String>,
    ) {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = crossbeam_channel::unbounded();
        self.conn = Some(Connection::from_parts(generation, event_rx, out_tx));
        self.conn_state.set_open();
        self.next_generation = generation.wrapping_add(1);
        (event_tx, out_rx)
    }

    /// Bump the style epoch to invalidate the render cache without a
    /// transcript change (theme switch, viewport-independent restyles).
    fn invalidate_render_cache(&mut self) {
        self.style_epoch = self.style_epoch.wrapping_add(1);
    }

    fn theme_palette(&self) -> ThemePalette {
        self.theme.palette()
    }

    /// Update scroll to follow content after a transcript or style change.
    fn follow_scroll(&mut self) {
        if self.autoscroll {
            self.scroll = self.scroll_max();
        } else {
            self.scroll = self.scroll.min(self.scroll_max());
        }
    }

    /// Ensure the render cache is up-to-date for the current state.
    /// Returns true if the cache was rebuilt.
    fn ensure_render_cache(&mut self) -> bool {
        let need_rebuild = self.render_cache.revision != self.transcript.revision()
            || self.render_cache.epoch != self.style_epoch
            || self.render_cache.width != self.viewport_width
            || self.render_cache.height != self.viewport_height;
        if !need_rebuild {
            return false;
        }

        let w = self.viewport_width.max(1);
        let h = self.viewport_height;
        let lines = self.render_transcript_lines(w);

        let transcript_height = self.transcript_area_height(w, h);
        let paragraph = Paragraph::new(Text::from(lines.clone())).wrap(Wrap { trim: false });
        let rendered_line_count = paragraph.line_count(w.saturating_sub(2).max(1)) as u16;
        let scroll_max = rendered_line_count.saturating_sub(transcript_height);

        self.render_cache = RenderCache {
            revision: self.transcript.revision(),
            epoch: self.style_epoch,
            width: self.viewport_width,
            height: self.viewport_height,
            lines,
            scroll_max,
        };
        true
    }

    /// Rows available to the transcript panel once the composer, status bar,
    /// and any banner rows are laid out. Mirrors the layout in `ui::draw`.
    fn transcript_area_height(&self, width: u16, height: u16) -> u16 {
        let prompt_width = UnicodeWidthStr::width("> ") as u16;
        let composer_width = width.saturating_sub(4).max(1);
        let max_input_height = height.saturating_sub(8).max(3);
        let input_height = self
            .input_height(composer_width, prompt_width)
            .saturating_add(2)
            .min(max_input_height);
        let banner_h = match self.banner_text() {
            Some((text, _)) => text.split('\n').count() as u16 + 2,
            None => 0,
        };
        let hints_h = if self.slash_hints().is_empty() { 0 } else { 3 };
        let status_h = 3u16;
        let fixed = input_height
            .saturating_add(banner_h)
            .saturating_add(hints_h)
            .saturating_add(status_h);
        // Panel borders consume two rows of the transcript chunk.
        height.saturating_sub(fixed).saturating_sub(2).max(1)
    }

    /// Text for the banner row above the composer, if any. Connection
    /// errors win over one-shot notices.
    fn banner_text(&self) -> Option<(&str, bool)> {
        if matches!(self.conn_state.status, ConnectionStatus::Errored) {
            let message = self
                .conn_state
                .last_error
                .as_deref()
                .unwrap_or("connection error");
            return Some((message, true));
        }
        self.notice.as_deref().map(|text| (text, false))
    }

    fn scroll_max(&mut self) -> u16 {
        self.ensure_render_cache();
        self.render_cache.scroll_max
    }

    fn cached_transcript_lines(&self) -> &[Line<'static>] {
        &self.render_cache.lines
    }

    fn update_viewport(&mut self, width: u16, height: u16) {
        self.viewport_width = width.max(1);
        self.viewport_height = height.max(1);
        let max_scroll = self.scroll_max();
        if self.autoscroll {
            self.scroll = max_scroll;
        } else {
            self.scroll = self.scroll.min(max_scroll);
        }
    }

    fn scroll_up(&mut self, n: u16) {
        let from = if self.autoscroll {
            self.scroll_max()
        } else {
            self.scroll
        };
        self.autoscroll = false;
        self.scroll = from.saturating_sub(n);
    }

    fn scroll_down(&mut self, n: u16) {
        let max_scroll = self.scroll_max();
        self.scroll = self.scroll.saturating_add(n).min(max_scroll);
        if self.scroll >= max_scroll {
            self.autoscroll = true;
        }
    }

    fn input_height(&self, width: u16, prompt_width: u16) -> u16 {
        if self.input.is_empty() {
            return 1;
        }
        let (_, end_y) = input_cursor_position(&self.input, self.input.len(), width, prompt_width);
        end_y.saturating_add(1).max(1)
    }

    /// Returns the vertical scroll offset needed to keep the cursor visible
    /// within the input area of the given `visible_rows` height.
    fn input_scroll_offset(&self, width: u16, prompt_width: u16, visible_rows: u16) -> u16 {
        if self.input.is_empty() {
            return 0;
        }
        let (_, cursor_y) = input_cursor_position(&self.input, self.cursor, width, prompt_width);
        cursor_y.saturating_sub(visible_rows.saturating_sub(1))
    }
}
