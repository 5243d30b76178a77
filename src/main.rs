use std::io::{self, Stdout};
use std::path::PathBuf;

use anyhow::{Context, Result};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthChar;

mod app;
mod blocks;
mod transcript;
mod transport;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--version" | "-v" => {
                println!("insight {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            unknown => {
                eprintln!("unknown argument: {}", unknown);
                std::process::exit(2);
            }
        }
    }

    // Keep the guard alive for the whole run; dropping it stops the
    // non-blocking writer thread.
    let _log_guard = init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let mut terminal = setup_terminal()?;
    let result = app::run_app(&mut terminal);
    restore_terminal(&mut terminal)?;
    result
}

/// Logs go to ~/.insight/insight.log; stdout belongs to the TUI. Returns
/// None when the log file cannot be set up, and the app runs without logs.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let dir = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".insight");
    if std::fs::create_dir_all(&dir).is_err() {
        return None;
    }

    let appender = tracing_appender::rolling::never(dir, "insight.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env("INSIGHT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .is_ok();
    installed.then_some(guard)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableBracketedPaste,
        EnableMouseCapture
    )
    .context("failed to configure terminal")?;
    // Shift+Enter is only distinguishable with the enhanced keyboard
    // protocol; terminals without it fall back to Ctrl+J for newlines.
    if matches!(supports_keyboard_enhancement(), Ok(true)) {
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        );
    }
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("failed to create terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let _ = execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags);
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        DisableBracketedPaste,
        LeaveAlternateScreen
    )
    .context("failed to restore terminal")?;
    disable_raw_mode().context("failed to disable raw mode")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

pub(crate) fn default_commands() -> Vec<String> {
    [
        "/help",
        "/new",
        "/reconnect",
        "/theme graphite",
        "/theme paper",
        "/exit",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Maps a byte cursor inside the composer text to a (column, row) position,
/// accounting for explicit newlines (which continue under the prompt indent)
/// and soft wraps at the panel width.
pub(crate) fn input_cursor_position(
    input: &str,
    cursor: usize,
    width: u16,
    prompt_width: u16,
) -> (u16, u16) {
    let width = width.max(1);
    let byte_cursor = cursor.min(input.len());
    let mut x = prompt_width;
    let mut y: u16 = 0;

    for (idx, ch) in input.char_indices() {
        if idx >= byte_cursor {
            break;
        }
        if ch == '\n' {
            y = y.saturating_add(1);
            x = prompt_width;
            continue;
        }
        let w = UnicodeWidthChar::width(ch).unwrap_or(0) as u16;
        if x.saturating_add(w) > width {
            y = y.saturating_add(1);
            x = 0;
        }
        x = x.saturating_add(w);
    }

    (x, y)
}
