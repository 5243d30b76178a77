use super::*;
use crate::transcript::Role;
use crate::transport::{Envelope, ServerEvent};
use crossbeam_channel::{Receiver, Sender};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

fn flatten_line_to_plain(line: &Line<'static>) -> String {
    line.spans
        .iter()
        .map(|s| s.content.as_ref())
        .collect::<String>()
}

fn rendered_plain(app: &mut App) -> String {
    app.ensure_render_cache();
    app.cached_transcript_lines()
        .iter()
        .map(flatten_line_to_plain)
        .collect::<Vec<_>>()
        .join("\n")
}

fn send_event(tx: &Sender<Envelope>, generation: u64, event: ServerEvent) {
    tx.send(Envelope { generation, event }).expect("send event");
}

fn submit(app: &mut App, text: &str) {
    app.input = text.to_string();
    app.cursor = app.input.len();
    app.submit_current_line();
}

fn connected_app(generation: u64) -> (App, Sender<Envelope>, Receiver<String>) {
    let mut app = App::new();
    let (event_tx, out_rx) = app.attach_test_connection(generation);
    (app, event_tx, out_rx)
}

#[test]
fn submit_sends_the_query_and_opens_a_reply() {
    let (mut app, _event_tx, out_rx) = connected_app(0);

    submit(&mut app, "explain foo");

    assert_eq!(out_rx.recv().expect("outbound"), r#"{"query":"explain foo"}"#);
    let messages = app.transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "explain foo");
    assert_eq!(messages[1].role, Role::Assistant);
    assert!(messages[1].content.is_empty());
    assert_eq!(app.transcript.open_index(), Some(1));
    assert!(app.awaiting_reply);
    assert!(app.input.is_empty());
}

#[test]
fn stream_fragments_accumulate_into_the_open_reply() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");

    send_event(&event_tx, 0, ServerEvent::Stream("Sure".into()));
    send_event(&event_tx, 0, ServerEvent::Stream(", here:\n```py\n".into()));
    send_event(&event_tx, 0, ServerEvent::Stream("def foo(): pass".into()));
    app.poll_transport();

    assert_eq!(
        app.transcript.open_content(),
        Some("Sure, here:\n```py\ndef foo(): pass")
    );
    assert!(app.awaiting_reply);
}

#[test]
fn open_code_block_renders_with_a_streaming_footer() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");
    send_event(
        &event_tx,
        0,
        ServerEvent::Stream("Sure, here:\n```py\ndef foo(): pass".into()),
    );
    app.poll_transport();

    let plain = rendered_plain(&mut app);
    assert!(plain.contains("─── python"));
    assert!(plain.contains("def foo(): pass"));
    assert!(plain.contains("─── still streaming"));
}

#[test]
fn closing_the_fence_and_finishing_drops_the_streaming_footer() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");
    send_event(
        &event_tx,
        0,
        ServerEvent::Stream("Sure, here:\n```py\ndef foo(): pass".into()),
    );
    send_event(&event_tx, 0, ServerEvent::Stream("\n```".into()));
    send_event(&event_tx, 0, ServerEvent::Final(String::new()));
    app.poll_transport();

    assert_eq!(app.transcript.open_index(), None);
    assert!(!app.awaiting_reply);
    let plain = rendered_plain(&mut app);
    assert!(plain.contains("─── python"));
    assert!(!plain.contains("still streaming"));
}

#[test]
fn final_payload_fills_the_reply_when_nothing_streamed() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "quick one");

    send_event(&event_tx, 0, ServerEvent::Final("whole answer".into()));
    app.poll_transport();

    assert_eq!(app.transcript.messages()[1].content, "whole answer");
    assert_eq!(app.transcript.open_index(), None);
}

#[test]
fn final_payload_never_clobbers_streamed_content() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");

    send_event(&event_tx, 0, ServerEvent::Stream("streamed".into()));
    send_event(&event_tx, 0, ServerEvent::Final("summary".into()));
    app.poll_transport();

    assert_eq!(app.transcript.messages()[1].content, "streamed");
}

#[test]
fn stale_generation_envelopes_are_discarded() {
    let (mut app, event_tx, _out_rx) = connected_app(3);
    submit(&mut app, "explain foo");

    send_event(&event_tx, 2, ServerEvent::Stream("late fragment".into()));
    app.poll_transport();

    assert_eq!(app.transcript.open_content(), Some(""));
    assert!(app.awaiting_reply);
}

#[test]
fn error_frame_keeps_streamed_content_and_raises_the_banner() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");

    send_event(&event_tx, 0, ServerEvent::Stream("partial".into()));
    send_event(&event_tx, 0, ServerEvent::Error("backend unavailable".into()));
    app.poll_transport();

    assert_eq!(app.transcript.messages()[1].content, "partial");
    assert_eq!(app.transcript.open_index(), None);
    assert!(!app.awaiting_reply);
    assert_eq!(
        app.banner_text(),
        Some(("backend unavailable", true))
    );
}

#[test]
fn unclean_close_reports_the_code() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");

    send_event(
        &event_tx,
        0,
        ServerEvent::Closed {
            clean: false,
            code: Some(1006),
        },
    );
    app.poll_transport();

    assert!(app.conn.is_none());
    assert!(matches!(app.conn_state.status, ConnectionStatus::Errored));
    let (message, is_error) = app.banner_text().expect("banner");
    assert!(is_error);
    assert!(message.contains("code 1006"));
}

#[test]
fn clean_close_is_not_an_error() {
    let (mut app, event_tx, _out_rx) = connected_app(0);

    send_event(
        &event_tx,
        0,
        ServerEvent::Closed {
            clean: true,
            code: Some(1000),
        },
    );
    app.poll_transport();

    assert!(matches!(app.conn_state.status, ConnectionStatus::Closed));
    assert_eq!(app.banner_text(), None);
}

#[test]
fn submitting_after_an_error_opens_a_fresh_connection() {
    let (mut app, event_tx, _out_rx) = connected_app(5);
    send_event(&event_tx, 5, ServerEvent::Error("backend unavailable".into()));
    app.poll_transport();

    submit(&mut app, "try again");

    let conn = app.conn.as_ref().expect("connection");
    assert_eq!(conn.generation(), 6);
    assert!(app.awaiting_reply);
}

#[test]
fn empty_submission_is_a_no_op() {
    let (mut app, _event_tx, out_rx) = connected_app(0);

    submit(&mut app, "   ");

    assert!(app.transcript.is_empty());
    assert!(out_rx.try_recv().is_err());
    assert!(!app.awaiting_reply);
}

#[test]
fn submission_is_blocked_while_a_reply_is_streaming() {
    let (mut app, _event_tx, out_rx) = connected_app(0);
    submit(&mut app, "first question");
    out_rx.recv().expect("outbound");

    submit(&mut app, "second question");

    assert_eq!(app.transcript.messages().len(), 2);
    assert!(out_rx.try_recv().is_err());
    assert!(app.notice.is_some());
}

#[test]
fn new_command_resets_the_conversation() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");
    send_event(&event_tx, 0, ServerEvent::Stream("partial".into()));
    app.poll_transport();

    submit(&mut app, "/new");

    assert!(app.transcript.is_empty());
    assert!(!app.awaiting_reply);
    assert_eq!(app.scroll, 0);
}

#[test]
fn new_chat_discards_fragments_from_the_abandoned_reply() {
    let (mut app, _event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "first question");

    submit(&mut app, "/new");
    let generation = app.conn.as_ref().expect("connection").generation();
    assert_ne!(generation, 0);

    let (event_tx, _out_rx) = app.attach_test_connection(generation);
    submit(&mut app, "second question");
    send_event(&event_tx, 0, ServerEvent::Stream("leftover".into()));
    send_event(&event_tx, generation, ServerEvent::Stream("fresh answer".into()));
    app.poll_transport();

    assert_eq!(app.transcript.open_content(), Some("fresh answer"));
}

#[test]
fn theme_command_switches_and_invalidates_the_render_cache() {
    let (mut app, _event_tx, _out_rx) = connected_app(0);
    let epoch = app.style_epoch;

    submit(&mut app, "/theme paper");

    assert_eq!(app.theme, ThemePreset::Paper);
    assert_ne!(app.style_epoch, epoch);
}

#[test]
fn unknown_command_shows_a_notice() {
    let (mut app, _event_tx, _out_rx) = connected_app(0);

    submit(&mut app, "/bogus");

    let notice = app.notice.as_deref().expect("notice");
    assert!(notice.contains("/bogus"));
    assert!(app.transcript.is_empty());
}

#[test]
fn large_paste_collapses_to_a_marker_and_expands_on_submit() {
    let (mut app, _event_tx, out_rx) = connected_app(0);
    let pasted = "x".repeat(900);

    app.handle_paste_event(&pasted);
    assert!(app.input.contains("[Pasted Content 900 chars]"));
    assert_eq!(app.pending_pastes.len(), 1);

    let line = app.input.clone();
    submit(&mut app, &line);
    let raw = out_rx.recv().expect("outbound");
    assert!(raw.contains(&pasted));
    assert!(!raw.contains("[Pasted Content"));
}

#[test]
fn small_paste_is_inserted_verbatim() {
    let (mut app, _event_tx, _out_rx) = connected_app(0);

    app.handle_paste_event("hi there");

    assert_eq!(app.input, "hi there");
    assert!(app.pending_pastes.is_empty());
}

#[test]
fn pageup_disables_autoscroll() {
    let (mut app, _event_tx, _out_rx) = connected_app(0);
    app.handle_key(KeyEvent::new(KeyCode::PageUp, KeyModifiers::NONE));

    assert!(!app.autoscroll);
}

#[test]
fn pagedown_at_the_bottom_reenables_autoscroll() {
    let (mut app, _event_tx, _out_rx) = connected_app(0);
    app.autoscroll = false;
    app.scroll = app.scroll_max();

    app.handle_key(KeyEvent::new(KeyCode::PageDown, KeyModifiers::NONE));

    assert!(app.autoscroll);
}

#[test]
fn streaming_updates_follow_the_bottom_when_autoscrolled() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");

    let long_reply = "line\n".repeat(80);
    send_event(&event_tx, 0, ServerEvent::Stream(long_reply));
    app.poll_transport();

    assert!(app.autoscroll);
    let max = app.scroll_max();
    assert_eq!(app.scroll, max);
}

#[test]
fn slash_hints_match_the_typed_prefix() {
    let (mut app, _event_tx, _out_rx) = connected_app(0);
    app.input = "/the".to_string();
    app.cursor = app.input.len();

    let hints = app.slash_hints();
    assert_eq!(hints, vec!["/theme graphite", "/theme paper"]);
}

#[test]
fn history_search_filters_previous_queries() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain parser");
    send_event(&event_tx, 0, ServerEvent::Final("ok".into()));
    app.poll_transport();
    submit(&mut app, "list modules");
    send_event(&event_tx, 0, ServerEvent::Final("ok".into()));
    app.poll_transport();

    app.history_query = "parser".to_string();
    assert_eq!(app.filtered_history(), vec!["explain parser"]);
}

#[test]
fn pending_reply_renders_a_placeholder() {
    let (mut app, _event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");

    let plain = rendered_plain(&mut app);
    assert!(plain.contains(REPLY_PENDING_PLACEHOLDER));
}

#[test]
fn channel_drop_without_close_event_is_an_error() {
    let (mut app, event_tx, _out_rx) = connected_app(0);
    submit(&mut app, "explain foo");

    drop(event_tx);
    app.poll_transport();

    assert!(app.conn.is_none());
    assert!(matches!(app.conn_state.status, ConnectionStatus::Errored));
    assert!(!app.awaiting_reply);
}
