use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::{App, Mode, ThemePalette};
use crate::input_cursor_position;

const PANEL_PADDING_X: u16 = 1;
const PANEL_PADDING_Y: u16 = 0;
const PANEL_HORIZONTAL_INSET: u16 = 2 + PANEL_PADDING_X * 2;
const PANEL_VERTICAL_INSET: u16 = 2 + PANEL_PADDING_Y * 2;

pub(super) fn draw(f: &mut Frame, app: &App) {
    let frame_area = f.area();
    let theme = app.theme_palette();
    let prompt_prefix = "> ";
    let prompt_width = UnicodeWidthStr::width(prompt_prefix) as u16;
    let composer_width = frame_area
        .width
        .saturating_sub(PANEL_HORIZONTAL_INSET)
        .max(1);

    let banner = app.banner_text().map(|(text, is_error)| {
        (
            text.split('\n').map(str::to_string).collect::<Vec<_>>(),
            is_error,
        )
    });
    let banner_h = banner
        .as_ref()
        .map(|(lines, _)| lines.len() as u16 + PANEL_VERTICAL_INSET)
        .unwrap_or(0);
    let hints_h = if app.slash_hints().is_empty() {
        0
    } else {
        1u16.saturating_add(PANEL_VERTICAL_INSET)
    };
    let status_h: u16 = 1 + PANEL_VERTICAL_INSET;
    let fixed_rows = banner_h + hints_h + status_h;
    let max_input_height = frame_area.height.saturating_sub(fixed_rows + 4).max(3);
    let input_height = app
        .input_height(composer_width, prompt_width)
        .saturating_add(PANEL_VERTICAL_INSET)
        .min(max_input_height);

    let mut constraints = vec![Constraint::Min(1)];
    if banner_h > 0 {
        constraints.push(Constraint::Length(banner_h));
    }
    constraints.push(Constraint::Length(input_height));
    if hints_h > 0 {
        constraints.push(Constraint::Length(hints_h));
    }
    constraints.push(Constraint::Length(status_h));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame_area);

    let mut section_idx = 0usize;
    let transcript_chunk = chunks[section_idx];
    section_idx += 1;
    let banner_chunk = if banner_h > 0 {
        let c = chunks[section_idx];
        section_idx += 1;
        Some(c)
    } else {
        None
    };
    let input_chunk = chunks[section_idx];
    section_idx += 1;
    let hint_chunk = if hints_h > 0 {
        let c = chunks[section_idx];
        section_idx += 1;
        Some(c)
    } else {
        None
    };
    let status_chunk = chunks[section_idx];

    // Transcript
    let transcript = Paragraph::new(Text::from(app.cached_transcript_lines().to_vec()))
        .style(theme.panel_surface_style())
        .block(panel_block(theme, "Repository Insight"))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(transcript, transcript_chunk);

    // Error banner / one-shot notice
    if let (Some(area), Some((lines, is_error))) = (banner_chunk, banner) {
        let (title, style) = if is_error {
            ("connection error", theme.error_style())
        } else {
            ("notice", theme.muted_style())
        };
        let text: Vec<Line> = lines
            .into_iter()
            .map(|line| Line::from(Span::styled(line, style)))
            .collect();
        let panel = Paragraph::new(Text::from(text))
            .style(theme.panel_surface_style())
            .block(banner_block(theme, title, is_error))
            .wrap(Wrap { trim: false });
        f.render_widget(panel, area);
    }

    // Composer
    let input_lines = build_input_lines(app, prompt_prefix, theme.prompt_style(), theme);
    let visible_input_rows = input_chunk
        .height
        .saturating_sub(PANEL_VERTICAL_INSET)
        .max(1);
    let input_scroll = app.input_scroll_offset(composer_width, prompt_width, visible_input_rows);
    let input = Paragraph::new(Text::from(input_lines))
        .style(theme.input_surface_style())
        .block(panel_block(theme, "compose"))
        .wrap(Wrap { trim: false })
        .scroll((input_scroll, 0));
    f.render_widget(input, input_chunk);

    // Hints
    if let Some(area) = hint_chunk {
        let hint_line = build_hint_line(app, theme);
        let hint_panel = Paragraph::new(Text::from(vec![hint_line]))
            .style(theme.panel_surface_style())
            .block(panel_block(theme, "commands"));
        f.render_widget(hint_panel, area);
    }

    // Cursor
    if matches!(app.mode, Mode::Normal) {
        let content_width = input_chunk
            .width
            .saturating_sub(PANEL_HORIZONTAL_INSET)
            .max(1);
        let content_height = input_chunk
            .height
            .saturating_sub(PANEL_VERTICAL_INSET)
            .max(1);
        let (cx, cy) = input_cursor_position(&app.input, app.cursor, content_width, prompt_width);
        let cy = cy.saturating_sub(input_scroll);
        let cursor_x =
            input_chunk.x + 1 + PANEL_PADDING_X + cx.min(content_width.saturating_sub(1));
        let cursor_y =
            input_chunk.y + 1 + PANEL_PADDING_Y + cy.min(content_height.saturating_sub(1));
        f.set_cursor_position((cursor_x, cursor_y));
    }

    // Status bar
    let status_style = if app.conn_state.last_error.is_some() {
        theme.error_style()
    } else {
        theme.status_style()
    };
    let status = Paragraph::new(format!(
        "{} | {} | Enter send | Ctrl+R history | Ctrl+C exit",
        app.conn_state.label(),
        app.last_status,
    ))
    .style(status_style)
    .block(panel_block(theme, "status"));
    f.render_widget(status, status_chunk);

    if matches!(app.mode, Mode::HistorySearch) {
        draw_history(f, app, theme);
    }
}

fn panel_block(theme: ThemePalette, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.panel_border_style())
        .title(Span::styled(format!(" {} ", title), theme.title_style()))
        .padding(Padding::new(
            PANEL_PADDING_X,
            PANEL_PADDING_X,
            PANEL_PADDING_Y,
            PANEL_PADDING_Y,
        ))
        .style(theme.panel_surface_style())
}

fn banner_block(theme: ThemePalette, title: &str, is_error: bool) -> Block<'static> {
    let title_style = if is_error {
        theme.error_label_style()
    } else {
        theme.title_style()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if is_error {
            theme.error_label_style()
        } else {
            theme.panel_border_style()
        })
        .title(Span::styled(format!(" {} ", title), title_style))
        .padding(Padding::new(
            PANEL_PADDING_X,
            PANEL_PADDING_X,
            PANEL_PADDING_Y,
            PANEL_PADDING_Y,
        ))
        .style(theme.panel_surface_style())
}

fn build_input_lines(
    app: &App,
    prompt_prefix: &str,
    prompt_style: Style,
    theme: ThemePalette,
) -> Vec<Line<'static>> {
    if app.input.is_empty() {
        return vec![Line::from(vec![
            Span::styled(prompt_prefix.to_string(), prompt_style),
            Span::styled(
                "Ask about the repository. Enter send, Shift+Enter newline",
                theme.muted_style(),
            ),
        ])];
    }

    let mut lines = Vec::new();
    let indent = " ".repeat(prompt_prefix.chars().count());
    for (idx, part) in app.input.split('\n').enumerate() {
        if idx == 0 {
            lines.push(Line::from(vec![
                Span::styled(prompt_prefix.to_string(), prompt_style),
                Span::styled(part.to_string(), Style::default().fg(theme.input_text)),
            ]));
        } else {
            lines.push(Line::from(vec![
                Span::styled(indent.clone(), prompt_style),
                Span::styled(part.to_string(), Style::default().fg(theme.input_text)),
            ]));
        }
    }
    lines
}

fn build_hint_line(app: &App, theme: ThemePalette) -> Line<'static> {
    let hints = app.slash_hints();
    if hints.is_empty() {
        return Line::from(" ");
    }

    let mut spans = vec![Span::styled(
        " suggestions (Tab cycle): ",
        theme.muted_style(),
    )];
    let selected = app.slash_hint_idx.min(hints.len().saturating_sub(1));
    for (i, hint) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        if i == selected {
            spans.push(Span::styled(hint.clone(), theme.hint_selected_style()));
        } else {
            spans.push(Span::styled(hint.clone(), theme.muted_style()));
        }
    }
    Line::from(spans)
}

fn draw_history(f: &mut Frame, app: &App, theme: ThemePalette) {
    let area = centered_rect(70, 58, f.area());
    let items = app.filtered_history();
    let mut lines = vec![
        Line::from(vec![
            Span::styled("query: ", theme.muted_style()),
            Span::styled(app.history_query.clone(), theme.status_style()),
        ]),
        Line::from(""),
    ];
    if items.is_empty() {
        lines.push(Line::from(Span::styled("(no match)", theme.muted_style())));
    } else {
        for (i, item) in items.iter().enumerate() {
            if i == app.history_idx {
                lines.push(Line::from(Span::styled(
                    format!("> {}", item),
                    theme.hint_selected_style(),
                )));
            } else {
                lines.push(Line::from(Span::styled(
                    format!("  {}", item),
                    theme.body_style(),
                )));
            }
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter apply | Esc close",
        theme.muted_style(),
    )));

    let panel = Paragraph::new(lines)
        .style(theme.panel_surface_style())
        .block(panel_block(theme, "history search"))
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(panel, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
