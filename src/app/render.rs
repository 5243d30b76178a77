use super::*;
use crate::transcript::Role;

impl App {
    /// Renders the whole transcript into styled lines for the given width.
    /// User messages become full-width highlighted rows; assistant messages
    /// are segmented into prose and code blocks first, then styled.
    pub(super) fn render_transcript_lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::<Line>::new();
        let palette = self.theme.palette();
        let label_col_width = UnicodeWidthStr::width(ASSISTANT_LABEL) + 2;
        let open_idx = self.transcript.open_index();

        for (idx, message) in self.transcript.messages().iter().enumerate() {
            match message.role {
                Role::User => {
                    let w = width as usize;
                    let user_style = Style::default()
                        .fg(palette.user_fg)
                        .bg(palette.user_bg)
                        .add_modifier(Modifier::BOLD);
                    for part in message.content.split('\n') {
                        let content = if part.is_empty() { " " } else { part };
                        let mut text = format!(" {} ", content);
                        if w > 0 {
                            let text_w = UnicodeWidthStr::width(text.as_str());
                            if text_w < w {
                                text.push_str(&" ".repeat(w - text_w));
                            }
                        }
                        lines.push(Line::from(vec![Span::styled(text, user_style)]));
                    }
                }
                Role::Assistant => {
                    let cleaned = sanitize_stream_text(&message.content);
                    let is_open = open_idx == Some(idx);
                    self.push_assistant_lines(
                        &mut lines,
                        &cleaned,
                        is_open,
                        width,
                        label_col_width,
                        palette,
                    );
                }
            }
            lines.push(Line::from(""));
        }

        lines
    }

    fn push_assistant_lines(
        &self,
        lines: &mut Vec<Line<'static>>,
        content: &str,
        is_open: bool,
        width: u16,
        label_col_width: usize,
        palette: ThemePalette,
    ) {
        let label_style = Style::default()
            .fg(palette.assistant_label)
            .add_modifier(Modifier::BOLD);
        let label_sep = format!("{} {}", ASSISTANT_LABEL, ASSISTANT_DIVIDER);
        let indent = " ".repeat(label_col_width.saturating_sub(1));
        let indent_sep = format!("{}{}", indent, ASSISTANT_DIVIDER);
        let content_width = (width as usize).saturating_sub(label_col_width + 1);

        let body_lines = if content.trim().is_empty() {
            let placeholder = if is_open {
                REPLY_PENDING_PLACEHOLDER
            } else {
                NO_OUTPUT_PLACEHOLDER
            };
            vec![vec![Span::styled(
                placeholder.to_string(),
                palette.muted_style(),
            )]]
        } else {
            render_blocks(&segment(content), is_open, palette)
        };

        let mut first = true;
        for body_line in body_lines {
            for wrapped in wrap_spans(body_line, content_width) {
                let mut spans = if first {
                    vec![Span::styled(label_sep.clone(), label_style), Span::raw(" ")]
                } else {
                    vec![
                        Span::styled(indent_sep.clone(), label_style),
                        Span::raw(" "),
                    ]
                };
                first = false;
                spans.extend(wrapped);
                lines.push(Line::from(spans));
            }
        }
    }
}

/// Turns segmented blocks into styled span-lines. Code blocks carry a rule
/// header with the normalized language tag; an unclosed block gets a
/// streaming footer instead of a closing rule while the message is open.
fn render_blocks(
    blocks: &[Block],
    message_open: bool,
    palette: ThemePalette,
) -> Vec<Vec<Span<'static>>> {
    let base_style = palette.body_style();
    let code_style = Style::default().fg(palette.code_fg).bg(palette.code_bg);
    let mut result = Vec::new();

    for block in blocks {
        match block {
            Block::Prose { lines } => {
                for line in lines {
                    result.push(render_prose_line(line, base_style, palette));
                }
            }
            Block::Code {
                language,
                lines,
                closed,
                ..
            } => {
                let tag = normalize_language(language);
                if tag.is_empty() {
                    result.push(vec![Span::styled("───".to_string(), palette.muted_style())]);
                } else {
                    result.push(vec![
                        Span::styled("─── ".to_string(), palette.muted_style()),
                        Span::styled(
                            tag.to_string(),
                            palette.muted_style().add_modifier(Modifier::ITALIC),
                        ),
                    ]);
                }
                for line in lines {
                    let content = if line.is_empty() { " " } else { line.as_str() };
                    result.push(vec![Span::styled(content.to_string(), code_style)]);
                }
                if *closed {
                    result.push(vec![Span::styled("───".to_string(), palette.muted_style())]);
                } else if message_open {
                    result.push(vec![Span::styled(
                        "─── still streaming".to_string(),
                        palette.muted_style().add_modifier(Modifier::ITALIC),
                    )]);
                }
            }
        }
    }

    result
}

/// Inline styling for a single prose line: headings, unordered bullets, and
/// the bold / italic / inline-code emphasis spans. Fences never reach this
/// function; the segmenter has already routed them into code blocks.
fn render_prose_line(
    line: &str,
    base_style: Style,
    palette: ThemePalette,
) -> Vec<Span<'static>> {
    let heading_style = Style::default()
        .fg(palette.banner_title)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let bold_style = base_style.add_modifier(Modifier::BOLD);
    let italic_style = base_style.add_modifier(Modifier::ITALIC);
    let inline_code_style = Style::default()
        .fg(palette.inline_code_fg)
        .bg(palette.inline_code_bg);
    let bullet_style = base_style.fg(palette.bullet);

    let trimmed = line.trim();

    if trimmed.starts_with('#') {
        let level = trimmed.chars().take_while(|c| *c == '#').count();
        let heading_text = trimmed[level..].trim_start();
        let prefix = "#".repeat(level);
        if heading_text.is_empty() {
            return vec![Span::styled(prefix, heading_style)];
        }
        return vec![
            Span::styled(format!("{} ", prefix), palette.muted_style()),
            Span::styled(heading_text.to_string(), heading_style),
        ];
    }

    if trimmed.starts_with("- ") || trimmed.starts_with("* ") {
        let indent = line.len() - line.trim_start().len();
        let rest = &trimmed[2..];
        let mut spans = Vec::new();
        if indent > 0 {
            spans.push(Span::raw(" ".repeat(indent)));
        }
        spans.push(Span::styled("\u{2022} ".to_string(), bullet_style));
        spans.extend(render_inline_markdown(
            rest,
            base_style,
            bold_style,
            italic_style,
            inline_code_style,
        ));
        return spans;
    }

    let content = if line.is_empty() { " " } else { line };
    render_inline_markdown(
        content,
        base_style,
        bold_style,
        italic_style,
        inline_code_style,
    )
}

/// Parse inline markdown: **bold**, *italic*, `code`
fn render_inline_markdown(
    text: &str,
    base_style: Style,
    bold_style: Style,
    italic_style: Style,
    code_style: Style,
) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut buf = String::new();
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        // Inline code: `...`
        if chars[i] == '`' {
            if !buf.is_empty() {
                spans.push(Span::styled(buf.clone(), base_style));
                buf.clear();
            }
            let start = i + 1;
            if let Some(end) = chars[start..].iter().position(|&c| c == '`') {
                let code_text: String = chars[start..start + end].iter().collect();
                spans.push(Span::styled(format!(" {} ", code_text), code_style));
                i = start + end + 1;
            } else {
                buf.push('`');
                i += 1;
            }
            continue;
        }

        // Bold: **...**
        if i + 1 < len && chars[i] == '*' && chars[i + 1] == '*' {
            if !buf.is_empty() {
                spans.push(Span::styled(buf.clone(), base_style));
                buf.clear();
            }
            let start = i + 2;
            let mut end = None;
            for j in start..len.saturating_sub(1) {
                if chars[j] == '*' && chars[j + 1] == '*' {
                    end = Some(j);
                    break;
                }
            }
            if let Some(end) = end {
                let bold_text: String = chars[start..end].iter().collect();
                spans.push(Span::styled(bold_text, bold_style));
                i = end + 2;
            } else {
                buf.push('*');
                buf.push('*');
                i += 2;
            }
            continue;
        }

        // Italic: *...*
        if chars[i] == '*' {
            if !buf.is_empty() {
                spans.push(Span::styled(buf.clone(), base_style));
                buf.clear();
            }
            let start = i + 1;
            let mut end = None;
            for j in start..len {
                if chars[j] == '*' && !(j + 1 < len && chars[j + 1] == '*') {
                    end = Some(j);
                    break;
                }
            }
            if let Some(end) = end {
                let italic_text: String = chars[start..end].iter().collect();
                spans.push(Span::styled(italic_text, italic_style));
                i = end + 1;
            } else {
                buf.push('*');
                i += 1;
            }
            continue;
        }

        buf.push(chars[i]);
        i += 1;
    }

    if !buf.is_empty() {
        spans.push(Span::styled(buf, base_style));
    }

    if spans.is_empty() {
        spans.push(Span::styled(" ".to_string(), base_style));
    }

    spans
}

/// Pre-wrap a list of spans so that each resulting line fits within
/// `max_width` display columns. Returns a single-element vec with the
/// original spans when no wrapping is needed.
pub(super) fn wrap_spans(
    spans: Vec<Span<'static>>,
    max_width: usize,
) -> Vec<Vec<Span<'static>>> {
    if max_width == 0 {
        return vec![spans];
    }
    let mut result: Vec<Vec<Span<'static>>> = Vec::new();
    let mut current_line: Vec<Span<'static>> = Vec::new();
    let mut current_width: usize = 0;

    for span in spans {
        let span_width = UnicodeWidthStr::width(span.content.as_ref());
        if current_width + span_width <= max_width {
            current_width += span_width;
            current_line.push(span);
        } else {
            // This span has to split across lines.
            let style = span.style;
            let text = span.content.into_owned();
            let mut remaining = text.as_str();
            while !remaining.is_empty() {
                let avail = max_width.saturating_sub(current_width);
                if avail == 0 {
                    if !current_line.is_empty() {
                        result.push(std::mem::take(&mut current_line));
                    }
                    current_width = 0;
                    continue;
                }
                let mut split_byte = 0;
                let mut cols = 0usize;
                for (byte_idx, ch) in remaining.char_indices() {
                    let w = UnicodeWidthChar::width(ch).unwrap_or(0);
                    if cols + w > avail {
                        break;
                    }
                    cols += w;
                    split_byte = byte_idx + ch.len_utf8();
                }
                if split_byte == 0 && current_line.is_empty() {
                    // Single char wider than avail; force progress.
                    if let Some(ch) = remaining.chars().next() {
                        split_byte = ch.len_utf8();
                        cols = UnicodeWidthChar::width(ch).unwrap_or(1);
                    } else {
                        break;
                    }
                }
                if split_byte == 0 {
                    result.push(std::mem::take(&mut current_line));
                    current_width = 0;
                    continue;
                }
                let chunk = &remaining[..split_byte];
                current_line.push(Span::styled(chunk.to_string(), style));
                current_width += cols;
                remaining = &remaining[split_byte..];
                if !remaining.is_empty() {
                    result.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
            }
        }
    }
    if !current_line.is_empty() {
        result.push(current_line);
    }
    if result.is_empty() {
        result.push(Vec::new());
    }
    result
}
