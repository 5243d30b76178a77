/// Strips terminal escape sequences and stray control characters from text
/// before it reaches the renderer. Applied at render time only; stored
/// message content keeps every byte the server sent.
pub(super) fn sanitize_stream_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_escape = false;
    let mut in_csi = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_escape {
            if in_csi {
                // CSI sequence terminates at bytes in range 0x40..0x7E.
                if ('@'..='~').contains(&ch) {
                    in_escape = false;
                    in_csi = false;
                }
                continue;
            }
            if ch == '[' {
                in_csi = true;
                continue;
            }
            in_escape = false;
            continue;
        }

        if ch == '\u{1b}' {
            in_escape = true;
            continue;
        }

        if ch == '\r' {
            out.push('\n');
            // CRLF counts as one line break.
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            continue;
        }

        if ch.is_control() && ch != '\n' && ch != '\t' {
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_csi_color_sequences() {
        assert_eq!(sanitize_stream_text("\u{1b}[31mred\u{1b}[0m"), "red");
    }

    #[test]
    fn carriage_returns_become_single_newlines() {
        assert_eq!(sanitize_stream_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn crlf_blank_lines_survive_without_doubling() {
        assert_eq!(sanitize_stream_text("a\r\n\r\nb"), "a\n\nb");
        assert_eq!(sanitize_stream_text("line1\r\nline2"), "line1\nline2");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitize_stream_text("hello\n\tworld"), "hello\n\tworld");
    }
}
