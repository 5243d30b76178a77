//! Block segmentation for streamed assistant text.
//!
//! A message's content is re-derived into typed display blocks every time it
//! changes. The segmenter is a pure function of the current text, so it never
//! carries parser state across fragments: partially streamed content is as
//! valid an input as finished content, and an unterminated code fence simply
//! comes back as an unclosed code block instead of leaking backtick noise
//! into the prose path.

/// One renderable unit derived from raw message text.
///
/// Code blocks keep the raw fence marker lines alongside the parsed language
/// tag so `reassemble` can reproduce the original text byte for byte even
/// when a fence line carried extra whitespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Block {
    Prose {
        lines: Vec<String>,
    },
    Code {
        /// Raw tag from the fence line; alias normalization happens at
        /// render time only.
        language: String,
        lines: Vec<String>,
        closed: bool,
        fence_open: String,
        fence_close: Option<String>,
    },
}

struct OpenFence {
    language: String,
    fence_open: String,
    lines: Vec<String>,
}

/// Splits `content` into an ordered sequence of blocks. Total over all
/// strings; linear in the input; re-run on the full text after every change.
///
/// A line whose trimmed form starts with three backticks toggles fence mode.
/// Outside a fence every line is its own one-line prose block, blank lines
/// included, so paragraph breaks survive verbatim. Inside a fence lines
/// accumulate until the closing marker; input that ends mid-fence yields the
/// buffered lines as an unclosed code block.
pub(crate) fn segment(content: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut fence: Option<OpenFence> = None;

    for line in content.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            match fence.take() {
                None => {
                    fence = Some(OpenFence {
                        language: trimmed[3..].trim().to_string(),
                        fence_open: line.to_string(),
                        lines: Vec::new(),
                    });
                }
                Some(open) => {
                    blocks.push(Block::Code {
                        language: open.language,
                        lines: open.lines,
                        closed: true,
                        fence_open: open.fence_open,
                        fence_close: Some(line.to_string()),
                    });
                }
            }
            continue;
        }

        match fence.as_mut() {
            Some(open) => open.lines.push(line.to_string()),
            None => blocks.push(Block::Prose {
                lines: vec![line.to_string()],
            }),
        }
    }

    if let Some(open) = fence {
        blocks.push(Block::Code {
            language: open.language,
            lines: open.lines,
            closed: false,
            fence_open: open.fence_open,
            fence_close: None,
        });
    }

    blocks
}

/// Exact inverse of `segment`: reinserts fence marker lines and rejoins on
/// line feeds.
pub(crate) fn reassemble(blocks: &[Block]) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for block in blocks {
        match block {
            Block::Prose { lines: prose } => {
                lines.extend(prose.iter().map(String::as_str));
            }
            Block::Code {
                lines: code,
                fence_open,
                fence_close,
                ..
            } => {
                lines.push(fence_open);
                lines.extend(code.iter().map(String::as_str));
                if let Some(close) = fence_close {
                    lines.push(close);
                }
            }
        }
    }
    lines.join("\n")
}

/// Maps common short language aliases to the canonical grammar name used for
/// highlighting. Unknown tags (and the empty tag) pass through unchanged;
/// stored message content is never touched.
pub(crate) fn normalize_language(raw: &str) -> &str {
    match raw {
        "js" => "javascript",
        "ts" => "typescript",
        "py" => "python",
        "sh" => "bash",
        "yml" => "yaml",
        "md" => "markdown",
        "rb" => "ruby",
        "cs" => "csharp",
        "rs" => "rust",
        "golang" => "go",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(line: &str) -> Block {
        Block::Prose {
            lines: vec![line.to_string()],
        }
    }

    #[test]
    fn unterminated_fence_yields_unclosed_code_block() {
        let blocks = segment("para\n```py\nprint(1)");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], prose("para"));
        match &blocks[1] {
            Block::Code {
                language,
                lines,
                closed,
                ..
            } => {
                assert_eq!(language, "py");
                assert_eq!(lines, &["print(1)".to_string()]);
                assert!(!closed);
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn closed_fence_yields_closed_code_block_then_prose() {
        let blocks = segment("```js\nx=1\n```\nok");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::Code {
                language,
                lines,
                closed,
                ..
            } => {
                assert_eq!(language, "js");
                assert_eq!(lines, &["x=1".to_string()]);
                assert!(closed);
            }
            other => panic!("expected code block, got {other:?}"),
        }
        assert_eq!(blocks[1], prose("ok"));
    }

    #[test]
    fn prose_lines_stay_one_block_per_line_including_blanks() {
        let blocks = segment("a\n\nb");
        assert_eq!(blocks, vec![prose("a"), prose(""), prose("b")]);
    }

    #[test]
    fn fence_language_tag_is_trimmed() {
        let blocks = segment("```  rust  \nfn x() {}");
        match &blocks[0] {
            Block::Code { language, .. } => assert_eq!(language, "rust"),
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn indented_fence_marker_still_toggles() {
        let blocks = segment("  ```py\ncode\n  ```");
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::Code {
                language, closed, ..
            } => {
                assert_eq!(language, "py");
                assert!(closed);
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn fence_open_line_alone_is_an_empty_unclosed_block() {
        let blocks = segment("```py");
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::Code {
                lines, closed, ..
            } => {
                assert!(lines.is_empty());
                assert!(!closed);
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    const CORPUS: &[&str] = &[
        "",
        "\n",
        "plain prose",
        "a\n\nb\n",
        "```",
        "```py",
        "```py\n",
        "```py\nprint(1)",
        "para\n```py\nprint(1)",
        "```js\nx=1\n```\nok",
        "```js\nx=1\n```",
        "lead\n  ``` rust \nfn main() {}\n```\ntrail\n",
        "```\nno language\n```\n```py\nsecond block",
        "text with `inline` and ``` mid-sentence stays prose? no: \nreal line",
        "```py\nnested ```` backticks\n```",
        "trailing newline inside fence\n```\ncode\n",
    ];

    #[test]
    fn segmentation_is_lossless_over_the_corpus() {
        for input in CORPUS {
            assert_eq!(
                reassemble(&segment(input)),
                *input,
                "round trip mismatch for {input:?}"
            );
        }
    }

    #[test]
    fn segmentation_depends_only_on_final_content_not_delivery_splits() {
        for input in CORPUS {
            let whole = segment(input);
            for split in 0..=input.len() {
                if !input.is_char_boundary(split) {
                    continue;
                }
                let (first, rest) = input.split_at(split);
                // Render the partial content mid-stream, as the live view does,
                // then append the remainder and re-segment from scratch.
                let mid_stream = segment(first);
                assert_eq!(reassemble(&mid_stream), first);
                let mut content = first.to_string();
                content.push_str(rest);
                assert_eq!(segment(&content), whole, "split at {split} of {input:?}");
            }
        }
    }

    #[test]
    fn normalize_maps_known_aliases() {
        assert_eq!(normalize_language("py"), "python");
        assert_eq!(normalize_language("js"), "javascript");
        assert_eq!(normalize_language("ts"), "typescript");
        assert_eq!(normalize_language("sh"), "bash");
        assert_eq!(normalize_language("yml"), "yaml");
        assert_eq!(normalize_language("md"), "markdown");
        assert_eq!(normalize_language("rb"), "ruby");
        assert_eq!(normalize_language("cs"), "csharp");
    }

    #[test]
    fn normalize_passes_unknown_and_empty_tags_through() {
        assert_eq!(normalize_language(""), "");
        assert_eq!(normalize_language("haskell"), "haskell");
    }

    #[test]
    fn normalize_is_idempotent() {
        for tag in [
            "py", "js", "ts", "sh", "yml", "md", "rb", "cs", "rs", "golang", "", "python",
            "bash", "weird-tag",
        ] {
            let once = normalize_language(tag);
            assert_eq!(normalize_language(once), once);
        }
    }
}
