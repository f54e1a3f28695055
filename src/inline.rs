use crate::block::{Block, Span};

/// Character formatting carried by a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

/// One flat, styled segment of a line of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Run {
    Text { text: String, style: RunStyle },
    Link { text: String, url: String, style: RunStyle },
    Break,
}

/// Flatten a span tree into an ordered run sequence.
///
/// Nested emphasis combines into the run's flag set; code content is
/// carried literally and never re-inspected. Adjacent runs with identical
/// styling are merged, so the output is canonical.
pub fn flatten(spans: &[Span]) -> Vec<Run> {
    let mut runs = Vec::new();
    walk(spans, RunStyle::default(), &mut runs);
    coalesce(runs)
}

/// Format one line of inline markup into runs.
pub fn format_line(raw: &str) -> Vec<Run> {
    match crate::parser::parse(raw).blocks.into_iter().next() {
        Some(Block::Paragraph { content }) => flatten(&content),
        None => Vec::new(),
        // Not a plain line of text; keep it verbatim
        Some(_) => vec![Run::Text {
            text: raw.to_string(),
            style: RunStyle::default(),
        }],
    }
}

/// Collapse a span tree to its display text, markup removed.
pub fn plain_text(spans: &[Span]) -> String {
    let mut out = String::new();
    collect_text(spans, &mut out);
    out
}

fn walk(spans: &[Span], style: RunStyle, out: &mut Vec<Run>) {
    for span in spans {
        match span {
            Span::Text(text) => out.push(Run::Text {
                text: text.clone(),
                style,
            }),
            Span::Bold(inner) => walk(inner, RunStyle { bold: true, ..style }, out),
            Span::Italic(inner) => walk(
                inner,
                RunStyle {
                    italic: true,
                    ..style
                },
                out,
            ),
            Span::Code(text) => out.push(Run::Text {
                text: text.clone(),
                style: RunStyle { code: true, ..style },
            }),
            Span::Link { url, content } => out.push(Run::Link {
                text: plain_text(content),
                url: url.clone(),
                style,
            }),
            Span::LineBreak => out.push(Run::Break),
        }
    }
}

fn collect_text(spans: &[Span], out: &mut String) {
    for span in spans {
        match span {
            Span::Text(text) | Span::Code(text) => out.push_str(text),
            Span::Bold(inner) | Span::Italic(inner) | Span::Link { content: inner, .. } => {
                collect_text(inner, out);
            }
            Span::LineBreak => out.push('\n'),
        }
    }
}

fn coalesce(runs: Vec<Run>) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::new();
    for run in runs {
        let merged = match (out.last_mut(), &run) {
            (
                Some(Run::Text {
                    text: prev,
                    style: prev_style,
                }),
                Run::Text { text, style },
            ) if prev_style == style => {
                prev.push_str(text);
                true
            }
            _ => false,
        };
        if !merged {
            out.push(run);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(runs: &[Run]) -> String {
        runs.iter()
            .map(|r| match r {
                Run::Text { text, .. } | Run::Link { text, .. } => text.as_str(),
                Run::Break => "\n",
            })
            .collect()
    }

    #[test]
    fn content_round_trips_without_markers() {
        let runs = format_line("Some **bold** and *italic* text.");
        assert_eq!(concat(&runs), "Some bold and italic text.");
        assert_eq!(
            runs,
            vec![
                Run::Text {
                    text: "Some ".to_string(),
                    style: RunStyle::default(),
                },
                Run::Text {
                    text: "bold".to_string(),
                    style: RunStyle {
                        bold: true,
                        ..RunStyle::default()
                    },
                },
                Run::Text {
                    text: " and ".to_string(),
                    style: RunStyle::default(),
                },
                Run::Text {
                    text: "italic".to_string(),
                    style: RunStyle {
                        italic: true,
                        ..RunStyle::default()
                    },
                },
                Run::Text {
                    text: " text.".to_string(),
                    style: RunStyle::default(),
                },
            ]
        );
    }

    #[test]
    fn unmatched_delimiter_stays_literal() {
        let runs = format_line("a * b");
        assert_eq!(
            runs,
            vec![Run::Text {
                text: "a * b".to_string(),
                style: RunStyle::default(),
            }]
        );
    }

    #[test]
    fn code_interior_is_never_emphasized() {
        let runs = format_line("`**not bold**`");
        assert_eq!(
            runs,
            vec![Run::Text {
                text: "**not bold**".to_string(),
                style: RunStyle {
                    code: true,
                    ..RunStyle::default()
                },
            }]
        );
    }

    #[test]
    fn nested_emphasis_combines_flags() {
        let runs = format_line("**bold *both***");
        assert_eq!(
            runs,
            vec![
                Run::Text {
                    text: "bold ".to_string(),
                    style: RunStyle {
                        bold: true,
                        ..RunStyle::default()
                    },
                },
                Run::Text {
                    text: "both".to_string(),
                    style: RunStyle {
                        bold: true,
                        italic: true,
                        code: false,
                    },
                },
            ]
        );
    }

    #[test]
    fn triple_emphasis_is_bold_italic() {
        let runs = format_line("***both***");
        assert_eq!(runs.len(), 1);
        match &runs[0] {
            Run::Text { text, style } => {
                assert_eq!(text, "both");
                assert!(style.bold && style.italic);
            }
            other => panic!("expected text run, got {other:?}"),
        }
    }

    #[test]
    fn link_becomes_display_text_with_url() {
        let runs = format_line("see [the site](https://example.com) now");
        assert_eq!(
            runs[1],
            Run::Link {
                text: "the site".to_string(),
                url: "https://example.com".to_string(),
                style: RunStyle::default(),
            }
        );
        assert_eq!(concat(&runs), "see the site now");
    }

    #[test]
    fn interior_whitespace_is_preserved() {
        let runs = format_line("a  spaced   out line");
        assert_eq!(concat(&runs), "a  spaced   out line");
    }

    #[test]
    fn formatting_is_pure() {
        let first = format_line("mix of **b** and `c`");
        let second = format_line("mix of **b** and `c`");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_yields_no_runs() {
        assert!(format_line("").is_empty());
    }
}
