use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::block::{Block, Span};

/// Result of tokenizing a markdown document.
#[derive(Debug)]
pub struct Parsed {
    pub blocks: Vec<Block>,
    /// Constructs that were rendered as literal text instead of dropped.
    pub degraded: usize,
}

/// Strip YAML frontmatter from the beginning of markdown content
fn strip_frontmatter(markdown: &str) -> &str {
    if !markdown.starts_with("---") {
        return markdown;
    }
    // Find the closing ---
    if let Some(end) = markdown[3..].find("\n---") {
        let after_frontmatter = &markdown[3 + end + 4..];
        after_frontmatter.trim_start_matches('\n')
    } else {
        markdown
    }
}

/// Parse markdown text into a flat list of blocks
pub fn parse(markdown: &str) -> Parsed {
    let markdown = strip_frontmatter(markdown);
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(markdown, options);
    let mut blocks = Vec::new();
    let mut state = ParseState::default();

    for event in parser {
        process_event(event, &mut state, &mut blocks);
    }

    Parsed {
        blocks,
        degraded: state.degraded,
    }
}

#[derive(Default)]
struct ParseState {
    // Current inline content being built
    spans: Vec<Span>,
    // Nested span buffers for bold/italic/link interiors
    span_stack: Vec<Vec<Span>>,

    // Current heading level (if in a heading)
    heading_level: Option<u8>,

    // Code block state
    in_code_block: bool,
    code_language: Option<String>,
    code_content: String,

    // Link state
    link_url: Option<String>,

    // Blockquote depth
    quote_depth: usize,

    // List state
    list_stack: Vec<ListLevel>,

    // Table state
    in_table: bool,
    in_table_head: bool,
    table_header: Vec<Vec<Span>>,
    table_rows: Vec<Vec<Vec<Span>>>,
    current_row: Vec<Vec<Span>>,

    degraded: usize,
}

/// One list that is open while walking the event stream.
struct ListLevel {
    ordered: bool,
    item: Vec<Span>,
    checked: Option<bool>,
}

/// Emit the list item currently being collected, if it has any content.
///
/// Called when an item ends, and also when a nested list starts so the
/// parent item's text lands before its children.
fn flush_open_item(state: &mut ParseState, blocks: &mut Vec<Block>) {
    let depth = match state.list_stack.len() {
        0 => return,
        n => n - 1,
    };
    let pending = std::mem::take(&mut state.spans);
    let Some(level) = state.list_stack.last_mut() else {
        return;
    };
    level.item.extend(pending);
    if level.item.is_empty() {
        return;
    }
    let mut content = std::mem::take(&mut level.item);
    while matches!(content.last(), Some(Span::LineBreak)) {
        content.pop();
    }
    blocks.push(Block::ListItem {
        ordered: level.ordered,
        depth,
        checked: level.checked.take(),
        content,
    });
}

fn is_page_break(content: &[Span]) -> bool {
    matches!(content, [Span::Text(text)] if text.trim() == "---pagebreak---")
}

fn process_event(event: Event, state: &mut ParseState, blocks: &mut Vec<Block>) {
    match event {
        // Headings
        Event::Start(Tag::Heading { level, .. }) => {
            state.heading_level = Some(heading_level_to_u8(level));
        }
        Event::End(TagEnd::Heading(_)) => {
            if let Some(level) = state.heading_level.take() {
                let content = std::mem::take(&mut state.spans);
                blocks.push(Block::Heading { level, content });
            }
        }

        // Paragraphs
        Event::Start(Tag::Paragraph) => {}
        Event::End(TagEnd::Paragraph) => {
            let content = std::mem::take(&mut state.spans);
            if content.is_empty() {
                return;
            }
            // Check for manual page break marker
            if is_page_break(&content) {
                blocks.push(Block::PageBreak);
                return;
            }
            if let Some(level) = state.list_stack.last_mut() {
                // Loose list item: keep collecting, separated by a break
                if !level.item.is_empty() {
                    level.item.push(Span::LineBreak);
                }
                level.item.extend(content);
            } else if state.in_table {
                // Cells collect their own spans
            } else if state.quote_depth > 0 {
                blocks.push(Block::BlockQuote { content });
            } else {
                blocks.push(Block::Paragraph { content });
            }
        }

        // Text content
        Event::Text(text) => {
            if state.in_code_block {
                state.code_content.push_str(&text);
            } else {
                state.spans.push(Span::Text(text.into_string()));
            }
        }

        // Inline code
        Event::Code(code) => {
            state.spans.push(Span::Code(code.into_string()));
        }

        // Bold
        Event::Start(Tag::Strong) => {
            state.span_stack.push(std::mem::take(&mut state.spans));
        }
        Event::End(TagEnd::Strong) => {
            let inner = std::mem::take(&mut state.spans);
            if let Some(mut parent) = state.span_stack.pop() {
                parent.push(Span::Bold(inner));
                state.spans = parent;
            }
        }

        // Italic
        Event::Start(Tag::Emphasis) => {
            state.span_stack.push(std::mem::take(&mut state.spans));
        }
        Event::End(TagEnd::Emphasis) => {
            let inner = std::mem::take(&mut state.spans);
            if let Some(mut parent) = state.span_stack.pop() {
                parent.push(Span::Italic(inner));
                state.spans = parent;
            }
        }

        // Links
        Event::Start(Tag::Link { dest_url, .. }) => {
            state.link_url = Some(dest_url.into_string());
            state.span_stack.push(std::mem::take(&mut state.spans));
        }
        Event::End(TagEnd::Link) => {
            let inner = std::mem::take(&mut state.spans);
            if let Some(mut parent) = state.span_stack.pop() {
                if let Some(url) = state.link_url.take() {
                    parent.push(Span::Link {
                        url,
                        content: inner,
                    });
                }
                state.spans = parent;
            }
        }

        // Images cannot be embedded; keep the alt text
        Event::Start(Tag::Image { .. }) => {
            state.span_stack.push(std::mem::take(&mut state.spans));
        }
        Event::End(TagEnd::Image) => {
            let alt = std::mem::take(&mut state.spans);
            if let Some(mut parent) = state.span_stack.pop() {
                parent.extend(alt);
                state.spans = parent;
            }
            state.degraded += 1;
        }

        // Code blocks
        Event::Start(Tag::CodeBlock(kind)) => {
            state.in_code_block = true;
            state.code_language = match kind {
                CodeBlockKind::Fenced(lang) => {
                    let lang = lang.into_string();
                    if lang.is_empty() { None } else { Some(lang) }
                }
                CodeBlockKind::Indented => None,
            };
            state.code_content.clear();
        }
        Event::End(TagEnd::CodeBlock) => {
            state.in_code_block = false;
            let content = std::mem::take(&mut state.code_content);
            let language = state.code_language.take();
            flush_open_item(state, blocks);
            blocks.push(Block::CodeBlock { language, content });
        }

        // Lists
        Event::Start(Tag::List(first_item)) => {
            flush_open_item(state, blocks);
            state.list_stack.push(ListLevel {
                ordered: first_item.is_some(),
                item: Vec::new(),
                checked: None,
            });
        }
        Event::End(TagEnd::List(_)) => {
            state.list_stack.pop();
        }

        Event::Start(Tag::Item) => {
            if let Some(level) = state.list_stack.last_mut() {
                level.item.clear();
                level.checked = None;
            }
        }
        Event::End(TagEnd::Item) => {
            flush_open_item(state, blocks);
        }

        // Task list checkboxes
        Event::TaskListMarker(checked) => {
            if let Some(level) = state.list_stack.last_mut() {
                level.checked = Some(checked);
            }
        }

        // Blockquotes
        Event::Start(Tag::BlockQuote(_)) => {
            state.quote_depth += 1;
        }
        Event::End(TagEnd::BlockQuote(_)) => {
            state.quote_depth = state.quote_depth.saturating_sub(1);
        }

        // Tables
        Event::Start(Tag::Table(_)) => {
            state.in_table = true;
            state.table_header.clear();
            state.table_rows.clear();
        }
        Event::End(TagEnd::Table) => {
            state.in_table = false;
            let header = std::mem::take(&mut state.table_header);
            let rows = std::mem::take(&mut state.table_rows);
            blocks.push(Block::Table { header, rows });
        }

        Event::Start(Tag::TableHead) => {
            state.in_table_head = true;
            state.current_row.clear();
        }
        Event::End(TagEnd::TableHead) => {
            state.in_table_head = false;
            state.table_header = std::mem::take(&mut state.current_row);
        }

        Event::Start(Tag::TableRow) => {
            state.current_row.clear();
        }
        Event::End(TagEnd::TableRow) => {
            if !state.in_table_head {
                let row = std::mem::take(&mut state.current_row);
                state.table_rows.push(row);
            }
        }

        Event::Start(Tag::TableCell) => {
            state.spans.clear();
        }
        Event::End(TagEnd::TableCell) => {
            let cell = std::mem::take(&mut state.spans);
            state.current_row.push(cell);
        }

        // Horizontal rule
        Event::Rule => {
            blocks.push(Block::Rule);
        }

        // Soft/hard breaks
        Event::SoftBreak => {
            state.spans.push(Span::Text(" ".to_string()));
        }
        Event::HardBreak => {
            state.spans.push(Span::LineBreak);
        }

        // Raw HTML is not rendered; keep it as visible literal text
        Event::Html(html) | Event::InlineHtml(html) => {
            state.spans.push(Span::Text(html.into_string()));
            state.degraded += 1;
        }
        Event::End(TagEnd::HtmlBlock) => {
            let content = std::mem::take(&mut state.spans);
            if !content.is_empty() {
                blocks.push(Block::Paragraph { content });
            }
        }

        Event::FootnoteReference(name) => {
            state.spans.push(Span::Text(format!("[^{name}]")));
            state.degraded += 1;
        }

        // Ignore other events
        _ => {}
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(md: &str) -> Vec<Block> {
        parse(md).blocks
    }

    fn text(s: &str) -> Vec<Span> {
        vec![Span::Text(s.to_string())]
    }

    #[test]
    fn heading_levels() {
        assert_eq!(
            blocks("# One\n\n### Three"),
            vec![
                Block::Heading {
                    level: 1,
                    content: text("One")
                },
                Block::Heading {
                    level: 3,
                    content: text("Three")
                },
            ]
        );
    }

    #[test]
    fn nested_list_depths() {
        let parsed = blocks("- a\n  - b\n  - c\n- d\n");
        let depths: Vec<(usize, bool)> = parsed
            .iter()
            .map(|b| match b {
                Block::ListItem { depth, ordered, .. } => (*depth, *ordered),
                other => panic!("expected list item, got {other:?}"),
            })
            .collect();
        assert_eq!(depths, vec![(0, false), (1, false), (1, false), (0, false)]);
    }

    #[test]
    fn ordered_list_items() {
        let parsed = blocks("1. one\n2. two\n");
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(|b| matches!(
            b,
            Block::ListItem {
                ordered: true,
                depth: 0,
                ..
            }
        )));
    }

    #[test]
    fn paragraph_splits_two_lists() {
        let parsed = blocks("- a\n\ntext\n\n- b\n");
        assert!(matches!(parsed[0], Block::ListItem { .. }));
        assert!(matches!(parsed[1], Block::Paragraph { .. }));
        assert!(matches!(parsed[2], Block::ListItem { .. }));
    }

    #[test]
    fn blockquote_paragraphs() {
        let parsed = blocks("> quoted words\n");
        assert_eq!(
            parsed,
            vec![Block::BlockQuote {
                content: text("quoted words")
            }]
        );
    }

    #[test]
    fn code_block_keeps_content_literal() {
        let parsed = blocks("```rust\nlet x = **1**;\n```");
        assert_eq!(
            parsed,
            vec![Block::CodeBlock {
                language: Some("rust".to_string()),
                content: "let x = **1**;\n".to_string(),
            }]
        );
    }

    #[test]
    fn page_break_marker() {
        let parsed = blocks("before\n\n---pagebreak---\n\nafter\n");
        assert_eq!(parsed[1], Block::PageBreak);
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn frontmatter_is_stripped() {
        let parsed = blocks("---\ntitle: Report\n---\n\n# Hello\n");
        assert_eq!(
            parsed,
            vec![Block::Heading {
                level: 1,
                content: text("Hello")
            }]
        );
    }

    #[test]
    fn table_header_and_rows() {
        let parsed = blocks("| A | B |\n|---|---|\n| 1 | 2 |\n");
        match &parsed[0] {
            Block::Table { header, rows } => {
                assert_eq!(header.len(), 2);
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0][1], text("2"));
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn task_list_markers() {
        let parsed = blocks("- [x] done\n- [ ] open\n");
        match (&parsed[0], &parsed[1]) {
            (
                Block::ListItem {
                    checked: Some(true),
                    ..
                },
                Block::ListItem {
                    checked: Some(false),
                    ..
                },
            ) => {}
            other => panic!("expected task items, got {other:?}"),
        }
    }

    #[test]
    fn links_keep_url_and_text() {
        let parsed = blocks("[site](https://example.com)\n");
        assert_eq!(
            parsed,
            vec![Block::Paragraph {
                content: vec![Span::Link {
                    url: "https://example.com".to_string(),
                    content: text("site"),
                }]
            }]
        );
    }

    #[test]
    fn raw_html_degrades_to_literal_text() {
        let parsed = parse("a <b>c</b> d\n");
        assert!(parsed.degraded > 0);
        match &parsed.blocks[0] {
            Block::Paragraph { content } => {
                let joined: String = content
                    .iter()
                    .map(|s| match s {
                        Span::Text(t) => t.as_str(),
                        _ => "",
                    })
                    .collect();
                assert_eq!(joined, "a <b>c</b> d");
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn hard_break_becomes_line_break() {
        let parsed = blocks("one  \ntwo\n");
        assert_eq!(
            parsed,
            vec![Block::Paragraph {
                content: vec![
                    Span::Text("one".to_string()),
                    Span::LineBreak,
                    Span::Text("two".to_string()),
                ]
            }]
        );
    }
}
