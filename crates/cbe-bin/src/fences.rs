//! Code block discovery in a markdown document.
//!
//! Finds the blocks a host renderer would hand to the post-processor, with
//! the text its code element would contain and the opening fence line the
//! section context would report.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// 1-based line of the opening fence (or first indented line).
    pub source_line: usize,
    /// First word of the info string; empty for indented blocks.
    pub language: String,
    /// Opening fence line as written. `None` for indented blocks.
    pub fence_line: Option<String>,
    /// Code element text, including the final newline.
    pub content: String,
}

impl FencedBlock {
    /// Class list the host would put on the code element.
    pub fn classes(&self) -> Vec<String> {
        if self.language.is_empty() {
            Vec::new()
        } else {
            vec![format!("language-{}", self.language)]
        }
    }
}

pub fn discover(markdown: &str) -> Vec<FencedBlock> {
    let mut out = Vec::new();
    let mut current: Option<FencedBlock> = None;
    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let source_line = markdown[..range.start].matches('\n').count() + 1;
                let (language, fence_line) = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let language = info.split_whitespace().next().unwrap_or_default();
                        let line = markdown[range.start..]
                            .lines()
                            .next()
                            .unwrap_or_default()
                            .trim_end();
                        (language.to_owned(), Some(line.to_owned()))
                    }
                    CodeBlockKind::Indented => (String::new(), None),
                };
                current = Some(FencedBlock {
                    source_line,
                    language,
                    fence_line,
                    content: String::new(),
                });
            }
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.content.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    out.push(block);
                }
            }
            _ => {}
        }
    }
    tracing::debug!(target: "host.fences", blocks = out.len(), "fences_discovered");
    out
}
