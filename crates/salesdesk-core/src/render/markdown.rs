//! Markdown to display tree conversion.

use super::RenderError;
use super::node::DisplayNode;
use super::sanitize::{HtmlNeutralizer, is_safe_url};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag};

/// Parses `content` as markdown into a sanitized [`DisplayNode::Document`].
pub(crate) fn parse(content: &str) -> Result<DisplayNode, RenderError> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut neutralizer = HtmlNeutralizer::new();
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(content, options) {
        if let Some(event) = neutralizer.apply(event) {
            builder.push(event)?;
        }
    }
    builder.finish()
}

#[derive(Debug)]
enum Frame {
    Root,
    Paragraph,
    Heading(u8),
    BlockQuote,
    List(Option<u64>),
    Item,
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    HtmlBlock,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        href: String,
        title: Option<String>,
    },
    Image {
        src: String,
        title: Option<String>,
        alt: String,
    },
    /// Constructs without a display counterpart; children are kept inline.
    Transparent,
}

#[derive(Debug)]
struct Open {
    frame: Frame,
    children: Vec<DisplayNode>,
}

enum Closed {
    Node(DisplayNode),
    Splice(Vec<DisplayNode>),
    Drop,
}

struct TreeBuilder {
    stack: Vec<Open>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Open {
                frame: Frame::Root,
                children: Vec::new(),
            }],
        }
    }

    fn push(&mut self, event: Event<'_>) -> Result<(), RenderError> {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(_) => self.close()?,
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline(DisplayNode::Code(code.to_string())),
            Event::SoftBreak => self.inline(DisplayNode::SoftBreak),
            Event::HardBreak => self.inline(DisplayNode::LineBreak),
            Event::Rule => self.inline(DisplayNode::Rule),
            Event::TaskListMarker(checked) => self.inline(DisplayNode::TaskMarker { checked }),
            Event::FootnoteReference(label) => self.text(&format!("[^{label}]")),
            // Raw HTML was already turned into text by the neutralizer.
            _ => {}
        }
        Ok(())
    }

    fn open(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph,
            Tag::Heading { level, .. } => Frame::Heading(level as u8),
            Tag::BlockQuote(..) => Frame::BlockQuote,
            Tag::CodeBlock(kind) => Frame::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                },
                code: String::new(),
            },
            Tag::HtmlBlock => Frame::HtmlBlock,
            Tag::List(start) => Frame::List(start),
            Tag::Item => Frame::Item,
            Tag::Table(..) => Frame::Table,
            Tag::TableHead => Frame::TableHead,
            Tag::TableRow => Frame::TableRow,
            Tag::TableCell => Frame::TableCell,
            Tag::Emphasis => Frame::Emphasis,
            Tag::Strong => Frame::Strong,
            Tag::Strikethrough => Frame::Strikethrough,
            Tag::Link {
                dest_url, title, ..
            } => Frame::Link {
                href: dest_url.to_string(),
                title: non_empty(title),
            },
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                src: dest_url.to_string(),
                title: non_empty(title),
                alt: String::new(),
            },
            _ => Frame::Transparent,
        };
        self.stack.push(Open {
            frame,
            children: Vec::new(),
        });
    }

    fn close(&mut self) -> Result<(), RenderError> {
        if self.stack.len() <= 1 {
            return Err(RenderError::Unbalanced);
        }
        let Some(open) = self.stack.pop() else {
            return Err(RenderError::Unbalanced);
        };
        match close_frame(open) {
            Closed::Node(node) => self.top().children.push(node),
            Closed::Splice(nodes) => {
                for node in nodes {
                    self.inline(node);
                }
            }
            Closed::Drop => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        let top = self.top();
        match &mut top.frame {
            Frame::CodeBlock { code, .. } => code.push_str(text),
            Frame::Image { alt, .. } => alt.push_str(text),
            _ => {
                if let Some(DisplayNode::Text(last)) = top.children.last_mut() {
                    last.push_str(text);
                } else {
                    top.children.push(DisplayNode::Text(text.to_string()));
                }
            }
        }
    }

    fn inline(&mut self, node: DisplayNode) {
        // Image alt text and code blocks only collect plain text.
        let text_only = matches!(
            self.top().frame,
            Frame::Image { .. } | Frame::CodeBlock { .. }
        );
        match node {
            DisplayNode::SoftBreak if text_only => self.text(" "),
            DisplayNode::Text(text) => self.text(&text),
            node if text_only => {
                let plain = node.plain_text();
                self.text(&plain);
            }
            node => self.top().children.push(node),
        }
    }

    fn top(&mut self) -> &mut Open {
        // The root frame is never popped.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn finish(mut self) -> Result<DisplayNode, RenderError> {
        if self.stack.len() != 1 {
            return Err(RenderError::Unbalanced);
        }
        let root = self.stack.remove(0);
        Ok(DisplayNode::Document(root.children))
    }
}

fn close_frame(open: Open) -> Closed {
    let Open { frame, children } = open;
    match frame {
        Frame::Root | Frame::Transparent => Closed::Splice(children),
        Frame::Paragraph | Frame::HtmlBlock => {
            if children.iter().all(is_blank) {
                Closed::Drop
            } else {
                Closed::Node(DisplayNode::Paragraph(children))
            }
        }
        Frame::Heading(level) => Closed::Node(DisplayNode::Heading { level, children }),
        Frame::BlockQuote => Closed::Node(DisplayNode::BlockQuote(children)),
        Frame::List(start) => Closed::Node(DisplayNode::List {
            start,
            items: children,
        }),
        Frame::Item => Closed::Node(DisplayNode::ListItem(children)),
        Frame::CodeBlock { language, code } => Closed::Node(DisplayNode::CodeBlock { language, code }),
        Frame::Table => Closed::Node(DisplayNode::Table(children)),
        Frame::TableHead => Closed::Node(DisplayNode::TableHead(children)),
        Frame::TableRow => Closed::Node(DisplayNode::TableRow(children)),
        Frame::TableCell => Closed::Node(DisplayNode::TableCell(children)),
        Frame::Emphasis => Closed::Node(DisplayNode::Emphasis(children)),
        Frame::Strong => Closed::Node(DisplayNode::Strong(children)),
        Frame::Strikethrough => Closed::Node(DisplayNode::Strikethrough(children)),
        Frame::Link { href, title } => {
            if is_safe_url(&href) {
                Closed::Node(DisplayNode::Link {
                    href,
                    title,
                    children,
                })
            } else {
                tracing::debug!(href = %href, "Dropping link with disallowed scheme");
                Closed::Splice(children)
            }
        }
        Frame::Image { src, title, alt } => {
            if is_safe_url(&src) {
                Closed::Node(DisplayNode::Image { src, alt, title })
            } else if alt.is_empty() {
                Closed::Drop
            } else {
                Closed::Node(DisplayNode::Text(alt))
            }
        }
    }
}

fn is_blank(node: &DisplayNode) -> bool {
    match node {
        DisplayNode::Text(text) => text.trim().is_empty(),
        DisplayNode::SoftBreak | DisplayNode::LineBreak => true,
        _ => false,
    }
}

fn non_empty(value: CowStr<'_>) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
