//! Display tree produced by the content renderer.
//!
//! The tree has no representation for raw HTML, attributes or event
//! handlers. Anything it can express is safe to display, and
//! [`DisplayNode::to_html`] only ever emits allow-listed tags with escaped
//! text and attribute values.

use std::fmt::Write as _;

/// A node of the structured, sanitized display tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayNode {
    Document(Vec<DisplayNode>),
    Paragraph(Vec<DisplayNode>),
    Heading {
        level: u8,
        children: Vec<DisplayNode>,
    },
    BlockQuote(Vec<DisplayNode>),
    List {
        /// `Some(n)` for ordered lists starting at `n`.
        start: Option<u64>,
        items: Vec<DisplayNode>,
    },
    ListItem(Vec<DisplayNode>),
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    Table(Vec<DisplayNode>),
    TableHead(Vec<DisplayNode>),
    TableRow(Vec<DisplayNode>),
    TableCell(Vec<DisplayNode>),
    Emphasis(Vec<DisplayNode>),
    Strong(Vec<DisplayNode>),
    Strikethrough(Vec<DisplayNode>),
    Link {
        href: String,
        title: Option<String>,
        children: Vec<DisplayNode>,
    },
    Image {
        src: String,
        alt: String,
        title: Option<String>,
    },
    Code(String),
    Text(String),
    TaskMarker {
        checked: bool,
    },
    SoftBreak,
    LineBreak,
    Rule,
}

impl DisplayNode {
    /// A document showing `text` verbatim, without any interpretation.
    pub fn literal(text: impl Into<String>) -> Self {
        DisplayNode::Document(vec![DisplayNode::Paragraph(vec![DisplayNode::Text(
            text.into(),
        )])])
    }

    /// Child nodes of container variants; empty for leaves.
    pub fn children(&self) -> &[DisplayNode] {
        match self {
            DisplayNode::Document(children)
            | DisplayNode::Paragraph(children)
            | DisplayNode::Heading { children, .. }
            | DisplayNode::BlockQuote(children)
            | DisplayNode::List {
                items: children, ..
            }
            | DisplayNode::ListItem(children)
            | DisplayNode::Table(children)
            | DisplayNode::TableHead(children)
            | DisplayNode::TableRow(children)
            | DisplayNode::TableCell(children)
            | DisplayNode::Emphasis(children)
            | DisplayNode::Strong(children)
            | DisplayNode::Strikethrough(children)
            | DisplayNode::Link { children, .. } => children,
            _ => &[],
        }
    }

    /// Serializes the tree to an HTML fragment.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Flattens the tree to readable plain text (terminal display).
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out, 0);
        out.trim_end().to_string()
    }

    fn write_html(&self, out: &mut String) {
        match self {
            DisplayNode::Document(children) => write_children_html(children, out),
            DisplayNode::Paragraph(children) => wrap_html("p", children, out),
            DisplayNode::Heading { level, children } => {
                let tag = format!("h{}", (*level).clamp(1, 6));
                wrap_html(&tag, children, out);
            }
            DisplayNode::BlockQuote(children) => wrap_html("blockquote", children, out),
            DisplayNode::List { start, items } => match start {
                Some(1) => wrap_html("ol", items, out),
                Some(n) => {
                    let _ = write!(out, "<ol start=\"{n}\">");
                    write_children_html(items, out);
                    out.push_str("</ol>");
                }
                None => wrap_html("ul", items, out),
            },
            DisplayNode::ListItem(children) => wrap_html("li", children, out),
            DisplayNode::CodeBlock { language, code } => {
                out.push_str("<pre><code");
                if let Some(lang) = language.as_deref().filter(|l| is_safe_language(l)) {
                    let _ = write!(out, " class=\"language-{lang}\"");
                }
                out.push('>');
                out.push_str(&escape_html(code));
                out.push_str("</code></pre>");
            }
            DisplayNode::Table(children) => {
                out.push_str("<table>");
                let mut body_open = false;
                for child in children {
                    match child {
                        DisplayNode::TableHead(_) => child.write_html(out),
                        _ => {
                            if !body_open {
                                out.push_str("<tbody>");
                                body_open = true;
                            }
                            child.write_html(out);
                        }
                    }
                }
                if body_open {
                    out.push_str("</tbody>");
                }
                out.push_str("</table>");
            }
            DisplayNode::TableHead(cells) => {
                out.push_str("<thead><tr>");
                for cell in cells {
                    wrap_html("th", cell.children(), out);
                }
                out.push_str("</tr></thead>");
            }
            DisplayNode::TableRow(cells) => {
                out.push_str("<tr>");
                for cell in cells {
                    wrap_html("td", cell.children(), out);
                }
                out.push_str("</tr>");
            }
            DisplayNode::TableCell(children) => wrap_html("td", children, out),
            DisplayNode::Emphasis(children) => wrap_html("em", children, out),
            DisplayNode::Strong(children) => wrap_html("strong", children, out),
            DisplayNode::Strikethrough(children) => wrap_html("del", children, out),
            DisplayNode::Link {
                href,
                title,
                children,
            } => {
                let _ = write!(out, "<a href=\"{}\"", escape_html(href));
                if let Some(title) = title {
                    let _ = write!(out, " title=\"{}\"", escape_html(title));
                }
                out.push_str(" rel=\"noopener noreferrer nofollow\">");
                write_children_html(children, out);
                out.push_str("</a>");
            }
            DisplayNode::Image { src, alt, title } => {
                let _ = write!(
                    out,
                    "<img src=\"{}\" alt=\"{}\"",
                    escape_html(src),
                    escape_html(alt)
                );
                if let Some(title) = title {
                    let _ = write!(out, " title=\"{}\"", escape_html(title));
                }
                out.push('>');
            }
            DisplayNode::Code(code) => {
                out.push_str("<code>");
                out.push_str(&escape_html(code));
                out.push_str("</code>");
            }
            DisplayNode::Text(text) => out.push_str(&escape_html(text)),
            DisplayNode::TaskMarker { checked } => {
                out.push_str("<input type=\"checkbox\" disabled");
                if *checked {
                    out.push_str(" checked");
                }
                out.push('>');
            }
            DisplayNode::SoftBreak => out.push('\n'),
            DisplayNode::LineBreak => out.push_str("<br>"),
            DisplayNode::Rule => out.push_str("<hr>"),
        }
    }

    fn write_plain(&self, out: &mut String, depth: usize) {
        match self {
            DisplayNode::Document(children) => {
                for child in children {
                    child.write_plain(out, depth);
                }
            }
            DisplayNode::Paragraph(children) => {
                write_children_plain(children, out, depth);
                end_block(out);
            }
            DisplayNode::Heading { level, children } => {
                out.push_str(&"#".repeat(usize::from((*level).clamp(1, 6))));
                out.push(' ');
                write_children_plain(children, out, depth);
                end_block(out);
            }
            DisplayNode::BlockQuote(children) => {
                let mut inner = String::new();
                for child in children {
                    child.write_plain(&mut inner, depth);
                }
                for line in inner.trim_end().lines() {
                    out.push_str("> ");
                    out.push_str(line);
                    out.push('\n');
                }
                end_block(out);
            }
            DisplayNode::List { start, items } => {
                let indent = "  ".repeat(depth);
                for (index, item) in items.iter().enumerate() {
                    let marker = match start {
                        Some(first) => format!("{}. ", first + index as u64),
                        None => "- ".to_string(),
                    };
                    let mut inner = String::new();
                    item.write_plain(&mut inner, depth + 1);
                    out.push_str(&indent);
                    out.push_str(&marker);
                    out.push_str(inner.trim());
                    out.push('\n');
                }
                if depth == 0 {
                    end_block(out);
                }
            }
            DisplayNode::ListItem(children) => {
                for child in children {
                    if matches!(child, DisplayNode::List { .. }) && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    child.write_plain(out, depth);
                }
            }
            DisplayNode::CodeBlock { code, .. } => {
                for line in code.trim_end_matches('\n').lines() {
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
                end_block(out);
            }
            DisplayNode::Table(rows) => {
                for row in rows {
                    let cells: Vec<String> = row
                        .children()
                        .iter()
                        .map(|cell| {
                            let mut text = String::new();
                            write_children_plain(cell.children(), &mut text, depth);
                            text
                        })
                        .collect();
                    out.push_str(&cells.join(" | "));
                    out.push('\n');
                }
                end_block(out);
            }
            DisplayNode::TableHead(children)
            | DisplayNode::TableRow(children)
            | DisplayNode::TableCell(children)
            | DisplayNode::Emphasis(children)
            | DisplayNode::Strong(children)
            | DisplayNode::Strikethrough(children) => write_children_plain(children, out, depth),
            DisplayNode::Link { href, children, .. } => {
                let mut label = String::new();
                write_children_plain(children, &mut label, depth);
                if label.is_empty() || label == *href {
                    out.push_str(href);
                } else {
                    let _ = write!(out, "{label} ({href})");
                }
            }
            DisplayNode::Image { alt, .. } => {
                let _ = write!(out, "[image: {alt}]");
            }
            DisplayNode::Code(code) => {
                let _ = write!(out, "`{code}`");
            }
            DisplayNode::Text(text) => out.push_str(text),
            DisplayNode::TaskMarker { checked } => {
                out.push_str(if *checked { "[x] " } else { "[ ] " });
            }
            DisplayNode::SoftBreak => out.push(' '),
            DisplayNode::LineBreak => out.push('\n'),
            DisplayNode::Rule => {
                out.push_str("---");
                end_block(out);
            }
        }
    }
}

/// Escapes text for use in HTML element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn is_safe_language(lang: &str) -> bool {
    !lang.is_empty()
        && lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

fn wrap_html(tag: &str, children: &[DisplayNode], out: &mut String) {
    let _ = write!(out, "<{tag}>");
    write_children_html(children, out);
    let _ = write!(out, "</{tag}>");
}

fn write_children_html(children: &[DisplayNode], out: &mut String) {
    for child in children {
        child.write_html(out);
    }
}

fn write_children_plain(children: &[DisplayNode], out: &mut String, depth: usize) {
    for child in children {
        child.write_plain(out, depth);
    }
}

fn end_block(out: &mut String) {
    if out.is_empty() {
        return;
    }
    while !out.ends_with("\n\n") {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_literal_to_html_is_escaped() {
        let node = DisplayNode::literal("<script>alert(1)</script>");
        assert_eq!(
            node.to_html(),
            "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_link_html_has_rel_and_escaped_href() {
        let node = DisplayNode::Link {
            href: "https://example.com/?a=1&b=\"2\"".to_string(),
            title: None,
            children: vec![DisplayNode::Text("site".to_string())],
        };
        assert_eq!(
            node.to_html(),
            "<a href=\"https://example.com/?a=1&amp;b=&quot;2&quot;\" rel=\"noopener noreferrer nofollow\">site</a>"
        );
    }

    #[test]
    fn test_code_block_drops_suspicious_language_class() {
        let node = DisplayNode::CodeBlock {
            language: Some("js\" onmouseover=\"x".to_string()),
            code: "1 < 2".to_string(),
        };
        assert_eq!(node.to_html(), "<pre><code>1 &lt; 2</code></pre>");
    }

    #[test]
    fn test_table_html_structure() {
        let cell = |t: &str| DisplayNode::TableCell(vec![DisplayNode::Text(t.to_string())]);
        let node = DisplayNode::Table(vec![
            DisplayNode::TableHead(vec![cell("Item"), cell("Revenue")]),
            DisplayNode::TableRow(vec![cell("Laptop"), cell("$1,200")]),
        ]);
        assert_eq!(
            node.to_html(),
            "<table><thead><tr><th>Item</th><th>Revenue</th></tr></thead>\
             <tbody><tr><td>Laptop</td><td>$1,200</td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_plain_text_list_and_link() {
        let node = DisplayNode::Document(vec![
            DisplayNode::Heading {
                level: 2,
                children: vec![DisplayNode::Text("Top items".to_string())],
            },
            DisplayNode::List {
                start: Some(1),
                items: vec![
                    DisplayNode::ListItem(vec![DisplayNode::Text("Laptop".to_string())]),
                    DisplayNode::ListItem(vec![DisplayNode::Link {
                        href: "https://example.com".to_string(),
                        title: None,
                        children: vec![DisplayNode::Text("Mouse".to_string())],
                    }]),
                ],
            },
        ]);

        assert_eq!(
            node.plain_text(),
            "## Top items\n\n1. Laptop\n2. Mouse (https://example.com)"
        );
    }
}
