//! Turning conversation messages into displayable content.
//!
//! User text is shown literally. Assistant text is read as markdown and
//! sanitized into a [`DisplayNode`] tree; raw HTML in the source never
//! survives as markup.

mod markdown;
mod node;
mod sanitize;

pub use node::{DisplayNode, escape_html};
pub use sanitize::{ALLOWED_SCHEMES, is_safe_url};

use crate::conversation::{Message, MessageRole};
use thiserror::Error;
use tracing::warn;

/// Markdown could not be turned into a display tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Unbalanced markdown event stream")]
    Unbalanced,
}

/// Converts messages into display trees according to their trust level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentRenderer;

impl ContentRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Renders a message for display.
    ///
    /// Never fails: if assistant markdown cannot be processed the content is
    /// shown literally instead.
    pub fn render(&self, message: &Message) -> DisplayNode {
        match message.role() {
            MessageRole::User => DisplayNode::literal(message.content()),
            MessageRole::Assistant => match self.render_markdown(message.content()) {
                Ok(node) => node,
                Err(err) => {
                    warn!(error = %err, "Falling back to literal rendering");
                    DisplayNode::literal(message.content())
                }
            },
        }
    }

    /// Parses and sanitizes assistant markdown.
    pub fn render_markdown(&self, content: &str) -> Result<DisplayNode, RenderError> {
        markdown::parse(content)
    }
}
