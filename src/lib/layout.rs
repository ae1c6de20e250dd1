//! Backend-neutral layout tree.
//!
//! This is what the renderer produces and what the PDF backend (or any other
//! print-layout consumer) reads. Every element carries the position key it was
//! rendered under and a resolved copy of its style attributes.

use crate::styling::BasicTextStyle;
use serde::Serialize;

/// Container kinds that stack their children vertically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockRole {
    Div,
    List { ordered: bool },
    ListItem,
    /// Indentation wrapper around a list nested inside a list item.
    NestedList,
    /// Container for a tag outside the known set; keeps the raw tag name.
    Fallback(String),
}

/// Text-flow kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    Heading(u8),
    Paragraph,
    /// Bullet glyph followed by a list item's inline content.
    BulletLine,
    Strong,
    Emphasis,
    Span,
    Code,
}

impl TextRole {
    /// Roles that open their own line when they appear at block level.
    pub fn starts_line(self) -> bool {
        matches!(
            self,
            TextRole::Heading(_) | TextRole::Paragraph | TextRole::BulletLine
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutElement {
    /// A text run, content kept exactly as in the source leaf.
    Text { key: String, content: String },
    Block {
        key: String,
        role: BlockRole,
        style: BasicTextStyle,
        children: Vec<LayoutElement>,
    },
    Inline {
        key: String,
        role: TextRole,
        style: BasicTextStyle,
        children: Vec<LayoutElement>,
    },
    Link {
        key: String,
        href: String,
        style: BasicTextStyle,
        children: Vec<LayoutElement>,
    },
    /// Horizontal rule; has no content.
    Rule { key: String, style: BasicTextStyle },
}

impl LayoutElement {
    pub fn text(key: impl Into<String>, content: impl Into<String>) -> Self {
        LayoutElement::Text {
            key: key.into(),
            content: content.into(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            LayoutElement::Text { key, .. }
            | LayoutElement::Block { key, .. }
            | LayoutElement::Inline { key, .. }
            | LayoutElement::Link { key, .. }
            | LayoutElement::Rule { key, .. } => key,
        }
    }

    pub fn children(&self) -> &[LayoutElement] {
        match self {
            LayoutElement::Block { children, .. }
            | LayoutElement::Inline { children, .. }
            | LayoutElement::Link { children, .. } => children,
            LayoutElement::Text { .. } | LayoutElement::Rule { .. } => &[],
        }
    }

    /// Concatenated text of every run below this element.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            LayoutElement::Text { content, .. } => out.push_str(content),
            other => {
                for child in other.children() {
                    child.collect_text(out);
                }
            }
        }
    }
}
