//! Tree node → layout element.
//!
//! [`Renderer::render`] is a pure recursive walk. Text leaves that are blank
//! after trimming are elided; everything else, including tags outside the known
//! set, produces an element that keeps all rendered descendants.
//!
//! List items get special treatment: their inline content goes on one bullet
//! line, and any nested `ul`/`ol` children are emitted after that line, each in
//! an indentation wrapper, whatever their original position among the item's
//! children.

use crate::layout::{BlockRole, LayoutElement, TextRole};
use crate::styling::{StyleMatch, MAX_DEPTH_CEILING};
use crate::tree::{Child, Node, Tag};
use crate::EbookError;
use log::debug;

/// Renders tree nodes with a fixed style table.
pub struct Renderer<'s> {
    style: &'s StyleMatch,
    max_depth: usize,
}

impl<'s> Renderer<'s> {
    pub fn new(style: &'s StyleMatch) -> Self {
        Self {
            style,
            max_depth: style.depth_limit(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.min(MAX_DEPTH_CEILING);
        self
    }

    /// Renders one child under `key`.
    ///
    /// Returns `Ok(None)` for a blank text leaf. Fails only when the tree nests
    /// deeper than the configured limit.
    pub fn render(&self, child: &Child, key: &str) -> Result<Option<LayoutElement>, EbookError> {
        self.render_at(child, key, 0)
    }

    fn render_at(
        &self,
        child: &Child,
        key: &str,
        depth: usize,
    ) -> Result<Option<LayoutElement>, EbookError> {
        if depth > self.max_depth {
            return Err(EbookError::DepthExceeded {
                limit: self.max_depth,
                key: key.to_string(),
            });
        }

        match child {
            Child::Text(content) => {
                if content.trim().is_empty() {
                    return Ok(None);
                }
                Ok(Some(LayoutElement::text(key, content.clone())))
            }
            Child::Node(node) if node.tag == Tag::Li => {
                self.render_list_item(node, key, depth).map(Some)
            }
            Child::Node(node) => self.render_node(node, key, depth).map(Some),
        }
    }

    fn render_list_item(
        &self,
        node: &Node,
        key: &str,
        depth: usize,
    ) -> Result<LayoutElement, EbookError> {
        let mut inline = vec![LayoutElement::text(
            format!("{}-bullet", key),
            self.style.bullet.clone(),
        )];
        let mut nested = Vec::new();

        for (index, child) in node.children().iter().enumerate() {
            let child_key = format!("{}-{}", key, index);
            let is_nested_list = child.as_node().is_some_and(|n| n.tag.is_list());
            let rendered = self.render_at(child, &child_key, depth + 1)?;
            match rendered {
                Some(element) if is_nested_list => nested.push(element),
                Some(element) => inline.push(element),
                None => {}
            }
        }

        let mut children = Vec::with_capacity(1 + nested.len());
        children.push(LayoutElement::Inline {
            key: format!("{}-line", key),
            role: TextRole::BulletLine,
            style: self.style.list_text.clone(),
            children: inline,
        });
        children.extend(
            nested
                .into_iter()
                .enumerate()
                .map(|(index, list)| LayoutElement::Block {
                    key: index.to_string(),
                    role: BlockRole::NestedList,
                    style: self.style.nested_list.clone(),
                    children: vec![list],
                }),
        );

        Ok(LayoutElement::Block {
            key: key.to_string(),
            role: BlockRole::ListItem,
            style: self.style.list_item.clone(),
            children,
        })
    }

    fn render_node(&self, node: &Node, key: &str, depth: usize) -> Result<LayoutElement, EbookError> {
        let mut children = Vec::with_capacity(node.children().len());
        for (index, child) in node.children().iter().enumerate() {
            if let Some(element) = self.render_at(child, &index.to_string(), depth + 1)? {
                children.push(element);
            }
        }

        let key = key.to_string();
        let style = self.style;
        let block = |role: BlockRole, style: &crate::styling::BasicTextStyle, children| {
            LayoutElement::Block {
                key: key.clone(),
                role,
                style: style.clone(),
                children,
            }
        };
        let inline = |role: TextRole, style: &crate::styling::BasicTextStyle, children| {
            LayoutElement::Inline {
                key: key.clone(),
                role,
                style: style.clone(),
                children,
            }
        };

        let element = match &node.tag {
            Tag::Div => block(BlockRole::Div, &style.div, children),
            Tag::Ul => block(BlockRole::List { ordered: false }, &style.unordered_list, children),
            Tag::Ol => block(BlockRole::List { ordered: true }, &style.ordered_list, children),
            tag @ (Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4) => {
                let level = tag.heading_level().unwrap_or(4);
                inline(TextRole::Heading(level), style.heading(level), children)
            }
            Tag::P => inline(TextRole::Paragraph, &style.paragraph, children),
            Tag::Strong => inline(TextRole::Strong, &style.strong, children),
            Tag::Em => inline(TextRole::Emphasis, &style.emphasis, children),
            Tag::Span => inline(TextRole::Span, &style.span, children),
            Tag::Code => {
                let children = if style.pad_inline_code {
                    let mut padded = Vec::with_capacity(children.len() + 2);
                    padded.push(LayoutElement::text(format!("{}-pad-start", key), " "));
                    padded.extend(children);
                    padded.push(LayoutElement::text(format!("{}-pad-end", key), " "));
                    padded
                } else {
                    children
                };
                inline(TextRole::Code, &style.code, children)
            }
            Tag::A => LayoutElement::Link {
                key: key.clone(),
                href: node
                    .prop("href")
                    .filter(|href| !href.is_empty())
                    .unwrap_or("#")
                    .to_string(),
                style: style.link.clone(),
                children,
            },
            Tag::Hr => LayoutElement::Rule {
                key: key.clone(),
                style: style.horizontal_rule.clone(),
            },
            Tag::Unknown(name) => {
                debug!("Rendering unknown tag <{}> as a generic container", name);
                block(BlockRole::Fallback(name.clone()), &style.fallback, children)
            }
            // List items never reach this point; keep them as plain containers anyway.
            Tag::Li => block(BlockRole::ListItem, &style.list_item, children),
        };

        Ok(element)
    }
}
