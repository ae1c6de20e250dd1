//! Markdown front end: source text → [`EbookDocument`].
//!
//! Parsing is delegated to comrak; this module only maps its AST onto the tag
//! tree the renderer understands. The body is a `div` holding the top-level
//! blocks, so every `##` heading of the source is a direct child of the body.
//!
//! Mapping notes:
//! - items of tight lists hold their inline content directly, without a `p`
//! - fenced and indented code becomes `pre` around a `code` run
//! - block quotes, strikethrough, images and tables keep their own tag names and
//!   are rendered as generic containers
//! - raw HTML is dropped
//! - the `title` of a YAML front matter block becomes the document title
//!
//! Nesting deeper than [`MAX_DEPTH_CEILING`] fails with `DepthExceeded` before any
//! tree is built for it, whatever `render.max_depth` says.

use crate::styling::MAX_DEPTH_CEILING;
use crate::tree::{Child, EbookDocument, Node, Tag};
use crate::EbookError;
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};
use log::debug;

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.front_matter_delimiter = Some("---".to_string());
    options
}

/// Parses Markdown into a document tree.
///
/// A malformed front matter block is a `ParseError`. Input nested deeper than
/// [`MAX_DEPTH_CEILING`] levels is a `DepthExceeded` error.
pub fn parse_markdown(source: &str) -> Result<EbookDocument, EbookError> {
    let arena = Arena::new();
    let options = default_comrak_options();
    let root = parse_document(&arena, source, &options);

    let mut title = None;
    let mut children = Vec::new();
    for node in root.children() {
        if let NodeValue::FrontMatter(raw) = &node.data.borrow().value {
            title = front_matter_title(raw)?;
            continue;
        }
        convert(node, &mut children, 0)?;
    }

    debug!(
        "Parsed Markdown into {} top-level node(s), title {:?}",
        children.len(),
        title
    );
    Ok(EbookDocument::new(
        title,
        Some(Node::with_children(Tag::Div, children)),
    ))
}

/// Extracts a non-blank `title` from a raw front matter block, delimiters included.
fn front_matter_title(raw: &str) -> Result<Option<String>, EbookError> {
    let yaml = raw
        .lines()
        .filter(|line| line.trim() != "---")
        .collect::<Vec<_>>()
        .join("\n");

    let value: serde_yaml::Value = serde_yaml::from_str(&yaml)
        .map_err(|e| EbookError::parse_error(format!("Invalid front matter: {}", e)))?;

    let title = match value.get("title") {
        Some(serde_yaml::Value::String(s)) => Some(s.clone()),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Ok(title.filter(|t| !t.trim().is_empty()))
}

/// Appends text, joining it to a preceding text leaf.
fn push_text(out: &mut Vec<Child>, text: &str) {
    match out.last_mut() {
        Some(Child::Text(last)) => last.push_str(text),
        _ => out.push(Child::text(text)),
    }
}

fn convert_children<'a>(
    node: &'a AstNode<'a>,
    out: &mut Vec<Child>,
    depth: usize,
) -> Result<(), EbookError> {
    for child in node.children() {
        convert(child, out, depth)?;
    }
    Ok(())
}

fn element<'a>(tag: Tag, node: &'a AstNode<'a>, depth: usize) -> Result<Node, EbookError> {
    let mut children = Vec::new();
    convert_children(node, &mut children, depth + 1)?;
    Ok(Node::with_children(tag, children))
}

/// Whether a paragraph sits directly in an item of a tight list.
fn in_tight_item<'a>(node: &'a AstNode<'a>) -> bool {
    let Some(item) = node.parent() else {
        return false;
    };
    if !matches!(item.data.borrow().value, NodeValue::Item(_)) {
        return false;
    }
    item.parent()
        .is_some_and(|list| matches!(&list.data.borrow().value, NodeValue::List(l) if l.tight))
}

fn convert<'a>(
    node: &'a AstNode<'a>,
    out: &mut Vec<Child>,
    depth: usize,
) -> Result<(), EbookError> {
    let data = node.data.borrow();
    if depth > MAX_DEPTH_CEILING {
        return Err(EbookError::DepthExceeded {
            limit: MAX_DEPTH_CEILING,
            key: format!("line {}", data.sourcepos.start.line),
        });
    }
    match &data.value {
        NodeValue::Text(text) => push_text(out, text),
        NodeValue::SoftBreak | NodeValue::LineBreak => push_text(out, " "),
        // Unwrapped content stays at the item's depth.
        NodeValue::Paragraph if in_tight_item(node) => convert_children(node, out, depth)?,
        NodeValue::Paragraph => out.push(element(Tag::P, node, depth)?.into()),
        NodeValue::Heading(heading) => {
            let tag = Tag::from_name(&format!("h{}", heading.level));
            out.push(element(tag, node, depth)?.into());
        }
        NodeValue::List(list) => {
            let tag = match list.list_type {
                ListType::Ordered => Tag::Ol,
                ListType::Bullet => Tag::Ul,
            };
            out.push(element(tag, node, depth)?.into());
        }
        NodeValue::Item(_) => out.push(element(Tag::Li, node, depth)?.into()),
        NodeValue::Emph => out.push(element(Tag::Em, node, depth)?.into()),
        NodeValue::Strong => out.push(element(Tag::Strong, node, depth)?.into()),
        NodeValue::Strikethrough => out.push(element(Tag::from_name("del"), node, depth)?.into()),
        NodeValue::BlockQuote => {
            out.push(element(Tag::from_name("blockquote"), node, depth)?.into());
        }
        NodeValue::Code(code) => {
            out.push(Node::with_children(Tag::Code, [code.literal.as_str()]).into());
        }
        NodeValue::CodeBlock(block) => {
            let code = Node::with_children(Tag::Code, [block.literal.trim_end_matches('\n')]);
            out.push(Node::with_children(Tag::from_name("pre"), vec![code]).into());
        }
        NodeValue::ThematicBreak => out.push(Node::new(Tag::Hr).into()),
        NodeValue::Link(link) => {
            let mut a = element(Tag::A, node, depth)?.with_prop("href", link.url.as_str());
            if !link.title.is_empty() {
                a = a.with_prop("title", link.title.as_str());
            }
            out.push(a.into());
        }
        NodeValue::Image(link) => {
            let img = element(Tag::from_name("img"), node, depth)?;
            out.push(img.with_prop("src", link.url.as_str()).into());
        }
        NodeValue::HtmlBlock(_) | NodeValue::HtmlInline(_) | NodeValue::FrontMatter(_) => {
            debug!("Dropping {} node", data.value.xml_node_name());
        }
        other => {
            let tag = Tag::from_name(other.xml_node_name());
            out.push(element(tag, node, depth)?.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(source: &str) -> Vec<Child> {
        let document = parse_markdown(source).unwrap();
        document.body.unwrap().children().to_vec()
    }

    fn tags(children: &[Child]) -> Vec<String> {
        children
            .iter()
            .map(|c| match c {
                Child::Text(t) => format!("{:?}", t),
                Child::Node(n) => n.tag.name().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_top_level_blocks() {
        let children = body("# Book\n\nIntro\n\n## One\n\nText\n\n---\n\n## Two\n");
        assert_eq!(tags(&children), vec!["h1", "p", "h2", "p", "hr", "h2"]);
        assert_eq!(children[2].as_node().unwrap().text_content(), "One");
        assert!(children[4].as_node().unwrap().children.is_none());
    }

    #[test]
    fn test_soft_breaks_join_text() {
        let children = body("first\nsecond");
        let p = children[0].as_node().unwrap();
        assert_eq!(p.children(), &[Child::text("first second")]);
    }

    #[test]
    fn test_tight_list_items_hold_inline_content() {
        let children = body("- a *b*\n  - nested\n- c\n");
        let ul = children[0].as_node().unwrap();
        assert_eq!(ul.tag, Tag::Ul);

        let first = ul.children()[0].as_node().unwrap();
        assert_eq!(tags(first.children()), vec!["\"a \"", "em", "ul"]);
    }

    #[test]
    fn test_loose_list_items_keep_paragraphs() {
        let children = body("1. a\n\n2. b\n");
        let ol = children[0].as_node().unwrap();
        assert_eq!(ol.tag, Tag::Ol);
        let first = ol.children()[0].as_node().unwrap();
        assert_eq!(tags(first.children()), vec!["p"]);
    }

    #[test]
    fn test_inline_elements() {
        let children = body("**b** `x` [l](https://example.com) ~~s~~");
        let p = children[0].as_node().unwrap();
        let names: Vec<&str> = p
            .children()
            .iter()
            .filter_map(Child::as_node)
            .map(|n| n.tag.name())
            .collect();
        assert_eq!(names, vec!["strong", "code", "a", "del"]);

        let link = p.children().iter().filter_map(Child::as_node).nth(2).unwrap();
        assert_eq!(link.prop("href"), Some("https://example.com"));
    }

    #[test]
    fn test_code_block_becomes_pre() {
        let children = body("```rust\nfn main() {}\n```\n");
        let pre = children[0].as_node().unwrap();
        assert_eq!(pre.tag, Tag::Unknown("pre".to_string()));
        let code = pre.children()[0].as_node().unwrap();
        assert_eq!(code.tag, Tag::Code);
        assert_eq!(code.text_content(), "fn main() {}");
    }

    #[test]
    fn test_front_matter_title() {
        let document = parse_markdown("---\ntitle: My Great Book\nauthor: Me\n---\n\n# Hi\n").unwrap();
        assert_eq!(document.title.as_deref(), Some("My Great Book"));
        assert_eq!(tags(document.body.unwrap().children()), vec!["h1"]);
    }

    #[test]
    fn test_missing_or_blank_title() {
        assert_eq!(parse_markdown("# Hi").unwrap().title, None);
        assert_eq!(parse_markdown("---\ntitle: \"  \"\n---\n").unwrap().title, None);
        assert_eq!(parse_markdown("---\nauthor: x\n---\n").unwrap().title, None);
    }

    #[test]
    fn test_invalid_front_matter_is_parse_error() {
        let result = parse_markdown("---\ntitle: [unclosed\n---\n\ntext\n");
        assert!(matches!(result, Err(EbookError::ParseError { .. })));
    }

    #[test]
    fn test_empty_source() {
        let document = parse_markdown("").unwrap();
        assert_eq!(document.title, None);
        assert!(document.body.unwrap().children().is_empty());
    }

    #[test]
    fn test_deep_block_quotes_are_rejected() {
        let source = format!("{}x", "> ".repeat(20_000));
        match parse_markdown(&source) {
            Err(EbookError::DepthExceeded { limit, key }) => {
                assert_eq!(limit, MAX_DEPTH_CEILING);
                assert_eq!(key, "line 1");
            }
            other => panic!("expected DepthExceeded, got {:?}", other.map(|d| d.title)),
        }
    }

    #[test]
    fn test_nesting_below_ceiling_parses() {
        let source = format!("{}x", "> ".repeat(100));
        let children = body(&source);
        assert_eq!(tags(&children), vec!["blockquote"]);
    }

    #[test]
    fn test_html_is_dropped() {
        let children = body("<div>raw</div>\n\ntext <b>x</b>\n");
        assert_eq!(tags(&children), vec!["p"]);
    }
}
