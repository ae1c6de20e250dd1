//! Human-readable and JSON views of an assembled layout, used by the CLI preview.

use crate::assemble::{EbookLayout, PageKind};
use crate::layout::{BlockRole, LayoutElement, TextRole};
use std::fmt::Write;

const PREVIEW_CHARS: usize = 48;

impl EbookLayout {
    /// Saves the layout as pretty-printed JSON.
    ///
    /// # Example
    /// ```no_run
    /// use markdown2ebook::{build_layout, styling::StyleMatch, tree::EbookDocument};
    ///
    /// let layout = build_layout(&EbookDocument::default(), &StyleMatch::default()).unwrap();
    /// layout.save_to_json_file("layout.json").unwrap();
    /// ```
    pub fn save_to_json_file(&self, file_path: &str) -> std::io::Result<()> {
        std::fs::write(file_path, self.to_json()?)
    }

    pub fn to_json(&self) -> std::io::Result<String> {
        serde_json::to_string_pretty(self).map_err(std::io::Error::other)
    }

    /// One line per page and element, indented by nesting.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for (index, page) in self.pages.iter().enumerate() {
            let kind = match page.kind {
                PageKind::Cover => "cover",
                PageKind::Interior => "interior",
            };
            let _ = writeln!(out, "Page {} ({})", index + 1, kind);
            for element in &page.elements {
                outline_element(&mut out, element, 1);
            }
        }
        out
    }
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{:?}…", cut)
    } else {
        format!("{:?}", flat)
    }
}

fn text_label(role: TextRole) -> String {
    match role {
        TextRole::Heading(level) => format!("h{}", level),
        TextRole::Paragraph => "p".to_string(),
        TextRole::BulletLine => "bullet".to_string(),
        TextRole::Strong => "strong".to_string(),
        TextRole::Emphasis => "em".to_string(),
        TextRole::Span => "span".to_string(),
        TextRole::Code => "code".to_string(),
    }
}

fn block_label(role: &BlockRole) -> String {
    match role {
        BlockRole::Div => "div".to_string(),
        BlockRole::List { ordered: true } => "ol".to_string(),
        BlockRole::List { ordered: false } => "ul".to_string(),
        BlockRole::ListItem => "li".to_string(),
        BlockRole::NestedList => "nested".to_string(),
        BlockRole::Fallback(name) => format!("<{}>", name),
    }
}

fn outline_element(out: &mut String, element: &LayoutElement, depth: usize) {
    let indent = "  ".repeat(depth);
    match element {
        LayoutElement::Text { content, .. } => {
            let _ = writeln!(out, "{}text {}", indent, preview(content));
        }
        LayoutElement::Inline { role, .. } => {
            let _ = writeln!(
                out,
                "{}{} {}",
                indent,
                text_label(*role),
                preview(&element.plain_text())
            );
        }
        LayoutElement::Link { href, .. } => {
            let _ = writeln!(
                out,
                "{}a [{}] {}",
                indent,
                href,
                preview(&element.plain_text())
            );
        }
        LayoutElement::Rule { .. } => {
            let _ = writeln!(out, "{}hr", indent);
        }
        LayoutElement::Block { role, children, .. } => {
            let _ = writeln!(out, "{}{}", indent, block_label(role));
            for child in children {
                outline_element(out, child, depth + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::assemble::assemble;
    use crate::styling::StyleMatch;
    use crate::tree::{EbookDocument, Node, Tag};

    fn layout() -> crate::assemble::EbookLayout {
        let body = Node::with_children(
            Tag::Div,
            vec![
                Node::with_children(Tag::H1, ["My Great Book"]),
                Node::with_children(Tag::H2, ["Chapter 1"]),
                Node::with_children(
                    Tag::Ul,
                    vec![Node::with_children(Tag::Li, ["item"])],
                ),
                Node::new(Tag::Hr),
            ],
        );
        let document = EbookDocument::new(Some("My Great Book".to_string()), Some(body));
        assemble(&document, &StyleMatch::default()).unwrap()
    }

    #[test]
    fn test_outline_lists_pages_and_elements() {
        let outline = layout().outline();
        let lines: Vec<&str> = outline.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Page 1 (cover)",
                "  h1 \"My Great Book\"",
                "Page 2 (interior)",
                "  h2 \"Chapter 1\"",
                "  ul",
                "    li",
                "      bullet \"• item\"",
                "  hr",
            ]
        );
    }

    #[test]
    fn test_outline_truncates_long_text() {
        let long = "word ".repeat(40);
        let body = Node::with_children(Tag::Div, vec![Node::with_children(Tag::P, [long.as_str()])]);
        let layout = assemble(&EbookDocument::new(None, Some(body)), &StyleMatch::default()).unwrap();
        assert!(layout.outline().contains('…'));
    }

    #[test]
    fn test_json_dump() {
        let json = layout().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["title"], "My Great Book");
        assert_eq!(value["pages"][0]["kind"], "cover");
        assert_eq!(value["pages"][1]["elements"][0]["kind"], "inline");
        assert_eq!(value["pages"][1]["elements"][0]["role"]["heading"], 2);
    }

    #[test]
    fn test_save_to_json_file_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        layout().save_to_json_file(path.to_str().unwrap()).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("Chapter 1"));
    }
}
