//! Document tree consumed by the renderer.
//!
//! A tree is produced once per input file, either by the Markdown front end in
//! [`crate::markdown`] or by decoding a pre-parsed JSON tree with
//! [`EbookDocument::from_json`]. It is never mutated afterwards: the segmenter and
//! the renderer only borrow it.
//!
//! The JSON form mirrors the tree emitted by markdown-to-json style tools:
//!
//! ```json
//! {
//!   "title": "My Great Book",
//!   "body": {
//!     "tag": "div",
//!     "children": [
//!       { "tag": "h1", "children": ["My Great Book"] },
//!       { "tag": "p", "children": ["See ", { "tag": "a", "props": { "href": "https://example.com" }, "children": ["here"] }] }
//!     ]
//!   }
//! }
//! ```

use crate::EbookError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Element kind of a tree node.
///
/// The renderer dispatches on this closed set. Anything else is kept as
/// [`Tag::Unknown`] with its raw name so that its content is still rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    H1,
    H2,
    H3,
    H4,
    P,
    Ul,
    Ol,
    Li,
    A,
    Code,
    Strong,
    Em,
    Span,
    Hr,
    Div,
    Unknown(String),
}

impl Tag {
    /// Maps a raw tag name onto the closed set. Never fails.
    pub fn from_name(name: &str) -> Self {
        match name {
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "p" => Tag::P,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "a" => Tag::A,
            "code" => Tag::Code,
            "strong" => Tag::Strong,
            "em" => Tag::Em,
            "span" => Tag::Span,
            "hr" => Tag::Hr,
            "div" => Tag::Div,
            other => Tag::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::P => "p",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::A => "a",
            Tag::Code => "code",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::Span => "span",
            Tag::Hr => "hr",
            Tag::Div => "div",
            Tag::Unknown(name) => name,
        }
    }

    /// `ul` and `ol`, the kinds an `li` pulls out of its inline flow.
    pub fn is_list(&self) -> bool {
        matches!(self, Tag::Ul | Tag::Ol)
    }

    /// Heading level for `h1`..`h4`.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            Tag::H1 => Some(1),
            Tag::H2 => Some(2),
            Tag::H3 => Some(3),
            Tag::H4 => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a node's child list: a plain text leaf or a nested node.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Text(String),
    Node(Node),
}

impl Child {
    pub fn text(content: impl Into<String>) -> Self {
        Child::Text(content.into())
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Child::Node(node) => Some(node),
            Child::Text(_) => None,
        }
    }

    /// True for structured nodes carrying `tag`. Text leaves never match.
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.as_node().is_some_and(|node| &node.tag == tag)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value)
    }
}

impl From<Node> for Child {
    fn from(value: Node) -> Self {
        Child::Node(value)
    }
}

/// A structured tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: Tag,
    /// `None` for void nodes such as `hr`.
    pub children: Option<Vec<Child>>,
    /// Attributes; only `href` is consumed (on `a`).
    pub props: BTreeMap<String, String>,
}

impl Node {
    /// A void node with no child list.
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            children: None,
            props: BTreeMap::new(),
        }
    }

    pub fn with_children<I, C>(tag: Tag, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        Self {
            tag,
            children: Some(children.into_iter().map(Into::into).collect()),
            props: BTreeMap::new(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Child list, treating a void node as having none.
    pub fn children(&self) -> &[Child] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Concatenated text of every leaf below this node, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self.children(), &mut out);
        out
    }
}

fn collect_text(children: &[Child], out: &mut String) {
    for child in children {
        match child {
            Child::Text(text) => out.push_str(text),
            Child::Node(node) => collect_text(node.children(), out),
        }
    }
}

/// Root document handed over by the tree producer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EbookDocument {
    pub title: Option<String>,
    pub body: Option<Node>,
}

impl EbookDocument {
    pub fn new(title: Option<String>, body: Option<Node>) -> Self {
        Self { title, body }
    }

    /// Decodes a pre-parsed document tree from JSON.
    ///
    /// Child entries must be strings or objects with a string `tag`; anything else
    /// is rejected here so the renderer only ever sees well-formed trees.
    pub fn from_json(source: &str) -> Result<Self, EbookError> {
        let raw: RawDocument = serde_json::from_str(source).map_err(|e| EbookError::InvalidTree {
            message: e.to_string(),
            suggestion: "Each child must be a string or an object with a string \"tag\"".to_string(),
        })?;

        Ok(Self {
            title: raw.title.filter(|t| !t.trim().is_empty()),
            body: raw.body.map(RawNode::into_node),
        })
    }
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<RawNode>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChild {
    Text(String),
    Node(RawNode),
}

#[derive(Deserialize)]
struct RawNode {
    tag: String,
    #[serde(default)]
    children: Option<Vec<RawChild>>,
    #[serde(default)]
    props: Option<BTreeMap<String, serde_json::Value>>,
}

impl RawNode {
    fn into_node(self) -> Node {
        let props = self
            .props
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect();

        Node {
            tag: Tag::from_name(&self.tag),
            children: self.children.map(|children| {
                children
                    .into_iter()
                    .map(|child| match child {
                        RawChild::Text(text) => Child::Text(text),
                        RawChild::Node(node) => Child::Node(node.into_node()),
                    })
                    .collect()
            }),
            props,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_from_name_round_trips_known_and_unknown() {
        for name in [
            "h1", "h2", "h3", "h4", "p", "ul", "ol", "li", "a", "code", "strong", "em", "span",
            "hr", "div",
        ] {
            let tag = Tag::from_name(name);
            assert!(!matches!(tag, Tag::Unknown(_)), "{} should be known", name);
            assert_eq!(tag.name(), name);
        }

        let tag = Tag::from_name("blockquote");
        assert_eq!(tag, Tag::Unknown("blockquote".to_string()));
        assert_eq!(tag.to_string(), "blockquote");
    }

    #[test]
    fn test_void_node_has_no_children() {
        let hr = Node::new(Tag::Hr);
        assert!(hr.children.is_none());
        assert!(hr.children().is_empty());
    }

    #[test]
    fn test_has_tag_ignores_text_leaves() {
        let leaf = Child::text("h2");
        assert!(!leaf.has_tag(&Tag::H2));
        let heading: Child = Node::with_children(Tag::H2, ["Ch1"]).into();
        assert!(heading.has_tag(&Tag::H2));
    }

    #[test]
    fn test_text_content_walks_nested_nodes() {
        let node = Node::with_children(
            Tag::P,
            vec![
                Child::text("Hello "),
                Node::with_children(Tag::Strong, ["big "]).into(),
                Child::text("world"),
            ],
        );
        assert_eq!(node.text_content(), "Hello big world");
    }

    #[test]
    fn test_from_json_decodes_tree() {
        let json = r#"{
            "title": "My Great Book",
            "body": {"tag": "div", "children": [
                {"tag": "h1", "children": ["Title"]},
                {"tag": "a", "props": {"href": "https://example.com", "rel": null, "tabindex": 1}, "children": ["x"]},
                {"tag": "hr"}
            ]}
        }"#;
        let doc = EbookDocument::from_json(json).unwrap();
        assert_eq!(doc.title.as_deref(), Some("My Great Book"));

        let body = doc.body.unwrap();
        assert_eq!(body.tag, Tag::Div);
        assert_eq!(body.children().len(), 3);

        let link = body.children()[1].as_node().unwrap();
        assert_eq!(link.prop("href"), Some("https://example.com"));
        assert_eq!(link.prop("tabindex"), Some("1"));
        assert_eq!(link.prop("rel"), None);

        let hr = body.children()[2].as_node().unwrap();
        assert!(hr.children.is_none());
    }

    #[test]
    fn test_from_json_blank_title_is_absent() {
        let doc = EbookDocument::from_json(r#"{"title": "   ", "body": {"tag": "div"}}"#).unwrap();
        assert!(doc.title.is_none());
    }

    #[test]
    fn test_from_json_without_body() {
        let doc = EbookDocument::from_json(r#"{"title": "Only a title"}"#).unwrap();
        assert!(doc.body.is_none());
    }

    #[test]
    fn test_from_json_rejects_malformed_children() {
        let numeric = r#"{"body": {"tag": "div", "children": [42]}}"#;
        assert!(matches!(
            EbookDocument::from_json(numeric),
            Err(EbookError::InvalidTree { .. })
        ));

        let missing_tag = r#"{"body": {"tag": "div", "children": [{"children": ["x"]}]}}"#;
        assert!(matches!(
            EbookDocument::from_json(missing_tag),
            Err(EbookError::InvalidTree { .. })
        ));
    }
}
