//! Splits a document body into page segments.
//!
//! Only the direct children of the body are inspected. Each `h2` that follows
//! some already-collected content closes the running segment and opens the next
//! one; an `h2` at the very start just becomes the first element of the first
//! segment. Segmentation is a partition: concatenating the segments gives back
//! the body's children unchanged.

use crate::tree::{Child, Node, Tag};

/// Contiguous run of top-level body children placed on one output page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageSegment<'a> {
    pub nodes: Vec<&'a Child>,
}

impl<'a> PageSegment<'a> {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Partitions `body`'s children into page segments, breaking before every `h2`.
///
/// A missing or childless body yields exactly one empty segment, never zero.
pub fn split_into_pages(body: Option<&Node>) -> Vec<PageSegment<'_>> {
    let children = match body {
        Some(node) if !node.children().is_empty() => node.children(),
        _ => return vec![PageSegment::default()],
    };

    let mut segments = Vec::new();
    let mut current = PageSegment::default();

    for child in children {
        if child.has_tag(&Tag::H2) && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        current.nodes.push(child);
    }

    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> Child {
        Node::with_children(Tag::P, [text]).into()
    }

    fn h2(text: &str) -> Child {
        Node::with_children(Tag::H2, [text]).into()
    }

    fn body(children: Vec<Child>) -> Node {
        Node::with_children(Tag::Div, children)
    }

    #[test]
    fn test_missing_body_yields_single_empty_segment() {
        let segments = split_into_pages(None);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_empty());
    }

    #[test]
    fn test_childless_body_yields_single_empty_segment() {
        let void = Node::new(Tag::Div);
        assert_eq!(split_into_pages(Some(&void)), vec![PageSegment::default()]);

        let empty = body(vec![]);
        assert_eq!(split_into_pages(Some(&empty)), vec![PageSegment::default()]);
    }

    #[test]
    fn test_no_h2_keeps_everything_on_one_page() {
        let body = body(vec![
            Node::with_children(Tag::H1, ["Title"]).into(),
            p("Intro"),
        ]);
        let segments = split_into_pages(Some(&body));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 2);
        assert!(segments[0].nodes[0].has_tag(&Tag::H1));
    }

    #[test]
    fn test_h2_starts_new_segments() {
        let body = body(vec![p("A"), h2("Ch1"), p("B"), h2("Ch2"), p("C")]);
        let segments = split_into_pages(Some(&body));

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].nodes, vec![&p("A")]);
        assert_eq!(segments[1].nodes, vec![&h2("Ch1"), &p("B")]);
        assert_eq!(segments[2].nodes, vec![&h2("Ch2"), &p("C")]);
    }

    #[test]
    fn test_leading_h2_does_not_create_empty_segment() {
        let body = body(vec![h2("Ch1"), p("B")]);
        let segments = split_into_pages(Some(&body));
        assert_eq!(segments.len(), 1);
        assert!(segments[0].nodes[0].has_tag(&Tag::H2));
    }

    #[test]
    fn test_consecutive_h2_each_get_a_page() {
        let body = body(vec![h2("One"), h2("Two"), h2("Three")]);
        let segments = split_into_pages(Some(&body));
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn test_text_leaf_never_splits() {
        let body = body(vec![p("A"), Child::text("h2"), p("B")]);
        assert_eq!(split_into_pages(Some(&body)).len(), 1);
    }

    #[test]
    fn test_nested_h2_is_not_a_boundary() {
        let wrapped: Child = Node::with_children(Tag::Div, vec![h2("Inner")]).into();
        let body = body(vec![p("A"), wrapped, p("B")]);
        assert_eq!(split_into_pages(Some(&body)).len(), 1);
    }
}
