//! Turns a whole document into laid-out pages.
//!
//! The body is segmented once; each segment then becomes one [`Page`]. The
//! first page uses the cover presentation, every later page the interior one.
//! Assembly has no side effects, so the same document can be assembled for a
//! preview and again for export.

use crate::layout::LayoutElement;
use crate::render::Renderer;
use crate::segment::split_into_pages;
use crate::styling::StyleMatch;
use crate::tree::EbookDocument;
use crate::EbookError;
use log::debug;
use serde::Serialize;

/// Presentation applied to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Cover,
    Interior,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub kind: PageKind,
    pub elements: Vec<LayoutElement>,
}

/// Laid-out ebook: ordered pages plus the title used for naming the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EbookLayout {
    pub title: Option<String>,
    pub pages: Vec<Page>,
}

impl EbookLayout {
    /// File name for the exported PDF, see [`crate::output_file_name`].
    pub fn file_name(&self) -> String {
        crate::output_file_name(self.title.as_deref())
    }
}

/// Segments and renders `document` with `style`.
pub fn assemble(document: &EbookDocument, style: &StyleMatch) -> Result<EbookLayout, EbookError> {
    let renderer = Renderer::new(style);
    let segments = split_into_pages(document.body.as_ref());
    debug!("Document split into {} page segment(s)", segments.len());

    let mut pages = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let kind = if index == 0 {
            PageKind::Cover
        } else {
            PageKind::Interior
        };

        let mut elements = Vec::with_capacity(segment.len());
        for (position, node) in segment.nodes.iter().enumerate() {
            if let Some(element) = renderer.render(node, &position.to_string())? {
                elements.push(element);
            }
        }

        pages.push(Page { kind, elements });
    }

    Ok(EbookLayout {
        title: document.title.clone(),
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Child, Node, Tag};

    fn doc(title: Option<&str>, children: Vec<Child>) -> EbookDocument {
        EbookDocument::new(
            title.map(str::to_string),
            Some(Node::with_children(Tag::Div, children)),
        )
    }

    #[test]
    fn test_first_page_is_cover_rest_interior() {
        let document = doc(
            Some("Book"),
            vec![
                Node::with_children(Tag::P, ["A"]).into(),
                Node::with_children(Tag::H2, ["Ch1"]).into(),
                Node::with_children(Tag::P, ["B"]).into(),
                Node::with_children(Tag::H2, ["Ch2"]).into(),
            ],
        );
        let layout = assemble(&document, &StyleMatch::default()).unwrap();

        let kinds: Vec<PageKind> = layout.pages.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PageKind::Cover, PageKind::Interior, PageKind::Interior]);
        assert_eq!(layout.pages[1].elements.len(), 2);
        assert_eq!(layout.pages[1].elements[0].plain_text(), "Ch1");
        assert_eq!(layout.file_name(), "Book.pdf");
    }

    #[test]
    fn test_empty_document_has_one_empty_cover() {
        let layout = assemble(&EbookDocument::default(), &StyleMatch::default()).unwrap();
        assert_eq!(layout.pages.len(), 1);
        assert_eq!(layout.pages[0].kind, PageKind::Cover);
        assert!(layout.pages[0].elements.is_empty());
        assert_eq!(layout.file_name(), "ebook.pdf");
    }

    #[test]
    fn test_top_level_whitespace_is_dropped_from_page() {
        let document = doc(
            None,
            vec![
                Child::text("\n"),
                Node::with_children(Tag::P, ["Only"]).into(),
                Child::text("\n"),
            ],
        );
        let layout = assemble(&document, &StyleMatch::default()).unwrap();
        assert_eq!(layout.pages[0].elements.len(), 1);
        assert_eq!(layout.pages[0].elements[0].key(), "1");
    }

    #[test]
    fn test_depth_error_fails_assembly() {
        let mut node = Node::with_children(Tag::Div, ["x"]);
        for _ in 0..5 {
            node = Node::with_children(Tag::Div, vec![node]);
        }
        let style = StyleMatch {
            max_depth: 3,
            ..StyleMatch::default()
        };
        let result = assemble(&doc(None, vec![node.into()]), &style);
        assert!(matches!(result, Err(EbookError::DepthExceeded { .. })));
    }
}
