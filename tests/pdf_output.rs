use lopdf::{Document, Object};
use markdown2ebook::config::ConfigSource;
use markdown2ebook::tree::EbookDocument;
use markdown2ebook::{output_file_name, parse_into_bytes, parse_into_file, EbookError};
use tempfile::tempdir;

const BOOK: &str = "---\ntitle: My Great Book\n---\n\n# My Great Book\n\nBy someone.\n\n## Chapter 1\n\nFirst chapter with a [link](https://example.com) and `code`.\n\n---\n\n## Chapter 2\n\n- one\n- two\n  - nested\n";

/// Renders `markdown`, or `None` when the machine has no usable fonts.
fn render(markdown: &str, config: ConfigSource) -> Option<Vec<u8>> {
    match parse_into_bytes(markdown.to_string(), config, None) {
        Ok(bytes) => Some(bytes),
        Err(EbookError::FontError { font_name, .. }) => {
            eprintln!("skipping: font {} is not available here", font_name);
            None
        }
        Err(e) => panic!("rendering failed: {}", e),
    }
}

fn media_box(doc: &Document, page_id: lopdf::ObjectId) -> Vec<f32> {
    let mut dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
    loop {
        if let Ok(Object::Array(values)) = dict.get(b"MediaBox") {
            return values.iter().map(|v| v.as_float().unwrap()).collect();
        }
        let parent = dict.get(b"Parent").unwrap().as_reference().unwrap();
        dict = doc.get_object(parent).unwrap().as_dict().unwrap();
    }
}

#[test]
fn test_one_page_per_chapter() {
    let Some(bytes) = render(BOOK, ConfigSource::Default) else {
        return;
    };
    assert!(bytes.starts_with(b"%PDF"));

    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[test]
fn test_default_trim_size_is_a5() {
    let Some(bytes) = render(BOOK, ConfigSource::Default) else {
        return;
    };
    let doc = Document::load_mem(&bytes).unwrap();
    for page_id in doc.get_pages().values() {
        let mb = media_box(&doc, *page_id);
        assert!((mb[2] - mb[0] - 419.5).abs() < 1.0, "width {:?}", mb);
        assert!((mb[3] - mb[1] - 595.3).abs() < 1.0, "height {:?}", mb);
    }
}

#[test]
fn test_configured_page_size() {
    const A4: &str = "[page]\nsize = \"a4\"\n";
    let Some(bytes) = render("## Only chapter", ConfigSource::Embedded(A4)) else {
        return;
    };
    let doc = Document::load_mem(&bytes).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);
    let mb = media_box(&doc, *pages.values().next().unwrap());
    assert!((mb[2] - mb[0] - 595.3).abs() < 1.0);
    assert!((mb[3] - mb[1] - 841.9).abs() < 1.0);
}

#[test]
fn test_empty_document_is_a_single_page() {
    let Some(bytes) = render("", ConfigSource::Default) else {
        return;
    };
    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn test_json_tree_renders_with_fallback_tags() {
    let document = EbookDocument::from_json(
        r#"{"title": "Tree", "body": {"tag": "div", "children": [
            {"tag": "h1", "children": ["Tree"]},
            {"tag": "h2", "children": ["A"]},
            {"tag": "section", "children": [{"tag": "p", "children": ["inside"]}]},
            {"tag": "hr"}
        ]}}"#,
    )
    .unwrap();

    match markdown2ebook::render_document_into_bytes(&document, ConfigSource::Default, None) {
        Ok(bytes) => {
            let doc = Document::load_mem(&bytes).unwrap();
            assert_eq!(doc.get_pages().len(), 2);
        }
        Err(EbookError::FontError { .. }) => eprintln!("skipping: no fonts available"),
        Err(e) => panic!("rendering failed: {}", e),
    }
}

#[test]
fn test_file_named_after_title() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(output_file_name(Some("My Great Book")));
    match parse_into_file(
        BOOK.to_string(),
        path.to_str().unwrap(),
        ConfigSource::Default,
        None,
    ) {
        Ok(()) => {
            assert!(path.ends_with("My_Great_Book.pdf"));
            let doc = Document::load(&path).unwrap();
            assert_eq!(doc.get_pages().len(), 3);
        }
        Err(EbookError::FontError { .. }) => eprintln!("skipping: no fonts available"),
        Err(e) => panic!("rendering failed: {}", e),
    }
}

#[test]
fn test_deep_markdown_fails_without_crashing() {
    let markdown = format!("{}x", "> ".repeat(20_000));
    let result = parse_into_bytes(markdown, ConfigSource::Default, None);
    assert!(matches!(result, Err(EbookError::DepthExceeded { .. })));
}
