//! The markdown2ebook library turns a Markdown document into a paginated, print-ready PDF ebook.
//!
//! The document is first parsed into a tree of tagged nodes (or decoded from an already parsed
//! JSON tree). The tree is split into page segments at every top-level `h2`, each node is rendered
//! into a styled layout element, and the resulting pages are exported as a PDF: the first segment
//! gets a centered cover presentation, every later one an interior presentation with decorative
//! bands.
//!
//! Basic usage passes Markdown content as a string along with an output path:
//! ```rust
//! use markdown2ebook;
//! use markdown2ebook::config::ConfigSource;
//! use std::error::Error;
//!
//! fn example() -> Result<(), Box<dyn Error>> {
//!     let markdown = "---\ntitle: My Great Book\n---\n# My Great Book\n\n## Chapter 1\n\nOnce upon a time.".to_string();
//!     markdown2ebook::parse_into_file(markdown, "My_Great_Book.pdf", ConfigSource::Default, None)?;
//!     Ok(())
//! }
//! ```
//!
//! The output name usually comes from the document title:
//! ```rust
//! assert_eq!(markdown2ebook::output_file_name(Some("My Great Book")), "My_Great_Book.pdf");
//! assert_eq!(markdown2ebook::output_file_name(None), "ebook.pdf");
//! ```
//!
//! A pre-parsed tree can be rendered directly:
//! ```rust
//! use markdown2ebook::config::ConfigSource;
//! use markdown2ebook::tree::EbookDocument;
//! use std::error::Error;
//!
//! fn example_from_tree() -> Result<(), Box<dyn Error>> {
//!     let json = r#"{"title": "Notes", "body": {"tag": "div", "children": [
//!         {"tag": "h1", "children": ["Notes"]},
//!         {"tag": "h2", "children": ["First"]},
//!         {"tag": "p", "children": ["Hello"]}
//!     ]}}"#;
//!     let document = EbookDocument::from_json(json)?;
//!     let bytes = markdown2ebook::render_document_into_bytes(&document, ConfigSource::Default, None)?;
//!     assert!(bytes.starts_with(b"%PDF-"));
//!     Ok(())
//! }
//! ```
//!
//! Styling is read from a TOML file (`markdown2ebookrc.toml` by default in the CLI):
//! ```toml
//! [page]
//! size = "a5"
//! margins = { top = 17.0, right = 10.5, bottom = 10.5, left = 10.5 }
//!
//! [heading.2]
//! size = 14
//! bold = true
//!
//! [bands]
//! interior = [
//!     { edge = "top", offset = 0.0, height = 3.5, color = { r = 31, g = 33, b = 34 } },
//!     { edge = "bottom", offset = 0.0, height = 1.4, color = { r = 255, g = 3, b = 240 } },
//! ]
//! ```
//!
//! ## Pipeline
//! ```text
//! +-------------+     +----------------+     +-----------------+
//! |  Markdown   |     |  Node tree     |     |  Page segments  |
//! |  or JSON    | --> |  div           | --> |  [cover]        |
//! |  tree       |     |   h1 p h2 p .. |     |  [h2 ..] [h2 ..]|
//! +-------------+     +----------------+     +-----------------+
//!
//! +-----------------+     +-------------------+     +--------------+
//! | Layout elements | --> | PDF pages         | --> | Title_As_    |
//! | styled, keyed   |     | cover / interior  |     | File.pdf     |
//! +-----------------+     +-------------------+     +--------------+
//! ```

pub mod assemble;
pub mod config;
pub mod debug;
pub mod fonts;
pub mod layout;
pub mod markdown;
pub mod pdf;
pub mod render;
pub mod segment;
pub mod styling;
pub mod tree;
pub mod validation;

use assemble::EbookLayout;
use log::info;
use pdf::Pdf;
use std::error::Error;
use std::fmt;
use tree::EbookDocument;

/// Represents errors that can occur while turning a document into an ebook.
#[derive(Debug)]
pub enum EbookError {
    /// The Markdown source could not be turned into a document tree
    ParseError {
        message: String,
        suggestion: Option<String>,
    },
    /// A pre-parsed tree is malformed
    InvalidTree { message: String, suggestion: String },
    /// The tree nests deeper than the renderer accepts
    DepthExceeded { limit: usize, key: String },
    /// Indicates an error occurred during PDF generation
    PdfError {
        message: String,
        path: Option<String>,
        suggestion: Option<String>,
    },
    /// Indicates a font loading error
    FontError {
        font_name: String,
        message: String,
        suggestion: String,
    },
    /// Indicates an invalid configuration
    ConfigError { message: String, suggestion: String },
    /// Indicates an I/O error
    IoError {
        message: String,
        path: String,
        suggestion: String,
    },
}

impl Error for EbookError {}

impl fmt::Display for EbookError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EbookError::ParseError {
                message,
                suggestion,
            } => {
                write!(f, "❌ Markdown Parsing Error: {}", message)?;
                if let Some(hint) = suggestion {
                    write!(f, "\n💡 Suggestion: {}", hint)?;
                }
                Ok(())
            }
            EbookError::InvalidTree {
                message,
                suggestion,
            } => {
                write!(f, "❌ Invalid Document Tree: {}", message)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            EbookError::DepthExceeded { limit, key } => {
                write!(
                    f,
                    "❌ Document Too Deep: nesting exceeds {} levels (at {})",
                    limit, key
                )?;
                write!(
                    f,
                    "\n💡 Suggestion: Flatten the document or raise max_depth in the [render] section"
                )?;
                Ok(())
            }
            EbookError::PdfError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "❌ PDF Generation Error: {}", message)?;
                if let Some(p) = path {
                    write!(f, "\n📁 Path: {}", p)?;
                }
                if let Some(hint) = suggestion {
                    write!(f, "\n💡 Suggestion: {}", hint)?;
                }
                Ok(())
            }
            EbookError::FontError {
                font_name,
                message,
                suggestion,
            } => {
                write!(f, "❌ Font Error: Failed to load font '{}'", font_name)?;
                write!(f, "\n   Reason: {}", message)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            EbookError::ConfigError {
                message,
                suggestion,
            } => {
                write!(f, "❌ Configuration Error: {}", message)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            EbookError::IoError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "❌ File Error: {}", message)?;
                write!(f, "\n📁 Path: {}", path)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
        }
    }
}

impl EbookError {
    /// Creates a simple parse error with just a message
    pub fn parse_error(message: impl Into<String>) -> Self {
        EbookError::ParseError {
            message: message.into(),
            suggestion: Some(
                "Front matter must be YAML between two --- lines, e.g. `title: My Book`"
                    .to_string(),
            ),
        }
    }

    /// Creates a simple PDF error with just a message
    pub fn pdf_error(message: impl Into<String>) -> Self {
        EbookError::PdfError {
            message: message.into(),
            path: None,
            suggestion: Some(
                "Check that the output directory exists and you have write permissions".to_string(),
            ),
        }
    }
}

/// File name for an ebook titled `title`.
///
/// Every run of whitespace becomes a single `_` and `.pdf` is appended. A missing
/// or blank title gives `ebook.pdf`. No other characters are touched.
pub fn output_file_name(title: Option<&str>) -> String {
    let Some(title) = title.filter(|t| !t.trim().is_empty()) else {
        return "ebook.pdf".to_string();
    };

    let mut name = String::with_capacity(title.len() + 4);
    let mut in_space = false;
    for c in title.chars() {
        if c.is_whitespace() {
            if !in_space {
                name.push('_');
            }
            in_space = true;
        } else {
            name.push(c);
            in_space = false;
        }
    }
    name.push_str(".pdf");
    name
}

/// Segments, renders and lays out `document` with the given style.
pub fn build_layout(
    document: &EbookDocument,
    style: &styling::StyleMatch,
) -> Result<EbookLayout, EbookError> {
    validation::validate_tree(document, style)?;
    let layout = assemble::assemble(document, style)?;
    info!(
        "Laid out {} page segment(s) for {}",
        layout.pages.len(),
        layout.file_name()
    );
    Ok(layout)
}

fn check_output_dir(path: &str) -> Result<(), EbookError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(EbookError::IoError {
                message: "Output directory does not exist".to_string(),
                path: parent.display().to_string(),
                suggestion: format!("Create the directory first: mkdir -p {}", parent.display()),
            });
        }
    }
    Ok(())
}

/// Converts Markdown content into a PDF ebook saved at `path`.
///
/// A front matter `title` becomes the PDF title; the caller decides the file name,
/// typically with [`output_file_name`].
///
/// # Arguments
/// * `markdown` - The Markdown content to convert
/// * `path` - The output file path for the generated PDF
/// * `config` - Configuration source (Default, File path, or Embedded TOML)
/// * `font_config` - Optional font overrides
///
/// # Example
/// ```rust
/// use std::error::Error;
/// use markdown2ebook::config::ConfigSource;
///
/// fn example() -> Result<(), Box<dyn Error>> {
///     let markdown = "# Book\n\n## One\n\nText".to_string();
///     markdown2ebook::parse_into_file(markdown.clone(), "book1.pdf", ConfigSource::Default, None)?;
///
///     const EMBEDDED: &str = r#"
///         [page]
///         size = "a4"
///     "#;
///     markdown2ebook::parse_into_file(markdown, "book2.pdf", ConfigSource::Embedded(EMBEDDED), None)?;
///     Ok(())
/// }
/// ```
pub fn parse_into_file(
    markdown: String,
    path: &str,
    config: config::ConfigSource,
    font_config: Option<&fonts::FontConfig>,
) -> Result<(), EbookError> {
    check_output_dir(path)?;
    let document = markdown::parse_markdown(&markdown)?;
    render_document_into_file(&document, path, config, font_config)
}

/// Converts Markdown content into a PDF ebook and returns the PDF bytes.
pub fn parse_into_bytes(
    markdown: String,
    config: config::ConfigSource,
    font_config: Option<&fonts::FontConfig>,
) -> Result<Vec<u8>, EbookError> {
    let document = markdown::parse_markdown(&markdown)?;
    render_document_into_bytes(&document, config, font_config)
}

/// Renders an already built document tree into a PDF saved at `path`.
pub fn render_document_into_file(
    document: &EbookDocument,
    path: &str,
    config: config::ConfigSource,
    font_config: Option<&fonts::FontConfig>,
) -> Result<(), EbookError> {
    let style = config::load_config_from_source(config);
    let layout = build_layout(document, &style)?;
    render_layout_into_file(layout, style, path, font_config)
}

/// Renders an already built document tree into PDF bytes.
pub fn render_document_into_bytes(
    document: &EbookDocument,
    config: config::ConfigSource,
    font_config: Option<&fonts::FontConfig>,
) -> Result<Vec<u8>, EbookError> {
    let style = config::load_config_from_source(config);
    let layout = build_layout(document, &style)?;
    render_layout_into_bytes(layout, style, font_config)
}

/// Exports an assembled layout to a PDF file at `path`.
pub fn render_layout_into_file(
    layout: EbookLayout,
    style: styling::StyleMatch,
    path: &str,
    font_config: Option<&fonts::FontConfig>,
) -> Result<(), EbookError> {
    check_output_dir(path)?;
    let pdf = Pdf::new(layout, style, font_config)?;
    let rendered = pdf.render_into_document()?;

    if let Some(err) = Pdf::render(rendered, path) {
        return Err(EbookError::PdfError {
            message: err.clone(),
            path: Some(path.to_string()),
            suggestion: Some(if err.contains("Permission") || err.contains("denied") {
                "Check that you have write permissions for this location".to_string()
            } else if err.contains("No such file") {
                "Make sure the output directory exists".to_string()
            } else {
                "Try a different output path or check available disk space".to_string()
            }),
        });
    }
    Ok(())
}

/// Exports an assembled layout to PDF bytes.
pub fn render_layout_into_bytes(
    layout: EbookLayout,
    style: styling::StyleMatch,
    font_config: Option<&fonts::FontConfig>,
) -> Result<Vec<u8>, EbookError> {
    let pdf = Pdf::new(layout, style, font_config)?;
    let rendered = pdf.render_into_document()?;

    Pdf::render_to_bytes(rendered).map_err(|err| EbookError::PdfError {
        message: err,
        path: None,
        suggestion: Some("Check available memory and try with a smaller document".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Node, Tag};

    #[test]
    fn test_output_file_name_from_title() {
        assert_eq!(output_file_name(Some("My Great Book")), "My_Great_Book.pdf");
        assert_eq!(output_file_name(Some("A  \t B")), "A_B.pdf");
        assert_eq!(output_file_name(Some(" Lead")), "_Lead.pdf");
        assert_eq!(output_file_name(Some("Déjà vu: 2/3")), "Déjà_vu:_2/3.pdf");
    }

    #[test]
    fn test_output_file_name_without_title() {
        assert_eq!(output_file_name(None), "ebook.pdf");
        assert_eq!(output_file_name(Some("")), "ebook.pdf");
        assert_eq!(output_file_name(Some("   ")), "ebook.pdf");
    }

    #[test]
    fn test_build_layout_rejects_deep_tree_before_rendering() {
        let mut node = Node::with_children(Tag::Span, ["x"]);
        for _ in 0..10 {
            node = Node::with_children(Tag::Span, vec![node]);
        }
        let document = EbookDocument::new(None, Some(Node::with_children(Tag::Div, vec![node])));
        let style = styling::StyleMatch {
            max_depth: 3,
            ..styling::StyleMatch::default()
        };
        assert!(matches!(
            build_layout(&document, &style),
            Err(EbookError::DepthExceeded { limit: 3, .. })
        ));
    }

    #[test]
    fn test_invalid_output_path() {
        let result = parse_into_file(
            "# Test".to_string(),
            "/nonexistent/directory/output.pdf",
            config::ConfigSource::Default,
            None,
        );
        assert!(matches!(result, Err(EbookError::IoError { .. })));
    }

    #[test]
    fn test_error_display_has_suggestion() {
        let shown = EbookError::DepthExceeded {
            limit: 4,
            key: "0-1".to_string(),
        }
        .to_string();
        assert!(shown.contains("exceeds 4 levels"));
        assert!(shown.contains("0-1"));
        assert!(shown.contains("Suggestion"));

        let shown = EbookError::pdf_error("boom").to_string();
        assert!(shown.contains("boom"));
        assert!(shown.contains("write permissions"));
    }
}
