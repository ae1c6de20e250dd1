//! Checks run between tree construction and rendering.
//!
//! [`validate_tree`] is the hard gate: it rejects trees the renderer would give
//! up on. [`validate_conversion`] produces soft pre-flight warnings that the CLI
//! prints before exporting, or instead of exporting with `--dry-run`.

use crate::styling::StyleMatch;
use crate::tree::{Child, EbookDocument, Tag};
use crate::EbookError;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// A non-fatal issue found before conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationWarning {
    fn new(message: impl Into<String>, suggestion: Option<&str>) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.map(str::to_string),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "⚠ {}", self.message)?;
        if let Some(hint) = &self.suggestion {
            write!(f, "\n  💡 {}", hint)?;
        }
        Ok(())
    }
}

/// Deepest nesting level below the body, counting top-level children as 0.
///
/// Walks with an explicit stack so that pathological inputs cannot blow the
/// call stack here.
pub fn max_depth(document: &EbookDocument) -> usize {
    let Some(body) = document.body.as_ref() else {
        return 0;
    };

    let mut deepest = 0;
    let mut stack: Vec<(&Child, usize)> = body.children().iter().map(|c| (c, 0)).collect();
    while let Some((child, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        if let Child::Node(node) = child {
            stack.extend(node.children().iter().map(|c| (c, depth + 1)));
        }
    }
    deepest
}

/// Rejects documents nested deeper than the style's depth limit.
pub fn validate_tree(document: &EbookDocument, style: &StyleMatch) -> Result<(), EbookError> {
    let depth = max_depth(document);
    let limit = style.depth_limit();
    if depth > limit {
        return Err(EbookError::DepthExceeded {
            limit,
            key: format!("depth {}", depth),
        });
    }
    Ok(())
}

/// Collects pre-flight warnings for converting `document` to `output_path`.
pub fn validate_conversion(
    document: &EbookDocument,
    style: &StyleMatch,
    output_path: Option<&str>,
) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if document.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        warnings.push(ValidationWarning::new(
            "Document has no title; the suggested file name is ebook.pdf",
            Some("Add a `title:` entry to the front matter"),
        ));
    }

    let top_level = document.body.as_ref().map(|b| b.children()).unwrap_or(&[]);
    if top_level.is_empty() {
        warnings.push(ValidationWarning::new(
            "Document has no content; the PDF will contain a single empty page",
            None,
        ));
    } else if !top_level.iter().any(|c| c.has_tag(&Tag::H2)) {
        warnings.push(ValidationWarning::new(
            "No second-level headings found; all content goes on the cover segment",
            Some("Start each chapter with a `##` heading to get one page per chapter"),
        ));
    }

    let mut unknown = BTreeSet::new();
    let mut hr_with_children = false;
    if let Some(body) = document.body.as_ref() {
        let mut stack: Vec<&Child> = body.children().iter().collect();
        while let Some(child) = stack.pop() {
            if let Child::Node(node) = child {
                match &node.tag {
                    Tag::Unknown(name) => {
                        unknown.insert(name.clone());
                    }
                    Tag::Hr if !node.children().is_empty() => hr_with_children = true,
                    _ => {}
                }
                stack.extend(node.children());
            }
        }
    }

    if !unknown.is_empty() {
        let names: Vec<String> = unknown.into_iter().collect();
        warnings.push(ValidationWarning::new(
            format!(
                "Rendered as generic containers: {}",
                names.join(", ")
            ),
            None,
        ));
    }

    if hr_with_children {
        warnings.push(ValidationWarning::new(
            "Horizontal rule with children found; the children are not rendered",
            None,
        ));
    }

    let depth = max_depth(document);
    if depth > style.depth_limit() {
        warnings.push(ValidationWarning::new(
            format!(
                "Document nests {} levels deep, more than the limit of {}",
                depth,
                style.depth_limit()
            ),
            Some("Raise `max_depth` in the [render] section or flatten the document"),
        ));
    }

    if let Some(path) = output_path {
        let path = Path::new(path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                warnings.push(ValidationWarning::new(
                    format!("Output directory {} does not exist", parent.display()),
                    Some("Create the directory first"),
                ));
            }
        }
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            warnings.push(ValidationWarning::new(
                format!("Output path {} does not end in .pdf", path.display()),
                None,
            ));
        }
    }

    warnings
}
