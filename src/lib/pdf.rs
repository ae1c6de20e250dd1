//! PDF generation for an assembled ebook.
//!
//! Every page segment of the [`EbookLayout`] is laid out on its own physical page, and
//! continues on following pages when it overflows. Line-starting elements (headings,
//! paragraphs, bullet lines) become paragraphs, nested inline elements become styled
//! runs inside them, and blocks become indented vertical layouts. A `pre` block keeps
//! its line structure: each source line is a paragraph of its own.
//!
//! Page presentation is handled by [`EbookPageDecorator`]: it fills the page
//! background, draws the decorative bands of the current presentation across the
//! full page and then applies the margins. The presentation switches from cover to interior through a zero-size
//! marker element placed right before the first page break.

use crate::assemble::{EbookLayout, PageKind};
use crate::fonts::{self, FontConfig};
use crate::layout::{BlockRole, LayoutElement};
use crate::styling::{self, Band, BandEdge, BasicTextStyle, StyleMatch, TextAlignment};
use crate::EbookError;
use genpdfi_extended::elements::{Break, LinearLayout, PageBreak, Paragraph};
use genpdfi_extended::error::Error;
use genpdfi_extended::fonts::{Font, FontData, FontFamily};
use genpdfi_extended::style::{Color, LineStyle, Style};
use genpdfi_extended::{
    render, Alignment, Context, Document, Element, Margins, Mm, PageDecorator, Position,
    RenderResult, Size,
};
use log::{debug, info};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Text attributes after inheritance from enclosing elements.
#[derive(Debug, Clone, PartialEq)]
struct Resolved {
    size: u8,
    color: (u8, u8, u8),
    bold: bool,
    italic: bool,
    font_family: Option<String>,
    alignment: TextAlignment,
}

impl Resolved {
    fn merge(&self, style: &BasicTextStyle) -> Self {
        Self {
            size: style.size.unwrap_or(self.size),
            color: style.text_color.unwrap_or(self.color),
            bold: self.bold || style.bold,
            italic: self.italic || style.italic,
            font_family: style.font_family.clone().or_else(|| self.font_family.clone()),
            alignment: style.alignment.unwrap_or(self.alignment),
        }
    }
}

fn rgb(color: (u8, u8, u8)) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

/// genpdfi has no justified text; justified paragraphs are set flush left.
fn pdf_alignment(alignment: TextAlignment) -> Alignment {
    match alignment {
        TextAlignment::Left | TextAlignment::Justify => Alignment::Left,
        TextAlignment::Center => Alignment::Center,
        TextAlignment::Right => Alignment::Right,
    }
}

fn font_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One line of preformatted text, as runs with their attributes.
type PreLine = Vec<(String, Resolved)>;

/// Splits the runs below a `pre` block at every newline.
fn preformatted_lines(elements: &[LayoutElement], inherited: &Resolved) -> Vec<PreLine> {
    let mut lines = vec![Vec::new()];
    collect_preformatted(elements, inherited, &mut lines);
    lines
}

fn collect_preformatted(elements: &[LayoutElement], inherited: &Resolved, lines: &mut Vec<PreLine>) {
    for element in elements {
        match element {
            LayoutElement::Text { content, .. } => {
                for (index, part) in content.split('\n').enumerate() {
                    if index > 0 {
                        lines.push(Vec::new());
                    }
                    if part.is_empty() {
                        continue;
                    }
                    if let Some(line) = lines.last_mut() {
                        line.push((part.to_string(), inherited.clone()));
                    }
                }
            }
            LayoutElement::Block {
                style, children, ..
            }
            | LayoutElement::Inline {
                style, children, ..
            }
            | LayoutElement::Link {
                style, children, ..
            } => collect_preformatted(children, &inherited.merge(style), lines),
            LayoutElement::Rule { .. } => {}
        }
    }
}

fn is_preformatted(role: &BlockRole) -> bool {
    matches!(role, BlockRole::Fallback(name) if name == "pre")
}

/// Every element style of the table, for font discovery.
fn element_styles(style: &StyleMatch) -> [&BasicTextStyle; 18] {
    [
        &style.heading_1,
        &style.heading_2,
        &style.heading_3,
        &style.heading_4,
        &style.paragraph,
        &style.unordered_list,
        &style.ordered_list,
        &style.list_item,
        &style.nested_list,
        &style.list_text,
        &style.link,
        &style.code,
        &style.strong,
        &style.emphasis,
        &style.span,
        &style.horizontal_rule,
        &style.div,
        &style.fallback,
    ]
}

/// Fills the page, draws the bands of the current presentation, then insets the
/// content area.
pub struct EbookPageDecorator {
    margins: styling::Margins,
    page_height: f32,
    background: (u8, u8, u8),
    cover_offset: f32,
    cover_bands: Vec<Band>,
    interior_bands: Vec<Band>,
    current: Rc<Cell<PageKind>>,
    page: usize,
}

impl EbookPageDecorator {
    fn new(style: &StyleMatch, current: Rc<Cell<PageKind>>) -> Self {
        Self {
            margins: style.page.margins,
            page_height: style.page.size.dimensions().1,
            background: style.page.background_color,
            cover_offset: style.cover.top_offset,
            cover_bands: style.cover.bands.clone(),
            interior_bands: style.interior.bands.clone(),
            current,
            page: 0,
        }
    }

    /// Top inset of the current page; the cover offset only applies to page one.
    fn top_margin(&self, kind: PageKind) -> f32 {
        if kind == PageKind::Cover && self.page == 1 {
            self.margins.top + self.cover_offset
        } else {
            self.margins.top
        }
    }
}

/// The page fill, as one band as tall as the page.
fn background_band(page_height: f32, color: (u8, u8, u8)) -> Band {
    Band {
        edge: BandEdge::Top,
        offset: 0.0,
        height: page_height,
        color,
    }
}

fn draw_band(area: &render::Area<'_>, band: &Band) {
    let size = area.size();
    let half = Mm::from(band.height / 2.0);
    let y = match band.edge {
        BandEdge::Top => Mm::from(band.offset) + half,
        BandEdge::Bottom => size.height - Mm::from(band.offset) - half,
    };
    area.draw_line(
        vec![Position::new(Mm::from(0.0), y), Position::new(size.width, y)],
        LineStyle::new()
            .with_thickness(band.height)
            .with_color(rgb(band.color)),
    );
}

impl PageDecorator for EbookPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        _context: &Context,
        mut area: render::Area<'a>,
        _style: Style,
    ) -> Result<render::Area<'a>, Error> {
        self.page += 1;
        let kind = self.current.get();
        draw_band(&area, &background_band(self.page_height, self.background));
        let bands = match kind {
            PageKind::Cover => &self.cover_bands,
            PageKind::Interior => &self.interior_bands,
        };
        for band in bands {
            draw_band(&area, band);
        }

        let top = self.top_margin(kind);
        debug!("Decorating page {} as {:?}", self.page, kind);
        area.add_margins(Margins::trbl(
            top,
            self.margins.right,
            self.margins.bottom,
            self.margins.left,
        ));
        Ok(area)
    }
}

/// Switches the presentation used for the pages that follow.
struct PageKindMarker {
    kind: PageKind,
    current: Rc<Cell<PageKind>>,
}

impl Element for PageKindMarker {
    fn render(
        &mut self,
        _context: &Context,
        _area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        self.current.set(self.kind);
        Ok(RenderResult::default())
    }
}

/// A full-width horizontal line.
struct RuleElement {
    thickness: f32,
    color: (u8, u8, u8),
}

impl Element for RuleElement {
    fn render(
        &mut self,
        _context: &Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let width = area.size().width;
        let y = Mm::from(self.thickness / 2.0);
        area.draw_line(
            vec![Position::new(Mm::from(0.0), y), Position::new(width, y)],
            LineStyle::new()
                .with_thickness(self.thickness)
                .with_color(rgb(self.color)),
        );
        Ok(RenderResult {
            size: Size::new(width, Mm::from(self.thickness)),
            has_more: false,
        })
    }
}

/// Writes layout elements of one page into genpdfi elements.
struct Emitter<'a> {
    style: &'a StyleMatch,
    fonts: &'a HashMap<String, FontFamily<Font>>,
    forced_alignment: Option<TextAlignment>,
}

impl Emitter<'_> {
    fn text_style(&self, resolved: &Resolved) -> Style {
        let mut style = Style::new()
            .with_font_size(resolved.size)
            .with_color(rgb(resolved.color));
        if resolved.bold {
            style = style.bold();
        }
        if resolved.italic {
            style = style.italic();
        }
        if let Some(family) = resolved
            .font_family
            .as_deref()
            .and_then(|name| self.fonts.get(&font_key(name)))
        {
            style = style.with_font_override(*family);
        }
        style
    }

    fn paragraph(&self, resolved: &Resolved) -> Paragraph {
        let mut para = Paragraph::default();
        para.set_alignment(pdf_alignment(
            self.forced_alignment.unwrap_or(resolved.alignment),
        ));
        para
    }

    fn space(layout: &mut LinearLayout, lines: f32) {
        if lines > 0.0 {
            layout.push(Break::new(lines));
        }
    }

    fn flush(layout: &mut LinearLayout, pending: &mut Option<Paragraph>) {
        if let Some(para) = pending.take() {
            layout.push(para);
        }
    }

    /// Lays out block-level content; runs between line-starting elements are
    /// gathered into one paragraph.
    fn emit_blocks(&self, layout: &mut LinearLayout, elements: &[LayoutElement], inherited: &Resolved) {
        let mut pending: Option<Paragraph> = None;

        for element in elements {
            match element {
                LayoutElement::Inline {
                    role,
                    style,
                    children,
                    ..
                } if role.starts_line() => {
                    Self::flush(layout, &mut pending);
                    let resolved = inherited.merge(style);
                    let mut para = self.paragraph(&resolved);
                    self.emit_runs(&mut para, children, &resolved);
                    Self::space(layout, style.before_spacing);
                    layout.push(para);
                    Self::space(layout, style.after_spacing);
                }
                LayoutElement::Block {
                    role,
                    style,
                    children,
                    ..
                } => {
                    Self::flush(layout, &mut pending);
                    let resolved = inherited.merge(style);
                    let mut inner = LinearLayout::vertical();
                    if is_preformatted(role) {
                        self.emit_preformatted(&mut inner, children, &resolved);
                    } else {
                        self.emit_blocks(&mut inner, children, &resolved);
                    }
                    Self::space(layout, style.before_spacing);
                    if style.indent > 0.0 {
                        layout.push(inner.padded(Margins::trbl(0.0, 0.0, 0.0, style.indent)));
                    } else {
                        layout.push(inner);
                    }
                    Self::space(layout, style.after_spacing);
                }
                LayoutElement::Rule { style, .. } => {
                    Self::flush(layout, &mut pending);
                    Self::space(layout, style.before_spacing);
                    layout.push(RuleElement {
                        thickness: self.style.rule.thickness,
                        color: self.style.rule.color,
                    });
                    Self::space(layout, style.after_spacing);
                }
                LayoutElement::Text { .. }
                | LayoutElement::Inline { .. }
                | LayoutElement::Link { .. } => {
                    let para = pending.get_or_insert_with(|| self.paragraph(inherited));
                    self.emit_runs(para, std::slice::from_ref(element), inherited);
                }
            }
        }

        Self::flush(layout, &mut pending);
    }

    fn emit_preformatted(&self, layout: &mut LinearLayout, elements: &[LayoutElement], inherited: &Resolved) {
        for line in preformatted_lines(elements, inherited) {
            let mut para = self.paragraph(inherited);
            if line.is_empty() {
                // Keeps the height of blank lines.
                para.push_styled(" ", self.text_style(inherited));
            }
            for (text, resolved) in line {
                para.push_styled(text, self.text_style(&resolved));
            }
            layout.push(para);
        }
    }

    /// Adds styled runs to a paragraph. Blocks met here are flattened into the line.
    fn emit_runs(&self, para: &mut Paragraph, elements: &[LayoutElement], inherited: &Resolved) {
        for element in elements {
            match element {
                LayoutElement::Text { content, .. } => {
                    para.push_styled(content.clone(), self.text_style(inherited));
                }
                LayoutElement::Inline {
                    style, children, ..
                }
                | LayoutElement::Block {
                    style, children, ..
                } => {
                    self.emit_runs(para, children, &inherited.merge(style));
                }
                LayoutElement::Link { href, style, .. } => {
                    let resolved = inherited.merge(style);
                    para.push_link(element.plain_text(), href.clone(), self.text_style(&resolved));
                }
                LayoutElement::Rule { key, .. } => {
                    debug!("Skipping rule {} inside a line", key);
                }
            }
        }
    }
}

/// The PDF generator for an assembled ebook.
///
/// Fonts are loaded up front: the page font family plus every other family named in
/// the style table.
pub struct Pdf {
    layout: EbookLayout,
    style: StyleMatch,
    font_family: FontFamily<FontData>,
    extra_families: Vec<(String, FontFamily<FontData>)>,
}

impl Pdf {
    /// Creates a generator, applying the font overrides of `font_config` to `style`.
    pub fn new(
        layout: EbookLayout,
        mut style: StyleMatch,
        font_config: Option<&FontConfig>,
    ) -> Result<Self, EbookError> {
        if let Some(cfg) = font_config {
            if let Some(font) = &cfg.default_font {
                style.page.font_family = Some(font.clone());
            }
            if let Some(font) = &cfg.code_font {
                style.code.font_family = Some(font.clone());
            }
        }

        let main_name = style
            .page
            .font_family
            .clone()
            .unwrap_or_else(|| "helvetica".to_string());
        info!("Loading page font '{}'", main_name);
        let font_family = fonts::load_font_family(&main_name, font_config)?;

        let mut extra_families: Vec<(String, FontFamily<FontData>)> = Vec::new();
        for name in element_styles(&style)
            .iter()
            .filter_map(|s| s.font_family.as_deref())
        {
            let key = font_key(name);
            if key == font_key(&main_name) || extra_families.iter().any(|(k, _)| *k == key) {
                continue;
            }
            debug!("Loading element font '{}'", name);
            extra_families.push((key, fonts::load_font_family(name, font_config)?));
        }

        Ok(Self {
            layout,
            style,
            font_family,
            extra_families,
        })
    }

    /// Finalizes and outputs the processed document to a PDF file at the specified path.
    pub fn render(document: Document, path: &str) -> Option<String> {
        match document.render_to_file(path) {
            Ok(_) => None,
            Err(err) => Some(err.to_string()),
        }
    }

    /// Renders the processed document to bytes.
    pub fn render_to_bytes(document: Document) -> Result<Vec<u8>, String> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        match document.render(&mut buffer) {
            Ok(_) => Ok(buffer.into_inner()),
            Err(err) => Err(err.to_string()),
        }
    }

    /// Builds the genpdfi document: paper size, title, decorator, then one page
    /// segment after another.
    pub fn render_into_document(&self) -> Result<Document, EbookError> {
        let mut doc = Document::new(self.font_family.clone());
        if let Some(title) = &self.layout.title {
            doc.set_title(title.clone());
        }
        let (width, height) = self.style.page.size.dimensions();
        doc.set_paper_size(Size::new(width, height));
        doc.set_font_size(self.style.page.font_size);

        let mut fonts = HashMap::new();
        for (key, family) in &self.extra_families {
            fonts.insert(key.clone(), doc.add_font_family(family.clone()));
        }

        let current = Rc::new(Cell::new(PageKind::Cover));
        doc.set_page_decorator(EbookPageDecorator::new(&self.style, current.clone()));

        for (index, page) in self.layout.pages.iter().enumerate() {
            if index > 0 {
                doc.push(PageKindMarker {
                    kind: page.kind,
                    current: current.clone(),
                });
                doc.push(PageBreak::new());
            }

            let (color, forced_alignment) = match page.kind {
                PageKind::Cover => (self.style.cover.text_color, Some(self.style.cover.alignment)),
                PageKind::Interior => (self.style.interior.text_color, None),
            };
            let base = Resolved {
                size: self.style.page.font_size,
                color,
                bold: false,
                italic: false,
                font_family: None,
                alignment: TextAlignment::Left,
            };
            let emitter = Emitter {
                style: &self.style,
                fonts: &fonts,
                forced_alignment,
            };

            let mut content = LinearLayout::vertical();
            emitter.emit_blocks(&mut content, &page.elements, &base);
            doc.push(content);
        }

        debug!("Prepared {} page segment(s)", self.layout.pages.len());
        Ok(doc)
    }
}
