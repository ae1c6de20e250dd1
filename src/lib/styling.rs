//! Style table shared by the renderer and the PDF backend.
//!
//! A [`StyleMatch`] is built once (from defaults or from a TOML file, see
//! [`crate::config`]) and then only borrowed. Two render configurations, for
//! instance a preview theme and an export theme, are just two values.
//!
//! Units: font sizes are points, spacings are multiples of the current line
//! height, and every other length (margins, indents, bands) is millimetres.

use serde::Serialize;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    Left,
    Center,
    Right,
    Justify,
}

/// Style attributes of a single layout element.
///
/// Unset options inherit from the enclosing element.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BasicTextStyle {
    pub size: Option<u8>,
    pub before_spacing: f32,
    pub after_spacing: f32,
    pub text_color: Option<(u8, u8, u8)>,
    pub background_color: Option<(u8, u8, u8)>,
    pub alignment: Option<TextAlignment>,
    pub font_family: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Left indentation of a block, in millimetres.
    pub indent: f32,
}

impl BasicTextStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u8) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_spacing(mut self, before: f32, after: f32) -> Self {
        self.before_spacing = before;
        self.after_spacing = after;
        self
    }

    pub fn with_color(mut self, color: (u8, u8, u8)) -> Self {
        self.text_color = Some(color);
        self
    }

    pub fn with_background(mut self, color: (u8, u8, u8)) -> Self {
        self.background_color = Some(color);
        self
    }

    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn with_indent(mut self, indent: f32) -> Self {
        self.indent = indent;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

/// Physical trim size shared by every page of the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSize {
    A4,
    A5,
    Letter,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "a4" => Some(PageSize::A4),
            "a5" => Some(PageSize::A5),
            "letter" => Some(PageSize::Letter),
            _ => None,
        }
    }

    /// Width and height in millimetres.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::A5 => (148.0, 210.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Page edge a decorative band is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandEdge {
    Top,
    Bottom,
}

/// Full-width colored strip drawn on every physical page of a presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub edge: BandEdge,
    /// Distance from the anchoring edge, in millimetres.
    pub offset: f32,
    pub height: f32,
    pub color: (u8, u8, u8),
}

/// Page-level settings common to both presentations.
#[derive(Debug, Clone, PartialEq)]
pub struct PageStyle {
    pub size: PageSize,
    pub margins: Margins,
    pub font_size: u8,
    pub font_family: Option<String>,
    pub text_color: (u8, u8, u8),
    /// Fill behind every page, cover and interior alike.
    pub background_color: (u8, u8, u8),
}

/// Presentation of the first page segment.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverStyle {
    /// Extra space above the cover content on the first physical page, in millimetres.
    ///
    /// The cover is meant to sit in the vertical middle of the page. Its height is only
    /// known once genpdfi has laid it out, so a fixed offset stands in for real
    /// centring. The default of 60 mm roughly centres a title, a subtitle and a byline on
    /// an A5 page; longer covers sit lower than centre and can overflow, so tune it per
    /// book. Overflow pages of the cover get no offset.
    pub top_offset: f32,
    pub text_color: (u8, u8, u8),
    pub alignment: TextAlignment,
    pub bands: Vec<Band>,
}

/// Presentation of every page segment after the first.
#[derive(Debug, Clone, PartialEq)]
pub struct InteriorStyle {
    pub text_color: (u8, u8, u8),
    pub bands: Vec<Band>,
}

/// Horizontal rule appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleStyle {
    pub thickness: f32,
    pub color: (u8, u8, u8),
}

/// The complete style table.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMatch {
    pub page: PageStyle,
    pub cover: CoverStyle,
    pub interior: InteriorStyle,
    pub heading_1: BasicTextStyle,
    pub heading_2: BasicTextStyle,
    pub heading_3: BasicTextStyle,
    pub heading_4: BasicTextStyle,
    pub paragraph: BasicTextStyle,
    pub unordered_list: BasicTextStyle,
    pub ordered_list: BasicTextStyle,
    pub list_item: BasicTextStyle,
    pub nested_list: BasicTextStyle,
    /// The bullet line of a list item.
    pub list_text: BasicTextStyle,
    pub link: BasicTextStyle,
    pub code: BasicTextStyle,
    pub strong: BasicTextStyle,
    pub emphasis: BasicTextStyle,
    pub span: BasicTextStyle,
    pub horizontal_rule: BasicTextStyle,
    pub rule: RuleStyle,
    pub div: BasicTextStyle,
    /// Container used for tags outside the known set.
    pub fallback: BasicTextStyle,
    pub bullet: String,
    /// Surround inline code with a space on each side.
    pub pad_inline_code: bool,
    /// Deepest tree nesting the renderer accepts, capped at [`MAX_DEPTH_CEILING`].
    pub max_depth: usize,
}

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Hard cap on nesting for every recursive walk, whatever the configuration says.
pub const MAX_DEPTH_CEILING: usize = 512;

const INK: (u8, u8, u8) = (31, 33, 34);
const ACCENT: (u8, u8, u8) = (255, 3, 240);
const PAPER: (u8, u8, u8) = (245, 245, 245);

impl StyleMatch {
    /// The nesting limit actually enforced.
    pub fn depth_limit(&self) -> usize {
        self.max_depth.min(MAX_DEPTH_CEILING)
    }

    pub fn heading(&self, level: u8) -> &BasicTextStyle {
        match level {
            1 => &self.heading_1,
            2 => &self.heading_2,
            3 => &self.heading_3,
            _ => &self.heading_4,
        }
    }
}

impl Default for StyleMatch {
    fn default() -> Self {
        Self {
            page: PageStyle {
                size: PageSize::A5,
                margins: Margins {
                    top: 17.0,
                    right: 10.5,
                    bottom: 10.5,
                    left: 10.5,
                },
                font_size: 10,
                font_family: None,
                text_color: INK,
                background_color: PAPER,
            },
            cover: CoverStyle {
                top_offset: 60.0,
                text_color: INK,
                alignment: TextAlignment::Center,
                bands: Vec::new(),
            },
            interior: InteriorStyle {
                text_color: INK,
                bands: vec![
                    Band {
                        edge: BandEdge::Top,
                        offset: 0.0,
                        height: 3.5,
                        color: INK,
                    },
                    Band {
                        edge: BandEdge::Top,
                        offset: 6.35,
                        height: 1.4,
                        color: INK,
                    },
                    Band {
                        edge: BandEdge::Bottom,
                        offset: 0.0,
                        height: 1.4,
                        color: ACCENT,
                    },
                ],
            },
            heading_1: BasicTextStyle::new()
                .with_size(28)
                .with_spacing(0.0, 0.5)
                .with_alignment(TextAlignment::Center)
                .bold(),
            heading_2: BasicTextStyle::new()
                .with_size(14)
                .with_spacing(0.0, 0.4)
                .with_alignment(TextAlignment::Left)
                .bold(),
            heading_3: BasicTextStyle::new()
                .with_size(12)
                .with_spacing(0.5, 0.3)
                .with_alignment(TextAlignment::Left)
                .bold(),
            heading_4: BasicTextStyle::new()
                .with_size(10)
                .with_spacing(0.4, 0.2)
                .with_alignment(TextAlignment::Left)
                .bold(),
            paragraph: BasicTextStyle::new()
                .with_spacing(0.0, 0.4)
                .with_alignment(TextAlignment::Justify),
            unordered_list: BasicTextStyle::new()
                .with_spacing(0.0, 0.4)
                .with_indent(1.4),
            ordered_list: BasicTextStyle::new()
                .with_spacing(0.0, 0.4)
                .with_indent(1.4),
            list_item: BasicTextStyle::new()
                .with_spacing(0.0, 0.2)
                .with_alignment(TextAlignment::Justify),
            nested_list: BasicTextStyle::new().with_indent(1.4),
            list_text: BasicTextStyle::new(),
            link: BasicTextStyle::new()
                .with_color(ACCENT)
                .with_alignment(TextAlignment::Justify)
                .bold()
                .underline(),
            code: BasicTextStyle::new()
                .with_size(9)
                .with_font_family("courier")
                .with_background(ACCENT),
            strong: BasicTextStyle::new().bold(),
            emphasis: BasicTextStyle::new().italic(),
            span: BasicTextStyle::new().with_alignment(TextAlignment::Justify),
            horizontal_rule: BasicTextStyle::new().with_spacing(0.3, 0.3),
            rule: RuleStyle {
                thickness: 0.2,
                color: INK,
            },
            div: BasicTextStyle::new(),
            fallback: BasicTextStyle::new(),
            bullet: "• ".to_string(),
            pad_inline_code: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
