//! Configuration module for styling the generated ebook.
//!
//! This module loads the style table from TOML. Every section is optional; anything
//! missing keeps the value of the built-in theme, and a file that cannot be read or
//! parsed falls back to the built-in theme entirely.
//!
//! # Configuration Structure
//!
//! - `page` sets the trim size (`size = "a5"` or `width`/`height` in mm), `margins`,
//!   base `fontsize`, `fontfamily` and `textcolor` (inherited by `cover` and `interior`),
//!   and the `backgroundcolor` filled behind every page
//! - `cover` controls the first page: `top_offset` (mm), `textcolor`, `alignment`
//! - `interior` sets the `textcolor` of every later page
//! - `bands.cover` and `bands.interior` are arrays of decorative strips
//! - `heading.1` to `heading.4`, `paragraph`, `strong`, `emphasis`, `span`, `link`,
//!   `code`, `div` and `fallback` style the matching elements
//! - `list.unordered`, `list.ordered`, `list.item`, `list.nested` and `list.text` style
//!   lists; `list.bullet` sets the bullet glyph
//! - `horizontal_rule` spaces rules, `rule` sets their `thickness` and `color`
//! - `render.max_depth` bounds the tree nesting the renderer accepts
//!
//! # Style Properties
//!
//! Each style section supports:
//! - `size` - Font size in points (integer)
//! - `fontfamily` - Font family name (string)
//! - `textcolor` - Text color: `{ r = 0, g = 0, b = 0 }`
//! - `backgroundcolor` - Background color: `{ r = 255, g = 255, b = 255 }`
//! - `beforespacing` / `afterspacing` - Vertical space in lines (float)
//! - `alignment` - "left", "center", "right" or "justify"
//! - `bold`, `italic`, `underline` - booleans
//! - `indent` - Left indentation in mm (float)
//!
//! The complete default configuration is available from [`default_config_toml`], or from
//! the CLI with `--get-default-configuration`.

use crate::styling::{
    Band, BandEdge, BasicTextStyle, Margins, PageSize, StyleMatch, TextAlignment,
    MAX_DEPTH_CEILING,
};
use crate::EbookError;
use log::{debug, warn};
use std::fs;
use std::path::Path;
use toml::Value;

/// Configuration source for styling configuration.
/// Determines where the TOML configuration should be loaded from.
#[derive(Debug, Clone)]
pub enum ConfigSource<'a> {
    /// Use default built-in styling configuration
    Default,
    /// Load configuration from a file path
    File(&'a str),
    /// Use embedded TOML configuration string (compile-time embedded)
    Embedded(&'a str),
}

const DEFAULT_CONFIG: &str = r#"# markdown2ebook default configuration
# Lengths are millimetres, font sizes points, spacings multiples of the line height.

[page]
size = "a5"
margins = { top = 17.0, right = 10.5, bottom = 10.5, left = 10.5 }
fontsize = 10
textcolor = { r = 31, g = 33, b = 34 }
backgroundcolor = { r = 245, g = 245, b = 245 }

[cover]
top_offset = 60.0
alignment = "center"
textcolor = { r = 31, g = 33, b = 34 }

[interior]
textcolor = { r = 31, g = 33, b = 34 }

[bands]
cover = []
interior = [
    { edge = "top", offset = 0.0, height = 3.5, color = { r = 31, g = 33, b = 34 } },
    { edge = "top", offset = 6.35, height = 1.4, color = { r = 31, g = 33, b = 34 } },
    { edge = "bottom", offset = 0.0, height = 1.4, color = { r = 255, g = 3, b = 240 } },
]

[heading.1]
size = 28
afterspacing = 0.5
alignment = "center"
bold = true

[heading.2]
size = 14
afterspacing = 0.4
alignment = "left"
bold = true

[heading.3]
size = 12
beforespacing = 0.5
afterspacing = 0.3
alignment = "left"
bold = true

[heading.4]
size = 10
beforespacing = 0.4
afterspacing = 0.2
alignment = "left"
bold = true

[paragraph]
afterspacing = 0.4
alignment = "justify"

[list]
bullet = "• "

[list.unordered]
afterspacing = 0.4
indent = 1.4

[list.ordered]
afterspacing = 0.4
indent = 1.4

[list.item]
afterspacing = 0.2
alignment = "justify"

[list.nested]
indent = 1.4

[link]
textcolor = { r = 255, g = 3, b = 240 }
alignment = "justify"
bold = true
underline = true

[code]
size = 9
fontfamily = "courier"
backgroundcolor = { r = 255, g = 3, b = 240 }
pad = true

[strong]
bold = true

[emphasis]
italic = true

[span]
alignment = "justify"

[horizontal_rule]
beforespacing = 0.3
afterspacing = 0.3

[rule]
thickness = 0.2
color = { r = 31, g = 33, b = 34 }

[render]
max_depth = 64
"#;

/// The built-in configuration as TOML, equivalent to [`StyleMatch::default`].
pub fn default_config_toml() -> &'static str {
    DEFAULT_CONFIG
}

/// Reads a TOML number as `f32`, accepting integers too.
fn as_number(value: Option<&Value>) -> Option<f32> {
    let value = value?;
    value
        .as_float()
        .map(|f| f as f32)
        .or_else(|| value.as_integer().map(|i| i as f32))
}

/// Parses an RGB color stored under `field` of a TOML table.
fn parse_color(value: Option<&Value>, field: &str) -> Option<(u8, u8, u8)> {
    value.and_then(|c| {
        let color = c.get(field)?;
        let channel = |name: &str| u8::try_from(color.get(name)?.as_integer()?).ok();
        Some((channel("r")?, channel("g")?, channel("b")?))
    })
}

/// Parses text alignment; unrecognised names fall back to left.
fn parse_alignment(value: Option<&Value>) -> Option<TextAlignment> {
    value.and_then(|v| v.as_str()).map(|s| match s {
        "left" => TextAlignment::Left,
        "center" => TextAlignment::Center,
        "right" => TextAlignment::Right,
        "justify" => TextAlignment::Justify,
        other => {
            warn!("Unknown alignment '{}', using left", other);
            TextAlignment::Left
        }
    })
}

/// Parses a text style, keeping `default` for every property that is not set.
fn parse_style(value: Option<&Value>, default: BasicTextStyle) -> BasicTextStyle {
    let mut style = default;
    if let Some(style_config) = value {
        if let Some(size) = style_config.get("size").and_then(|v| v.as_integer()) {
            style.size = u8::try_from(size).ok().or(style.size);
        }
        if let Some(spacing) = as_number(style_config.get("beforespacing")) {
            style.before_spacing = spacing;
        }
        if let Some(spacing) = as_number(style_config.get("afterspacing")) {
            style.after_spacing = spacing;
        }
        if let Some(color) = parse_color(Some(style_config), "textcolor") {
            style.text_color = Some(color);
        }
        if let Some(bg_color) = parse_color(Some(style_config), "backgroundcolor") {
            style.background_color = Some(bg_color);
        }
        if let Some(alignment) = parse_alignment(style_config.get("alignment")) {
            style.alignment = Some(alignment);
        }
        if let Some(font) = style_config.get("fontfamily").and_then(|v| v.as_str()) {
            style.font_family = Some(font.to_string());
        }
        if let Some(bold) = style_config.get("bold").and_then(|v| v.as_bool()) {
            style.bold = bold;
        }
        if let Some(italic) = style_config.get("italic").and_then(|v| v.as_bool()) {
            style.italic = italic;
        }
        if let Some(underline) = style_config.get("underline").and_then(|v| v.as_bool()) {
            style.underline = underline;
        }
        if let Some(indent) = as_number(style_config.get("indent")) {
            style.indent = indent;
        }
    }
    style
}

fn parse_margins(value: Option<&Value>, default: Margins) -> Margins {
    match value {
        Some(margins) => Margins {
            top: as_number(margins.get("top")).unwrap_or(default.top),
            right: as_number(margins.get("right")).unwrap_or(default.right),
            bottom: as_number(margins.get("bottom")).unwrap_or(default.bottom),
            left: as_number(margins.get("left")).unwrap_or(default.left),
        },
        None => default,
    }
}

/// Named sizes win over explicit dimensions; explicit dimensions need both sides.
fn parse_page_size(page: &Value, default: PageSize) -> PageSize {
    if let Some(name) = page.get("size").and_then(|v| v.as_str()) {
        match PageSize::from_name(name) {
            Some(size) => return size,
            None => warn!("Unknown page size '{}', keeping the default", name),
        }
    }
    match (as_number(page.get("width")), as_number(page.get("height"))) {
        (Some(width), Some(height)) if width > 0.0 && height > 0.0 => {
            PageSize::Custom { width, height }
        }
        _ => default,
    }
}

fn parse_band(value: &Value) -> Option<Band> {
    let edge = match value.get("edge").and_then(|v| v.as_str()).unwrap_or("top") {
        "top" => BandEdge::Top,
        "bottom" => BandEdge::Bottom,
        other => {
            warn!("Ignoring band with unknown edge '{}'", other);
            return None;
        }
    };
    Some(Band {
        edge,
        offset: as_number(value.get("offset")).unwrap_or(0.0),
        height: as_number(value.get("height"))?,
        color: parse_color(Some(value), "color")?,
    })
}

fn parse_bands(value: Option<&Value>, default: Vec<Band>) -> Vec<Band> {
    match value.and_then(|v| v.as_array()) {
        Some(entries) => entries.iter().filter_map(parse_band).collect(),
        None => default,
    }
}

/// Parses a TOML configuration string and returns a complete StyleMatch.
///
/// Invalid TOML yields the built-in theme.
///
/// # Example
/// ```rust
/// use markdown2ebook::config::parse_config_string;
///
/// let config = r#"
/// [page]
/// size = "a4"
///
/// [heading.2]
/// size = 18
///
/// [list]
/// bullet = "- "
/// "#;
/// let style = parse_config_string(config);
/// assert_eq!(style.page.size.dimensions(), (210.0, 297.0));
/// assert_eq!(style.heading_2.size, Some(18));
/// assert_eq!(style.bullet, "- ");
/// ```
pub fn parse_config_string(config_str: &str) -> StyleMatch {
    let config: Value = match toml::from_str(config_str) {
        Ok(v) => v,
        Err(e) => {
            warn!("Invalid configuration, using defaults: {}", e);
            return StyleMatch::default();
        }
    };

    let default_style = StyleMatch::default();
    let mut style = default_style.clone();

    if let Some(page) = config.get("page") {
        style.page.size = parse_page_size(page, default_style.page.size);
        style.page.margins = parse_margins(page.get("margins"), default_style.page.margins);
        if let Some(size) = page.get("fontsize").and_then(|v| v.as_integer()) {
            style.page.font_size = u8::try_from(size).unwrap_or(default_style.page.font_size);
        }
        if let Some(font) = page.get("fontfamily").and_then(|v| v.as_str()) {
            style.page.font_family = Some(font.to_string());
        }
        if let Some(color) = parse_color(Some(page), "textcolor") {
            style.page.text_color = color;
            style.cover.text_color = color;
            style.interior.text_color = color;
        }
        if let Some(color) = parse_color(Some(page), "backgroundcolor") {
            style.page.background_color = color;
        }
    }

    if let Some(cover) = config.get("cover") {
        if let Some(offset) = as_number(cover.get("top_offset")) {
            style.cover.top_offset = offset;
        }
        if let Some(color) = parse_color(Some(cover), "textcolor") {
            style.cover.text_color = color;
        }
        if let Some(alignment) = parse_alignment(cover.get("alignment")) {
            style.cover.alignment = alignment;
        }
    }

    if let Some(color) = parse_color(config.get("interior"), "textcolor") {
        style.interior.text_color = color;
    }

    let bands = config.get("bands");
    style.cover.bands = parse_bands(
        bands.and_then(|b| b.get("cover")),
        default_style.cover.bands,
    );
    style.interior.bands = parse_bands(
        bands.and_then(|b| b.get("interior")),
        default_style.interior.bands,
    );

    let heading = |level: &str| config.get("heading").and_then(|h| h.get(level));
    style.heading_1 = parse_style(heading("1"), default_style.heading_1);
    style.heading_2 = parse_style(heading("2"), default_style.heading_2);
    style.heading_3 = parse_style(heading("3"), default_style.heading_3);
    style.heading_4 = parse_style(heading("4"), default_style.heading_4);
    style.paragraph = parse_style(config.get("paragraph"), default_style.paragraph);

    let list = config.get("list");
    let list_section = |name: &str| list.and_then(|l| l.get(name));
    style.unordered_list = parse_style(list_section("unordered"), default_style.unordered_list);
    style.ordered_list = parse_style(list_section("ordered"), default_style.ordered_list);
    style.list_item = parse_style(list_section("item"), default_style.list_item);
    style.nested_list = parse_style(list_section("nested"), default_style.nested_list);
    style.list_text = parse_style(list_section("text"), default_style.list_text);
    if let Some(bullet) = list_section("bullet").and_then(|v| v.as_str()) {
        style.bullet = bullet.to_string();
    }

    style.link = parse_style(config.get("link"), default_style.link);
    style.code = parse_style(config.get("code"), default_style.code);
    if let Some(pad) = config
        .get("code")
        .and_then(|c| c.get("pad"))
        .and_then(|v| v.as_bool())
    {
        style.pad_inline_code = pad;
    }
    style.strong = parse_style(config.get("strong"), default_style.strong);
    style.emphasis = parse_style(config.get("emphasis"), default_style.emphasis);
    style.span = parse_style(config.get("span"), default_style.span);
    style.div = parse_style(config.get("div"), default_style.div);
    style.fallback = parse_style(config.get("fallback"), default_style.fallback);
    style.horizontal_rule =
        parse_style(config.get("horizontal_rule"), default_style.horizontal_rule);

    if let Some(rule) = config.get("rule") {
        if let Some(thickness) = as_number(rule.get("thickness")) {
            style.rule.thickness = thickness;
        }
        if let Some(color) = parse_color(Some(rule), "color") {
            style.rule.color = color;
        }
    }

    if let Some(depth) = config
        .get("render")
        .and_then(|r| r.get("max_depth"))
        .and_then(|v| v.as_integer())
    {
        match usize::try_from(depth) {
            Ok(depth) if depth > MAX_DEPTH_CEILING => {
                warn!(
                    "render.max_depth {} is above the ceiling, using {}",
                    depth, MAX_DEPTH_CEILING
                );
                style.max_depth = MAX_DEPTH_CEILING;
            }
            Ok(depth) if depth > 0 => style.max_depth = depth,
            _ => warn!("Ignoring invalid render.max_depth {}", depth),
        }
    }

    style
}

/// Loads and parses the complete styling configuration based on the provided source.
///
/// # Examples
/// ```rust
/// use markdown2ebook::config::{ConfigSource, load_config_from_source};
///
/// let style = load_config_from_source(ConfigSource::Default);
/// assert_eq!(style.bullet, "• ");
///
/// // A missing file falls back to the defaults
/// let style = load_config_from_source(ConfigSource::File("missing.toml"));
/// assert_eq!(style.max_depth, 64);
///
/// const EMBEDDED: &str = r#"
///     [render]
///     max_depth = 16
/// "#;
/// let style = load_config_from_source(ConfigSource::Embedded(EMBEDDED));
/// assert_eq!(style.max_depth, 16);
/// ```
pub fn load_config_from_source(source: ConfigSource) -> StyleMatch {
    match source {
        ConfigSource::Default => StyleMatch::default(),
        ConfigSource::File(path) => {
            let config_str = match fs::read_to_string(Path::new(path)) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Cannot read configuration {}: {}, using defaults", path, e);
                    return StyleMatch::default();
                }
            };
            debug!("Loaded configuration from {}", path);
            parse_config_string(&config_str)
        }
        ConfigSource::Embedded(content) => parse_config_string(content),
    }
}

/// Loads a configuration file the user asked for explicitly.
///
/// Unlike [`load_config_from_source`], an unreadable file or malformed TOML is an error.
pub fn load_config_file(path: &str) -> Result<StyleMatch, EbookError> {
    let config_str = fs::read_to_string(Path::new(path)).map_err(|e| EbookError::ConfigError {
        message: format!("Cannot read {}: {}", path, e),
        suggestion: "Check the path passed with --config".to_string(),
    })?;
    if let Err(e) = toml::from_str::<Value>(&config_str) {
        return Err(EbookError::ConfigError {
            message: format!("Invalid TOML in {}: {}", path, e),
            suggestion: "Compare with the output of --get-default-configuration".to_string(),
        });
    }
    debug!("Loaded configuration from {}", path);
    Ok(parse_config_string(&config_str))
}
