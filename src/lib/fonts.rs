//! Font loading for the PDF backend.
//!
//! The three PDF base families (Helvetica, Times, Courier) are referenced without
//! embedding; a system font only provides glyph metrics for layout. Any other family
//! is looked up in the user's font paths first, then among system fonts, and embedded.

use fontdb::Database;
use genpdfi_extended::error::{Error, ErrorKind};
use genpdfi_extended::fonts::{FontData, FontFamily};
use log::{debug, info, warn};
use printpdf::BuiltinFont;
use rusttype::Font;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::EbookError;

/// Font overrides coming from the command line.
#[derive(Debug, Clone, Default)]
pub struct FontConfig {
    /// Font directories or files searched before system fonts
    pub custom_paths: Vec<PathBuf>,
    /// Replaces the page font family of the style table
    pub default_font: Option<String>,
    /// Replaces the font family of inline code
    pub code_font: Option<String>,
}

/// Font style variant types
#[derive(Debug, Clone, Copy)]
enum FontVariant {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontVariant {
    /// File name suffixes seen for this variant, compared after normalisation.
    fn suffixes(&self) -> &[&str] {
        match self {
            FontVariant::Regular => &["", "regular"],
            FontVariant::Bold => &["bold", "bd", "b"],
            FontVariant::Italic => &["italic", "it", "i", "oblique"],
            FontVariant::BoldItalic => &["bolditalic", "boldit", "bdit", "bi", "boldoblique"],
        }
    }
}

/// PDF base families available without embedding.
enum BuiltinVariants {
    Helvetica,
    Times,
    Courier,
}

impl BuiltinVariants {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "helvetica" | "arial" | "sans" | "sans-serif" => Some(BuiltinVariants::Helvetica),
            "times" | "timesnewroman" | "times new roman" | "serif" => Some(BuiltinVariants::Times),
            "courier" | "couriernew" | "courier new" | "monospace" => Some(BuiltinVariants::Courier),
            _ => None,
        }
    }

    fn metric_candidates(&self) -> &[&str] {
        match self {
            BuiltinVariants::Helvetica => &["Helvetica", "Arial", "LiberationSans", "DejaVuSans"],
            BuiltinVariants::Times => &["Times", "LiberationSerif", "DejaVuSerif"],
            BuiltinVariants::Courier => &["Courier", "LiberationMono", "DejaVuSansMono"],
        }
    }

    fn variant(&self, variant: FontVariant) -> BuiltinFont {
        match self {
            BuiltinVariants::Helvetica => match variant {
                FontVariant::Regular => BuiltinFont::Helvetica,
                FontVariant::Bold => BuiltinFont::HelveticaBold,
                FontVariant::Italic => BuiltinFont::HelveticaOblique,
                FontVariant::BoldItalic => BuiltinFont::HelveticaBoldOblique,
            },
            BuiltinVariants::Times => match variant {
                FontVariant::Regular => BuiltinFont::TimesRoman,
                FontVariant::Bold => BuiltinFont::TimesBold,
                FontVariant::Italic => BuiltinFont::TimesItalic,
                FontVariant::BoldItalic => BuiltinFont::TimesBoldItalic,
            },
            BuiltinVariants::Courier => match variant {
                FontVariant::Regular => BuiltinFont::Courier,
                FontVariant::Bold => BuiltinFont::CourierBold,
                FontVariant::Italic => BuiltinFont::CourierOblique,
                FontVariant::BoldItalic => BuiltinFont::CourierBoldOblique,
            },
        }
    }
}

/// Whether `name` refers to one of the PDF base families.
pub fn is_builtin_family(name: &str) -> bool {
    BuiltinVariants::from_name(name).is_some()
}

fn normalise(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf"))
}

fn read_valid_font(path: &Path) -> Option<Vec<u8>> {
    let bytes = fs::read(path)
        .map_err(|e| warn!("Failed to read font file {:?}: {}", path, e))
        .ok()?;
    if Font::try_from_bytes(&bytes).is_some() {
        Some(bytes)
    } else {
        None
    }
}

/// Loads a PDF base family. The glyph metrics come from the closest system font.
pub fn load_builtin_font_family(name: &str) -> Result<FontFamily<FontData>, Error> {
    let builtin = BuiltinVariants::from_name(name).unwrap_or(BuiltinVariants::Helvetica);
    let font_bytes = Arc::new(load_metric_font_bytes(builtin.metric_candidates())?);

    let mk_data = |variant: FontVariant| -> Result<FontData, Error> {
        FontData::new_shared(font_bytes.clone(), Some(builtin.variant(variant)))
    };

    Ok(FontFamily {
        regular: mk_data(FontVariant::Regular)?,
        bold: mk_data(FontVariant::Bold)?,
        italic: mk_data(FontVariant::Italic)?,
        bold_italic: mk_data(FontVariant::BoldItalic)?,
    })
}

/// Finds a system font for base-family metrics, preferring `candidates` and
/// settling for any readable TTF/OTF file.
fn load_metric_font_bytes(candidates: &[&str]) -> Result<Vec<u8>, Error> {
    let mut db = Database::new();
    db.load_system_fonts();

    let files: Vec<&Path> = db
        .faces()
        .filter_map(|face| match &face.source {
            fontdb::Source::File(p) if is_font_file(p) => Some(p.as_path()),
            _ => None,
        })
        .collect();

    let wanted: Vec<String> = candidates.iter().map(|c| normalise(c)).collect();
    let preferred = files.iter().filter(|path| {
        let stem = path
            .file_stem()
            .and_then(|n| n.to_str())
            .map(normalise)
            .unwrap_or_default();
        wanted.iter().any(|w| stem.starts_with(w.as_str()))
    });

    for path in preferred.chain(files.iter()) {
        if let Some(bytes) = read_valid_font(path) {
            debug!("Using {:?} for built-in font metrics", path);
            return Ok(bytes);
        }
    }

    Err(Error::new(
        "No usable system font found for built-in font metrics".to_string(),
        ErrorKind::InvalidFont,
    ))
}

/// Looks for the file of one variant of `name` in the given directories or files.
fn find_variant_file(name: &str, variant: FontVariant, paths: &[PathBuf]) -> Option<Vec<u8>> {
    let base = normalise(name);
    let matches = |path: &Path| {
        let stem = path
            .file_stem()
            .and_then(|n| n.to_str())
            .map(normalise)
            .unwrap_or_default();
        variant
            .suffixes()
            .iter()
            .any(|suffix| stem == format!("{}{}", base, suffix))
    };

    for custom_path in paths {
        if custom_path.is_file() {
            if is_font_file(custom_path) && matches(custom_path) {
                if let Some(bytes) = read_valid_font(custom_path) {
                    return Some(bytes);
                }
            }
        } else if let Ok(entries) = fs::read_dir(custom_path) {
            let mut files: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
            files.sort();
            for path in files {
                if is_font_file(&path) && matches(&path) {
                    if let Some(bytes) = read_valid_font(&path) {
                        return Some(bytes);
                    }
                }
            }
        }
    }
    None
}

/// Loads `name` from the custom paths, with whatever style variants are present
/// next to the regular file, or else from the system font database.
pub fn load_custom_font_family(
    name: &str,
    custom_paths: &[PathBuf],
) -> Result<FontFamily<FontData>, Error> {
    if let Some(regular) = find_variant_file(name, FontVariant::Regular, custom_paths) {
        let regular = Arc::new(regular);
        let variant = |variant: FontVariant| -> Result<FontData, Error> {
            match find_variant_file(name, variant, custom_paths) {
                Some(bytes) => FontData::new(bytes, None),
                None => FontData::new_shared(regular.clone(), None),
            }
        };
        info!("Loaded font '{}' from custom paths", name);
        return Ok(FontFamily {
            regular: FontData::new_shared(regular.clone(), None)?,
            bold: variant(FontVariant::Bold)?,
            italic: variant(FontVariant::Italic)?,
            bold_italic: variant(FontVariant::BoldItalic)?,
        });
    }

    load_system_font_family(name)
}

/// Embeds the first system face whose family name matches `name`, for all four styles.
fn load_system_font_family(name: &str) -> Result<FontFamily<FontData>, Error> {
    let mut db = Database::new();
    db.load_system_fonts();

    let wanted = normalise(name);
    for face in db.faces() {
        let path = match &face.source {
            fontdb::Source::File(p) if is_font_file(p) => p,
            _ => continue,
        };
        let family_matches = face
            .families
            .iter()
            .any(|(family, _)| normalise(family) == wanted);
        if !family_matches {
            continue;
        }
        if let Some(bytes) = read_valid_font(path) {
            info!("Using system font {:?} for '{}'", path, name);
            let shared = Arc::new(bytes);
            let mk = || FontData::new_shared(shared.clone(), None);
            return Ok(FontFamily {
                regular: mk()?,
                bold: mk()?,
                italic: mk()?,
                bold_italic: mk()?,
            });
        }
    }

    Err(Error::new(
        format!("No usable system font found for family '{}'.", name),
        ErrorKind::InvalidFont,
    ))
}

/// Loads the family `name`, falling back to Helvetica when it cannot be found.
pub fn load_font_family(
    name: &str,
    font_config: Option<&FontConfig>,
) -> Result<FontFamily<FontData>, EbookError> {
    let result = if is_builtin_family(name) {
        load_builtin_font_family(name)
    } else {
        let paths = font_config.map(|c| c.custom_paths.as_slice()).unwrap_or(&[]);
        load_custom_font_family(name, paths).or_else(|e| {
            warn!("Font '{}' unavailable ({}), falling back to Helvetica", name, e);
            load_builtin_font_family("helvetica")
        })
    };

    result.map_err(|e| EbookError::FontError {
        font_name: name.to_string(),
        message: e.to_string(),
        suggestion: "Install a TrueType font (for example DejaVu or Liberation) or pass --font-path"
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_family_names() {
        assert!(is_builtin_family("Courier"));
        assert!(is_builtin_family("times new roman"));
        assert!(is_builtin_family("helvetica"));
        assert!(!is_builtin_family("Space Mono"));
    }

    #[test]
    fn test_builtin_variant_mapping() {
        let courier = BuiltinVariants::Courier;
        assert!(matches!(courier.variant(FontVariant::Bold), BuiltinFont::CourierBold));
        let times = BuiltinVariants::Times;
        assert!(matches!(times.variant(FontVariant::Italic), BuiltinFont::TimesItalic));
    }

    #[test]
    fn test_normalise() {
        assert_eq!(normalise("DejaVu Sans-Bold"), "dejavusansbold");
        assert_eq!(normalise("Space_Mono"), "spacemono");
    }

    #[test]
    fn test_missing_custom_font_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("NotAFont.ttf"), b"garbage").unwrap();
        let paths = vec![dir.path().to_path_buf()];
        assert!(find_variant_file("NotAFont", FontVariant::Regular, &paths).is_none());
        assert!(find_variant_file("Other", FontVariant::Regular, &paths).is_none());
    }
}
