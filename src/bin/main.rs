use clap::{Arg, ArgAction, Command};
use log::{debug, error, info, warn};
use markdown2ebook::config::{self, ConfigSource};
use markdown2ebook::fonts::FontConfig;
use markdown2ebook::styling::StyleMatch;
use markdown2ebook::tree::EbookDocument;
use markdown2ebook::{validation, EbookError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const RC_FILE: &str = "markdown2ebookrc.toml";

#[derive(Debug)]
enum AppError {
    FileReadError(std::io::Error),
    InputError(String),
    ConversionError(String),
    PathError(String),
    FileWriteError(std::io::Error),
}

impl From<EbookError> for AppError {
    fn from(e: EbookError) -> Self {
        AppError::ConversionError(e.to_string())
    }
}

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verbosity {
    Quiet,   // No output except errors
    Normal,  // Standard output
    Verbose, // Detailed output
}

/// What a `--path` file holds, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq)]
enum InputKind {
    Markdown,
    Tree,
}

fn input_kind(path: &Path) -> Result<InputKind, AppError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("md") | Some("markdown") => Ok(InputKind::Markdown),
        Some("json") => Ok(InputKind::Tree),
        _ => Err(AppError::InputError(format!(
            "{} is not a Markdown (.md, .markdown) or document tree (.json) file",
            path.display()
        ))),
    }
}

fn get_document(matches: &clap::ArgMatches) -> Result<EbookDocument, AppError> {
    if let Some(file_path) = matches.get_one::<String>("path") {
        let path = Path::new(file_path);
        let kind = input_kind(path)?;
        let source = fs::read_to_string(path).map_err(AppError::FileReadError)?;
        debug!("Read {} bytes from {} as {:?}", source.len(), file_path, kind);

        let document = match kind {
            InputKind::Markdown => markdown2ebook::markdown::parse_markdown(&source)?,
            InputKind::Tree => EbookDocument::from_json(&source)?,
        };
        Ok(document)
    } else if let Some(markdown_string) = matches.get_one::<String>("string") {
        Ok(markdown2ebook::markdown::parse_markdown(markdown_string)?)
    } else {
        Err(AppError::InputError("No input provided".to_string()))
    }
}

/// Loads the style table.
///
/// Priority order:
/// 1. If `--config` is explicitly provided, load that file and fail if it is unusable
/// 2. If `markdown2ebookrc.toml` exists in current directory, use it
/// 3. Otherwise use default configuration
fn get_style(matches: &clap::ArgMatches) -> Result<StyleMatch, AppError> {
    if let Some(config_file) = matches.get_one::<String>("config") {
        return Ok(config::load_config_file(config_file)?);
    }

    if Path::new(RC_FILE).exists() {
        debug!("Using {} from the current directory", RC_FILE);
        return Ok(config::load_config_from_source(ConfigSource::File(RC_FILE)));
    }

    Ok(config::load_config_from_source(ConfigSource::Default))
}

/// Output path from `--output`, or the file name derived from the document title.
fn get_output_path(
    matches: &clap::ArgMatches,
    document: &EbookDocument,
) -> Result<PathBuf, AppError> {
    let current_dir = std::env::current_dir().map_err(|e| AppError::PathError(e.to_string()))?;

    Ok(matches
        .get_one::<String>("output")
        .map(|p| current_dir.join(p))
        .unwrap_or_else(|| {
            current_dir.join(markdown2ebook::output_file_name(document.title.as_deref()))
        }))
}

fn get_font_config(matches: &clap::ArgMatches) -> Option<FontConfig> {
    if !matches.contains_id("font-path")
        && !matches.contains_id("default-font")
        && !matches.contains_id("code-font")
    {
        return None;
    }

    Some(FontConfig {
        custom_paths: matches
            .get_many::<String>("font-path")
            .map(|values| values.map(PathBuf::from).collect())
            .unwrap_or_default(),
        default_font: matches.get_one::<String>("default-font").cloned(),
        code_font: matches.get_one::<String>("code-font").cloned(),
    })
}

fn run(matches: clap::ArgMatches) -> Result<(), AppError> {
    let verbosity = if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let dry_run = matches.get_flag("dry-run");
    let preview = matches.get_flag("preview");

    let document = get_document(&matches)?;
    let style = get_style(&matches)?;
    let output_path = get_output_path(&matches, &document)?;
    let output_path_str = output_path
        .to_str()
        .ok_or_else(|| AppError::PathError("Invalid output path".to_string()))?;
    let font_config = get_font_config(&matches);

    let warnings = validation::validate_conversion(
        &document,
        &style,
        (!preview).then_some(output_path_str),
    );
    if verbosity != Verbosity::Quiet {
        if !warnings.is_empty() {
            if verbosity == Verbosity::Verbose {
                info!("🔍 Pre-flight validation:");
            }
            for warning in &warnings {
                warn!("{}", warning);
            }
        } else if verbosity == Verbosity::Verbose {
            info!("✓ Pre-flight validation passed");
        }

        if dry_run {
            println!("✓ Dry-run validation complete. No PDF generated.");
            if warnings.is_empty() {
                println!("✓ No issues detected. Run without --dry-run to generate the ebook.");
            } else {
                println!(
                    "⚠️  {} warning(s) found. Review above and run without --dry-run to generate the ebook anyway.",
                    warnings.len()
                );
            }
            return Ok(());
        }
    } else if dry_run {
        return if warnings.is_empty() {
            Ok(())
        } else {
            Err(AppError::ConversionError(format!(
                "{} validation warnings",
                warnings.len()
            )))
        };
    }

    let layout = markdown2ebook::build_layout(&document, &style)?;

    if let Some(dump_path) = matches.get_one::<String>("dump-layout") {
        layout
            .save_to_json_file(dump_path)
            .map_err(AppError::FileWriteError)?;
        if verbosity != Verbosity::Quiet {
            println!("📝 Layout written to {}", dump_path);
        }
    }

    if preview {
        print!("{}", layout.outline());
        return Ok(());
    }

    if verbosity == Verbosity::Verbose {
        info!("📄 Generating PDF...");
        info!("   Segments: {}", layout.pages.len());
        if let Some(font) = font_config.as_ref().and_then(|c| c.default_font.as_ref()) {
            info!("   Font: {}", font);
        }
    }

    markdown2ebook::render_layout_into_file(layout, style, output_path_str, font_config.as_ref())?;

    if verbosity != Verbosity::Quiet {
        println!("✅ Successfully saved PDF to {}", output_path_str);

        if verbosity == Verbosity::Verbose {
            if let Ok(metadata) = fs::metadata(output_path_str) {
                let size_kb = metadata.len() as f64 / 1024.0;
                if size_kb < 1024.0 {
                    println!("   Size: {:.1} KB", size_kb);
                } else {
                    println!("   Size: {:.2} MB", size_kb / 1024.0);
                }
            }
        }
    }

    Ok(())
}

fn build_cli() -> Command {
    Command::new("markdown2ebook")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert a Markdown document into a paginated PDF ebook, one page per chapter")
        .after_help(
            "EXAMPLES:\n  \
            markdown2ebook -p book.md\n  \
            markdown2ebook -p book.md -o out/book.pdf --default-font \"DejaVu Sans\"\n  \
            markdown2ebook -p book.md --preview\n  \
            markdown2ebook -p tree.json --dump-layout layout.json --dry-run\n",
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .value_name("FILE_PATH")
                .help("Markdown file (.md, .markdown) or document tree (.json)")
                .conflicts_with("string"),
        )
        .arg(
            Arg::new("string")
                .short('s')
                .long("string")
                .value_name("MARKDOWN_STRING")
                .help("Markdown content as a string")
                .conflicts_with("path"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_PATH")
                .help("Path to the output PDF file (defaults to the title with whitespace replaced by '_')"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG_FILE")
                .help("Path to configuration file (TOML format). Auto-detects markdown2ebookrc.toml if not specified"),
        )
        .arg(
            Arg::new("font-path")
                .long("font-path")
                .value_name("PATH")
                .help("Path to custom font directory or font file")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("default-font")
                .long("default-font")
                .value_name("FONT_NAME")
                .help("Default font family to use (default: helvetica)"),
        )
        .arg(
            Arg::new("code-font")
                .long("code-font")
                .value_name("FONT_NAME")
                .help("Font for inline code (default: courier)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show detailed output including validation warnings and file size")
                .action(ArgAction::SetTrue)
                .conflicts_with("quiet"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Validate input without generating the ebook")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("preview")
                .long("preview")
                .help("Print a page-by-page outline of the ebook instead of writing a PDF")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-layout")
                .long("dump-layout")
                .value_name("JSON_FILE")
                .help("Write the assembled page layout as JSON"),
        )
        .arg(
            Arg::new("get-default-configuration")
                .long("get-default-configuration")
                .help("Print a default markdown2ebookrc.toml to stdout and exit")
                .action(ArgAction::SetTrue),
        )
}

fn main() {
    // Initialize logger with environment variable control (RUST_LOG)
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    let mut cmd = build_cli();
    let matches = cmd.clone().get_matches();

    if matches.get_flag("get-default-configuration") {
        println!("{}", config::default_config_toml());
        process::exit(0);
    }

    if !matches.contains_id("path") && !matches.contains_id("string") {
        let _ = cmd.print_help();
        println!();
        process::exit(1);
    }

    if let Err(e) = run(matches) {
        match e {
            AppError::FileReadError(e) => error!("[X] Error reading file: {}", e),
            AppError::InputError(e) => error!("[X] Input error: {}", e),
            AppError::ConversionError(e) => error!("[X] Conversion error: {}", e),
            AppError::PathError(e) => error!("[X] Path error: {}", e),
            AppError::FileWriteError(e) => error!("[X] Error writing file: {}", e),
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kind_by_extension() {
        assert_eq!(input_kind(Path::new("book.md")).unwrap(), InputKind::Markdown);
        assert_eq!(
            input_kind(Path::new("Book.MARKDOWN")).unwrap(),
            InputKind::Markdown
        );
        assert_eq!(input_kind(Path::new("tree.json")).unwrap(), InputKind::Tree);
        assert!(matches!(
            input_kind(Path::new("notes.txt")),
            Err(AppError::InputError(_))
        ));
        assert!(matches!(
            input_kind(Path::new("README")),
            Err(AppError::InputError(_))
        ));
    }

    #[test]
    fn test_get_output_path_default_and_custom() {
        let document = EbookDocument::new(Some("My Great Book".to_string()), None);

        let matches = build_cli().get_matches_from(vec!["markdown2ebook", "-s", "x"]);
        let default_path = get_output_path(&matches, &document).unwrap();
        assert!(default_path.ends_with("My_Great_Book.pdf"));

        let untitled = EbookDocument::default();
        assert!(get_output_path(&matches, &untitled)
            .unwrap()
            .ends_with("ebook.pdf"));

        let matches =
            build_cli().get_matches_from(vec!["markdown2ebook", "-s", "x", "-o", "my.pdf"]);
        assert!(get_output_path(&matches, &document)
            .unwrap()
            .ends_with("my.pdf"));
    }

    #[test]
    fn test_get_document_from_string_and_files() {
        let matches = build_cli().get_matches_from(vec!["markdown2ebook", "-s", "## Hello"]);
        let document = get_document(&matches).unwrap();
        assert_eq!(document.body.unwrap().children().len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree.json");
        fs::write(
            &tree,
            r#"{"title": "T", "body": {"tag": "div", "children": [{"tag": "h2", "children": ["A"]}]}}"#,
        )
        .unwrap();
        let matches =
            build_cli().get_matches_from(vec!["markdown2ebook", "-p", tree.to_str().unwrap()]);
        let document = get_document(&matches).unwrap();
        assert_eq!(document.title.as_deref(), Some("T"));

        let missing = dir.path().join("missing.md");
        let matches =
            build_cli().get_matches_from(vec!["markdown2ebook", "-p", missing.to_str().unwrap()]);
        assert!(matches!(
            get_document(&matches),
            Err(AppError::FileReadError(_))
        ));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let matches = build_cli().get_matches_from(vec![
            "markdown2ebook",
            "-s",
            "x",
            "--config",
            "does-not-exist.toml",
        ]);
        assert!(matches!(
            get_style(&matches),
            Err(AppError::ConversionError(_))
        ));
    }

    #[test]
    fn test_font_config_only_with_font_flags() {
        let matches = build_cli().get_matches_from(vec!["markdown2ebook", "-s", "x"]);
        assert!(get_font_config(&matches).is_none());

        let matches = build_cli().get_matches_from(vec![
            "markdown2ebook",
            "-s",
            "x",
            "--font-path",
            "a",
            "--font-path",
            "b",
            "--code-font",
            "Courier",
        ]);
        let config = get_font_config(&matches).unwrap();
        assert_eq!(config.custom_paths.len(), 2);
        assert_eq!(config.code_font.as_deref(), Some("Courier"));
        assert!(config.default_font.is_none());
    }

    #[test]
    fn test_run_dry_run_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("book.md");
        fs::write(&input, "---\ntitle: Small\n---\n\n# Small\n\n## One\n\nText\n").unwrap();
        let output = dir.path().join("small.pdf");

        let matches = build_cli().get_matches_from(vec![
            "markdown2ebook",
            "-p",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--dry-run",
        ]);
        assert!(run(matches).is_ok());
        assert!(!output.exists());
    }
}
