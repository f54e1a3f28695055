mod block;
mod config;
mod docx;
mod error;
mod inline;
mod parser;
mod styles;
mod template;

pub use block::{Block, Span};
pub use config::Config;
pub use error::ConvertError;
pub use inline::{Run, RunStyle, flatten, format_line};
pub use parser::{Parsed, parse};
pub use styles::{ResolvedStyle, StyleCatalog, StyleEntry, StyleRole};
pub use template::Template;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

/// Summary of one successful conversion.
#[derive(Debug)]
pub struct Conversion {
    pub output: PathBuf,
    pub blocks: usize,
    /// Constructs rendered as plain text because they are unsupported.
    pub degraded: usize,
}

/// Convert markdown text to .docx bytes.
pub fn markdown_to_docx(
    markdown: &str,
    template: Option<&Template>,
    config: &Config,
) -> Result<Vec<u8>, ConvertError> {
    let parsed = parser::parse(markdown);
    Ok(docx::render(&parsed.blocks, template, config)?.bytes)
}

/// Convert a markdown file to a .docx document on disk.
///
/// The document is rendered fully in memory and written in one step, so a
/// failed conversion never leaves a partial output file behind.
pub fn convert(
    input: &Path,
    template_path: Option<&Path>,
    output: Option<&Path>,
    config: &Config,
) -> Result<Conversion, ConvertError> {
    let markdown = read_source(input)?;
    info!("read {} characters from {}", markdown.len(), input.display());

    let template = match template_path {
        Some(path) => Some(Template::load(path)?),
        None => None,
    };
    match &template {
        Some(t) => info!("template loaded with {} styles", t.catalog.len()),
        None => debug!("no template, using built-in styles"),
    }

    let parsed = parser::parse(&markdown);
    debug!("parsed {} blocks", parsed.blocks.len());

    let rendered = docx::render(&parsed.blocks, template.as_ref(), config)?;

    let output = output.map_or_else(|| default_output(input), Path::to_path_buf);
    fs::write(&output, &rendered.bytes).map_err(|source| ConvertError::OutputUnwritable {
        path: output.clone(),
        source,
    })?;

    let degraded = parsed.degraded + rendered.degraded;
    if degraded > 0 {
        warn!("{degraded} unsupported constructs were rendered as plain text");
    }
    Ok(Conversion {
        output,
        blocks: parsed.blocks.len(),
        degraded,
    })
}

fn read_source(path: &Path) -> Result<String, ConvertError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("md" | "markdown") => {}
        _ => warn!("{} does not have a markdown extension", path.display()),
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConvertError::InputNotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ConvertError::InputUnreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            // Legacy exports are usually Latin-1; every byte maps
            warn!("{} is not valid UTF-8, decoding as Latin-1", path.display());
            Ok(e.into_bytes().iter().map(|&b| b as char).collect())
        }
    }
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "document".to_string(), |s| s.to_string_lossy().into_owned());
    input.with_file_name(format!("{stem}_converted.docx"))
}
