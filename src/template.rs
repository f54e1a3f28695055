use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;
use zip::ZipArchive;

use crate::error::ConvertError;
use crate::styles::{StyleCatalog, StyleEntry};

/// A loaded .docx template: its style catalog plus the raw styles part,
/// carried verbatim into the output so template formatting applies.
pub struct Template {
    pub catalog: StyleCatalog,
    pub styles_xml: String,
}

impl Template {
    /// Open a template document and enumerate the styles it offers.
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let unreadable = |reason: String| ConvertError::TemplateUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| unreadable(e.to_string()))?;
        let mut styles_xml = String::new();
        archive
            .by_name("word/styles.xml")
            .map_err(|e| unreadable(format!("no styles part: {e}")))?
            .read_to_string(&mut styles_xml)
            .map_err(|e| unreadable(e.to_string()))?;

        let catalog = scrape_styles(&styles_xml);
        debug!(
            "template {} advertises {} styles",
            path.display(),
            catalog.len()
        );
        Ok(Self {
            catalog,
            styles_xml,
        })
    }
}

/// Pull (styleId, display name) pairs out of a styles part.
///
/// The part is scanned textually; a full XML parse buys nothing here since
/// WordprocessingML serializes these two attributes the same way in every
/// producer we care about.
fn scrape_styles(xml: &str) -> StyleCatalog {
    let mut entries = Vec::new();
    for chunk in xml.split("<w:style ").skip(1) {
        let chunk = &chunk[..chunk.find("</w:style>").unwrap_or(chunk.len())];
        let Some(id) = attr_value(chunk, "w:styleId=\"") else {
            continue;
        };
        let name = chunk
            .find("<w:name ")
            .and_then(|at| attr_value(&chunk[at..], "w:val=\""))
            .unwrap_or_else(|| id.clone());
        entries.push(StyleEntry {
            id: unescape_xml(&id),
            name: unescape_xml(&name),
        });
    }
    StyleCatalog::new(entries)
}

fn attr_value(s: &str, key: &str) -> Option<String> {
    let start = s.find(key)? + key.len();
    let rest = &s[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::StyleRole;

    const STYLES: &str = r#"<?xml version="1.0"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="AUTitle">
    <w:name w:val="Heading 1"/>
    <w:basedOn w:val="Normal"/>
  </w:style>
  <w:style w:type="character" w:styleId="Strong">
    <w:name w:val="Strong"/>
  </w:style>
</w:styles>"#;

    #[test]
    fn scrapes_ids_and_names() {
        let catalog = scrape_styles(STYLES);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.resolve(StyleRole::Heading(1)).style_id, "AUTitle");
        assert_eq!(catalog.resolve(StyleRole::Normal).style_id, "Normal");
    }

    #[test]
    fn style_without_name_uses_its_id() {
        let xml = r#"<w:styles><w:style w:styleId="Quote"></w:style></w:styles>"#;
        let catalog = scrape_styles(xml);
        assert_eq!(catalog.resolve(StyleRole::Quote).style_id, "Quote");
    }

    #[test]
    fn entities_in_names_are_decoded() {
        let xml = r#"<w:style w:styleId="X"><w:name w:val="Q &amp; A"/></w:style>"#;
        let catalog = scrape_styles(xml);
        assert_eq!(catalog.entries()[0].name, "Q & A");
    }

    #[test]
    fn empty_part_yields_empty_catalog() {
        assert!(scrape_styles("<w:styles/>").is_empty());
    }
}
