//! WordprocessingML emission: blocks in, a complete .docx archive out.
//!
//! The document body is streamed block by block; numbering instances are
//! allocated along the way and serialized into the numbering part at the
//! end. When a template is present its styles part is embedded verbatim,
//! otherwise a built-in part covers the roles the translator asks for.

use std::io::{self, Cursor, Write};

use log::{debug, warn};
use zip::ZipWriter;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;

use crate::block::{Block, Span};
use crate::config::Config;
use crate::error::ConvertError;
use crate::inline::{self, Run, RunStyle};
use crate::styles::{StyleCatalog, StyleRole};
use crate::template::Template;

/// Highest `w:ilvl` WordprocessingML accepts.
const MAX_LIST_LEVEL: usize = 8;

/// A rendered document plus what got degraded along the way.
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub degraded: usize,
}

/// Render blocks into a complete .docx archive.
pub fn render(
    blocks: &[Block],
    template: Option<&Template>,
    config: &Config,
) -> Result<Rendered, ConvertError> {
    let builtin;
    let catalog = match template {
        Some(t) => &t.catalog,
        None => {
            builtin = StyleCatalog::builtin();
            &builtin
        }
    };

    let mut document = Vec::new();
    let stats = write_body(&mut document, blocks, catalog, config)?;

    let styles = template.map_or(BUILTIN_STYLES_XML, |t| t.styles_xml.as_str());
    let bytes = package(&document, styles, &stats.instances).map_err(|e| {
        ConvertError::Translation {
            index: blocks.len(),
            source: io::Error::other(e),
        }
    })?;
    debug!(
        "packaged {} bytes, {} numbering instances",
        bytes.len(),
        stats.instances.len()
    );
    Ok(Rendered {
        bytes,
        degraded: stats.degraded,
    })
}

struct BodyStats {
    instances: Vec<NumberingInstance>,
    degraded: usize,
}

struct NumberingInstance {
    id: usize,
    ordered: bool,
}

/// Numbering instances for the current run of consecutive list items.
///
/// `reset` is called on every non-list block, so a later list gets fresh
/// instances and never continues the previous list's numbering.
#[derive(Default)]
struct ListNumbering {
    bullet: Option<usize>,
    ordered: Option<usize>,
    instances: Vec<NumberingInstance>,
}

impl ListNumbering {
    fn instance(&mut self, ordered: bool) -> usize {
        let slot = if ordered {
            &mut self.ordered
        } else {
            &mut self.bullet
        };
        if let Some(id) = *slot {
            return id;
        }
        let id = self.instances.len() + 1;
        self.instances.push(NumberingInstance { id, ordered });
        *slot = Some(id);
        id
    }

    fn reset(&mut self) {
        self.bullet = None;
        self.ordered = None;
    }
}

fn write_body<W: Write>(
    out: &mut W,
    blocks: &[Block],
    catalog: &StyleCatalog,
    config: &Config,
) -> Result<BodyStats, ConvertError> {
    let mut numbering = ListNumbering::default();
    let mut degraded = 0usize;
    for (index, block) in blocks.iter().enumerate() {
        write_block(out, block, catalog, config, &mut numbering, &mut degraded).map_err(
            |source| ConvertError::Translation { index, source },
        )?;
    }
    Ok(BodyStats {
        instances: numbering.instances,
        degraded,
    })
}

fn write_block<W: Write>(
    out: &mut W,
    block: &Block,
    catalog: &StyleCatalog,
    config: &Config,
    numbering: &mut ListNumbering,
    degraded: &mut usize,
) -> io::Result<()> {
    if !matches!(block, Block::ListItem { .. }) {
        numbering.reset();
    }

    match block {
        Block::Heading { level, content } => {
            let resolved = catalog.resolve(StyleRole::Heading(*level));
            let ppr = format!(r#"<w:pStyle w:val="{}"/>"#, resolved.style_id);
            write_paragraph(out, &ppr, &inline::flatten(content), config)
        }

        Block::Paragraph { content } => {
            let resolved = catalog.resolve(StyleRole::Normal);
            let ppr = format!(r#"<w:pStyle w:val="{}"/>"#, resolved.style_id);
            write_paragraph(out, &ppr, &inline::flatten(content), config)
        }

        Block::ListItem {
            ordered,
            depth,
            checked,
            content,
        } => {
            let role = if *ordered {
                StyleRole::ListNumber
            } else {
                StyleRole::ListBullet
            };
            let resolved = catalog.resolve(role);
            let mut level = *depth;
            if level > MAX_LIST_LEVEL {
                warn!("list nested deeper than {MAX_LIST_LEVEL} levels, clamping");
                *degraded += 1;
                level = MAX_LIST_LEVEL;
            }
            let num_id = numbering.instance(*ordered);
            let ppr = format!(
                r#"<w:pStyle w:val="{}"/><w:numPr><w:ilvl w:val="{level}"/><w:numId w:val="{num_id}"/></w:numPr>"#,
                resolved.style_id
            );
            let mut runs = inline::flatten(content);
            if let Some(checked) = checked {
                runs.insert(
                    0,
                    Run::Text {
                        text: if *checked { "\u{2612} " } else { "\u{2610} " }.to_string(),
                        style: RunStyle::default(),
                    },
                );
            }
            write_paragraph(out, &ppr, &runs, config)
        }

        Block::BlockQuote { content } => {
            let resolved = catalog.resolve(StyleRole::Quote);
            let mut ppr = format!(r#"<w:pStyle w:val="{}"/>"#, resolved.style_id);
            if resolved.fallback {
                // No quote style available; indent directly instead
                ppr.push_str(r#"<w:ind w:left="720" w:right="720"/>"#);
            }
            write_paragraph(out, &ppr, &inline::flatten(content), config)
        }

        Block::CodeBlock { language, content } => {
            let resolved = catalog.resolve(StyleRole::Code);
            if let Some(lang) = language {
                debug!("code block tagged as {lang}");
            }
            let mut ppr = format!(r#"<w:pStyle w:val="{}"/>"#, resolved.style_id);
            if resolved.fallback {
                ppr.push_str(&format!(
                    r#"<w:shd w:val="clear" w:color="auto" w:fill="{}"/>"#,
                    hex_color(&config.code.shading)
                ));
            }
            let content = content.strip_suffix('\n').unwrap_or(content);
            for line in content.split('\n') {
                write!(out, "<w:p><w:pPr>{ppr}</w:pPr>")?;
                if !line.is_empty() {
                    let style = RunStyle {
                        code: resolved.fallback,
                        ..RunStyle::default()
                    };
                    write_text_run(out, line, style, false, config)?;
                }
                write!(out, "</w:p>")?;
            }
            Ok(())
        }

        Block::Table { header, rows } => {
            if header.is_empty() && rows.is_empty() {
                return Ok(());
            }
            write!(
                out,
                r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/></w:tblBorders></w:tblPr>"#
            )?;
            if !header.is_empty() {
                write_table_row(out, header, true, catalog, config)?;
            }
            for row in rows {
                write_table_row(out, row, false, catalog, config)?;
            }
            write!(out, "</w:tbl>")
        }

        Block::Rule => write!(
            out,
            r#"<w:p><w:pPr><w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="auto"/></w:pBdr><w:spacing w:before="240" w:after="240"/></w:pPr></w:p>"#
        ),

        Block::PageBreak => write!(out, r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#),
    }
}

fn write_table_row<W: Write>(
    out: &mut W,
    cells: &[Vec<Span>],
    header: bool,
    catalog: &StyleCatalog,
    config: &Config,
) -> io::Result<()> {
    let normal = catalog.resolve(StyleRole::Normal);
    write!(out, "<w:tr>")?;
    if header {
        write!(out, "<w:trPr><w:tblHeader/></w:trPr>")?;
    }
    for cell in cells {
        write!(
            out,
            r#"<w:tc><w:p><w:pPr><w:pStyle w:val="{}"/></w:pPr>"#,
            normal.style_id
        )?;
        let mut runs = inline::flatten(cell);
        if header {
            for run in &mut runs {
                if let Run::Text { style, .. } | Run::Link { style, .. } = run {
                    style.bold = true;
                }
            }
        }
        for run in &runs {
            write_run(out, run, config)?;
        }
        write!(out, "</w:p></w:tc>")?;
    }
    write!(out, "</w:tr>")
}

fn write_paragraph<W: Write>(
    out: &mut W,
    ppr: &str,
    runs: &[Run],
    config: &Config,
) -> io::Result<()> {
    write!(out, "<w:p>")?;
    if !ppr.is_empty() {
        write!(out, "<w:pPr>{ppr}</w:pPr>")?;
    }
    for run in runs {
        write_run(out, run, config)?;
    }
    write!(out, "</w:p>")
}

fn write_run<W: Write>(out: &mut W, run: &Run, config: &Config) -> io::Result<()> {
    match run {
        Run::Break => write!(out, "<w:r><w:br/></w:r>"),
        Run::Text { text, style } => write_text_run(out, text, *style, false, config),
        Run::Link { text, url, style } => {
            // The target is not embedded as a relationship; the run is
            // styled to read as a link and keeps only the display text.
            debug!("rendering link to {url} as styled text");
            write_text_run(out, text, *style, true, config)
        }
    }
}

fn write_text_run<W: Write>(
    out: &mut W,
    text: &str,
    style: RunStyle,
    link: bool,
    config: &Config,
) -> io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    write!(out, "<w:r>")?;
    let props = run_properties(style, link, config);
    if !props.is_empty() {
        write!(out, "<w:rPr>{props}</w:rPr>")?;
    }
    write!(
        out,
        r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape_xml(text)
    )
}

fn run_properties(style: RunStyle, link: bool, config: &Config) -> String {
    let mut props = String::new();
    if style.code {
        let font = escape_xml(&config.code.font);
        props.push_str(&format!(
            r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/>"#
        ));
    }
    if style.bold {
        props.push_str("<w:b/>");
    }
    if style.italic {
        props.push_str("<w:i/>");
    }
    if link {
        props.push_str(&format!(
            r#"<w:color w:val="{}"/>"#,
            hex_color(&config.links.color)
        ));
        if config.links.underline {
            props.push_str(r#"<w:u w:val="single"/>"#);
        }
    }
    props
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn hex_color(color: &str) -> String {
    color.trim_start_matches('#').to_ascii_uppercase()
}

fn package(
    document: &[u8],
    styles_xml: &str,
    instances: &[NumberingInstance],
) -> ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(RELS_XML.as_bytes())?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(DOCUMENT_PREAMBLE.as_bytes())?;
    zip.write_all(document)?;
    zip.write_all(DOCUMENT_CLOSE.as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", options)?;
    zip.write_all(WORD_RELS_XML.as_bytes())?;

    zip.start_file("word/styles.xml", options)?;
    zip.write_all(styles_xml.as_bytes())?;

    zip.start_file("word/numbering.xml", options)?;
    zip.write_all(numbering_xml(instances).as_bytes())?;

    Ok(zip.finish()?.into_inner())
}

/// Numbering part: two abstract definitions (bullet, decimal) and one
/// concrete instance per list run. Ordered instances carry start
/// overrides so each new list restarts at 1.
fn numbering_xml(instances: &[NumberingInstance]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    );
    for (abstract_id, ordered) in [(0, false), (1, true)] {
        xml.push_str(&format!(
            r#"<w:abstractNum w:abstractNumId="{abstract_id}"><w:multiLevelType w:val="multilevel"/>"#
        ));
        for level in 0..=MAX_LIST_LEVEL {
            let indent = 720 * (level + 1);
            if ordered {
                xml.push_str(&format!(
                    r#"<w:lvl w:ilvl="{level}"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%{}."/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{indent}" w:hanging="360"/></w:pPr></w:lvl>"#,
                    level + 1
                ));
            } else {
                xml.push_str(&format!(
                    r#"<w:lvl w:ilvl="{level}"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="&#8226;"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{indent}" w:hanging="360"/></w:pPr></w:lvl>"#
                ));
            }
        }
        xml.push_str("</w:abstractNum>");
    }
    for instance in instances {
        xml.push_str(&format!(
            r#"<w:num w:numId="{}"><w:abstractNumId w:val="{}"/>"#,
            instance.id,
            if instance.ordered { 1 } else { 0 }
        ));
        if instance.ordered {
            for level in 0..=MAX_LIST_LEVEL {
                xml.push_str(&format!(
                    r#"<w:lvlOverride w:ilvl="{level}"><w:startOverride w:val="1"/></w:lvlOverride>"#
                ));
            }
        }
        xml.push_str("</w:num>");
    }
    xml.push_str("</w:numbering>");
    xml
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const WORD_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>
</Relationships>"#;

const DOCUMENT_PREAMBLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_CLOSE: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/><w:cols w:space="708"/></w:sectPr></w:body></w:document>"#;

/// Styles part used when no template is supplied.
const BUILTIN_STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:keepLines/>
      <w:spacing w:before="240" w:after="120"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:sz w:val="32"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading2">
    <w:name w:val="heading 2"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:keepLines/>
      <w:spacing w:before="200" w:after="100"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:sz w:val="28"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading3">
    <w:name w:val="heading 3"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:keepLines/>
      <w:spacing w:before="200" w:after="100"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:sz w:val="26"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading4">
    <w:name w:val="heading 4"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:keepLines/>
      <w:spacing w:before="160" w:after="80"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:sz w:val="24"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading5">
    <w:name w:val="heading 5"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:keepLines/>
      <w:spacing w:before="160" w:after="80"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:sz w:val="22"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading6">
    <w:name w:val="heading 6"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:keepLines/>
      <w:spacing w:before="160" w:after="80"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:sz w:val="20"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Quote">
    <w:name w:val="Quote"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:spacing w:before="120" w:after="120"/>
      <w:ind w:left="720" w:right="720"/>
    </w:pPr>
    <w:rPr>
      <w:i/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Code">
    <w:name w:val="Code"/>
    <w:basedOn w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:shd w:val="clear" w:color="auto" w:fill="F0F0F0"/>
      <w:spacing w:before="60" w:after="60"/>
    </w:pPr>
    <w:rPr>
      <w:rFonts w:ascii="Consolas" w:hAnsi="Consolas" w:cs="Consolas"/>
      <w:sz w:val="20"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListBullet">
    <w:name w:val="List Bullet"/>
    <w:basedOn w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListNumber">
    <w:name w:val="List Number"/>
    <w:basedOn w:val="Normal"/>
    <w:qFormat/>
  </w:style>
</w:styles>"#;
