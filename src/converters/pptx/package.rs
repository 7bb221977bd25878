//! The PresentationML package: zip container, content types, relationships and the fixed
//! parts every deck shares (presentation, master, layout, theme, document properties).

use std::collections::BTreeMap;
use std::fmt::Write;
use std::io::{Cursor, Write as IoWrite};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::constants::*;
use super::error::Result;
use crate::converters::utils::escape_xml;
use crate::models::theme::Theme;

/// Relationship list of one part. Ids are assigned in insertion order starting at `rId1`.
#[derive(Debug, Default)]
pub(crate) struct Relationships {
    entries: Vec<(String, &'static str, String)>,
}

impl Relationships {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a relationship and returns its id.
    pub(crate) fn add(&mut self, rel_type: &'static str, target: impl Into<String>) -> String {
        let id = format!("rId{}", self.entries.len() + 1);
        self.entries.push((id.clone(), rel_type, target.into()));
        id
    }

    pub(crate) fn to_xml(&self) -> Result<String> {
        let mut xml = String::new();
        writeln!(xml, "{}", XML_DECLARATION)?;
        write!(xml, r#"<Relationships xmlns="{}">"#, NS_PKG_RELS)?;
        for (id, rel_type, target) in &self.entries {
            write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
                id,
                rel_type,
                escape_xml(target)
            )?;
        }
        xml.push_str("</Relationships>");
        Ok(xml)
    }
}

/// Accumulates package parts into an in-memory zip and writes `[Content_Types].xml` on
/// [`PackageWriter::finish`].
pub(crate) struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    defaults: BTreeMap<&'static str, &'static str>,
    overrides: Vec<(String, &'static str)>,
}

impl PackageWriter {
    pub(crate) fn new() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("rels", CT_RELS);
        defaults.insert("xml", CT_XML);
        PackageWriter {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            defaults,
            overrides: Vec::new(),
        }
    }

    /// Writes an XML part, registering a content-type override when one is given.
    pub(crate) fn add_part(
        &mut self,
        path: &str,
        content_type: Option<&'static str>,
        body: &str,
    ) -> Result<()> {
        if let Some(content_type) = content_type {
            self.overrides.push((format!("/{}", path), content_type));
        }
        self.write_entry(path, body.as_bytes())
    }

    /// Writes a binary part whose content type is registered by extension.
    pub(crate) fn add_media(
        &mut self,
        path: &str,
        extension: &'static str,
        mime_type: &'static str,
        bytes: &[u8],
    ) -> Result<()> {
        self.defaults.entry(extension).or_insert(mime_type);
        self.write_entry(path, bytes)
    }

    fn write_entry(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        self.zip.start_file(path, self.options)?;
        self.zip.write_all(bytes)?;
        Ok(())
    }

    /// Writes the content types part and closes the archive.
    pub(crate) fn finish(mut self) -> Result<Vec<u8>> {
        let content_types = self.content_types_xml()?;
        self.write_entry("[Content_Types].xml", content_types.as_bytes())?;
        let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }

    fn content_types_xml(&self) -> Result<String> {
        let mut xml = String::new();
        writeln!(xml, "{}", XML_DECLARATION)?;
        write!(xml, r#"<Types xmlns="{}">"#, NS_CONTENT_TYPES)?;
        for (extension, content_type) in &self.defaults {
            write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                extension, content_type
            )?;
        }
        for (part, content_type) in &self.overrides {
            write!(
                xml,
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                part, content_type
            )?;
        }
        xml.push_str("</Types>");
        Ok(xml)
    }
}

/// Writes every part that does not depend on slide content.
///
/// # Arguments
///
/// * `package` - The package being assembled.
/// * `theme` - The resolved theme; becomes the package theme's color and font scheme.
/// * `topic` - Deck title for the core properties.
/// * `slide_count` - Number of slide parts, title slide included.
pub(crate) fn write_fixed_parts(
    package: &mut PackageWriter,
    theme: &Theme,
    topic: &str,
    slide_count: usize,
) -> Result<()> {
    let mut root = Relationships::new();
    root.add(REL_OFFICE_DOCUMENT, "ppt/presentation.xml");
    root.add(REL_CORE_PROPS, "docProps/core.xml");
    root.add(REL_APP_PROPS, "docProps/app.xml");
    package.add_part("_rels/.rels", None, &root.to_xml()?)?;

    package.add_part("docProps/core.xml", Some(CT_CORE_PROPS), &core_props_xml(topic)?)?;
    package.add_part(
        "docProps/app.xml",
        Some(CT_APP_PROPS),
        &app_props_xml(slide_count)?,
    )?;

    let mut presentation_rels = Relationships::new();
    presentation_rels.add(REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml");
    presentation_rels.add(REL_THEME, "theme/theme1.xml");
    let slide_ids: Vec<String> = (1..=slide_count)
        .map(|n| presentation_rels.add(REL_SLIDE, format!("slides/slide{}.xml", n)))
        .collect();
    package.add_part(
        "ppt/presentation.xml",
        Some(CT_PRESENTATION),
        &presentation_xml(&slide_ids)?,
    )?;
    package.add_part(
        "ppt/_rels/presentation.xml.rels",
        None,
        &presentation_rels.to_xml()?,
    )?;

    let mut master_rels = Relationships::new();
    let layout_id = master_rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
    master_rels.add(REL_THEME, "../theme/theme1.xml");
    package.add_part(
        "ppt/slideMasters/slideMaster1.xml",
        Some(CT_SLIDE_MASTER),
        &slide_master_xml(&layout_id)?,
    )?;
    package.add_part(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        None,
        &master_rels.to_xml()?,
    )?;

    let mut layout_rels = Relationships::new();
    layout_rels.add(REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml");
    package.add_part(
        "ppt/slideLayouts/slideLayout1.xml",
        Some(CT_SLIDE_LAYOUT),
        &slide_layout_xml()?,
    )?;
    package.add_part(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        None,
        &layout_rels.to_xml()?,
    )?;

    package.add_part("ppt/theme/theme1.xml", Some(CT_THEME), &theme_xml(theme)?)?;
    Ok(())
}

fn core_props_xml(topic: &str) -> Result<String> {
    let mut xml = String::new();
    writeln!(xml, "{}", XML_DECLARATION)?;
    write!(
        xml,
        concat!(
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{}</dc:title><dc:creator>deck-render</dc:creator>",
            "</cp:coreProperties>"
        ),
        escape_xml(topic)
    )?;
    Ok(xml)
}

fn app_props_xml(slide_count: usize) -> Result<String> {
    let mut xml = String::new();
    writeln!(xml, "{}", XML_DECLARATION)?;
    write!(
        xml,
        concat!(
            r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#,
            "<Application>deck-render</Application><Slides>{}</Slides>",
            "<PresentationFormat>Widescreen</PresentationFormat></Properties>"
        ),
        slide_count
    )?;
    Ok(xml)
}

fn presentation_xml(slide_ids: &[String]) -> Result<String> {
    let mut xml = String::new();
    writeln!(xml, "{}", XML_DECLARATION)?;
    write!(
        xml,
        r#"<p:presentation xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" saveSubsetFonts="1">"#,
        NS_A, NS_R, NS_P
    )?;
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    xml.push_str("<p:sldIdLst>");
    for (i, rel_id) in slide_ids.iter().enumerate() {
        // Slide ids start at 256.
        write!(xml, r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + i, rel_id)?;
    }
    xml.push_str("</p:sldIdLst>");
    write!(
        xml,
        r#"<p:sldSz cx="{}" cy="{}"/><p:notesSz cx="{}" cy="{}"/>"#,
        SLIDE_CX, SLIDE_CY, SLIDE_CY, SLIDE_CX
    )?;
    xml.push_str("</p:presentation>");
    Ok(xml)
}

const EMPTY_SHAPE_TREE: &str = concat!(
    "<p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>",
    "<p:grpSpPr/></p:spTree>"
);

fn slide_master_xml(layout_rel_id: &str) -> Result<String> {
    let mut xml = String::new();
    writeln!(xml, "{}", XML_DECLARATION)?;
    write!(
        xml,
        r#"<p:sldMaster xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">"#,
        NS_A, NS_R, NS_P
    )?;
    write!(
        xml,
        concat!(
            "<p:cSld><p:bg><p:bgPr><a:solidFill><a:schemeClr val=\"bg1\"/></a:solidFill>",
            "<a:effectLst/></p:bgPr></p:bg>{}</p:cSld>"
        ),
        EMPTY_SHAPE_TREE
    )?;
    xml.push_str(concat!(
        r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
        r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#
    ));
    write!(
        xml,
        r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="{}"/></p:sldLayoutIdLst>"#,
        layout_rel_id
    )?;
    xml.push_str("</p:sldMaster>");
    Ok(xml)
}

fn slide_layout_xml() -> Result<String> {
    let mut xml = String::new();
    writeln!(xml, "{}", XML_DECLARATION)?;
    write!(
        xml,
        r#"<p:sldLayout xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" type="blank" preserve="1">"#,
        NS_A, NS_R, NS_P
    )?;
    write!(xml, r#"<p:cSld name="Blank">{}</p:cSld>"#, EMPTY_SHAPE_TREE)?;
    xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>");
    Ok(xml)
}

/// Theme part whose color scheme is the resolved deck theme.
///
/// `dk1`/`lt1` carry text and background, `dk2`/`lt2` title and border, and the six
/// accents the chart palette, so edits in PowerPoint's theme pickers stay on-brand.
pub(crate) fn theme_xml(theme: &Theme) -> Result<String> {
    let accent = |i: usize| {
        theme
            .chart_palette
            .get(i % theme.chart_palette.len().max(1))
            .copied()
            .unwrap_or(theme.primary)
            .to_ooxml()
    };

    let mut xml = String::new();
    writeln!(xml, "{}", XML_DECLARATION)?;
    write!(xml, r#"<a:theme xmlns:a="{}" name="Deck Theme">"#, NS_A)?;
    xml.push_str(r#"<a:themeElements><a:clrScheme name="Deck">"#);
    let slots = [
        ("dk1", theme.text.to_ooxml()),
        ("lt1", theme.background.to_ooxml()),
        ("dk2", theme.title.to_ooxml()),
        ("lt2", theme.border.to_ooxml()),
        ("accent1", accent(0)),
        ("accent2", accent(1)),
        ("accent3", accent(2)),
        ("accent4", accent(3)),
        ("accent5", accent(4)),
        ("accent6", accent(5)),
        ("hlink", theme.primary.to_ooxml()),
        ("folHlink", theme.primary.to_ooxml()),
    ];
    for (slot, color) in slots {
        write!(xml, r#"<a:{0}><a:srgbClr val="{1}"/></a:{0}>"#, slot, color)?;
    }
    xml.push_str("</a:clrScheme>");

    write!(
        xml,
        concat!(
            r#"<a:fontScheme name="Deck"><a:majorFont><a:latin typeface="{}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
            r#"<a:minorFont><a:latin typeface="{}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>"#
        ),
        escape_xml(theme.title_font_or(DEFAULT_FONT)),
        escape_xml(theme.body_font_or(DEFAULT_FONT))
    )?;

    xml.push_str(r#"<a:fmtScheme name="Deck"><a:fillStyleLst>"#);
    for _ in 0..3 {
        xml.push_str(r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#);
    }
    xml.push_str("</a:fillStyleLst><a:lnStyleLst>");
    for width in [6350, 12700, 19050] {
        write!(
            xml,
            r#"<a:ln w="{}"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
            width
        )?;
    }
    xml.push_str("</a:lnStyleLst><a:effectStyleLst>");
    for _ in 0..3 {
        xml.push_str("<a:effectStyle><a:effectLst/></a:effectStyle>");
    }
    xml.push_str("</a:effectStyleLst><a:bgFillStyleLst>");
    for _ in 0..3 {
        xml.push_str(r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#);
    }
    xml.push_str("</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>");
    Ok(xml)
}
