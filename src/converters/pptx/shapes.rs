use std::fmt::Write;

use super::constants::{NS_C, NS_R};
use super::error::Result;
use super::utils::{line, percent, solid_fill, solid_fill_alpha, write_xfrm};
use crate::converters::utils::escape_xml;
use crate::engine::layout::Rect;
use crate::models::colors::Color;

/// Fill and outline of a drawn shape.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ShapeStyle {
    pub fill: Option<Color>,
    pub fill_alpha: Option<f64>,
    pub line: Option<Color>,
}

impl ShapeStyle {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    pub(crate) fn filled(color: Color) -> Self {
        ShapeStyle {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub(crate) fn with_line(mut self, color: Color) -> Self {
        self.line = Some(color);
        self
    }

    pub(crate) fn with_alpha(mut self, alpha: f64) -> Self {
        self.fill_alpha = Some(alpha);
        self
    }

    fn write(&self, xml: &mut String) {
        match (self.fill, self.fill_alpha) {
            (Some(color), Some(alpha)) => xml.push_str(&solid_fill_alpha(color, alpha)),
            (Some(color), None) => xml.push_str(&solid_fill(color)),
            (None, _) => xml.push_str("<a:noFill/>"),
        }
        xml.push_str(&line(self.line, 1.0));
    }
}

/// Vertical anchoring of text inside its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Anchor {
    Top,
    Middle,
    Bottom,
}

impl Anchor {
    fn as_ooxml(&self) -> &'static str {
        match self {
            Anchor::Top => "t",
            Anchor::Middle => "ctr",
            Anchor::Bottom => "b",
        }
    }
}

/// The `p:spTree` of one slide. Shape ids are unique per slide and start after the
/// group's own id.
pub(crate) struct ShapeTree {
    xml: String,
    next_id: u32,
}

impl ShapeTree {
    pub(crate) fn new() -> Self {
        ShapeTree {
            xml: String::new(),
            next_id: 2,
        }
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// A rectangle without text.
    pub(crate) fn rect(&mut self, name: &str, rect: &Rect, style: ShapeStyle) -> Result<()> {
        let id = self.take_id();
        write!(
            self.xml,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>"#,
            id,
            escape_xml(name),
            id
        )?;
        write_xfrm(&mut self.xml, "a", rect)?;
        self.xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
        style.write(&mut self.xml);
        self.xml.push_str("</p:spPr></p:sp>");
        Ok(())
    }

    /// A text box holding already-built `<a:p>` paragraphs.
    ///
    /// Insets are zero so text starts exactly at the frame edge, as in the other backends,
    /// and `normAutofit` lets PowerPoint shrink text that overflows the frame.
    pub(crate) fn text_box(
        &mut self,
        name: &str,
        rect: &Rect,
        anchor: Anchor,
        paragraphs: &str,
        style: ShapeStyle,
    ) -> Result<()> {
        let id = self.take_id();
        write!(
            self.xml,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>"#,
            id,
            escape_xml(name),
            id
        )?;
        write_xfrm(&mut self.xml, "a", rect)?;
        self.xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
        style.write(&mut self.xml);
        write!(
            self.xml,
            concat!(
                r#"</p:spPr><p:txBody><a:bodyPr wrap="square" lIns="0" tIns="0" rIns="0" bIns="0" "#,
                r#"anchor="{}" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>"#
            ),
            anchor.as_ooxml()
        )?;
        if paragraphs.is_empty() {
            self.xml.push_str(r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#);
        } else {
            self.xml.push_str(paragraphs);
        }
        self.xml.push_str("</p:txBody></p:sp>");
        Ok(())
    }

    /// A picture cropped through `a:srcRect`.
    ///
    /// # Arguments
    ///
    /// * `rel_id` - Relationship id of the embedded media part.
    /// * `crop` - `(left, top, right, bottom)` fractions of the source to drop.
    pub(crate) fn picture(
        &mut self,
        name: &str,
        rect: &Rect,
        rel_id: &str,
        crop: (f64, f64, f64, f64),
    ) -> Result<()> {
        let id = self.take_id();
        write!(
            self.xml,
            concat!(
                r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="{} {}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
                r#"<p:blipFill><a:blip r:embed="{}"/>"#
            ),
            id,
            escape_xml(name),
            id,
            rel_id
        )?;
        let (l, t, r, b) = crop;
        if (l, t, r, b) != (0.0, 0.0, 0.0, 0.0) {
            write!(
                self.xml,
                r#"<a:srcRect l="{}" t="{}" r="{}" b="{}"/>"#,
                percent(l),
                percent(t),
                percent(r),
                percent(b)
            )?;
        }
        self.xml
            .push_str("<a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>");
        write_xfrm(&mut self.xml, "a", rect)?;
        self.xml
            .push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#);
        Ok(())
    }

    fn graphic_frame_open(&mut self, name: &str, rect: &Rect) -> Result<()> {
        let id = self.take_id();
        write!(
            self.xml,
            concat!(
                r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{}" name="{} {}"/>"#,
                "<p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>"
            ),
            id,
            escape_xml(name),
            id
        )?;
        write_xfrm(&mut self.xml, "p", rect)?;
        Ok(())
    }

    /// A native chart referencing a chart part.
    pub(crate) fn chart(&mut self, name: &str, rect: &Rect, rel_id: &str) -> Result<()> {
        self.graphic_frame_open(name, rect)?;
        write!(
            self.xml,
            concat!(
                r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart">"#,
                r#"<c:chart xmlns:c="{}" xmlns:r="{}" r:id="{}"/></a:graphicData></a:graphic></p:graphicFrame>"#
            ),
            NS_C,
            NS_R,
            rel_id
        )?;
        Ok(())
    }

    /// A native table; `table_xml` is the complete `<a:tbl>` element.
    pub(crate) fn table(&mut self, name: &str, rect: &Rect, table_xml: &str) -> Result<()> {
        self.graphic_frame_open(name, rect)?;
        self.xml.push_str(
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table">"#,
        );
        self.xml.push_str(table_xml);
        self.xml
            .push_str("</a:graphicData></a:graphic></p:graphicFrame>");
        Ok(())
    }

    /// Wraps the shapes in a complete `p:spTree`.
    pub(crate) fn into_xml(self) -> String {
        format!(
            concat!(
                r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
                r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
                "{}</p:spTree>"
            ),
            self.xml
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_ids_are_unique_and_sequential() {
        let mut tree = ShapeTree::new();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        tree.rect("Band", &rect, ShapeStyle::filled(Color::BLACK).with_alpha(0.5))
            .unwrap();
        tree.text_box("Title", &rect, Anchor::Middle, "", ShapeStyle::none())
            .unwrap();
        let xml = tree.into_xml();
        assert!(xml.contains(r#"<p:cNvPr id="2" name="Band 2"/>"#));
        assert!(xml.contains(r#"<p:cNvPr id="3" name="Title 3"/>"#));
        assert!(xml.contains(r#"<a:alpha val="50000"/>"#));
        assert!(xml.contains(r#"anchor="ctr""#));
    }

    #[test]
    fn pictures_carry_crop_fractions() {
        let mut tree = ShapeTree::new();
        tree.picture(
            "Image",
            &Rect::new(0.0, 0.0, 100.0, 100.0),
            "rId2",
            (0.25, 0.0, 0.25, 0.0),
        )
        .unwrap();
        let xml = tree.into_xml();
        assert!(xml.contains(r#"<a:blip r:embed="rId2"/>"#));
        assert!(xml.contains(r#"<a:srcRect l="25000" t="0" r="25000" b="0"/>"#));
    }
}
