use crate::converters::utils::fmt_num;
use crate::engine::layout::Rect;

use super::constants::PX_PER_PT;

/// A length in design points as a CSS pixel value.
pub(crate) fn px(pt: f64) -> String {
    format!("{}px", fmt_num(pt * PX_PER_PT))
}

/// Absolute-position declarations for `rect`, measured from `origin`.
pub(crate) fn box_style(rect: &Rect, origin: (f64, f64)) -> String {
    format!(
        "left:{};top:{};width:{};height:{}",
        px(rect.x - origin.0),
        px(rect.y - origin.1),
        px(rect.width),
        px(rect.height)
    )
}

/// Position of `rect` as percentages of `container`.
pub(crate) fn percent_box(rect: &Rect, container: &Rect) -> String {
    format!(
        "left:{}%;top:{}%;width:{}%;height:{}%",
        percent(rect.x - container.x, container.width),
        percent(rect.y - container.y, container.height),
        percent(rect.width, container.width),
        percent(rect.height, container.height)
    )
}

/// `part / whole` as a compact percentage number.
pub(crate) fn percent(part: f64, whole: f64) -> String {
    if whole <= 0.0 {
        return "0".to_string();
    }
    fmt_num(part / whole * 100.0)
}

/// Quotes a font family name for CSS.
pub(crate) fn css_font_family(name: &str) -> String {
    format!("\"{}\"", name.replace(['"', '\\', '<', '>'], ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_become_pixels() {
        assert_eq!(px(960.0), "1280px");
        assert_eq!(px(18.0), "24px");
        assert_eq!(
            box_style(&Rect::new(48.0, 120.0, 30.0, 3.0), (0.0, 0.0)),
            "left:64px;top:160px;width:40px;height:4px"
        );
    }

    #[test]
    fn percentages_are_relative_to_the_container() {
        let container = Rect::new(100.0, 100.0, 200.0, 100.0);
        assert_eq!(
            percent_box(&Rect::new(150.0, 125.0, 50.0, 75.0), &container),
            "left:25%;top:25%;width:25%;height:75%"
        );
        assert_eq!(percent(1.0, 0.0), "0");
    }

    #[test]
    fn font_names_are_quoted_and_sanitized() {
        assert_eq!(css_font_family("Open \"Sans\""), "\"Open Sans\"");
    }
}
