//! The document stylesheet: theme custom properties, web fonts and slide classes.

use std::fmt::Write;

use super::constants::{FONT_FALLBACK, SLIDE_HEIGHT_PX, SLIDE_WIDTH_PX};
use super::error::Result;
use super::utils::{css_font_family, px};
use crate::converters::utils::*;
use crate::models::theme::Theme;

/// Family name a remote font is registered under.
fn web_font_name(role: &str) -> String {
    format!("deck-{}", role)
}

/// CSS `font-family` value for a role: the web font when a URL is given, the named font
/// otherwise, always followed by the fallback stack.
fn font_stack(name: Option<&str>, url: Option<&str>, role: &str) -> String {
    let mut families = Vec::new();
    if url.is_some() {
        families.push(css_font_family(&web_font_name(role)));
    }
    if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
        families.push(css_font_family(name));
    }
    families.push(FONT_FALLBACK.to_string());
    families.join(", ")
}

fn write_font_face(css: &mut String, role: &str, url: Option<&str>) -> Result<()> {
    if let Some(url) = url {
        writeln!(
            css,
            "@font-face {{ font-family: {}; src: url(\"{}\"); font-display: block; }}",
            css_font_family(&web_font_name(role)),
            url.replace(['"', '\\', '\n'], "")
        )?;
    }
    Ok(())
}

/// Writes the complete `<style>` contents for `theme`.
pub(crate) fn write_stylesheet(css: &mut String, theme: &Theme) -> Result<()> {
    // 1. Remote fonts
    write_font_face(css, "title", theme.title_font_url.as_deref())?;
    write_font_face(css, "body", theme.body_font_url.as_deref())?;

    // 2. Theme custom properties
    writeln!(css, ":root {{")?;
    for (name, color) in [
        ("primary", theme.primary),
        ("background", theme.background),
        ("title", theme.title),
        ("subtitle", theme.subtitle),
        ("text", theme.text),
        ("border", theme.border),
        ("muted", theme.border.tint(0.6)),
        ("card", theme.primary.tint(0.92)),
    ] {
        writeln!(css, "  --{}: {};", name, color.to_css_hex())?;
    }
    writeln!(
        css,
        "  --title-font: {};",
        font_stack(theme.title_font.as_deref(), theme.title_font_url.as_deref(), "title")
    )?;
    writeln!(
        css,
        "  --body-font: {};",
        font_stack(theme.body_font.as_deref(), theme.body_font_url.as_deref(), "body")
    )?;
    writeln!(css, "}}")?;

    // 3. Page and slide blocks
    let (width, height) = (SLIDE_WIDTH_PX, SLIDE_HEIGHT_PX);
    writeln!(css, "@page {{ size: {}px {}px; margin: 0; }}", width, height)?;
    writeln!(css, "html, body {{ margin: 0; padding: 0; }}")?;
    writeln!(
        css,
        concat!(
            ".slide {{ position: relative; width: {}px; height: {}px; overflow: hidden; ",
            "background: var(--background); color: var(--text); font-family: var(--body-font); ",
            "page-break-after: always; break-after: page; -webkit-print-color-adjust: exact; ",
            "print-color-adjust: exact; }}"
        ),
        width, height
    )?;
    writeln!(css, ".slide:last-child {{ page-break-after: auto; break-after: auto; }}")?;
    writeln!(css, ".title-slide {{ background: var(--primary); color: var(--subtitle); }}")?;
    writeln!(
        css,
        ".frame {{ position: absolute; box-sizing: border-box; overflow: hidden; }}"
    )?;

    // 4. Text
    let line = LINE_SPACING;
    writeln!(
        css,
        concat!(
            ".text {{ display: flex; flex-direction: column; line-height: {}; margin: 0; }}\n",
            ".middle {{ justify-content: center; }}\n",
            ".bottom {{ justify-content: flex-end; }}\n",
            ".center {{ text-align: center; }}"
        ),
        line
    )?;
    writeln!(
        css,
        ".title {{ font-family: var(--title-font); font-weight: bold; font-size: {}; color: var(--title); }}",
        px(TITLE_SIZE)
    )?;
    writeln!(
        css,
        ".deck-title {{ font-family: var(--title-font); font-weight: bold; font-size: {}; color: var(--subtitle); }}",
        px(TITLE_SLIDE_SIZE)
    )?;
    writeln!(
        css,
        ".deck-subtitle {{ font-size: {}; color: var(--subtitle); }}",
        px(SUBTITLE_SIZE)
    )?;
    writeln!(
        css,
        ".title-only {{ font-size: {}; }}\n.caption {{ color: #FFFFFF; }}",
        px(TITLE_SLIDE_SIZE)
    )?;
    writeln!(
        css,
        concat!(
            ".bullets {{ margin: 0; padding: 0 0 0 {}; font-size: {}; line-height: {}; }}\n",
            ".bullets li {{ margin: 0 0 {} 0; }}\n",
            ".bullets li::marker {{ color: var(--primary); }}"
        ),
        px(BODY_SIZE * 1.4),
        px(BODY_SIZE),
        line,
        px(BULLET_SPACING)
    )?;
    writeln!(
        css,
        concat!(
            ".quote {{ font-family: var(--title-font); font-style: italic; font-size: {}; color: var(--title); }}\n",
            ".attribution {{ font-size: {}; }}\n",
            ".accent {{ background: var(--primary); }}"
        ),
        px(QUOTE_SIZE),
        px(ATTRIBUTION_SIZE)
    )?;

    // 5. Media, metrics and tables
    writeln!(
        css,
        concat!(
            ".cover {{ width: 100%; height: 100%; object-fit: cover; display: block; }}\n",
            ".contain {{ width: 100%; height: 100%; object-fit: contain; display: block; }}\n",
            ".placeholder {{ background: var(--muted); border: 1px solid var(--border); ",
            "display: flex; align-items: center; justify-content: center; font-size: {}; }}"
        ),
        px(PLACEHOLDER_SIZE)
    )?;
    writeln!(
        css,
        concat!(
            ".metrics {{ display: flex; gap: {}; }}\n",
            ".card {{ flex: 1 1 0; background: var(--card); border: 1px solid var(--border); ",
            "box-sizing: border-box; padding: {}; display: flex; flex-direction: column; }}\n",
            ".card .value {{ flex: 0 0 55%; display: flex; align-items: flex-end; justify-content: center; ",
            "font-family: var(--title-font); font-weight: bold; font-size: {}; color: var(--primary); }}\n",
            ".card .label {{ flex: 1 1 auto; text-align: center; font-size: {}; line-height: {}; }}"
        ),
        px(24.0),
        px(16.0),
        px(METRIC_VALUE_SIZE),
        px(METRIC_LABEL_SIZE),
        line
    )?;
    writeln!(
        css,
        concat!(
            ".data-table {{ border-collapse: collapse; table-layout: fixed; width: 100%; font-size: {}; }}\n",
            ".data-table th, .data-table td {{ height: {}; padding: 0 {}; border: 1px solid var(--border); ",
            "box-sizing: border-box; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; text-align: left; }}\n",
            ".data-table th {{ background: var(--primary); color: var(--subtitle); font-weight: bold; }}"
        ),
        px(TABLE_SIZE),
        px(TABLE_ROW_HEIGHT),
        px(6.0)
    )?;

    // 6. Charts
    writeln!(
        css,
        concat!(
            ".plot {{ position: absolute; }}\n",
            ".bar, .gridline, .baseline {{ position: absolute; }}\n",
            ".gridline {{ left: 0; right: 0; height: 0; border-top: 1px solid #E2E8F0; }}\n",
            ".baseline {{ left: 0; right: 0; bottom: 0; height: 0; border-top: 1px solid var(--border); }}\n",
            ".tick, .category, .value-label {{ position: absolute; font-size: {0}; line-height: {1}; white-space: nowrap; }}\n",
            ".tick, .category {{ color: #475569; }}\n",
            ".tick {{ transform: translateY(-50%); text-align: right; }}\n",
            ".category {{ overflow: hidden; text-overflow: ellipsis; text-align: center; }}\n",
            ".value-label {{ transform: translateX(-50%); }}\n",
            ".total {{ font-weight: bold; }}\n",
            ".chart-svg {{ position: absolute; left: 0; top: 0; width: 100%; height: 100%; overflow: visible; }}\n",
            ".chart-svg text {{ font-family: var(--body-font); font-size: {2}px; }}\n",
            ".legend {{ position: absolute; display: flex; gap: {3}; font-size: {0}; color: #475569; }}\n",
            ".legend.column {{ flex-direction: column; }}\n",
            ".legend .entry {{ display: flex; align-items: center; gap: {4}; white-space: nowrap; }}\n",
            ".legend .swatch {{ width: {5}; height: {5}; flex: none; }}\n",
            ".axis-title {{ position: absolute; font-size: {0}; font-weight: bold; color: #475569; white-space: nowrap; }}"
        ),
        px(CHART_LABEL_SIZE),
        line,
        fmt_num(CHART_LABEL_SIZE),
        px(12.0),
        px(4.0),
        px(8.0)
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::templates::resolve_theme;
    use crate::models::theme::FontOverrides;

    #[test]
    fn theme_colors_become_custom_properties() {
        let theme = resolve_theme("modern", None, None);
        let mut css = String::new();
        write_stylesheet(&mut css, &theme).unwrap();
        assert!(css.contains(&format!("--primary: {};", theme.primary.to_css_hex())));
        assert!(css.contains("width: 1280px; height: 720px"));
        assert!(css.contains("page-break-after: always"));
        assert!(!css.contains("@font-face"));
    }

    #[test]
    fn remote_fonts_get_font_faces() {
        let fonts = FontOverrides {
            title_font_name: Some("Playfair".to_string()),
            title_font_url: Some("https://fonts.example/playfair.woff2".to_string()),
            ..Default::default()
        };
        let theme = resolve_theme("modern", None, Some(&fonts));
        let mut css = String::new();
        write_stylesheet(&mut css, &theme).unwrap();
        assert!(css.contains(r#"@font-face { font-family: "deck-title"; src: url("https://fonts.example/playfair.woff2");"#));
        assert!(css.contains(r#"--title-font: "deck-title", "Playfair", "Helvetica Neue""#));
    }
}
