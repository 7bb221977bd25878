//! Theme Resolver: the named template catalog and the merge of presets with caller
//! overrides into one concrete [`Theme`].

use indexmap::IndexMap;
use log::{debug, warn};
use once_cell::sync::Lazy;

use crate::models::colors::Color;
use crate::models::theme::{FontOverrides, Theme, ThemeOverrides};

/// Template used when the requested name is unknown.
pub const DEFAULT_TEMPLATE: &str = "modern";

/// A catalog entry. Colors are stored as hex literals and parsed once into the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePreset {
    pub id: &'static str,
    pub label: &'static str,
    pub primary: Color,
    pub background: Color,
    pub title: Color,
    pub text: Color,
    pub border: Color,
}

// (id, label, primary, background, title, text, border)
const PRESETS: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
    ("modern", "Modern", "#10B981", "#FFFFFF", "#1F2937", "#374151", "#D1D5DB"),
    ("general", "General", "#3B82F6", "#FFFFFF", "#1E40AF", "#1F2937", "#D1D5DB"),
    ("swift", "Swift", "#8B5CF6", "#FFFFFF", "#5B21B6", "#4C1D95", "#D1D5DB"),
    ("minimal", "Minimal", "#000000", "#FFFFFF", "#000000", "#374151", "#D1D5DB"),
    ("corporate", "Corporate", "#1F2937", "#F9FAFB", "#111827", "#374151", "#D1D5DB"),
    ("ocean", "Ocean", "#0EA5E9", "#F0F9FF", "#0C4A6E", "#075985", "#BAE6FD"),
    ("sunrise", "Sunrise", "#F97316", "#FFF7ED", "#7C2D12", "#7C2D12", "#FED7AA"),
    ("sunset", "Sunset", "#EF4444", "#FEF2F2", "#7F1D1D", "#7F1D1D", "#FECACA"),
    ("forest", "Forest", "#22C55E", "#F0FDF4", "#064E3B", "#065F46", "#BBF7D0"),
    ("desert", "Desert", "#D97706", "#FFFBEB", "#78350F", "#92400E", "#FDE68A"),
    ("midnight", "Midnight", "#111827", "#0B1220", "#E5E7EB", "#CBD5E1", "#1F2937"),
    ("ruby", "Ruby", "#E11D48", "#FFF1F2", "#881337", "#9F1239", "#FECDD3"),
    ("sapphire", "Sapphire", "#2563EB", "#EFF6FF", "#1E3A8A", "#1E40AF", "#BFDBFE"),
    ("citrus", "Citrus", "#F59E0B", "#FFFBEB", "#7C2D12", "#92400E", "#FDE68A"),
    ("mint", "Mint", "#14B8A6", "#ECFEFF", "#115E59", "#134E4A", "#99F6E4"),
    ("lavender", "Lavender", "#A78BFA", "#F5F3FF", "#4C1D95", "#5B21B6", "#DDD6FE"),
    ("coral", "Coral", "#FB7185", "#FFF1F2", "#881337", "#9F1239", "#FECDD3"),
    ("slate", "Slate", "#64748B", "#F8FAFC", "#0F172A", "#1F2937", "#CBD5E1"),
    ("gold", "Gold", "#F59E0B", "#FFF7ED", "#1F2937", "#374151", "#FED7AA"),
    ("rose", "Rose", "#F43F5E", "#FFF1F2", "#881337", "#9F1239", "#FECDD3"),
    ("royal", "Royal", "#7C3AED", "#F5F3FF", "#312E81", "#3730A3", "#DDD6FE"),
    ("monochrome", "Monochrome", "#111827", "#FFFFFF", "#111827", "#374151", "#D1D5DB"),
    ("neon", "Neon", "#06B6D4", "#F0FDFA", "#0E7490", "#155E75", "#99F6E4"),
    ("pastel", "Pastel", "#93C5FD", "#EFF6FF", "#1D4ED8", "#1E40AF", "#BFDBFE"),
    ("cyber", "Cyber", "#22D3EE", "#0B1220", "#E2E8F0", "#94A3B8", "#1E293B"),
    ("custom", "Custom (Brand Kit)", "#10B981", "#FFFFFF", "#1F2937", "#374151", "#D1D5DB"),
];

// Series palettes for the templates that define their own; others derive from modern.
const PALETTES: &[(&str, [&str; 6])] = &[
    ("modern", ["#10B981", "#059669", "#34D399", "#0EA5E9", "#F59E0B", "#EF4444"]),
    ("general", ["#3B82F6", "#1D4ED8", "#60A5FA", "#22C55E", "#F59E0B", "#EF4444"]),
    ("swift", ["#8B5CF6", "#6D28D9", "#A78BFA", "#EC4899", "#F59E0B", "#22C55E"]),
    ("minimal", ["#000000", "#4B5563", "#9CA3AF", "#10B981", "#3B82F6", "#F59E0B"]),
    ("corporate", ["#1F2937", "#374151", "#6B7280", "#10B981", "#3B82F6", "#F59E0B"]),
];

fn hex(literal: &str) -> Color {
    // Catalog literals are compile-time constants checked by the tests below.
    Color::from_hex(literal).unwrap_or(Color::BLACK)
}

static CATALOG: Lazy<IndexMap<&'static str, TemplatePreset>> = Lazy::new(|| {
    PRESETS
        .iter()
        .map(|&(id, label, primary, background, title, text, border)| {
            (
                id,
                TemplatePreset {
                    id,
                    label,
                    primary: hex(primary),
                    background: hex(background),
                    title: hex(title),
                    text: hex(text),
                    border: hex(border),
                },
            )
        })
        .collect()
});

/// All presets in catalog order.
pub fn templates() -> impl Iterator<Item = &'static TemplatePreset> {
    CATALOG.values()
}

/// Looks up a preset by name (case-insensitive). Unknown names fall back to the default.
pub fn find_template(name: &str) -> &'static TemplatePreset {
    let key = name.trim().to_ascii_lowercase();
    match CATALOG.get(key.as_str()) {
        Some(preset) => preset,
        None => {
            if !key.is_empty() {
                debug!("Unknown template '{}', using '{}'", name, DEFAULT_TEMPLATE);
            }
            &CATALOG[DEFAULT_TEMPLATE]
        }
    }
}

/// Builds the series palette for a template. Templates without their own palette use the
/// modern palette with their primary color first.
pub fn chart_palette(template: &TemplatePreset) -> Vec<Color> {
    if let Some((_, colors)) = PALETTES.iter().find(|(id, _)| *id == template.id) {
        return colors.iter().map(|c| hex(c)).collect();
    }
    let mut palette: Vec<Color> = PALETTES[0].1.iter().map(|c| hex(c)).collect();
    palette[0] = template.primary;
    palette
}

fn apply_override(field: &str, value: Option<&String>, base: Color) -> Color {
    match value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => Color::from_hex(raw).unwrap_or_else(|| {
            warn!("Ignoring invalid {} override '{}'", field, raw);
            base
        }),
        None => base,
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Merges a named preset with optional overrides into a concrete theme.
///
/// Override fields win field-by-field; unparseable override colors are ignored. The
/// subtitle color (text on the primary color) defaults to whichever of white or
/// near-black reads better on the primary.
pub fn resolve_theme(
    template: &str,
    overrides: Option<&ThemeOverrides>,
    fonts: Option<&FontOverrides>,
) -> Theme {
    let preset = find_template(template);
    let empty = ThemeOverrides::default();
    let overrides = overrides.unwrap_or(&empty);

    let primary = apply_override("primary", overrides.primary.as_ref(), preset.primary);
    let title = apply_override("title", overrides.title.as_ref(), preset.title);
    let default_subtitle = primary.contrasting_text();

    let mut chart_palette = chart_palette(preset);
    if overrides.primary.is_some() {
        chart_palette[0] = primary;
    }

    Theme {
        primary,
        background: apply_override(
            "background",
            overrides.background.as_ref(),
            preset.background,
        ),
        title,
        subtitle: apply_override("subtitle", overrides.subtitle.as_ref(), default_subtitle),
        text: apply_override("text", overrides.text.as_ref(), preset.text),
        border: apply_override("border", overrides.border.as_ref(), preset.border),
        chart_palette,
        title_font: fonts.and_then(|f| non_blank(f.title_font_name.as_ref())),
        body_font: fonts.and_then(|f| non_blank(f.body_font_name.as_ref())),
        title_font_url: fonts.and_then(|f| non_blank(f.title_font_url.as_ref())),
        body_font_url: fonts.and_then(|f| non_blank(f.body_font_url.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_literals_are_valid_colors() {
        for (id, _, primary, background, title, text, border) in PRESETS {
            for literal in [primary, background, title, text, border] {
                assert!(Color::from_hex(literal).is_some(), "{} has bad color {}", id, literal);
            }
        }
        for (id, colors) in PALETTES {
            for literal in colors {
                assert!(Color::from_hex(literal).is_some(), "{} palette has {}", id, literal);
            }
        }
        assert_eq!(templates().count(), 26);
    }

    #[test]
    fn unknown_template_falls_back_to_default() {
        let theme = resolve_theme("no-such-template", None, None);
        assert_eq!(theme, resolve_theme("modern", None, None));
        assert_eq!(find_template(" OCEAN ").id, "ocean");
    }

    #[test]
    fn overrides_win_field_by_field() {
        let overrides = ThemeOverrides {
            primary: Some("#FF0000".to_string()),
            text: Some("not-a-color".to_string()),
            ..Default::default()
        };
        let theme = resolve_theme("ocean", Some(&overrides), None);
        assert_eq!(theme.primary, Color::rgb(0xFF, 0, 0));
        assert_eq!(theme.background, Color::from_hex("#F0F9FF").unwrap());
        assert_eq!(theme.text, Color::from_hex("#075985").unwrap());
        assert_eq!(theme.chart_palette[0], Color::rgb(0xFF, 0, 0));
    }

    #[test]
    fn subtitle_contrasts_with_primary() {
        assert_eq!(resolve_theme("modern", None, None).subtitle, Color::WHITE);
        let pastel = resolve_theme("pastel", None, None);
        assert_eq!(pastel.subtitle, Color::rgb(0x11, 0x18, 0x27));
    }

    #[test]
    fn palettes_fall_back_to_modern_with_primary_first() {
        let ocean = chart_palette(find_template("ocean"));
        assert_eq!(ocean[0], Color::from_hex("#0EA5E9").unwrap());
        assert_eq!(ocean[1], Color::from_hex("#059669").unwrap());
        let swift = chart_palette(find_template("swift"));
        assert_eq!(swift[3], Color::from_hex("#EC4899").unwrap());
    }

    #[test]
    fn blank_fonts_are_ignored() {
        let fonts = FontOverrides {
            title_font_name: Some("  ".to_string()),
            body_font_name: Some("Inter".to_string()),
            ..Default::default()
        };
        let theme = resolve_theme("modern", None, Some(&fonts));
        assert_eq!(theme.title_font, None);
        assert_eq!(theme.body_font.as_deref(), Some("Inter"));
    }
}
