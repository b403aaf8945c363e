//! Chart theme model and explicit resolution pipeline
//!
//! A resolved `Theme` is a plain value built once from a base preset plus
//! zero or more override layers (provider config, then dashboard
//! frontmatter), later layers winning. It is threaded explicitly through
//! rendering; nothing reads theme state from a global.

use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_PALETTE: &[&str] = &[
    "#2563eb", "#dc2626", "#16a34a", "#ca8a04",
    "#9333ea", "#ec4899", "#0891b2", "#ea580c",
];

const TABLEAU_PALETTE: &[&str] = &[
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2",
    "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

const OBSERVABLE_PALETTE: &[&str] = &[
    "#4269d0", "#efb118", "#ff725c", "#6cc5b0",
    "#3ca951", "#ff8ab7", "#a463f2", "#97bbf5",
    "#9c6b4e", "#9498a0",
];

const METABASE_PALETTE: &[&str] = &[
    "#509EE3", "#88BF4D", "#A989C5", "#EF8C8C",
    "#F9D45C", "#F2A86F", "#98D9D9", "#7172AD",
];

/// Look up a named palette from the fixed table.
pub fn palette_by_name(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "default" => Some(DEFAULT_PALETTE),
        "tableau" => Some(TABLEAU_PALETTE),
        "observable" => Some(OBSERVABLE_PALETTE),
        "metabase" => Some(METABASE_PALETTE),
        _ => None,
    }
}

const DEFAULT_FONT: &str = "system-ui, -apple-system, \"Segoe UI\", Roboto, sans-serif";

/// Base preset a theme resolution starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeBase {
    Light,
    Dark,
}

/// Fully resolved theme value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub dark: bool,
    pub palette: Vec<String>,
    pub chart_height: u32,
    pub font_family: String,
    pub colors: ThemeColors,
}

/// Color tokens consumed by the chart collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeColors {
    pub bg: String,
    pub bg_muted: String,
    pub bg_card: String,
    pub border: String,
    pub text: String,
    pub text_muted: String,
    pub grid_line: String,
    pub legend_text: String,
    pub positive: String,
    pub negative: String,
}

impl Theme {
    /// The untouched light/dark preset.
    pub fn preset(base: ThemeBase) -> Theme {
        match base {
            ThemeBase::Light => Theme {
                dark: false,
                palette: owned(TABLEAU_PALETTE),
                chart_height: 320,
                font_family: DEFAULT_FONT.to_string(),
                colors: ThemeColors {
                    bg: "#ffffff".into(),
                    bg_muted: "#f9fafb".into(),
                    bg_card: "#ffffff".into(),
                    border: "#e5e7eb".into(),
                    text: "#111827".into(),
                    text_muted: "#6b7280".into(),
                    grid_line: "#f3f4f6".into(),
                    legend_text: "#6b7280".into(),
                    positive: "#16a34a".into(),
                    negative: "#dc2626".into(),
                },
            },
            ThemeBase::Dark => Theme {
                dark: true,
                palette: owned(TABLEAU_PALETTE),
                chart_height: 320,
                font_family: DEFAULT_FONT.to_string(),
                colors: ThemeColors {
                    bg: "#111827".into(),
                    bg_muted: "#1f2937".into(),
                    bg_card: "#1f2937".into(),
                    border: "#374151".into(),
                    text: "#f9fafb".into(),
                    text_muted: "#9ca3af".into(),
                    grid_line: "#374151".into(),
                    legend_text: "#9ca3af".into(),
                    positive: "#4ade80".into(),
                    negative: "#f87171".into(),
                },
            },
        }
    }

    /// Build a theme from a base preset and override layers, in order.
    /// Darkness always comes from the base, never from an override.
    pub fn resolve(base: ThemeBase, overrides: &[&ThemeOverride]) -> Theme {
        let mut theme = Theme::preset(base);
        for layer in overrides {
            theme.apply(layer);
        }
        theme
    }

    fn apply(&mut self, layer: &ThemeOverride) {
        match &layer.palette {
            Some(PaletteRef::Name(name)) => match palette_by_name(name) {
                Some(palette) => self.palette = owned(palette),
                None => warn!(palette = name.as_str(), "unknown palette name, keeping current"),
            },
            Some(PaletteRef::List(colors)) => self.palette = colors.clone(),
            None => {}
        }
        if let Some(height) = layer.chart_height {
            self.chart_height = height;
        }
        if let Some(font) = &layer.font_family {
            self.font_family = font.clone();
        }
        if let Some(colors) = &layer.colors {
            colors.apply(&mut self.colors);
        }
    }
}

fn owned(palette: &[&str]) -> Vec<String> {
    palette.iter().map(|c| c.to_string()).collect()
}

/// A palette reference in an override: a name from the fixed table or a
/// literal color list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaletteRef {
    List(Vec<String>),
    Name(String),
}

/// Partial theme, as declared in dashboard frontmatter or provider config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeOverride {
    pub palette: Option<PaletteRef>,
    pub chart_height: Option<u32>,
    pub font_family: Option<String>,
    pub colors: Option<ColorOverrides>,
}

/// Per-token color overrides; unset tokens keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorOverrides {
    pub bg: Option<String>,
    pub bg_muted: Option<String>,
    pub bg_card: Option<String>,
    pub border: Option<String>,
    pub text: Option<String>,
    pub text_muted: Option<String>,
    pub grid_line: Option<String>,
    pub legend_text: Option<String>,
    pub positive: Option<String>,
    pub negative: Option<String>,
}

impl ColorOverrides {
    fn apply(&self, colors: &mut ThemeColors) {
        let fields = [
            (&self.bg, &mut colors.bg),
            (&self.bg_muted, &mut colors.bg_muted),
            (&self.bg_card, &mut colors.bg_card),
            (&self.border, &mut colors.border),
            (&self.text, &mut colors.text),
            (&self.text_muted, &mut colors.text_muted),
            (&self.grid_line, &mut colors.grid_line),
            (&self.legend_text, &mut colors.legend_text),
            (&self.positive, &mut colors.positive),
            (&self.negative, &mut colors.negative),
        ];
        for (src, dst) in fields {
            if let Some(value) = src {
                *dst = value.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_name_override() {
        let layer = ThemeOverride {
            palette: Some(PaletteRef::Name("metabase".to_string())),
            ..Default::default()
        };
        let theme = Theme::resolve(ThemeBase::Light, &[&layer]);
        assert_eq!(theme.palette[0], "#509EE3");
        assert!(!theme.dark);
    }

    #[test]
    fn test_unknown_palette_keeps_current() {
        let layer = ThemeOverride {
            palette: Some(PaletteRef::Name("vaporwave".to_string())),
            ..Default::default()
        };
        let theme = Theme::resolve(ThemeBase::Dark, &[&layer]);
        assert_eq!(theme.palette, Theme::preset(ThemeBase::Dark).palette);
    }

    #[test]
    fn test_later_layers_win() {
        let first = ThemeOverride {
            chart_height: Some(240),
            ..Default::default()
        };
        let second = ThemeOverride {
            chart_height: Some(400),
            colors: Some(ColorOverrides {
                positive: Some("#00ff00".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let theme = Theme::resolve(ThemeBase::Light, &[&first, &second]);
        assert_eq!(theme.chart_height, 400);
        assert_eq!(theme.colors.positive, "#00ff00");
    }

    #[test]
    fn test_literal_palette_from_yaml() {
        let layer: ThemeOverride =
            serde_yaml::from_str("palette: [\"#111111\", \"#222222\"]").unwrap();
        let theme = Theme::resolve(ThemeBase::Light, &[&layer]);
        assert_eq!(theme.palette, vec!["#111111", "#222222"]);
    }
}
