use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::replace::EraseMode;

/// Every tunable the replacement engine consumes. Values are plain knobs,
/// not part of the algorithmic contract; all have working defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub background_color: [u8; 3],
    pub text_color: [u8; 3],
    pub box_padding: u32,
    pub min_font_size: u32,
    pub max_font_size: u32,
    pub line_spacing: f32,
    pub height_allowance: f32,
    pub text_inset: u32,
    pub render_expand_pct: f32,
    pub render_expand_min: u32,
    pub bubble_area_margin: f32,
    pub erase_mode: EraseMode,
    pub erase_threshold: u8,
    pub erase_dilation: u32,
    pub bubble_threshold: u8,
    pub bubble_min_area_ratio: f32,
    pub bubble_interior_pad: u32,
    pub bubble_search_scale: f32,
    pub primary_font: String,
    pub fallback_font: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            background_color: [255, 255, 255],
            text_color: [0, 0, 0],
            box_padding: 5,
            min_font_size: 10,
            max_font_size: 64,
            line_spacing: 1.1,
            height_allowance: 1.2,
            text_inset: 4,
            render_expand_pct: 0.1,
            render_expand_min: 6,
            bubble_area_margin: 1.1,
            erase_mode: EraseMode::default(),
            erase_threshold: 80,
            erase_dilation: 2,
            bubble_threshold: 200,
            bubble_min_area_ratio: 1.0,
            bubble_interior_pad: 4,
            bubble_search_scale: 1.0,
            primary_font: "DejaVuSans.ttf".to_string(),
            fallback_font: "Arial.ttf".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    render: Option<RenderSettings>,
    erase: Option<EraseSettings>,
    bubble: Option<BubbleSettings>,
    fonts: Option<FontSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSettings {
    text_color: Option<String>,
    box_padding: Option<u32>,
    min_font_size: Option<u32>,
    max_font_size: Option<u32>,
    line_spacing: Option<f32>,
    height_allowance: Option<f32>,
    text_inset: Option<u32>,
    expand_pct: Option<f32>,
    expand_min: Option<u32>,
    bubble_area_margin: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct EraseSettings {
    mode: Option<EraseMode>,
    background_color: Option<String>,
    threshold: Option<u8>,
    dilation: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct BubbleSettings {
    threshold: Option<u8>,
    min_area_ratio: Option<f32>,
    interior_pad: Option<u32>,
    search_scale: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    primary: Option<String>,
    fallback: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(render) = incoming.render {
            if let Some(color) = render.text_color {
                self.apply_color(&color, |settings, rgb| settings.text_color = rgb);
            }
            if let Some(padding) = render.box_padding {
                self.box_padding = padding;
            }
            if let Some(size) = render.min_font_size {
                if size > 0 {
                    self.min_font_size = size;
                }
            }
            if let Some(size) = render.max_font_size {
                if size > 0 {
                    self.max_font_size = size;
                }
            }
            if let Some(spacing) = render.line_spacing {
                if spacing > 0.0 {
                    self.line_spacing = spacing;
                }
            }
            if let Some(allowance) = render.height_allowance {
                if allowance >= 1.0 {
                    self.height_allowance = allowance;
                }
            }
            if let Some(inset) = render.text_inset {
                self.text_inset = inset;
            }
            if let Some(pct) = render.expand_pct {
                if pct >= 0.0 {
                    self.render_expand_pct = pct;
                }
            }
            if let Some(min) = render.expand_min {
                self.render_expand_min = min;
            }
            if let Some(margin) = render.bubble_area_margin {
                if margin >= 1.0 {
                    self.bubble_area_margin = margin;
                }
            }
        }
        if let Some(erase) = incoming.erase {
            if let Some(mode) = erase.mode {
                self.erase_mode = mode;
            }
            if let Some(color) = erase.background_color {
                self.apply_color(&color, |settings, rgb| settings.background_color = rgb);
            }
            if let Some(threshold) = erase.threshold {
                self.erase_threshold = threshold;
            }
            if let Some(dilation) = erase.dilation {
                self.erase_dilation = dilation;
            }
        }
        if let Some(bubble) = incoming.bubble {
            if let Some(threshold) = bubble.threshold {
                self.bubble_threshold = threshold;
            }
            if let Some(ratio) = bubble.min_area_ratio {
                if ratio > 0.0 {
                    self.bubble_min_area_ratio = ratio;
                }
            }
            if let Some(pad) = bubble.interior_pad {
                self.bubble_interior_pad = pad;
            }
            if let Some(scale) = bubble.search_scale {
                if scale > 0.0 {
                    self.bubble_search_scale = scale;
                }
            }
        }
        if let Some(fonts) = incoming.fonts {
            if let Some(primary) = fonts.primary {
                if !primary.trim().is_empty() {
                    self.primary_font = primary;
                }
            }
            if let Some(fallback) = fonts.fallback {
                if !fallback.trim().is_empty() {
                    self.fallback_font = fallback;
                }
            }
        }
        if self.max_font_size < self.min_font_size {
            self.max_font_size = self.min_font_size;
        }
    }

    fn apply_color(&mut self, value: &str, assign: impl FnOnce(&mut Self, [u8; 3])) {
        match parse_hex_color(value) {
            Some(rgb) => assign(self, rgb),
            None => warn!("ignoring malformed color '{}'", value),
        }
    }
}

fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}
