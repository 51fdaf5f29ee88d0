use tracing::debug;

use super::font::{measure_text_width_px, FontMetrics};
use super::PixelRect;

/// Search bounds and spacing knobs for [`fit_text`].
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub min_font_size: u32,
    pub max_font_size: u32,
    pub line_spacing: f32,
    pub height_allowance: f32,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            min_font_size: 10,
            max_font_size: 64,
            line_spacing: 1.1,
            height_allowance: 1.2,
        }
    }
}

/// The outcome of a font-fit search: the chosen size, the wrapped lines,
/// and the measured block height.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TextFit {
    pub font_size: f32,
    pub lines: Vec<String>,
    pub line_height: f32,
    pub total_height: f32,
}

pub(crate) struct PlacedLine {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) text: String,
}

/// Finds the largest font size whose wrapped lines fit `max_width` and whose
/// block height fits `max_height * height_allowance`.
///
/// The fit predicate is not perfectly monotonic in size (wrapping reflows),
/// so the search keeps the best accepted candidate rather than trusting the
/// final probe. When no size is accepted the minimum size's wrap is returned
/// as a best effort; this function never returns "no result".
pub fn fit_text(
    text: &str,
    max_width: f32,
    max_height: f32,
    font: Option<&FontMetrics>,
    opts: &FitOptions,
) -> TextFit {
    let min_size = opts.min_font_size.max(1);
    let max_size = opts.max_font_size.max(min_size);
    let height_budget = max_height * opts.height_allowance.max(1.0);

    let mut lo = min_size;
    let mut hi = max_size;
    let mut best: Option<TextFit> = None;

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let candidate = layout_at(text, mid as f32, max_width, font, opts.line_spacing);
        if fits(&candidate, max_width, height_budget, font) {
            best = Some(candidate);
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }

    best.unwrap_or_else(|| {
        debug!("no font size in [{min_size}, {max_size}] fits; degrading to minimum");
        layout_at(text, min_size as f32, max_width, font, opts.line_spacing)
    })
}

fn fits(fit: &TextFit, max_width: f32, height_budget: f32, font: Option<&FontMetrics>) -> bool {
    if fit.total_height > height_budget {
        return false;
    }
    fit.lines
        .iter()
        .all(|line| measure_text_width_px(line, fit.font_size, font) <= max_width)
}

fn layout_at(
    text: &str,
    size: f32,
    max_width: f32,
    font: Option<&FontMetrics>,
    line_spacing: f32,
) -> TextFit {
    let lines = wrap_text(text, size, max_width, font);
    let line_height = line_height_px(font, size);
    let count = lines.len().max(1) as f32;
    // Spaced advance between lines, plain line height after the last.
    let total_height = (count - 1.0) * line_height * line_spacing + line_height;
    TextFit {
        font_size: size,
        lines,
        line_height,
        total_height,
    }
}

fn line_height_px(font: Option<&FontMetrics>, size: f32) -> f32 {
    font.map(|metrics| metrics.line_height(size))
        .filter(|height| *height > 0.0)
        .unwrap_or(size * 1.2)
}

/// Greedy word wrap: words are appended while the measured line stays within
/// `max_width`. A single word wider than the budget gets its own line and is
/// allowed to overflow rather than being broken mid-word.
fn wrap_text(text: &str, size: f32, max_width: f32, font: Option<&FontMetrics>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure_text_width_px(&candidate, size, font) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure_text_width_px(word, size, font) > max_width {
            debug!("single word '{word}' exceeds max width");
        }
        current = word.to_string();
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(text.trim().to_string());
    }
    lines
}

/// Centers each line horizontally and the whole block vertically in `rect`.
/// A line wider than the box is pinned to the left edge instead of starting
/// before it.
pub(crate) fn position_lines(
    fit: &TextFit,
    rect: PixelRect,
    font: Option<&FontMetrics>,
    line_spacing: f32,
) -> Vec<PlacedLine> {
    let box_w = rect.width() as f32;
    let box_h = rect.height() as f32;
    let mut y = rect.y1 as f32 + (box_h - fit.total_height) / 2.0;

    let mut placed = Vec::with_capacity(fit.lines.len());
    for line in &fit.lines {
        let line_w = measure_text_width_px(line, fit.font_size, font);
        let x = (rect.x1 as f32 + (box_w - line_w) / 2.0).max(rect.x1 as f32);
        placed.push(PlacedLine {
            x: x as i32,
            y: y as i32,
            text: line.clone(),
        });
        y += fit.line_height * line_spacing;
    }
    placed
}
