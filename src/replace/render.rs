use ab_glyph::PxScale;
use anyhow::Result;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::{debug, info, warn};

use crate::settings::Settings;

use super::bubble::detect_bubble;
use super::erase::{bubble_fill, flat_fill, mask_fill, EraseMode};
use super::font::FontLibrary;
use super::geom;
use super::layout::{fit_text, position_lines, FitOptions};
use super::{Extraction, PixelRect, ReplaceOutcome};

enum Step {
    Replaced,
    Skipped(&'static str),
}

/// Replaces every extraction's text on the page, in input order, mutating
/// the raster in place. A defective extraction is counted and logged; it
/// never aborts the rest of the page.
pub fn replace_page(
    page: &mut RgbaImage,
    extractions: &[Extraction],
    settings: &Settings,
    fonts: &FontLibrary,
    page_label: &str,
) -> ReplaceOutcome {
    let mut outcome = ReplaceOutcome::default();
    if extractions.is_empty() {
        info!("[{page_label}] no extractions to process");
        return outcome;
    }

    for (idx, extraction) in extractions.iter().enumerate() {
        let num = idx + 1;
        match replace_one(page, extraction, settings, fonts) {
            Ok(Step::Replaced) => {
                outcome.successful += 1;
                debug!(
                    "[{page_label}] extraction {num}: '{}' -> '{}'",
                    extraction.source_text, extraction.translated_text
                );
            }
            Ok(Step::Skipped(reason)) => {
                outcome.failed += 1;
                warn!("[{page_label}] extraction {num}: {reason}, skipping");
            }
            Err(err) => {
                outcome.failed += 1;
                warn!("[{page_label}] extraction {num}: replacement error: {err:#}");
            }
        }
    }

    info!(
        "[{page_label}] replacements: {} successful, {} failed",
        outcome.successful, outcome.failed
    );
    outcome
}

fn replace_one(
    page: &mut RgbaImage,
    extraction: &Extraction,
    settings: &Settings,
    fonts: &FontLibrary,
) -> Result<Step> {
    let (img_w, img_h) = page.dimensions();

    let Some(text_box) = extraction.text_box.as_ref() else {
        return Ok(Step::Skipped("missing text box"));
    };
    let translated = extraction.translated_text.trim();
    if translated.is_empty() {
        return Ok(Step::Skipped("missing translation"));
    }
    let Some(text_rect) = geom::normalize_to_pixels(text_box, img_w, img_h, settings.box_padding)
    else {
        return Ok(Step::Skipped("invalid bounding box"));
    };

    let segmented = if settings.erase_mode == EraseMode::Bubble {
        detect_bubble(page, text_rect, settings)
    } else {
        None
    };
    let hint_rect = extraction
        .bubble_box
        .as_ref()
        .and_then(|hint| geom::normalize_to_pixels(hint, img_w, img_h, 0));

    // A bubble-shaped rect replaces the text rect only when it is decisively
    // larger; the segmented interior outranks the unverified detector hint.
    let expand = |rect| {
        geom::expand_box(
            rect,
            img_w,
            img_h,
            settings.render_expand_pct,
            settings.render_expand_min,
        )
    };
    let area_floor = text_rect.area() as f32 * settings.bubble_area_margin;

    let mut target = expand(text_rect);
    let mut erase_with_bubble_mask = false;
    if let Some(region) = &segmented {
        if region.rect.area() as f32 >= area_floor {
            target = expand(region.rect);
            erase_with_bubble_mask = true;
        }
    }
    if !erase_with_bubble_mask {
        if let Some(hint) = hint_rect {
            if hint.area() as f32 >= area_floor {
                target = expand(hint);
            }
        }
    }

    let background = rgba(settings.background_color);
    match settings.erase_mode {
        EraseMode::Flat => flat_fill(page, target, background),
        EraseMode::Mask => mask_fill(
            page,
            target,
            background,
            settings.erase_threshold,
            settings.erase_dilation,
        ),
        EraseMode::Bubble => match (&segmented, erase_with_bubble_mask) {
            (Some(region), true) => {
                bubble_fill(page, region, background, settings.erase_threshold)
            }
            _ => mask_fill(
                page,
                target,
                background,
                settings.erase_threshold,
                settings.erase_dilation,
            ),
        },
    }

    draw_translation(page, translated, target, extraction, settings, fonts);
    Ok(Step::Replaced)
}

fn draw_translation(
    page: &mut RgbaImage,
    translated: &str,
    target: PixelRect,
    extraction: &Extraction,
    settings: &Settings,
    fonts: &FontLibrary,
) {
    // Fixed inset keeps glyphs off the rectangle edges; a rect too small to
    // inset is used as-is.
    let inner = geom::inset_box(target, settings.text_inset).unwrap_or(target);

    let face = fonts.face(extraction.styling.bold, extraction.styling.italic);
    let opts = FitOptions {
        min_font_size: settings.min_font_size,
        max_font_size: settings.max_font_size,
        line_spacing: settings.line_spacing,
        height_allowance: settings.height_allowance,
    };
    let fit = fit_text(
        translated,
        inner.width() as f32,
        inner.height() as f32,
        face,
        &opts,
    );
    let placed = position_lines(&fit, inner, face, settings.line_spacing);

    let Some(raster) = face.and_then(|metrics| metrics.rasterizer()) else {
        debug!("no rasterizable font face; layout computed but glyphs skipped");
        return;
    };
    let color = rgba(settings.text_color);
    let scale = PxScale::from(fit.font_size);
    for line in &placed {
        draw_text_mut(page, color, line.x, line.y, scale, &raster, &line.text);
    }
}

fn rgba(rgb: [u8; 3]) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], 255])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::NormalizedBox;

    fn extraction(translated: &str) -> Extraction {
        Extraction {
            source_text: "こんにちは".to_string(),
            translated_text: translated.to_string(),
            text_box: Some(NormalizedBox {
                x: 0.1,
                y: 0.1,
                width: 0.2,
                height: 0.1,
            }),
            bubble_box: None,
            styling: Default::default(),
        }
    }

    #[test]
    fn empty_translation_fails_without_touching_the_page() {
        let mut page = RgbaImage::from_pixel(800, 600, Rgba([120, 120, 120, 255]));
        let original = page.clone();
        let outcome = replace_page(
            &mut page,
            &[extraction("")],
            &Settings::default(),
            &FontLibrary::empty(),
            "p1",
        );
        assert_eq!(outcome, ReplaceOutcome { successful: 0, failed: 1 });
        assert_eq!(page.as_raw(), original.as_raw());
    }

    #[test]
    fn missing_text_box_fails() {
        let mut page = RgbaImage::from_pixel(100, 100, Rgba([120, 120, 120, 255]));
        let mut bad = extraction("Hello");
        bad.text_box = None;
        let outcome = replace_page(
            &mut page,
            &[bad],
            &Settings::default(),
            &FontLibrary::empty(),
            "p1",
        );
        assert_eq!(outcome, ReplaceOutcome { successful: 0, failed: 1 });
    }

    #[test]
    fn out_of_range_box_fails() {
        let mut page = RgbaImage::from_pixel(100, 100, Rgba([120, 120, 120, 255]));
        let mut bad = extraction("Hello");
        bad.text_box = Some(NormalizedBox {
            x: 1.4,
            y: 0.1,
            width: 0.2,
            height: 0.1,
        });
        let outcome = replace_page(
            &mut page,
            &[bad],
            &Settings::default(),
            &FontLibrary::empty(),
            "p1",
        );
        assert_eq!(outcome, ReplaceOutcome { successful: 0, failed: 1 });
    }

    #[test]
    fn oversized_bubble_hint_wins_the_target_rect() {
        let settings = Settings {
            erase_mode: EraseMode::Flat,
            ..Settings::default()
        };
        let mut page = RgbaImage::from_pixel(200, 200, Rgba([40, 40, 40, 255]));
        let mut with_hint = extraction("Hi");
        with_hint.text_box = Some(NormalizedBox {
            x: 0.4,
            y: 0.4,
            width: 0.2,
            height: 0.2,
        });
        with_hint.bubble_box = Some(NormalizedBox {
            x: 0.25,
            y: 0.25,
            width: 0.5,
            height: 0.5,
        });
        let outcome = replace_page(&mut page, &[with_hint], &settings, &FontLibrary::empty(), "p1");
        assert_eq!(outcome.successful, 1);
        // The flat fill covered the (expanded) hint rect, not just the text box.
        assert_eq!(*page.get_pixel(55, 100), Rgba([255, 255, 255, 255]));
        assert_eq!(*page.get_pixel(10, 10), Rgba([40, 40, 40, 255]));
    }
}
