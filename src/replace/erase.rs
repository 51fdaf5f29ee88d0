use image::{GrayImage, Rgba, RgbaImage};

use super::bubble::{luminance_crop, BubbleRegion};
use super::PixelRect;

/// How original glyphs are removed before rendering the translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EraseMode {
    /// Paint the whole destination rectangle with the background color.
    Flat,
    /// Fill only dark (glyph) pixels, dilated to absorb anti-aliasing.
    #[default]
    Mask,
    /// Segment the enclosing bubble interior and fill inside it; falls back
    /// to `Mask` behavior when segmentation misses.
    Bubble,
}

/// Erase operations never fail: a zero-area rectangle is a silent no-op.
pub(crate) fn flat_fill(page: &mut RgbaImage, rect: PixelRect, color: Rgba<u8>) {
    for y in rect.y1..rect.y2.min(page.height()) {
        for x in rect.x1..rect.x2.min(page.width()) {
            page.put_pixel(x, y, color);
        }
    }
}

/// Fills only pixels at or below the darkness threshold, after dilating the
/// mask so anti-aliased stroke edges are covered too. Non-text pixels in the
/// same rectangle survive.
pub(crate) fn mask_fill(
    page: &mut RgbaImage,
    rect: PixelRect,
    color: Rgba<u8>,
    threshold: u8,
    dilation: u32,
) {
    if rect.x2 > page.width() || rect.y2 > page.height() || rect.area() == 0 {
        return;
    }
    let luma = luminance_crop(page, rect);
    let mut mask = GrayImage::new(rect.width(), rect.height());
    for (x, y, pixel) in luma.enumerate_pixels() {
        if pixel[0] <= threshold {
            mask.put_pixel(x, y, image::Luma([255]));
        }
    }
    let mask = dilate(&mask, dilation);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] == 255 {
            page.put_pixel(rect.x1 + x, rect.y1 + y, color);
        }
    }
}

/// Fills the segmented bubble interior: within the shrunk interior rect,
/// pixels that belong to the flood mask or sit at glyph darkness. Artwork
/// pixels inside the rect that are neither survive.
pub(crate) fn bubble_fill(
    page: &mut RgbaImage,
    region: &BubbleRegion,
    color: Rgba<u8>,
    dark_threshold: u8,
) {
    let rect = region.rect;
    if rect.x2 > page.width() || rect.y2 > page.height() || rect.area() == 0 {
        return;
    }
    let luma = luminance_crop(page, rect);
    let (ox, oy) = region.origin;
    for y in rect.y1..rect.y2 {
        for x in rect.x1..rect.x2 {
            let mx = x - ox;
            let my = y - oy;
            let in_mask = mx < region.mask.width()
                && my < region.mask.height()
                && region.mask.get_pixel(mx, my)[0] == 255;
            let is_dark = luma.get_pixel(x - rect.x1, y - rect.y1)[0] <= dark_threshold;
            if in_mask || is_dark {
                page.put_pixel(x, y, color);
            }
        }
    }
}

/// Chebyshev dilation by `radius`, one 3x3 max pass per step.
fn dilate(mask: &GrayImage, radius: u32) -> GrayImage {
    let mut current = mask.clone();
    for _ in 0..radius {
        current = dilate_once(&current);
    }
    current
}

fn dilate_once(mask: &GrayImage) -> GrayImage {
    let (w, h) = mask.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut max_val = 0u8;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    max_val = max_val.max(mask.get_pixel(nx as u32, ny as u32)[0]);
                }
            }
            out.put_pixel(x, y, image::Luma([max_val]));
        }
    }
    out
}
