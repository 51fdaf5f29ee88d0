use image::{GrayImage, Luma, RgbaImage};
use std::collections::VecDeque;
use tracing::debug;

use crate::settings::Settings;

use super::geom;
use super::PixelRect;

/// A segmented speech-bubble interior: the shrunk bounding rect in page
/// coordinates, plus the flood mask in crop-local coordinates.
pub(crate) struct BubbleRegion {
    pub(crate) rect: PixelRect,
    pub(crate) mask: GrayImage,
    pub(crate) origin: (u32, u32),
}

/// Heuristic seed probes, tried in order when the text-box center does not
/// land on a candidate-interior pixel (it usually sits on a glyph stroke).
const SEED_PROBES: &[(i32, i32)] = &[
    (0, 0),
    (3, 0),
    (-3, 0),
    (0, 3),
    (0, -3),
    (6, 0),
    (-6, 0),
    (0, 6),
    (0, -6),
    (6, 6),
    (-6, 6),
    (6, -6),
    (-6, -6),
    (12, 0),
    (-12, 0),
    (0, 12),
    (0, -12),
    (12, 12),
    (-12, 12),
    (12, -12),
    (-12, -12),
    (24, 0),
    (-24, 0),
    (0, 24),
    (0, -24),
    (24, 24),
    (-24, 24),
    (24, -24),
    (-24, -24),
];

/// Tries to find the light-colored bubble interior enclosing `text_rect`.
///
/// A miss is the expected common case (panels without bubbles, overlapping
/// art) and is a control-flow signal, not an error: callers fall back to
/// rectangle-based erasure.
pub(crate) fn detect_bubble(
    page: &RgbaImage,
    text_rect: PixelRect,
    settings: &Settings,
) -> Option<BubbleRegion> {
    let (img_w, img_h) = page.dimensions();
    let reach = (text_rect.width().max(text_rect.height()) as f32 * settings.bubble_search_scale)
        .round() as u32;
    let window = geom::expand_box(text_rect, img_w, img_h, 0.0, reach.max(1));

    let luma = luminance_crop(page, window);
    let candidates = binarize(&luma, settings.bubble_threshold);

    let (cx, cy) = text_rect.center();
    let seed = find_seed(&candidates, cx - window.x1, cy - window.y1)?;

    let mask = grow_region(&candidates, seed);
    let bounds = mask_bounds(&mask)?;

    let min_area = (text_rect.area() as f32 * settings.bubble_min_area_ratio) as u64;
    if bounds.area() < min_area {
        debug!(
            "bubble candidate too small ({} px^2 < {} px^2)",
            bounds.area(),
            min_area
        );
        return None;
    }

    let page_rect = PixelRect {
        x1: window.x1 + bounds.x1,
        y1: window.y1 + bounds.y1,
        x2: window.x1 + bounds.x2,
        y2: window.y1 + bounds.y2,
    };
    let interior = geom::inset_box(page_rect, settings.bubble_interior_pad)?;

    Some(BubbleRegion {
        rect: interior,
        mask,
        origin: (window.x1, window.y1),
    })
}

/// Single-channel brightness crop, alpha-composited over white.
pub(crate) fn luminance_crop(page: &RgbaImage, rect: PixelRect) -> GrayImage {
    let mut luma = GrayImage::new(rect.width(), rect.height());
    for y in 0..rect.height() {
        for x in 0..rect.width() {
            let [r, g, b, a] = page.get_pixel(rect.x1 + x, rect.y1 + y).0;
            let alpha = a as f32 / 255.0;
            let r = r as f32 * alpha + 255.0 * (1.0 - alpha);
            let g = g as f32 * alpha + 255.0 * (1.0 - alpha);
            let b = b as f32 * alpha + 255.0 * (1.0 - alpha);
            let value = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
            luma.put_pixel(x, y, Luma([value]));
        }
    }
    luma
}

/// Candidate-interior pixels: brightness at or above the threshold.
fn binarize(luma: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = luma.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = if pixel[0] >= threshold { 255 } else { 0 };
    }
    out
}

fn find_seed(candidates: &GrayImage, cx: u32, cy: u32) -> Option<(u32, u32)> {
    let (w, h) = candidates.dimensions();
    for (dx, dy) in SEED_PROBES {
        let x = cx as i64 + *dx as i64;
        let y = cy as i64 + *dy as i64;
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            continue;
        }
        if candidates.get_pixel(x as u32, y as u32)[0] == 255 {
            return Some((x as u32, y as u32));
        }
    }
    debug!("no candidate-interior seed near ({cx}, {cy})");
    None
}

/// 4-connected region growing from `seed` across candidate pixels.
fn grow_region(candidates: &GrayImage, seed: (u32, u32)) -> GrayImage {
    let (w, h) = candidates.dimensions();
    let mut mask = GrayImage::new(w, h);
    let mut queue = VecDeque::new();

    mask.put_pixel(seed.0, seed.1, Luma([255]));
    queue.push_back(seed);

    while let Some((x, y)) = queue.pop_front() {
        for (dx, dy) in [(1i64, 0i64), (-1, 0), (0, 1), (0, -1)] {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if candidates.get_pixel(nx, ny)[0] == 255 && mask.get_pixel(nx, ny)[0] == 0 {
                mask.put_pixel(nx, ny, Luma([255]));
                queue.push_back((nx, ny));
            }
        }
    }
    mask
}

fn mask_bounds(mask: &GrayImage) -> Option<PixelRect> {
    let (w, h) = mask.dimensions();
    let mut min_x = w;
    let mut min_y = h;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut any = false;
    for y in 0..h {
        for x in 0..w {
            if mask.get_pixel(x, y)[0] == 255 {
                any = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }
    if !any {
        return None;
    }
    Some(PixelRect {
        x1: min_x,
        y1: min_y,
        x2: max_x + 1,
        y2: max_y + 1,
    })
}
