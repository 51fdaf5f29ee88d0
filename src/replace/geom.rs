use super::{NormalizedBox, PixelRect};

/// Converts a normalized box to a padded pixel rect, clamped to the image.
///
/// This is the sole validation gate for detector coordinates: `None` means
/// the box is out of range or degenerate, and callers must skip the
/// extraction. Once `Some` is returned every downstream consumer may assume
/// a usable, non-degenerate rect.
pub fn normalize_to_pixels(
    bbox: &NormalizedBox,
    img_w: u32,
    img_h: u32,
    pad: u32,
) -> Option<PixelRect> {
    let NormalizedBox {
        x,
        y,
        width,
        height,
    } = *bbox;

    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        return None;
    }
    if !(width > 0.0 && width <= 1.0) || !(height > 0.0 && height <= 1.0) {
        return None;
    }

    let x1 = (x * img_w as f32) as u32;
    let y1 = (y * img_h as f32) as u32;
    let x2 = ((x + width) * img_w as f32) as u32;
    let y2 = ((y + height) * img_h as f32) as u32;

    let rect = PixelRect {
        x1: x1.saturating_sub(pad),
        y1: y1.saturating_sub(pad),
        x2: x2.saturating_add(pad).min(img_w),
        y2: y2.saturating_add(pad).min(img_h),
    };

    if rect.x2 <= rect.x1 || rect.y2 <= rect.y1 {
        return None;
    }
    Some(rect)
}

/// Grows a rect by `max(min_pad, pct * dimension)` per axis, clamped to the
/// image. A result that would be degenerate leaves the input unchanged.
pub(crate) fn expand_box(
    rect: PixelRect,
    img_w: u32,
    img_h: u32,
    pct: f32,
    min_pad: u32,
) -> PixelRect {
    let pad_x = ((rect.width() as f32 * pct) as u32).max(min_pad);
    let pad_y = ((rect.height() as f32 * pct) as u32).max(min_pad);

    let grown = PixelRect {
        x1: rect.x1.saturating_sub(pad_x),
        y1: rect.y1.saturating_sub(pad_y),
        x2: rect.x2.saturating_add(pad_x).min(img_w),
        y2: rect.y2.saturating_add(pad_y).min(img_h),
    };

    if grown.x2 <= grown.x1 || grown.y2 <= grown.y1 {
        return rect;
    }
    grown
}

/// Shrinks a rect inward on all sides. `None` when nothing usable remains.
pub(crate) fn inset_box(rect: PixelRect, inset: u32) -> Option<PixelRect> {
    let shrunk = PixelRect {
        x1: rect.x1.saturating_add(inset),
        y1: rect.y1.saturating_add(inset),
        x2: rect.x2.saturating_sub(inset),
        y2: rect.y2.saturating_sub(inset),
    };
    if shrunk.x2 <= shrunk.x1 || shrunk.y2 <= shrunk.y1 {
        return None;
    }
    Some(shrunk)
}
