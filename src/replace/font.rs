use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};
use ttf_parser::name_id;
use ttf_parser::Face;

/// Parsed font face plus the handful of metrics the layout engine needs.
/// The raw bytes are kept so the same face can be handed to the rasterizer.
#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    descender: i16,
    line_gap: i16,
    family: Option<String>,
    face_index: u32,
}

impl FontMetrics {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        Self::from_data(data)
            .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
    }

    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        for index in 0..count {
            let Ok(face) = Face::parse(&data, index) else {
                continue;
            };
            let family = extract_family_name(&face);
            let units_per_em = face.units_per_em().max(1);
            let space_advance = face
                .glyph_index(' ')
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(units_per_em / 2);
            let ascender = face.ascender();
            let descender = face.descender();
            let line_gap = face.line_gap();
            return Ok(FontMetrics {
                units_per_em,
                space_advance,
                ascender,
                descender,
                line_gap,
                family,
                face_index: index,
                data: Arc::new(data),
            });
        }
        Err(anyhow!("no parseable face in font data"))
    }

    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Ascent-to-descent span of one line at `size` pixels.
    pub fn line_height(&self, size: f32) -> f32 {
        let units = self.units_per_em.max(1) as f32;
        let span = self.ascender as f32 - self.descender as f32 + self.line_gap as f32;
        span.max(units) * size / units
    }

    /// A face handle the glyph rasterizer accepts, backed by the same bytes.
    pub fn rasterizer(&self) -> Option<ab_glyph::FontRef<'_>> {
        ab_glyph::FontRef::try_from_slice_and_index(&self.data, self.face_index).ok()
    }
}

/// Measures a line in pixels using glyph advances. Missing glyphs count as a
/// space advance; unusable font data degrades to the width heuristic so the
/// wrap keeps working at reduced fidelity.
pub fn measure_text_width_px(text: &str, font_size: f32, font: Option<&FontMetrics>) -> f32 {
    if let Some(font) = font {
        if let Ok(face) = Face::parse(&font.data, font.face_index) {
            let mut advance = 0u32;
            for ch in text.chars() {
                if ch == '\n' {
                    continue;
                }
                if ch == ' ' {
                    advance = advance.saturating_add(font.space_advance as u32);
                    continue;
                }
                if let Some(glyph) = face.glyph_index(ch) {
                    let glyph_advance = face.glyph_hor_advance(glyph).unwrap_or(font.space_advance);
                    advance = advance.saturating_add(glyph_advance as u32);
                } else {
                    advance = advance.saturating_add(font.space_advance as u32);
                }
            }
            let units = font.units_per_em.max(1) as f32;
            return advance as f32 * (font_size / units);
        }
    }
    estimate_text_width_units(text) * font_size
}

fn estimate_char_units_for_width(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units_for_width).sum()
}

/// Resolved faces for the styling variants the detector may hint at.
///
/// Resolution happens once, up front; lookups afterwards are read-only and
/// safe to share across pages. A variant that does not resolve silently
/// falls back toward the regular face.
pub struct FontLibrary {
    faces: HashMap<(bool, bool), FontMetrics>,
}

impl FontLibrary {
    pub fn load(primary: &str, fallback: &str) -> Self {
        let mut faces = HashMap::new();
        for (bold, italic) in [(false, false), (true, false), (false, true), (true, true)] {
            if let Some(metrics) = resolve_face(primary, fallback, bold, italic) {
                faces.insert((bold, italic), metrics);
            }
        }
        if faces.is_empty() {
            warn!(
                "no usable font found (tried '{}', '{}', system faces); \
                 text will be measured heuristically and glyphs skipped",
                primary, fallback
            );
        }
        FontLibrary { faces }
    }

    /// A library with no faces: layout runs on the width heuristic only.
    pub fn empty() -> Self {
        FontLibrary {
            faces: HashMap::new(),
        }
    }

    pub fn face(&self, bold: bool, italic: bool) -> Option<&FontMetrics> {
        self.faces
            .get(&(bold, italic))
            .or_else(|| self.faces.get(&(bold, false)))
            .or_else(|| self.faces.get(&(false, italic)))
            .or_else(|| self.faces.get(&(false, false)))
    }
}

fn resolve_face(primary: &str, fallback: &str, bold: bool, italic: bool) -> Option<FontMetrics> {
    for name in [primary, fallback] {
        if name.trim().is_empty() {
            continue;
        }
        for file_name in variant_file_names(name, bold, italic) {
            let Some(path) = find_font(&file_name) else {
                continue;
            };
            match FontMetrics::from_file(path) {
                Ok(metrics) => {
                    debug!("resolved font {} -> {}", file_name, path.display());
                    return Some(metrics);
                }
                Err(err) => debug!("skipping font {}: {:#}", path.display(), err),
            }
        }
    }

    // Last tier for the regular face only: any parseable face on the system.
    if !bold && !italic {
        for path in font_index() {
            if let Ok(metrics) = FontMetrics::from_file(path) {
                debug!("using system face {}", path.display());
                return Some(metrics);
            }
        }
    }
    None
}

fn variant_file_names(name: &str, bold: bool, italic: bool) -> Vec<String> {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (name, "ttf"),
    };
    let suffixes: &[&str] = match (bold, italic) {
        (true, true) => &["-BoldItalic", "-BoldOblique"],
        (true, false) => &["-Bold"],
        (false, true) => &["-Italic", "-Oblique"],
        (false, false) => &[""],
    };
    suffixes
        .iter()
        .map(|suffix| format!("{stem}{suffix}.{ext}"))
        .collect()
}

static FONT_INDEX: OnceLock<Vec<PathBuf>> = OnceLock::new();

/// Process-wide list of font files, built lazily on first use and read-only
/// afterwards.
fn font_index() -> &'static [PathBuf] {
    FONT_INDEX.get_or_init(|| {
        let mut roots = vec![
            PathBuf::from("/usr/share/fonts"),
            PathBuf::from("/usr/local/share/fonts"),
            PathBuf::from("/System/Library/Fonts"),
            PathBuf::from("/Library/Fonts"),
            PathBuf::from("C:/Windows/Fonts"),
        ];
        if let Ok(home) = std::env::var("HOME") {
            if !home.trim().is_empty() {
                roots.push(Path::new(&home).join(".fonts"));
                roots.push(Path::new(&home).join("Library/Fonts"));
            }
        }
        let mut files = Vec::new();
        for root in roots {
            collect_font_files(&root, &mut files);
        }
        files.sort();
        debug!("indexed {} font file(s)", files.len());
        files
    })
}

fn collect_font_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_font_files(&path, out);
            continue;
        }
        let is_font = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                ext.eq_ignore_ascii_case("ttf")
                    || ext.eq_ignore_ascii_case("otf")
                    || ext.eq_ignore_ascii_case("ttc")
            })
            .unwrap_or(false);
        if is_font {
            out.push(path);
        }
    }
}

fn find_font(file_name: &str) -> Option<&'static PathBuf> {
    font_index().iter().find(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.eq_ignore_ascii_case(file_name))
            .unwrap_or(false)
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_width_scales_with_size_and_length() {
        let short = measure_text_width_px("hi", 10.0, None);
        let long = measure_text_width_px("hello there", 10.0, None);
        assert!(long > short);
        assert!((measure_text_width_px("hi", 20.0, None) - short * 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn heuristic_width_of_ascii_words() {
        // 5 alphanumeric chars at 0.55 units each
        let width = measure_text_width_px("Hello", 10.0, None);
        assert!((width - 27.5).abs() < 1e-4);
    }

    #[test]
    fn empty_library_resolves_nothing() {
        let fonts = FontLibrary::empty();
        assert!(fonts.face(false, false).is_none());
        assert!(fonts.face(true, true).is_none());
    }

    #[test]
    fn variant_names_fall_back_to_ttf_extension() {
        assert_eq!(variant_file_names("Arial", true, false), vec!["Arial-Bold.ttf"]);
        assert_eq!(
            variant_file_names("DejaVuSans.ttf", false, true),
            vec!["DejaVuSans-Italic.ttf", "DejaVuSans-Oblique.ttf"]
        );
    }

    #[test]
    fn rejects_junk_font_data() {
        assert!(FontMetrics::from_data(vec![0u8; 64]).is_err());
    }
}
