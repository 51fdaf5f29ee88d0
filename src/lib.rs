use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub mod logging;
pub mod replace;
pub mod settings;

pub use replace::{
    fit_text, normalize_to_pixels, replace_page, EraseMode, Extraction, FitOptions, FontLibrary,
    NormalizedBox, PixelRect, ReplaceOutcome, Styling, TextFit,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub input: String,
    pub extractions: String,
    pub output: String,
    pub report: Option<String>,
    pub page_label: Option<String>,
    pub settings_path: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct PageReport<'a> {
    page: &'a str,
    successful: u32,
    failed: u32,
}

/// Loads a page raster and its extraction list, runs the replacement
/// engine, and writes the mutated raster (plus an optional JSON report).
pub fn run(config: Config) -> Result<ReplaceOutcome> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let page = image::open(&config.input)
        .with_context(|| format!("failed to open page image: {}", config.input))?;
    let extractions = load_extractions(Path::new(&config.extractions))?;

    let fonts = FontLibrary::load(&settings.primary_font, &settings.fallback_font);
    let label = config
        .page_label
        .clone()
        .unwrap_or_else(|| config.input.clone());

    // The original page stays untouched; all edits land on this copy.
    let mut working = page.to_rgba8();
    let outcome = replace_page(&mut working, &extractions, &settings, &fonts, &label);

    working
        .save(&config.output)
        .with_context(|| format!("failed to write output image: {}", config.output))?;

    if let Some(report_path) = &config.report {
        let report = PageReport {
            page: &label,
            successful: outcome.successful,
            failed: outcome.failed,
        };
        let body = serde_json::to_string_pretty(&report)
            .with_context(|| "failed to serialize report")?;
        fs::write(report_path, body)
            .with_context(|| format!("failed to write report: {report_path}"))?;
    }

    Ok(outcome)
}

fn load_extractions(path: &Path) -> Result<Vec<Extraction>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read extractions: {}", path.display()))?;
    let extractions: Vec<Extraction> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse extractions: {}", path.display()))?;
    Ok(extractions)
}
