use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "manga-retext",
    version,
    about = "Replace detected text in a raster page with its translation"
)]
struct Cli {
    /// Page image to process (any format the image crate decodes)
    input: String,

    /// JSON file with the detector/translator extraction list
    #[arg(short = 'e', long = "extractions")]
    extractions: String,

    /// Where to write the mutated page image
    #[arg(short = 'o', long = "output")]
    output: String,

    /// Write a per-page JSON report here
    #[arg(long = "report")]
    report: Option<String>,

    /// Label used in log lines (defaults to the input path)
    #[arg(short = 'p', long = "page-label")]
    page_label: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    manga_retext::logging::init(cli.verbose)?;

    let outcome = manga_retext::run(manga_retext::Config {
        input: cli.input,
        extractions: cli.extractions,
        output: cli.output,
        report: cli.report,
        page_label: cli.page_label,
        settings_path: cli.read_settings,
    })?;

    println!(
        "replacements: {} successful, {} failed",
        outcome.successful, outcome.failed
    );
    Ok(())
}
