use image::{Rgba, RgbaImage};
use manga_retext::settings::Settings;
use manga_retext::{replace_page, EraseMode, Extraction, FontLibrary, ReplaceOutcome};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn parse_extractions(json: &str) -> Vec<Extraction> {
    serde_json::from_str(json).expect("extraction json")
}

#[test]
fn replaces_a_single_extraction_on_a_page() {
    let backdrop = Rgba([180, 180, 180, 255]);
    let mut page = RgbaImage::from_pixel(800, 600, backdrop);
    let extractions = parse_extractions(
        r#"[{
            "source_text": "こんにちは",
            "translated_text": "Hello there",
            "text_box": {"x": 0.1, "y": 0.1, "width": 0.2, "height": 0.1},
            "bubble_box": null,
            "styling": {"bold": false, "italic": false}
        }]"#,
    );
    let settings = Settings {
        erase_mode: EraseMode::Flat,
        ..Settings::default()
    };

    let outcome = replace_page(&mut page, &extractions, &settings, &FontLibrary::empty(), "p1");

    assert_eq!(outcome, ReplaceOutcome { successful: 1, failed: 0 });
    // Text box lands at (80,60)-(240,120); padding of 5 then the 10%
    // expansion grow it to (58,48)-(262,132).
    assert_eq!(*page.get_pixel(58, 48), WHITE);
    assert_eq!(*page.get_pixel(261, 131), WHITE);
    assert_eq!(*page.get_pixel(150, 90), WHITE);
    assert_eq!(*page.get_pixel(57, 47), backdrop);
    assert_eq!(*page.get_pixel(262, 132), backdrop);
    assert_eq!(*page.get_pixel(400, 300), backdrop);
}

#[test]
fn bubble_miss_falls_back_to_the_text_rectangle() {
    // Uniformly dark page: segmentation cannot find a bright interior.
    let backdrop = Rgba([40, 40, 40, 255]);
    let mut page = RgbaImage::from_pixel(800, 600, backdrop);
    let extractions = parse_extractions(
        r#"[{
            "translated_text": "Hello there",
            "text_box": {"x": 0.1, "y": 0.1, "width": 0.2, "height": 0.1}
        }]"#,
    );
    let settings = Settings {
        erase_mode: EraseMode::Bubble,
        ..Settings::default()
    };

    let outcome = replace_page(&mut page, &extractions, &settings, &FontLibrary::empty(), "p1");

    assert_eq!(outcome, ReplaceOutcome { successful: 1, failed: 0 });
    // The dark-mask fallback erased the expanded text rectangle.
    assert_eq!(*page.get_pixel(150, 90), WHITE);
    assert_eq!(*page.get_pixel(400, 300), backdrop);
}

#[test]
fn segmented_bubble_is_erased_without_touching_surrounding_art() {
    let art = Rgba([40, 40, 40, 255]);
    let mut page = RgbaImage::from_pixel(200, 160, art);
    // White bubble with a dark glyph blob inside it.
    for y in 30..130 {
        for x in 40..160 {
            page.put_pixel(x, y, Rgba([250, 250, 250, 255]));
        }
    }
    for y in 70..90 {
        for x in 85..115 {
            page.put_pixel(x, y, Rgba([10, 10, 10, 255]));
        }
    }
    let extractions = parse_extractions(
        r#"[{
            "translated_text": "Hi",
            "text_box": {"x": 0.425, "y": 0.4375, "width": 0.15, "height": 0.125}
        }]"#,
    );
    let settings = Settings {
        erase_mode: EraseMode::Bubble,
        ..Settings::default()
    };

    let outcome = replace_page(&mut page, &extractions, &settings, &FontLibrary::empty(), "p1");

    assert_eq!(outcome, ReplaceOutcome { successful: 1, failed: 0 });
    // The glyph blob inside the bubble is gone.
    assert_eq!(*page.get_pixel(100, 80), WHITE);
    assert_eq!(*page.get_pixel(50, 40), WHITE);
    // Artwork outside the bubble is untouched.
    assert_eq!(*page.get_pixel(20, 20), art);
    assert_eq!(*page.get_pixel(190, 150), art);
}

#[test]
fn failures_do_not_abort_the_rest_of_the_page() {
    let backdrop = Rgba([180, 180, 180, 255]);
    let mut page = RgbaImage::from_pixel(800, 600, backdrop);
    let extractions = parse_extractions(
        r#"[
            {"translated_text": "", "text_box": {"x": 0.1, "y": 0.1, "width": 0.2, "height": 0.1}},
            {"translated_text": "Still here"},
            {"translated_text": "Hello", "text_box": {"x": 0.5, "y": 0.5, "width": 0.2, "height": 0.1}}
        ]"#,
    );
    let settings = Settings {
        erase_mode: EraseMode::Flat,
        ..Settings::default()
    };

    let outcome = replace_page(&mut page, &extractions, &settings, &FontLibrary::empty(), "p1");

    assert_eq!(outcome, ReplaceOutcome { successful: 1, failed: 2 });
    // Only the valid third extraction's rectangle was erased.
    assert_eq!(*page.get_pixel(150, 90), backdrop);
    assert_eq!(*page.get_pixel(450, 330), WHITE);
}

#[test]
fn run_writes_output_and_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("page.png");
    let extractions = dir.path().join("extractions.json");
    let output = dir.path().join("page_out.png");
    let report = dir.path().join("report.json");

    let page = RgbaImage::from_pixel(120, 90, Rgba([200, 200, 200, 255]));
    page.save(&input).expect("save input");
    std::fs::write(
        &extractions,
        r#"[{
            "source_text": "こんにちは",
            "translated_text": "",
            "text_box": {"x": 0.2, "y": 0.2, "width": 0.3, "height": 0.2}
        }]"#,
    )
    .expect("write extractions");

    let outcome = manga_retext::run(manga_retext::Config {
        input: input.to_string_lossy().into_owned(),
        extractions: extractions.to_string_lossy().into_owned(),
        output: output.to_string_lossy().into_owned(),
        report: Some(report.to_string_lossy().into_owned()),
        page_label: Some("p7".to_string()),
        settings_path: None,
    })
    .expect("run");

    assert_eq!(outcome, ReplaceOutcome { successful: 0, failed: 1 });

    // The empty translation left the raster untouched.
    let written = image::open(&output).expect("open output").to_rgba8();
    assert_eq!(written.as_raw(), page.as_raw());

    let body = std::fs::read_to_string(&report).expect("read report");
    insta::assert_snapshot!(body, @r###"
    {
      "page": "p7",
      "successful": 0,
      "failed": 1
    }
    "###);
}
