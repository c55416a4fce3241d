//! Integration tests for doc2json.
//!
//! Every fixture is generated into a temporary directory, so the suite needs
//! no checked-in files and no network.
//!
//! Run with:
//!   cargo test --test conversion -- --nocapture

use doc2json::{
    estimate_tokens, process, process_bytes, process_sync, process_with_estimate,
    spawn_conversion, ConversionOptions, ConversionRequest, ConversionStatus, ConversionType,
    ConvertError, DocumentFormat, EstimatorConfig, MemoryRecordStore, ProcessedContent,
    RecordStore,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Fixtures ─────────────────────────────────────────────────────────────────

const MODES: [ConversionType; 3] = [
    ConversionType::Summary,
    ConversionType::FullContent,
    ConversionType::MetadataOnly,
];

fn options(mode: ConversionType) -> ConversionOptions {
    ConversionOptions::builder().conversion_type(mode).build()
}

fn minimal_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("Hello fixture")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Fixture Title"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn docx_with_body(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbaImage::new(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// A well-formed minimal file for `tag`.
fn fixture(tag: &str) -> Vec<u8> {
    match tag {
        "pdf" => minimal_pdf(),
        "docx" => docx_with_body(&["Heading", "Some body text."]),
        "txt" => b"first line\nsecond line\n".to_vec(),
        "md" => b"# Title\n\nBody paragraph.\n".to_vec(),
        "csv" => b"name,age\nAlice,30\nBob,25\n".to_vec(),
        "json" => br#"{"name": "doc2json", "tags": ["a", "b"]}"#.to_vec(),
        "xml" => b"<root><item id=\"1\"/><item id=\"2\"/></root>".to_vec(),
        // Every raster tag gets PNG bytes; dispatch trusts the tag.
        _ => png(4, 2),
    }
}

fn write_fixture(dir: &Path, tag: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(format!("fixture.{tag}"));
    std::fs::write(&path, bytes).unwrap();
    path
}

async fn convert(dir: &Path, tag: &str, bytes: &[u8], mode: ConversionType) -> ProcessedContent {
    let path = write_fixture(dir, tag, bytes);
    process(&path, &format!("upload.{tag}"), tag, &options(mode))
        .await
        .unwrap_or_else(|e| panic!("[{tag}/{mode}] conversion failed: {e}"))
}

// ── Envelope ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_supported_tag_produces_an_envelope() {
    let dir = tempfile::tempdir().unwrap();
    for tag in DocumentFormat::SUPPORTED_TAGS {
        for mode in MODES {
            let out = convert(dir.path(), tag, &fixture(tag), mode).await;
            assert_eq!(out.document_type, *tag);
            assert_eq!(out.filename, format!("upload.{tag}"));
            assert_eq!(out.conversion_type, mode);
            assert!(!out.metadata.is_empty(), "[{tag}/{mode}] empty metadata");
            assert!(!out.content.is_empty(), "[{tag}/{mode}] empty content");

            let v = out.to_value();
            assert!(v["metadata"].is_object());
            assert!(v["content"].is_object());
            assert!(v["processed_at"].as_str().unwrap().ends_with('Z'));
        }
    }
}

#[tokio::test]
async fn metadata_is_mode_invariant_while_content_differs() {
    let dir = tempfile::tempdir().unwrap();
    for tag in ["pdf", "docx", "txt", "md", "csv", "json", "xml", "png"] {
        // One file for all three modes so file-system dates agree.
        let path = write_fixture(dir.path(), tag, &fixture(tag));
        let run = |mode| {
            let path = path.clone();
            async move { process(&path, "same", tag, &options(mode)).await.unwrap() }
        };
        let summary = run(ConversionType::Summary).await;
        let full = run(ConversionType::FullContent).await;
        let meta = run(ConversionType::MetadataOnly).await;

        assert_eq!(summary.metadata, full.metadata, "[{tag}] summary vs full");
        assert_eq!(full.metadata, meta.metadata, "[{tag}] full vs metadata_only");
        assert_ne!(summary.content, full.content, "[{tag}] summary vs full");
        assert_ne!(full.content, meta.content, "[{tag}] full vs metadata_only");
        assert!(meta.content.contains_key("structure"), "[{tag}] no structure");
    }
}

#[tokio::test]
async fn table_and_image_flags_do_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    for tag in ["pdf", "docx", "csv", "png"] {
        let path = write_fixture(dir.path(), tag, &fixture(tag));
        for mode in MODES {
            let with_flags = |tables: bool, images: bool| {
                ConversionOptions::builder()
                    .conversion_type(mode)
                    .include_tables(tables)
                    .include_images(images)
                    .build()
            };
            let plain = process(&path, "same", tag, &with_flags(false, false))
                .await
                .unwrap();
            for (tables, images) in [(true, false), (false, true), (true, true)] {
                let flagged = process(&path, "same", tag, &with_flags(tables, images))
                    .await
                    .unwrap();
                let label = format!("[{tag} {mode} tables={tables} images={images}]");
                assert_eq!(plain.metadata, flagged.metadata, "{label} metadata");
                assert_eq!(plain.content, flagged.content, "{label} content");
            }
        }
    }
}

#[tokio::test]
async fn unsupported_tag_never_touches_the_filesystem() {
    let err = process(
        "/this/path/does/not/exist",
        "setup.exe",
        "exe",
        &ConversionOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedFormat { .. }), "got: {err}");
}

#[tokio::test]
async fn malformed_input_is_extraction_failure() {
    for (tag, bytes) in [
        ("pdf", b"%PDF-nope".to_vec()),
        ("docx", b"not a zip".to_vec()),
        ("json", b"{\"open\": ".to_vec()),
    ] {
        let err = process_bytes(&bytes, "bad", tag, &ConversionOptions::default())
            .await
            .unwrap_err();
        match err {
            ConvertError::ExtractionFailure { ref format, .. } => {
                assert_eq!(format, &tag.to_ascii_uppercase())
            }
            other => panic!("[{tag}] expected ExtractionFailure, got {other:?}"),
        }
    }
}

// ── Per-format properties ────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_reports_pages_and_info() {
    let dir = tempfile::tempdir().unwrap();
    let out = convert(dir.path(), "pdf", &minimal_pdf(), ConversionType::MetadataOnly).await;
    assert_eq!(out.metadata["page_count"], 1);
    assert_eq!(out.metadata["title"], "Fixture Title");
    assert_eq!(out.content["structure"]["type"], "PDF");

    let words = out.metadata["word_count"].as_u64().unwrap();
    assert_eq!(
        out.content["structure"]["estimated_reading_time"],
        words.div_ceil(200)
    );
}

#[tokio::test]
async fn docx_reading_time_is_ceiling_of_words_over_200() {
    let dir = tempfile::tempdir().unwrap();
    let long = vec!["word"; 401].join(" ");
    for (paragraphs, minutes) in [(vec![], 0), (vec!["just three words"], 1), (vec![long.as_str()], 3)] {
        let out = convert(
            dir.path(),
            "docx",
            &docx_with_body(&paragraphs),
            ConversionType::MetadataOnly,
        )
        .await;
        assert_eq!(out.content["structure"]["estimated_reading_time"], minutes);
    }
}

#[tokio::test]
async fn csv_summary_samples_five_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut src = String::from("a,b\n");
    for i in 0..12 {
        src.push_str(&format!("{i},row{i}\n"));
    }
    let out = convert(dir.path(), "csv", src.as_bytes(), ConversionType::Summary).await;
    assert_eq!(out.metadata["row_count"], 12);
    assert_eq!(out.metadata["headers"], json!(["a", "b"]));
    assert_eq!(out.content["sample_rows"].as_array().unwrap().len(), 5);

    let full = convert(dir.path(), "csv", src.as_bytes(), ConversionType::FullContent).await;
    assert_eq!(full.content["rows"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn csv_metadata_only_infers_column_types() {
    let dir = tempfile::tempdir().unwrap();
    let out = convert(
        dir.path(),
        "csv",
        b"name,age\nAlice,30\nBob,25\nCara,40",
        ConversionType::MetadataOnly,
    )
    .await;
    assert_eq!(
        out.content["structure"]["data_types"],
        json!({"name": "string", "age": "integer"})
    );
}

#[tokio::test]
async fn json_full_content_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let src = r#"{"b": [1, 2.5, "x", null, true], "a": {"nested": {"k": -7}}, "empty": {}}"#;
    let original: Value = serde_json::from_str(src).unwrap();
    let out = convert(dir.path(), "json", src.as_bytes(), ConversionType::FullContent).await;
    assert_eq!(out.content["data"], original);
}

#[tokio::test]
async fn image_dimensions_come_from_the_header() {
    let dir = tempfile::tempdir().unwrap();
    let out = convert(dir.path(), "png", &png(12, 5), ConversionType::Summary).await;
    assert_eq!(out.metadata["width"], 12);
    assert_eq!(out.metadata["height"], 5);
    assert_eq!(out.metadata["mime_type"], "image/png");

    // Undecodable bytes still convert; dimensions are simply absent.
    let out = convert(dir.path(), "gif", b"not really a gif", ConversionType::Summary).await;
    assert!(!out.metadata.contains_key("width"));
    assert_eq!(out.metadata["format"], "GIF");
}

// ── Estimation ───────────────────────────────────────────────────────────────

#[test]
fn estimator_is_zero_for_empty_text() {
    assert_eq!(estimate_tokens(&json!("")), 0);
    assert_eq!(estimate_tokens(&json!([])), 0);
}

#[test]
fn estimator_is_monotonic_under_repetition() {
    let mut previous = 0;
    for n in 1..50 {
        let tokens = estimate_tokens(&json!("lorem ipsum ".repeat(n)));
        assert!(tokens >= previous, "n={n}: {tokens} < {previous}");
        previous = tokens;
    }
}

#[tokio::test]
async fn estimate_uses_injected_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "txt", b"some words to estimate");
    let estimator = EstimatorConfig::builder()
        .context_window(1_000)
        .cost_per_1k_tokens(1.0)
        .build()
        .unwrap();
    let out = process_with_estimate(&path, "a.txt", "txt", &ConversionOptions::default(), &estimator)
        .await
        .unwrap();
    let tokens = out.estimate.tokens as f64;
    assert!((out.estimate.estimated_cost - tokens / 1000.0).abs() < 1e-9);
    assert!((out.estimate.context_percentage - tokens / 10.0).abs() < 1e-9);
}

// ── Blocking and background entry points ─────────────────────────────────────

#[test]
fn process_sync_outside_a_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "md", b"# Heading\n");
    let out = process_sync(&path, "readme.md", "md", &ConversionOptions::default()).unwrap();
    assert_eq!(out.document_type, "md");
}

#[tokio::test]
async fn background_jobs_record_terminal_state() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_fixture(dir.path(), "json", b"[1, 2, 3]");
    let store = Arc::new(MemoryRecordStore::new());

    let request = |path: PathBuf, tag: &str| ConversionRequest {
        path,
        filename: format!("upload.{tag}"),
        type_tag: tag.to_string(),
        options: ConversionOptions::default(),
        estimator: EstimatorConfig::default(),
    };

    let ok = spawn_conversion(store.clone(), request(good, "json")).await.unwrap();
    let bad = spawn_conversion(store.clone(), request(dir.path().join("missing.csv"), "csv"))
        .await
        .unwrap();
    let (ok_id, bad_id) = (ok.id, bad.id);
    assert_eq!(ok.wait().await, ConversionStatus::Completed);
    assert_eq!(bad.wait().await, ConversionStatus::Error);

    let ok_record = store.get(ok_id).await.unwrap().unwrap();
    let result = ok_record.result.unwrap();
    assert_eq!(result.metadata["item_count"], 3);
    assert_eq!(ok_record.token_count, Some(estimate_tokens(&result.to_value())));

    let bad_record = store.get(bad_id).await.unwrap().unwrap();
    assert!(bad_record
        .error
        .unwrap()
        .starts_with("Failed to process CSV file"));
}
