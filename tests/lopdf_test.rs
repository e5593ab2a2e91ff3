//! End-to-end tests against PDFs built in memory with lopdf.
//!
//! Every page carries a real text layer, so the OCR tools are never invoked.

use std::io::Write;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfsection::{
    extract_document, extract_file, process_bytes, DocumentSource, ExtractOptions,
    ExtractionMethod, LopdfSource, MatchSpec, PdfSection, PipelineOptions, ReformatConfig,
};

/// Text lines placed at (x, y) in PDF user space.
type PageLines<'a> = &'a [(f32, f32, &'a str)];

fn build_pdf(pages: &[PageLines]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for &(x, y, text) in lines.iter() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn two_chapter_pdf() -> Vec<u8> {
    build_pdf(&[
        &[
            (72.0, 760.0, "Chapter 1 Introduction"),
            (72.0, 745.0, "The opening chapter of the report."),
        ],
        &[
            (72.0, 760.0, "Chapter 2 Methods"),
            (72.0, 745.0, "Samples were collected weekly."),
        ],
        &[(72.0, 760.0, "Chapter 3 Results")],
    ])
}

#[test]
fn test_extract_document_reads_text_layer() {
    let data = two_chapter_pdf();
    let assembled = extract_document(&data, &ExtractOptions::default()).unwrap();

    assert_eq!(assembled.pages.len(), 3);
    assert!(assembled
        .pages
        .iter()
        .all(|p| p.method == ExtractionMethod::Direct));
    assert!(assembled.text.contains("Chapter 2 Methods"));
    assert!(assembled.text.contains("Samples were collected weekly."));

    let second = assembled.page_range(2).unwrap();
    assert!(assembled.text[second].contains("Methods"));
}

#[test]
fn test_extract_file_matches_bytes() {
    let data = two_chapter_pdf();
    let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    let from_file = extract_file(file.path(), &ExtractOptions::default()).unwrap();
    let from_bytes = extract_document(&data, &ExtractOptions::default()).unwrap();
    assert_eq!(from_file.text, from_bytes.text);
}

#[test]
fn test_layout_blocks_from_content_stream() {
    let data = build_pdf(&[&[
        (72.0, 500.0, "Closing block"),
        (72.0, 760.0, "Heading"),
        (72.0, 745.0, "body line one"),
    ]]);
    let source = LopdfSource::from_bytes(&data).unwrap();

    assert_eq!(source.page_count(), 1);
    let blocks = source.page_blocks(1).unwrap();
    assert_eq!(blocks.len(), 2);

    let text = source.page_direct_text(1, true).unwrap();
    assert_eq!(text, "Heading\nbody line one\n\nClosing block");
}

#[test]
fn test_page_out_of_range() {
    let data = two_chapter_pdf();
    let source = LopdfSource::from_bytes(&data).unwrap();
    assert!(matches!(
        source.page_text(4),
        Err(pdfsection::Error::PageOutOfRange(4, 3))
    ));
}

#[test]
fn test_process_bytes_cuts_section() {
    let data = two_chapter_pdf();
    let options = PipelineOptions::new()
        .with_start(MatchSpec::literal("Chapter 2"))
        .with_end(MatchSpec::literal("Chapter 3"))
        .with_reformat(ReformatConfig::default());

    let output = process_bytes(&data, &options).unwrap();

    let raw = output.section_raw.as_deref().unwrap();
    assert!(raw.starts_with("Chapter 2 Methods"));
    assert!(raw.contains("Samples were collected weekly."));
    assert!(!raw.contains("Chapter 3"));
    assert!(output.warnings.is_empty());
}

#[test]
fn test_builder_process_bytes() {
    let data = two_chapter_pdf();
    let pages = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = pages.clone();

    let output = PdfSection::new()
        .with_start(MatchSpec::literal("Chapter 2"))
        .with_end(MatchSpec::literal("Chapter 3"))
        .on_progress(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .process_bytes(&data)
        .unwrap();

    assert_eq!(output.pages.len(), 3);
    assert_eq!(pages.load(std::sync::atomic::Ordering::SeqCst), 3);
    let raw = output.section_raw.as_deref().unwrap();
    assert!(raw.starts_with("Chapter 2 Methods"));
    assert!(!raw.contains("Chapter 3"));
    assert!(output.full_reformatted.is_some());
}

#[test]
fn test_builder_process_file_matches_bytes() {
    let data = two_chapter_pdf();
    let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    let from_file = PdfSection::new()
        .without_reformat()
        .with_start(MatchSpec::regex(r"^Chapter 2"))
        .process_file(file.path())
        .unwrap();
    let from_bytes = PdfSection::new()
        .without_reformat()
        .with_start(MatchSpec::regex(r"^Chapter 2"))
        .process_bytes(&data)
        .unwrap();

    assert_eq!(from_file.full_text, from_bytes.full_text);
    assert_eq!(from_file.section_raw, from_bytes.section_raw);
    assert!(from_file.full_reformatted.is_none());
}
