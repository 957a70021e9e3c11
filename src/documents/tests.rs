use super::*;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tempfile::TempDir;

pub(crate) fn write_pdf(path: &Path, line: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(line)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("content should encode"),
    ));
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
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("pdf should save");
}

#[test]
fn pdf_extension_matching() {
    assert!(is_pdf_path(Path::new("report.pdf")));
    assert!(is_pdf_path(Path::new("REPORT.PDF")));
    assert!(is_pdf_path(Path::new("dir/notes.Pdf")));
    assert!(!is_pdf_path(Path::new("notes.txt")));
    assert!(!is_pdf_path(Path::new("pdf")));
    assert!(!is_pdf_path(Path::new("archive.pdf.gz")));
}

#[test]
fn missing_folder_is_a_source_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let missing = temp_dir.path().join("nope");

    let err = load_folder(&missing).expect_err("missing folder should fail");
    assert!(matches!(err, ChatError::Source(_)));
}

#[test]
fn empty_folder_yields_no_text() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let loaded = load_folder(temp_dir.path()).expect("empty folder should load");
    assert!(loaded.is_empty());
    assert!(loaded.files.is_empty());
}

#[test]
fn non_pdf_files_are_ignored() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("notes.txt"), "not a pdf").expect("write should succeed");
    fs::create_dir(temp_dir.path().join("nested.pdf")).expect("mkdir should succeed");

    let files = list_pdf_files(temp_dir.path()).expect("listing should succeed");
    assert!(files.is_empty());
}

#[test]
fn pdf_files_are_listed_in_name_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    for name in ["b.pdf", "a.PDF", "c.pdf"] {
        fs::write(temp_dir.path().join(name), b"%PDF-1.5").expect("write should succeed");
    }

    let files = list_pdf_files(temp_dir.path()).expect("listing should succeed");
    let names: Vec<_> = files
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .collect();
    assert_eq!(names, vec!["a.PDF", "b.pdf", "c.pdf"]);
}

#[test]
fn text_is_extracted_from_every_pdf() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_pdf(
        &temp_dir.path().join("01-france.pdf"),
        "Paris is the capital of France.",
    );
    write_pdf(
        &temp_dir.path().join("02-italy.pdf"),
        "Rome is the capital of Italy.",
    );

    let loaded = load_folder(temp_dir.path()).expect("folder should load");
    assert_eq!(loaded.files.len(), 2);
    assert!(loaded.text.contains("Paris is the capital of France."));
    assert!(loaded.text.contains("Rome is the capital of Italy."));

    let paris = loaded.text.find("Paris").expect("Paris should be present");
    let rome = loaded.text.find("Rome").expect("Rome should be present");
    assert!(paris < rome);
}

#[test]
fn unreadable_pdf_is_a_source_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("broken.pdf"), "definitely not a pdf")
        .expect("write should succeed");

    let err = load_folder(temp_dir.path()).expect_err("broken pdf should fail");
    match err {
        ChatError::Source(detail) => assert!(detail.contains("broken.pdf")),
        other => panic!("unexpected error: {other:?}"),
    }
}
