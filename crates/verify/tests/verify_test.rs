use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as LoDocument, Object, Stream};
use rmhf_core::{ErrorKind, Margins};
use rmhf_pdf::redact_file;
use rmhf_verify::{verify_output, VerifyOptions};

/// One "Heading" line near the top of every page.
fn write_pdf(dir: &Path, name: &str, sizes: &[(i64, i64)]) -> PathBuf {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for &(width, height) in sizes {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![40.into(), (height - 30).into()]),
                Operation::new("Tj", vec![Object::string_literal("Heading")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => sizes.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

#[test]
fn test_redacted_output_passes() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "a4.pdf", &[(595, 842), (595, 842)]);
    let margins = Margins::new(60.0, 60.0).unwrap();
    let outcome = redact_file(&input, margins).unwrap();

    let options = VerifyOptions {
        text_search: Some(margins),
        ..VerifyOptions::default()
    };
    let result = verify_output(&input, &outcome.output_path, &options).unwrap();
    assert!(result.ok, "{:?}", result.warnings);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_unredacted_text_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "copy.pdf", &[(612, 792)]);

    let options = VerifyOptions {
        text_search: Some(Margins::new(60.0, 0.0).unwrap()),
        ..VerifyOptions::default()
    };
    let result = verify_output(&input, &input, &options).unwrap();
    assert!(!result.ok);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("glyph"));
}

#[test]
fn test_page_count_mismatch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let one = write_pdf(dir.path(), "one.pdf", &[(612, 792)]);
    let two = write_pdf(dir.path(), "two.pdf", &[(612, 792), (612, 792)]);

    let result = verify_output(&one, &two, &VerifyOptions::default()).unwrap();
    assert!(!result.ok);
    assert!(result.warnings[0].contains("page count"));
}

#[test]
fn test_page_size_mismatch_fails() {
    let dir = tempfile::tempdir().unwrap();
    let letter = write_pdf(dir.path(), "letter.pdf", &[(612, 792)]);
    let a4 = write_pdf(dir.path(), "a4.pdf", &[(595, 842)]);

    let result = verify_output(&letter, &a4, &VerifyOptions::default()).unwrap();
    assert!(!result.ok);
    assert!(result.warnings[0].contains("size changed"));
}

#[test]
fn test_missing_output_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "in.pdf", &[(612, 792)]);
    let err = verify_output(&input, &dir.path().join("out.pdf"), &VerifyOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}
