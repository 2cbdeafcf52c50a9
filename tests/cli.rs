use assert_cmd::Command;
use lopdf::content::Content;
use lopdf::{Document, Object, Stream, dictionary};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn examscriber_cmd() -> Command {
    Command::cargo_bin("examscriber").expect("binary exists")
}

/// Writes a two-page document (A4 portrait, then a 400x300 page) into `dir`.
fn write_exam(dir: &Path) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = [(595.0, 842.0), (400.0, 300.0)]
        .iter()
        .map(|&(width, height): &(f32, f32)| {
            let content = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ],
                "Contents" => content,
                "Resources" => dictionary! {},
            })
            .into()
        })
        .collect();
    doc.set_object(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(2),
        },
    );
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);

    let path = dir.join("exam.pdf");
    doc.save(&path).unwrap();
    path
}

fn write_annotations(dir: &Path) -> PathBuf {
    let json = r##"{
        "1": [{
            "type": "stroke",
            "id": "s1",
            "tool": "pen",
            "color": "#ff0000",
            "size": 3.0,
            "opacity": 1.0,
            "points": [{"x": 50.0, "y": 60.0}, {"x": 120.0, "y": 90.0}, {"x": 200.0, "y": 95.0}]
        }],
        "9": [{
            "type": "stroke",
            "id": "s2",
            "tool": "highlighter",
            "color": "#ffff00",
            "size": 10.0,
            "opacity": 1.0,
            "points": [{"x": 0.0, "y": 0.0}, {"x": 10.0, "y": 0.0}]
        }]
    }"##;
    let path = dir.join("strokes.json");
    std::fs::write(&path, json).unwrap();
    path
}

fn page_operators(path: &Path, page: u32) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    let page_id = doc.get_pages()[&page];
    Content::decode(&doc.get_page_content(page_id).unwrap())
        .unwrap()
        .operations
        .into_iter()
        .map(|op| op.operator)
        .collect()
}

/// Points the run at a config file that does not exist, so defaults apply.
fn isolated(cmd: &mut Command, temp: &TempDir) {
    cmd.arg("--config").arg(temp.path().join("missing.toml"));
}

#[test]
fn help_prints_usage() {
    examscriber_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Burn pen, highlighter and eraser annotations into exam papers",
        ));
}

#[test]
fn export_requires_an_output() {
    examscriber_cmd()
        .args(["export", "--input", "a.pdf", "--annotations", "a.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "required arguments were not provided",
        ));
}

#[test]
fn pages_reports_document_geometry() {
    let temp = TempDir::new().unwrap();
    let exam = write_exam(temp.path());

    examscriber_cmd()
        .args(["pages", "--input"])
        .arg(&exam)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"width\": 595.0"))
        .stdout(predicate::str::contains("\"height\": 300.0"));
}

#[test]
fn vector_export_draws_onto_known_pages() {
    let temp = TempDir::new().unwrap();
    let exam = write_exam(temp.path());
    let strokes = write_annotations(temp.path());
    let output = temp.path().join("out.pdf");

    let mut cmd = examscriber_cmd();
    isolated(&mut cmd, &temp);
    cmd.arg("export")
        .arg("--input")
        .arg(&exam)
        .arg("--annotations")
        .arg(&strokes)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let ops = page_operators(&output, 1);
    assert_eq!(ops.first().map(String::as_str), Some("q"));
    assert!(ops.iter().any(|op| op == "RG"));
    assert_eq!(ops.iter().filter(|op| op.as_str() == "S").count(), 1);
    // Page 2 had no annotations.
    assert_eq!(page_operators(&output, 2), ["BT", "ET"]);
}

#[test]
fn raster_export_embeds_an_image_layer() {
    let temp = TempDir::new().unwrap();
    let exam = write_exam(temp.path());
    let strokes = write_annotations(temp.path());
    let output = temp.path().join("out.pdf");

    let mut cmd = examscriber_cmd();
    isolated(&mut cmd, &temp);
    cmd.arg("export")
        .arg("--input")
        .arg(&exam)
        .arg("--annotations")
        .arg(&strokes)
        .arg("--output")
        .arg(&output)
        .args(["--pipeline", "raster", "--raster-scale", "1"])
        .assert()
        .success();

    let ops = page_operators(&output, 1);
    assert!(ops.iter().any(|op| op == "Do"));
}

#[test]
fn export_of_garbage_fails_with_context() {
    let temp = TempDir::new().unwrap();
    let bogus = temp.path().join("bogus.pdf");
    std::fs::write(&bogus, b"not a document").unwrap();
    let strokes = write_annotations(temp.path());

    let mut cmd = examscriber_cmd();
    isolated(&mut cmd, &temp);
    cmd.arg("export")
        .arg("--input")
        .arg(&bogus)
        .arg("--annotations")
        .arg(&strokes)
        .arg("--output")
        .arg(temp.path().join("out.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}
