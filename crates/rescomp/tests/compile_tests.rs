//! End-to-end compiles against temporary project directories.
//!
//! Each test lays out a project (`appinfo.json` plus `resources/`), runs the
//! compiler with the built-in PBI encoder, and inspects the build tree.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use rescomp::codec::{BitmapEncoder, Palette, PbiEncoder};
use rescomp::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("resources")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn add_file(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.root().join("resources").join(name), bytes).unwrap();
    }

    /// A 3x2 image: top row white, bottom row black, right column clear.
    fn add_png(&self, name: &str) {
        let mut image = RgbaImage::from_pixel(3, 2, Rgba([255, 255, 255, 255]));
        for x in 0..3 {
            image.put_pixel(x, 1, Rgba([0, 0, 0, 255]));
        }
        image.put_pixel(2, 0, Rgba([0, 0, 0, 0]));
        image.put_pixel(2, 1, Rgba([0, 0, 0, 0]));
        image.save(self.root().join("resources").join(name)).unwrap();
    }

    fn compiler(&self) -> ResourceCompiler {
        ResourceCompiler::new(CompilerConfig::for_project(self.root()))
    }

    fn artifact(&self, name: &str) -> PathBuf {
        self.root()
            .join("build")
            .join("local")
            .join("resources")
            .join(name)
    }

    fn header(&self) -> String {
        std::fs::read_to_string(
            self.root()
                .join("build")
                .join("tempLocal")
                .join("src")
                .join("resource_ids.auto.h"),
        )
        .unwrap()
    }

    /// All artifact file names, sorted.
    fn artifacts(&self) -> Vec<String> {
        let dir = self.root().join("build").join("local").join("resources");
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn manifest(media: serde_json::Value) -> Vec<u8> {
    serde_json::json!({
        "uuid": "00000000-0000-0000-0000-000000000000",
        "shortName": "demo",
        "resources": { "media": media }
    })
    .to_string()
    .into_bytes()
}

fn resource_constants(header: &str) -> Vec<String> {
    header
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("RESOURCE_ID_"))
        .map(|l| l.trim_end_matches(',').to_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn mixed_manifest_assigns_sequential_slots() {
    let project = Project::new();
    project.add_file("data.bin", b"\x00\x01\x02raw");
    project.add_png("icon.png");
    project.add_png("logo.png");

    let report = project
        .compiler()
        .compile(&manifest(serde_json::json!([
            { "name": "DATA", "file": "data.bin", "type": "raw" },
            { "name": "ICON", "file": "icon.png", "type": "png-trans" },
            { "name": "LOGO", "file": "logo.png", "type": "png" },
        ])))
        .unwrap();

    assert_eq!(report.resources, 3);
    assert_eq!(report.slots, 4);
    assert_eq!(report.files_written, 4);
    assert_eq!(project.artifacts(), vec!["0", "1", "2", "3"]);

    assert_eq!(
        resource_constants(&project.header()),
        vec![
            "RESOURCE_ID_DATA = 1",
            "RESOURCE_ID_ICON_WHITE",
            "RESOURCE_ID_ICON_BLACK",
            "RESOURCE_ID_LOGO",
        ]
    );
}

#[test]
fn png_trans_planes_match_the_encoder() {
    let project = Project::new();
    project.add_png("icon.png");

    project
        .compiler()
        .compile(&manifest(serde_json::json!([
            { "name": "ICON", "file": "icon.png", "type": "png-trans" },
        ])))
        .unwrap();

    let source = project.root().join("resources").join("icon.png");
    let encoder = PbiEncoder::default();
    for (slot, palette) in [("0", Palette::White), ("1", Palette::Black)] {
        let expected = encoder.encode(&source, palette).unwrap();
        let mut bytes = expected.header.clone();
        bytes.extend_from_slice(&expected.bits);
        assert_eq!(std::fs::read(project.artifact(slot)).unwrap(), bytes);
    }

    // Cropped to the opaque 2x2 area; white plane has the top row set.
    let white = std::fs::read(project.artifact("0")).unwrap();
    assert_eq!(&white[8..12], &[2, 0, 2, 0]);
    assert_eq!(&white[12..16], &[0b11, 0, 0, 0]);
    assert_eq!(&white[16..20], &[0, 0, 0, 0]);
    let black = std::fs::read(project.artifact("1")).unwrap();
    assert_eq!(&black[12..16], &[0, 0, 0, 0]);
    assert_eq!(&black[16..20], &[0b11, 0, 0, 0]);
}

#[test]
fn raw_output_equals_source() {
    let project = Project::new();
    let payload: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
    project.add_file("blob.bin", &payload);

    project
        .compiler()
        .compile(&manifest(serde_json::json!([
            { "name": "BLOB", "file": "blob.bin", "type": "raw" },
        ])))
        .unwrap();

    assert_eq!(std::fs::read(project.artifact("0")).unwrap(), payload);
}

#[test]
fn font_writes_data_and_size_under_one_slot() {
    let project = Project::new();
    project.add_file("arial.ttf", b"font bytes");
    project.add_file("x.bin", b"x");

    let report = project
        .compiler()
        .compile(&manifest(serde_json::json!([
            { "name": "Arial21", "file": "arial.ttf", "type": "font" },
            { "name": "X", "file": "x.bin", "type": "raw" },
        ])))
        .unwrap();

    assert_eq!(report.slots, 2);
    assert_eq!(project.artifacts(), vec!["0", "0_f", "1"]);
    assert_eq!(std::fs::read(project.artifact("0_f")).unwrap(), b"font bytes");
    assert_eq!(
        std::fs::read(project.artifact("0")).unwrap(),
        21i32.to_ne_bytes()
    );
    assert_eq!(
        resource_constants(&project.header()),
        vec!["RESOURCE_ID_Arial21 = 1", "RESOURCE_ID_X"]
    );
}

#[test]
fn font_without_size_fails_before_any_artifact() {
    let project = Project::new();
    project.add_file("a.bin", b"a");
    project.add_file("arial.ttf", b"font");

    let err = project
        .compiler()
        .compile(&manifest(serde_json::json!([
            { "name": "A", "file": "a.bin", "type": "raw" },
            { "name": "Arial", "file": "arial.ttf", "type": "font" },
        ])))
        .unwrap_err();

    assert_eq!(err.status().code(), 2);
    assert!(matches!(
        err.source,
        ResourceError::InvalidFontName { entry: 1, .. }
    ));
    assert!(project.artifacts().is_empty());
}

#[test]
fn overlong_name_is_rejected_before_io() {
    let project = Project::new();
    project.add_file("a.bin", b"a");

    let err = project
        .compiler()
        .compile(&manifest(serde_json::json!([
            { "name": "A", "file": "a.bin", "type": "raw" },
            { "name": "B".repeat(64), "file": "a.bin", "type": "raw" },
        ])))
        .unwrap_err();

    assert_eq!(err.phase, CompilePhase::ResourceMap);
    assert!(matches!(err.source, ResourceError::FieldTooLong { .. }));
    assert!(project.artifacts().is_empty());
}

#[test]
fn missing_media_leaves_only_empty_directories() {
    let project = Project::new();
    let status = project
        .compiler()
        .run(br#"{ "resources": { "other": [] } }"#);

    assert_eq!(status.code(), 2);
    assert!(project.artifacts().is_empty());
    let header_dir = project.root().join("build").join("tempLocal").join("src");
    assert!(header_dir.is_dir());
    assert_eq!(std::fs::read_dir(header_dir).unwrap().count(), 0);
}

#[test]
fn malformed_manifest_is_status_two() {
    let project = Project::new();
    let status = project.compiler().run(b"{ not json");
    assert_eq!(status, CompileStatus::ResourceMapFailed);
}

#[test]
fn missing_bitmap_source_is_a_codec_error() {
    let project = Project::new();
    let err = project
        .compiler()
        .compile(&manifest(serde_json::json!([
            { "name": "GONE", "file": "gone.png", "type": "png" },
        ])))
        .unwrap_err();
    assert_eq!(err.status().code(), 2);
    assert!(matches!(err.source, ResourceError::Codec { .. }));
}

#[test]
fn compiling_twice_is_idempotent() {
    let project = Project::new();
    project.add_file("data.bin", b"payload");
    project.add_file("font.ttf", b"ttf");
    project.add_png("icon.png");
    let manifest = manifest(serde_json::json!([
        { "name": "DATA", "file": "data.bin", "type": "raw" },
        { "name": "ICON", "file": "icon.png", "type": "png-trans" },
        { "name": "FONT_14", "file": "font.ttf", "type": "font" },
    ]));

    let compiler = project.compiler();
    assert_eq!(compiler.run(&manifest), CompileStatus::Success);
    let first: Vec<(String, Vec<u8>)> = project
        .artifacts()
        .into_iter()
        .map(|n| {
            let bytes = std::fs::read(project.artifact(&n)).unwrap();
            (n, bytes)
        })
        .collect();
    let first_header = project.header();

    assert_eq!(compiler.run(&manifest), CompileStatus::Success);
    let second: Vec<(String, Vec<u8>)> = project
        .artifacts()
        .into_iter()
        .map(|n| {
            let bytes = std::fs::read(project.artifact(&n)).unwrap();
            (n, bytes)
        })
        .collect();

    assert_eq!(first, second);
    assert_eq!(first_header, project.header());
}

#[test]
fn separate_output_directory_is_honoured() {
    let project = Project::new();
    project.add_file("a.bin", b"a");
    let out = tempfile::tempdir().unwrap();

    let config = CompilerConfig {
        output_dir: out.path().to_path_buf(),
        header: HeaderOptions {
            first_resource_id: 0,
            ..Default::default()
        },
        ..CompilerConfig::for_project(project.root())
    };
    ResourceCompiler::new(config)
        .compile(&manifest(serde_json::json!([
            { "name": "A", "file": "a.bin", "type": "raw" },
        ])))
        .unwrap();

    assert!(out.path().join("build/local/resources/0").is_file());
    assert!(!project.root().join("build").exists());
    let header =
        std::fs::read_to_string(out.path().join("build/tempLocal/src/resource_ids.auto.h"))
            .unwrap();
    assert!(header.contains("\tRESOURCE_ID_A = 0,"));
}
