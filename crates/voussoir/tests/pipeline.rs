use nalgebra::Point2;
use std::path::Path;
use voussoir::core::{Homography, Image};
use voussoir::glyph::synth::SpreadScene;
use voussoir::glyph::CandidateParams;
use voussoir::{
    load_image, DetectorParams, EdgeOffsets, Glyph, PageRenderer, PageSide, PageSpec,
    RenderRequest, SideOutcome, SideRequest,
};

fn camera() -> Homography {
    Homography::from_array([
        [70.0, 3.0, 60.0],
        [-2.0, 68.0, 50.0],
        [0.004, 0.006, 1.0],
    ])
}

fn renderer() -> PageRenderer {
    PageRenderer::new(DetectorParams {
        candidates: CandidateParams {
            max_area_frac: 0.01,
            ..CandidateParams::default()
        },
        ..DetectorParams::default()
    })
}

fn photo(scene: &SpreadScene) -> Image {
    scene.render(&camera(), 1100, 800, 3).expect("camera is invertible")
}

fn request(dir: &Path, left: bool, right: bool) -> RenderRequest {
    let side = |name: &str| SideRequest {
        output: dir.join(name),
        offsets: EdgeOffsets::default(),
    };
    RenderRequest {
        page: PageSpec::new(6.0, 9.5, 40.0).unwrap(),
        left: left.then(|| side("left.png")),
        right: right.then(|| side("right.jpg")),
        overwrite: false,
    }
}

#[test]
fn writes_both_pages_with_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let scene = SpreadScene {
        dark_boxes: vec![[2.5, 4.5, 3.5, 5.5]],
        ..SpreadScene::default()
    };
    let report = renderer().render(&photo(&scene), &request(dir.path(), true, true));

    assert!(report.succeeded());
    assert_eq!(report.detections.len(), 8);
    assert_eq!(report.failures().count(), 0);
    for side in PageSide::BOTH {
        match report.side(side) {
            SideOutcome::Written { width, height, .. } => assert_eq!((*width, *height), (240, 380)),
            other => panic!("{side}: {other:?}"),
        }
    }

    let left = load_image(dir.path().join("left.png")).unwrap();
    assert_eq!((left.width, left.height, left.channels), (240, 380, 3));
    assert!(left.pixel(100, 180)[0] < 100);
    assert!(left.pixel(40, 300)[0] > 180);

    let right = load_image(dir.path().join("right.jpg")).unwrap();
    assert_eq!((right.width, right.height), (240, 380));
}

#[test]
fn disabled_right_page_is_neither_written_nor_failed() {
    let dir = tempfile::tempdir().unwrap();
    let report = renderer().render(
        &photo(&SpreadScene::default()),
        &request(dir.path(), true, false),
    );
    assert!(report.succeeded());
    assert!(report.left.is_written());
    assert!(matches!(report.right, SideOutcome::NotRequested));
    assert!(!dir.path().join("right.jpg").exists());
}

#[test]
fn duplicate_and_missing_glyphs_fail_both_pages_with_their_ids() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = SpreadScene {
        omit: PageSide::Right.glyphs().to_vec(),
        ..SpreadScene::default()
    };
    scene.extra.push((Glyph::LeftBottomRight, Point2::new(3.5, 7.0)));

    let report = renderer().render(&photo(&scene), &request(dir.path(), true, true));
    assert!(!report.succeeded());

    let causes: Vec<String> = report.failures().map(|e| e.to_string()).collect();
    assert_eq!(causes.len(), 2, "{causes:?}");
    assert!(causes[0].starts_with("left page"));
    assert!(causes[0].contains("glyph 2 detected 2 times"));
    assert!(causes[1].starts_with("right page"));
    assert!(causes[1].contains("missing glyph(s) 4, 5, 6, 7"));
    assert!(!dir.path().join("left.png").exists());
    assert!(!dir.path().join("right.jpg").exists());
}

#[test]
fn report_serialises_detections_and_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let scene = SpreadScene {
        omit: vec![Glyph::RightTopLeft],
        ..SpreadScene::default()
    };
    let report = renderer().render(&photo(&scene), &request(dir.path(), true, true));
    assert!(report.succeeded());

    let path = dir.path().join("report.json");
    report.write_json(&path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(json["detections"].as_array().unwrap().len(), 7);
    assert_eq!(json["left"]["status"], "written");
    assert_eq!(json["left"]["detail"]["width"], 240);
    assert_eq!(json["right"]["status"], "failed");
    assert_eq!(json["right"]["detail"], "right page: missing glyph(s) 4");
}
