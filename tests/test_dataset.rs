mod common;

use blm_annotator::annotation::{BallFields, ClubFields};
use blm_annotator::{DatasetVersion, RoiTable, TrainingManifest, TrainingPool};
use common::*;

fn ball(hla: &str) -> BallFields {
    BallFields {
        hla_direction: hla.to_string(),
        spin_axis_direction: "R".to_string(),
        ball_speed_units: "mph".to_string(),
        carry_units: "yds".to_string(),
    }
}

fn club(path: &str) -> ClubFields {
    ClubFields {
        path_direction: path.to_string(),
        aoa_direction: "Up".to_string(),
        club_speed_units: "mph".to_string(),
    }
}

fn ball_record(filename: &str, hla: &str) -> AnnotationRecord {
    AnnotationRecord::new(filename, ScreenFields::Ball(ball(hla)))
}

#[test]
fn test_upsert_replaces_whole_record() {
    let mut set = AnnotationSet::new();
    set.upsert(ball_record("a.png", "L"));
    set.upsert(ball_record("b.png", "L"));
    set.upsert(AnnotationRecord::new("a.png", ScreenFields::Club(club("In-Out"))));

    assert_eq!(set.len(), 2);
    let a = set.get("a.png").unwrap();
    assert_eq!(a.screen(), ScreenType::Club);
    assert_eq!(a.field(FieldKey::HlaDirection), None);
    // Replaced records move to the end
    let order: Vec<&str> = set.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(order, vec!["b.png", "a.png"]);
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("annotations.json");
    let set = AnnotationSet::from_records(vec![
        ball_record("a.png", "L"),
        AnnotationRecord::new("b.png", ScreenFields::Both(ball("R"), club("Out-In"))),
        AnnotationRecord::new("c.png", ScreenFields::None),
    ]);

    set.save(&path).unwrap();

    assert_eq!(AnnotationSet::load_strict(&path).unwrap(), set);
    assert_eq!(AnnotationSet::load_lenient(&path), set);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.ends_with("]\n"));
}

#[test]
fn test_missing_file_strict_vs_lenient() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("annotations.json");

    assert!(AnnotationSet::load_lenient(&path).is_empty());
    assert!(matches!(AnnotationSet::load_strict(&path), Err(Error::Io(_))));
}

#[test]
fn test_malformed_file_strict_vs_lenient() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("annotations.json");
    std::fs::write(&path, b"[{\"filename\": \"a.png\", \"screen\": ").unwrap();

    assert!(AnnotationSet::load_lenient(&path).is_empty());
    assert!(matches!(
        AnnotationSet::load_strict(&path),
        Err(Error::MalformedAnnotationFile { .. })
    ));
}

#[test]
fn test_record_fields_must_match_screen() {
    let cases = [
        // Ball screen carrying a club field group
        r#"{"filename": "a.png", "screen": "Ball", "hla-direction": "L", "spin-axis-direction": "R",
            "ball-speed-units": "mph", "carry-units": "yds", "path-direction": "In-Out",
            "aoa-direction": "Up", "club-speed-units": "mph"}"#,
        // Both screen with only ball fields
        r#"{"filename": "a.png", "screen": "Both", "hla-direction": "L", "spin-axis-direction": "R",
            "ball-speed-units": "mph", "carry-units": "yds"}"#,
        // None screen with ball fields
        r#"{"filename": "a.png", "screen": "None", "hla-direction": "L", "spin-axis-direction": "R",
            "ball-speed-units": "mph", "carry-units": "yds"}"#,
        // Club screen with nothing
        r#"{"filename": "a.png", "screen": "Club"}"#,
        // Ball screen with a stray club key
        r#"{"filename": "a.png", "screen": "Ball", "hla-direction": "L", "spin-axis-direction": "R",
            "ball-speed-units": "mph", "carry-units": "yds", "path-direction": "In-Out"}"#,
        // Ball screen missing one ball key
        r#"{"filename": "a.png", "screen": "Ball", "hla-direction": "L", "spin-axis-direction": "R",
            "ball-speed-units": "mph"}"#,
        // Unknown key
        r#"{"filename": "a.png", "screen": "None", "carry": "yds"}"#,
    ];

    for json in cases {
        let result: Result<AnnotationRecord, _> = serde_json::from_str(json);
        assert!(result.is_err(), "should reject {}", json);
    }
}

#[test]
fn test_ball_only_both_record_explains_repair() {
    let json = r#"{"filename": "old.png", "screen": "Both", "hla-direction": "L",
        "spin-axis-direction": "R", "ball-speed-units": "mph", "carry-units": "yds"}"#;

    let message = serde_json::from_str::<AnnotationRecord>(json).unwrap_err().to_string();
    assert!(message.contains("old.png"), "{}", message);
    assert!(message.contains("no club fields"), "{}", message);
    assert!(message.contains("re-run `annotate`"), "{}", message);
}

#[test]
fn test_version_lineage() {
    let version: DatasetVersion = "v2".parse().unwrap();
    assert_eq!(
        version.lineage(),
        vec![DatasetVersion(2), DatasetVersion(1), DatasetVersion(0)]
    );
    assert!(matches!("2".parse::<DatasetVersion>(), Err(Error::InvalidVersion(_))));
}

#[test]
fn test_pool_gathers_lineage_in_order() {
    let root = tempfile::TempDir::new().unwrap();
    write_version(
        root.path(),
        "v1",
        &["n1.png", "n2.png"],
        vec![
            ball_record("n1.png", "R"),
            AnnotationRecord::new("n2.png", ScreenFields::Club(club("In-Out"))),
        ],
    );
    write_version(
        root.path(),
        "v0",
        &["o1.png"],
        vec![ball_record("o1.png", "L"), ball_record("deleted.png", "L")],
    );

    let pool = TrainingPool::gather(root.path(), DatasetVersion(1), FieldKey::HlaDirection).unwrap();

    assert_eq!(pool.class_labels, vec!["R", "None", "L"]);
    let samples: Vec<(String, usize)> = pool
        .samples
        .iter()
        .map(|s| (s.path.file_name().unwrap().to_string_lossy().into_owned(), s.label_index))
        .collect();
    assert_eq!(
        samples,
        vec![
            ("n1.png".to_string(), 0),
            ("n2.png".to_string(), 1),
            ("o1.png".to_string(), 2),
        ]
    );
}

#[test]
fn test_pool_requires_every_version() {
    let root = tempfile::TempDir::new().unwrap();
    write_version(root.path(), "v1", &["a.png"], vec![ball_record("a.png", "L")]);

    let result = TrainingPool::gather(root.path(), DatasetVersion(1), FieldKey::HlaDirection);
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_manifest_covers_every_field() {
    let root = tempfile::TempDir::new().unwrap();
    write_version(root.path(), "v0", &["a.png"], vec![ball_record("a.png", "L")]);

    let rois_path = root.path().join("rois.json");
    std::fs::write(
        &rois_path,
        br#"[{"name": "hla-direction", "rect": [0.1, 0.2, 0.05, 0.1], "format": ["L", "R"]}]"#,
    )
    .unwrap();
    let rois = RoiTable::load(&[&rois_path]).unwrap();

    let manifest = TrainingManifest::build(root.path(), DatasetVersion(0), &rois, (64, 32)).unwrap();

    assert_eq!(manifest.lineage, vec!["v0"]);
    assert_eq!(manifest.fields.len(), 7);
    let hla = &manifest.fields[0];
    assert_eq!(hla.key_name, "hla-direction");
    assert_eq!(hla.roi, FractionalRoi::new(0.1, 0.2, 0.05, 0.1).unwrap());
    assert_eq!(hla.pool.class_labels, vec!["L"]);
    let path_field = manifest.fields.iter().find(|f| f.key_name == "path-direction").unwrap();
    assert_eq!(path_field.roi, FractionalRoi::FULL_FRAME);
    assert_eq!(path_field.pool.class_labels, vec!["None"]);

    let out = root.path().join("manifest.json");
    manifest.save(&out).unwrap();
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["dataset_version"], "v0");
    assert_eq!(value["fields"][0]["image_size"], serde_json::json!([64, 32]));
    assert_eq!(value["fields"][0]["samples"][0]["label_index"], 0);
}
