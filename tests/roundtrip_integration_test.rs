//! End-to-end file round-trip tests for the IGES engine.
//!
//! These cover the write-then-read laws: geometry survives within the model
//! resolution, delimiter overrides propagate, unit conversion normalises to
//! millimetres, and unknown entity types round-trip byte-for-byte.

use approx::assert_relative_eq;
use caddy_iges::core::precision::file_tolerance;
use caddy_iges::{EntityKind, Model, ModelConfig, Point3, Unit};
use tempfile::tempdir;

fn build_line_model() -> (Model, caddy_iges::EntityId) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut model = Model::new();
    let handle = model.new_entity(110);
    let id = handle.id().unwrap();
    {
        let entity = model.entity_mut(&handle).unwrap();
        match entity.typed_mut().unwrap() {
            EntityKind::Line(line) => {
                line.start = Point3::new(0.0, 0.0, 0.0);
                line.end = Point3::new(1.0, 2.0, 3.0);
            }
            _ => unreachable!(),
        }
        entity.set_label("L1");
    }
    (model, id)
}

#[test]
fn test_round_trip_single_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("line.igs");

    let (mut model, _) = build_line_model();
    model.write(&path, false).unwrap();

    let mut reloaded = Model::new();
    reloaded.read(&path).unwrap();
    assert_eq!(reloaded.entity_count(), 1);

    let entity = reloaded.entities().next().unwrap();
    assert_eq!(entity.type_code(), 110);
    assert_eq!(entity.label(), "L1");
    let tolerance = file_tolerance(reloaded.min_resolution());
    match entity.typed().unwrap() {
        EntityKind::Line(line) => {
            assert_relative_eq!(line.end, Point3::new(1.0, 2.0, 3.0), epsilon = tolerance);
        }
        _ => panic!("expected a line"),
    }
}

#[test]
fn test_write_refuses_existing_destination() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("line.igs");

    let (mut model, _) = build_line_model();
    model.write(&path, false).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let err = model.write(&path, false).unwrap_err();
    assert!(matches!(
        err,
        caddy_iges::IgesError::DestinationExists(_)
    ));
    let after = std::fs::read_to_string(&path).unwrap();
    assert_eq!(before, after, "destination must stay untouched");

    model.write(&path, true).unwrap();
}

#[test]
fn test_inch_file_converts_to_millimetres_on_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inch.igs");

    let mut config = ModelConfig::default();
    config.units = Unit::Inch;
    let mut model = Model::with_config(config);
    let handle = model.new_entity(110);
    match model.entity_mut(&handle).unwrap().typed_mut().unwrap() {
        EntityKind::Line(line) => {
            line.end = Point3::new(1.0, 0.0, 0.0);
        }
        _ => unreachable!(),
    }
    model.write(&path, false).unwrap();

    let mut reloaded = Model::new();
    reloaded.read(&path).unwrap();
    assert_eq!(reloaded.units(), Unit::Millimeter);
    match reloaded.entities().next().unwrap().typed().unwrap() {
        EntityKind::Line(line) => {
            assert_relative_eq!(line.end.x, 25.4, epsilon = 1e-9);
        }
        _ => panic!("expected a line"),
    };
}

#[test]
fn test_millimetre_file_is_unchanged_by_conversion() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mm.igs");

    let (mut model, _) = build_line_model();
    model.write(&path, false).unwrap();

    let mut reloaded = Model::new();
    reloaded.read(&path).unwrap();
    match reloaded.entities().next().unwrap().typed().unwrap() {
        EntityKind::Line(line) => {
            assert_relative_eq!(line.end, Point3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        }
        _ => panic!("expected a line"),
    };
}

#[test]
fn test_composite_curve_round_trip_keeps_graph() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("composite.igs");

    let mut model = Model::new();
    let composite = model.new_entity(102);
    let composite_id = composite.id().unwrap();
    for i in 0..3 {
        let segment = model.new_entity(126);
        let segment_id = segment.id().unwrap();
        match model.entity_mut(&segment).unwrap().typed_mut().unwrap() {
            EntityKind::RationalBSplineCurve(curve) => {
                curve.upper_index = 1;
                curve.degree = 1;
                curve.polynomial = true;
                curve.knots = vec![0.0, 0.0, 1.0, 1.0];
                curve.weights = vec![1.0, 1.0];
                curve.control_points = vec![
                    Point3::new(i as f64, 0.0, 0.0),
                    Point3::new(i as f64 + 1.0, 0.0, 0.0),
                ];
                curve.v1 = 1.0;
            }
            _ => unreachable!(),
        }
        model.add_segment(composite_id, segment_id).unwrap();
    }
    model.write(&path, false).unwrap();

    let mut reloaded = Model::new();
    reloaded.read(&path).unwrap();
    assert_eq!(reloaded.entity_count(), 4);
    let counts = reloaded.count_by_type();
    assert_eq!(counts.get(&102), Some(&1));
    assert_eq!(counts.get(&126), Some(&3));

    let composite_entity = reloaded
        .entities()
        .find(|e| e.type_code() == 102)
        .expect("composite survived");
    let composite_id = composite_entity.id();
    match composite_entity.typed().unwrap() {
        EntityKind::CompositeCurve(curve) => assert_eq!(curve.segment_count(), 3),
        _ => panic!("expected a composite curve"),
    }
    for segment in reloaded.entities().filter(|e| e.type_code() == 126) {
        assert!(
            segment.refs().contains(&composite_id),
            "segment back-reference must name the composite"
        );
    }
}

#[test]
fn test_delimiter_override_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("delims.igs");

    let (mut model, _) = build_line_model();
    model.set_delimiters('/', '#').unwrap();
    model.write(&path, false).unwrap();

    let mut reloaded = Model::new();
    reloaded.read(&path).unwrap();
    let delims = reloaded.delimiters();
    assert_eq!(delims.parameter, '/');
    assert_eq!(delims.record, '#');
    match reloaded.entities().next().unwrap().typed().unwrap() {
        EntityKind::Line(line) => {
            assert_relative_eq!(line.end, Point3::new(1.0, 2.0, 3.0), epsilon = 1e-9);
        }
        _ => panic!("expected a line"),
    };
}

fn record(content: &str, letter: char, seq: u32) -> String {
    format!("{:<72}{}{:>7}", content, letter, seq)
}

#[test]
fn test_unknown_type_round_trips_byte_identical() {
    let dir = tempdir().unwrap();
    let in_path = dir.path().join("unknown.igs");
    let out_path = dir.path().join("unknown-out.igs");

    let payload = format!("{:<64}", "999,1.5,2Hab,42;");
    let de1 = format!(
        "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
        999, 1, 0, 0, 0, 0, 0, 0, "00000000"
    );
    let de2 = format!(
        "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
        999, 0, 0, 1, 0, "", "", "", 0
    );
    let text = [
        record("hand-written unknown entity", 'S', 1),
        record("1H,,1H;;", 'G', 1),
        record(&de1, 'D', 1),
        record(&de2, 'D', 2),
        record(&format!("{}{:>8}", payload, 1), 'P', 1),
        record("S      1G      1D      2P      1", 'T', 1),
    ]
    .join("\n");
    std::fs::write(&in_path, text).unwrap();

    let mut model = Model::new();
    model.read(&in_path).unwrap();
    assert_eq!(model.entity_count(), 1);
    let entity = model.entities().next().unwrap();
    assert_eq!(entity.type_code(), 999);
    match entity.typed().unwrap() {
        EntityKind::Null(null) => assert_eq!(null.raw, payload),
        _ => panic!("expected a null shell"),
    }

    model.write(&out_path, false).unwrap();
    let written = std::fs::read_to_string(&out_path).unwrap();
    let out_payload: String = written
        .lines()
        .filter(|line| line.as_bytes().get(72) == Some(&b'P'))
        .map(|line| &line[..64])
        .collect();
    assert_eq!(out_payload, payload, "unknown payload must be byte-identical");
}

#[test]
fn test_param_line_count_matches_emitted_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("count.igs");

    // A spline with enough control points to span several P records.
    let mut model = Model::new();
    let curve = model.new_entity(126);
    match model.entity_mut(&curve).unwrap().typed_mut().unwrap() {
        EntityKind::RationalBSplineCurve(spline) => {
            spline.upper_index = 9;
            spline.degree = 3;
            spline.knots = (0..14).map(|i| i as f64).collect();
            spline.weights = vec![1.0; 10];
            spline.control_points =
                (0..10).map(|i| Point3::new(i as f64, 1.5, -2.5)).collect();
            spline.v1 = 1.0;
        }
        _ => unreachable!(),
    }
    model.write(&path, false).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let p_count = written
        .lines()
        .filter(|line| line.as_bytes().get(72) == Some(&b'P'))
        .count();
    assert!(p_count > 1, "expected a multi-record parameter block");

    // DE field 14 (record 2, field 4) must equal the emitted record count.
    let de2 = written
        .lines()
        .filter(|line| line.as_bytes().get(72) == Some(&b'D'))
        .nth(1)
        .unwrap();
    let declared: usize = de2[24..32].trim().parse().unwrap();
    assert_eq!(declared, p_count);

    let mut reloaded = Model::new();
    reloaded.read(&path).unwrap();
    assert_eq!(reloaded.entity_count(), 1);
}
