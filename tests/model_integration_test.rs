//! Integration tests for the entity graph: delete cascades, orphan
//! sweeping, handle validity, and rescale composition.

use approx::assert_relative_eq;
use caddy_iges::{EntityKind, Model, Point3, Vector3};
use tempfile::tempdir;

/// Build the §trimmed-surface triangle: a 144 referencing a 120 and, via its
/// outer boundary, a 142 that also references the 120.
fn build_trimmed_surface_model() -> (Model, caddy_iges::EntityHandle, caddy_iges::EntityId, caddy_iges::EntityId) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut model = Model::new();
    let revolution = model.new_entity(120);
    let cos = model.new_entity(142);
    let trimmed = model.new_entity(144);
    let revolution_id = revolution.id().unwrap();
    let cos_id = cos.id().unwrap();
    let trimmed_id = trimmed.id().unwrap();

    model.set_surface(trimmed_id, revolution_id).unwrap();
    model.set_surface(cos_id, revolution_id).unwrap();
    model.set_outer_boundary(trimmed_id, cos_id).unwrap();
    (model, revolution, cos_id, trimmed_id)
}

#[test]
fn test_delete_cascade_clears_surface_pointers() {
    let (mut model, revolution, cos_id, trimmed_id) = build_trimmed_surface_model();

    model.delete_entity(&revolution).unwrap();
    assert!(!revolution.is_valid());

    match model.get(trimmed_id).unwrap().typed().unwrap() {
        EntityKind::TrimmedSurface(trim) => assert!(trim.surface.is_null()),
        _ => panic!("expected a trimmed surface"),
    }
    match model.get(cos_id).unwrap().typed().unwrap() {
        EntityKind::CurveOnSurface(cos) => assert!(cos.surface.is_null()),
        _ => panic!("expected a curve on surface"),
    }

    // Both lost a required child and enter the orphan set.
    assert!(model.get(trimmed_id).unwrap().is_orphaned());
    assert!(model.get(cos_id).unwrap().is_orphaned());
}

#[test]
fn test_orphan_sweep_runs_before_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("swept.igs");

    let (mut model, revolution, _, _) = build_trimmed_surface_model();
    model.delete_entity(&revolution).unwrap();
    model.write(&path, false).unwrap();

    // The sweep cascaded through the whole dependent cluster.
    assert_eq!(model.entity_count(), 0);
    assert!(model.entities().all(|e| !e.is_orphaned()));

    let mut reloaded = Model::new();
    reloaded.read(&path).unwrap();
    assert_eq!(reloaded.entity_count(), 0);
}

#[test]
fn test_mirrored_references_have_no_duplicates() {
    let (model, revolution, cos_id, trimmed_id) = build_trimmed_surface_model();
    let revolution_id = revolution.id().unwrap();

    // Forward pointers are mirrored exactly once in the target's refs.
    let surface_refs = model.get(revolution_id).unwrap().refs();
    assert!(surface_refs.contains(&cos_id));
    assert!(surface_refs.contains(&trimmed_id));
    assert_eq!(surface_refs.len(), 2);

    let cos_refs = model.get(cos_id).unwrap().refs();
    assert_eq!(cos_refs, &[trimmed_id]);
    assert!(model.get(trimmed_id).unwrap().refs().is_empty());
}

#[test]
fn test_read_replaces_model_and_revokes_handles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("replacement.igs");

    let mut source = Model::new();
    source.new_entity(110);
    source.write(&path, false).unwrap();

    let mut model = Model::new();
    let stale = model.new_entity(124);
    model.read(&path).unwrap();

    assert!(!stale.is_valid(), "read replaces all prior entities");
    assert!(model.delete_entity(&stale).is_err());
    assert_eq!(model.entity_count(), 1);
}

#[test]
fn test_failed_read_leaves_model_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.igs");
    std::fs::write(&path, "this is not an IGES file\n").unwrap();

    let mut model = Model::new();
    model.new_entity(110);
    assert!(model.read(&path).is_err());
    assert_eq!(model.entity_count(), 0);
}

#[test]
fn test_rescale_composes_multiplicatively() {
    let mut model = Model::new();
    let handle = model.new_entity(408);

    match model.entity_mut(&handle).unwrap().typed_mut().unwrap() {
        EntityKind::SubfigureInstance(inst) => {
            inst.offset = Vector3::new(1.0, -2.0, 3.0);
        }
        _ => unreachable!(),
    }

    let entity = model.entity_mut(&handle).unwrap();
    entity.rescale(2.0);
    entity.rescale(3.0);
    match entity.typed().unwrap() {
        EntityKind::SubfigureInstance(inst) => {
            assert_relative_eq!(inst.offset, Vector3::new(6.0, -12.0, 18.0));
            assert_relative_eq!(inst.scale, 1.0);
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_composed_transform_walks_parent_chain() {
    let mut model = Model::new();
    let parent = model.new_entity(124);
    let child = model.new_entity(124);
    let parent_id = parent.id().unwrap();
    let child_id = child.id().unwrap();

    match model.entity_mut(&parent).unwrap().typed_mut().unwrap() {
        EntityKind::TransformationMatrix(t) => t.translation = Vector3::new(0.0, 0.0, 5.0),
        _ => unreachable!(),
    }
    match model.entity_mut(&child).unwrap().typed_mut().unwrap() {
        EntityKind::TransformationMatrix(t) => t.translation = Vector3::new(1.0, 0.0, 0.0),
        _ => unreachable!(),
    }
    model.set_transform(child_id, parent_id).unwrap();

    let (_, translation) = model.composed_transform(child_id).unwrap();
    assert_relative_eq!(translation, Vector3::new(1.0, 0.0, 5.0));
}

#[test]
fn test_subfigure_instance_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("subfigure.igs");

    let mut model = Model::new();
    let definition = model.new_entity(308).id().unwrap();
    let line = model.new_entity(110);
    let line_id = line.id().unwrap();
    match model.entity_mut(&line).unwrap().typed_mut().unwrap() {
        EntityKind::Line(l) => l.end = Point3::new(0.0, 5.0, 0.0),
        _ => unreachable!(),
    }
    let instance = model.new_entity(408).id().unwrap();

    {
        let handle = model.handle(definition).unwrap();
        match model.entity_mut(&handle).unwrap().typed_mut().unwrap() {
            EntityKind::SubfigureDefinition(def) => def.name = "post".to_string(),
            _ => unreachable!(),
        }
    }
    model.add_member(definition, line_id).unwrap();
    model.set_definition(instance, definition).unwrap();
    {
        let handle = model.handle(instance).unwrap();
        match model.entity_mut(&handle).unwrap().typed_mut().unwrap() {
            EntityKind::SubfigureInstance(inst) => {
                inst.offset = Vector3::new(10.0, 0.0, 0.0);
                inst.scale = 2.0;
            }
            _ => unreachable!(),
        }
    }

    model.write(&path, false).unwrap();
    let mut reloaded = Model::new();
    reloaded.read(&path).unwrap();
    assert_eq!(reloaded.entity_count(), 3);

    let def_entity = reloaded
        .entities()
        .find(|e| e.type_code() == 308)
        .expect("definition survived");
    match def_entity.typed().unwrap() {
        EntityKind::SubfigureDefinition(def) => {
            assert_eq!(def.name, "post");
            assert_eq!(def.members.len(), 1);
        }
        _ => panic!("expected a subfigure definition"),
    }
    let inst_entity = reloaded
        .entities()
        .find(|e| e.type_code() == 408)
        .expect("instance survived");
    match inst_entity.typed().unwrap() {
        EntityKind::SubfigureInstance(inst) => {
            assert_relative_eq!(inst.offset, Vector3::new(10.0, 0.0, 0.0), epsilon = 1e-9);
            assert_relative_eq!(inst.scale, 2.0);
            assert_eq!(inst.definition.target(), Some(def_entity.id()));
        }
        _ => panic!("expected a subfigure instance"),
    }
}
