// CADDY - Enterprise CAD System
// IGES Engine - Reference Resolver

//! Two-pass entity loading.
//!
//! The shell pass turns DE record pairs into allocated entities with raw
//! pointer fields. The content pass slices each entity's parameter block and
//! parses it, then the associate pass binds every recorded pointer against
//! the DE-sequence index and mirrors back-references. A final pass detects
//! reference cycles through owning edges and clears the closing edge of
//! each.

use std::collections::HashMap;

use crate::codec::global::GlobalSection;
use crate::entity::{DirectoryEntry, Entity, EntityId, EntityKind, NullEntity, ResolveCtx};
use crate::error::{IgesError, IgesResult};
use crate::model::registry;

/// Shell pass: allocate one entity per DE record pair.
pub(crate) fn shell_pass(directory: &[String]) -> IgesResult<Vec<Entity>> {
    if directory.len() % 2 != 0 {
        return Err(IgesError::Directory {
            sequence: directory.len() as u32,
            message: "directory section has an odd record count".to_string(),
        });
    }

    let mut entities = Vec::with_capacity(directory.len() / 2);
    for (index, pair) in directory.chunks(2).enumerate() {
        let sequence = (index * 2 + 1) as u32;
        let de = DirectoryEntry::parse(&pair[0], &pair[1], sequence)?;
        let id = EntityId(index as u32);

        if registry::valid_form(de.entity_type, de.form) {
            let kind = registry::construct(de.entity_type);
            entities.push(Entity::new(id, de, kind));
        } else {
            // Invalid form: fatal for this entity only. A null shell keeps
            // the raw parameter data so the file still round-trips.
            log::warn!(
                "entity type {} at DE {} has invalid form {}; keeping an untyped shell",
                de.entity_type,
                sequence,
                de.form
            );
            let shell = EntityKind::Null(NullEntity::new(de.entity_type));
            let mut entity = Entity::new(id, de, shell);
            entity.set_degenerate();
            entities.push(entity);
        }
    }
    Ok(entities)
}

/// Content pass: slice each entity's parameter block and parse it.
pub(crate) fn content_pass(
    entities: &mut [Entity],
    parameter: &[String],
    global: &GlobalSection,
) -> IgesResult<()> {
    for entity in entities.iter_mut() {
        let start = entity.de.parameter_data;
        let count = entity.de.param_line_count;
        if start == 0 || count == 0 {
            return Err(IgesError::Directory {
                sequence: start,
                message: "entity has no parameter block".to_string(),
            });
        }
        let begin = (start - 1) as usize;
        let end = begin + count as usize;
        if end > parameter.len() {
            return Err(IgesError::Directory {
                sequence: start,
                message: format!(
                    "parameter block {}..{} runs past the P section ({} records)",
                    start,
                    end,
                    parameter.len()
                ),
            });
        }

        // Parameter payload occupies columns 1-64; columns 65-72 echo the
        // owning DE sequence and are not part of the payload.
        let payload: String = parameter[begin..end]
            .iter()
            .map(|record| &record[..64])
            .collect();
        entity.read_pd(&payload, global)?;
    }
    Ok(())
}

/// Associate pass: bind raw pointers and mirror back-references. Entities
/// whose pointers fail to resolve are marked degenerate but kept.
pub(crate) fn associate_pass(entities: &mut [Entity]) {
    let mut seq_to_id = HashMap::new();
    let mut type_codes = HashMap::new();
    for (index, entity) in entities.iter().enumerate() {
        let sequence = (index * 2 + 1) as u32;
        seq_to_id.insert(sequence, EntityId(index as u32));
        type_codes.insert(EntityId(index as u32), entity.type_code());
    }
    let ctx = ResolveCtx {
        seq_to_id: &seq_to_id,
        type_codes: &type_codes,
    };

    for index in 0..entities.len() {
        let parent = EntityId(index as u32);
        let mut linked = Vec::new();
        let outcome = entities[index].associate(&ctx, &mut linked);
        if let Err(error) = outcome {
            log::warn!(
                "entity at DE {} failed to associate: {}; marking degenerate",
                index * 2 + 1,
                error
            );
            entities[index].set_degenerate();
        }
        // Mirror whatever was bound, even under a partial failure, so the
        // graph invariant holds for every installed pointer.
        for target in linked {
            if target != parent {
                entities[target.index()].add_reference(parent);
            } else {
                log::warn!("entity at DE {} references itself", index * 2 + 1);
            }
        }
    }
}

struct Frame {
    node: usize,
    next: usize,
    children: Vec<EntityId>,
}

/// Detect cycles through owning edges (variant children and transform
/// chains) and clear the closing edge of each cycle found.
pub(crate) fn cycle_pass(entities: &mut [Entity]) {
    let count = entities.len();
    let mut state = vec![0u8; count]; // 0 new, 1 on stack, 2 done
    let mut closing: Vec<(usize, usize)> = Vec::new();

    for root in 0..count {
        if state[root] != 0 {
            continue;
        }
        state[root] = 1;
        let mut stack = vec![Frame {
            node: root,
            next: 0,
            children: entities[root].owning_child_ids(),
        }];
        loop {
            let step = {
                let Some(frame) = stack.last_mut() else { break };
                if frame.next < frame.children.len() {
                    let child = frame.children[frame.next].index();
                    frame.next += 1;
                    Some((frame.node, child))
                } else {
                    state[frame.node] = 2;
                    None
                }
            };
            match step {
                None => {
                    stack.pop();
                }
                Some((parent, child)) => match state[child] {
                    0 => {
                        state[child] = 1;
                        stack.push(Frame {
                            node: child,
                            next: 0,
                            children: entities[child].owning_child_ids(),
                        });
                    }
                    1 => closing.push((parent, child)),
                    _ => {}
                },
            }
        }
    }

    for (parent, child) in closing {
        log::warn!(
            "reference cycle through entities at slots {} and {}; clearing the closing edge",
            parent,
            child
        );
        let child_id = EntityId(child as u32);
        entities[parent].unlink(child_id);
        entities[child].del_reference(EntityId(parent as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{CompositeCurve, EntityRef};

    fn composite_with_segment(id: u32, target: u32) -> Entity {
        let mut composite = CompositeCurve::default();
        composite.segments.push(EntityRef::to(EntityId(target)));
        Entity::new(
            EntityId(id),
            DirectoryEntry::new(102, 0),
            EntityKind::CompositeCurve(composite),
        )
    }

    #[test]
    fn test_shell_pass_rejects_odd_directory() {
        let records = vec![format!("{:<72}", "100")];
        assert!(shell_pass(&records).is_err());
    }

    #[test]
    fn test_shell_pass_invalid_form_keeps_shell() {
        let line1 = format!(
            "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
            110, 1, 0, 0, 0, 0, 0, 0, "00000000"
        );
        let line2 = format!(
            "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
            110, 0, 0, 1, 7, "", "", "", 0
        );
        let entities = shell_pass(&[line1, line2]).unwrap();
        assert_eq!(entities.len(), 1);
        assert!(entities[0].is_degenerate());
        assert!(entities[0].typed().is_err());
    }

    #[test]
    fn test_cycle_pass_clears_closing_edge() {
        let mut a = composite_with_segment(0, 1);
        let mut b = composite_with_segment(1, 0);
        a.add_reference(EntityId(1));
        b.add_reference(EntityId(0));
        let mut entities = vec![a, b];

        cycle_pass(&mut entities);

        let total_edges: usize = entities
            .iter()
            .map(|e| e.owning_child_ids().len())
            .sum();
        assert_eq!(total_edges, 1, "one edge of the two-cycle must remain");
        let total_refs: usize = entities.iter().map(|e| e.refs().len()).sum();
        assert_eq!(total_refs, 1);
    }
}
