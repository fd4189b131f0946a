// CADDY - Enterprise CAD System
// IGES Engine - Model Container

//! The top-level model: global data, the entity table, read/write
//! orchestration, and the graph-maintenance operations wrapper layers call.
//!
//! The model exclusively owns every entity. Entities refer to each other
//! through table indices mirrored by back-references; external callers hold
//! validity-checked handles. Reading replaces the model wholesale; writing
//! renumbers, sweeps orphans, and lands atomically via a temp file.

pub mod registry;
pub mod resolver;
pub mod validity;

use std::collections::HashMap;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::global::GlobalSection;
use crate::codec::params::{wrap_payload, Delimiters};
use crate::codec::record::{read_sections, RecordWriter, Section};
use crate::core::math::{compose, Matrix3, Vector3};
use crate::core::units::Unit;
use crate::entity::{
    is_curve_code, is_surface_code, Entity, EntityId, EntityKind, EntityRef, PointerEncoder,
};
use crate::error::{IgesError, IgesResult};

pub use validity::{EntityHandle, ValidityFlag};

/// Model-level options applied at construction and honoured on read/write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model units; resets the conversion factor when changed
    pub units: Unit,
    /// Convert geometry to millimetres while reading non-metric files
    pub convert_on_read: bool,
    /// Minimum intended resolution; doubles below it emit as zero
    pub min_resolution: f64,
    /// Parameter delimiter written to global field 1
    pub parameter_delimiter: char,
    /// Record delimiter written to global field 2
    pub record_delimiter: char,
    /// Product identification written to the global section
    pub product_id: String,
    /// Native system identification
    pub native_system_id: String,
    /// Author name
    pub author: String,
    /// Author's organization
    pub organization: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            units: Unit::Millimeter,
            convert_on_read: true,
            min_resolution: 1e-6,
            parameter_delimiter: ',',
            record_delimiter: ';',
            product_id: String::new(),
            native_system_id: "CADDY".to_string(),
            author: String::new(),
            organization: String::new(),
        }
    }
}

/// An IGES model: global header plus the owned entity table.
#[derive(Debug)]
pub struct Model {
    config: ModelConfig,
    global: GlobalSection,
    slots: Vec<Option<Entity>>,
    start_comments: Vec<String>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Create an empty model with default configuration.
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    /// Create an empty model with the given configuration.
    pub fn with_config(config: ModelConfig) -> Self {
        let global = global_from_config(&config);
        Self {
            config,
            global,
            slots: Vec::new(),
            start_comments: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    /// Allocate a new entity of the given type code and hand back a
    /// validity-tracked handle. Unknown codes allocate null shells.
    pub fn new_entity(&mut self, type_code: u16) -> EntityHandle {
        let id = EntityId(self.slots.len() as u32);
        let de = crate::entity::DirectoryEntry::new(type_code, registry::default_form(type_code));
        let kind = registry::construct(type_code);
        let mut entity = Entity::new(id, de, kind);
        let flag = ValidityFlag::new();
        entity.attach_validity(flag.clone());
        self.slots.push(Some(entity));
        EntityHandle::new(id, flag)
    }

    /// Destroy an entity: unlink it from every parent, release its children,
    /// and signal all external handles.
    pub fn delete_entity(&mut self, handle: &EntityHandle) -> IgesResult<()> {
        let id = handle.id().ok_or(IgesError::StaleHandle)?;
        self.delete_by_id(id)
    }

    pub(crate) fn delete_by_id(&mut self, id: EntityId) -> IgesResult<()> {
        let (parents, children) = {
            let entity = self.get(id).ok_or(IgesError::NoSuchEntity)?;
            (entity.refs().to_vec(), entity.child_ids())
        };
        for parent in parents {
            if let Some(entity) = self.slot_mut(parent) {
                entity.unlink(id);
            }
        }
        for child in children {
            if let Some(entity) = self.slot_mut(child) {
                entity.del_reference(id);
            }
        }
        if let Some(mut entity) = self.slots[id.index()].take() {
            entity.revoke_handles();
        }
        Ok(())
    }

    /// Issue a fresh validity-tracked handle for an existing entity.
    pub fn handle(&mut self, id: EntityId) -> IgesResult<EntityHandle> {
        let flag = ValidityFlag::new();
        let entity = self.slot_mut(id).ok_or(IgesError::NoSuchEntity)?;
        entity.attach_validity(flag.clone());
        Ok(EntityHandle::new(id, flag))
    }

    /// Entity access through a handle; fails once the handle is stale.
    pub fn entity(&self, handle: &EntityHandle) -> IgesResult<&Entity> {
        let id = handle.id().ok_or(IgesError::StaleHandle)?;
        self.get(id).ok_or(IgesError::NoSuchEntity)
    }

    /// Mutable entity access through a handle.
    pub fn entity_mut(&mut self, handle: &EntityHandle) -> IgesResult<&mut Entity> {
        let id = handle.id().ok_or(IgesError::StaleHandle)?;
        self.slot_mut(id).ok_or(IgesError::NoSuchEntity)
    }

    /// Entity access by table index.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.entities().count()
    }

    /// Count live entities per type code.
    pub fn count_by_type(&self) -> HashMap<u16, usize> {
        let mut counts = HashMap::new();
        for entity in self.entities() {
            *counts.entry(entity.type_code()).or_insert(0) += 1;
        }
        counts
    }

    fn ids(&self) -> Vec<EntityId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| EntityId(index as u32)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Typed link operations; each installs the mirrored back-reference
    // ------------------------------------------------------------------

    fn expect_code(&self, id: EntityId, code: u16, what: &'static str) -> IgesResult<()> {
        let found = self.get(id).ok_or(IgesError::NoSuchEntity)?.type_code();
        if found != code {
            return Err(IgesError::WrongVariant {
                expected: what,
                found,
            });
        }
        Ok(())
    }

    fn link(&mut self, parent: EntityId, child: EntityId) -> IgesResult<()> {
        self.slot_mut(child)
            .ok_or(IgesError::NoSuchEntity)?
            .add_reference(parent);
        Ok(())
    }

    /// Drop the back-reference for a single cleared pointer, unless another
    /// pointer from the same parent still holds the child.
    fn unlink_single(&mut self, parent: EntityId, child: EntityId) {
        let still_held = self
            .get(parent)
            .map(|e| e.child_ids().contains(&child))
            .unwrap_or(false);
        if !still_held {
            if let Some(entity) = self.slot_mut(child) {
                entity.del_reference(parent);
            }
        }
    }

    /// Point an entity's DE transform field at a transformation matrix.
    pub fn set_transform(&mut self, entity: EntityId, transform: EntityId) -> IgesResult<()> {
        self.expect_code(transform, 124, "transformation matrix")?;
        let previous = {
            let target = self.slot_mut(entity).ok_or(IgesError::NoSuchEntity)?;
            let previous = target.de.transform.target();
            target.de.transform = EntityRef::to(transform);
            previous
        };
        if let Some(previous) = previous {
            self.unlink_single(entity, previous);
        }
        self.link(entity, transform)
    }

    /// Point an entity's DE color field at a color definition.
    pub fn set_color_definition(&mut self, entity: EntityId, color: EntityId) -> IgesResult<()> {
        self.expect_code(color, 314, "color definition")?;
        let previous = {
            let target = self.slot_mut(entity).ok_or(IgesError::NoSuchEntity)?;
            let previous = target.de.color_def.target();
            target.de.color_def = EntityRef::to(color);
            previous
        };
        if let Some(previous) = previous {
            self.unlink_single(entity, previous);
        }
        self.link(entity, color)
    }

    /// Append a curve segment to a composite curve.
    pub fn add_segment(&mut self, composite: EntityId, segment: EntityId) -> IgesResult<()> {
        let code = self.get(segment).ok_or(IgesError::NoSuchEntity)?.type_code();
        if !is_curve_code(code) {
            return Err(IgesError::WrongVariant {
                expected: "curve entity",
                found: code,
            });
        }
        {
            let entity = self.slot_mut(composite).ok_or(IgesError::NoSuchEntity)?;
            match entity.kind_raw_mut() {
                EntityKind::CompositeCurve(curve) => {
                    curve.segments.push(EntityRef::to(segment));
                }
                other => {
                    return Err(IgesError::WrongVariant {
                        expected: "composite curve",
                        found: other.type_code(),
                    })
                }
            }
        }
        self.link(composite, segment)
    }

    /// Append a member entity to a subfigure definition.
    pub fn add_member(&mut self, definition: EntityId, member: EntityId) -> IgesResult<()> {
        self.get(member).ok_or(IgesError::NoSuchEntity)?;
        {
            let entity = self.slot_mut(definition).ok_or(IgesError::NoSuchEntity)?;
            match entity.kind_raw_mut() {
                EntityKind::SubfigureDefinition(def) => {
                    def.members.push(EntityRef::to(member));
                }
                other => {
                    return Err(IgesError::WrongVariant {
                        expected: "subfigure definition",
                        found: other.type_code(),
                    })
                }
            }
        }
        self.link(definition, member)
    }

    /// Point a subfigure instance at its definition.
    pub fn set_definition(&mut self, instance: EntityId, definition: EntityId) -> IgesResult<()> {
        self.expect_code(definition, 308, "subfigure definition")?;
        let previous = {
            let entity = self.slot_mut(instance).ok_or(IgesError::NoSuchEntity)?;
            match entity.kind_raw_mut() {
                EntityKind::SubfigureInstance(inst) => {
                    let previous = inst.definition.target();
                    inst.definition = EntityRef::to(definition);
                    previous
                }
                other => {
                    return Err(IgesError::WrongVariant {
                        expected: "singular subfigure instance",
                        found: other.type_code(),
                    })
                }
            }
        };
        if let Some(previous) = previous {
            self.unlink_single(instance, previous);
        }
        self.link(instance, definition)
    }

    /// Wire a surface of revolution: axis line and generatrix curve.
    pub fn set_revolution_axis(&mut self, surface: EntityId, axis: EntityId) -> IgesResult<()> {
        self.expect_code(axis, 110, "line")?;
        let previous = {
            let entity = self.slot_mut(surface).ok_or(IgesError::NoSuchEntity)?;
            match entity.kind_raw_mut() {
                EntityKind::SurfaceOfRevolution(rev) => {
                    let previous = rev.axis.target();
                    rev.axis = EntityRef::to(axis);
                    previous
                }
                other => {
                    return Err(IgesError::WrongVariant {
                        expected: "surface of revolution",
                        found: other.type_code(),
                    })
                }
            }
        };
        if let Some(previous) = previous {
            self.unlink_single(surface, previous);
        }
        self.link(surface, axis)
    }

    /// Wire a surface of revolution's generatrix curve.
    pub fn set_generatrix(&mut self, surface: EntityId, curve: EntityId) -> IgesResult<()> {
        let code = self.get(curve).ok_or(IgesError::NoSuchEntity)?.type_code();
        if !is_curve_code(code) {
            return Err(IgesError::WrongVariant {
                expected: "curve entity",
                found: code,
            });
        }
        let previous = {
            let entity = self.slot_mut(surface).ok_or(IgesError::NoSuchEntity)?;
            match entity.kind_raw_mut() {
                EntityKind::SurfaceOfRevolution(rev) => {
                    let previous = rev.generatrix.target();
                    rev.generatrix = EntityRef::to(curve);
                    previous
                }
                other => {
                    return Err(IgesError::WrongVariant {
                        expected: "surface of revolution",
                        found: other.type_code(),
                    })
                }
            }
        };
        if let Some(previous) = previous {
            self.unlink_single(surface, previous);
        }
        self.link(surface, curve)
    }

    /// Point a curve-on-surface or trimmed surface at its base surface.
    pub fn set_surface(&mut self, entity: EntityId, surface: EntityId) -> IgesResult<()> {
        let code = self.get(surface).ok_or(IgesError::NoSuchEntity)?.type_code();
        if !is_surface_code(code) {
            return Err(IgesError::WrongVariant {
                expected: "surface entity",
                found: code,
            });
        }
        let previous = {
            let target = self.slot_mut(entity).ok_or(IgesError::NoSuchEntity)?;
            match target.kind_raw_mut() {
                EntityKind::CurveOnSurface(cos) => {
                    let previous = cos.surface.target();
                    cos.surface = EntityRef::to(surface);
                    previous
                }
                EntityKind::TrimmedSurface(trim) => {
                    let previous = trim.surface.target();
                    trim.surface = EntityRef::to(surface);
                    previous
                }
                other => {
                    return Err(IgesError::WrongVariant {
                        expected: "curve on surface or trimmed surface",
                        found: other.type_code(),
                    })
                }
            }
        };
        if let Some(previous) = previous {
            self.unlink_single(entity, previous);
        }
        self.link(entity, surface)
    }

    /// Wire the model-space curve of a curve-on-surface.
    pub fn set_model_curve(&mut self, cos: EntityId, curve: EntityId) -> IgesResult<()> {
        let code = self.get(curve).ok_or(IgesError::NoSuchEntity)?.type_code();
        if !is_curve_code(code) {
            return Err(IgesError::WrongVariant {
                expected: "curve entity",
                found: code,
            });
        }
        let previous = {
            let entity = self.slot_mut(cos).ok_or(IgesError::NoSuchEntity)?;
            match entity.kind_raw_mut() {
                EntityKind::CurveOnSurface(inner) => {
                    let previous = inner.model_curve.target();
                    inner.model_curve = EntityRef::to(curve);
                    previous
                }
                other => {
                    return Err(IgesError::WrongVariant {
                        expected: "curve on surface",
                        found: other.type_code(),
                    })
                }
            }
        };
        if let Some(previous) = previous {
            self.unlink_single(cos, previous);
        }
        self.link(cos, curve)
    }

    /// Wire the outer boundary (an entity 142) of a trimmed surface.
    pub fn set_outer_boundary(&mut self, surface: EntityId, boundary: EntityId) -> IgesResult<()> {
        self.expect_code(boundary, 142, "curve on surface")?;
        let previous = {
            let entity = self.slot_mut(surface).ok_or(IgesError::NoSuchEntity)?;
            match entity.kind_raw_mut() {
                EntityKind::TrimmedSurface(trim) => {
                    let previous = trim.outer.target();
                    trim.outer = EntityRef::to(boundary);
                    previous
                }
                other => {
                    return Err(IgesError::WrongVariant {
                        expected: "trimmed surface",
                        found: other.type_code(),
                    })
                }
            }
        };
        if let Some(previous) = previous {
            self.unlink_single(surface, previous);
        }
        self.link(surface, boundary)
    }

    /// Attach a property entity (406) to any entity's extras.
    pub fn attach_property(&mut self, entity: EntityId, property: EntityId) -> IgesResult<()> {
        self.expect_code(property, 406, "property")?;
        self.slot_mut(entity)
            .ok_or(IgesError::NoSuchEntity)?
            .push_property(property);
        self.link(entity, property)
    }

    /// Attach an associativity entity (402) to any entity's extras.
    pub fn attach_associativity(&mut self, entity: EntityId, assoc: EntityId) -> IgesResult<()> {
        self.expect_code(assoc, 402, "associativity instance")?;
        self.slot_mut(entity)
            .ok_or(IgesError::NoSuchEntity)?
            .push_associate(assoc);
        self.link(entity, assoc)
    }

    /// Compose a transformation matrix with its DE-level parent chain,
    /// producing the full placement `p -> R p + T`.
    pub fn composed_transform(&self, transform: EntityId) -> IgesResult<(Matrix3, Vector3)> {
        let mut chain = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut current = Some(transform);
        while let Some(id) = current {
            if !visited.insert(id) {
                return Err(IgesError::Usage(
                    "transformation chain forms a cycle".to_string(),
                ));
            }
            let entity = self.get(id).ok_or(IgesError::NoSuchEntity)?;
            match entity.kind_raw() {
                EntityKind::TransformationMatrix(matrix) => chain.push(matrix.clone()),
                other => {
                    return Err(IgesError::WrongVariant {
                        expected: "transformation matrix",
                        found: other.type_code(),
                    })
                }
            }
            current = entity.de.transform.target();
        }

        // chain runs innermost-first; ancestors apply after descendants
        let mut placement = (Matrix3::identity(), Vector3::zeros());
        for matrix in chain.iter().rev() {
            placement = compose(&placement, &(matrix.rotation, matrix.translation));
        }
        Ok(placement)
    }

    // ------------------------------------------------------------------
    // Global data accessors
    // ------------------------------------------------------------------

    /// The parsed or configured global section
    pub fn global(&self) -> &GlobalSection {
        &self.global
    }

    pub fn units(&self) -> Unit {
        self.global.units
    }

    /// Change model units. The conversion factor follows the unit.
    pub fn set_units(&mut self, units: Unit) {
        self.config.units = units;
        self.global.units = units;
        self.global.units_name = units.name().to_string();
    }

    pub fn author(&self) -> &str {
        &self.global.author
    }

    pub fn set_author(&mut self, author: &str) {
        self.config.author = author.to_string();
        self.global.author = author.to_string();
    }

    pub fn organization(&self) -> &str {
        &self.global.organization
    }

    pub fn set_organization(&mut self, organization: &str) {
        self.config.organization = organization.to_string();
        self.global.organization = organization.to_string();
    }

    pub fn min_resolution(&self) -> f64 {
        self.global.min_resolution
    }

    pub fn set_min_resolution(&mut self, resolution: f64) {
        self.config.min_resolution = resolution;
        self.global.min_resolution = resolution;
    }

    pub fn delimiters(&self) -> Delimiters {
        self.global.delimiters
    }

    /// Override the parameter and record delimiters. Delimiters must be
    /// distinct printable characters outside the set that numbers and
    /// Hollerith strings use.
    pub fn set_delimiters(&mut self, parameter: char, record: char) -> IgesResult<()> {
        for c in [parameter, record] {
            if !c.is_ascii_graphic() || c.is_ascii_alphanumeric() || "+-.".contains(c) {
                return Err(IgesError::Usage(format!(
                    "'{}' cannot serve as a delimiter",
                    c
                )));
            }
        }
        if parameter == record {
            return Err(IgesError::Usage(
                "parameter and record delimiters must differ".to_string(),
            ));
        }
        self.config.parameter_delimiter = parameter;
        self.config.record_delimiter = record;
        self.global.delimiters = Delimiters { parameter, record };
        Ok(())
    }

    /// Free-form start-section comment lines
    pub fn start_comments(&self) -> &[String] {
        &self.start_comments
    }

    pub fn add_start_comment(&mut self, comment: &str) {
        self.start_comments.push(comment.to_string());
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Read an IGES file, replacing the whole model. I/O failures leave the
    /// model untouched; parse failures leave it empty.
    pub fn read<P: AsRef<Path>>(&mut self, path: P) -> IgesResult<()> {
        let text = fs::read_to_string(path)?;
        match Self::parse(&text, &self.config) {
            Ok(model) => {
                self.clear();
                *self = model;
                Ok(())
            }
            Err(error) => {
                self.clear();
                Err(error)
            }
        }
    }

    /// Parse IGES text into a fresh model under the given configuration.
    pub fn parse(text: &str, config: &ModelConfig) -> IgesResult<Model> {
        let sections = read_sections(text)?;
        let global = GlobalSection::parse(&sections.global)?;
        let mut entities = resolver::shell_pass(&sections.directory)?;
        resolver::content_pass(&mut entities, &sections.parameter, &global)?;
        resolver::associate_pass(&mut entities);
        resolver::cycle_pass(&mut entities);

        let mut model = Model {
            config: config.clone(),
            global,
            slots: entities.into_iter().map(Some).collect(),
            start_comments: sections
                .start
                .iter()
                .map(|line| line.trim_end().to_string())
                .collect(),
        };
        if config.convert_on_read {
            model.convert_units();
        }
        Ok(model)
    }

    /// Drop every entity (revoking handles) and reset the global section.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            if let Some(entity) = slot {
                entity.revoke_handles();
            }
        }
        self.slots.clear();
        self.start_comments.clear();
        self.global = global_from_config(&self.config);
    }

    /// Normalise geometry to millimetres. Idempotent: once converted the
    /// unit flag reports millimetres and the factor is 1.
    fn convert_units(&mut self) {
        if self.global.units == Unit::UserDefined {
            log::info!(
                "file declares user-defined unit '{}'; skipping conversion",
                self.global.units_name
            );
            return;
        }
        let factor = self.global.conversion_factor();
        if factor == 1.0 {
            return;
        }
        log::info!(
            "converting {} model to millimetres (factor {})",
            self.global.units_name,
            factor
        );
        for slot in self.slots.iter_mut().flatten() {
            slot.rescale(factor);
        }
        self.global.min_resolution *= factor;
        self.global.max_coordinate *= factor;
        self.global.units = Unit::Millimeter;
        self.global.units_name = Unit::Millimeter.name().to_string();
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Remove dependent entities that nothing references any more, to a
    /// fixpoint: pruning one orphan can orphan its children.
    pub fn orphan_sweep(&mut self) {
        loop {
            let orphans: Vec<EntityId> = self
                .entities()
                .filter(|e| e.is_orphaned())
                .map(Entity::id)
                .collect();
            if orphans.is_empty() {
                break;
            }
            for id in orphans {
                log::debug!("orphan sweep removing entity at slot {}", id.index());
                let _ = self.delete_by_id(id);
            }
        }
    }

    /// Write the model. The destination appears atomically via a temp file
    /// and rename; with `overwrite` false an existing destination is an
    /// error and stays untouched.
    pub fn write<P: AsRef<Path>>(&mut self, path: P, overwrite: bool) -> IgesResult<()> {
        let path = path.as_ref();
        if path.exists() && !overwrite {
            return Err(IgesError::DestinationExists(path.to_path_buf()));
        }

        self.orphan_sweep();

        // Every healthy entity must carry an admissible form. Degenerate
        // shells re-emit whatever the file carried.
        for entity in self.entities() {
            if !entity.is_degenerate() && !registry::valid_form(entity.type_code(), entity.form())
            {
                return Err(IgesError::InvalidForm {
                    entity_type: entity.type_code(),
                    form: entity.form(),
                });
            }
        }

        let now = chrono::Utc::now().format("%Y%m%d.%H%M%S").to_string();
        if self.global.created.is_empty() {
            self.global.created = now.clone();
        }
        self.global.modified = now;
        self.global.max_coordinate = self
            .entities()
            .map(Entity::max_coordinate)
            .fold(0.0, f64::max);
        if self.global.file_name.is_empty() {
            if let Some(name) = path.file_name() {
                self.global.file_name = name.to_string_lossy().into_owned();
            }
        }

        let tmp = match path.parent() {
            Some(parent) if parent.as_os_str().len() > 0 => parent,
            _ => Path::new("."),
        }
        .join(format!(
            "{}.tmp",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "iges-out".to_string())
        ));

        let result = self.write_records(&tmp);
        match result {
            Ok(()) => fs::rename(&tmp, path).map_err(|error| {
                let _ = fs::remove_file(&tmp);
                IgesError::Io(error)
            }),
            Err(error) => {
                let _ = fs::remove_file(&tmp);
                Err(error)
            }
        }
    }

    fn write_records(&self, path: &Path) -> IgesResult<()> {
        let live = self.ids();
        let mut sequences = HashMap::new();
        for (position, id) in live.iter().enumerate() {
            sequences.insert(*id, (position * 2 + 1) as u32);
        }
        let enc = PointerEncoder::new(&sequences);
        let delims = self.global.delimiters;

        // Format parameter payloads first: the DE records need each
        // entity's P start line and record count.
        let mut p_records: Vec<(String, u32)> = Vec::new();
        let mut pd_spans: HashMap<EntityId, (u32, u32)> = HashMap::new();
        for id in &live {
            let entity = match self.get(*id) {
                Some(entity) => entity,
                None => continue,
            };
            let payload = entity.format_params(delims, self.global.min_resolution, &enc);
            let lines = wrap_payload(&payload, 64);
            let start = (p_records.len() + 1) as u32;
            pd_spans.insert(*id, (start, lines.len() as u32));
            let de_sequence = sequences[id];
            for line in lines {
                p_records.push((line, de_sequence));
            }
        }

        let file = fs::File::create(path)?;
        let mut writer = RecordWriter::new(BufWriter::new(file));

        if self.start_comments.is_empty() {
            let banner = if self.global.product_id.is_empty() {
                "IGES model written by the CADDY IGES engine".to_string()
            } else {
                self.global.product_id.clone()
            };
            writer.write_record(Section::Start, &banner)?;
        } else {
            for comment in &self.start_comments {
                for line in wrap_payload(comment, 72) {
                    writer.write_record(Section::Start, &line)?;
                }
            }
        }

        for line in wrap_payload(&self.global.format(), 72) {
            writer.write_record(Section::Global, &line)?;
        }

        for id in &live {
            let entity = match self.get(*id) {
                Some(entity) => entity,
                None => continue,
            };
            let (start, count) = pd_spans[id];
            let (line1, line2) = entity.de.format(start, count, &enc);
            writer.write_record(Section::Directory, &line1)?;
            writer.write_record(Section::Directory, &line2)?;
        }

        for (content, de_sequence) in &p_records {
            let record = format!("{:<64}{:>8}", content, de_sequence);
            writer.write_record(Section::Parameter, &record)?;
        }

        writer.finish()?;
        Ok(())
    }
}

fn global_from_config(config: &ModelConfig) -> GlobalSection {
    let mut global = GlobalSection::default();
    global.delimiters = Delimiters {
        parameter: config.parameter_delimiter,
        record: config.record_delimiter,
    };
    global.units = config.units;
    global.units_name = config.units.name().to_string();
    global.min_resolution = config.min_resolution;
    global.product_id = config.product_id.clone();
    global.native_system_id = config.native_system_id.clone();
    global.author = config.author.clone();
    global.organization = config.organization.clone();
    global
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Subordinate;

    #[test]
    fn test_new_entity_and_handles() {
        let mut model = Model::new();
        let handle = model.new_entity(110);
        assert!(handle.is_valid());
        assert_eq!(model.entity_count(), 1);
        assert_eq!(model.entity(&handle).unwrap().type_code(), 110);
    }

    #[test]
    fn test_delete_revokes_handles_and_unlinks() {
        let mut model = Model::new();
        let composite = model.new_entity(102);
        let line = model.new_entity(110);
        let composite_id = composite.id().unwrap();
        let line_id = line.id().unwrap();
        model.add_segment(composite_id, line_id).unwrap();

        assert_eq!(model.get(line_id).unwrap().refs(), &[composite_id]);

        model.delete_entity(&line).unwrap();
        assert!(!line.is_valid());
        assert_eq!(model.entity_count(), 1);
        let composite_entity = model.get(composite_id).unwrap();
        assert!(composite_entity.child_ids().is_empty());
    }

    #[test]
    fn test_delete_cascades_from_parents() {
        let mut model = Model::new();
        let composite = model.new_entity(102);
        let line = model.new_entity(110);
        let composite_id = composite.id().unwrap();
        let line_id = line.id().unwrap();
        model.add_segment(composite_id, line_id).unwrap();

        // Deleting the composite releases the line, leaving it orphaned
        // (its status was upgraded to dependent when it was referenced).
        model.delete_entity(&composite).unwrap();
        let line_entity = model.get(line_id).unwrap();
        assert!(line_entity.refs().is_empty());
        assert_eq!(
            line_entity.de.status.subordinate,
            Subordinate::PhysicallyDependent
        );
        assert!(line_entity.is_orphaned());

        model.orphan_sweep();
        assert_eq!(model.entity_count(), 0);
        assert!(!line.is_valid());
    }

    #[test]
    fn test_wrong_variant_rejected() {
        let mut model = Model::new();
        let composite = model.new_entity(102);
        let color = model.new_entity(314);
        let err = model
            .add_segment(composite.id().unwrap(), color.id().unwrap())
            .unwrap_err();
        assert!(matches!(err, IgesError::WrongVariant { found: 314, .. }));
    }

    #[test]
    fn test_set_transform_replaces_and_relinks() {
        let mut model = Model::new();
        let line = model.new_entity(110).id().unwrap();
        let t1 = model.new_entity(124).id().unwrap();
        let t2 = model.new_entity(124).id().unwrap();

        model.set_transform(line, t1).unwrap();
        assert_eq!(model.get(t1).unwrap().refs(), &[line]);

        model.set_transform(line, t2).unwrap();
        assert!(model.get(t1).unwrap().refs().is_empty());
        assert_eq!(model.get(t2).unwrap().refs(), &[line]);
    }

    #[test]
    fn test_set_delimiters_validation() {
        let mut model = Model::new();
        assert!(model.set_delimiters('/', '#').is_ok());
        assert!(model.set_delimiters('a', ';').is_err());
        assert!(model.set_delimiters(',', ',').is_err());
        assert!(model.set_delimiters('-', ';').is_err());
    }

    #[test]
    fn test_clear_revokes_handles() {
        let mut model = Model::new();
        let handle = model.new_entity(110);
        model.clear();
        assert!(!handle.is_valid());
        assert_eq!(model.entity_count(), 0);
    }
}
