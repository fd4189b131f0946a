//! Entity representation: directory-entry fields, typed parameter payloads,
//! and the reference bookkeeping that ties the object graph together.
//!
//! Every entity is a [`DirectoryEntry`] plus an [`EntityKind`] payload.
//! Forward references are [`EntityRef`] slots holding the raw pointer from
//! the file until the resolver binds them to table indices; each bound
//! reference is mirrored by an entry in the target's back-reference list.

pub mod attach;
pub mod color;
pub mod composite;
pub mod curve;
pub mod null;
pub mod spline;
pub mod status;
pub mod subfigure;
pub mod surface;
pub mod transform;

use std::collections::HashMap;

use crate::codec::global::GlobalSection;
use crate::codec::params::{Delimiters, ParameterBuilder, ParameterScanner};
use crate::error::{IgesError, IgesResult};
use crate::model::validity::ValidityFlag;

pub use attach::{Associativity, Property};
pub use color::ColorDefinition;
pub use composite::CompositeCurve;
pub use curve::{CircularArc, ConicArc, Line};
pub use null::NullEntity;
pub use spline::{RationalBSplineCurve, RationalBSplineSurface};
pub use status::{BlankStatus, EntityUse, Hierarchy, StatusNumber, Subordinate};
pub use subfigure::{SubfigureDefinition, SubfigureInstance};
pub use surface::{BoundaryPreference, CurveCreation, CurveOnSurface, SurfaceOfRevolution, TrimmedSurface};
pub use transform::TransformationMatrix;

/// Index of an entity slot in its owning model's table.
///
/// Identity is meaningful only within that model; ids are never reused for a
/// different entity while the model lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    /// The slot index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A pointer field: the raw DE sequence number as read from the file, and
/// the table index once the resolver has bound it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityRef {
    raw: i64,
    target: Option<EntityId>,
}

impl EntityRef {
    /// An absent reference
    pub fn null() -> Self {
        Self::default()
    }

    /// A bound in-memory reference
    pub fn to(id: EntityId) -> Self {
        Self {
            raw: 0,
            target: Some(id),
        }
    }

    pub(crate) fn from_raw(raw: i64) -> Self {
        Self { raw, target: None }
    }

    /// True when the reference neither names a DE sequence nor a bound
    /// target
    pub fn is_null(&self) -> bool {
        self.raw == 0 && self.target.is_none()
    }

    /// A negative raw value logically negates the reference
    pub fn negated(&self) -> bool {
        self.raw < 0
    }

    /// The bound table index, if resolution succeeded
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub(crate) fn raw(&self) -> i64 {
        self.raw
    }

    pub(crate) fn bind(&mut self, id: EntityId) {
        self.target = Some(id);
    }

    pub(crate) fn clear(&mut self) {
        self.raw = 0;
        self.target = None;
    }
}

/// What a pointer is allowed to resolve to
#[derive(Debug, Clone, Copy)]
pub(crate) enum Expect {
    Any,
    Code(u16),
    Curve,
    Surface,
}

impl Expect {
    fn describe(self) -> &'static str {
        match self {
            Expect::Any => "any entity",
            Expect::Code(100) => "circular arc",
            Expect::Code(110) => "line",
            Expect::Code(124) => "transformation matrix",
            Expect::Code(142) => "curve on surface",
            Expect::Code(308) => "subfigure definition",
            Expect::Code(314) => "color definition",
            Expect::Code(_) => "specific entity type",
            Expect::Curve => "curve entity",
            Expect::Surface => "surface entity",
        }
    }
}

/// Type codes the resolver accepts where a curve is expected
pub fn is_curve_code(code: u16) -> bool {
    matches!(code, 100 | 102 | 104 | 106 | 110 | 112 | 126 | 130)
}

/// Type codes the resolver accepts where a surface is expected
pub fn is_surface_code(code: u16) -> bool {
    matches!(code, 114 | 118 | 120 | 122 | 128 | 140 | 143 | 190 | 192 | 194 | 196 | 198)
}

/// Lookup tables for the associate pass
pub(crate) struct ResolveCtx<'a> {
    /// DE sequence number to table index
    pub seq_to_id: &'a HashMap<u32, EntityId>,
    /// Table index to entity type code
    pub type_codes: &'a HashMap<EntityId, u16>,
}

impl ResolveCtx<'_> {
    /// Resolve one pointer slot. Bound targets are appended to `linked` so
    /// the resolver can mirror the back-references afterwards.
    pub(crate) fn bind(
        &self,
        slot: &mut EntityRef,
        expect: Expect,
        role: &str,
        linked: &mut Vec<EntityId>,
    ) -> IgesResult<()> {
        if slot.raw == 0 {
            return Ok(());
        }
        let sequence = slot.raw.unsigned_abs() as u32;
        let id = *self
            .seq_to_id
            .get(&sequence)
            .ok_or(IgesError::Directory {
                sequence,
                message: format!("dangling {} pointer", role),
            })?;
        let code = self.type_codes.get(&id).copied().unwrap_or(0);
        let accepted = match expect {
            Expect::Any => true,
            Expect::Code(want) => code == want,
            Expect::Curve => is_curve_code(code),
            Expect::Surface => is_surface_code(code),
        };
        if !accepted {
            return Err(IgesError::WrongVariant {
                expected: expect.describe(),
                found: code,
            });
        }
        slot.bind(id);
        linked.push(id);
        Ok(())
    }

    /// Check that a raw DE-field pointer names an existing entry.
    fn check_exists(&self, raw: i64, role: &str) -> IgesResult<()> {
        if raw == 0 {
            return Ok(());
        }
        let sequence = raw.unsigned_abs() as u32;
        if self.seq_to_id.contains_key(&sequence) {
            Ok(())
        } else {
            Err(IgesError::Directory {
                sequence,
                message: format!("dangling {} pointer", role),
            })
        }
    }
}

/// Encodes bound references back into DE sequence numbers at write time.
pub(crate) struct PointerEncoder<'a> {
    sequences: &'a HashMap<EntityId, u32>,
}

impl<'a> PointerEncoder<'a> {
    pub(crate) fn new(sequences: &'a HashMap<EntityId, u32>) -> Self {
        Self { sequences }
    }

    pub(crate) fn encode(&self, slot: &EntityRef) -> i64 {
        match slot.target() {
            Some(id) => match self.sequences.get(&id) {
                Some(&seq) => {
                    if slot.negated() {
                        -(seq as i64)
                    } else {
                        seq as i64
                    }
                }
                None => {
                    log::warn!("reference to an entity outside the write set, emitting 0");
                    0
                }
            },
            // Unbound slots keep whatever the file carried; degenerate
            // entities round-trip their recorded pointer values.
            None => slot.raw(),
        }
    }
}

/// The two-record directory entry, stored fields only; sequence numbers and
/// the parameter pointer are assigned on write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryEntry {
    pub entity_type: u16,
    /// First P-section line of this entity's parameter block (as read)
    pub parameter_data: u32,
    pub structure: i64,
    pub line_font: i64,
    pub level: i64,
    pub view: i64,
    /// DE field 7, bound to an entity 124 during associate
    pub transform: EntityRef,
    pub label_display: i64,
    pub status: StatusNumber,
    pub line_weight: u32,
    /// Raw color field: a small positive palette index, or negative for a
    /// pointer to a color definition
    pub color: i64,
    /// Bound color definition when `color` is a pointer
    pub color_def: EntityRef,
    pub param_line_count: u32,
    pub form: i16,
    pub label: String,
    pub subscript: u32,
}

fn de_field(line: &str, index: usize) -> &str {
    &line[index * 8..(index + 1) * 8]
}

fn de_int(line: &str, index: usize, sequence: u32) -> IgesResult<i64> {
    let text = de_field(line, index).trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse::<i64>().map_err(|_| IgesError::Directory {
        sequence,
        message: format!("field {} is not an integer: '{}'", index + 1, text),
    })
}

impl DirectoryEntry {
    pub fn new(entity_type: u16, form: i16) -> Self {
        Self {
            entity_type,
            form,
            ..Self::default()
        }
    }

    /// Parse a DE record pair. `sequence` is the first record's sequence
    /// number, used for diagnostics.
    pub(crate) fn parse(line1: &str, line2: &str, sequence: u32) -> IgesResult<Self> {
        let entity_type = de_int(line1, 0, sequence)? as u16;
        let second_type = de_int(line2, 0, sequence)? as u16;
        if entity_type != second_type {
            return Err(IgesError::Directory {
                sequence,
                message: format!(
                    "record pair disagrees on entity type ({} vs {})",
                    entity_type, second_type
                ),
            });
        }

        let status_text = de_field(line1, 8);
        let status = StatusNumber::parse(status_text).ok_or(IgesError::Directory {
            sequence,
            message: format!("malformed status number '{}'", status_text.trim()),
        })?;

        let color = de_int(line2, 2, sequence)?;
        Ok(Self {
            entity_type,
            parameter_data: de_int(line1, 1, sequence)?.max(0) as u32,
            structure: de_int(line1, 2, sequence)?,
            line_font: de_int(line1, 3, sequence)?,
            level: de_int(line1, 4, sequence)?,
            view: de_int(line1, 5, sequence)?,
            transform: EntityRef::from_raw(de_int(line1, 6, sequence)?),
            label_display: de_int(line1, 7, sequence)?,
            status,
            line_weight: de_int(line2, 1, sequence)?.max(0) as u32,
            color,
            color_def: if color < 0 {
                EntityRef::from_raw(color)
            } else {
                EntityRef::null()
            },
            param_line_count: de_int(line2, 3, sequence)?.max(0) as u32,
            form: de_int(line2, 4, sequence)? as i16,
            label: de_field(line2, 7).trim().to_string(),
            subscript: de_int(line2, 8, sequence)?.max(0) as u32,
        })
    }

    /// Emit the DE record pair for this entity.
    pub(crate) fn format(
        &self,
        pd_pointer: u32,
        line_count: u32,
        enc: &PointerEncoder<'_>,
    ) -> (String, String) {
        let color = if self.color_def.is_null() {
            self.color.max(0)
        } else {
            -enc.encode(&self.color_def).abs()
        };
        let line1 = format!(
            "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
            self.entity_type,
            pd_pointer,
            self.structure,
            self.line_font,
            self.level,
            self.view,
            enc.encode(&self.transform),
            self.label_display,
            self.status.to_field(),
        );
        let label: String = self.label.chars().take(8).collect();
        let line2 = format!(
            "{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
            self.entity_type,
            self.line_weight,
            color,
            line_count,
            self.form,
            "",
            "",
            label,
            self.subscript,
        );
        (line1, line2)
    }
}

/// Typed entity payload, dispatched by kind tag
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    CircularArc(CircularArc),
    CompositeCurve(CompositeCurve),
    ConicArc(ConicArc),
    Line(Line),
    SurfaceOfRevolution(SurfaceOfRevolution),
    TransformationMatrix(TransformationMatrix),
    RationalBSplineCurve(RationalBSplineCurve),
    RationalBSplineSurface(RationalBSplineSurface),
    CurveOnSurface(CurveOnSurface),
    TrimmedSurface(TrimmedSurface),
    SubfigureDefinition(SubfigureDefinition),
    ColorDefinition(ColorDefinition),
    Associativity(Associativity),
    Property(Property),
    SubfigureInstance(SubfigureInstance),
    Null(NullEntity),
}

impl EntityKind {
    /// The IGES entity type code
    pub fn type_code(&self) -> u16 {
        match self {
            EntityKind::CircularArc(_) => 100,
            EntityKind::CompositeCurve(_) => 102,
            EntityKind::ConicArc(_) => 104,
            EntityKind::Line(_) => 110,
            EntityKind::SurfaceOfRevolution(_) => 120,
            EntityKind::TransformationMatrix(_) => 124,
            EntityKind::RationalBSplineCurve(_) => 126,
            EntityKind::RationalBSplineSurface(_) => 128,
            EntityKind::CurveOnSurface(_) => 142,
            EntityKind::TrimmedSurface(_) => 144,
            EntityKind::SubfigureDefinition(_) => 308,
            EntityKind::ColorDefinition(_) => 314,
            EntityKind::Associativity(_) => 402,
            EntityKind::Property(_) => 406,
            EntityKind::SubfigureInstance(_) => 408,
            EntityKind::Null(n) => n.type_code,
        }
    }

    /// Human-readable kind name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            EntityKind::CircularArc(_) => "Circular Arc",
            EntityKind::CompositeCurve(_) => "Composite Curve",
            EntityKind::ConicArc(_) => "Conic Arc",
            EntityKind::Line(_) => "Line",
            EntityKind::SurfaceOfRevolution(_) => "Surface of Revolution",
            EntityKind::TransformationMatrix(_) => "Transformation Matrix",
            EntityKind::RationalBSplineCurve(_) => "Rational B-Spline Curve",
            EntityKind::RationalBSplineSurface(_) => "Rational B-Spline Surface",
            EntityKind::CurveOnSurface(_) => "Curve on Parametric Surface",
            EntityKind::TrimmedSurface(_) => "Trimmed Parametric Surface",
            EntityKind::SubfigureDefinition(_) => "Subfigure Definition",
            EntityKind::ColorDefinition(_) => "Color Definition",
            EntityKind::Associativity(_) => "Associativity Instance",
            EntityKind::Property(_) => "Property",
            EntityKind::SubfigureInstance(_) => "Singular Subfigure Instance",
            EntityKind::Null(_) => "Null",
        }
    }

    /// Geometry-class entities forbid a structure pointer and ignore
    /// hierarchy changes.
    pub fn is_geometric(&self) -> bool {
        matches!(
            self,
            EntityKind::CircularArc(_)
                | EntityKind::CompositeCurve(_)
                | EntityKind::ConicArc(_)
                | EntityKind::Line(_)
                | EntityKind::SurfaceOfRevolution(_)
                | EntityKind::RationalBSplineCurve(_)
                | EntityKind::RationalBSplineSurface(_)
                | EntityKind::CurveOnSurface(_)
                | EntityKind::TrimmedSurface(_)
        )
    }

    fn read_pd(
        &mut self,
        scan: &mut ParameterScanner<'_>,
    ) -> Result<(), crate::codec::params::ParameterError> {
        match self {
            EntityKind::CircularArc(k) => k.read_pd(scan),
            EntityKind::CompositeCurve(k) => k.read_pd(scan),
            EntityKind::ConicArc(k) => k.read_pd(scan),
            EntityKind::Line(k) => k.read_pd(scan),
            EntityKind::SurfaceOfRevolution(k) => k.read_pd(scan),
            EntityKind::TransformationMatrix(k) => k.read_pd(scan),
            EntityKind::RationalBSplineCurve(k) => k.read_pd(scan),
            EntityKind::RationalBSplineSurface(k) => k.read_pd(scan),
            EntityKind::CurveOnSurface(k) => k.read_pd(scan),
            EntityKind::TrimmedSurface(k) => k.read_pd(scan),
            EntityKind::SubfigureDefinition(k) => k.read_pd(scan),
            EntityKind::ColorDefinition(k) => k.read_pd(scan),
            EntityKind::Associativity(k) => k.read_pd(scan),
            EntityKind::Property(k) => k.read_pd(scan),
            EntityKind::SubfigureInstance(k) => k.read_pd(scan),
            EntityKind::Null(_) => Ok(()),
        }
    }

    fn write_pd(&self, b: &mut ParameterBuilder, enc: &PointerEncoder<'_>) {
        match self {
            EntityKind::CircularArc(k) => k.write_pd(b),
            EntityKind::CompositeCurve(k) => k.write_pd(b, enc),
            EntityKind::ConicArc(k) => k.write_pd(b),
            EntityKind::Line(k) => k.write_pd(b),
            EntityKind::SurfaceOfRevolution(k) => k.write_pd(b, enc),
            EntityKind::TransformationMatrix(k) => k.write_pd(b),
            EntityKind::RationalBSplineCurve(k) => k.write_pd(b),
            EntityKind::RationalBSplineSurface(k) => k.write_pd(b),
            EntityKind::CurveOnSurface(k) => k.write_pd(b, enc),
            EntityKind::TrimmedSurface(k) => k.write_pd(b, enc),
            EntityKind::SubfigureDefinition(k) => k.write_pd(b, enc),
            EntityKind::ColorDefinition(k) => k.write_pd(b),
            EntityKind::Associativity(k) => k.write_pd(b),
            EntityKind::Property(k) => k.write_pd(b),
            EntityKind::SubfigureInstance(k) => k.write_pd(b, enc),
            EntityKind::Null(_) => {}
        }
    }

    fn associate(
        &mut self,
        ctx: &ResolveCtx<'_>,
        linked: &mut Vec<EntityId>,
    ) -> IgesResult<()> {
        match self {
            EntityKind::CompositeCurve(k) => k.associate(ctx, linked),
            EntityKind::SurfaceOfRevolution(k) => k.associate(ctx, linked),
            EntityKind::CurveOnSurface(k) => k.associate(ctx, linked),
            EntityKind::TrimmedSurface(k) => k.associate(ctx, linked),
            EntityKind::SubfigureDefinition(k) => k.associate(ctx, linked),
            EntityKind::SubfigureInstance(k) => k.associate(ctx, linked),
            _ => Ok(()),
        }
    }

    fn unlink(&mut self, child: EntityId) -> bool {
        match self {
            EntityKind::CompositeCurve(k) => k.unlink(child),
            EntityKind::SurfaceOfRevolution(k) => k.unlink(child),
            EntityKind::CurveOnSurface(k) => k.unlink(child),
            EntityKind::TrimmedSurface(k) => k.unlink(child),
            EntityKind::SubfigureDefinition(k) => k.unlink(child),
            EntityKind::SubfigureInstance(k) => k.unlink(child),
            _ => false,
        }
    }

    fn collect_children(&self, out: &mut Vec<EntityId>) {
        match self {
            EntityKind::CompositeCurve(k) => k.collect_children(out),
            EntityKind::SurfaceOfRevolution(k) => k.collect_children(out),
            EntityKind::CurveOnSurface(k) => k.collect_children(out),
            EntityKind::TrimmedSurface(k) => k.collect_children(out),
            EntityKind::SubfigureDefinition(k) => k.collect_children(out),
            EntityKind::SubfigureInstance(k) => k.collect_children(out),
            _ => {}
        }
    }

    fn rescale(&mut self, factor: f64) {
        match self {
            EntityKind::CircularArc(k) => k.rescale(factor),
            EntityKind::ConicArc(k) => k.rescale(factor),
            EntityKind::Line(k) => k.rescale(factor),
            EntityKind::TransformationMatrix(k) => k.rescale(factor),
            EntityKind::RationalBSplineCurve(k) => k.rescale(factor),
            EntityKind::RationalBSplineSurface(k) => k.rescale(factor),
            EntityKind::SubfigureInstance(k) => k.rescale(factor),
            _ => {}
        }
    }

    fn max_coordinate(&self) -> f64 {
        match self {
            EntityKind::CircularArc(k) => k.max_coordinate(),
            EntityKind::ConicArc(k) => k.max_coordinate(),
            EntityKind::Line(k) => k.max_coordinate(),
            EntityKind::TransformationMatrix(k) => k.max_coordinate(),
            EntityKind::RationalBSplineCurve(k) => k.max_coordinate(),
            EntityKind::RationalBSplineSurface(k) => k.max_coordinate(),
            EntityKind::SubfigureInstance(k) => k.max_coordinate(),
            _ => 0.0,
        }
    }

    fn missing_required(&self) -> bool {
        match self {
            EntityKind::SurfaceOfRevolution(k) => k.missing_required(),
            EntityKind::CurveOnSurface(k) => k.missing_required(),
            EntityKind::TrimmedSurface(k) => k.missing_required(),
            EntityKind::SubfigureInstance(k) => k.missing_required(),
            _ => false,
        }
    }
}

/// One entity in a model: directory entry, payload, and graph bookkeeping.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    /// Directory-entry fields
    pub de: DirectoryEntry,
    kind: EntityKind,
    /// Parents depending on this entity
    refs: Vec<EntityId>,
    /// Trailing PD pointer group 1: associativities and general notes
    associates: Vec<EntityRef>,
    /// Trailing PD pointer group 2: properties
    properties: Vec<EntityRef>,
    /// Free-text comment lines kept with the entity
    comments: Vec<String>,
    degenerate: bool,
    validity: Vec<ValidityFlag>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, de: DirectoryEntry, kind: EntityKind) -> Self {
        Self {
            id,
            de,
            kind,
            refs: Vec::new(),
            associates: Vec::new(),
            properties: Vec::new(),
            comments: Vec::new(),
            degenerate: false,
            validity: Vec::new(),
        }
    }

    /// This entity's slot in the owning model
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The IGES entity type code
    pub fn type_code(&self) -> u16 {
        self.de.entity_type
    }

    /// The DE form number
    pub fn form(&self) -> i16 {
        self.de.form
    }

    /// Short entity label, at most 8 characters on write
    pub fn label(&self) -> &str {
        &self.de.label
    }

    pub fn set_label(&mut self, label: &str) {
        if label.len() > 8 {
            log::warn!("entity label '{}' exceeds 8 characters and will be truncated", label);
        }
        self.de.label = label.to_string();
    }

    /// Entity subscript qualifying the label
    pub fn subscript(&self) -> u32 {
        self.de.subscript
    }

    pub fn set_subscript(&mut self, subscript: u32) {
        self.de.subscript = subscript;
    }

    /// Typed payload access; refused while the entity is degenerate.
    pub fn typed(&self) -> IgesResult<&EntityKind> {
        if self.degenerate {
            return Err(IgesError::Degenerate {
                sequence: self.de.parameter_data,
            });
        }
        Ok(&self.kind)
    }

    /// Mutable typed payload access; refused while the entity is degenerate.
    pub fn typed_mut(&mut self) -> IgesResult<&mut EntityKind> {
        if self.degenerate {
            return Err(IgesError::Degenerate {
                sequence: self.de.parameter_data,
            });
        }
        Ok(&mut self.kind)
    }

    pub(crate) fn kind_raw(&self) -> &EntityKind {
        &self.kind
    }

    pub(crate) fn kind_raw_mut(&mut self) -> &mut EntityKind {
        &mut self.kind
    }

    /// True when a recoverable semantic error left this entity untyped
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub(crate) fn set_degenerate(&mut self) {
        self.degenerate = true;
    }

    /// Parents that depend on this entity
    pub fn refs(&self) -> &[EntityId] {
        &self.refs
    }

    /// Install a back-reference, keeping the subordinate status consistent:
    /// a referenced entity is at least physically dependent.
    pub(crate) fn add_reference(&mut self, parent: EntityId) {
        if !self.refs.contains(&parent) {
            self.refs.push(parent);
        }
        if self.de.status.subordinate == Subordinate::Independent {
            self.de.status.subordinate = Subordinate::PhysicallyDependent;
        }
    }

    pub(crate) fn del_reference(&mut self, parent: EntityId) {
        self.refs.retain(|&r| r != parent);
    }

    /// An entity is orphaned when nothing references it but its status says
    /// it cannot stand alone, or when a required child reference has been
    /// torn out from under it.
    pub fn is_orphaned(&self) -> bool {
        (self.refs.is_empty() && self.de.status.is_subordinate())
            || self.kind.missing_required()
    }

    /// Every bound outgoing reference: DE-level, variant children, extras.
    pub(crate) fn child_ids(&self) -> Vec<EntityId> {
        let mut out = Vec::new();
        out.extend(self.de.transform.target());
        out.extend(self.de.color_def.target());
        self.kind.collect_children(&mut out);
        out.extend(self.associates.iter().filter_map(EntityRef::target));
        out.extend(self.properties.iter().filter_map(EntityRef::target));
        out
    }

    /// Outgoing edges that confer ownership: variant children and the
    /// transform chain. Extras are non-owning and may form cycles.
    pub(crate) fn owning_child_ids(&self) -> Vec<EntityId> {
        let mut out = Vec::new();
        out.extend(self.de.transform.target());
        self.kind.collect_children(&mut out);
        out
    }

    /// Clear every pointer this entity holds to `child`. Returns false when
    /// no pointer matched.
    pub(crate) fn unlink(&mut self, child: EntityId) -> bool {
        let mut hit = self.kind.unlink(child);
        if self.de.transform.target() == Some(child) {
            self.de.transform.clear();
            hit = true;
        }
        if self.de.color_def.target() == Some(child) {
            self.de.color_def.clear();
            self.de.color = 0;
            hit = true;
        }
        let extras_before = self.associates.len() + self.properties.len();
        self.associates.retain(|r| r.target() != Some(child));
        self.properties.retain(|r| r.target() != Some(child));
        hit || extras_before != self.associates.len() + self.properties.len()
    }

    /// Multiply all coordinate data by `factor`.
    pub fn rescale(&mut self, factor: f64) {
        self.kind.rescale(factor);
    }

    /// Largest coordinate magnitude this entity contributes
    pub fn max_coordinate(&self) -> f64 {
        self.kind.max_coordinate()
    }

    /// Set the hierarchy sub-field. Geometry-class entities ignore the
    /// request with a warning, which still counts as success.
    pub fn set_hierarchy(&mut self, hierarchy: Hierarchy) -> bool {
        if self.kind.is_geometric() {
            log::warn!(
                "{} entities ignore hierarchy changes",
                self.kind.type_name()
            );
            return true;
        }
        self.de.status.hierarchy = hierarchy;
        true
    }

    /// Attached property entities
    pub fn properties(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.properties.iter().filter_map(EntityRef::target)
    }

    /// Attached associativity and general-note entities
    pub fn associates(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.associates.iter().filter_map(EntityRef::target)
    }

    pub(crate) fn push_property(&mut self, property: EntityId) {
        self.properties.push(EntityRef::to(property));
    }

    pub(crate) fn push_associate(&mut self, associate: EntityId) {
        self.associates.push(EntityRef::to(associate));
    }

    /// Comment lines carried alongside the entity
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn add_comment(&mut self, comment: &str) {
        self.comments.push(comment.to_string());
    }

    pub(crate) fn attach_validity(&mut self, flag: ValidityFlag) {
        self.validity.push(flag);
    }

    /// Signal every external handle that this entity is gone.
    pub(crate) fn revoke_handles(&mut self) {
        for flag in &self.validity {
            flag.revoke();
        }
    }

    /// Parse this entity's parameter payload. Pointers stay raw integers
    /// until the associate pass.
    pub(crate) fn read_pd(&mut self, payload: &str, global: &GlobalSection) -> IgesResult<()> {
        if let EntityKind::Null(null) = &mut self.kind {
            null.raw = payload.to_string();
            return Ok(());
        }

        let mut scan = ParameterScanner::new(payload, global.delimiters);
        let leading = scan.next_int(0)?;
        if leading != self.de.entity_type as i64 {
            return Err(IgesError::Directory {
                sequence: self.de.parameter_data,
                message: format!(
                    "parameter data starts with type {} but the DE says {}",
                    leading, self.de.entity_type
                ),
            });
        }
        self.kind.read_pd(&mut scan)?;
        self.read_extras(&mut scan)?;
        scan.finish().map_err(IgesError::Parameter)
    }

    fn read_extras(&mut self, scan: &mut ParameterScanner<'_>) -> IgesResult<()> {
        if scan.terminated() {
            return Ok(());
        }
        let count = scan.next_int(0)?;
        for _ in 0..count.max(0) {
            self.associates.push(EntityRef::from_raw(scan.next_pointer()?));
        }
        if scan.terminated() {
            return Ok(());
        }
        let count = scan.next_int(0)?;
        for _ in 0..count.max(0) {
            self.properties.push(EntityRef::from_raw(scan.next_pointer()?));
        }
        Ok(())
    }

    /// Emit this entity's parameter payload with pointers re-encoded.
    pub(crate) fn format_params(
        &self,
        delims: Delimiters,
        min_resolution: f64,
        enc: &PointerEncoder<'_>,
    ) -> String {
        if let EntityKind::Null(null) = &self.kind {
            if !null.raw.is_empty() {
                return null.raw.clone();
            }
        }
        let mut b = ParameterBuilder::new(delims, min_resolution);
        b.int(self.de.entity_type as i64);
        self.kind.write_pd(&mut b, enc);
        if !self.associates.is_empty() || !self.properties.is_empty() {
            b.int(self.associates.len() as i64);
            for slot in &self.associates {
                b.pointer(enc.encode(slot));
            }
            b.int(self.properties.len() as i64);
            for slot in &self.properties {
                b.pointer(enc.encode(slot));
            }
        }
        b.finish()
    }

    /// Second-pass resolution: bind DE-level and variant pointers against
    /// the model index. Bound targets are pushed to `linked` for the caller
    /// to mirror into back-references even when a later pointer fails.
    pub(crate) fn associate(
        &mut self,
        ctx: &ResolveCtx<'_>,
        linked: &mut Vec<EntityId>,
    ) -> IgesResult<()> {
        if self.de.structure != 0 && self.kind.is_geometric() {
            log::warn!(
                "{} forbids a structure pointer; clearing the violation",
                self.kind.type_name()
            );
            self.de.structure = 0;
        }
        ctx.check_exists(self.de.structure, "structure")?;
        if self.de.line_font < 0 {
            ctx.check_exists(self.de.line_font, "line font")?;
        }
        if self.de.level < 0 {
            ctx.check_exists(self.de.level, "level")?;
        }
        ctx.check_exists(self.de.view, "view")?;
        ctx.check_exists(self.de.label_display, "label display")?;

        ctx.bind(&mut self.de.transform, Expect::Code(124), "transform", linked)?;
        if !self.de.color_def.is_null() {
            ctx.bind(&mut self.de.color_def, Expect::Code(314), "color", linked)?;
        }
        self.kind.associate(ctx, linked)?;
        for slot in &mut self.associates {
            ctx.bind(slot, Expect::Any, "associativity", linked)?;
        }
        for slot in &mut self.properties {
            ctx.bind(slot, Expect::Code(406), "property", linked)?;
        }
        Ok(())
    }
}
