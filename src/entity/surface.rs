//! Surface-structure entities: surface of revolution (120), curve on a
//! parametric surface (142), and trimmed parametric surface (144).
//!
//! These variants exist to tie curves and surfaces together, so most of
//! their parameters are pointers resolved in the associate pass.

use crate::codec::params::{ParameterBuilder, ParameterError, ParameterScanner};
use crate::entity::{EntityId, EntityRef, Expect, PointerEncoder, ResolveCtx};
use crate::error::IgesResult;

/// How the curve on the surface was created (142 CRTN field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveCreation {
    #[default]
    Unspecified,
    Projection,
    Intersection,
    Isoparametric,
}

impl CurveCreation {
    fn from_field(value: i64) -> Self {
        match value {
            1 => CurveCreation::Projection,
            2 => CurveCreation::Intersection,
            3 => CurveCreation::Isoparametric,
            _ => CurveCreation::Unspecified,
        }
    }

    fn to_field(self) -> i64 {
        match self {
            CurveCreation::Unspecified => 0,
            CurveCreation::Projection => 1,
            CurveCreation::Intersection => 2,
            CurveCreation::Isoparametric => 3,
        }
    }
}

/// Which curve representation the receiving system should prefer (142 PREF)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryPreference {
    #[default]
    Unspecified,
    Parametric,
    ModelSpace,
    Equal,
}

impl BoundaryPreference {
    fn from_field(value: i64) -> Self {
        match value {
            1 => BoundaryPreference::Parametric,
            2 => BoundaryPreference::ModelSpace,
            3 => BoundaryPreference::Equal,
            _ => BoundaryPreference::Unspecified,
        }
    }

    fn to_field(self) -> i64 {
        match self {
            BoundaryPreference::Unspecified => 0,
            BoundaryPreference::Parametric => 1,
            BoundaryPreference::ModelSpace => 2,
            BoundaryPreference::Equal => 3,
        }
    }
}

/// Entity 120: surface generated by revolving a curve about an axis line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceOfRevolution {
    /// Axis of revolution, an entity 110 line
    pub axis: EntityRef,
    /// Generatrix curve
    pub generatrix: EntityRef,
    /// Start angle in radians
    pub start_angle: f64,
    /// Terminate angle in radians
    pub end_angle: f64,
}

impl SurfaceOfRevolution {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.axis = EntityRef::from_raw(scan.next_pointer()?);
        self.generatrix = EntityRef::from_raw(scan.next_pointer()?);
        self.start_angle = scan.next_real(0.0)?;
        self.end_angle = scan.next_real(std::f64::consts::TAU)?;
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder, enc: &PointerEncoder<'_>) {
        b.pointer(enc.encode(&self.axis))
            .pointer(enc.encode(&self.generatrix))
            .real(self.start_angle)
            .real(self.end_angle);
    }

    pub(crate) fn associate(
        &mut self,
        ctx: &ResolveCtx<'_>,
        linked: &mut Vec<EntityId>,
    ) -> IgesResult<()> {
        ctx.bind(&mut self.axis, Expect::Code(110), "axis", linked)?;
        ctx.bind(&mut self.generatrix, Expect::Curve, "generatrix", linked)?;
        Ok(())
    }

    pub(crate) fn unlink(&mut self, child: EntityId) -> bool {
        let mut hit = false;
        if self.axis.target() == Some(child) {
            self.axis.clear();
            hit = true;
        }
        if self.generatrix.target() == Some(child) {
            self.generatrix.clear();
            hit = true;
        }
        hit
    }

    pub(crate) fn collect_children(&self, out: &mut Vec<EntityId>) {
        out.extend(self.axis.target());
        out.extend(self.generatrix.target());
    }

    pub(crate) fn missing_required(&self) -> bool {
        self.axis.is_null() || self.generatrix.is_null()
    }
}

/// Entity 142: curve on a parametric surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveOnSurface {
    pub creation: CurveCreation,
    /// The surface the curve lies on
    pub surface: EntityRef,
    /// The curve in the surface's parameter space
    pub parameter_curve: EntityRef,
    /// The curve in model space
    pub model_curve: EntityRef,
    pub preference: BoundaryPreference,
}

impl CurveOnSurface {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.creation = CurveCreation::from_field(scan.next_int(0)?);
        self.surface = EntityRef::from_raw(scan.next_pointer()?);
        self.parameter_curve = EntityRef::from_raw(scan.next_pointer()?);
        self.model_curve = EntityRef::from_raw(scan.next_pointer()?);
        self.preference = BoundaryPreference::from_field(scan.next_int(0)?);
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder, enc: &PointerEncoder<'_>) {
        b.int(self.creation.to_field())
            .pointer(enc.encode(&self.surface))
            .pointer(enc.encode(&self.parameter_curve))
            .pointer(enc.encode(&self.model_curve))
            .int(self.preference.to_field());
    }

    pub(crate) fn associate(
        &mut self,
        ctx: &ResolveCtx<'_>,
        linked: &mut Vec<EntityId>,
    ) -> IgesResult<()> {
        ctx.bind(&mut self.surface, Expect::Surface, "surface", linked)?;
        ctx.bind(&mut self.parameter_curve, Expect::Curve, "parameter curve", linked)?;
        ctx.bind(&mut self.model_curve, Expect::Curve, "model curve", linked)?;
        Ok(())
    }

    pub(crate) fn unlink(&mut self, child: EntityId) -> bool {
        let mut hit = false;
        for slot in [
            &mut self.surface,
            &mut self.parameter_curve,
            &mut self.model_curve,
        ] {
            if slot.target() == Some(child) {
                slot.clear();
                hit = true;
            }
        }
        hit
    }

    pub(crate) fn collect_children(&self, out: &mut Vec<EntityId>) {
        out.extend(self.surface.target());
        out.extend(self.parameter_curve.target());
        out.extend(self.model_curve.target());
    }

    pub(crate) fn missing_required(&self) -> bool {
        self.surface.is_null()
    }
}

/// Entity 144: surface trimmed by curves on it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrimmedSurface {
    /// The surface being trimmed
    pub surface: EntityRef,
    /// Whether the outer boundary differs from the surface's natural one
    pub outer_is_boundary: bool,
    /// Outer boundary, an entity 142; null means the natural boundary
    pub outer: EntityRef,
    /// Inner closed boundaries, each an entity 142
    pub inner: Vec<EntityRef>,
}

impl TrimmedSurface {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.surface = EntityRef::from_raw(scan.next_pointer()?);
        self.outer_is_boundary = scan.next_logical(false)?;
        let inner_count = scan.next_int(0)?;
        if inner_count < 0 {
            return Err(ParameterError::Layout(format!(
                "trimmed surface reports {} inner boundaries",
                inner_count
            )));
        }
        self.outer = EntityRef::from_raw(scan.next_pointer()?);
        self.inner = (0..inner_count)
            .map(|_| Ok(EntityRef::from_raw(scan.next_pointer()?)))
            .collect::<Result<_, ParameterError>>()?;
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder, enc: &PointerEncoder<'_>) {
        b.pointer(enc.encode(&self.surface))
            .logical(self.outer_is_boundary)
            .int(self.inner.len() as i64)
            .pointer(enc.encode(&self.outer));
        for boundary in &self.inner {
            b.pointer(enc.encode(boundary));
        }
    }

    pub(crate) fn associate(
        &mut self,
        ctx: &ResolveCtx<'_>,
        linked: &mut Vec<EntityId>,
    ) -> IgesResult<()> {
        ctx.bind(&mut self.surface, Expect::Surface, "surface", linked)?;
        ctx.bind(&mut self.outer, Expect::Code(142), "outer boundary", linked)?;
        for boundary in &mut self.inner {
            ctx.bind(boundary, Expect::Code(142), "inner boundary", linked)?;
        }
        Ok(())
    }

    pub(crate) fn unlink(&mut self, child: EntityId) -> bool {
        let mut hit = false;
        if self.surface.target() == Some(child) {
            self.surface.clear();
            hit = true;
        }
        if self.outer.target() == Some(child) {
            self.outer.clear();
            hit = true;
        }
        for boundary in &mut self.inner {
            if boundary.target() == Some(child) {
                boundary.clear();
                hit = true;
            }
        }
        self.inner.retain(|b| !b.is_null());
        hit
    }

    pub(crate) fn collect_children(&self, out: &mut Vec<EntityId>) {
        out.extend(self.surface.target());
        out.extend(self.outer.target());
        out.extend(self.inner.iter().filter_map(EntityRef::target));
    }

    pub(crate) fn missing_required(&self) -> bool {
        self.surface.is_null()
    }
}
