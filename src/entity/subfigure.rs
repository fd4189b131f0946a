//! Subfigure entities: definition (308) and singular instance (408).
//!
//! A definition owns an ordered member list and a name; an instance places
//! one definition at an offset with a uniform scale.

use crate::codec::params::{ParameterBuilder, ParameterError, ParameterScanner};
use crate::core::math::Vector3;
use crate::entity::{EntityId, EntityRef, Expect, PointerEncoder, ResolveCtx};
use crate::error::IgesResult;

/// Entity 308: subfigure definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubfigureDefinition {
    /// Nesting depth of subfigure definitions below this one
    pub depth: i64,
    /// Definition name
    pub name: String,
    /// Member entities in order
    pub members: Vec<EntityRef>,
}

impl SubfigureDefinition {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.depth = scan.next_int(0)?;
        self.name = scan.next_string()?;
        let count = scan.next_int(0)?;
        if count < 0 {
            return Err(ParameterError::Layout(format!(
                "subfigure definition reports {} members",
                count
            )));
        }
        self.members = (0..count)
            .map(|_| Ok(EntityRef::from_raw(scan.next_pointer()?)))
            .collect::<Result<_, ParameterError>>()?;
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder, enc: &PointerEncoder<'_>) {
        b.int(self.depth).string(&self.name).int(self.members.len() as i64);
        for member in &self.members {
            b.pointer(enc.encode(member));
        }
    }

    pub(crate) fn associate(
        &mut self,
        ctx: &ResolveCtx<'_>,
        linked: &mut Vec<EntityId>,
    ) -> IgesResult<()> {
        for member in &mut self.members {
            ctx.bind(member, Expect::Any, "member", linked)?;
        }
        Ok(())
    }

    pub(crate) fn unlink(&mut self, child: EntityId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.target() != Some(child));
        self.members.len() != before
    }

    pub(crate) fn collect_children(&self, out: &mut Vec<EntityId>) {
        out.extend(self.members.iter().filter_map(EntityRef::target));
    }
}

/// Entity 408: singular subfigure instance
#[derive(Debug, Clone, PartialEq)]
pub struct SubfigureInstance {
    /// The subfigure definition being placed
    pub definition: EntityRef,
    /// Placement offset
    pub offset: Vector3,
    /// Uniform scale factor
    pub scale: f64,
}

impl Default for SubfigureInstance {
    fn default() -> Self {
        Self {
            definition: EntityRef::null(),
            offset: Vector3::zeros(),
            scale: 1.0,
        }
    }
}

impl SubfigureInstance {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.definition = EntityRef::from_raw(scan.next_pointer()?);
        self.offset = Vector3::new(
            scan.next_real(0.0)?,
            scan.next_real(0.0)?,
            scan.next_real(0.0)?,
        );
        self.scale = scan.next_real(1.0)?;
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder, enc: &PointerEncoder<'_>) {
        b.pointer(enc.encode(&self.definition))
            .real(self.offset.x)
            .real(self.offset.y)
            .real(self.offset.z)
            .real(self.scale);
    }

    pub(crate) fn associate(
        &mut self,
        ctx: &ResolveCtx<'_>,
        linked: &mut Vec<EntityId>,
    ) -> IgesResult<()> {
        ctx.bind(&mut self.definition, Expect::Code(308), "definition", linked)
    }

    pub(crate) fn unlink(&mut self, child: EntityId) -> bool {
        if self.definition.target() == Some(child) {
            self.definition.clear();
            true
        } else {
            false
        }
    }

    pub(crate) fn collect_children(&self, out: &mut Vec<EntityId>) {
        out.extend(self.definition.target());
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        self.offset *= factor;
    }

    pub(crate) fn max_coordinate(&self) -> f64 {
        self.offset.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }

    pub(crate) fn missing_required(&self) -> bool {
        self.definition.is_null()
    }
}
