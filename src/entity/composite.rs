//! Entity 102: composite curve, an ordered chain of constituent curves.

use crate::codec::params::{ParameterBuilder, ParameterError, ParameterScanner};
use crate::entity::{EntityId, EntityRef, Expect, PointerEncoder, ResolveCtx};
use crate::error::IgesResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeCurve {
    /// Constituents in parametric order
    pub segments: Vec<EntityRef>,
}

impl CompositeCurve {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        let count = scan.next_int(0)?;
        if count < 0 {
            return Err(ParameterError::Layout(format!(
                "composite curve reports {} segments",
                count
            )));
        }
        self.segments = (0..count)
            .map(|_| Ok(EntityRef::from_raw(scan.next_pointer()?)))
            .collect::<Result<_, ParameterError>>()?;
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder, enc: &PointerEncoder<'_>) {
        b.int(self.segments.len() as i64);
        for segment in &self.segments {
            b.pointer(enc.encode(segment));
        }
    }

    pub(crate) fn associate(
        &mut self,
        ctx: &ResolveCtx<'_>,
        linked: &mut Vec<EntityId>,
    ) -> IgesResult<()> {
        for segment in &mut self.segments {
            ctx.bind(segment, Expect::Curve, "segment", linked)?;
        }
        Ok(())
    }

    pub(crate) fn unlink(&mut self, child: EntityId) -> bool {
        let before = self.segments.len();
        self.segments.retain(|s| s.target() != Some(child));
        self.segments.len() != before
    }

    pub(crate) fn collect_children(&self, out: &mut Vec<EntityId>) {
        out.extend(self.segments.iter().filter_map(EntityRef::target));
    }

    /// Number of constituent curves
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}
