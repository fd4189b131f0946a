//! Entity 124: transformation matrix.
//!
//! A 3x3 rotation and a translation vector mapping entity coordinates into
//! model space: `p' = R p + T`. A transformation may itself carry a parent
//! transform through its directory entry; `placement` composes the chain.

use crate::codec::params::{ParameterBuilder, ParameterError, ParameterScanner};
use crate::core::math::{compose, Matrix3, Vector3};

#[derive(Debug, Clone, PartialEq)]
pub struct TransformationMatrix {
    pub rotation: Matrix3,
    pub translation: Vector3,
}

impl Default for TransformationMatrix {
    fn default() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }
}

impl TransformationMatrix {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        let mut rows = [[0.0f64; 4]; 3];
        for row in rows.iter_mut() {
            for value in row.iter_mut() {
                *value = scan.next_real(0.0)?;
            }
        }
        self.rotation = Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        );
        self.translation = Vector3::new(rows[0][3], rows[1][3], rows[2][3]);
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder) {
        for row in 0..3 {
            for col in 0..3 {
                b.real(self.rotation[(row, col)]);
            }
            b.real(self.translation[row]);
        }
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        self.translation *= factor;
    }

    pub(crate) fn max_coordinate(&self) -> f64 {
        self.translation
            .iter()
            .fold(0.0, |acc, v| acc.max(v.abs()))
    }

    /// The placement this matrix defines, composed under an optional parent
    /// placement.
    pub fn placement(&self, parent: Option<&TransformationMatrix>) -> (Matrix3, Vector3) {
        let own = (self.rotation, self.translation);
        match parent {
            Some(p) => compose(&(p.rotation, p.translation), &own),
            None => own,
        }
    }

    /// Apply the placement to a point expressed as a vector.
    pub fn apply(&self, point: &Vector3) -> Vector3 {
        self.rotation * point + self.translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::params::Delimiters;
    use approx::assert_relative_eq;

    #[test]
    fn test_read_row_major_with_interleaved_translation() {
        let payload = "1.0,0.0,0.0,10.0,0.0,1.0,0.0,20.0,0.0,0.0,1.0,30.0;";
        let mut t = TransformationMatrix::default();
        let mut scan = ParameterScanner::new(payload, Delimiters::default());
        t.read_pd(&mut scan).unwrap();
        assert_relative_eq!(t.rotation, Matrix3::identity());
        assert_relative_eq!(t.translation, Vector3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_placement_composes_with_parent() {
        let parent = TransformationMatrix {
            rotation: Matrix3::identity(),
            translation: Vector3::new(0.0, 0.0, 5.0),
        };
        let child = TransformationMatrix {
            rotation: Matrix3::identity(),
            translation: Vector3::new(1.0, 0.0, 0.0),
        };
        let (_, t) = child.placement(Some(&parent));
        assert_relative_eq!(t, Vector3::new(1.0, 0.0, 5.0));
    }

    #[test]
    fn test_apply() {
        let t = TransformationMatrix {
            rotation: Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            translation: Vector3::new(1.0, 0.0, 0.0),
        };
        let p = t.apply(&Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
    }
}
