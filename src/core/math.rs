//! Mathematics module - vectors, matrices, and points for IGES geometry,
//! built on top of nalgebra for performance and correctness.

use nalgebra::{
    Matrix3 as NalMatrix3, Point2 as NalPoint2, Point3 as NalPoint3, Vector2 as NalVector2,
    Vector3 as NalVector3,
};

/// 2D vector (using nalgebra)
pub type Vector2 = NalVector2<f64>;

/// 3D vector (using nalgebra)
pub type Vector3 = NalVector3<f64>;

/// 3x3 matrix (using nalgebra)
pub type Matrix3 = NalMatrix3<f64>;

/// 2D point (using nalgebra)
pub type Point2 = NalPoint2<f64>;

/// 3D point (using nalgebra)
pub type Point3 = NalPoint3<f64>;

/// Compose two rigid placements `(R, T)` where each maps `p -> R p + T`.
/// The result applies `child` first, then `parent`.
pub fn compose(parent: &(Matrix3, Vector3), child: &(Matrix3, Vector3)) -> (Matrix3, Vector3) {
    (parent.0 * child.0, parent.0 * child.1 + parent.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_translation() {
        let a = (Matrix3::identity(), Vector3::new(1.0, 0.0, 0.0));
        let b = (Matrix3::identity(), Vector3::new(0.0, 2.0, 0.0));
        let (r, t) = compose(&a, &b);
        assert_relative_eq!(r, Matrix3::identity());
        assert_relative_eq!(t, Vector3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_compose_rotation_then_translation() {
        // parent rotates +90 degrees about Z
        let rot = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let parent = (rot, Vector3::new(0.0, 0.0, 5.0));
        let child = (Matrix3::identity(), Vector3::new(1.0, 0.0, 0.0));
        let (_, t) = compose(&parent, &child);
        assert_relative_eq!(t, Vector3::new(0.0, 1.0, 5.0), epsilon = 1e-12);
    }
}
