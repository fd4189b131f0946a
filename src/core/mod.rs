//! Foundational math, precision, and unit handling for the IGES engine.

pub mod math;
pub mod precision;
pub mod units;

pub use math::{Matrix3, Point2, Point3, Vector2, Vector3};
pub use precision::{ApproxEq, EPSILON, EPSILON_FINE, EPSILON_NORMAL, EPSILON_ROUGH};
pub use units::Unit;
