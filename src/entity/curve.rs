//! Planar curve primitives: circular arc (100), conic arc (104), line (110).
//!
//! Arcs and conics live in a definition plane at depth ZT; the line is a
//! model-space segment. All three rescale their coordinates under unit
//! conversion and forbid a structure pointer.

use crate::codec::params::{ParameterBuilder, ParameterError, ParameterScanner};
use crate::core::math::{Point2, Point3};

/// Entity 100: circular arc in the XT, YT plane at depth ZT
#[derive(Debug, Clone, PartialEq)]
pub struct CircularArc {
    /// Depth of the definition plane
    pub z_depth: f64,
    /// Arc center
    pub center: Point2,
    /// Start point
    pub start: Point2,
    /// End point, counterclockwise from the start
    pub end: Point2,
}

impl Default for CircularArc {
    fn default() -> Self {
        Self {
            z_depth: 0.0,
            center: Point2::origin(),
            start: Point2::origin(),
            end: Point2::origin(),
        }
    }
}

impl CircularArc {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.z_depth = scan.next_real(0.0)?;
        self.center = Point2::new(scan.next_real(0.0)?, scan.next_real(0.0)?);
        self.start = Point2::new(scan.next_real(0.0)?, scan.next_real(0.0)?);
        self.end = Point2::new(scan.next_real(0.0)?, scan.next_real(0.0)?);
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder) {
        b.real(self.z_depth)
            .real(self.center.x)
            .real(self.center.y)
            .real(self.start.x)
            .real(self.start.y)
            .real(self.end.x)
            .real(self.end.y);
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        self.z_depth *= factor;
        self.center *= factor;
        self.start *= factor;
        self.end *= factor;
    }

    pub(crate) fn max_coordinate(&self) -> f64 {
        [
            self.z_depth,
            self.center.x,
            self.center.y,
            self.start.x,
            self.start.y,
            self.end.x,
            self.end.y,
        ]
        .iter()
        .fold(0.0, |acc, v| acc.max(v.abs()))
    }

    /// Arc radius derived from the center and start point
    pub fn radius(&self) -> f64 {
        (self.start - self.center).norm()
    }
}

/// Entity 104: conic arc defined by `A x^2 + B xy + C y^2 + D x + E y + F = 0`
#[derive(Debug, Clone, PartialEq)]
pub struct ConicArc {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    /// Depth of the definition plane
    pub z_depth: f64,
    /// Start point
    pub start: Point2,
    /// End point
    pub end: Point2,
}

impl Default for ConicArc {
    fn default() -> Self {
        Self {
            a: 0.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
            z_depth: 0.0,
            start: Point2::origin(),
            end: Point2::origin(),
        }
    }
}

impl ConicArc {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.a = scan.next_real(0.0)?;
        self.b = scan.next_real(0.0)?;
        self.c = scan.next_real(0.0)?;
        self.d = scan.next_real(0.0)?;
        self.e = scan.next_real(0.0)?;
        self.f = scan.next_real(0.0)?;
        self.z_depth = scan.next_real(0.0)?;
        self.start = Point2::new(scan.next_real(0.0)?, scan.next_real(0.0)?);
        self.end = Point2::new(scan.next_real(0.0)?, scan.next_real(0.0)?);
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder) {
        b.real(self.a)
            .real(self.b)
            .real(self.c)
            .real(self.d)
            .real(self.e)
            .real(self.f)
            .real(self.z_depth)
            .real(self.start.x)
            .real(self.start.y)
            .real(self.end.x)
            .real(self.end.y);
    }

    /// Substituting `x -> x/s, y -> y/s` and clearing denominators keeps the
    /// quadratic coefficients fixed and scales the linear and constant terms.
    pub(crate) fn rescale(&mut self, factor: f64) {
        self.d *= factor;
        self.e *= factor;
        self.f *= factor * factor;
        self.z_depth *= factor;
        self.start *= factor;
        self.end *= factor;
    }

    pub(crate) fn max_coordinate(&self) -> f64 {
        [
            self.z_depth,
            self.start.x,
            self.start.y,
            self.end.x,
            self.end.y,
        ]
        .iter()
        .fold(0.0, |acc, v| acc.max(v.abs()))
    }
}

/// Entity 110: line from a start point to an end point
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub start: Point3,
    pub end: Point3,
}

impl Default for Line {
    fn default() -> Self {
        Self {
            start: Point3::origin(),
            end: Point3::origin(),
        }
    }
}

impl Line {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.start = Point3::new(
            scan.next_real(0.0)?,
            scan.next_real(0.0)?,
            scan.next_real(0.0)?,
        );
        self.end = Point3::new(
            scan.next_real(0.0)?,
            scan.next_real(0.0)?,
            scan.next_real(0.0)?,
        );
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder) {
        b.real(self.start.x)
            .real(self.start.y)
            .real(self.start.z)
            .real(self.end.x)
            .real(self.end.y)
            .real(self.end.z);
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        self.start *= factor;
        self.end *= factor;
    }

    pub(crate) fn max_coordinate(&self) -> f64 {
        [
            self.start.x,
            self.start.y,
            self.start.z,
            self.end.x,
            self.end.y,
            self.end.z,
        ]
        .iter()
        .fold(0.0, |acc, v| acc.max(v.abs()))
    }

    /// Segment length
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::params::Delimiters;
    use approx::assert_relative_eq;

    fn scan(payload: &str) -> ParameterScanner<'_> {
        ParameterScanner::new(payload, Delimiters::default())
    }

    #[test]
    fn test_line_read() {
        let mut line = Line::default();
        let mut s = scan("0.0,0.0,0.0,1.0,2.0,3.0;");
        line.read_pd(&mut s).unwrap();
        assert_relative_eq!(line.end, Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(line.length(), 14.0_f64.sqrt());
    }

    #[test]
    fn test_arc_rescale_composes() {
        let mut a = CircularArc {
            z_depth: 1.0,
            center: Point2::new(1.0, 1.0),
            start: Point2::new(2.0, 1.0),
            end: Point2::new(1.0, 2.0),
        };
        let mut b = a.clone();

        a.rescale(2.0);
        a.rescale(3.0);
        b.rescale(6.0);
        assert_relative_eq!(a.center, b.center);
        assert_relative_eq!(a.radius(), b.radius());
    }

    #[test]
    fn test_conic_rescale_preserves_incidence() {
        // unit circle: x^2 + y^2 - 1 = 0 through (1, 0)
        let mut conic = ConicArc {
            a: 1.0,
            c: 1.0,
            f: -1.0,
            start: Point2::new(1.0, 0.0),
            end: Point2::new(0.0, 1.0),
            ..ConicArc::default()
        };
        conic.rescale(2.0);
        // scaled start point must still satisfy the scaled equation
        let p = conic.start;
        let residual = conic.a * p.x * p.x
            + conic.b * p.x * p.y
            + conic.c * p.y * p.y
            + conic.d * p.x
            + conic.e * p.y
            + conic.f;
        assert_relative_eq!(residual, 0.0, epsilon = 1e-12);
    }
}
