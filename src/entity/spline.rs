//! Rational B-spline entities: curve (126) and surface (128).

use crate::codec::params::{ParameterBuilder, ParameterError, ParameterScanner};
use crate::core::math::{Point3, Vector3};

/// Entity 126: rational B-spline curve
///
/// `upper_index` is K, the upper index of the control-point sum; `degree` is
/// M. The knot sequence holds K+M+2 values, the weight list K+1, and the
/// control net K+1 points.
#[derive(Debug, Clone, PartialEq)]
pub struct RationalBSplineCurve {
    pub upper_index: i64,
    pub degree: i64,
    pub planar: bool,
    pub closed: bool,
    pub polynomial: bool,
    pub periodic: bool,
    pub knots: Vec<f64>,
    pub weights: Vec<f64>,
    pub control_points: Vec<Point3>,
    /// Parameter range
    pub v0: f64,
    pub v1: f64,
    /// Unit normal of the definition plane, meaningful when `planar`
    pub normal: Vector3,
}

impl Default for RationalBSplineCurve {
    fn default() -> Self {
        Self {
            upper_index: 0,
            degree: 0,
            planar: false,
            closed: false,
            polynomial: false,
            periodic: false,
            knots: Vec::new(),
            weights: Vec::new(),
            control_points: Vec::new(),
            v0: 0.0,
            v1: 0.0,
            normal: Vector3::zeros(),
        }
    }
}

impl RationalBSplineCurve {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.upper_index = scan.next_int(0)?;
        self.degree = scan.next_int(0)?;
        if self.upper_index < 0 || self.degree < 0 || self.upper_index < self.degree {
            return Err(ParameterError::Layout(format!(
                "B-spline curve indices K={} M={} are inconsistent",
                self.upper_index, self.degree
            )));
        }
        self.planar = scan.next_logical(false)?;
        self.closed = scan.next_logical(false)?;
        self.polynomial = scan.next_logical(false)?;
        self.periodic = scan.next_logical(false)?;

        let k = self.upper_index as usize;
        let m = self.degree as usize;
        self.knots = read_reals(scan, k + m + 2)?;
        self.weights = read_reals(scan, k + 1)?;
        self.control_points = (0..=k)
            .map(|_| {
                Ok(Point3::new(
                    scan.next_real(0.0)?,
                    scan.next_real(0.0)?,
                    scan.next_real(0.0)?,
                ))
            })
            .collect::<Result<_, ParameterError>>()?;
        self.v0 = scan.next_real(0.0)?;
        self.v1 = scan.next_real(0.0)?;

        // The plane normal trails the range and may be omitted entirely.
        let nx = if scan.terminated() { 0.0 } else { scan.next_real(0.0)? };
        let ny = if scan.terminated() { 0.0 } else { scan.next_real(0.0)? };
        let nz = if scan.terminated() { 0.0 } else { scan.next_real(0.0)? };
        self.normal = Vector3::new(nx, ny, nz);
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder) {
        b.int(self.upper_index)
            .int(self.degree)
            .logical(self.planar)
            .logical(self.closed)
            .logical(self.polynomial)
            .logical(self.periodic);
        for knot in &self.knots {
            b.real(*knot);
        }
        for weight in &self.weights {
            b.real(*weight);
        }
        for point in &self.control_points {
            b.real(point.x).real(point.y).real(point.z);
        }
        b.real(self.v0).real(self.v1);
        if self.planar {
            b.real(self.normal.x).real(self.normal.y).real(self.normal.z);
        }
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        for point in &mut self.control_points {
            *point *= factor;
        }
    }

    pub(crate) fn max_coordinate(&self) -> f64 {
        self.control_points.iter().fold(0.0, |acc, p| {
            acc.max(p.x.abs()).max(p.y.abs()).max(p.z.abs())
        })
    }
}

/// Entity 128: rational B-spline surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RationalBSplineSurface {
    /// Upper control-net indices in U and V
    pub upper_index_u: i64,
    pub upper_index_v: i64,
    /// Degrees in U and V
    pub degree_u: i64,
    pub degree_v: i64,
    pub closed_u: bool,
    pub closed_v: bool,
    pub polynomial: bool,
    pub periodic_u: bool,
    pub periodic_v: bool,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    /// Row-major (K1+1) x (K2+1) weight grid
    pub weights: Vec<f64>,
    /// Row-major control net
    pub control_points: Vec<Point3>,
    pub u0: f64,
    pub u1: f64,
    pub v0: f64,
    pub v1: f64,
}

impl RationalBSplineSurface {
    pub(crate) fn read_pd(&mut self, scan: &mut ParameterScanner<'_>) -> Result<(), ParameterError> {
        self.upper_index_u = scan.next_int(0)?;
        self.upper_index_v = scan.next_int(0)?;
        self.degree_u = scan.next_int(0)?;
        self.degree_v = scan.next_int(0)?;
        if self.upper_index_u < 0
            || self.upper_index_v < 0
            || self.degree_u < 0
            || self.degree_v < 0
            || self.upper_index_u < self.degree_u
            || self.upper_index_v < self.degree_v
        {
            return Err(ParameterError::Layout(format!(
                "B-spline surface indices K1={} K2={} M1={} M2={} are inconsistent",
                self.upper_index_u, self.upper_index_v, self.degree_u, self.degree_v
            )));
        }
        self.closed_u = scan.next_logical(false)?;
        self.closed_v = scan.next_logical(false)?;
        self.polynomial = scan.next_logical(false)?;
        self.periodic_u = scan.next_logical(false)?;
        self.periodic_v = scan.next_logical(false)?;

        let k1 = self.upper_index_u as usize;
        let k2 = self.upper_index_v as usize;
        let m1 = self.degree_u as usize;
        let m2 = self.degree_v as usize;
        self.knots_u = read_reals(scan, k1 + m1 + 2)?;
        self.knots_v = read_reals(scan, k2 + m2 + 2)?;
        let net = (k1 + 1) * (k2 + 1);
        self.weights = read_reals(scan, net)?;
        self.control_points = (0..net)
            .map(|_| {
                Ok(Point3::new(
                    scan.next_real(0.0)?,
                    scan.next_real(0.0)?,
                    scan.next_real(0.0)?,
                ))
            })
            .collect::<Result<_, ParameterError>>()?;
        self.u0 = scan.next_real(0.0)?;
        self.u1 = scan.next_real(0.0)?;
        self.v0 = scan.next_real(0.0)?;
        self.v1 = scan.next_real(0.0)?;
        Ok(())
    }

    pub(crate) fn write_pd(&self, b: &mut ParameterBuilder) {
        b.int(self.upper_index_u)
            .int(self.upper_index_v)
            .int(self.degree_u)
            .int(self.degree_v)
            .logical(self.closed_u)
            .logical(self.closed_v)
            .logical(self.polynomial)
            .logical(self.periodic_u)
            .logical(self.periodic_v);
        for knot in self.knots_u.iter().chain(&self.knots_v) {
            b.real(*knot);
        }
        for weight in &self.weights {
            b.real(*weight);
        }
        for point in &self.control_points {
            b.real(point.x).real(point.y).real(point.z);
        }
        b.real(self.u0).real(self.u1).real(self.v0).real(self.v1);
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        for point in &mut self.control_points {
            *point *= factor;
        }
    }

    pub(crate) fn max_coordinate(&self) -> f64 {
        self.control_points.iter().fold(0.0, |acc, p| {
            acc.max(p.x.abs()).max(p.y.abs()).max(p.z.abs())
        })
    }
}

fn read_reals(
    scan: &mut ParameterScanner<'_>,
    count: usize,
) -> Result<Vec<f64>, ParameterError> {
    (0..count).map(|_| scan.next_real(0.0)).collect()
}
