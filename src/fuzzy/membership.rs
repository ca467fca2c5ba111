//! Membership functions
//!
//! Piecewise-linear shapes mapping a crisp value to a degree of truth in
//! [0, 1]. Degenerate shoulders (`a == b` or `c == d`) are allowed and give a
//! left or right "shoulder" shape that is 1 at the shoulder point.

use std::fmt;

use serde::Serialize;

use crate::error::{NetdiagError, NetdiagResult};

/// Membership function types
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", content = "params", rename_all = "lowercase")]
pub enum MembershipFunction {
    /// Triangular: (left, peak, right)
    Triangular(f64, f64, f64),
    /// Trapezoidal: (left, left_top, right_top, right)
    Trapezoidal(f64, f64, f64, f64),
}

impl MembershipFunction {
    /// Validated triangular shape
    pub fn triangular(a: f64, b: f64, c: f64) -> NetdiagResult<Self> {
        let mf = MembershipFunction::Triangular(a, b, c);
        mf.validate()?;
        Ok(mf)
    }

    /// Validated trapezoidal shape
    pub fn trapezoidal(a: f64, b: f64, c: f64, d: f64) -> NetdiagResult<Self> {
        let mf = MembershipFunction::Trapezoidal(a, b, c, d);
        mf.validate()?;
        Ok(mf)
    }

    /// Check that the control points are finite and non-decreasing
    pub fn validate(&self) -> NetdiagResult<()> {
        let params = self.params();
        let ordered = params.windows(2).all(|w| w[0] <= w[1]);
        if params.iter().all(|p| p.is_finite()) && ordered {
            Ok(())
        } else {
            Err(NetdiagError::invalid_shape(self.kind(), &params))
        }
    }

    /// Degree of membership of a crisp value
    pub fn degree(&self, x: f64) -> f64 {
        let (a, b, c, d) = match *self {
            MembershipFunction::Triangular(a, b, c) => (a, b, b, c),
            MembershipFunction::Trapezoidal(a, b, c, d) => (a, b, c, d),
        };

        if x.is_nan() || x < a || x > d {
            0.0
        } else if x < b {
            (x - a) / (b - a)
        } else if x <= c {
            1.0
        } else {
            (d - x) / (d - c)
        }
    }

    /// Get the core (where membership = 1)
    pub fn core(&self) -> (f64, f64) {
        match *self {
            MembershipFunction::Triangular(_, b, _) => (b, b),
            MembershipFunction::Trapezoidal(_, b, c, _) => (b, c),
        }
    }

    /// Get the support (where membership may be > 0)
    pub fn support(&self) -> (f64, f64) {
        match *self {
            MembershipFunction::Triangular(a, _, c) => (a, c),
            MembershipFunction::Trapezoidal(a, _, _, d) => (a, d),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            MembershipFunction::Triangular(..) => "triangular",
            MembershipFunction::Trapezoidal(..) => "trapezoidal",
        }
    }

    fn params(&self) -> Vec<f64> {
        match *self {
            MembershipFunction::Triangular(a, b, c) => vec![a, b, c],
            MembershipFunction::Trapezoidal(a, b, c, d) => vec![a, b, c, d],
        }
    }
}

impl fmt::Display for MembershipFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MembershipFunction::Triangular(a, b, c) => write!(f, "tri({}, {}, {})", a, b, c),
            MembershipFunction::Trapezoidal(a, b, c, d) => write!(f, "trap({}, {}, {}, {})", a, b, c, d),
        }
    }
}
