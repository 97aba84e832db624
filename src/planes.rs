//! Contains the value types describing the two planes the engine works
//! in: the complex cartesian plane, where every evaluation happens, and
//! the integral grid plane, where every result lands.  A point on the
//! complex plane is a `ComplexPoint`; a cell of the output grid is a
//! `GridIndex`.
//!
//! `ComplexPoint` is generic over its scalar so that the same
//! arithmetic serves both the fast `f64` path and the
//! arbitrary-precision `rug::Float` path used for deep zooms.  The
//! `Scalar` trait is the whole contract between the two.

use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

use rug::Float;

/// The numeric contract shared by the fixed-precision and the
/// arbitrary-precision representations.  Construction goes through an
/// existing value (`zero_like`, `with_value`) so that a `rug::Float`
/// can carry its precision along without a separate context object.
pub trait Scalar: Clone + PartialOrd + Debug {
    /// A zero with the same precision as `self`.
    fn zero_like(&self) -> Self;
    /// `value`, converted at the same precision as `self`.
    fn with_value(&self, value: f64) -> Self;
    /// `self + rhs`.
    fn add(&self, rhs: &Self) -> Self;
    /// `self - rhs`.
    fn sub(&self, rhs: &Self) -> Self;
    /// `self * rhs`.
    fn mul(&self, rhs: &Self) -> Self;
    /// The non-negative square root.
    fn sqrt(&self) -> Self;
    /// Lossy conversion back to `f64`.
    fn to_f64(&self) -> f64;
}

impl Scalar for f64 {
    fn zero_like(&self) -> Self {
        0.0
    }
    fn with_value(&self, value: f64) -> Self {
        value
    }
    fn add(&self, rhs: &Self) -> Self {
        self + rhs
    }
    fn sub(&self, rhs: &Self) -> Self {
        self - rhs
    }
    fn mul(&self, rhs: &Self) -> Self {
        self * rhs
    }
    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }
    fn to_f64(&self) -> f64 {
        *self
    }
}

impl Scalar for Float {
    fn zero_like(&self) -> Self {
        Float::with_val(self.prec(), 0.0)
    }
    fn with_value(&self, value: f64) -> Self {
        Float::with_val(self.prec(), value)
    }
    fn add(&self, rhs: &Self) -> Self {
        Float::with_val(self.prec(), self + rhs)
    }
    fn sub(&self, rhs: &Self) -> Self {
        Float::with_val(self.prec(), self - rhs)
    }
    fn mul(&self, rhs: &Self) -> Self {
        Float::with_val(self.prec(), self * rhs)
    }
    fn sqrt(&self) -> Self {
        Float::with_val(self.prec(), self.sqrt_ref())
    }
    fn to_f64(&self) -> f64 {
        Float::to_f64(self)
    }
}

/// A point on the complex cartesian plane, treating the real part as
/// the x-component and the imaginary part as the y-component.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComplexPoint<T> {
    /// The real (x) component.
    pub re: T,
    /// The imaginary (y) component.
    pub im: T,
}

impl<T> ComplexPoint<T> {
    /// Constructor.
    pub fn new(re: T, im: T) -> Self {
        ComplexPoint { re, im }
    }
}

impl<T: Scalar> ComplexPoint<T> {
    /// Component-wise sum.
    pub fn add(&self, rhs: &Self) -> Self {
        ComplexPoint {
            re: self.re.add(&rhs.re),
            im: self.im.add(&rhs.im),
        }
    }

    /// Component-wise difference.
    pub fn sub(&self, rhs: &Self) -> Self {
        ComplexPoint {
            re: self.re.sub(&rhs.re),
            im: self.im.sub(&rhs.im),
        }
    }

    /// Complex multiplication.
    pub fn mul(&self, rhs: &Self) -> Self {
        ComplexPoint {
            re: self.re.mul(&rhs.re).sub(&self.im.mul(&rhs.im)),
            im: self.re.mul(&rhs.im).add(&self.im.mul(&rhs.re)),
        }
    }

    /// The squared distance from the origin.  The escape tests compare
    /// this against a squared threshold so the square root is never
    /// taken on the hot path.
    pub fn magnitude_squared(&self) -> T {
        self.re.mul(&self.re).add(&self.im.mul(&self.im))
    }

    /// The distance from the origin.
    pub fn magnitude(&self) -> T {
        self.magnitude_squared().sqrt()
    }

    /// Lossy conversion back to the fixed-precision representation.
    pub fn collapse(&self) -> ComplexPoint<f64> {
        ComplexPoint {
            re: self.re.to_f64(),
            im: self.im.to_f64(),
        }
    }
}

impl ComplexPoint<f64> {
    /// Lifts this point into the arbitrary-precision representation at
    /// the given precision, in bits.
    pub fn promote(&self, precision: u32) -> ComplexPoint<Float> {
        ComplexPoint {
            re: Float::with_val(precision, self.re),
            im: Float::with_val(precision, self.im),
        }
    }
}

impl Copy for ComplexPoint<f64> {}

impl Add for ComplexPoint<f64> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        ComplexPoint::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for ComplexPoint<f64> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        ComplexPoint::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for ComplexPoint<f64> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        ComplexPoint::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// Describes the column and row of a cell in the output grid.  Both
/// are non-negative, and the grid's origin sits at (0, 0) in its
/// lower-left corner.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GridIndex(pub usize, pub usize);

impl GridIndex {
    /// The column (x) component.
    pub fn column(&self) -> usize {
        self.0
    }

    /// The row (y) component.
    pub fn row(&self) -> usize {
        self.1
    }
}

impl Add for GridIndex {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        GridIndex(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl Sub for GridIndex {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        GridIndex(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl Mul<usize> for GridIndex {
    type Output = Self;
    fn mul(self, rhs: usize) -> Self {
        GridIndex(self.0 * rhs, self.1 * rhs)
    }
}
