use ndarray::{NdFloat, ScalarOperand};

use num_traits::FromPrimitive;
use rand::distr::uniform::SampleUniform;

use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

mod point;

pub use point::{normalize, Class, Point};

/// Scalar type shared by the model, the trainer and the rasterizer.
pub trait Float:
    NdFloat
    + FromPrimitive
    + Default
    + Sum
    + for<'a> AddAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> DivAssign<&'a Self>
    + SampleUniform
    + ScalarOperand
    + std::marker::Unpin
{
    /// Converts an `f64` constant into this type.
    fn lit(x: f64) -> Self;

    /// Converts a count (sample count, epoch, grid index) into this type.
    fn from_count(n: usize) -> Self {
        Self::lit(n as f64)
    }

    fn to_f64_lossy(self) -> f64;
}

impl Float for f32 {
    fn lit(x: f64) -> Self {
        x as f32
    }

    fn to_f64_lossy(self) -> f64 {
        self as f64
    }
}

impl Float for f64 {
    fn lit(x: f64) -> Self {
        x
    }

    fn to_f64_lossy(self) -> f64 {
        self
    }
}
