//! Piecewise-linear transfer functions
//!
//! Map scalar intensity to opacity ([`OpacityFunction`]) or to color ([`ColorFunction`]).
//! Control points are kept sorted by value. Between two points the output is
//! interpolated linearly, outside of the points the nearest endpoint is returned.

use nalgebra::vector;

use crate::{
    color::RGB,
    common::ValueRange,
    error::{RenderError, Result},
};

/// Output of a transfer function
pub trait Interpolate: Copy {
    fn lerp(a: Self, b: Self, t: f32) -> Self;

    /// Output used when nothing else is known, fully transparent / black
    fn zero() -> Self;
}

impl Interpolate for f32 {
    fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    fn zero() -> f32 {
        0.0
    }
}

impl Interpolate for RGB {
    fn lerp(a: RGB, b: RGB, t: f32) -> RGB {
        a + (b - a) * t
    }

    fn zero() -> RGB {
        RGB::zeros()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint<T> {
    pub value: f32,
    pub output: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction<T> {
    points: Vec<ControlPoint<T>>,
}

/// Intensity to opacity in `<0;1>`
pub type OpacityFunction = TransferFunction<f32>;

/// Intensity to RGB color, channels in `<0;1>`
pub type ColorFunction = TransferFunction<RGB>;

impl<T: Interpolate> TransferFunction<T> {
    /// Function without points, must get at least one before evaluation
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Two point function, `low -> low_output` and `high -> high_output`
    ///
    /// If `low == high` both points are kept, in this order, and the function
    /// becomes a step at that value. Bounds that are not finite are left out.
    pub fn ramp(low: f32, low_output: T, high: f32, high_output: T) -> Self {
        let mut tf = Self::new();
        if low.is_finite() {
            tf.insert(low, low_output);
        }
        if high.is_finite() {
            if low == high {
                tf.points.push(ControlPoint {
                    value: high,
                    output: high_output,
                });
            } else {
                tf.insert(high, high_output);
            }
        }
        tf
    }

    /// Insert control point, replacing points with the same `value`
    ///
    /// Fails with [`RenderError::InvalidControlPoint`] if `value` is not finite.
    pub fn add_point(&mut self, value: f32, output: T) -> Result<()> {
        if !value.is_finite() {
            return Err(RenderError::InvalidControlPoint(value));
        }
        self.insert(value, output);
        Ok(())
    }

    fn insert(&mut self, value: f32, output: T) {
        let start = self.points.partition_point(|p| p.value < value);
        let end = self.points.partition_point(|p| p.value <= value);
        self.points
            .splice(start..end, std::iter::once(ControlPoint { value, output }));
    }

    /// Remove all points at `value`, returns `true` if any was removed
    pub fn remove_point(&mut self, value: f32) -> bool {
        let len = self.points.len();
        self.points.retain(|p| p.value != value);
        self.points.len() != len
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[ControlPoint<T>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Values of the first and the last point
    pub fn range(&self) -> Option<ValueRange> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some(ValueRange {
            low: first.value,
            high: last.value,
        })
    }

    /// Output at intensity `value`
    ///
    /// Fails with [`RenderError::DegenerateTransferFunction`] if there are no points.
    pub fn evaluate(&self, value: f32) -> Result<T> {
        self.lookup(value)
            .ok_or(RenderError::DegenerateTransferFunction)
    }

    /// Evaluation on the render path, functions are validated at render start
    pub(crate) fn sample(&self, value: f32) -> T {
        self.lookup(value).unwrap_or_else(T::zero)
    }

    fn lookup(&self, value: f32) -> Option<T> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        // first point right of value
        let hi = self.points.partition_point(|p| p.value <= value);

        if hi == 0 {
            return Some(first.output);
        }
        if hi == self.points.len() {
            return Some(last.output);
        }

        // lo.value <= value < hi.value, so the span is never zero
        let lo = &self.points[hi - 1];
        let hi = &self.points[hi];
        let t = (value - lo.value) / (hi.value - lo.value);
        Some(T::lerp(lo.output, hi.output, t))
    }
}

impl TransferFunction<RGB> {
    pub fn add_rgb_point(&mut self, value: f32, r: f32, g: f32, b: f32) -> Result<()> {
        self.add_point(value, vector![r, g, b])
    }
}

impl<T: Interpolate> Default for TransferFunction<T> {
    fn default() -> Self {
        Self::new()
    }
}
