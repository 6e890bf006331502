use nalgebra::{Point3, Vector3};

use super::Ray;

/// Axis aligned box in world coordinates
///
/// Points on the `upper` faces are outside, the box is half-open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundBox {
    pub lower: Point3<f32>,
    pub upper: Point3<f32>,
}

impl BoundBox {
    pub fn new(lower: Point3<f32>, upper: Point3<f32>) -> BoundBox {
        BoundBox { lower, upper }
    }

    pub fn from_position_dims(position: Point3<f32>, dimensions: Vector3<f32>) -> BoundBox {
        BoundBox {
            lower: position,
            upper: position + dimensions,
        }
    }

    pub fn dims(&self) -> Vector3<f32> {
        self.upper - self.lower
    }

    pub fn center(&self) -> Point3<f32> {
        self.lower + 0.5 * self.dims()
    }

    /// Radius of the sphere circumscribing the box
    pub fn radius(&self) -> f32 {
        0.5 * self.dims().norm()
    }

    pub fn is_in(&self, pos: &Point3<f32>) -> bool {
        pos.x >= self.lower.x
            && pos.y >= self.lower.y
            && pos.z >= self.lower.z
            && pos.x < self.upper.x
            && pos.y < self.upper.y
            && pos.z < self.upper.z
    }

    /// Ray parameters `(t_enter, t_exit)` of the segment inside the box
    ///
    /// `t_enter` is negative when the ray starts inside the box.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        // Slab test, Williams et al. 2004, "An Efficient and Robust Ray-Box Intersection Algorithm"
        let t0 = (self.lower - ray.origin).component_div(&ray.direction);
        let t1 = (self.upper - ray.origin).component_div(&ray.direction);

        let t_minmax = t0.zip_map(&t1, |t0, t1| if t0 < t1 { (t0, t1) } else { (t1, t0) });

        let tmin = f32::max(f32::max(t_minmax.x.0, t_minmax.y.0), t_minmax.z.0);
        let tmax = f32::min(f32::min(t_minmax.x.1, t_minmax.y.1), t_minmax.z.1);

        // whole box behind the ray origin
        if tmax.is_sign_negative() {
            return None;
        }

        if tmin > tmax || tmin.is_nan() || tmax.is_nan() {
            return None;
        }

        Some((tmin, tmax))
    }
}
