use nalgebra::{Point3, Vector3};

/// Ray cast by camera
///
/// Main usecase is getting the intersection with the volume ([`BoundBox::intersect`](super::BoundBox::intersect)),
/// then marching over the intersected segment in steps.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit vector
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Construct new ray, `direction` gets normalized
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Returns point `t` units far from ray origin in ray direction
    pub fn point_from_t(&self, t: f32) -> Point3<f32> {
        self.origin + t * self.direction
    }
}

#[cfg(test)]
mod test {

    use nalgebra::{point, vector};

    use super::*;

    #[test]
    fn direction_is_unit() {
        let ray = Ray::new(point![0.0, 0.0, 0.0], vector![3.0, 0.0, 4.0]);
        assert!((ray.direction.norm() - 1.0).abs() < f32::EPSILON);
        assert_eq!(ray.point_from_t(5.0), point![3.0, 0.0, 4.0]);
    }
}
