use log::info;
use nalgebra::{vector, Point3, Vector3};

use crate::{
    common::{BoundBox, ValueRange},
    error::{RenderError, Result},
};

/// Intensity returned for positions outside of the volume
pub const OUTSIDE: f32 = 0.0;

/// Decoded scalar volume, axis aligned
///
/// Samples are stored x-fastest (`x + nx * (y + ny * z)`), the order decoders of
/// medical formats hand them over.
/// Voxel `[i, j, k]` has its center at `origin + ([i, j, k] + 0.5) * spacing`,
/// so the volume occupies `[origin, origin + size * spacing)`.
///
/// Dimensions and spacing cannot change once built.
/// Loading a new file means building a new `VoxelVolume`.
pub struct VoxelVolume {
    size: Vector3<usize>,
    spacing: Vector3<f32>,
    bound_box: BoundBox,
    data: Vec<f32>,
    value_range: ValueRange,
}

impl std::fmt::Debug for VoxelVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxelVolume")
            .field("box", &self.bound_box)
            .field("size", &self.size)
            .field("spacing", &self.spacing)
            .field("data len", &self.data.len())
            .field("range", &self.value_range)
            .finish()
    }
}

impl VoxelVolume {
    /// Build volume from decoded samples
    ///
    /// # Arguments
    ///
    /// * `size` - number of voxels along each axis
    /// * `spacing` - shape of a voxel in world units
    /// * `origin` - lower corner of the volume in world coordinates
    /// * `data` - samples, `size.x * size.y * size.z` of them, x-fastest
    ///
    /// Fails with [`RenderError::InvalidVolume`] on zero dimensions, wrong sample
    /// count or spacing that is not positive and finite.
    pub fn new<T>(
        size: Vector3<usize>,
        spacing: Vector3<f32>,
        origin: Point3<f32>,
        data: impl IntoIterator<Item = T>,
    ) -> Result<VoxelVolume>
    where
        T: Into<f32>,
    {
        if size.iter().any(|&n| n == 0) {
            return Err(RenderError::InvalidVolume(format!(
                "zero dimension in {}x{}x{}",
                size.x, size.y, size.z
            )));
        }

        if spacing.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
            return Err(RenderError::InvalidVolume(format!(
                "spacing must be positive, got {:?}",
                spacing.as_slice()
            )));
        }

        let data: Vec<f32> = data.into_iter().map(Into::into).collect();
        let expected = size.x * size.y * size.z;
        if data.len() != expected {
            return Err(RenderError::InvalidVolume(format!(
                "expected {expected} samples, got {}",
                data.len()
            )));
        }

        let dims = size.map(|n| n as f32).component_mul(&spacing);
        let bound_box = BoundBox::from_position_dims(origin, dims);
        let value_range = ValueRange::from_samples(data.iter().copied());

        info!(
            "New volume, size {}x{}x{} spacing {:?} range {:?}",
            size.x,
            size.y,
            size.z,
            spacing.as_slice(),
            value_range
        );

        Ok(VoxelVolume {
            size,
            spacing,
            bound_box,
            data,
            value_range,
        })
    }

    /// Volume with unit spacing placed at the world origin
    pub fn with_unit_spacing<T>(
        size: Vector3<usize>,
        data: impl IntoIterator<Item = T>,
    ) -> Result<VoxelVolume>
    where
        T: Into<f32>,
    {
        VoxelVolume::new(
            size,
            vector![1.0, 1.0, 1.0],
            Point3::origin(),
            data,
        )
    }

    pub fn get_size(&self) -> Vector3<usize> {
        self.size
    }

    pub fn get_spacing(&self) -> Vector3<f32> {
        self.spacing
    }

    pub fn get_bound_box(&self) -> BoundBox {
        self.bound_box
    }

    /// Smallest and largest sample of the volume
    pub fn value_range(&self) -> ValueRange {
        self.value_range
    }

    pub fn is_in(&self, pos: &Point3<f32>) -> bool {
        self.bound_box.is_in(pos)
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.size.x * (y + self.size.y * z)
    }

    /// Raw voxel value, `None` outside of the lattice
    pub fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        if x >= self.size.x || y >= self.size.y || z >= self.size.z {
            return None;
        }
        self.data.get(self.index(x, y, z)).copied()
    }

    /// Trilinear sample at world position `pos`
    ///
    /// Returns [`OUTSIDE`] for positions outside of the bounding box.
    pub fn sample(&self, pos: Point3<f32>) -> f32 {
        if !self.is_in(&pos) {
            return OUTSIDE;
        }
        self.interpolate(pos)
    }

    /// Trilinear sample with `pos` clamped into the volume
    pub fn sample_clamped(&self, pos: Point3<f32>) -> f32 {
        let lower = self.bound_box.lower;
        let upper = self.bound_box.upper;
        let clamped = pos
            .coords
            .zip_zip_map(&lower.coords, &upper.coords, |p, l, u| p.clamp(l, u));
        self.interpolate(Point3::from(clamped))
    }

    /// Gradient by central differences, one voxel spacing apart on each axis
    ///
    /// Neighbours outside of the volume are clamped to its border, so that the
    /// box faces do not show up as surfaces.
    pub fn gradient(&self, pos: Point3<f32>) -> Vector3<f32> {
        let h = self.spacing;
        let dx = vector![h.x, 0.0, 0.0];
        let dy = vector![0.0, h.y, 0.0];
        let dz = vector![0.0, 0.0, h.z];

        vector![
            (self.sample_clamped(pos + dx) - self.sample_clamped(pos - dx)) / (2.0 * h.x),
            (self.sample_clamped(pos + dy) - self.sample_clamped(pos - dy)) / (2.0 * h.y),
            (self.sample_clamped(pos + dz) - self.sample_clamped(pos - dz)) / (2.0 * h.z)
        ]
    }

    fn interpolate(&self, pos: Point3<f32>) -> f32 {
        // continuous lattice coordinates, voxel centers on integers
        let lattice = (pos - self.bound_box.lower).component_div(&self.spacing);

        let (x0, x1, x_t) = Self::axis_cell(lattice.x - 0.5, self.size.x);
        let (y0, y1, y_t) = Self::axis_cell(lattice.y - 0.5, self.size.y);
        let (z0, z1, z_t) = Self::axis_cell(lattice.z - 0.5, self.size.z);

        let at = |x, y, z| self.data[self.index(x, y, z)];

        // x lines
        let c00 = lerp(at(x0, y0, z0), at(x1, y0, z0), x_t);
        let c10 = lerp(at(x0, y1, z0), at(x1, y1, z0), x_t);
        let c01 = lerp(at(x0, y0, z1), at(x1, y0, z1), x_t);
        let c11 = lerp(at(x0, y1, z1), at(x1, y1, z1), x_t);

        // y plane
        let c0 = lerp(c00, c10, y_t);
        let c1 = lerp(c01, c11, y_t);

        lerp(c0, c1, z_t)
    }

    // Lower and upper lattice index along one axis and the weight of the upper one
    fn axis_cell(u: f32, n: usize) -> (usize, usize, f32) {
        let max = (n - 1) as f32;
        let u = u.clamp(0.0, max);
        let i0 = u.floor();
        let t = u - i0;
        let i0 = i0 as usize;
        let i1 = usize::min(i0 + 1, n - 1);
        (i0, i1, t)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod test {

    use nalgebra::point;

    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn rejects_zero_dimension() {
        let res = VoxelVolume::with_unit_spacing::<u8>(vector![0, 2, 2], vec![]);
        assert!(matches!(res, Err(RenderError::InvalidVolume(_))));
    }

    #[test]
    fn rejects_wrong_length() {
        let res = VoxelVolume::with_unit_spacing(vector![2, 2, 2], vec![0u8; 7]);
        assert!(matches!(res, Err(RenderError::InvalidVolume(_))));
    }

    #[test]
    fn rejects_bad_spacing() {
        let res = VoxelVolume::new(
            vector![1, 1, 1],
            vector![1.0, 0.0, 1.0],
            Point3::origin(),
            vec![1u8],
        );
        assert!(matches!(res, Err(RenderError::InvalidVolume(_))));
    }

    #[test]
    fn voxel_centers_sample_exactly() {
        let vol = white_volume();
        let spacing = vol.get_spacing();
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..2 {
                    let center = Point3::origin()
                        + vector![x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5]
                            .component_mul(&spacing);
                    let expected = vol.get_data(x, y, z).unwrap();
                    assert_eq!(vol.sample(center), expected);
                }
            }
        }
    }

    #[test]
    fn sample_between_centers() {
        // x-fastest: data[1] is voxel [1,0,0]
        let vol = VoxelVolume::with_unit_spacing(vector![2, 1, 1], vec![10u16, 30]).unwrap();
        let mid = vol.sample(point![1.0, 0.5, 0.5]);
        assert!((mid - 20.0).abs() < 1e-4);
        let quarter = vol.sample(point![0.75, 0.5, 0.5]);
        assert!((quarter - 15.0).abs() < 1e-4);
    }

    #[test]
    fn border_clamps_to_edge_voxel() {
        let vol = VoxelVolume::with_unit_spacing(vector![2, 1, 1], vec![10u16, 30]).unwrap();
        assert_eq!(vol.sample(point![0.1, 0.5, 0.5]), 10.0);
        assert_eq!(vol.sample(point![1.9, 0.5, 0.5]), 30.0);
    }

    #[test]
    fn outside_is_sentinel() {
        let vol = uniform_volume(vector![2, 2, 2], 500.0);
        assert_eq!(vol.sample(point![-0.1, 0.5, 0.5]), OUTSIDE);
        assert_eq!(vol.sample(point![2.0, 0.5, 0.5]), OUTSIDE);
        assert_eq!(vol.sample(point![0.5, 0.5, 0.5]), 500.0);
    }

    #[test]
    fn value_range_of_samples() {
        let vol = white_volume();
        let range = vol.value_range();
        assert_eq!(range.low, 0.0);
        assert_eq!(range.high, 255.0);
    }

    #[test]
    fn gradient_of_ramp() {
        // intensity grows with x by 10 per voxel
        let data: Vec<f32> = (0..4 * 4 * 4).map(|i| ((i % 4) * 10) as f32).collect();
        let vol = VoxelVolume::with_unit_spacing(vector![4, 4, 4], data).unwrap();
        let grad = vol.gradient(point![2.0, 2.0, 2.0]);
        assert!((grad.x - 10.0).abs() < 1e-4);
        assert!(grad.y.abs() < 1e-4);
        assert!(grad.z.abs() < 1e-4);
    }

    #[test]
    fn uniform_volume_has_no_gradient() {
        let vol = uniform_volume(vector![2, 2, 2], 500.0);
        assert_eq!(vol.gradient(point![0.5, 0.5, 0.5]), Vector3::zeros());
    }
}
