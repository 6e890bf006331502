//! Module with helper functions
//! Saves repetition in unit tests, integration tests and benchmarks

use std::sync::Arc;

use nalgebra::{point, vector, Point3, Vector3};

use crate::{
    camera::PerspectiveCamera,
    color::RGB,
    render::{BlendMode, RenderOptions, Scene},
    transfer_function::{ColorFunction, OpacityFunction},
    volume::VoxelVolume,
};

/// 2x2x2 volume with eight distinct values, voxels are 2 units wide
pub fn white_volume() -> VoxelVolume {
    let data: Vec<u8> = vec![0, 32, 64, 64 + 32, 128, 128 + 32, 128 + 64, 255];
    VoxelVolume::new(
        vector![2, 2, 2],
        vector![2.0, 2.0, 2.0], // shape of voxels
        Point3::origin(),
        data,
    )
    .unwrap()
}

/// Unit spaced volume with every voxel set to `value`
pub fn uniform_volume(size: Vector3<usize>, value: f32) -> VoxelVolume {
    let data = vec![value; size.x * size.y * size.z];
    VoxelVolume::with_unit_spacing(size, data).unwrap()
}

/// Single row of voxels along the x axis
pub fn row_volume(values: &[f32]) -> VoxelVolume {
    VoxelVolume::with_unit_spacing(vector![values.len(), 1, 1], values.to_vec()).unwrap()
}

/// Cube of side `n` with a ball in the middle, 1000 in the center falling to 0 at the surface
pub fn sphere_volume(n: usize) -> VoxelVolume {
    let half = n as f32 / 2.0;
    let center = point![half, half, half];

    let mut data = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let voxel = point![x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5];
                let r = (voxel - center).norm() / half;
                data.push(f32::max(0.0, 1000.0 * (1.0 - r)));
            }
        }
    }
    VoxelVolume::with_unit_spacing(vector![n, n, n], data).unwrap()
}

/// Opacity 0 at `low` up to 1 at `high`
pub fn opacity_ramp(low: f32, high: f32) -> OpacityFunction {
    OpacityFunction::ramp(low, 0.0, high, 1.0)
}

/// Black at `low` up to white at `high`
pub fn grey_ramp(low: f32, high: f32) -> ColorFunction {
    let black: RGB = vector![0.0, 0.0, 0.0];
    let white: RGB = vector![1.0, 1.0, 1.0];
    ColorFunction::ramp(low, black, high, white)
}

/// Scene of `volume` with ramps over 0..1000, camera fitted to the volume
pub fn scene_for(volume: VoxelVolume, blend_mode: BlendMode, options: RenderOptions) -> Scene {
    let mut camera = PerspectiveCamera::default();
    camera.reset_to_box(&volume.get_bound_box());
    let (width, height) = options.resolution;
    camera.change_aspect_from_resolution(width, height);

    let iso_value = volume.value_range().midpoint();
    Scene {
        volume: Arc::new(volume),
        color: grey_ramp(0.0, 1000.0),
        opacity: opacity_ramp(0.0, 1000.0),
        blend_mode,
        iso_value,
        camera,
        options,
    }
}

/// 2x2x2 volume of `value`, fixed step, one worker
pub fn uniform_scene(value: f32, blend_mode: BlendMode) -> Scene {
    let options = RenderOptions::builder()
        .resolution(4, 4)
        .adaptive_sampling(false)
        .worker_count(1)
        .build_unchecked();
    scene_for(uniform_volume(vector![2, 2, 2], value), blend_mode, options)
}

/// Row of voxels, fixed step, no shading, no early termination
pub fn row_scene(values: &[f32], blend_mode: BlendMode) -> Scene {
    let options = RenderOptions::builder()
        .resolution(4, 4)
        .adaptive_sampling(false)
        .shading(false)
        .early_ray_termination(false)
        .worker_count(1)
        .build_unchecked();
    scene_for(row_volume(values), blend_mode, options)
}

/// Ball of side `n` rendered at `resolution` by two workers
pub fn sphere_scene(n: usize, resolution: (usize, usize), blend_mode: BlendMode) -> Scene {
    let options = RenderOptions::builder()
        .resolution(resolution.0, resolution.1)
        .worker_count(2)
        .tile_side(8)
        .build_unchecked();
    scene_for(sphere_volume(n), blend_mode, options)
}
