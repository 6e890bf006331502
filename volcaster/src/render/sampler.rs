use nalgebra::{Point3, Vector3};

use crate::{
    color::{RGB, RGBA},
    common::Ray,
};

use super::{
    compositor::{Accumulator, Classify, Flow, RaySample},
    Scene,
};

/// Longest adaptive step, in base steps
const MAX_STEP_FACTOR: f32 = 4.0;
/// Shortest adaptive step, in base steps
const MIN_STEP_FACTOR: f32 = 0.25;
/// Opacity change between neighbouring samples considered rapid
const OPACITY_DELTA: f32 = 0.1;

/// Ray marcher
///
/// Samples are taken in the middle of each step, `t_enter + (k + 0.5) * step`,
/// and handed to the blend mode's [`Accumulator`] in front-to-back order.
pub struct RaySampler<'a> {
    scene: &'a Scene,
    base_step: f32,
    adaptive: bool,
    termination: Option<f32>,
}

impl<'a> RaySampler<'a> {
    pub fn new(scene: &'a Scene) -> RaySampler<'a> {
        let options = &scene.options;
        let spacing = scene.volume.get_spacing();
        let base_step = options.sample_distance * spacing.min();

        // intensity based modes must not skip over extremes
        let adaptive = options.adaptive_sampling && scene.blend_mode.classifies_samples();
        let termination = options
            .early_ray_termination
            .then_some(options.termination_threshold);

        RaySampler {
            scene,
            base_step,
            adaptive,
            termination,
        }
    }

    pub fn base_step(&self) -> f32 {
        self.base_step
    }

    /// Color of pixel `[x, y]`, ray passes through the pixel center
    pub fn render_pixel(&self, x: usize, y: usize) -> RGBA {
        let (width, height) = self.scene.options.resolution;
        let pixel_coord = (
            (x as f32 + 0.5) / width as f32,
            (y as f32 + 0.5) / height as f32,
        );
        let ray = self.scene.camera.get_ray(pixel_coord);
        self.cast_ray(&ray)
    }

    /// Premultiplied color collected along `ray`
    pub fn cast_ray(&self, ray: &Ray) -> RGBA {
        let mut accumulator =
            Accumulator::new(self.scene.blend_mode, self.scene.iso_value, self.termination);
        self.march(ray, |sample| accumulator.push(sample));
        accumulator.finish(self, ray.direction)
    }

    /// Walk the part of `ray` inside the volume, passing samples to `emit` until
    /// the ray leaves the volume or `emit` returns [`Flow::Stop`]
    pub fn march(&self, ray: &Ray, mut emit: impl FnMut(&RaySample) -> Flow) {
        let volume = &self.scene.volume;
        let (t_enter, t_exit) = match volume.get_bound_box().intersect(ray) {
            Some(e) => e,
            None => return,
        };

        // camera may sit inside the volume
        let t_enter = f32::max(t_enter, 0.0);
        let classify = self.scene.blend_mode.classifies_samples();

        let mut step = self.base_step;
        let mut t = t_enter + 0.5 * step;
        let mut previous_opacity = None;

        while t < t_exit {
            let position = ray.point_from_t(t);
            let intensity = volume.sample(position);

            let mut sample = RaySample::intensity(intensity, position);
            sample.step_ratio = step / self.base_step;

            if classify {
                sample.opacity = self.opacity(intensity);
                if sample.opacity > 0.0 {
                    sample.color = self.shade(self.color(intensity), position, ray.direction);
                }
            }

            if emit(&sample) == Flow::Stop {
                break;
            }

            let next = if self.adaptive {
                self.next_step(step, sample.opacity, previous_opacity)
            } else {
                step
            };
            previous_opacity = Some(sample.opacity);

            t += 0.5 * (step + next);
            step = next;
        }
    }

    fn next_step(&self, step: f32, opacity: f32, previous_opacity: Option<f32>) -> f32 {
        let rapid_change = previous_opacity.map_or(false, |p| (opacity - p).abs() > OPACITY_DELTA);

        if rapid_change {
            f32::max(0.5 * step, MIN_STEP_FACTOR * self.base_step)
        } else if opacity == 0.0 {
            f32::min(2.0 * step, MAX_STEP_FACTOR * self.base_step)
        } else {
            self.base_step
        }
    }
}

impl Classify for RaySampler<'_> {
    fn color(&self, intensity: f32) -> RGB {
        self.scene.color.sample(intensity)
    }

    fn opacity(&self, intensity: f32) -> f32 {
        self.scene.opacity.sample(intensity)
    }

    /// Two-sided Lambert with the light at the camera
    fn shade(&self, color: RGB, position: Point3<f32>, view_dir: Vector3<f32>) -> RGB {
        let options = &self.scene.options;
        if !options.shading {
            return color;
        }

        let normal = match self.scene.volume.gradient(position).try_normalize(f32::EPSILON) {
            Some(n) => n,
            // homogeneous region, no surface to light
            None => return color,
        };

        let n_dot_l = normal.dot(&view_dir).abs();
        let lighting = options.lighting;
        color * (lighting.ambient + lighting.diffuse * n_dot_l)
    }
}
