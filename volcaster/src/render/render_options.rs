use nalgebra::vector;

use crate::{
    color::RGB,
    error::{RenderError, Result},
};

/// Headlight shading coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: f32,
    pub diffuse: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: 0.2,
            diffuse: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Frame size `(width, height)` in pixels
    pub resolution: (usize, usize),
    /// Stop compositing once accumulated opacity reaches `termination_threshold`
    pub early_ray_termination: bool,
    pub termination_threshold: f32,
    /// Base sampling step as a fraction of the smallest voxel spacing
    pub sample_distance: f32,
    /// Shorten the step where opacity changes quickly, lengthen it in empty space
    pub adaptive_sampling: bool,
    /// Gradient based shading of classified samples
    pub shading: bool,
    pub lighting: Lighting,
    /// Color behind the volume, used when converting frames to bytes
    pub background: RGB,
    /// Number of render threads
    pub worker_count: usize,
    /// Side of the square tiles the frame is split into
    pub tile_side: usize,
}

impl RenderOptions {
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder::default()
    }

    /// Checks the options make sense
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.resolution;
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidOptions(format!(
                "resolution {width}x{height}"
            )));
        }
        if !(self.termination_threshold > 0.0 && self.termination_threshold <= 1.0) {
            return Err(RenderError::InvalidOptions(format!(
                "termination threshold {} outside (0;1>",
                self.termination_threshold
            )));
        }
        if !(self.sample_distance.is_finite() && self.sample_distance > 0.0) {
            return Err(RenderError::InvalidOptions(format!(
                "sample distance {}",
                self.sample_distance
            )));
        }
        if self.lighting.ambient < 0.0 || self.lighting.diffuse < 0.0 {
            return Err(RenderError::InvalidOptions(
                "negative lighting coefficient".into(),
            ));
        }
        if self.worker_count == 0 {
            return Err(RenderError::InvalidOptions("zero workers".into()));
        }
        if self.tile_side == 0 {
            return Err(RenderError::InvalidOptions("zero tile side".into()));
        }
        Ok(())
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            resolution: (512, 512),
            early_ray_termination: true,
            termination_threshold: 0.99,
            sample_distance: 1.0,
            adaptive_sampling: true,
            shading: true,
            lighting: Lighting::default(),
            background: vector![0.0, 0.0, 0.0],
            worker_count,
            tile_side: 32,
        }
    }
}

/// Builder for [`RenderOptions`], unset fields keep their defaults
#[derive(Debug, Default)]
pub struct RenderOptionsBuilder {
    options: RenderOptions,
}

impl RenderOptionsBuilder {
    pub fn resolution(mut self, width: usize, height: usize) -> Self {
        self.options.resolution = (width, height);
        self
    }

    pub fn early_ray_termination(mut self, enable: bool) -> Self {
        self.options.early_ray_termination = enable;
        self
    }

    pub fn termination_threshold(mut self, threshold: f32) -> Self {
        self.options.termination_threshold = threshold;
        self
    }

    pub fn sample_distance(mut self, distance: f32) -> Self {
        self.options.sample_distance = distance;
        self
    }

    pub fn adaptive_sampling(mut self, enable: bool) -> Self {
        self.options.adaptive_sampling = enable;
        self
    }

    pub fn shading(mut self, enable: bool) -> Self {
        self.options.shading = enable;
        self
    }

    pub fn lighting(mut self, ambient: f32, diffuse: f32) -> Self {
        self.options.lighting = Lighting { ambient, diffuse };
        self
    }

    pub fn background(mut self, background: RGB) -> Self {
        self.options.background = background;
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.options.worker_count = count;
        self
    }

    pub fn tile_side(mut self, side: usize) -> Self {
        self.options.tile_side = side;
        self
    }

    pub fn build(self) -> Result<RenderOptions> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Skips validation
    pub fn build_unchecked(self) -> RenderOptions {
        self.options
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RenderOptions::default().validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let opts = RenderOptions::builder()
            .resolution(64, 32)
            .early_ray_termination(false)
            .adaptive_sampling(false)
            .worker_count(3)
            .build()
            .unwrap();

        assert_eq!(opts.resolution, (64, 32));
        assert!(!opts.early_ray_termination);
        assert!(!opts.adaptive_sampling);
        assert_eq!(opts.worker_count, 3);
        assert!(opts.shading);
    }

    #[test]
    fn invalid_options_rejected() {
        let zero_res = RenderOptions::builder().resolution(0, 10).build();
        assert!(matches!(zero_res, Err(RenderError::InvalidOptions(_))));

        let bad_step = RenderOptions::builder().sample_distance(-1.0).build();
        assert!(matches!(bad_step, Err(RenderError::InvalidOptions(_))));

        let bad_threshold = RenderOptions::builder().termination_threshold(1.5).build();
        assert!(matches!(bad_threshold, Err(RenderError::InvalidOptions(_))));

        let no_workers = RenderOptions::builder().worker_count(0).build();
        assert!(matches!(no_workers, Err(RenderError::InvalidOptions(_))));

        // unchecked build lets it through
        let opts = RenderOptions::builder().tile_side(0).build_unchecked();
        assert_eq!(opts.tile_side, 0);
    }
}
