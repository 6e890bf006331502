//! Slider panel driving a [`RenderSession`]
//!
//! Intensity sliders pick the two control points of each transfer function,
//! RGB sliders in `0..=100` pick the colors at those points and a combo box index
//! picks the blend mode. Nothing reaches the session until [`SliderPanel::apply`].

use std::sync::Arc;

use log::{debug, warn};
use nalgebra::vector;

use crate::{
    color::RGB,
    error::{RenderError, Result},
    render::{BlendMode, Frame},
    session::{RenderSession, TransferFunctionEdit},
    transfer_function::{ColorFunction, OpacityFunction},
};

/// Largest intensity range accepted by [`SliderPanel::set_intensity_range`]
pub const MAX_INTENSITY_RANGE: i64 = 100_000;

/// RGB slider position mapping to channel value 1.0
pub const CHANNEL_SLIDER_SCALE: i64 = 100;

/// How RGB slider positions turn into channel values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelScaling {
    /// Integer division by [`CHANNEL_SLIDER_SCALE`], every position below 100 gives 0
    #[default]
    Truncating,
    /// Division in floating point
    Exact,
}

impl ChannelScaling {
    pub fn channel(self, position: i64) -> f32 {
        match self {
            ChannelScaling::Truncating => (position / CHANNEL_SLIDER_SCALE) as f32,
            ChannelScaling::Exact => position as f32 / CHANNEL_SLIDER_SCALE as f32,
        }
    }
}

/// Integer slider in `0..=maximum`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slider {
    value: i64,
    maximum: i64,
}

impl Slider {
    pub fn new(value: i64, maximum: i64) -> Slider {
        let maximum = maximum.max(0);
        Slider {
            value: value.clamp(0, maximum),
            maximum,
        }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn maximum(&self) -> i64 {
        self.maximum
    }

    /// Move the slider, positions outside of the range stop at its ends
    pub fn set_value(&mut self, value: i64) {
        self.value = value.clamp(0, self.maximum);
    }

    /// Change the range, position is clamped into it
    pub fn set_maximum(&mut self, maximum: i64) {
        self.maximum = maximum.max(0);
        self.value = self.value.min(self.maximum);
    }

    pub fn to_max(&mut self) {
        self.value = self.maximum;
    }
}

/// Three channel sliders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbSliders {
    pub r: Slider,
    pub g: Slider,
    pub b: Slider,
}

impl RgbSliders {
    pub fn new(r: i64, g: i64, b: i64) -> RgbSliders {
        RgbSliders {
            r: Slider::new(r, CHANNEL_SLIDER_SCALE),
            g: Slider::new(g, CHANNEL_SLIDER_SCALE),
            b: Slider::new(b, CHANNEL_SLIDER_SCALE),
        }
    }

    pub fn color(&self, scaling: ChannelScaling) -> RGB {
        vector![
            scaling.channel(self.r.value()),
            scaling.channel(self.g.value()),
            scaling.channel(self.b.value())
        ]
    }
}

/// Controls of the viewer window
#[derive(Debug, Clone, PartialEq)]
pub struct SliderPanel {
    pub min_opacity: Slider,
    pub max_opacity: Slider,
    pub min_color: Slider,
    pub max_color: Slider,
    pub min_rgb: RgbSliders,
    pub max_rgb: RgbSliders,
    /// Combo box index, see [`BlendMode::from_index`]
    pub blend_mode_index: i32,
    pub channel_scaling: ChannelScaling,
}

impl SliderPanel {
    pub fn new() -> SliderPanel {
        let mut max_opacity = Slider::new(0, MAX_INTENSITY_RANGE);
        let mut max_color = Slider::new(0, MAX_INTENSITY_RANGE);
        max_opacity.to_max();
        max_color.to_max();

        SliderPanel {
            min_opacity: Slider::new(0, MAX_INTENSITY_RANGE),
            max_opacity,
            min_color: Slider::new(0, MAX_INTENSITY_RANGE),
            max_color,
            min_rgb: RgbSliders::new(0, 0, 0),
            max_rgb: RgbSliders::new(
                CHANNEL_SLIDER_SCALE,
                CHANNEL_SLIDER_SCALE,
                CHANNEL_SLIDER_SCALE,
            ),
            blend_mode_index: BlendMode::default().index(),
            channel_scaling: ChannelScaling::default(),
        }
    }

    /// Set the maximum of the four intensity sliders
    ///
    /// Only the sliders change, the session is not touched.
    pub fn set_intensity_range(&mut self, range: i64) -> Result<()> {
        if !(0..=MAX_INTENSITY_RANGE).contains(&range) {
            return Err(RenderError::InvalidIntensityRange(range));
        }
        for slider in [
            &mut self.min_opacity,
            &mut self.max_opacity,
            &mut self.min_color,
            &mut self.max_color,
        ] {
            slider.set_maximum(range);
        }
        debug!("Intensity range set to {range}");
        Ok(())
    }

    pub fn intensity_range(&self) -> i64 {
        self.max_opacity.maximum()
    }

    /// Opacity 0 at the minimum slider, 1 at the maximum one
    ///
    /// Sliders at the same position make a step at that value.
    pub fn opacity_function(&self) -> OpacityFunction {
        OpacityFunction::ramp(
            self.min_opacity.value() as f32,
            0.0,
            self.max_opacity.value() as f32,
            1.0,
        )
    }

    pub fn color_function(&self) -> ColorFunction {
        ColorFunction::ramp(
            self.min_color.value() as f32,
            self.min_rgb.color(self.channel_scaling),
            self.max_color.value() as f32,
            self.max_rgb.color(self.channel_scaling),
        )
    }

    /// Selected mode, unknown indices fall back to composite
    pub fn blend_mode(&self) -> BlendMode {
        BlendMode::from_index(self.blend_mode_index).unwrap_or_else(|| {
            warn!(
                "Unknown blend mode index {}, using {}",
                self.blend_mode_index,
                BlendMode::Composite
            );
            BlendMode::Composite
        })
    }

    fn push_to(&self, session: &mut RenderSession) -> Result<()> {
        session.edit_transfer_function(TransferFunctionEdit::SetOpacity(self.opacity_function()))?;
        session.edit_transfer_function(TransferFunctionEdit::SetColor(self.color_function()))?;
        session.set_blend_mode(self.blend_mode());
        Ok(())
    }

    /// Push transfer functions and blend mode into `session` and render
    pub fn apply(&self, session: &mut RenderSession) -> Result<Arc<Frame>> {
        self.push_to(session)?;
        session.render()
    }

    /// Like [`SliderPanel::apply`], the frame is rendered in the background
    pub fn apply_in_background(&self, session: &mut RenderSession) -> Result<u64> {
        self.push_to(session)?;
        session.request_render()
    }
}

impl Default for SliderPanel {
    fn default() -> Self {
        Self::new()
    }
}
