use std::sync::Arc;

use crate::{
    camera::PerspectiveCamera,
    error::{RenderError, Result},
    transfer_function::{ColorFunction, OpacityFunction},
    volume::VoxelVolume,
};

use super::{BlendMode, RenderOptions};

/// Everything one frame is rendered from
///
/// Built at render start from copies of the session state, so edits made while
/// the frame is in flight cannot tear it. The volume is shared read-only.
#[derive(Debug, Clone)]
pub struct Scene {
    pub volume: Arc<VoxelVolume>,
    pub color: ColorFunction,
    pub opacity: OpacityFunction,
    pub blend_mode: BlendMode,
    /// Threshold of [`BlendMode::IsoSurface`]
    pub iso_value: f32,
    pub camera: PerspectiveCamera,
    pub options: RenderOptions,
}

impl Scene {
    pub fn validate(&self) -> Result<()> {
        if self.color.is_empty() || self.opacity.is_empty() {
            return Err(RenderError::DegenerateTransferFunction);
        }
        self.options.validate()
    }
}
