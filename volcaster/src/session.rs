//! Orchestration of loading, editing, rendering and exporting
//!
//! [`RenderSession`] owns the loaded volume, the transfer functions, the blend
//! mode and the camera. Edits only mark the current frame stale, a new frame is
//! produced by an explicit [`RenderSession::render`] or
//! [`RenderSession::request_render`].

use std::{error::Error, sync::Arc};

use log::{debug, info};
use nalgebra::{vector, Point3, Vector3};

use crate::{
    camera::{CameraMove, PerspectiveCamera},
    color::RGB,
    error::{RenderError, Result},
    render::{BlendMode, CancelToken, Frame, ParallelRenderer, RenderOptions, RendererFront, Scene},
    transfer_function::{ColorFunction, Interpolate, OpacityFunction, TransferFunction},
    volume::VoxelVolume,
};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No volume loaded
    Empty,
    /// Volume loaded, no frame of it yet
    Loaded,
    /// Background render in flight
    Rendering,
    /// A complete frame is available
    Rendered,
}

/// Collaborator serializing frames into an image format
pub trait FrameEncoder {
    fn encode(&mut self, frame: &Frame) -> std::result::Result<(), Box<dyn Error + Send + Sync>>;
}

impl<F> FrameEncoder for F
where
    F: FnMut(&Frame) -> std::result::Result<(), Box<dyn Error + Send + Sync>>,
{
    fn encode(&mut self, frame: &Frame) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
        self(frame)
    }
}

/// Change of one of the transfer functions
#[derive(Debug, Clone, PartialEq)]
pub enum TransferFunctionEdit {
    SetColor(ColorFunction),
    SetOpacity(OpacityFunction),
    ColorPoint { value: f32, color: RGB },
    OpacityPoint { value: f32, opacity: f32 },
    RemoveColorPoint(f32),
    RemoveOpacityPoint(f32),
}

pub struct RenderSession {
    volume: Option<Arc<VoxelVolume>>,
    color: ColorFunction,
    opacity: OpacityFunction,
    blend_mode: BlendMode,
    /// User set iso value, volume midpoint otherwise
    iso_value: Option<f32>,
    camera: PerspectiveCamera,
    options: RenderOptions,
    frame: Option<Arc<Frame>>,
    /// Bumped by every edit
    revision: u64,
    /// Revision the current frame was rendered from
    frame_revision: u64,
    /// Started lazily by the first background render
    front: Option<RendererFront>,
    /// Revision of the background render in flight
    pending: Option<u64>,
}

impl RenderSession {
    pub fn new(options: RenderOptions) -> RenderSession {
        RenderSession {
            volume: None,
            color: ColorFunction::new(),
            opacity: OpacityFunction::new(),
            blend_mode: BlendMode::default(),
            iso_value: None,
            camera: PerspectiveCamera::default(),
            options,
            frame: None,
            revision: 0,
            frame_revision: 0,
            front: None,
            pending: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.volume, self.pending, &self.frame) {
            (None, _, _) => SessionState::Empty,
            (Some(_), Some(_), _) => SessionState::Rendering,
            (Some(_), None, Some(_)) => SessionState::Rendered,
            (Some(_), None, None) => SessionState::Loaded,
        }
    }

    /// Replace the volume
    ///
    /// Drops the frame, cancels a render in flight and points the camera at the
    /// new volume. Empty transfer functions get ramps over the volume's range.
    pub fn load_volume(&mut self, volume: VoxelVolume) {
        self.cancel_render();
        self.frame = None;

        let range = volume.value_range();
        if self.opacity.is_empty() {
            self.opacity = OpacityFunction::ramp(range.low, 0.0, range.high, 1.0);
        }
        if self.color.is_empty() {
            let black: RGB = vector![0.0, 0.0, 0.0];
            let white: RGB = vector![1.0, 1.0, 1.0];
            self.color = ColorFunction::ramp(range.low, black, range.high, white);
        }

        info!("Volume loaded: {volume:?}");
        self.volume = Some(Arc::new(volume));
        self.reset_camera();
    }

    /// Build the volume from decoder output and load it
    ///
    /// Fails with [`RenderError::InvalidVolume`], the session is left untouched then.
    pub fn load_decoded<T>(
        &mut self,
        size: Vector3<usize>,
        spacing: Vector3<f32>,
        origin: Point3<f32>,
        data: impl IntoIterator<Item = T>,
    ) -> Result<()>
    where
        T: Into<f32>,
    {
        let volume = VoxelVolume::new(size, spacing, origin, data)?;
        self.load_volume(volume);
        Ok(())
    }

    /// Render a frame on the calling thread and make it current
    ///
    /// Fails with [`RenderError::NoVolume`] if nothing is loaded.
    pub fn render(&mut self) -> Result<Arc<Frame>> {
        let scene = self.scene()?;
        let renderer = ParallelRenderer::new(&scene)?;
        self.cancel_render();

        // token is never canceled, a frame always comes back
        let frame = renderer
            .render(&CancelToken::new())
            .ok_or(RenderError::NoFrame)?;

        let frame = Arc::new(frame);
        self.swap_frame(frame.clone(), self.revision);
        Ok(frame)
    }

    /// Start rendering in the background, superseding any render in flight
    ///
    /// The frame is picked up by [`RenderSession::poll_frame`] or
    /// [`RenderSession::wait_frame`]. Returns the render generation.
    pub fn request_render(&mut self) -> Result<u64> {
        let scene = self.scene()?;

        if self.front.is_none() {
            self.front = Some(RendererFront::new()?);
        }
        let front = self.front.as_mut().ok_or(RenderError::RendererUnavailable)?;
        let generation = front.submit(scene)?;

        self.pending = Some(self.revision);
        Ok(generation)
    }

    /// Swap in the background frame if it is done, does not block
    ///
    /// Returns the new frame, `None` while rendering or if there was nothing to pick up.
    pub fn poll_frame(&mut self) -> Option<Arc<Frame>> {
        let revision = self.pending?;
        let front = self.front.as_mut()?;

        if let Some(frame) = front.try_take() {
            self.swap_frame(frame.clone(), revision);
            return Some(frame);
        }
        if !front.is_busy() {
            // canceled or failed, nothing will come
            self.pending = None;
        }
        None
    }

    /// Block until the background render is done and swap its frame in
    ///
    /// Returns `None` if there was no render in flight or it got canceled.
    pub fn wait_frame(&mut self) -> Result<Option<Arc<Frame>>> {
        let revision = match self.pending {
            Some(revision) => revision,
            None => return Ok(None),
        };
        let front = match self.front.as_mut() {
            Some(front) => front,
            None => return Ok(None),
        };

        let frame = front.wait()?;
        self.pending = None;
        if let Some(frame) = &frame {
            self.swap_frame(frame.clone(), revision);
        }
        Ok(frame)
    }

    /// Cancel the background render, its frame is discarded
    pub fn cancel_render(&mut self) {
        if let Some(front) = &mut self.front {
            front.cancel();
        }
        if self.pending.take().is_some() {
            debug!("Background render canceled");
        }
    }

    /// Rejects edits leaving a function without control points
    pub fn edit_transfer_function(&mut self, edit: TransferFunctionEdit) -> Result<()> {
        match edit {
            TransferFunctionEdit::SetColor(color) => {
                if color.is_empty() {
                    return Err(RenderError::DegenerateTransferFunction);
                }
                self.color = color;
            }
            TransferFunctionEdit::SetOpacity(opacity) => {
                if opacity.is_empty() {
                    return Err(RenderError::DegenerateTransferFunction);
                }
                self.opacity = opacity;
            }
            TransferFunctionEdit::ColorPoint { value, color } => {
                self.color.add_point(value, color)?
            }
            TransferFunctionEdit::OpacityPoint { value, opacity } => {
                self.opacity.add_point(value, opacity.clamp(0.0, 1.0))?
            }
            TransferFunctionEdit::RemoveColorPoint(value) => {
                Self::remove_point(&mut self.color, value)?
            }
            TransferFunctionEdit::RemoveOpacityPoint(value) => {
                Self::remove_point(&mut self.opacity, value)?
            }
        }
        self.mark_stale();
        Ok(())
    }

    fn remove_point<T: Interpolate>(tf: &mut TransferFunction<T>, value: f32) -> Result<()> {
        let last = tf.points().iter().all(|p| p.value == value);
        if last {
            return Err(RenderError::DegenerateTransferFunction);
        }
        tf.remove_point(value);
        Ok(())
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
        self.mark_stale();
    }

    /// Threshold of [`BlendMode::IsoSurface`], `None` means the middle of the volume's range
    pub fn set_iso_value(&mut self, iso_value: Option<f32>) {
        self.iso_value = iso_value;
        self.mark_stale();
    }

    pub fn move_camera(&mut self, movement: CameraMove) {
        self.camera.apply(movement);
        self.mark_stale();
    }

    /// Look at the whole volume from its +z side
    pub fn reset_camera(&mut self) {
        let mut camera = PerspectiveCamera::default();
        if let Some(volume) = &self.volume {
            camera.reset_to_box(&volume.get_bound_box());
        }
        self.camera = camera;
        self.mark_stale();
    }

    pub fn set_render_options(&mut self, options: RenderOptions) -> Result<()> {
        options.validate()?;
        self.options = options;
        self.mark_stale();
        Ok(())
    }

    /// Hand the current frame to `encoder`
    ///
    /// A stale frame is exported as it is. Fails with [`RenderError::NoFrame`]
    /// before the first render, encoder failures come back as [`RenderError::Encoder`].
    pub fn export_frame<E: FrameEncoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        let frame = self.frame.as_ref().ok_or(RenderError::NoFrame)?;
        encoder.encode(frame).map_err(RenderError::Encoder)?;
        info!("Exported {}x{} frame", frame.width(), frame.height());
        Ok(())
    }

    pub fn volume(&self) -> Option<&VoxelVolume> {
        self.volume.as_deref()
    }

    pub fn color_function(&self) -> &ColorFunction {
        &self.color
    }

    pub fn opacity_function(&self) -> &OpacityFunction {
        &self.opacity
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Iso value the next render uses
    pub fn iso_value(&self) -> Option<f32> {
        self.iso_value
            .or_else(|| self.volume.as_ref().map(|v| v.value_range().midpoint()))
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.options
    }

    /// Last complete frame
    pub fn frame(&self) -> Option<Arc<Frame>> {
        self.frame.clone()
    }

    /// The frame does not reflect edits made since it was rendered
    pub fn is_frame_stale(&self) -> bool {
        self.frame.is_some() && self.frame_revision != self.revision
    }

    fn mark_stale(&mut self) {
        self.revision += 1;
    }

    fn swap_frame(&mut self, frame: Arc<Frame>, revision: u64) {
        self.frame = Some(frame);
        self.frame_revision = revision;
        self.pending = None;
    }

    /// Copy of everything a render needs
    fn scene(&self) -> Result<Scene> {
        let volume = self.volume.clone().ok_or(RenderError::NoVolume)?;
        let iso_value = self
            .iso_value
            .unwrap_or_else(|| volume.value_range().midpoint());

        let mut camera = self.camera.clone();
        let (width, height) = self.options.resolution;
        camera.change_aspect_from_resolution(width, height);

        Ok(Scene {
            volume,
            color: self.color.clone(),
            opacity: self.opacity.clone(),
            blend_mode: self.blend_mode,
            iso_value,
            camera,
            options: self.options,
        })
    }
}

impl Default for RenderSession {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}
