//! Ray casting of [`Scene`]s into [`Frame`]s
//!
//! [`RaySampler`] marches single rays, [`ParallelRenderer`] renders whole frames
//! on worker threads and [`RendererFront`] runs renders in the background.

mod blend_mode;
pub mod compositor;
mod frame;
mod parallel;
mod render_front;
mod render_options;
mod sampler;
mod scene;

pub use blend_mode::BlendMode;
pub use frame::Frame;
pub use parallel::{tiles, CancelToken, ParallelRenderer, PixelBox};
pub use render_front::{RenderDone, RendererFront, RendererMessage};
pub use render_options::{Lighting, RenderOptions, RenderOptionsBuilder};
pub use sampler::RaySampler;
pub use scene::Scene;
