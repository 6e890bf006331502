//! CPU ray-casting core for interactive volume rendering
//!
//! A decoded scalar volume ([`VoxelVolume`]) is classified by editable transfer
//! functions ([`ColorFunction`], [`OpacityFunction`]) and ray cast into a
//! [`Frame`] under one of the [`BlendMode`]s. [`RenderSession`] ties it together,
//! [`SliderPanel`] is the glue a slider based UI talks to.
//!
//! ```
//! use volcaster::{render::RenderOptions, RenderSession};
//! use nalgebra::vector;
//!
//! let options = RenderOptions::builder().resolution(16, 16).build().unwrap();
//! let mut session = RenderSession::new(options);
//! session
//!     .load_decoded(vector![2, 2, 2], vector![1.0, 1.0, 1.0], nalgebra::Point3::origin(), vec![500u16; 8])
//!     .unwrap();
//! let frame = session.render().unwrap();
//! assert_eq!(frame.resolution(), (16, 16));
//! ```

pub mod camera;
pub mod color;
pub mod common;
pub mod controls;
pub mod error;
pub mod render;
pub mod session;
pub mod test_helpers;
pub mod transfer_function;
pub mod volume;

pub use camera::{CameraMove, PerspectiveCamera};
pub use controls::SliderPanel;
pub use error::{RenderError, Result};
pub use render::{BlendMode, Frame, RenderOptions};
pub use session::{FrameEncoder, RenderSession, SessionState, TransferFunctionEdit};
pub use transfer_function::{ColorFunction, OpacityFunction, TransferFunction};
pub use volume::VoxelVolume;
