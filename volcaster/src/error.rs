use thiserror::Error;

/// Errors reported by the rendering core.
///
/// Every error is returned synchronously from the operation that triggered it.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Decoded volume cannot be used (zero dimension, wrong data length, bad spacing)
    #[error("invalid volume: {0}")]
    InvalidVolume(String),

    /// Render requested before any volume was loaded
    #[error("no volume loaded")]
    NoVolume,

    /// Export requested before any render finished
    #[error("no frame rendered yet")]
    NoFrame,

    /// Transfer function without control points cannot be evaluated
    #[error("transfer function has no control points")]
    DegenerateTransferFunction,

    /// Control point placed at a value that is not finite
    #[error("control point at non-finite value {0}")]
    InvalidControlPoint(f32),

    /// Render options failed validation
    #[error("invalid render options: {0}")]
    InvalidOptions(String),

    /// Intensity range entered by the user is outside the accepted bounds
    #[error("intensity range {0} outside 0..=100000")]
    InvalidIntensityRange(i64),

    /// Frame encoder collaborator failed
    #[error("frame export failed: {0}")]
    Encoder(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Background render thread is no longer running
    #[error("render thread unavailable")]
    RendererUnavailable,
}

pub type Result<T> = std::result::Result<T, RenderError>;
