use nalgebra::{vector, Vector3, Vector4};

/// Color channels, each in `<0;1>`
pub type RGB = Vector3<f32>;

/// Color with opacity, each channel in `<0;1>`
///
/// Colors produced by compositing are premultiplied by their opacity.
pub type RGBA = Vector4<f32>;

pub fn new(r: f32, g: f32, b: f32, a: f32) -> RGBA {
    vector![r, g, b, a]
}

pub fn zero() -> RGBA {
    vector![0.0, 0.0, 0.0, 0.0]
}

/// Premultiply `color` by `opacity`
pub fn premultiplied(color: RGB, opacity: f32) -> RGBA {
    let rgb = color * opacity;
    vector![rgb.x, rgb.y, rgb.z, opacity]
}

/// Blend premultiplied `color` over an opaque `background`, result is opaque
pub fn over_background(color: RGBA, background: RGB) -> RGB {
    color.xyz() + (1.0 - color.w) * background
}

/// Convert channel in `<0;1>` to a byte, values outside are clamped
pub fn channel_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
