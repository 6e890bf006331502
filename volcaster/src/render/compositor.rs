//! Per-mode accumulation of ray samples
//!
//! Samples arrive front to back. Each [`BlendMode`] has its own accumulator
//! state. The result is one premultiplied [`RGBA`] pixel.

use nalgebra::{Point3, Vector3};

use crate::{
    color::{self, RGB, RGBA},
    transfer_function::{ColorFunction, OpacityFunction},
};

use super::BlendMode;

/// One sample taken along a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaySample {
    pub intensity: f32,
    /// Classified (and possibly shaded) color, zero for modes that do not classify samples
    pub color: RGB,
    /// Classified opacity, zero for modes that do not classify samples
    pub opacity: f32,
    pub position: Point3<f32>,
    /// Length of the step this sample stands for, relative to the base step
    pub step_ratio: f32,
}

impl RaySample {
    /// Unclassified sample at the base step
    pub fn intensity(intensity: f32, position: Point3<f32>) -> RaySample {
        RaySample {
            intensity,
            color: RGB::zeros(),
            opacity: 0.0,
            position,
            step_ratio: 1.0,
        }
    }

    /// Classified sample at the base step
    pub fn classified(intensity: f32, color: RGB, opacity: f32, position: Point3<f32>) -> RaySample {
        RaySample {
            intensity,
            color,
            opacity,
            position,
            step_ratio: 1.0,
        }
    }
}

/// Whether the ray should keep marching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Deferred classification and shading, needed by modes that evaluate the
/// transfer functions once per ray
pub trait Classify {
    fn color(&self, intensity: f32) -> RGB;

    fn opacity(&self, intensity: f32) -> f32;

    /// Shade `color` at `position` seen along `view_dir`
    fn shade(&self, color: RGB, position: Point3<f32>, view_dir: Vector3<f32>) -> RGB;
}

/// Transfer function pair without shading
pub struct Unshaded<'a> {
    pub color: &'a ColorFunction,
    pub opacity: &'a OpacityFunction,
}

impl Classify for Unshaded<'_> {
    fn color(&self, intensity: f32) -> RGB {
        self.color.sample(intensity)
    }

    fn opacity(&self, intensity: f32) -> f32 {
        self.opacity.sample(intensity)
    }

    fn shade(&self, color: RGB, _position: Point3<f32>, _view_dir: Vector3<f32>) -> RGB {
        color
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Composite {
        color: RGB,
        alpha: f32,
        /// Early ray termination threshold
        termination: Option<f32>,
    },
    MaximumIntensity {
        extreme: Option<f32>,
    },
    MinimumIntensity {
        extreme: Option<f32>,
    },
    AverageIntensity {
        sum: f64,
        count: u32,
    },
    Additive {
        sum: RGBA,
    },
    /// Stops at the first sample strictly above `iso_value`
    IsoSurface {
        iso_value: f32,
        previous: Option<(f32, Point3<f32>)>,
        /// Intensity and position of the crossing
        hit: Option<(f32, Point3<f32>)>,
    },
}

impl Accumulator {
    /// Fresh accumulator for one ray
    ///
    /// `termination` enables early ray termination in [`BlendMode::Composite`].
    pub fn new(mode: BlendMode, iso_value: f32, termination: Option<f32>) -> Accumulator {
        match mode {
            BlendMode::Composite => Accumulator::Composite {
                color: RGB::zeros(),
                alpha: 0.0,
                termination,
            },
            BlendMode::MaximumIntensity => Accumulator::MaximumIntensity { extreme: None },
            BlendMode::MinimumIntensity => Accumulator::MinimumIntensity { extreme: None },
            BlendMode::AverageIntensity => Accumulator::AverageIntensity { sum: 0.0, count: 0 },
            BlendMode::Additive => Accumulator::Additive { sum: color::zero() },
            BlendMode::IsoSurface => Accumulator::IsoSurface {
                iso_value,
                previous: None,
                hit: None,
            },
        }
    }

    /// Fold next sample in
    pub fn push(&mut self, sample: &RaySample) -> Flow {
        match self {
            Accumulator::Composite {
                color,
                alpha,
                termination,
            } => {
                let opacity = corrected_opacity(sample.opacity, sample.step_ratio);

                *color += (1.0 - *alpha) * opacity * sample.color;
                *alpha += (1.0 - *alpha) * opacity;

                match termination {
                    Some(threshold) if *alpha >= *threshold => Flow::Stop,
                    _ => Flow::Continue,
                }
            }
            Accumulator::MaximumIntensity { extreme } => {
                let v = sample.intensity;
                *extreme = Some(extreme.map_or(v, |e| f32::max(e, v)));
                Flow::Continue
            }
            Accumulator::MinimumIntensity { extreme } => {
                let v = sample.intensity;
                *extreme = Some(extreme.map_or(v, |e| f32::min(e, v)));
                Flow::Continue
            }
            Accumulator::AverageIntensity { sum, count } => {
                *sum += sample.intensity as f64;
                *count += 1;
                Flow::Continue
            }
            Accumulator::Additive { sum } => {
                let weight = sample.opacity * sample.step_ratio;
                *sum += color::premultiplied(sample.color, weight);
                Flow::Continue
            }
            Accumulator::IsoSurface {
                iso_value,
                previous,
                hit,
            } => {
                let iso = *iso_value;
                if sample.intensity <= iso {
                    *previous = Some((sample.intensity, sample.position));
                    return Flow::Continue;
                }

                // refine crossing between the last sample not above and this one
                *hit = match *previous {
                    Some((prev_intensity, prev_pos)) if sample.intensity > prev_intensity => {
                        let t = (iso - prev_intensity) / (sample.intensity - prev_intensity);
                        let position = prev_pos + t * (sample.position - prev_pos);
                        Some((iso, position))
                    }
                    _ => Some((sample.intensity, sample.position)),
                };
                Flow::Stop
            }
        }
    }

    /// Final premultiplied pixel of the ray
    pub fn finish<C: Classify>(self, classifier: &C, view_dir: Vector3<f32>) -> RGBA {
        let classify_at = |intensity: f32| {
            color::premultiplied(classifier.color(intensity), classifier.opacity(intensity))
        };

        match self {
            Accumulator::Composite { color, alpha, .. } => {
                RGBA::new(color.x, color.y, color.z, alpha.clamp(0.0, 1.0))
            }
            Accumulator::MaximumIntensity { extreme } | Accumulator::MinimumIntensity { extreme } => {
                extreme.map_or_else(color::zero, classify_at)
            }
            Accumulator::AverageIntensity { sum, count } => {
                if count == 0 {
                    return color::zero();
                }
                classify_at((sum / count as f64) as f32)
            }
            Accumulator::Additive { sum } => sum.map(|c| c.clamp(0.0, 1.0)),
            Accumulator::IsoSurface { hit, .. } => match hit {
                Some((intensity, position)) => {
                    let shaded = classifier.shade(classifier.color(intensity), position, view_dir);
                    color::premultiplied(shaded, 1.0)
                }
                None => color::zero(),
            },
        }
    }

    /// Accumulated opacity so far, only meaningful for [`BlendMode::Composite`]
    pub fn alpha(&self) -> Option<f32> {
        match self {
            Accumulator::Composite { alpha, .. } => Some(*alpha),
            _ => None,
        }
    }
}

/// Opacity of a sample standing for `step_ratio` base steps
fn corrected_opacity(opacity: f32, step_ratio: f32) -> f32 {
    if step_ratio == 1.0 {
        opacity
    } else {
        1.0 - (1.0 - opacity).powf(step_ratio)
    }
}

#[cfg(test)]
mod test {

    use nalgebra::{point, vector};
    use proptest::prelude::*;

    use super::*;
    use crate::test_helpers::{grey_ramp, opacity_ramp};

    fn at(x: f32) -> Point3<f32> {
        point![x, 0.5, 0.5]
    }

    fn view() -> Vector3<f32> {
        vector![1.0, 0.0, 0.0]
    }

    #[test]
    fn composite_two_half_samples() {
        let mut acc = Accumulator::new(BlendMode::Composite, 0.0, None);
        let white = vector![1.0, 1.0, 1.0];
        acc.push(&RaySample::classified(500.0, white, 0.5, at(0.5)));
        acc.push(&RaySample::classified(500.0, white, 0.5, at(1.5)));
        assert_eq!(acc.alpha(), Some(0.75));

        let grey = grey_ramp(0.0, 1000.0);
        let opacity = opacity_ramp(0.0, 1000.0);
        let classifier = Unshaded {
            color: &grey,
            opacity: &opacity,
        };
        let pixel = acc.finish(&classifier, view());
        assert_eq!(pixel, RGBA::new(0.75, 0.75, 0.75, 0.75));
    }

    #[test]
    fn composite_terminates_early() {
        let mut acc = Accumulator::new(BlendMode::Composite, 0.0, Some(0.99));
        let red = vector![1.0, 0.0, 0.0];
        assert_eq!(
            acc.push(&RaySample::classified(1.0, red, 0.9, at(0.5))),
            Flow::Continue
        );
        assert_eq!(
            acc.push(&RaySample::classified(1.0, red, 0.95, at(1.5))),
            Flow::Stop
        );
    }

    #[test]
    fn maximum_matches_single_evaluation() {
        let color = grey_ramp(0.0, 1000.0);
        let opacity = opacity_ramp(0.0, 1000.0);
        let classifier = Unshaded {
            color: &color,
            opacity: &opacity,
        };

        let mut acc = Accumulator::new(BlendMode::MaximumIntensity, 0.0, None);
        for (i, v) in [100.0, 900.0, 300.0].into_iter().enumerate() {
            acc.push(&RaySample::intensity(v, at(i as f32)));
        }
        let pixel = acc.finish(&classifier, view());

        let expected = color::premultiplied(
            color.evaluate(900.0).unwrap(),
            opacity.evaluate(900.0).unwrap(),
        );
        assert_eq!(pixel, expected);
    }

    #[test]
    fn minimum_and_average() {
        let color = grey_ramp(0.0, 1000.0);
        let opacity = opacity_ramp(0.0, 1000.0);
        let classifier = Unshaded {
            color: &color,
            opacity: &opacity,
        };
        let samples = [100.0, 900.0, 200.0];

        let mut min = Accumulator::new(BlendMode::MinimumIntensity, 0.0, None);
        let mut avg = Accumulator::new(BlendMode::AverageIntensity, 0.0, None);
        for v in samples {
            min.push(&RaySample::intensity(v, at(0.0)));
            avg.push(&RaySample::intensity(v, at(0.0)));
        }

        let min = min.finish(&classifier, view());
        assert!((min.w - 0.1).abs() < 1e-6);

        let avg = avg.finish(&classifier, view());
        assert!((avg.w - 0.4).abs() < 1e-6);
    }

    #[test]
    fn empty_ray_is_transparent() {
        let color = grey_ramp(0.0, 1000.0);
        let opacity = opacity_ramp(0.0, 1000.0);
        let classifier = Unshaded {
            color: &color,
            opacity: &opacity,
        };
        for mode in BlendMode::ALL {
            let acc = Accumulator::new(mode, 500.0, None);
            assert_eq!(acc.finish(&classifier, view()), color::zero(), "{mode}");
        }
    }

    #[test]
    fn additive_sums_and_clamps() {
        let mut acc = Accumulator::new(BlendMode::Additive, 0.0, None);
        let white = vector![1.0, 1.0, 1.0];
        for _ in 0..3 {
            assert_eq!(
                acc.push(&RaySample::classified(1.0, white, 0.3, at(0.0))),
                Flow::Continue
            );
        }
        let color = grey_ramp(0.0, 1.0);
        let opacity = opacity_ramp(0.0, 1.0);
        let classifier = Unshaded {
            color: &color,
            opacity: &opacity,
        };
        let pixel = acc.clone().finish(&classifier, view());
        assert!((pixel.w - 0.9).abs() < 1e-6);

        for _ in 0..3 {
            acc.push(&RaySample::classified(1.0, white, 0.3, at(0.0)));
        }
        let pixel = acc.finish(&classifier, view());
        assert_eq!(pixel, RGBA::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn iso_surface_refines_crossing() {
        let mut acc = Accumulator::new(BlendMode::IsoSurface, 500.0, None);
        assert_eq!(
            acc.push(&RaySample::intensity(0.0, at(0.0))),
            Flow::Continue
        );
        assert_eq!(
            acc.push(&RaySample::intensity(1000.0, at(1.0))),
            Flow::Stop
        );

        match &acc {
            Accumulator::IsoSurface {
                hit: Some((intensity, position)),
                ..
            } => {
                assert_eq!(*intensity, 500.0);
                assert_eq!(*position, at(0.5));
            }
            other => panic!("no hit: {other:?}"),
        }

        let color = grey_ramp(0.0, 1000.0);
        let opacity = opacity_ramp(0.0, 1000.0);
        let classifier = Unshaded {
            color: &color,
            opacity: &opacity,
        };
        let pixel = acc.finish(&classifier, view());
        assert_eq!(pixel, RGBA::new(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn iso_surface_needs_sample_above_threshold() {
        let mut acc = Accumulator::new(BlendMode::IsoSurface, 500.0, None);
        assert_eq!(
            acc.push(&RaySample::intensity(500.0, at(0.0))),
            Flow::Continue
        );
        assert_eq!(
            acc.push(&RaySample::intensity(500.0, at(1.0))),
            Flow::Continue
        );

        let color = grey_ramp(0.0, 1000.0);
        let opacity = opacity_ramp(0.0, 1000.0);
        let classifier = Unshaded {
            color: &color,
            opacity: &opacity,
        };
        assert_eq!(acc.clone().finish(&classifier, view()), color::zero());

        assert_eq!(
            acc.push(&RaySample::intensity(600.0, at(2.0))),
            Flow::Stop
        );
        // opaque, the opacity function is not consulted
        let pixel = acc.finish(&classifier, view());
        assert_eq!(pixel, RGBA::new(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn step_ratio_corrects_opacity() {
        assert_eq!(corrected_opacity(0.5, 1.0), 0.5);
        assert!((corrected_opacity(0.5, 2.0) - 0.75).abs() < 1e-6);
        // two half steps make one full step
        let half = corrected_opacity(0.5, 0.5);
        let full = 1.0 - (1.0 - half) * (1.0 - half);
        assert!((full - 0.5).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn composite_alpha_bounded_and_non_decreasing(
            opacities in proptest::collection::vec(0.0f32..=1.0, 0..64),
        ) {
            let mut acc = Accumulator::new(BlendMode::Composite, 0.0, None);
            let mut last = 0.0;
            for a in opacities {
                acc.push(&RaySample::classified(0.0, RGB::zeros(), a, at(0.0)));
                let alpha = acc.alpha().unwrap();
                prop_assert!(alpha >= last);
                prop_assert!((0.0..=1.0).contains(&alpha));
                last = alpha;
            }
        }
    }
}
