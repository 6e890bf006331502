/// Rule by which samples along a ray are folded into one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Front-to-back alpha blending
    #[default]
    Composite,
    /// Transfer functions applied to the largest intensity on the ray
    MaximumIntensity,
    /// Transfer functions applied to the smallest intensity on the ray
    MinimumIntensity,
    /// Transfer functions applied to the mean intensity on the ray
    AverageIntensity,
    /// Sum of premultiplied samples without attenuation
    Additive,
    /// First sample above the iso value, shaded
    ///
    /// The crossing is refined between the last two samples and colored by the
    /// color function alone. The pixel is opaque, the opacity function is not used.
    IsoSurface,
}

impl BlendMode {
    /// All modes, in the order of their UI index
    pub const ALL: [BlendMode; 6] = [
        BlendMode::Composite,
        BlendMode::MaximumIntensity,
        BlendMode::MinimumIntensity,
        BlendMode::AverageIntensity,
        BlendMode::Additive,
        BlendMode::IsoSurface,
    ];

    /// Mode for combo box index `0..=5`
    pub fn from_index(index: i32) -> Option<BlendMode> {
        usize::try_from(index)
            .ok()
            .and_then(|i| BlendMode::ALL.get(i))
            .copied()
    }

    /// Combo box index of the mode
    pub fn index(self) -> i32 {
        match self {
            BlendMode::Composite => 0,
            BlendMode::MaximumIntensity => 1,
            BlendMode::MinimumIntensity => 2,
            BlendMode::AverageIntensity => 3,
            BlendMode::Additive => 4,
            BlendMode::IsoSurface => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlendMode::Composite => "Composite",
            BlendMode::MaximumIntensity => "Maximum intensity",
            BlendMode::MinimumIntensity => "Minimum intensity",
            BlendMode::AverageIntensity => "Average intensity",
            BlendMode::Additive => "Additive",
            BlendMode::IsoSurface => "Iso surface",
        }
    }

    /// Mode consumes classified (color, opacity) samples rather than bare intensities
    pub fn classifies_samples(self) -> bool {
        matches!(self, BlendMode::Composite | BlendMode::Additive)
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn index_round_trip() {
        for mode in BlendMode::ALL {
            assert_eq!(BlendMode::from_index(mode.index()), Some(mode));
        }
    }

    #[test]
    fn unknown_index() {
        assert_eq!(BlendMode::from_index(-1), None);
        assert_eq!(BlendMode::from_index(6), None);
    }

    #[test]
    fn default_is_composite() {
        assert_eq!(BlendMode::default(), BlendMode::Composite);
        assert_eq!(BlendMode::from_index(5), Some(BlendMode::IsoSurface));
    }
}
