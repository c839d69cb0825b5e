//! Mixer configuration type definitions
//!
//! Plain data edited by the UI and G-code layers. Validation happens when a
//! config is handed to the mixer, never here.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default layer height between random remixes (mm)
pub const DEFAULT_RANDOM_HEIGHT_MM: f32 = 0.2;

/// Gradient configuration
///
/// Blends linearly from `start_tool` at `start_z` to `end_tool` at `end_z`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GradientConfig {
    /// Height where the blend starts (mm)
    pub start_z: f32,
    /// Height where the blend ends (mm)
    pub end_z: f32,
    /// Tool whose mix is used at `start_z`
    pub start_tool: u8,
    /// Tool whose mix is used at `end_z`
    pub end_tool: u8,
    /// Virtual tool that arms the gradient
    ///
    /// When set, the gradient is only active while this tool is selected,
    /// and it stays armed after `end_z` is reached.
    pub vtool: Option<u8>,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            start_z: 0.0,
            end_z: 0.0,
            start_tool: 0,
            end_tool: 1,
            vtool: None,
        }
    }
}

impl GradientConfig {
    /// Check whether the range and tools describe a usable gradient
    pub fn is_valid(&self) -> bool {
        self.start_tool != self.end_tool && self.start_z < self.end_z
    }

    /// Clear the range and tools, keeping the virtual tool binding
    pub fn clear(&mut self) {
        self.start_z = 0.0;
        self.end_z = 0.0;
        self.start_tool = 0;
        self.end_tool = 0;
    }
}

/// Random remix configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RandomConfig {
    /// Height where remixing starts (mm)
    pub start_z: f32,
    /// Height after which remixing stops (mm)
    pub end_z: f32,
    /// Minimum Z travel between two remixes (mm)
    pub height: f32,
    /// Number of motors that take part, counted from motor 0
    ///
    /// Clamped to 1..=N when used.
    pub extruders: u8,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self::with_extruders(u8::MAX)
    }
}

impl RandomConfig {
    /// Disabled config with the default height for `extruders` motors
    pub const fn with_extruders(extruders: u8) -> Self {
        Self {
            start_z: 0.0,
            end_z: 0.0,
            height: DEFAULT_RANDOM_HEIGHT_MM,
            extruders,
        }
    }

    /// Check whether the range and height describe a usable remix region
    ///
    /// A height that is not strictly positive (or NaN) would remix on every
    /// tick, so it is rejected.
    pub fn is_valid(&self) -> bool {
        self.start_z < self.end_z && self.height > 0.0
    }

    /// Number of participating motors for an `n`-motor mixer
    pub fn eligible(&self, n: usize) -> usize {
        (self.extruders as usize).clamp(1, n.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_validity() {
        let mut g = GradientConfig::default();
        assert!(!g.is_valid());

        g.end_z = 10.0;
        assert!(g.is_valid());

        g.end_tool = g.start_tool;
        assert!(!g.is_valid());

        g.end_tool = 2;
        g.start_z = 10.0;
        assert!(!g.is_valid());
    }

    #[test]
    fn test_gradient_clear_keeps_vtool() {
        let mut g = GradientConfig {
            start_z: 1.0,
            end_z: 5.0,
            start_tool: 1,
            end_tool: 2,
            vtool: Some(3),
        };
        g.clear();
        assert_eq!(g.start_z, 0.0);
        assert_eq!(g.end_tool, 0);
        assert_eq!(g.vtool, Some(3));
    }

    #[test]
    fn test_random_eligible_clamps() {
        let r = RandomConfig::default();
        assert_eq!(r.eligible(4), 4);
        assert_eq!(RandomConfig::with_extruders(0).eligible(4), 1);
        assert_eq!(RandomConfig::with_extruders(2).eligible(4), 2);
        assert!(!r.is_valid());
        assert_eq!(r.height, DEFAULT_RANDOM_HEIGHT_MM);
    }

    #[test]
    fn test_random_height_must_be_positive() {
        let mut r = RandomConfig {
            start_z: 0.0,
            end_z: 10.0,
            ..RandomConfig::default()
        };
        assert!(r.is_valid());

        r.height = 0.0;
        assert!(!r.is_valid());
        r.height = -0.2;
        assert!(!r.is_valid());
        r.height = f32::NAN;
        assert!(!r.is_valid());
    }
}
