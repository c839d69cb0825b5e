//! Z-height gradient controller
//!
//! Linearly blends between the mixes of two virtual tools as the nozzle
//! rises from `start_z` to `end_z`. The blended color is an overlay: it is
//! handed to new planner blocks but never written back into a tool.

use super::color::{ColorVector, PercentMix};
use super::precision::Precision;
use super::table::BlendTable;
use crate::config::GradientConfig;

/// Gradient controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GradientState {
    /// Range and tools are usable but the gradient is not armed
    Disabled,
    /// Start tool equals end tool, or start Z is not below end Z
    InvalidRange,
    /// Blending on every Z change
    Enabled,
}

/// Result of one control tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GradientStep {
    /// Gradient not enabled
    Idle,
    /// Same Z as the previous tick, nothing recomputed
    Unchanged,
    /// New blend computed
    Blended,
    /// End Z reached; the caller should select `end_tool`
    ///
    /// Without a virtual gradient tool the gradient has already cleared
    /// itself. With one, the range is kept so the tool can re-arm it.
    Finished {
        /// Tool to lock onto
        end_tool: u8,
    },
}

/// Gradient controller
#[derive(Debug, Clone)]
pub struct Gradient<P: Precision, const N: usize> {
    config: GradientConfig,
    enabled: bool,
    /// Mix of the start tool, cached on refresh
    start_mix: PercentMix<N>,
    /// Mix of the end tool, cached on refresh
    end_mix: PercentMix<N>,
    /// Mix for the last evaluated Z
    mix: PercentMix<N>,
    /// Fixed-point form of `mix`
    color: ColorVector<P, N>,
    /// Last Z evaluated (None = must recompute)
    prev_z: Option<f32>,
}

impl<P: Precision, const N: usize> Default for Gradient<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Precision, const N: usize> Gradient<P, N> {
    /// Create a disabled gradient with the default config
    pub fn new() -> Self {
        Self {
            config: GradientConfig::default(),
            enabled: false,
            start_mix: PercentMix::default(),
            end_mix: PercentMix::default(),
            mix: PercentMix::default(),
            color: ColorVector::one_hot(0),
            prev_z: None,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &GradientConfig {
        &self.config
    }

    /// Replace the configuration
    ///
    /// Takes effect on the next [`Gradient::refresh`].
    pub fn set_config(&mut self, config: GradientConfig) {
        self.config = config;
    }

    /// Check if the gradient is blending
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current controller state
    pub fn state(&self) -> GradientState {
        if self.enabled {
            GradientState::Enabled
        } else if !self.config.is_valid() {
            GradientState::InvalidRange
        } else {
            GradientState::Disabled
        }
    }

    /// Cached start mix
    pub fn start_mix(&self) -> &PercentMix<N> {
        &self.start_mix
    }

    /// Cached end mix
    pub fn end_mix(&self) -> &PercentMix<N> {
        &self.end_mix
    }

    /// Blended mix for the last evaluated Z
    pub fn mix(&self) -> &PercentMix<N> {
        &self.mix
    }

    /// Blended color for the last evaluated Z
    pub fn color(&self) -> &ColorVector<P, N> {
        &self.color
    }

    /// Re-evaluate after any config, tool or selection change
    ///
    /// Caches the start and end tool mixes and blends for `z`. The live
    /// percentage mix of the caller is never touched. Returns whether the
    /// gradient is enabled.
    pub fn refresh<const TOOLS: usize>(
        &mut self,
        table: &BlendTable<P, N, TOOLS>,
        active_tool: usize,
        z: f32,
    ) -> bool {
        let armed = self
            .config
            .vtool
            .map_or(true, |vtool| vtool as usize == active_tool);
        self.enabled = armed && self.config.is_valid();

        if self.enabled {
            self.start_mix = table.get(self.config.start_tool as usize).to_percent();
            self.end_mix = table.get(self.config.end_tool as usize).to_percent();
            self.prev_z = None;
            self.update_for_z(z);
        }
        self.prev_z = None;
        self.enabled
    }

    /// Blend for `z`, skipping the work if Z has not changed
    ///
    /// Returns true if a new blend was computed.
    pub fn update_for_z(&mut self, z: f32) -> bool {
        if self.prev_z == Some(z) {
            return false;
        }
        self.prev_z = Some(z);

        let span = self.config.end_z - self.config.start_z;
        let t = if span > 0.0 {
            (z - self.config.start_z) / span
        } else {
            1.0
        };
        self.mix = PercentMix::lerp(&self.start_mix, &self.end_mix, t);
        self.color = ColorVector::from_percent(&self.mix);
        true
    }

    /// Per-tick control for the current nozzle height
    pub fn control(&mut self, z: f32) -> GradientStep {
        if !self.enabled {
            return GradientStep::Idle;
        }

        if z >= self.config.end_z {
            let end_tool = self.config.end_tool;
            // Lock the blend to the end mix for anything still reading it
            self.update_for_z(self.config.end_z);
            if self.config.vtool.is_none() {
                self.disable_and_clear();
            }
            return GradientStep::Finished { end_tool };
        }

        if self.update_for_z(z) {
            GradientStep::Blended
        } else {
            GradientStep::Unchanged
        }
    }

    /// Disable and clear the range and tools
    pub fn disable_and_clear(&mut self) {
        self.config.clear();
        self.enabled = false;
        self.prev_z = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::precision::Wide;

    type Table = BlendTable<Wide, 2, 4>;

    fn ramp() -> GradientConfig {
        GradientConfig {
            start_z: 10.0,
            end_z: 20.0,
            start_tool: 0,
            end_tool: 1,
            vtool: None,
        }
    }

    #[test]
    fn test_default_is_invalid() {
        let g = Gradient::<Wide, 2>::new();
        assert_eq!(g.state(), GradientState::InvalidRange);
        assert!(!g.is_enabled());
    }

    #[test]
    fn test_refresh_caches_tool_mixes() {
        let table = Table::new();
        let mut g = Gradient::<Wide, 2>::new();
        g.set_config(ramp());
        assert!(g.refresh(&table, 0, 0.0));
        assert_eq!(g.state(), GradientState::Enabled);
        assert_eq!(g.start_mix().as_array(), &[100, 0]);
        assert_eq!(g.end_mix().as_array(), &[0, 100]);
    }

    #[test]
    fn test_blend_at_start_and_midpoint() {
        let table = Table::new();
        let mut g = Gradient::<Wide, 2>::new();
        g.set_config(ramp());
        g.refresh(&table, 0, 0.0);

        assert_eq!(g.control(10.0), GradientStep::Blended);
        assert_eq!(g.mix(), g.start_mix());

        assert_eq!(g.control(15.0), GradientStep::Blended);
        assert_eq!(g.mix().as_array(), &[50, 50]);
        assert_eq!(g.color().components(), &[0x8000, 0x8000]);

        // Below start Z the blend holds at the start mix
        g.control(2.0);
        assert_eq!(g.mix().as_array(), &[100, 0]);
    }

    #[test]
    fn test_same_z_is_cached() {
        let table = Table::new();
        let mut g = Gradient::<Wide, 2>::new();
        g.set_config(ramp());
        g.refresh(&table, 0, 0.0);

        assert_eq!(g.control(12.0), GradientStep::Blended);
        assert_eq!(g.control(12.0), GradientStep::Unchanged);
        assert_eq!(g.control(12.2), GradientStep::Blended);
    }

    #[test]
    fn test_converges_to_end_mix() {
        let table = Table::new();
        let mut g = Gradient::<Wide, 2>::new();
        g.set_config(ramp());
        g.refresh(&table, 0, 0.0);

        g.control(19.999);
        assert_eq!(g.mix(), g.end_mix());
    }

    #[test]
    fn test_end_z_finishes_and_clears() {
        let table = Table::new();
        let mut g = Gradient::<Wide, 2>::new();
        g.set_config(ramp());
        g.refresh(&table, 0, 0.0);

        assert_eq!(g.control(20.0), GradientStep::Finished { end_tool: 1 });
        assert!(!g.is_enabled());
        assert_eq!(g.config().end_z, 0.0);
        assert_eq!(g.control(25.0), GradientStep::Idle);
    }

    #[test]
    fn test_vtool_tracking() {
        let table = Table::new();
        let mut g = Gradient::<Wide, 2>::new();
        g.set_config(GradientConfig {
            vtool: Some(2),
            ..ramp()
        });

        // Not armed while another tool is active
        assert!(!g.refresh(&table, 0, 0.0));
        assert_eq!(g.state(), GradientState::Disabled);

        assert!(g.refresh(&table, 2, 0.0));

        // Past the end: hands over to the end tool but keeps its range
        assert_eq!(g.control(30.0), GradientStep::Finished { end_tool: 1 });
        assert_eq!(g.mix(), g.end_mix());
        assert_eq!(g.config().end_z, 20.0);
        assert_eq!(g.config().vtool, Some(2));
    }

    #[test]
    fn test_invalid_range_never_enables() {
        let table = Table::new();
        let mut g = Gradient::<Wide, 2>::new();
        g.set_config(GradientConfig {
            start_z: 20.0,
            end_z: 10.0,
            ..ramp()
        });
        assert!(!g.refresh(&table, 0, 0.0));
        assert_eq!(g.state(), GradientState::InvalidRange);
        assert_eq!(g.control(15.0), GradientStep::Idle);
    }
}
