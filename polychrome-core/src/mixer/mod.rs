//! Color mixing
//!
//! [`Mixer`] owns everything the control context edits: the virtual tool
//! table, the live percentage mix, the collector and the gradient and random
//! controllers. It hands the interrupt context nothing but a
//! [`ColorSnapshot`] copied into each planner block.

pub mod color;
pub mod gradient;
pub mod precision;
pub mod random;
pub mod table;

pub use color::{Collector, ColorSnapshot, ColorVector, Percent, PercentMix};
pub use gradient::{Gradient, GradientState, GradientStep};
pub use precision::{Narrow, Precision, Signed8, Unsigned, Wide};
pub use random::{RandomMix, RandomStep};
pub use table::{BlendTable, SYSTEM_TOOLS};

use rand_core::RngCore;

use crate::config::{GradientConfig, RandomConfig};

/// Active mixing mode, for status display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MixMode {
    /// Blocks use the active tool's color
    Manual,
    /// Z gradient between two tools
    Gradient,
    /// Z gradient armed by a virtual gradient tool
    GradientTool,
    /// Random remix per layer band
    Random,
}

/// Mixing extruder state for one nozzle
///
/// - `P`: fixed-point width
/// - `N`: number of mixing steppers
/// - `TOOLS`: virtual tools including the [`SYSTEM_TOOLS`] reserved slots
#[derive(Debug, Clone)]
pub struct Mixer<P: Precision, const N: usize, const TOOLS: usize> {
    table: BlendTable<P, N, TOOLS>,
    /// Live percentage mix (scratch for editing)
    mix: PercentMix<N>,
    collector: Collector<N>,
    selected: usize,
    gradient: Gradient<P, N>,
    random: RandomMix<P, N>,
    /// Last nozzle height seen by the control hooks
    planner_z: f32,
}

impl<P: Precision, const N: usize, const TOOLS: usize> Default for Mixer<P, N, TOOLS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Precision, const N: usize, const TOOLS: usize> Mixer<P, N, TOOLS> {
    /// Create a mixer with boot-time tools, tool 0 selected
    pub fn new() -> Self {
        let table = BlendTable::new();
        let mix = table.get(0).to_percent();
        Self {
            table,
            mix,
            collector: Collector::one_hot(0),
            selected: 0,
            gradient: Gradient::new(),
            random: RandomMix::new(),
            planner_z: 0.0,
        }
    }

    // ---- Tool table -------------------------------------------------------

    /// Restore boot-time tool colors and re-derive the live mix
    pub fn reset_tools(&mut self) {
        self.table.reset();
        self.mix = self.table.get(self.selected).to_percent();
        self.refresh_gradient();
        debug!("mixer: tools reset");
    }

    /// The tool table
    pub fn table(&self) -> &BlendTable<P, N, TOOLS> {
        &self.table
    }

    /// Color of a tool (index clamped)
    pub fn tool_color(&self, index: usize) -> &ColorVector<P, N> {
        self.table.get(index)
    }

    /// Overwrite a tool color (index clamped)
    ///
    /// Used when restoring persisted settings.
    pub fn set_tool_color(&mut self, index: usize, color: ColorVector<P, N>) {
        let index = BlendTable::<P, N, TOOLS>::clamp_index(index);
        self.table.set(index, color);
        if index == self.selected {
            self.mix = color.to_percent();
        }
        self.refresh_gradient();
    }

    /// Currently selected tool
    pub fn active_tool(&self) -> usize {
        self.selected
    }

    /// Select a tool (index clamped)
    ///
    /// Re-derives the live mix from the tool. If the gradient tracks a
    /// virtual tool, it is re-evaluated against the new selection.
    pub fn set_active_tool(&mut self, index: usize) {
        let index = BlendTable::<P, N, TOOLS>::clamp_index(index);
        self.selected = index;
        if self.gradient.config().vtool.is_some() {
            self.refresh_gradient();
        }
        self.mix = self.table.get(index).to_percent();
        trace!("mixer: tool {=usize} selected", index);
    }

    /// Percentage mix of any tool (index clamped)
    pub fn tool_to_percentage(&self, index: usize) -> PercentMix<N> {
        self.table.get(index).to_percent()
    }

    // ---- Mix editor -------------------------------------------------------

    /// Live percentage mix
    pub fn mix(&self) -> &PercentMix<N> {
        &self.mix
    }

    /// One live percentage
    pub fn percentage(&self, motor: usize) -> Percent {
        self.mix.get(motor)
    }

    /// Edit one live percentage, clamped to [0, 100]
    ///
    /// Nothing is renormalized until [`Mixer::commit_mix`].
    pub fn edit_percentage(&mut self, motor: usize, value: i16) {
        self.mix.set(motor, value);
    }

    /// Replace the whole live mix
    pub fn set_mix(&mut self, mix: PercentMix<N>) {
        self.mix = mix;
    }

    /// Commit the live mix into the active tool
    ///
    /// The last percentage is forced to the remainder, then the mix is
    /// scaled so its largest component is `COMPONENT_MAX`.
    pub fn commit_mix(&mut self) {
        self.mix.settle();
        let color = ColorVector::from_percent(&self.mix);
        self.table.set(self.selected, color);
        debug!(
            "mixer: tool {=usize} committed {}",
            self.selected,
            self.mix.as_array()
        );
        self.refresh_gradient();
    }

    // ---- Collector --------------------------------------------------------

    /// Collector weights
    pub fn collector(&self) -> &Collector<N> {
        &self.collector
    }

    /// Set one collector weight; negative values become zero
    pub fn set_collector(&mut self, motor: usize, weight: f32) {
        self.collector.set(motor, weight);
    }

    /// One-hot collector on `motor`
    pub fn reset_collector(&mut self, motor: usize) {
        self.collector = Collector::one_hot(motor);
    }

    /// Load the collector from a tool, scaled to sum to `proportion`
    pub fn refresh_collector(&mut self, proportion: f32, tool: usize) {
        self.collector = Collector::from_color(self.table.get(tool), proportion);
    }

    /// Copy the live mix into the collector
    pub fn copy_mix_to_collector(&mut self) {
        self.collector = Collector::from_percent(&self.mix);
    }

    /// Merge the collector into the live mix
    pub fn copy_collector_to_mix(&mut self) {
        self.mix = self.collector.to_percent();
    }

    /// Store the collector into a tool (index clamped)
    ///
    /// The largest weight becomes `COMPONENT_MAX`; an empty collector
    /// stores a uniform blend.
    pub fn normalize(&mut self, tool: usize) {
        let tool = BlendTable::<P, N, TOOLS>::clamp_index(tool);
        let color = self.collector.to_color::<P>();
        self.table.set(tool, color);
        if tool == self.selected {
            self.mix = color.to_percent();
        }
        self.refresh_gradient();
    }

    /// Mix directly from weights through the reserved direct-set tool
    pub fn direct_set(&mut self, weights: &[f32; N]) {
        for (motor, &w) in weights.iter().enumerate() {
            self.collector.set(motor, w);
        }
        let tool = BlendTable::<P, N, TOOLS>::direct_set_tool();
        self.normalize(tool);
        self.set_active_tool(tool);
    }

    // ---- Block snapshot ---------------------------------------------------

    /// Capture the color for a new planner block
    ///
    /// Call exactly once per block, when the planner finalizes it. The
    /// gradient overlay wins, then the random overlay, then the active tool.
    pub fn populate_block(&self) -> ColorSnapshot<P, N> {
        if self.gradient.is_enabled() {
            return *self.gradient.color();
        }
        if self.random.is_enabled() {
            if let Some(color) = self.random.color() {
                return *color;
            }
        }
        *self.table.get(self.selected)
    }

    // ---- Gradient ---------------------------------------------------------

    /// Gradient configuration
    pub fn gradient_config(&self) -> &GradientConfig {
        self.gradient.config()
    }

    /// Replace the gradient configuration and re-evaluate
    pub fn set_gradient(&mut self, config: GradientConfig) {
        let config = GradientConfig {
            start_tool: BlendTable::<P, N, TOOLS>::clamp_index(config.start_tool as usize) as u8,
            end_tool: BlendTable::<P, N, TOOLS>::clamp_index(config.end_tool as usize) as u8,
            ..config
        };
        self.gradient.set_config(config);
        self.refresh_gradient();
    }

    /// The gradient controller
    pub fn gradient(&self) -> &Gradient<P, N> {
        &self.gradient
    }

    /// Re-evaluate the gradient after a change
    ///
    /// Enabling the gradient switches random mode off.
    pub fn refresh_gradient(&mut self) {
        let was_enabled = self.gradient.is_enabled();
        let enabled = self
            .gradient
            .refresh(&self.table, self.selected, self.planner_z);

        if enabled && self.random.is_enabled() {
            self.random.disable_and_clear();
            info!("mixer: random mix off, gradient takes over");
        }
        if enabled != was_enabled {
            info!("mixer: gradient enabled={=bool}", enabled);
        }
    }

    /// Per-tick gradient hook
    pub fn gradient_control(&mut self, z: f32) -> GradientStep {
        self.planner_z = z;
        if self.random.is_enabled() {
            return GradientStep::Idle;
        }

        let step = self.gradient.control(z);
        if let GradientStep::Finished { end_tool } = step {
            info!("mixer: gradient finished at z={=f32}", z);
            self.set_active_tool(end_tool as usize);
        }
        step
    }

    // ---- Random -----------------------------------------------------------

    /// Random configuration
    pub fn random_config(&self) -> &RandomConfig {
        self.random.config()
    }

    /// Replace the random configuration and re-evaluate
    ///
    /// Enabling random mode disables and clears the gradient.
    pub fn set_random(&mut self, config: RandomConfig) {
        self.random.set_config(config);
        if self.random.refresh() {
            if self.gradient.is_enabled() {
                info!("mixer: gradient off, random mix takes over");
            }
            self.gradient.disable_and_clear();
        }
    }

    /// The random controller
    pub fn random(&self) -> &RandomMix<P, N> {
        &self.random
    }

    /// Per-tick random remix hook
    pub fn randommix_control<R: RngCore>(&mut self, z: f32, rng: &mut R) -> RandomStep {
        self.planner_z = z;
        if self.gradient.is_enabled() {
            return RandomStep::Idle;
        }

        let step = self.random.control(z, rng);
        match step {
            RandomStep::Remixed => {
                debug!("mixer: remix at z={=f32} {}", z, self.random.mix().as_array());
            }
            RandomStep::Expired => {
                info!("mixer: random mix expired at z={=f32}", z);
            }
            RandomStep::Idle | RandomStep::Waiting => {}
        }
        step
    }

    // ---- Status -----------------------------------------------------------

    /// Current mixing mode
    pub fn mode(&self) -> MixMode {
        if self.gradient.is_enabled() {
            if self.gradient.config().vtool.is_some() {
                MixMode::GradientTool
            } else {
                MixMode::Gradient
            }
        } else if self.random.is_enabled() {
            MixMode::Random
        } else {
            MixMode::Manual
        }
    }

    /// Mix currently driving new blocks, for display
    pub fn effective_mix(&self) -> PercentMix<N> {
        if self.gradient.is_enabled() {
            *self.gradient.mix()
        } else if self.random.is_enabled() && self.random.color().is_some() {
            *self.random.mix()
        } else {
            self.tool_to_percentage(self.selected)
        }
    }
}
