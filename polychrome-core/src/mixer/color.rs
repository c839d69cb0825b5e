//! Blend representations
//!
//! A blend ratio exists in three forms:
//!
//! - [`ColorVector`]: fixed-point weights, largest component at
//!   `COMPONENT_MAX`. This is what the pulse router consumes.
//! - [`PercentMix`]: operator-facing percentages that always sum to 100 once
//!   settled.
//! - [`Collector`]: float weights for incremental composition.
//!
//! Conversions between them are explicit.

use super::precision::Precision;

/// One percentage component
pub type Percent = i8;

/// Fixed-point color vector, one weight per mixing stepper
///
/// Every vector built through this module has at least one nonzero
/// component, so it is always safe to hand to the pulse router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorVector<P: Precision, const N: usize> {
    components: [P::Component; N],
}

/// Color captured into a planner block at creation
pub type ColorSnapshot<P, const N: usize> = ColorVector<P, N>;

impl<P: Precision, const N: usize> ColorVector<P, N> {
    /// Pure filament from a single motor
    ///
    /// Out-of-range motors clamp to the last one.
    pub fn one_hot(motor: usize) -> Self {
        let motor = motor.min(N.saturating_sub(1));
        let mut components = [P::Component::default(); N];
        if let Some(c) = components.get_mut(motor) {
            *c = P::component(P::COMPONENT_MAX);
        }
        Self { components }
    }

    /// Equal weight on every motor
    pub fn uniform() -> Self {
        Self {
            components: [P::component(P::COMPONENT_MAX); N],
        }
    }

    /// Build from raw components
    ///
    /// An all-zero vector is replaced by [`ColorVector::uniform`].
    pub fn from_components(components: [P::Component; N]) -> Self {
        let color = Self { components };
        if color.is_zero() {
            debug!("mixer: zero color, falling back to uniform");
            Self::uniform()
        } else {
            color
        }
    }

    /// Build from 16-bit stored values, saturating at `COMPONENT_MAX`
    pub fn from_stored(values: &[u16; N]) -> Self {
        let mut components = [P::Component::default(); N];
        for (c, &v) in components.iter_mut().zip(values.iter()) {
            *c = P::component(v as u32);
        }
        Self::from_components(components)
    }

    /// Scale a settled percentage mix so its largest component is `COMPONENT_MAX`
    ///
    /// `component[i] = round(percent[i] * COMPONENT_MAX / max(percent))`.
    /// Negative percentages count as zero; if nothing is positive the result
    /// is uniform.
    pub fn from_percent(mix: &PercentMix<N>) -> Self {
        let max = mix.as_array().iter().copied().max().unwrap_or(0);
        if max <= 0 {
            return Self::uniform();
        }
        let max = max as u32;
        let mut components = [P::Component::default(); N];
        for (c, &p) in components.iter_mut().zip(mix.as_array().iter()) {
            let p = p.max(0) as u32;
            *c = P::component((2 * p * P::COMPONENT_MAX + max) / (2 * max));
        }
        Self::from_components(components)
    }

    /// Raw components
    pub fn components(&self) -> &[P::Component; N] {
        &self.components
    }

    /// Component for `motor` widened to `u32` (0 if out of range)
    pub fn weight(&self, motor: usize) -> u32 {
        self.components.get(motor).map_or(0, |&c| c.into())
    }

    /// Components widened to `u32`
    pub fn weights(&self) -> [u32; N] {
        let mut out = [0u32; N];
        for (o, &c) in out.iter_mut().zip(self.components.iter()) {
            *o = c.into();
        }
        out
    }

    /// Sum of all components
    pub fn sum(&self) -> u32 {
        self.components.iter().map(|&c| -> u32 { c.into() }).sum()
    }

    /// Check if every component is zero
    pub fn is_zero(&self) -> bool {
        self.sum() == 0
    }

    /// Convert to a percentage mix
    ///
    /// `percent[i] = round(100 * color[i] / sum)`, last component forced to
    /// the remainder.
    pub fn to_percent(&self) -> PercentMix<N> {
        PercentMix::from_weights(&self.weights())
    }
}

#[cfg(feature = "defmt")]
impl<P: Precision, const N: usize> defmt::Format for ColorVector<P, N> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[");
        for (i, w) in self.weights().iter().enumerate() {
            if i > 0 {
                defmt::write!(f, ", ");
            }
            defmt::write!(f, "{=u32}", *w);
        }
        defmt::write!(f, "]");
    }
}

/// Percentage mix
///
/// Components are edited individually; [`PercentMix::settle`] restores the
/// sum-to-100 invariant by deriving the last component as the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PercentMix<const N: usize> {
    values: [Percent; N],
}

impl<const N: usize> Default for PercentMix<N> {
    fn default() -> Self {
        Self::one_hot(0)
    }
}

impl<const N: usize> PercentMix<N> {
    /// 100% on one motor (clamped to the last)
    pub fn one_hot(motor: usize) -> Self {
        let motor = motor.min(N.saturating_sub(1));
        let mut values = [0; N];
        if let Some(v) = values.get_mut(motor) {
            *v = 100;
        }
        Self { values }
    }

    /// Even split, remainder on the last motor
    pub fn uniform() -> Self {
        let share = (100 / N.max(1)) as Percent;
        let mut mix = Self { values: [share; N] };
        mix.settle();
        mix
    }

    /// Build from raw percentages and settle them
    pub fn from_array(values: [Percent; N]) -> Self {
        let mut mix = Self { values };
        for v in mix.values.iter_mut() {
            *v = (*v).clamp(0, 100);
        }
        mix.settle();
        mix
    }

    /// Rounded percentage shares of integer weights
    ///
    /// All-zero weights give [`PercentMix::uniform`].
    pub fn from_weights(weights: &[u32; N]) -> Self {
        Self::from_weights_settled_on(weights, N.saturating_sub(1))
    }

    /// Like [`PercentMix::from_weights`], with the remainder on `motor`
    pub fn from_weights_settled_on(weights: &[u32; N], motor: usize) -> Self {
        let total: u64 = weights.iter().map(|&w| w as u64).sum();
        if total == 0 {
            return Self::uniform();
        }
        let mut values = [0; N];
        for (v, &w) in values.iter_mut().zip(weights.iter()) {
            // round(100 * w / total) without floats
            *v = ((200 * w as u64 + total) / (2 * total)) as Percent;
        }
        let mut mix = Self { values };
        mix.settle_on(motor);
        mix
    }

    /// Linear blend between two mixes, `t` clamped to [0, 1]
    pub fn lerp(start: &Self, end: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut values = [0; N];
        for ((v, &s), &e) in values.iter_mut().zip(start.values.iter()).zip(end.values.iter()) {
            let s = s as f32;
            let blended = s + (e as f32 - s) * t;
            *v = (blended + 0.5) as Percent;
        }
        let mut mix = Self { values };
        mix.settle();
        mix
    }

    /// Percentage for a motor (0 if out of range)
    pub fn get(&self, motor: usize) -> Percent {
        self.values.get(motor).copied().unwrap_or(0)
    }

    /// Set one motor's percentage, clamped to [0, 100]
    ///
    /// Other components are left alone until the next [`PercentMix::settle`].
    pub fn set(&mut self, motor: usize, value: i16) {
        if let Some(v) = self.values.get_mut(motor) {
            *v = value.clamp(0, 100) as Percent;
        }
    }

    /// Raw percentages
    pub fn as_array(&self) -> &[Percent; N] {
        &self.values
    }

    /// Sum of all components
    pub fn sum(&self) -> i16 {
        self.values.iter().map(|&v| v as i16).sum()
    }

    /// Force the last component to `100 - sum(others)`
    ///
    /// If the other components already exceed 100 they are scaled down
    /// proportionally first, so the last component never goes negative.
    pub fn settle(&mut self) {
        self.settle_on(N.saturating_sub(1));
    }

    /// Force `motor` (clamped) to `100 - sum(others)`
    pub fn settle_on(&mut self, motor: usize) {
        if N == 0 {
            return;
        }
        let motor = motor.min(N - 1);
        let head = |values: &[Percent; N]| -> i16 {
            values
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != motor)
                .map(|(_, &v)| v.max(0) as i16)
                .sum()
        };

        let mut total = head(&self.values);
        if total > 100 {
            for (i, v) in self.values.iter_mut().enumerate() {
                if i != motor {
                    *v = ((*v).max(0) as i16 * 100 / total) as Percent;
                }
            }
            total = head(&self.values);
        }
        self.values[motor] = (100 - total) as Percent;
    }
}

/// Float accumulation weights
///
/// Weights are never negative. They carry no scale of their own; only
/// their ratio matters when merged into a mix or a color.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Collector<const N: usize> {
    weights: [f32; N],
}

impl<const N: usize> Default for Collector<N> {
    fn default() -> Self {
        Self::one_hot(0)
    }
}

impl<const N: usize> Collector<N> {
    /// Weight 1.0 on one motor, 0.0 elsewhere
    pub fn one_hot(motor: usize) -> Self {
        let mut weights = [0.0; N];
        if let Some(w) = weights.get_mut(motor) {
            *w = 1.0;
        }
        Self { weights }
    }

    /// Weight for a motor (0.0 if out of range)
    pub fn get(&self, motor: usize) -> f32 {
        self.weights.get(motor).copied().unwrap_or(0.0)
    }

    /// Set one weight; negative values become zero
    pub fn set(&mut self, motor: usize, weight: f32) {
        if let Some(w) = self.weights.get_mut(motor) {
            *w = weight.max(0.0);
        }
    }

    /// Raw weights
    pub fn as_array(&self) -> &[f32; N] {
        &self.weights
    }

    /// Weights proportional to a color, summing to `proportion`
    pub fn from_color<P: Precision>(color: &ColorVector<P, N>, proportion: f32) -> Self {
        let sum = color.sum();
        let mut weights = [0.0; N];
        if sum == 0 {
            weights = [proportion / N.max(1) as f32; N];
        } else {
            let scale = proportion / sum as f32;
            for (w, c) in weights.iter_mut().zip(color.weights().iter()) {
                *w = *c as f32 * scale;
            }
        }
        let mut collector = Self { weights };
        for w in collector.weights.iter_mut() {
            *w = w.max(0.0);
        }
        collector
    }

    /// Weights equal to a mix's percentages
    pub fn from_percent(mix: &PercentMix<N>) -> Self {
        let mut weights = [0.0; N];
        for (w, &p) in weights.iter_mut().zip(mix.as_array().iter()) {
            *w = (p as f32).max(0.0);
        }
        Self { weights }
    }

    /// Merge into a settled percentage mix
    pub fn to_percent(&self) -> PercentMix<N> {
        let sum: f32 = self.weights.iter().sum();
        if sum <= 0.0 {
            return PercentMix::uniform();
        }
        let mut values = [0; N];
        for (v, &w) in values.iter_mut().zip(self.weights.iter()) {
            *v = (100.0 * w / sum + 0.5) as Percent;
        }
        let mut mix = PercentMix { values };
        mix.settle();
        mix
    }

    /// Scale so the largest weight becomes `COMPONENT_MAX`
    pub fn to_color<P: Precision>(&self) -> ColorVector<P, N> {
        let max = self.weights.iter().copied().fold(0.0f32, f32::max);
        if max <= 0.0 {
            return ColorVector::uniform();
        }
        let scale = P::COMPONENT_MAX as f32 / max;
        let mut components = [P::Component::default(); N];
        for (c, &w) in components.iter_mut().zip(self.weights.iter()) {
            *c = P::component((w * scale + 0.5) as u32);
        }
        ColorVector::from_components(components)
    }
}
