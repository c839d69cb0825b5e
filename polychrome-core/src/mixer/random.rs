//! Random remix controller
//!
//! Every `height` millimetres of Z travel between `start_z` and `end_z`, a
//! fresh random blend is drawn across the first `extruders` motors. Like the
//! gradient, the result is an overlay and never touches the tool table.

use rand_core::RngCore;

use super::color::{ColorVector, PercentMix};
use super::precision::Precision;
use crate::config::RandomConfig;

/// Result of one control tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RandomStep {
    /// Random mode not enabled
    Idle,
    /// Below start Z or not enough Z travel since the last remix
    Waiting,
    /// A new blend was drawn
    Remixed,
    /// Passed end Z; random mode switched itself off
    Expired,
}

/// Random remix controller
#[derive(Debug, Clone)]
pub struct RandomMix<P: Precision, const N: usize> {
    config: RandomConfig,
    enabled: bool,
    /// Z of the last remix (None = remix on the next eligible tick)
    prev_z: Option<f32>,
    /// Mix drawn by the last remix
    mix: PercentMix<N>,
    /// Overlay color, present once a remix has happened
    color: Option<ColorVector<P, N>>,
}

impl<P: Precision, const N: usize> Default for RandomMix<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Precision, const N: usize> RandomMix<P, N> {
    /// Create a disabled controller with defaults for `N` motors
    pub fn new() -> Self {
        Self {
            config: Self::default_config(),
            enabled: false,
            prev_z: None,
            mix: PercentMix::default(),
            color: None,
        }
    }

    fn default_config() -> RandomConfig {
        RandomConfig::with_extruders(N.min(u8::MAX as usize) as u8)
    }

    /// Current configuration
    pub fn config(&self) -> &RandomConfig {
        &self.config
    }

    /// Replace the configuration
    ///
    /// Takes effect on the next [`RandomMix::refresh`].
    pub fn set_config(&mut self, config: RandomConfig) {
        self.config = config;
    }

    /// Check if random mode is active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mix drawn by the last remix
    pub fn mix(&self) -> &PercentMix<N> {
        &self.mix
    }

    /// Overlay color, if a remix has happened since enabling
    pub fn color(&self) -> Option<&ColorVector<P, N>> {
        self.color.as_ref()
    }

    /// Re-evaluate after a config change
    ///
    /// Returns whether random mode is enabled.
    pub fn refresh(&mut self) -> bool {
        self.enabled = self.config.is_valid();
        self.prev_z = None;
        self.color = None;
        self.enabled
    }

    /// Per-tick control for the current nozzle height
    pub fn control<R: RngCore>(&mut self, z: f32, rng: &mut R) -> RandomStep {
        if !self.enabled {
            return RandomStep::Idle;
        }

        if z > self.config.end_z {
            self.config = Self::default_config();
            self.enabled = false;
            self.prev_z = None;
            self.color = None;
            return RandomStep::Expired;
        }

        if z < self.config.start_z {
            return RandomStep::Waiting;
        }

        if let Some(prev) = self.prev_z {
            if z - prev < self.config.height {
                return RandomStep::Waiting;
            }
        }

        self.prev_z = Some(z);
        self.mix = self.draw(rng);
        self.color = Some(ColorVector::from_percent(&self.mix));
        RandomStep::Remixed
    }

    /// Disable and clear the range, keeping height and motor count
    pub fn disable_and_clear(&mut self) {
        self.config.start_z = 0.0;
        self.config.end_z = 0.0;
        self.enabled = false;
        self.prev_z = None;
        self.color = None;
    }

    /// Draw a random mix over the eligible motors
    ///
    /// Every eligible motor gets a weight in 1..=100, so the result is
    /// never all zero. Ineligible motors stay at 0%.
    fn draw<R: RngCore>(&self, rng: &mut R) -> PercentMix<N> {
        let eligible = self.config.eligible(N);
        let mut weights = [0u32; N];
        for w in weights.iter_mut().take(eligible) {
            *w = 1 + rng.next_u32() % 100;
        }
        PercentMix::from_weights_settled_on(&weights, eligible - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::precision::Wide;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layered(start_z: f32, end_z: f32, height: f32, extruders: u8) -> RandomConfig {
        RandomConfig {
            start_z,
            end_z,
            height,
            extruders,
        }
    }

    #[test]
    fn test_invalid_range_stays_disabled() {
        let mut r = RandomMix::<Wide, 4>::new();
        r.set_config(layered(5.0, 5.0, 0.2, 4));
        assert!(!r.refresh());
        assert_eq!(r.control(5.0, &mut StdRng::seed_from_u64(1)), RandomStep::Idle);
    }

    #[test]
    fn test_zero_height_stays_disabled() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut r = RandomMix::<Wide, 4>::new();
        r.set_config(layered(0.0, 10.0, 0.0, 4));
        assert!(!r.refresh());

        for _ in 0..100 {
            assert_eq!(r.control(1.0, &mut rng), RandomStep::Idle);
        }
        assert!(r.color().is_none());
    }

    #[test]
    fn test_remix_period() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut r = RandomMix::<Wide, 4>::new();
        r.set_config(layered(1.0, 10.0, 0.5, 4));
        assert!(r.refresh());

        assert_eq!(r.control(0.5, &mut rng), RandomStep::Waiting);
        assert!(r.color().is_none());

        assert_eq!(r.control(1.0, &mut rng), RandomStep::Remixed);
        assert!(r.color().is_some());
        assert_eq!(r.control(1.0, &mut rng), RandomStep::Waiting);
        assert_eq!(r.control(1.25, &mut rng), RandomStep::Waiting);
        assert_eq!(r.control(1.5, &mut rng), RandomStep::Remixed);
    }

    #[test]
    fn test_remix_respects_eligible_motors() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut r = RandomMix::<Wide, 4>::new();
        r.set_config(layered(0.0, 100.0, 1.0, 2));
        r.refresh();

        for layer in 0..50 {
            assert_eq!(r.control(layer as f32, &mut rng), RandomStep::Remixed);
            let mix = r.mix();
            assert_eq!(mix.sum(), 100);
            assert_eq!(mix.get(2), 0);
            assert_eq!(mix.get(3), 0);
            assert!(mix.get(0) >= 0 && mix.get(1) >= 0);
            assert!(!r.color().unwrap().is_zero());
        }
    }

    #[test]
    fn test_expires_past_end_z() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut r = RandomMix::<Wide, 3>::new();
        r.set_config(layered(0.0, 2.0, 0.3, 1));
        r.refresh();

        assert_eq!(r.control(1.0, &mut rng), RandomStep::Remixed);
        assert_eq!(r.control(2.5, &mut rng), RandomStep::Expired);
        assert!(!r.is_enabled());
        assert!(r.color().is_none());
        assert_eq!(r.config(), &RandomConfig::with_extruders(3));
    }

    #[test]
    fn test_single_extruder_is_pure() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut r = RandomMix::<Wide, 3>::new();
        r.set_config(layered(0.0, 2.0, 0.3, 1));
        r.refresh();
        r.control(0.0, &mut rng);
        assert_eq!(r.mix().as_array(), &[100, 0, 0]);
    }
}
