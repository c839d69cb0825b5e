//! Interrupt-time step routing
//!
//! Every extruder step pulse goes to exactly one of the N mixing steppers.
//! Each motor accumulates its weight whenever the scan visits it; the first
//! accumulator to overflow takes the pulse. Over a long run each motor's
//! share of pulses converges to its share of the total weight, and the
//! longest gap between two pulses to a motor is `COMPONENT_MAX / weight`
//! visits.
//!
//! The router only ever reads the color copied in by
//! [`PulseRouter::stepper_setup`]; nothing in the control context is touched
//! while stepping.

use crate::mixer::{ColorSnapshot, ColorVector, Precision};

/// Weighted round-robin step router
#[derive(Debug, Clone)]
pub struct PulseRouter<P: Precision, const N: usize> {
    /// Motor that took the last pulse; the scan resumes from here
    runner: usize,
    /// Weights of the current block
    seed: [P::Component; N],
    /// Per-motor fractional accumulators, kept across blocks
    accu: [P::Accumulator; N],
}

impl<P: Precision, const N: usize> Default for PulseRouter<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Precision, const N: usize> PulseRouter<P, N> {
    /// Create a router seeded with pure filament 0
    pub fn new() -> Self {
        Self {
            runner: 0,
            seed: *ColorVector::<P, N>::one_hot(0).components(),
            accu: [P::Accumulator::default(); N],
        }
    }

    /// Load the color of a block that is about to start
    ///
    /// Accumulators are kept so rounding carries across block boundaries.
    /// A [`ColorVector`] always has a nonzero component, so the scan in
    /// [`PulseRouter::select_motor`] always terminates.
    pub fn stepper_setup(&mut self, color: &ColorSnapshot<P, N>) {
        self.seed = *color.components();
    }

    /// Pick the motor for the next step pulse
    ///
    /// Always returns a motor index in `0..N`.
    #[inline]
    pub fn select_motor(&mut self) -> usize {
        loop {
            self.runner = if self.runner == 0 {
                N - 1
            } else {
                self.runner - 1
            };
            if P::accumulate(&mut self.accu[self.runner], self.seed[self.runner]) {
                return self.runner;
            }
        }
    }

    /// Motor that took the last pulse
    pub fn current_motor(&self) -> usize {
        self.runner
    }

    /// Weights of the current block
    pub fn seed(&self) -> &[P::Component; N] {
        &self.seed
    }

    /// Clear accumulators and scan position
    ///
    /// Only needed when the extruder is re-homed or re-enabled; normal block
    /// changes keep the accumulators.
    pub fn reset(&mut self) {
        self.runner = 0;
        self.accu = [P::Accumulator::default(); N];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::{Narrow, Unsigned, Wide};
    use proptest::prelude::*;

    fn counts<P: Precision, const N: usize>(
        router: &mut PulseRouter<P, N>,
        pulses: usize,
    ) -> [usize; N] {
        let mut counts = [0usize; N];
        for _ in 0..pulses {
            counts[router.select_motor()] += 1;
        }
        counts
    }

    #[test]
    fn test_sixteen_pulses_exact() {
        let mut router = PulseRouter::<Unsigned<4>, 4>::new();
        router.stepper_setup(&ColorVector::from_components([8, 4, 2, 2]));

        let mut sequence = [0usize; 16];
        for s in sequence.iter_mut() {
            *s = router.select_motor();
        }

        let mut counts = [0usize; 4];
        for &m in sequence.iter() {
            counts[m] += 1;
        }
        assert_eq!(counts, [8, 4, 2, 2]);

        // Interleaved: motor 0 never takes more than two pulses in a row
        for w in sequence.windows(3) {
            assert!(!(w[0] == 0 && w[1] == 0 && w[2] == 0));
        }
    }

    #[test]
    fn test_single_motor_gets_everything() {
        let mut router = PulseRouter::<Wide, 3>::new();
        router.stepper_setup(&ColorVector::one_hot(1));
        assert_eq!(counts(&mut router, 100), [0, 100, 0]);
        assert_eq!(router.current_motor(), 1);
    }

    #[test]
    fn test_uniform_alternates() {
        let mut router = PulseRouter::<Wide, 2>::new();
        router.stepper_setup(&ColorVector::uniform());
        assert_eq!(router.select_motor(), 1);
        assert_eq!(router.select_motor(), 0);
        assert_eq!(counts(&mut router, 10), [5, 5]);
    }

    #[test]
    fn test_accumulators_carry_across_blocks() {
        let mut router = PulseRouter::<Unsigned<4>, 2>::new();
        router.stepper_setup(&ColorVector::from_components([16, 8]));
        let first = counts(&mut router, 3);

        // Same color in a new block continues the same pattern
        router.stepper_setup(&ColorVector::from_components([16, 8]));
        let second = counts(&mut router, 3);
        assert_eq!(first[0] + second[0], 4);
        assert_eq!(first[1] + second[1], 2);
    }

    #[test]
    fn test_narrow_width_same_shape() {
        let mut router = PulseRouter::<Narrow, 2>::new();
        router.stepper_setup(&ColorVector::from_components([128, 64]));
        assert_eq!(counts(&mut router, 300), [200, 100]);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut router = PulseRouter::<Unsigned<4>, 3>::new();
        router.stepper_setup(&ColorVector::from_components([4, 4, 4]));
        router.select_motor();
        router.reset();
        assert_eq!(router.current_motor(), 0);
        assert_eq!(router.seed(), &[4, 4, 4]);
    }

    proptest! {
        #[test]
        fn prop_frequency_matches_weights(weights in proptest::array::uniform4(0u16..=256)) {
            prop_assume!(weights.iter().any(|&w| w > 0));
            let mut router = PulseRouter::<Unsigned<8>, 4>::new();
            router.stepper_setup(&ColorVector::from_components(weights));

            let pulses = 10 * 256 * 4;
            let got = counts(&mut router, pulses);
            let total: u32 = weights.iter().map(|&w| w as u32).sum();
            for i in 0..4 {
                let expected = weights[i] as f64 / total as f64;
                let observed = got[i] as f64 / pulses as f64;
                prop_assert!(
                    (expected - observed).abs() < 0.01,
                    "motor {} {} vs {}",
                    i,
                    observed,
                    expected
                );
                if weights[i] == 0 {
                    prop_assert_eq!(got[i], 0);
                }
            }
        }
    }
}
