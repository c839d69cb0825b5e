//! Mixing extruder step output
//!
//! Owns the pulse router and one step pin per mixing stepper. The stepper
//! interrupt calls [`MixingExtruder::tick`] (or [`MixingExtruder::step`] when
//! it manages blocks itself); each call raises exactly one step pin.
//! Direction and enable pins are shared by all mixing steppers and stay with
//! the board.

use embedded_hal::digital::OutputPin;
use polychrome_core::mixer::Precision;
use polychrome_core::motion::{BlockConsumer, PlannerBlock, PulseRouter};

/// Extruder output errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtruderError<E> {
    /// A step pin write failed
    Pin(E),
}

/// Mixing extruder with `N` step pins
pub struct MixingExtruder<P: Precision, PIN, const N: usize> {
    router: PulseRouter<P, N>,
    pins: [PIN; N],
    /// Steps left in the current block
    remaining: u32,
    /// Pulses sent to each motor since the last reset
    counts: [u32; N],
}

impl<P: Precision, PIN: OutputPin, const N: usize> MixingExtruder<P, PIN, N> {
    /// Create a new mixing extruder
    ///
    /// All step pins are driven low.
    pub fn new(mut pins: [PIN; N]) -> Result<Self, ExtruderError<PIN::Error>> {
        for pin in pins.iter_mut() {
            pin.set_low().map_err(ExtruderError::Pin)?;
        }
        Ok(Self {
            router: PulseRouter::new(),
            pins,
            remaining: 0,
            counts: [0; N],
        })
    }

    /// Start a block: load its color into the router
    pub fn begin_block(&mut self, block: &PlannerBlock<P, N>) {
        self.router.stepper_setup(block.color());
        self.remaining = block.steps();
    }

    /// Steps left in the current block
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Route one step pulse and toggle the chosen pin
    ///
    /// Returns the motor that was stepped.
    #[inline]
    pub fn step(&mut self) -> Result<usize, ExtruderError<PIN::Error>> {
        let motor = self.router.select_motor();
        let pin = &mut self.pins[motor];
        pin.set_high().map_err(ExtruderError::Pin)?;
        pin.set_low().map_err(ExtruderError::Pin)?;

        self.counts[motor] = self.counts[motor].wrapping_add(1);
        self.remaining = self.remaining.saturating_sub(1);
        Ok(motor)
    }

    /// Interrupt tick: pull a block when idle, then step once
    ///
    /// Returns `None` when no block is available.
    pub fn tick<const Q: usize>(
        &mut self,
        blocks: &mut BlockConsumer<'_, P, N, Q>,
    ) -> Result<Option<usize>, ExtruderError<PIN::Error>> {
        while self.remaining == 0 {
            match blocks.next_block() {
                Some(block) => self.begin_block(&block),
                None => return Ok(None),
            }
        }
        self.step().map(Some)
    }

    /// Pulses sent to each motor since the last reset
    pub fn counts(&self) -> &[u32; N] {
        &self.counts
    }

    /// Clear the per-motor pulse counters
    pub fn reset_counters(&mut self) {
        self.counts = [0; N];
    }

    /// Drop the current block and clear the router
    ///
    /// For re-enabling the extruder after a stop.
    pub fn abort(&mut self) {
        self.remaining = 0;
        self.router.reset();
    }

    /// The pulse router
    pub fn router(&self) -> &PulseRouter<P, N> {
        &self.router
    }

    /// Release the step pins
    pub fn release(self) -> [PIN; N] {
        self.pins
    }
}
