//! Fixed-point widths for blend vectors and step accumulators
//!
//! The width is a trade-off between routing precision and interrupt cost.
//! Wider processors use a 15-bit unsigned accumulator; 8-bit parts use a
//! signed byte and test the sign bit for overflow. The routing algorithm is
//! identical for every width.

use core::fmt::Debug;

/// Fixed-point width of a blend vector component and its accumulator
pub trait Precision: Copy + Debug + PartialEq + Eq + 'static {
    /// Storage type of one color component
    type Component: Copy + Default + Debug + PartialEq + Eq + Into<u32>;
    /// Per-motor accumulator used by the pulse router
    type Accumulator: Copy + Default + Debug;

    /// Value of the largest component after scaling (the overflow threshold)
    const COMPONENT_MAX: u32;

    /// Convert a scaled value into a component, saturating at `COMPONENT_MAX`
    fn component(value: u32) -> Self::Component;

    /// Add `weight` into `acc`
    ///
    /// Returns true if the accumulator overflowed; the overflow bit has then
    /// already been masked off.
    fn accumulate(acc: &mut Self::Accumulator, weight: Self::Component) -> bool;
}

/// Unsigned accumulator with `BITS` fractional bits (1..=15)
///
/// Overflow is detected by testing bit `BITS` of the sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Unsigned<const BITS: u32>;

impl<const BITS: u32> Unsigned<BITS> {
    const TOP: u16 = 1 << BITS;
    const MASK: u16 = Self::TOP - 1;
}

impl<const BITS: u32> Precision for Unsigned<BITS> {
    type Component = u16;
    type Accumulator = u16;

    const COMPONENT_MAX: u32 = 1 << BITS;

    #[inline]
    fn component(value: u32) -> u16 {
        value.min(Self::COMPONENT_MAX) as u16
    }

    #[inline(always)]
    fn accumulate(acc: &mut u16, weight: u16) -> bool {
        *acc = acc.wrapping_add(weight);
        if *acc & Self::TOP != 0 {
            *acc &= Self::MASK;
            true
        } else {
            false
        }
    }
}

/// Signed 8-bit accumulator for 8-bit processors
///
/// Components are `u8` in 0..=128 and overflow shows up as a negative
/// accumulator. Exactness is traded for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Signed8;

impl Precision for Signed8 {
    type Component = u8;
    type Accumulator = i8;

    const COMPONENT_MAX: u32 = 0x80;

    #[inline]
    fn component(value: u32) -> u8 {
        value.min(Self::COMPONENT_MAX) as u8
    }

    #[inline(always)]
    fn accumulate(acc: &mut i8, weight: u8) -> bool {
        *acc = (*acc as u8).wrapping_add(weight) as i8;
        if *acc < 0 {
            *acc &= 0x7F;
            true
        } else {
            false
        }
    }
}

/// Default width for 32-bit targets
pub type Wide = Unsigned<15>;

/// Default width for 8-bit targets
pub type Narrow = Signed8;
