//! Virtual tool table
//!
//! A fixed-size table of blend presets. The last two slots are reserved for
//! the firmware: the direct-set tool (written by direct mixing commands) and
//! the autoretract tool (all motors together, for synchronized retracts).

use super::color::ColorVector;
use super::precision::Precision;

/// Number of reserved system tools at the end of the table
pub const SYSTEM_TOOLS: usize = 2;

/// Table of virtual tools
#[derive(Debug, Clone)]
pub struct BlendTable<P: Precision, const N: usize, const TOOLS: usize> {
    colors: [ColorVector<P, N>; TOOLS],
}

impl<P: Precision, const N: usize, const TOOLS: usize> Default for BlendTable<P, N, TOOLS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Precision, const N: usize, const TOOLS: usize> BlendTable<P, N, TOOLS> {
    const SHAPE_OK: () = assert!(
        N > 0 && TOOLS > SYSTEM_TOOLS,
        "mixer needs at least one motor and one user tool"
    );

    /// Create a table with the boot-time tool colors
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::SHAPE_OK;
        let mut table = Self {
            colors: [ColorVector::one_hot(0); TOOLS],
        };
        table.reset();
        table
    }

    /// Number of user-editable tools
    pub const fn user_tools() -> usize {
        TOOLS - SYSTEM_TOOLS
    }

    /// Index of the direct-set tool
    pub const fn direct_set_tool() -> usize {
        TOOLS - SYSTEM_TOOLS
    }

    /// Index of the autoretract tool
    pub const fn autoretract_tool() -> usize {
        TOOLS - 1
    }

    /// Clamp a tool index into the table
    pub fn clamp_index(index: usize) -> usize {
        index.min(TOOLS - 1)
    }

    /// Restore boot-time colors
    ///
    /// User tool `t` gets pure filament `t`; user tools beyond the motor
    /// count get pure filament 0. The direct-set tool starts as filament 0
    /// and the autoretract tool drives all motors equally.
    pub fn reset(&mut self) {
        for (t, color) in self.colors.iter_mut().take(Self::user_tools()).enumerate() {
            *color = if t < N {
                ColorVector::one_hot(t)
            } else {
                ColorVector::one_hot(0)
            };
        }
        self.colors[Self::direct_set_tool()] = ColorVector::one_hot(0);
        self.colors[Self::autoretract_tool()] = ColorVector::uniform();
    }

    /// Color of a tool (index clamped)
    pub fn get(&self, index: usize) -> &ColorVector<P, N> {
        &self.colors[Self::clamp_index(index)]
    }

    /// Replace a tool's color (index clamped)
    pub fn set(&mut self, index: usize, color: ColorVector<P, N>) {
        self.colors[Self::clamp_index(index)] = color;
    }

    /// All tool colors in index order
    pub fn iter(&self) -> impl Iterator<Item = &ColorVector<P, N>> {
        self.colors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::precision::Wide;

    type Table = BlendTable<Wide, 3, 7>;

    #[test]
    fn test_reserved_indices() {
        assert_eq!(Table::user_tools(), 5);
        assert_eq!(Table::direct_set_tool(), 5);
        assert_eq!(Table::autoretract_tool(), 6);
    }

    #[test]
    fn test_boot_colors() {
        let table = Table::new();
        assert_eq!(table.get(0), &ColorVector::one_hot(0));
        assert_eq!(table.get(1), &ColorVector::one_hot(1));
        assert_eq!(table.get(2), &ColorVector::one_hot(2));
        // Beyond the motor count: filament 0
        assert_eq!(table.get(3), &ColorVector::one_hot(0));
        assert_eq!(table.get(4), &ColorVector::one_hot(0));
        assert_eq!(table.get(5), &ColorVector::one_hot(0));
        assert_eq!(table.get(6), &ColorVector::uniform());
    }

    #[test]
    fn test_index_clamps() {
        let mut table = Table::new();
        table.set(200, ColorVector::one_hot(1));
        assert_eq!(table.get(6), &ColorVector::one_hot(1));
        assert_eq!(table.get(255), &ColorVector::one_hot(1));
    }

    #[test]
    fn test_reset_restores() {
        let mut table = Table::new();
        table.set(0, ColorVector::uniform());
        table.reset();
        assert_eq!(table.get(0), &ColorVector::one_hot(0));
        assert_eq!(table.iter().count(), 7);
    }
}
