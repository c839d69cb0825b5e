//! Extruder driver implementations

pub mod mixing;

pub use mixing::{ExtruderError, MixingExtruder};
