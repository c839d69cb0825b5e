//! Board-agnostic core logic for the mixing extruder firmware
//!
//! This crate contains the color mixing subsystem, independent of any
//! specific board or driver:
//!
//! - Fixed-point blend vectors and the virtual tool table
//! - Percentage mix editing and conversion
//! - Gradient and random remix controllers driven by nozzle height
//! - Interrupt-time pulse routing across the mixing steppers
//! - Planner block handoff and persisted mixer settings

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod mixer;
pub mod motion;
