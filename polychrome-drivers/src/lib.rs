//! Hardware driver implementations
//!
//! This crate drives the hardware behind the board-agnostic logic in
//! polychrome-core:
//!
//! - Mixing extruder step output over `embedded-hal` pins

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod extruder;
