//! Configuration types
//!
//! Runtime mixer configuration and the persisted settings image. The storage
//! medium is owned by the board; settings travel as postcard binary data.

pub mod settings;
pub mod types;

pub use settings::*;
pub use types::*;
