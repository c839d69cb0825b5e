//! Motion handoff
//!
//! The control context captures a color into every planner block; the
//! stepper interrupt consumes blocks and routes their pulses.

pub mod block;
pub mod router;

pub use block::{BlockConsumer, BlockProducer, BlockQueue, PlannerBlock, QueueError};
pub use router::PulseRouter;
