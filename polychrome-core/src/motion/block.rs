//! Planner block handoff
//!
//! Each block carries its own copy of the mixer color, captured once when
//! the planner finalizes it. The queue is single-producer/single-consumer:
//! the control context owns the [`BlockProducer`], the stepper interrupt
//! owns the [`BlockConsumer`], and no lock is needed between them.

use heapless::spsc::{Consumer, Producer, Queue};

use crate::mixer::{ColorSnapshot, Mixer, Precision};

/// Extruder portion of one planner block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerBlock<P: Precision, const N: usize> {
    /// Extruder steps in this block
    steps: u32,
    /// Color frozen at block creation
    color: ColorSnapshot<P, N>,
}

impl<P: Precision, const N: usize> PlannerBlock<P, N> {
    /// Create a block with a captured color
    pub fn new(steps: u32, color: ColorSnapshot<P, N>) -> Self {
        Self { steps, color }
    }

    /// Extruder steps in this block
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Color captured at block creation
    pub fn color(&self) -> &ColorSnapshot<P, N> {
        &self.color
    }
}

/// Block queue errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// No free slot; retry after the stepper drains a block
    Full,
}

/// Fixed-capacity block queue (holds `Q - 1` blocks)
pub struct BlockQueue<P: Precision, const N: usize, const Q: usize> {
    queue: Queue<PlannerBlock<P, N>, Q>,
}

impl<P: Precision, const N: usize, const Q: usize> Default for BlockQueue<P, N, Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Precision, const N: usize, const Q: usize> BlockQueue<P, N, Q> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
        }
    }

    /// Split into the control-side producer and interrupt-side consumer
    pub fn split(&mut self) -> (BlockProducer<'_, P, N, Q>, BlockConsumer<'_, P, N, Q>) {
        let (producer, consumer) = self.queue.split();
        (
            BlockProducer { inner: producer },
            BlockConsumer { inner: consumer },
        )
    }
}

/// Control-context end of the block queue
pub struct BlockProducer<'a, P: Precision, const N: usize, const Q: usize> {
    inner: Producer<'a, PlannerBlock<P, N>, Q>,
}

impl<P: Precision, const N: usize, const Q: usize> BlockProducer<'_, P, N, Q> {
    /// Finalize a block: capture the mixer color and queue it
    ///
    /// The color is only captured once a slot is known to be free, so a
    /// rejected block never consumes a snapshot.
    pub fn plan<const TOOLS: usize>(
        &mut self,
        mixer: &Mixer<P, N, TOOLS>,
        steps: u32,
    ) -> Result<(), QueueError> {
        if !self.inner.ready() {
            return Err(QueueError::Full);
        }
        self.push(PlannerBlock::new(steps, mixer.populate_block()))
    }

    /// Queue an already built block
    pub fn push(&mut self, block: PlannerBlock<P, N>) -> Result<(), QueueError> {
        self.inner.enqueue(block).map_err(|_| QueueError::Full)
    }

    /// Check if a block can be queued
    pub fn ready(&self) -> bool {
        self.inner.ready()
    }
}

/// Interrupt-context end of the block queue
pub struct BlockConsumer<'a, P: Precision, const N: usize, const Q: usize> {
    inner: Consumer<'a, PlannerBlock<P, N>, Q>,
}

impl<P: Precision, const N: usize, const Q: usize> BlockConsumer<'_, P, N, Q> {
    /// Take the next block, if any
    pub fn next_block(&mut self) -> Option<PlannerBlock<P, N>> {
        self.inner.dequeue()
    }

    /// Number of queued blocks
    pub fn pending(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::{ColorVector, Wide};
    use crate::motion::PulseRouter;

    type TestMixer = Mixer<Wide, 2, 4>;

    #[test]
    fn test_capacity() {
        let mixer = TestMixer::new();
        let mut queue: BlockQueue<Wide, 2, 4> = BlockQueue::new();
        let (mut producer, consumer) = queue.split();

        for _ in 0..3 {
            assert_eq!(producer.plan(&mixer, 10), Ok(()));
        }
        assert!(!producer.ready());
        assert_eq!(producer.plan(&mixer, 10), Err(QueueError::Full));
        assert_eq!(consumer.pending(), 3);
    }

    #[test]
    fn test_queued_color_is_frozen() {
        let mut mixer = TestMixer::new();
        let mut queue: BlockQueue<Wide, 2, 4> = BlockQueue::new();
        let (mut producer, mut consumer) = queue.split();

        producer.plan(&mixer, 4).unwrap();
        // Edited while the first block is still queued
        mixer.set_active_tool(1);
        producer.plan(&mixer, 4).unwrap();

        let first = consumer.next_block().unwrap();
        let second = consumer.next_block().unwrap();
        assert_eq!(first.color(), &ColorVector::one_hot(0));
        assert_eq!(second.color(), &ColorVector::one_hot(1));
        assert!(consumer.next_block().is_none());
    }

    #[test]
    fn test_router_follows_blocks() {
        let mut mixer = TestMixer::new();
        let mut queue: BlockQueue<Wide, 2, 4> = BlockQueue::new();
        let (mut producer, mut consumer) = queue.split();
        let mut router = PulseRouter::<Wide, 2>::new();

        producer.plan(&mixer, 5).unwrap();
        mixer.set_active_tool(1);
        producer.plan(&mixer, 5).unwrap();

        let mut motors = [0usize; 10];
        let mut i = 0;
        while let Some(block) = consumer.next_block() {
            router.stepper_setup(block.color());
            for _ in 0..block.steps() {
                motors[i] = router.select_motor();
                i += 1;
            }
        }
        assert_eq!(motors, [0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
    }
}
