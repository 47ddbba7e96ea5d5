//! Producer side of the broker queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use tracing::warn;

use crate::message::{Message, MessageType};
use crate::record::Record;

/// One queued item: raw bytes still to classify, or an already typed message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// Classified when dequeued.
    Record(Record),
    /// Dispatched as is.
    Message(Message),
}

impl From<Record> for Input {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<Message> for Input {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl<T: MessageType> From<T> for Input {
    fn from(typed: T) -> Self {
        Self::Message(typed.into_message())
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub processed: AtomicU64,
    pub dropped: AtomicU64,
    pub unknown: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Cloneable handle that enqueues into a broker from any thread.
///
/// Publishing never blocks and never dispatches. When the broker queue is
/// bounded and full the input is dropped and counted.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: Sender<Input>,
    counters: Arc<Counters>,
}

impl Publisher {
    pub(crate) fn new(tx: Sender<Input>, counters: Arc<Counters>) -> Self {
        Self { tx, counters }
    }

    /// Enqueues one input. Returns false if it was dropped.
    pub fn publish(&self, input: impl Into<Input>) -> bool {
        match self.tx.try_send(input.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                Counters::bump(&self.counters.dropped);
                warn!("broker queue full, input dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                Counters::bump(&self.counters.dropped);
                warn!("broker gone, input dropped");
                false
            }
        }
    }

    /// Enqueues inputs in order. Returns how many were accepted.
    pub fn publish_all<I>(&self, inputs: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<Input>,
    {
        let mut accepted = 0;
        for input in inputs {
            if self.publish(input) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Number of inputs waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}
