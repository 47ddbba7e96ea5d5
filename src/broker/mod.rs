//! Priority dispatch.
//!
//! A [`Broker`] owns an ordered subscription list and a FIFO queue of pending
//! inputs. [`Broker::publish`] only enqueues; [`Broker::run_once`] dequeues a
//! single input, classifies it when needed and dispatches it to every
//! matching subscription, highest priority first.
//!
//! The queue is the only structure shared across threads. Producers on other
//! threads (and handlers publishing derived messages) go through a
//! [`Publisher`]. Subscribing, unsubscribing and running belong to the
//! consumer thread.

mod propagation;
mod publisher;
mod subscription;

use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::classifier::Classifier;
use crate::error::InputResult;
use crate::matcher::Matcher;
use crate::message::{Message, Unknown};

pub use propagation::PropagationControl;
pub use publisher::{Input, Publisher};
pub use subscription::{Handler, Subscriber, Subscription, SubscriptionBuilder, SubscriptionId};

use publisher::Counters;

/// Broker queue configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Max queued inputs; `None` for an unbounded queue.
    ///
    /// Publishing into a full queue drops the input instead of blocking.
    pub queue_capacity: Option<usize>,
}

impl BrokerConfig {
    /// Unbounded queue.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            queue_capacity: None,
        }
    }

    /// Queue holding at most `capacity` inputs (at least one).
    #[must_use]
    pub const fn bounded(capacity: usize) -> Self {
        Self {
            queue_capacity: Some(capacity),
        }
    }
}

/// Snapshot of the broker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerStats {
    /// Inputs dequeued and dispatched, including those a handler failed on.
    pub processed: u64,
    /// Inputs refused by a full queue.
    pub dropped: u64,
    /// Processed inputs that classified as Unknown.
    pub unknown: u64,
}

/// Queue plus priority ordered subscriptions.
///
/// # Example
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use midibus::broker::Broker;
/// use midibus::message::{MessageType, Note};
/// use midibus::record::Record;
///
/// let mut broker = Broker::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// broker.subscribe_fn(Note::matcher_on(15).unwrap(), 0, move |message, _| {
///     sink.lock().unwrap().push(message.get::<Note>().unwrap().note());
///     Ok(())
/// });
///
/// broker.publish(Record::new(&[0x9F, 64, 100], 0.0).unwrap());
/// assert!(broker.run_once().unwrap());
/// assert!(!broker.run_once().unwrap());
/// assert_eq!(*seen.lock().unwrap(), vec![64]);
/// ```
#[derive(Debug)]
pub struct Broker {
    classifier: Classifier,
    subscriptions: Vec<Subscription>,
    tx: Sender<Input>,
    rx: Receiver<Input>,
    counters: Arc<Counters>,
}

impl Broker {
    /// Broker over the standard catalog with an unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Classifier::standard(), BrokerConfig::default())
    }

    /// Broker using `classifier` for raw inputs.
    #[must_use]
    pub fn with_classifier(classifier: Classifier) -> Self {
        Self::with_config(classifier, BrokerConfig::default())
    }

    /// Broker with an explicit classifier and queue configuration.
    #[must_use]
    pub fn with_config(classifier: Classifier, config: BrokerConfig) -> Self {
        let (tx, rx) = match config.queue_capacity {
            Some(capacity) => bounded(capacity.max(1)),
            None => unbounded(),
        };
        Self {
            classifier,
            subscriptions: Vec::new(),
            tx,
            rx,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Registers `handler` for messages accepted by `matcher`.
    ///
    /// Subscriptions are kept sorted by descending priority; among equal
    /// priorities the earlier subscription runs first.
    pub fn subscribe(
        &mut self,
        matcher: Matcher,
        handler: impl Handler + 'static,
        priority: i64,
    ) -> Subscription {
        self.insert(Subscription::new(matcher, Arc::new(handler), priority))
    }

    /// [`Broker::subscribe`] with an inline closure.
    pub fn subscribe_fn<F>(&mut self, matcher: Matcher, priority: i64, handler: F) -> Subscription
    where
        F: Fn(&Message, &mut PropagationControl) -> InputResult<()> + Send + Sync + 'static,
    {
        self.subscribe(matcher, handler, priority)
    }

    /// Registers a subscription described by a builder.
    ///
    /// # Errors
    ///
    /// Returns an argument error unless exactly one handler was supplied.
    pub fn subscribe_with(&mut self, builder: SubscriptionBuilder) -> InputResult<Subscription> {
        let subscription = builder.build()?;
        Ok(self.insert(subscription))
    }

    /// Removes a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, subscription: &Subscription) -> bool {
        let Some(index) = self
            .subscriptions
            .iter()
            .position(|s| s.id() == subscription.id())
        else {
            debug!(id = %subscription.id(), "unsubscribe: not registered");
            return false;
        };
        self.subscriptions.remove(index);
        debug!(id = %subscription.id(), "unsubscribed");
        true
    }

    /// Enqueues one input without dispatching it.
    ///
    /// Returns false if a bounded queue was full and the input was dropped.
    pub fn publish(&self, input: impl Into<Input>) -> bool {
        self.publisher().publish(input)
    }

    /// Enqueues inputs in order. Returns how many were accepted.
    pub fn publish_all<I>(&self, inputs: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<Input>,
    {
        self.publisher().publish_all(inputs)
    }

    /// Handle for publishing from other threads or from handlers.
    #[must_use]
    pub fn publisher(&self) -> Publisher {
        Publisher::new(self.tx.clone(), Arc::clone(&self.counters))
    }

    /// Processes at most one queued input.
    ///
    /// Returns `Ok(false)` when the queue was empty.
    ///
    /// # Errors
    ///
    /// Returns the first handler error. The input is consumed either way and
    /// the remaining subscriptions do not see it.
    pub fn run_once(&mut self) -> InputResult<bool> {
        let Ok(input) = self.rx.try_recv() else {
            return Ok(false);
        };

        let message = match input {
            Input::Record(record) => self.classifier.build(record),
            Input::Message(message) => message,
        };
        Counters::bump(&self.counters.processed);
        if message.is::<Unknown>() {
            Counters::bump(&self.counters.unknown);
        }

        let mut control = PropagationControl::new();
        self.dispatch(&message, &mut control)?;
        Ok(true)
    }

    /// Calls [`Broker::run_once`] until the queue is empty.
    ///
    /// Inputs published by handlers during the drain are processed too.
    ///
    /// # Errors
    ///
    /// Stops at the first handler error.
    pub fn run_until_empty(&mut self) -> InputResult<usize> {
        let mut processed = 0;
        while self.run_once()? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Delivers `message` to matching subscriptions in priority order.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; later subscriptions are skipped.
    pub fn dispatch(&self, message: &Message, control: &mut PropagationControl) -> InputResult<()> {
        trace!(kind = message.kind(), "dispatching");
        for subscription in &self.subscriptions {
            let priority = subscription.priority();
            if control.should_stop_before(priority) {
                trace!(kind = message.kind(), priority, "skipping lower tiers");
                break;
            }
            if subscription.matches(message) {
                let was_stopped = control.is_stopped();
                control.enter(priority);
                subscription.handle(message, control)?;
                if !was_stopped && control.is_stopped() {
                    debug!(id = %subscription.id(), priority, "propagation stopped");
                }
            }
        }
        Ok(())
    }

    /// Inputs waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            processed: Counters::read(&self.counters.processed),
            dropped: Counters::read(&self.counters.dropped),
            unknown: Counters::read(&self.counters.unknown),
        }
    }

    /// Subscriptions in dispatch order.
    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> + '_ {
        self.subscriptions.iter()
    }

    /// Classifier applied to published records.
    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn insert(&mut self, subscription: Subscription) -> Subscription {
        let priority = subscription.priority();
        let index = self
            .subscriptions
            .iter()
            .position(|s| s.priority() < priority)
            .unwrap_or(self.subscriptions.len());
        debug!(
            id = %subscription.id(),
            priority,
            kind = subscription.matcher().descriptor().name,
            "subscribed"
        );
        self.subscriptions.insert(index, subscription.clone());
        subscription
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

/// A broker can be subscribed to another broker.
///
/// The caller's control is not passed down. The inner broker dispatches with
/// a fresh [`PropagationControl`], since its priorities are unrelated to the
/// outer ones. A stop inside it ends only the inner dispatch and leaves the
/// caller's control untouched. A stop in a higher outer tier still keeps the
/// inner broker from being called at all.
impl Handler for Broker {
    fn call(&self, message: &Message, _control: &mut PropagationControl) -> InputResult<()> {
        let mut control = PropagationControl::new();
        self.dispatch(message, &mut control)
    }
}
