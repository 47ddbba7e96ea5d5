//! Subscriptions: a matcher, a handler and a priority.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ArgumentError, InputResult};
use crate::matcher::Matcher;
use crate::message::Message;

use super::propagation::PropagationControl;

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives dispatched messages.
///
/// Implemented for closures taking `(&Message, &mut PropagationControl)` and
/// by [`Broker`](super::Broker), so brokers can be chained.
pub trait Handler: Send + Sync {
    /// Handles one message.
    ///
    /// # Errors
    ///
    /// Any error aborts the rest of the dispatch and is returned from
    /// [`Broker::run_once`](super::Broker::run_once).
    fn call(&self, message: &Message, control: &mut PropagationControl) -> InputResult<()>;
}

impl<F> Handler for F
where
    F: Fn(&Message, &mut PropagationControl) -> InputResult<()> + Send + Sync,
{
    fn call(&self, message: &Message, control: &mut PropagationControl) -> InputResult<()> {
        self(message, control)
    }
}

/// What the broker needs from an entry in its dispatch list.
pub trait Subscriber {
    /// Dispatch order key; higher runs first.
    fn priority(&self) -> i64;

    /// Returns true if the message should be handled.
    fn matches(&self, message: &Message) -> bool;

    /// Handles a message that matched.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error.
    fn handle(&self, message: &Message, control: &mut PropagationControl) -> InputResult<()>;
}

/// A registered (matcher, handler, priority) triple.
///
/// Cloning is cheap; clones share the handler and compare equal by id.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    matcher: Matcher,
    handler: Arc<dyn Handler>,
    priority: i64,
}

impl Subscription {
    /// Creates a subscription with a fresh id.
    #[must_use]
    pub fn new(matcher: Matcher, handler: Arc<dyn Handler>, priority: i64) -> Self {
        Self {
            id: SubscriptionId::new(),
            matcher,
            handler,
            priority,
        }
    }

    /// Starts a builder for a subscription on `matcher`.
    #[must_use]
    pub fn builder(matcher: Matcher) -> SubscriptionBuilder {
        SubscriptionBuilder::new(matcher)
    }

    /// Handle used to unsubscribe.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Matcher deciding which messages reach the handler.
    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

impl Subscriber for Subscription {
    fn priority(&self) -> i64 {
        self.priority
    }

    fn matches(&self, message: &Message) -> bool {
        self.matcher.matches(message)
    }

    fn handle(&self, message: &Message, control: &mut PropagationControl) -> InputResult<()> {
        self.handler.call(message, control)
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscription {}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("matcher", &self.matcher)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Builder for subscriptions.
///
/// Exactly one handler must be supplied, either as a [`Handler`] value or as
/// an inline closure.
///
/// # Example
/// ```
/// use midibus::broker::Subscription;
/// use midibus::message::{MessageType, Note};
///
/// let subscription = Subscription::builder(Note::matcher())
///     .priority(1)
///     .handler_fn(|_message, control| {
///         control.stop();
///         Ok(())
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(midibus::broker::Subscriber::priority(&subscription), 1);
/// ```
pub struct SubscriptionBuilder {
    matcher: Matcher,
    priority: i64,
    handlers: Vec<Arc<dyn Handler>>,
}

impl SubscriptionBuilder {
    /// Creates a builder with priority 0 and no handler.
    #[must_use]
    pub fn new(matcher: Matcher) -> Self {
        Self {
            matcher,
            priority: 0,
            handlers: Vec::new(),
        }
    }

    /// Set the dispatch priority (default: 0).
    #[must_use]
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the handler.
    #[must_use]
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Set an already shared handler.
    #[must_use]
    pub fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Set an inline handler.
    #[must_use]
    pub fn handler_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Message, &mut PropagationControl) -> InputResult<()> + Send + Sync + 'static,
    {
        self.handler(f)
    }

    /// Build the subscription.
    ///
    /// # Errors
    ///
    /// Returns `ArgumentError::MissingHandler` if no handler was set and
    /// `ArgumentError::ConflictingHandlers` if more than one was.
    pub fn build(mut self) -> InputResult<Subscription> {
        let handler = match self.handlers.len() {
            0 => return Err(ArgumentError::MissingHandler.into()),
            1 => self.handlers.remove(0),
            _ => return Err(ArgumentError::ConflictingHandlers.into()),
        };
        Ok(Subscription::new(self.matcher, handler, self.priority))
    }
}

impl fmt::Debug for SubscriptionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionBuilder")
            .field("matcher", &self.matcher)
            .field("priority", &self.priority)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::message::{MessageType, Note, ProgramChange};

    fn noop(_: &Message, _: &mut PropagationControl) -> InputResult<()> {
        Ok(())
    }

    #[test]
    fn test_builder_defaults_to_priority_zero() {
        let sub = Subscription::builder(Note::matcher()).handler(noop).build().unwrap();
        assert_eq!(sub.priority(), 0);
    }

    #[test]
    fn test_builder_requires_exactly_one_handler() {
        let err = Subscription::builder(Note::matcher()).build().unwrap_err();
        assert!(matches!(
            err,
            crate::error::InputError::Argument(ArgumentError::MissingHandler)
        ));

        let err = Subscription::builder(Note::matcher())
            .handler(noop)
            .handler_fn(|_, _| Ok(()))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::InputError::Argument(ArgumentError::ConflictingHandlers)
        ));
    }

    #[test]
    fn test_subscription_forwards_to_matcher_and_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = Subscription::builder(Note::matcher())
            .priority(3)
            .handler_fn(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap();

        let note = Note::on(60, 1, 0, 0.0).unwrap().into_message();
        let program = ProgramChange::create(&[1], 0, 0.0).unwrap().into_message();
        assert!(sub.matches(&note));
        assert!(!sub.matches(&program));

        let mut control = PropagationControl::new();
        sub.handle(&note, &mut control).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sub.priority(), 3);
    }

    #[test]
    fn test_clones_are_equal() {
        let a = Subscription::builder(Note::matcher()).handler(noop).build().unwrap();
        let b = Subscription::builder(Note::matcher()).handler(noop).build().unwrap();
        assert_eq!(a.clone(), a);
        assert_ne!(a, b);
    }
}
