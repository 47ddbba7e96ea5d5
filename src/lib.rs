//! # midibus - classify and dispatch short MIDI style input events
//!
//! midibus turns raw one to three byte records into typed messages and
//! delivers them to subscribers in priority order. Subscribers can stop
//! delivery to lower priority tiers for the message at hand.
//!
//! ## Core Concepts
//!
//! - **Record**: raw bytes plus the time they arrived
//! - **Descriptor**: a message type's status pattern, mask, length and rule
//! - **Catalog**: the ordered list of types considered during classification
//! - **Matcher**: predicate over bytes bound to one type, optionally narrowed
//!   to a channel and a number
//! - **Classifier**: picks the first matcher accepting a record, with a per
//!   status nibble lookup cache
//! - **Broker**: FIFO queue plus priority ordered subscriptions
//!
//! ## Usage
//!
//! ```rust
//! use midibus::{Broker, ControlChange, MessageType, Record};
//!
//! let mut broker = Broker::new();
//! broker.subscribe_fn(ControlChange::matcher_for(3, 5)?, 0, |message, control| {
//!     let cc = message.get::<ControlChange>().expect("matched a control change");
//!     assert_eq!(cc.value(), 1);
//!     control.stop();
//!     Ok(())
//! });
//!
//! broker.publish(Record::new(&[0xB3, 5, 1], 4.4)?);
//! assert!(broker.run_once()?);
//! # Ok::<(), midibus::InputError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod broker;
pub mod catalog;
pub mod classifier;
pub mod error;
pub mod matcher;
pub mod message;
pub mod record;

// Re-export primary types at crate root for convenience
pub use broker::{
    Broker, BrokerConfig, BrokerStats, Handler, Input, PropagationControl, Publisher, Subscriber,
    Subscription, SubscriptionBuilder, SubscriptionId,
};
pub use catalog::Catalog;
pub use classifier::Classifier;
pub use error::{ArgumentError, InputError, InputResult, RangeError, StructuralError};
pub use matcher::{CustomRule, Matcher};
pub use message::{
    Aftertouch, ChannelMode, ChannelPressure, ControlChange, Descriptor, Generic, Message,
    MessageBuilder, MessageType, Note, PitchBendChange, ProgramChange, Unknown,
};
pub use record::{timestamp_now, Data, Record};
