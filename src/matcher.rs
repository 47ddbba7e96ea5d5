//! Message matching.
//!
//! A matcher binds a predicate over raw bytes to one message type. It is
//! used both to classify raw records and to filter messages for
//! subscribers. Matchers are immutable and cheap to clone.

use std::fmt;
use std::sync::Arc;

use crate::error::{InputResult, RangeError};
use crate::message::{Descriptor, Message};
use crate::record::{Data, CHANNEL_MASK};

/// Arbitrary predicate over raw bytes.
pub type CustomRule = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

#[derive(Clone)]
enum Predicate {
    /// The descriptor's own status test and rule.
    Descriptor,
    /// Replaces the descriptor test entirely.
    Custom(CustomRule),
}

/// Predicate bound to a message type.
///
/// # Example
/// ```
/// use midibus::message::{ControlChange, MessageType};
///
/// let matcher = ControlChange::matcher_for(3, 5).unwrap();
///
/// assert!(matcher.matches(&[0xB3, 5, 1]));
/// assert!(!matcher.matches(&[0xB3, 4, 0]));
/// assert!(!matcher.matches(&[0xB4, 5, 1]));
/// ```
#[derive(Clone)]
pub struct Matcher {
    descriptor: &'static Descriptor,
    predicate: Predicate,
    channel: Option<u8>,
    number: Option<u8>,
}

impl Matcher {
    /// Matches every message the descriptor accepts.
    #[must_use]
    pub fn new(descriptor: &'static Descriptor) -> Self {
        Self {
            descriptor,
            predicate: Predicate::Descriptor,
            channel: None,
            number: None,
        }
    }

    /// Matches with a caller supplied rule instead of the descriptor test.
    ///
    /// The length check against the descriptor's data length still runs
    /// before `rule`, so the rule may index up to `data_length - 1`.
    #[must_use]
    pub fn custom(
        descriptor: &'static Descriptor,
        rule: impl Fn(&[u8]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            descriptor,
            predicate: Predicate::Custom(Arc::new(rule)),
            channel: None,
            number: None,
        }
    }

    /// Narrows the matcher to one channel.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::Channel` unless `channel < 16`.
    pub fn with_channel(mut self, channel: u8) -> InputResult<Self> {
        if channel & !CHANNEL_MASK != 0 {
            return Err(RangeError::Channel { value: channel }.into());
        }
        self.channel = Some(channel);
        Ok(self)
    }

    /// Narrows the matcher to messages whose second byte equals `number`.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::Number` unless `number < 128`.
    pub fn with_number(mut self, number: u8) -> InputResult<Self> {
        if number >= 0x80 {
            return Err(RangeError::Number { value: number }.into());
        }
        self.number = Some(number);
        Ok(self)
    }

    /// The message type this matcher is bound to.
    #[must_use]
    pub const fn descriptor(&self) -> &'static Descriptor {
        self.descriptor
    }

    /// Channel filter, if any.
    #[must_use]
    pub const fn channel(&self) -> Option<u8> {
        self.channel
    }

    /// Second-byte filter, if any.
    #[must_use]
    pub const fn number(&self) -> Option<u8> {
        self.number
    }

    /// Tests raw bytes, a record's data or a message.
    ///
    /// Input shorter than the type's data length never matches.
    pub fn matches<B: AsRef<[u8]> + ?Sized>(&self, input: &B) -> bool {
        let bytes = input.as_ref();
        if bytes.is_empty() || bytes.len() < self.descriptor.data_length {
            return false;
        }

        let accepted = match &self.predicate {
            Predicate::Descriptor => self.descriptor.accepts(bytes),
            Predicate::Custom(rule) => rule(bytes),
        };
        if !accepted {
            return false;
        }

        if let Some(channel) = self.channel {
            if bytes[0] & CHANNEL_MASK != channel {
                return false;
            }
        }
        if let Some(number) = self.number {
            if bytes.get(1) != Some(&number) {
                return false;
            }
        }
        true
    }

    /// Builds a message of this matcher's type if `data` matches.
    #[must_use]
    pub fn build(&self, data: Data, timestamp: f64) -> Option<Message> {
        if !self.matches(&data) {
            return None;
        }
        Message::from_data(self.descriptor, data, timestamp).ok()
    }

    /// Returns true if bytes whose status byte has upper nibble `nibble` can
    /// possibly match. Custom rules are opaque and always may.
    pub(crate) fn may_match_nibble(&self, nibble: u8) -> bool {
        match self.predicate {
            Predicate::Descriptor => self.descriptor.accepts_nibble(nibble),
            Predicate::Custom(_) => true,
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let predicate = match self.predicate {
            Predicate::Descriptor => "descriptor",
            Predicate::Custom(_) => "custom",
        };
        f.debug_struct("Matcher")
            .field("kind", &self.descriptor.name)
            .field("predicate", &predicate)
            .field("channel", &self.channel)
            .field("number", &self.number)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::kinds::{AFTERTOUCH, CHANNEL_MODE, GENERIC, NOTE, PROGRAM_CHANGE};
    use crate::message::{MessageType, Note, ProgramChange};
    use crate::record::Record;

    #[test]
    fn test_matches_raw_bytes() {
        let matcher = Matcher::new(&NOTE);
        assert!(matcher.matches(&[0x90, 0, 0]));
        assert!(matcher.matches(&[0x8F, 0, 0]));
        assert!(!matcher.matches(&[0xE0, 0, 0]));
    }

    #[test]
    fn test_matches_records() {
        let matcher = Matcher::new(&PROGRAM_CHANGE).with_channel(2).unwrap();
        assert!(matcher.matches(&Record::new(&[0xC2, 1], 0.0).unwrap()));
        assert!(!matcher.matches(&Record::new(&[0xC3, 1], 0.0).unwrap()));
        assert!(matcher.matches(&Data::new(&[0xC2, 1]).unwrap()));
    }

    #[test]
    fn test_short_input_never_matches() {
        let matcher = Matcher::new(&NOTE);
        assert!(!matcher.matches(&[0x90, 0]));
        assert!(!matcher.matches(&[0x90]));
        assert!(!matcher.matches(&[] as &[u8]));
    }

    #[test]
    fn test_matches_messages() {
        let matcher = Note::matcher();
        let note = Note::on(60, 1, 0, 0.0).unwrap();
        assert!(matcher.matches(note.message()));

        let program = ProgramChange::create(&[], 0, 0.0).unwrap();
        assert!(!matcher.matches(program.message()));
    }

    #[test]
    fn test_channel_narrowing() {
        let matcher = Matcher::new(&GENERIC).with_channel(7).unwrap();
        assert!(matcher.matches(&[0x07, 10, 0]));
        assert!(!matcher.matches(&[0x08, 10, 0]));
    }

    #[test]
    fn test_number_narrowing_without_channel() {
        let matcher = Matcher::new(&GENERIC).with_number(10).unwrap();
        assert!(matcher.matches(&[0x07, 10, 0]));
        assert!(matcher.matches(&[0x03, 10, 0]));
        assert!(!matcher.matches(&[0x07, 11, 0]));
    }

    #[test]
    fn test_narrowing_keeps_type_rule() {
        let matcher = Matcher::new(&CHANNEL_MODE).with_channel(0).unwrap();
        assert!(matcher.matches(&[0xB0, 121]));
        assert!(!matcher.matches(&[0xB0, 7, 0]));
    }

    #[test]
    fn test_narrowing_range_errors() {
        assert!(Matcher::new(&NOTE).with_channel(16).unwrap_err().is_range());
        assert!(Matcher::new(&NOTE).with_number(128).unwrap_err().is_range());
        assert!(Note::matcher_for(15, 127).is_ok());
    }

    #[test]
    fn test_custom_rule() {
        let matcher = Matcher::custom(&AFTERTOUCH, |d| d[0] == 0xA0);
        assert!(!matcher.matches(&[0xB0, 0, 0]));
        assert!(!matcher.matches(&[0xA0, 0]));
        assert!(matcher.matches(&[0xA0, 0, 0]));
        assert!(!matcher.matches(&[0xA1, 0, 0]));
    }

    #[test]
    fn test_build() {
        let matcher = Matcher::new(&PROGRAM_CHANGE);
        let data = Data::new(&[0xC4, 12]).unwrap();
        let msg = matcher.build(data, 1.0).unwrap();
        assert!(msg.is::<ProgramChange>());
        assert_eq!(msg.timestamp(), 1.0);

        let data = Data::new(&[0x94, 12]).unwrap();
        assert!(matcher.build(data, 1.0).is_none());
    }

    #[test]
    fn test_may_match_nibble() {
        let matcher = Matcher::new(&NOTE);
        assert!(matcher.may_match_nibble(0x9));
        assert!(!matcher.may_match_nibble(0xB));

        let custom = Matcher::custom(&NOTE, |_| true);
        assert!(custom.may_match_nibble(0xB));
    }
}
