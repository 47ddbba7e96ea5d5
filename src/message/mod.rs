//! Typed input messages.
//!
//! Every message is one to three bytes in the MIDI wire encoding, plus the
//! time the bytes arrived. The first byte carries the status in its upper
//! nibble and the channel in its lower nibble.
//!
//! A [`Message`] pairs the bytes with the [`Descriptor`] of the type it was
//! classified as. Typed views such as [`Note`] or [`PitchBendChange`] expose
//! the decoded fields and are obtained with [`Message::get`].

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::{InputResult, StructuralError};
use crate::matcher::Matcher;
use crate::record::{Data, Record, CHANNEL_MASK, STATUS_MASK};

/// Message construction.
pub mod builder;
/// Type descriptors.
pub mod descriptor;
/// The standard message types.
pub mod kinds;

pub use builder::MessageBuilder;
pub use descriptor::{Descriptor, Rule};
pub use kinds::{
    Aftertouch, ChannelMode, ChannelPressure, ControlChange, Generic, Note, PitchBendChange,
    ProgramChange, Unknown,
};

/// A classified, immutable input message.
#[derive(Clone, Copy, PartialEq)]
pub struct Message {
    descriptor: &'static Descriptor,
    data: Data,
    timestamp: f64,
}

impl Message {
    /// Creates a message of the given type.
    ///
    /// The bytes are not checked against the type's status; see
    /// [`Message::is_valid`].
    ///
    /// # Errors
    ///
    /// Returns a structural error if `bytes` is empty, longer than three
    /// bytes, or shorter than the type's data length.
    pub fn new(descriptor: &'static Descriptor, bytes: &[u8], timestamp: f64) -> InputResult<Self> {
        let data = Data::new(bytes)?;
        Ok(Self::from_data(descriptor, data, timestamp)?)
    }

    /// Creates a message from an already validated byte window.
    ///
    /// # Errors
    ///
    /// Returns `StructuralError::TooShort` if the window is shorter than the
    /// type's data length. Messages are never zero padded.
    pub fn from_data(
        descriptor: &'static Descriptor,
        data: Data,
        timestamp: f64,
    ) -> Result<Self, StructuralError> {
        if data.len() < descriptor.data_length {
            return Err(StructuralError::TooShort {
                kind: descriptor.name,
                expected: descriptor.data_length,
                actual: data.len(),
            });
        }
        Ok(Self {
            descriptor,
            data,
            timestamp,
        })
    }

    /// Wraps a record that no known type accepts.
    #[must_use]
    pub fn unknown(record: Record) -> Self {
        Self {
            descriptor: &kinds::UNKNOWN,
            data: record.data,
            timestamp: record.timestamp,
        }
    }

    /// The descriptor of this message's type.
    #[must_use]
    pub const fn descriptor(&self) -> &'static Descriptor {
        self.descriptor
    }

    /// The type name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.descriptor.name
    }

    /// The raw bytes.
    #[must_use]
    pub const fn data(&self) -> &Data {
        &self.data
    }

    /// Arrival time in seconds.
    #[must_use]
    pub const fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Status bits of the first byte.
    #[must_use]
    pub const fn status(&self) -> u8 {
        self.data.status_byte() & STATUS_MASK
    }

    /// Channel bits of the first byte.
    #[must_use]
    pub const fn channel(&self) -> u8 {
        self.data.status_byte() & CHANNEL_MASK
    }

    /// Returns true if the bytes still satisfy the type's default matcher.
    ///
    /// Unknown messages are always valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.descriptor.accepts(&self.data)
    }

    /// Returns true if this message was classified as `T`.
    ///
    /// Compares descriptor identity, so a foreign descriptor that happens to
    /// share a type name is never mistaken for `T`.
    #[must_use]
    pub fn is<T: MessageType>(&self) -> bool {
        std::ptr::eq(self.descriptor, T::descriptor())
    }

    /// Returns the typed view if this message was classified as `T`.
    ///
    /// This is the only way to obtain a view from an arbitrary message.
    #[must_use]
    pub fn get<T: MessageType>(&self) -> Option<T> {
        let fits = self.data.len() >= T::descriptor().data_length;
        (self.is::<T>() && fits).then(|| T::wrap(*self))
    }

    /// Returns a copy stamped with a different arrival time.
    #[must_use]
    pub const fn with_timestamp(self, timestamp: f64) -> Self {
        Self { timestamp, ..self }
    }

    /// The unclassified record behind this message.
    #[must_use]
    pub const fn record(&self) -> Record {
        Record {
            data: self.data,
            timestamp: self.timestamp,
        }
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.descriptor.name)
            .field("data", &self.data)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Message", 3)?;
        state.serialize_field("kind", self.descriptor.name)?;
        state.serialize_field("data", &self.data)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.end()
    }
}

mod sealed {
    use super::Message;

    /// Unchecked construction of typed views, kept out of the public API.
    pub trait Sealed {
        /// Wraps a message already known to be of this type and length.
        fn wrap(message: Message) -> Self;

        /// Status packed by `create` when it differs from the descriptor's.
        fn create_status() -> Option<u8> {
            None
        }
    }
}

/// A statically known message type with a typed view.
///
/// Implementors are thin `Copy` wrappers around [`Message`]. Views are only
/// constructed inside the crate, for messages carrying exactly this type's
/// descriptor and at least its data length; field accessors rely on that.
///
/// ```compile_fail
/// use midibus::{Message, Note, Record};
///
/// let short = Message::unknown(Record::new(&[0x90], 0.0).unwrap());
/// let _ = Note::wrap(short);
/// ```
pub trait MessageType: Copy + sealed::Sealed {
    /// The descriptor shared by all messages of this type.
    fn descriptor() -> &'static Descriptor;

    /// The underlying message.
    fn message(&self) -> &Message;

    /// Unwraps the view.
    fn into_message(self) -> Message {
        *self.message()
    }

    /// Matcher accepting every message of this type.
    fn matcher() -> Matcher {
        Matcher::new(Self::descriptor())
    }

    /// Matcher accepting messages of this type on one channel.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::Channel` unless `channel < 16`.
    fn matcher_on(channel: u8) -> InputResult<Matcher> {
        Matcher::new(Self::descriptor()).with_channel(channel)
    }

    /// Matcher accepting messages of this type on one channel whose second
    /// byte equals `number`.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::Channel` unless `channel < 16` and
    /// `RangeError::Number` unless `number < 128`.
    fn matcher_for(channel: u8, number: u8) -> InputResult<Matcher> {
        Matcher::new(Self::descriptor())
            .with_channel(channel)?
            .with_number(number)
    }

    /// Starts building a message of this type.
    ///
    /// The status defaults to the type's creation status, which for [`Note`]
    /// is note on.
    fn builder() -> MessageBuilder {
        let builder = MessageBuilder::new(Self::descriptor());
        match Self::create_status() {
            Some(status) => builder.status(status),
            None => builder,
        }
    }

    /// Creates a message from field bytes using the type's own status.
    ///
    /// # Errors
    ///
    /// See [`MessageBuilder::build`].
    fn create(fields: &[u8], channel: u8, timestamp: f64) -> InputResult<Self> {
        let message = Self::builder()
            .fields(fields)
            .channel(channel)
            .timestamp(timestamp)
            .build()?;
        Ok(Self::wrap(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_channel() {
        let msg = Message::new(&kinds::NOTE, &[0x9E, 60, 100], 0.0).unwrap();
        assert_eq!(msg.status(), 0x90);
        assert_eq!(msg.channel(), 14);
        assert_eq!(msg.kind(), "Note");
    }

    #[test]
    fn test_new_rejects_short_data() {
        let err = Message::new(&kinds::NOTE, &[0x90, 60], 0.0).unwrap_err();
        assert!(err.is_structural());
        assert!(format!("{err}").contains("Note"));
    }

    #[test]
    fn test_is_valid() {
        let note = Message::new(&kinds::NOTE, &[0x90, 0, 0], 0.0).unwrap();
        assert!(note.is_valid());

        let bogus = Message::new(&kinds::NOTE, &[0x00, 0, 0], 0.0).unwrap();
        assert!(!bogus.is_valid());

        let unknown = Message::unknown(Record::new(&[0x00], 0.0).unwrap());
        assert!(unknown.is_valid());
    }

    #[test]
    fn test_typed_view() {
        let msg = Message::new(&kinds::PROGRAM_CHANGE, &[0xC2, 17], 0.0).unwrap();
        assert!(msg.is::<ProgramChange>());
        assert!(msg.get::<Note>().is_none());
        assert_eq!(msg.get::<ProgramChange>().unwrap().number(), 17);
    }

    #[test]
    fn test_get_rejects_message_of_other_type_and_length() {
        let short = Message::unknown(Record::new(&[0x90], 0.0).unwrap());
        assert!(!short.is::<Note>());
        assert!(short.get::<Note>().is_none());
        assert!(short.get::<Unknown>().is_some());
    }

    #[test]
    fn test_same_named_descriptor_is_a_different_type() {
        static LOOKALIKE: Descriptor = Descriptor::new("Note", 0x90, 1);

        let msg = Message::new(&LOOKALIKE, &[0x90], 0.0).unwrap();
        assert_eq!(msg.kind(), "Note");
        assert!(!msg.is::<Note>());
        assert!(msg.get::<Note>().is_none());
    }

    #[test]
    fn test_with_timestamp_keeps_type() {
        let msg = Message::new(&kinds::AFTERTOUCH, &[0xA0, 1, 2], 1.0).unwrap();
        let later = msg.with_timestamp(2.0);
        assert_eq!(later.timestamp(), 2.0);
        assert!(later.is::<Aftertouch>());
        assert_eq!(later.data(), msg.data());
    }

    #[test]
    fn test_serialize() {
        let msg = Message::new(&kinds::CHANNEL_PRESSURE, &[0xD1, 90], 0.5).unwrap();
        let json = serde_json::to_value(msg).unwrap();
        assert_eq!(json["kind"], "ChannelPressure");
        assert_eq!(json["data"], serde_json::json!([0xD1, 90]));
        assert_eq!(json["timestamp"], 0.5);
    }
}
