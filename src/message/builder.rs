//! Message construction from field values.
//!
//! The builder packs status, channel and field bytes into a correctly sized
//! byte window. Unspecified fields are zero.

use crate::error::{ArgumentError, InputResult, RangeError};
use crate::record::{timestamp_now, CHANNEL_MASK, MAX_DATA_LENGTH, STATUS_MASK};

use super::descriptor::Descriptor;
use super::Message;

/// Builder for messages of one type.
///
/// # Example
/// ```
/// use midibus::message::{kinds::CONTROL_CHANGE, ControlChange};
///
/// let msg = CONTROL_CHANGE
///     .builder()
///     .fields(&[7, 100])
///     .channel(3)
///     .timestamp(1.5)
///     .build()
///     .unwrap();
///
/// assert_eq!(msg.data().as_slice(), &[0xB3, 7, 100]);
/// assert_eq!(msg.get::<ControlChange>().unwrap().value(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    descriptor: &'static Descriptor,
    fields: Vec<u8>,
    status: Option<u8>,
    channel: u8,
    timestamp: Option<f64>,
}

impl MessageBuilder {
    /// Creates a builder for `descriptor` with channel 0 and no fields.
    #[must_use]
    pub fn new(descriptor: &'static Descriptor) -> Self {
        Self {
            descriptor,
            fields: Vec::new(),
            status: None,
            channel: 0,
            timestamp: None,
        }
    }

    /// Appends one field byte.
    #[must_use]
    pub fn field(mut self, byte: u8) -> Self {
        self.fields.push(byte);
        self
    }

    /// Replaces all field bytes.
    #[must_use]
    pub fn fields(mut self, bytes: &[u8]) -> Self {
        self.fields.clear();
        self.fields.extend_from_slice(bytes);
        self
    }

    /// Overrides the status (default: the descriptor's status).
    #[must_use]
    pub fn status(mut self, status: u8) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the channel (default: 0).
    #[must_use]
    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Sets the timestamp (default: now).
    #[must_use]
    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builds the message.
    ///
    /// Status and channel are validated against the default masks, not
    /// against the descriptor's own status mask.
    ///
    /// # Errors
    ///
    /// Returns `ArgumentError::TooManyFields` if more field bytes were given
    /// than the type carries, and `RangeError::Status` / `RangeError::Channel`
    /// if either value has bits outside its mask.
    pub fn build(self) -> InputResult<Message> {
        let length = self.descriptor.data_length.clamp(1, MAX_DATA_LENGTH);
        let max = length - 1;
        if self.fields.len() > max {
            return Err(ArgumentError::TooManyFields {
                kind: self.descriptor.name,
                max,
                actual: self.fields.len(),
            }
            .into());
        }

        let status = self.status.unwrap_or(self.descriptor.status);
        if status & !STATUS_MASK != 0 {
            return Err(RangeError::Status { value: status }.into());
        }
        if self.channel & !CHANNEL_MASK != 0 {
            return Err(RangeError::Channel {
                value: self.channel,
            }
            .into());
        }

        let mut bytes = [0u8; MAX_DATA_LENGTH];
        bytes[0] = status | self.channel;
        bytes[1..=self.fields.len()].copy_from_slice(&self.fields);

        let timestamp = self.timestamp.unwrap_or_else(timestamp_now);
        Message::new(self.descriptor, &bytes[..length], timestamp)
    }
}
