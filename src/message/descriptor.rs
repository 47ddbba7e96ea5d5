//! Static metadata for one message type.

use std::fmt;

use crate::record::{CHANNEL_MASK, STATUS_MASK};

use super::builder::MessageBuilder;

/// Extra acceptance condition evaluated after the status test.
///
/// The slice is guaranteed to hold at least `data_length` bytes.
pub type Rule = fn(&[u8]) -> bool;

/// Describes how a message type is recognised on the wire.
///
/// A descriptor accepts a byte window when it is long enough, when
/// `bytes[0] & status_mask == status`, and when the optional [`Rule`] holds.
/// Equal descriptors have the same name and wire shape. Message typing goes
/// further and compares the `&'static` address, see [`crate::Message::is`].
#[derive(Clone, Copy)]
pub struct Descriptor {
    /// Type name, unique within a catalog.
    pub name: &'static str,
    /// Expected status bits after masking.
    pub status: u8,
    /// Bits of the first byte that carry the status.
    pub status_mask: u8,
    /// Minimum number of bytes a valid message carries.
    pub data_length: usize,
    /// Refinement used where two types share a status.
    pub rule: Option<Rule>,
}

impl Descriptor {
    /// Creates a descriptor with the default status mask (`0xF0`).
    #[must_use]
    pub const fn new(name: &'static str, status: u8, data_length: usize) -> Self {
        Self {
            name,
            status,
            status_mask: STATUS_MASK,
            data_length,
            rule: None,
        }
    }

    /// Replaces the status mask.
    #[must_use]
    pub const fn with_mask(self, status_mask: u8) -> Self {
        Self {
            status_mask,
            ..self
        }
    }

    /// Adds a refinement rule.
    #[must_use]
    pub const fn with_rule(self, rule: Rule) -> Self {
        Self {
            rule: Some(rule),
            ..self
        }
    }

    /// Returns true if `bytes` form a valid message of this type.
    #[must_use]
    pub fn accepts(&self, bytes: &[u8]) -> bool {
        if bytes.len() < self.data_length || bytes.is_empty() {
            return false;
        }
        if bytes[0] & self.status_mask != self.status {
            return false;
        }
        self.rule.map_or(true, |rule| rule(bytes))
    }

    /// Returns true if some status byte whose upper nibble is `nibble` passes
    /// the status test.
    #[must_use]
    pub fn accepts_nibble(&self, nibble: u8) -> bool {
        (0..=CHANNEL_MASK).any(|low| ((nibble << 4) | low) & self.status_mask == self.status)
    }

    /// Starts building a message of this type.
    #[must_use]
    pub fn builder(&'static self) -> MessageBuilder {
        MessageBuilder::new(self)
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.status == other.status
            && self.status_mask == other.status_mask
            && self.data_length == other.data_length
            && self.rule.is_some() == other.rule.is_some()
    }
}

impl Eq for Descriptor {}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("status", &format_args!("{:#04x}", self.status))
            .field("status_mask", &format_args!("{:#04x}", self.status_mask))
            .field("data_length", &self.data_length)
            .field("rule", &self.rule.is_some())
            .finish()
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
