//! The standard message types.
//!
//! Field layouts follow the channel voice and channel mode messages of the
//! MIDI 1.0 specification. Control Change and Channel Mode share status
//! `0xB0`; they are told apart by the second byte alone (controller numbers
//! `120..=127` are mode messages).

use std::ops::Deref;

use crate::error::{InputResult, RangeError};

use super::descriptor::Descriptor;
use super::sealed::Sealed;
use super::{Message, MessageType};

/// First controller number reserved for channel mode messages.
pub const CHANNEL_MODE_START: u8 = 120;

fn is_controller(d: &[u8]) -> bool {
    d.get(1).is_some_and(|&number| number < CHANNEL_MODE_START)
}

fn is_channel_mode(d: &[u8]) -> bool {
    d.get(1).is_some_and(|&number| number >= CHANNEL_MODE_START)
}

/// Three byte record with status `0x00`; not part of the standard catalog.
pub static GENERIC: Descriptor = Descriptor::new("Generic", 0x00, 3);
/// Note on (`0x90`) and note off (`0x80`).
pub static NOTE: Descriptor = Descriptor::new("Note", 0x80, 3).with_mask(0xE0);
/// Controller value change, controller numbers `0..120`.
pub static CONTROL_CHANGE: Descriptor =
    Descriptor::new("ControlChange", 0xB0, 3).with_rule(is_controller);
/// Channel mode message, controller numbers `120..128`.
pub static CHANNEL_MODE: Descriptor =
    Descriptor::new("ChannelMode", 0xB0, 2).with_rule(is_channel_mode);
/// Channel pressure (mono aftertouch).
pub static CHANNEL_PRESSURE: Descriptor = Descriptor::new("ChannelPressure", 0xD0, 2);
/// Polyphonic key pressure.
pub static AFTERTOUCH: Descriptor = Descriptor::new("Aftertouch", 0xA0, 3);
/// Program (patch) change.
pub static PROGRAM_CHANGE: Descriptor = Descriptor::new("ProgramChange", 0xC0, 2);
/// 14 bit pitch wheel position.
pub static PITCH_BEND_CHANGE: Descriptor = Descriptor::new("PitchBendChange", 0xE0, 3);
/// Status packed by `Note::create`.
const NOTE_ON_STATUS: u8 = 0x90;

/// Anything no known type accepts.
pub static UNKNOWN: Descriptor = Descriptor::new("Unknown", 0x00, 1).with_mask(0x00);

macro_rules! message_type {
    ($(#[$meta:meta])* $name:ident => $descriptor:ident $(, create_status = $status:expr)?) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name(Message);

        impl MessageType for $name {
            fn descriptor() -> &'static Descriptor {
                &$descriptor
            }

            fn message(&self) -> &Message {
                &self.0
            }
        }

        impl Sealed for $name {
            fn wrap(message: Message) -> Self {
                Self(message)
            }

            $(
                fn create_status() -> Option<u8> {
                    Some($status)
                }
            )?
        }

        impl Deref for $name {
            type Target = Message;

            fn deref(&self) -> &Message {
                &self.0
            }
        }

        impl From<$name> for Message {
            fn from(view: $name) -> Message {
                view.0
            }
        }
    };
}

message_type! {
    /// Generic three byte record.
    Generic => GENERIC
}

message_type! {
    /// Note on / note off.
    ///
    /// [`MessageType::create`] and [`MessageType::builder`] default to note
    /// on; use [`Note::off`] for a release.
    Note => NOTE, create_status = NOTE_ON_STATUS
}

message_type! {
    /// Controller value change.
    ControlChange => CONTROL_CHANGE
}

message_type! {
    /// Channel mode message (all sound off, reset controllers, ...).
    ChannelMode => CHANNEL_MODE
}

message_type! {
    /// Single pressure value for the whole channel.
    ChannelPressure => CHANNEL_PRESSURE
}

message_type! {
    /// Per-key pressure.
    Aftertouch => AFTERTOUCH
}

message_type! {
    /// Program change.
    ProgramChange => PROGRAM_CHANGE
}

message_type! {
    /// Pitch wheel change.
    PitchBendChange => PITCH_BEND_CHANGE
}

message_type! {
    /// Unclassified bytes.
    Unknown => UNKNOWN
}

impl Note {
    /// Status bit set for note on.
    pub const NOTE_ON: u8 = 0x10;
    /// Status bit value for note off.
    pub const NOTE_OFF: u8 = 0x00;

    /// Creates a note on message.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::Channel` unless `channel < 16`.
    pub fn on(note: u8, velocity: u8, channel: u8, timestamp: f64) -> InputResult<Self> {
        Self::with_state(true, note, velocity, channel, timestamp)
    }

    /// Creates a note off message.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::Channel` unless `channel < 16`.
    pub fn off(note: u8, velocity: u8, channel: u8, timestamp: f64) -> InputResult<Self> {
        Self::with_state(false, note, velocity, channel, timestamp)
    }

    fn with_state(
        on: bool,
        note: u8,
        velocity: u8,
        channel: u8,
        timestamp: f64,
    ) -> InputResult<Self> {
        let state = if on { Self::NOTE_ON } else { Self::NOTE_OFF };
        let message = NOTE
            .builder()
            .status(NOTE.status | state)
            .fields(&[note, velocity])
            .channel(channel)
            .timestamp(timestamp)
            .build()?;
        Ok(Self(message))
    }

    /// Key number.
    #[must_use]
    pub fn note(&self) -> u8 {
        self.0.data()[1]
    }

    /// Key velocity.
    #[must_use]
    pub fn velocity(&self) -> u8 {
        self.0.data()[2]
    }

    /// True if the key was pressed.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.0.data().status_byte() & Self::NOTE_ON != 0
    }

    /// True if the key was released.
    #[must_use]
    pub fn is_off(&self) -> bool {
        !self.is_on()
    }
}

impl ControlChange {
    /// Controller number.
    #[must_use]
    pub fn number(&self) -> u8 {
        self.0.data()[1]
    }

    /// Controller value.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0.data()[2]
    }
}

impl ChannelMode {
    /// Mode number, `120..=127`.
    #[must_use]
    pub fn number(&self) -> u8 {
        self.0.data()[1]
    }
}

impl ChannelPressure {
    /// Pressure applied to the whole channel.
    #[must_use]
    pub fn pressure(&self) -> u8 {
        self.0.data()[1]
    }
}

impl Aftertouch {
    /// Key number.
    #[must_use]
    pub fn note(&self) -> u8 {
        self.0.data()[1]
    }

    /// Pressure on that key.
    #[must_use]
    pub fn pressure(&self) -> u8 {
        self.0.data()[2]
    }
}

impl ProgramChange {
    /// Program number.
    #[must_use]
    pub fn number(&self) -> u8 {
        self.0.data()[1]
    }
}

impl PitchBendChange {
    /// Offset that centres the 14 bit value around zero.
    pub const CENTER_VALUE: i32 = 0x2000;

    const MAX_BIN: i32 = 0x3FFF;

    /// Creates a pitch bend message from a value in `[-1, 1]`.
    ///
    /// Values outside the range are clamped.
    ///
    /// # Errors
    ///
    /// Returns `RangeError::PitchBend` for NaN and `RangeError::Channel`
    /// unless `channel < 16`.
    pub fn from_value(value: f64, channel: u8, timestamp: f64) -> InputResult<Self> {
        let [lsb, msb] = Self::encode(value)?;
        Self::create(&[lsb, msb], channel, timestamp)
    }

    /// Encodes a value in `[-1, 1]` into its two data bytes (LSB first).
    ///
    /// # Errors
    ///
    /// Returns `RangeError::PitchBend` for NaN.
    pub fn encode(value: f64) -> Result<[u8; 2], RangeError> {
        if value.is_nan() {
            return Err(RangeError::PitchBend { value });
        }
        let scaled = (value.clamp(-1.0, 1.0) * f64::from(Self::CENTER_VALUE)).round() as i32;
        let bin = (scaled + Self::CENTER_VALUE).clamp(0, Self::MAX_BIN);
        Ok([(bin & 0x7F) as u8, (bin >> 7) as u8])
    }

    /// Signed 14 bit value, `-0x2000..0x2000`.
    #[must_use]
    pub fn raw(&self) -> i32 {
        let data = self.0.data();
        (i32::from(data[2]) << 7) + i32::from(data[1]) - Self::CENTER_VALUE
    }

    /// Bend normalised to roughly `[-1, 1)`.
    #[must_use]
    pub fn value(&self) -> f64 {
        f64::from(self.raw()) / f64::from(Self::CENTER_VALUE)
    }
}
