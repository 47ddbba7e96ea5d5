//! Raw input records.
//!
//! A record is one to three bytes in the MIDI wire encoding plus the time the
//! bytes arrived. Records are classified into typed [`Message`]s by a
//! [`Classifier`].
//!
//! [`Message`]: crate::message::Message
//! [`Classifier`]: crate::classifier::Classifier

use std::fmt;
use std::ops::Deref;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{InputError, StructuralError};

/// Maximum number of bytes in a record.
pub const MAX_DATA_LENGTH: usize = 3;

/// Mask selecting the status bits of the first byte.
pub const STATUS_MASK: u8 = 0xF0;

/// Mask selecting the channel bits of the first byte.
pub const CHANNEL_MASK: u8 = 0x0F;

/// Inline byte window of one to three bytes.
///
/// Stored by value so records and messages are `Copy` and never allocate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Data {
    bytes: [u8; MAX_DATA_LENGTH],
    len: u8,
}

impl Data {
    /// Copies `bytes` into a new window.
    ///
    /// # Errors
    ///
    /// Returns `StructuralError::Empty` for an empty slice and
    /// `StructuralError::TooLong` for more than three bytes.
    pub fn new(bytes: &[u8]) -> Result<Self, StructuralError> {
        if bytes.is_empty() {
            return Err(StructuralError::Empty);
        }
        if bytes.len() > MAX_DATA_LENGTH {
            return Err(StructuralError::TooLong {
                actual: bytes.len(),
            });
        }

        let mut data = Self {
            bytes: [0; MAX_DATA_LENGTH],
            len: bytes.len() as u8,
        };
        data.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(data)
    }

    /// The bytes as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// The status byte (status and channel).
    #[must_use]
    pub const fn status_byte(&self) -> u8 {
        self.bytes[0]
    }

    /// Upper nibble of the status byte, used to bucket lookups.
    #[must_use]
    pub const fn nibble(&self) -> usize {
        (self.bytes[0] >> 4) as usize
    }
}

impl Deref for Data {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Data {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, b) in self.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{b:#04x}")?;
        }
        write!(f, "]")
    }
}

impl TryFrom<&[u8]> for Data {
    type Error = StructuralError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl TryFrom<Vec<u8>> for Data {
    type Error = StructuralError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(&bytes)
    }
}

impl From<Data> for Vec<u8> {
    fn from(data: Data) -> Self {
        data.as_slice().to_vec()
    }
}

/// Seconds since the Unix epoch, as used for record timestamps.
#[must_use]
pub fn timestamp_now() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Unclassified input: raw bytes plus arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The raw bytes.
    pub data: Data,
    /// Arrival time in seconds; the epoch is up to the producer.
    pub timestamp: f64,
}

impl Record {
    /// Creates a record from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns a structural error if `bytes` is empty or longer than three bytes.
    pub fn new(bytes: &[u8], timestamp: f64) -> Result<Self, InputError> {
        Ok(Self {
            data: Data::new(bytes)?,
            timestamp,
        })
    }

    /// Creates a record stamped with the current wall-clock time.
    ///
    /// # Errors
    ///
    /// Same as [`Record::new`].
    pub fn now(bytes: &[u8]) -> Result<Self, InputError> {
        Self::new(bytes, timestamp_now())
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        self.data.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_bounds() {
        assert_eq!(Data::new(&[]), Err(StructuralError::Empty));
        assert_eq!(
            Data::new(&[1, 2, 3, 4]),
            Err(StructuralError::TooLong { actual: 4 })
        );
        assert_eq!(Data::new(&[0xC0, 7]).unwrap().as_slice(), &[0xC0, 7]);
    }

    #[test]
    fn test_data_nibble() {
        let data = Data::new(&[0xB3, 5, 1]).unwrap();
        assert_eq!(data.nibble(), 0xB);
        assert_eq!(data.status_byte(), 0xB3);
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn test_data_debug_is_hex() {
        let data = Data::new(&[0x90, 60]).unwrap();
        assert_eq!(format!("{data:?}"), "[0x90, 0x3c]");
    }

    #[test]
    fn test_record_serialization() {
        let record = Record::new(&[0x9F, 1, 0], 4.3).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"data":[159,1,0],"timestamp":4.3}"#);

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_deserialization_rejects_long_data() {
        let res: Result<Record, _> = serde_json::from_str(r#"{"data":[1,2,3,4],"timestamp":0.0}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_record_now_is_recent() {
        let record = Record::now(&[0xF8]).unwrap();
        assert!(record.timestamp > 1_500_000_000.0);
    }
}
