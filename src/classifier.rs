//! Record classification.
//!
//! The classifier turns raw records into typed messages by asking an
//! ordered list of matchers, first acceptance wins. To avoid a linear scan
//! over every matcher for every record, it keeps one bucket per upper status
//! nibble. A bucket is filled lazily, the first time a record with that
//! nibble is seen, with the indices of the matchers that could possibly
//! accept such a record, in precedence order.
//!
//! Because a bucket preserves the global order and never omits a matcher
//! that could accept, the first bucket hit is always the matcher a full scan
//! would have picked. A warm cache changes the speed of classification, not
//! its result.

use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::error::InputResult;
use crate::matcher::Matcher;
use crate::message::Message;
use crate::record::{Data, Record};

const NIBBLES: usize = 16;

/// Builds typed messages from raw records.
#[derive(Debug, Clone)]
pub struct Classifier {
    matchers: Vec<Matcher>,
    buckets: [Option<Vec<usize>>; NIBBLES],
}

impl Classifier {
    /// Creates a classifier over `matchers`; their order is the precedence.
    #[must_use]
    pub fn new(matchers: Vec<Matcher>) -> Self {
        Self {
            matchers,
            buckets: Default::default(),
        }
    }

    /// A classifier without matchers; everything classifies as Unknown.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Classifier over the default matchers of `catalog`.
    #[must_use]
    pub fn from_catalog(catalog: &Catalog) -> Self {
        catalog.classifier()
    }

    /// Classifier over [`Catalog::standard`].
    #[must_use]
    pub fn standard() -> Self {
        Self::from_catalog(&Catalog::standard())
    }

    /// Appends a matcher with the lowest precedence so far.
    ///
    /// Clears the lookup cache.
    pub fn add_matcher(&mut self, matcher: Matcher) -> &mut Self {
        self.matchers.push(matcher);
        self.buckets = Default::default();
        self
    }

    /// Matchers in precedence order.
    #[must_use]
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Number of nibble buckets filled so far.
    #[must_use]
    pub fn cached_buckets(&self) -> usize {
        self.buckets.iter().filter(|b| b.is_some()).count()
    }

    /// Finds the first matcher accepting `data`.
    pub fn lookup(&mut self, data: &Data) -> Option<&Matcher> {
        let index = self.lookup_index(data)?;
        self.matchers.get(index)
    }

    /// Same result as [`Classifier::lookup`] without touching the cache.
    #[must_use]
    pub fn scan(&self, data: &Data) -> Option<&Matcher> {
        self.matchers.iter().find(|m| m.matches(data))
    }

    /// Classifies a record. Records no matcher accepts become Unknown.
    pub fn build(&mut self, record: Record) -> Message {
        let found = self
            .lookup(&record.data)
            .and_then(|m| m.build(record.data, record.timestamp));

        found.unwrap_or_else(|| {
            debug!(data = ?record.data, "unclassified record");
            Message::unknown(record)
        })
    }

    /// Classifies raw bytes.
    ///
    /// # Errors
    ///
    /// Returns a structural error if `bytes` is empty or longer than three
    /// bytes.
    pub fn classify(&mut self, bytes: &[u8], timestamp: f64) -> InputResult<Message> {
        let record = Record::new(bytes, timestamp)?;
        Ok(self.build(record))
    }

    /// Re-stamps an existing message.
    ///
    /// A valid message with an unchanged timestamp is returned as is; a valid
    /// message with a new timestamp keeps its type. Messages whose bytes no
    /// longer satisfy their type are classified again.
    #[allow(clippy::float_cmp)]
    pub fn rebuild(&mut self, message: Message, timestamp: f64) -> Message {
        if message.is_valid() {
            if message.timestamp() == timestamp {
                return message;
            }
            return message.with_timestamp(timestamp);
        }
        self.build(Record {
            data: *message.data(),
            timestamp,
        })
    }

    fn lookup_index(&mut self, data: &Data) -> Option<usize> {
        let nibble = data.nibble();
        let matchers = &self.matchers;
        let bucket = self.buckets[nibble].get_or_insert_with(|| {
            let candidates: Vec<usize> = matchers
                .iter()
                .enumerate()
                .filter(|(_, m)| m.may_match_nibble(nibble as u8))
                .map(|(i, _)| i)
                .collect();
            trace!(nibble, candidates = candidates.len(), "filled classifier bucket");
            candidates
        });

        bucket.iter().copied().find(|&i| matchers[i].matches(data))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}
