//! Ordered catalog of message types.
//!
//! The catalog is an explicit list assembled once at startup. Its order is
//! the precedence used when more than one type accepts the same bytes.

use crate::classifier::Classifier;
use crate::matcher::Matcher;
use crate::message::kinds::{
    AFTERTOUCH, CHANNEL_MODE, CHANNEL_PRESSURE, CONTROL_CHANGE, NOTE, PITCH_BEND_CHANGE,
    PROGRAM_CHANGE,
};
use crate::message::Descriptor;

/// Ordered set of message type descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    descriptors: Vec<&'static Descriptor>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel voice and channel mode messages.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            descriptors: vec![
                &AFTERTOUCH,
                &CHANNEL_PRESSURE,
                &CHANNEL_MODE,
                &CONTROL_CHANGE,
                &NOTE,
                &PITCH_BEND_CHANGE,
                &PROGRAM_CHANGE,
            ],
        }
    }

    /// Appends a descriptor with the lowest precedence so far.
    ///
    /// Descriptors already present (by name) are ignored.
    #[must_use]
    pub fn with(mut self, descriptor: &'static Descriptor) -> Self {
        self.push(descriptor);
        self
    }

    /// Appends a descriptor with the lowest precedence so far.
    ///
    /// Returns false if a descriptor with the same name is already present.
    pub fn push(&mut self, descriptor: &'static Descriptor) -> bool {
        if self.contains(descriptor) {
            return false;
        }
        self.descriptors.push(descriptor);
        true
    }

    /// Whether this exact descriptor (by address) is registered.
    #[must_use]
    pub fn contains(&self, descriptor: &Descriptor) -> bool {
        self.descriptors.iter().any(|d| std::ptr::eq(*d, descriptor))
    }

    /// Looks up a descriptor by type name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&'static Descriptor> {
        self.descriptors.iter().copied().find(|d| d.name == name)
    }

    /// Descriptors in precedence order.
    #[must_use]
    pub fn descriptors(&self) -> &[&'static Descriptor] {
        &self.descriptors
    }

    /// Number of registered descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no descriptor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Default matchers in precedence order.
    #[must_use]
    pub fn matchers(&self) -> Vec<Matcher> {
        self.descriptors.iter().copied().map(Matcher::new).collect()
    }

    /// Classifier over this catalog's default matchers.
    #[must_use]
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.matchers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::kinds::GENERIC;

    #[test]
    fn test_standard_order() {
        let names: Vec<&str> = Catalog::standard().descriptors().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "Aftertouch",
                "ChannelPressure",
                "ChannelMode",
                "ControlChange",
                "Note",
                "PitchBendChange",
                "ProgramChange"
            ]
        );
    }

    #[test]
    fn test_standard_types_do_not_overlap() {
        let catalog = Catalog::standard();
        for status in 0..=0xFFu8 {
            for number in 0..0x80u8 {
                let bytes = [status, number, 0x40];
                let accepting = catalog
                    .descriptors()
                    .iter()
                    .filter(|d| d.accepts(&bytes))
                    .count();
                assert!(accepting <= 1, "{bytes:?} accepted {accepting} times");
            }
        }
    }

    #[test]
    fn test_push_ignores_duplicates() {
        let mut catalog = Catalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.push(&GENERIC));
        assert!(!catalog.push(&GENERIC));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find("Generic"), Some(&GENERIC));
        assert!(catalog.find("Note").is_none());
    }

    #[test]
    fn test_push_keeps_same_named_foreign_descriptor() {
        static LOOKALIKE: Descriptor = Descriptor::new("Note", 0x90, 3);

        let mut catalog = Catalog::new().with(&NOTE);
        assert!(!catalog.contains(&LOOKALIKE));
        assert!(catalog.push(&LOOKALIKE));
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.push(&LOOKALIKE));
        assert!(std::ptr::eq(catalog.find("Note").unwrap(), &NOTE));
    }

    #[test]
    fn test_with_builds_in_order() {
        let catalog = Catalog::new().with(&NOTE).with(&GENERIC);
        assert_eq!(catalog.matchers().len(), 2);
        assert_eq!(catalog.descriptors()[0].name, "Note");
    }
}
