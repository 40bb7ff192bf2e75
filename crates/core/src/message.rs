//! Symbols and messages.

use std::fmt::Debug;
use std::hash::Hash;

/// An opaque alphabet element.
///
/// Used for both source and channel alphabets; the two are distinguished only
/// by the role they play in a code. Anything cloneable, comparable and
/// hashable qualifies (`char`, `u8`, `bool`, `String`, small enums, ...).
pub trait Symbol: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> Symbol for T {}

/// An identified, immutable sequence of symbols.
///
/// Messages are created by a sender and only read afterwards; there is no
/// way to mutate one in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message<S> {
    id: u64,
    data: Vec<S>,
}

impl<S> Message<S> {
    /// Create a message with the given id and contents.
    pub fn new(id: u64, data: Vec<S>) -> Self {
        Self { id, data }
    }

    /// Identifier, unique within a run.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The symbols, in order.
    pub fn data(&self) -> &[S] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the message, returning its symbols.
    pub fn into_data(self) -> Vec<S> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_accessors() {
        let msg = Message::new(7, vec!['a', 'b']);
        assert_eq!(msg.id(), 7);
        assert_eq!(msg.data(), &['a', 'b']);
        assert_eq!(msg.len(), 2);
        assert!(!msg.is_empty());
        assert_eq!(msg.into_data(), vec!['a', 'b']);
    }
}
