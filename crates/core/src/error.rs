//! Error types for the coding pipeline.
//!
//! Construction-time problems (bad trees, bad configuration) and per-message
//! problems (decode failures, lost messages) are kept in separate enums so
//! callers can tell "this code is unusable" apart from "this message failed".

use thiserror::Error;

/// Top-level error type for all operations in the library.
///
/// Each variant corresponds to a specific failure domain:
/// - Tree: prefix-code tree construction
/// - DecodeFailure: a whole message failed to decode
/// - UnknownSymbol / Encoding: a message could not be encoded
/// - InvalidConfiguration: a component was built with bad parameters
/// - Transport: a channel lost the message entirely
#[derive(Debug, Error)]
pub enum Error {
    /// Prefix-code tree construction failed; the code must not be used
    #[error("prefix tree error: {0}")]
    Tree(#[from] TreeError),

    /// Message-level decode failure, wrapping the step that failed
    #[error("failed to decode message after {decoded} symbols: {source}")]
    DecodeFailure {
        /// Source symbols successfully decoded before the failure
        decoded: usize,
        #[source]
        source: DecodeError,
    },

    /// Source symbol outside the code's source alphabet
    #[error("symbol at position {position} is not in the source alphabet")]
    UnknownSymbol { position: usize },

    /// A sender could not encode a message it generated
    #[error("failed to encode message {message_id}: {source}")]
    Encoding {
        message_id: u64,
        #[source]
        source: Box<Error>,
    },

    /// Component parameters rejected at construction time
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Channel failed to deliver the message at all
    #[error("message {message_id} lost in transport")]
    Transport { message_id: u64 },
}

impl Error {
    /// True for errors that belong to a single message and must not stop a run.
    pub fn is_per_message(&self) -> bool {
        matches!(
            self,
            Error::DecodeFailure { .. } | Error::Transport { .. }
        )
    }

    /// Short stable name used in event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Tree(TreeError::PrefixViolation { .. }) => "PrefixViolation",
            Error::Tree(TreeError::DuplicateCodeword { .. }) => "DuplicateCodeword",
            Error::DecodeFailure { source: e, .. } => match e {
                DecodeError::IncompleteCodeword { .. } => "IncompleteCodeword",
                DecodeError::InvalidSymbol { .. } => "InvalidSymbol",
                DecodeError::OutOfRange { .. } => "OutOfRange",
            },
            Error::UnknownSymbol { .. } => "UnknownSymbol",
            Error::Encoding { .. } => "EncodingError",
            Error::InvalidConfiguration(_) => "InvalidConfiguration",
            Error::Transport { .. } => "Transport",
        }
    }
}

/// Prefix-code tree construction errors.
///
/// Insertion is checked before the tree is touched, so a failed insert
/// leaves the tree exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The codeword is empty, extends an existing codeword, or is a
    /// proper prefix of one
    #[error("prefix violation at depth {depth} (codeword length {len})")]
    PrefixViolation { depth: usize, len: usize },

    /// The exact codeword is already assigned
    #[error("codeword of length {len} is already assigned")]
    DuplicateCodeword { len: usize },
}

/// Errors from a single traversal of the prefix-code tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ran out before a leaf was reached
    #[error("incomplete codeword starting at {start}: input ends at {len}")]
    IncompleteCodeword { start: usize, len: usize },

    /// No edge for the input symbol at this position
    #[error("no codeword continues with the symbol at position {position}")]
    InvalidSymbol { position: usize },

    /// Decode started at or past the end of the input
    #[error("start position {position} out of range for input of length {len}")]
    OutOfRange { position: usize, len: usize },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failure_keeps_source() {
        let err = Error::DecodeFailure {
            decoded: 3,
            source: DecodeError::InvalidSymbol { position: 7 },
        };
        assert_eq!(err.kind(), "InvalidSymbol");
        assert!(err.is_per_message());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_construction_errors_are_not_per_message() {
        let err: Error = TreeError::DuplicateCodeword { len: 2 }.into();
        assert_eq!(err.kind(), "DuplicateCodeword");
        assert!(!err.is_per_message());
        assert!(!Error::InvalidConfiguration("x".into()).is_per_message());
    }
}
