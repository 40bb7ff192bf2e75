//! codinglab-core: prefix codes and a simulated transmission pipeline
//!
//! This library provides the pieces of a source → encoder → channel →
//! decoder → sink chain for experimenting with coding schemes:
//! - Builds prefix-free codes over arbitrary source and channel alphabets
//! - Drives messages through senders, (noisy) channels and receivers
//! - Records every pipeline step in an event log and aggregates statistics
//!
//! # Architecture
//!
//! - `tree`: prefix-code trie with insertion checks and sequential decode
//! - `code`: encoder/decoder capabilities and the tree-backed `PrefixCode`
//! - `builders`: strategies that fill a code's tree
//! - `sender`: message sources (fixed replay, seeded random)
//! - `channel`: noiseless and noisy transports
//! - `receiver`: decoding, outcome classification, statistics
//! - `stats`: transmission counters and derived metrics
//! - `experiment`: runs N pipeline cycles and reports the result
//! - `logger`: append-only event log sinks
//!
//! # Design Principles
//!
//! - **No panics**: errors are structured, per-message failures never abort a run
//! - **Single-threaded**: each run is a strict sequence of cycles
//! - **Deterministic**: randomness is seeded per component, never global
//! - **Observable**: event log for experiment data, `tracing` for diagnostics
//!
//! # Example
//!
//! ```
//! use codinglab_core::channel::NoiselessChannel;
//! use codinglab_core::code::PrefixCode;
//! use codinglab_core::experiment::ExperimentRunner;
//! use codinglab_core::logger::NullLogger;
//! use codinglab_core::receiver::TrackingReceiver;
//! use codinglab_core::sender::FixedSender;
//!
//! let code = PrefixCode::from_table(
//!     vec!['a', 'b', 'c'],
//!     vec![0u8, 1],
//!     vec![('a', vec![0]), ('b', vec![1, 0]), ('c', vec![1, 1])],
//! )?;
//!
//! let sender = FixedSender::new(&code, vec![vec!['a', 'b', 'a', 'c']])?;
//! let receiver = TrackingReceiver::with_baseline(&code, 2);
//! let mut runner = ExperimentRunner::new(sender, NoiselessChannel, receiver, NullLogger);
//!
//! let result = runner.run(10)?;
//! assert_eq!(result.stats().successful_messages, 10);
//! # Ok::<(), codinglab_core::Error>(())
//! ```

pub mod builders;
pub mod channel;
pub mod code;
pub mod error;
pub mod experiment;
pub mod logger;
pub mod message;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod tree;

// Re-export commonly used types
pub use code::{Code, Decoder, Encoder, PrefixCode};
pub use error::{Error, Result};
pub use message::{Message, Symbol};
