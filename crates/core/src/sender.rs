//! Message sources.
//!
//! A sender produces messages one at a time and encodes each with the code
//! it is bound to. Two variants:
//! - [`FixedSender`]: cyclic replay of a fixed list of messages
//! - [`ProbabilisticSender`]: i.i.d. draws from a symbol distribution, with
//!   a message length drawn uniformly from an inclusive range
//!
//! # Determinism
//!
//! Randomness comes from a ChaCha8 RNG owned by each sender and seeded at
//! construction. Two senders built with the same seed, distribution and
//! range produce the same messages, and `reset` replays them.

use crate::code::Encoder;
use crate::error::{Error, Result};
use crate::logger::{LogEvent, Logger, Payload};
use crate::message::{Message, Symbol};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Tolerance for probabilities summing to one
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Produces messages and their encodings.
pub trait Sender<S, C> {
    /// Produce the next message and its encoding.
    ///
    /// # Errors
    /// `Encoding` if the bound code rejects the generated message.
    fn next(&mut self, log: &mut dyn Logger) -> Result<(Message<S>, Vec<C>)>;

    /// Symbols this sender can emit.
    fn alphabet(&self) -> Vec<S>;

    /// The most recently produced message.
    fn last_message(&self) -> Option<&Message<S>>;

    /// Restart ids from zero and replay from the beginning.
    fn reset(&mut self);
}

/// Log, encode, log: shared by every sender.
fn encode_and_log<S, C, E>(encoder: &E, message: &Message<S>, log: &mut dyn Logger) -> Result<Vec<C>>
where
    E: Encoder<S, C>,
{
    let id = message.id();
    log.append(LogEvent::new(
        id,
        Payload::Generated {
            source_len: message.len(),
        },
    ));

    match encoder.encode(message.data()) {
        Ok(encoded) => {
            log.append(LogEvent::new(
                id,
                Payload::Encoded {
                    source_len: message.len(),
                    channel_len: encoded.len(),
                },
            ));
            Ok(encoded)
        }
        Err(e) => {
            log.append(LogEvent::new(
                id,
                Payload::Failed {
                    error_kind: e.kind(),
                    reason: e.to_string(),
                },
            ));
            Err(Error::Encoding {
                message_id: id,
                source: Box::new(e),
            })
        }
    }
}

/// Replays a fixed list of messages, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct FixedSender<S, E> {
    encoder: E,
    messages: Vec<Vec<S>>,
    index: usize,
    next_id: u64,
    last: Option<Message<S>>,
}

impl<S: Symbol, E> FixedSender<S, E> {
    /// # Errors
    /// `InvalidConfiguration` if `messages` is empty.
    pub fn new(encoder: E, messages: Vec<Vec<S>>) -> Result<Self> {
        if messages.is_empty() {
            return Err(Error::InvalidConfiguration(
                "fixed sender needs at least one message".to_string(),
            ));
        }

        Ok(Self {
            encoder,
            messages,
            index: 0,
            next_id: 0,
            last: None,
        })
    }

    /// Position in the list of the next message to send.
    pub fn position(&self) -> usize {
        self.index
    }
}

impl<S, C, E> Sender<S, C> for FixedSender<S, E>
where
    S: Symbol,
    E: Encoder<S, C>,
{
    fn next(&mut self, log: &mut dyn Logger) -> Result<(Message<S>, Vec<C>)> {
        let message = Message::new(self.next_id, self.messages[self.index].clone());
        self.next_id += 1;
        self.index = (self.index + 1) % self.messages.len();
        self.last = Some(message.clone());

        let encoded = encode_and_log(&self.encoder, &message, log)?;
        Ok((message, encoded))
    }

    fn alphabet(&self) -> Vec<S> {
        if let Some(table) = self.encoder.code_table() {
            return table.iter().map(|(s, _)| s.clone()).collect();
        }

        let mut seen = HashSet::new();
        self.messages
            .iter()
            .flatten()
            .filter(|s| seen.insert(*s))
            .cloned()
            .collect()
    }

    fn last_message(&self) -> Option<&Message<S>> {
        self.last.as_ref()
    }

    fn reset(&mut self) {
        self.index = 0;
        self.next_id = 0;
        self.last = None;
    }
}

/// Draws messages from a symbol distribution.
#[derive(Debug, Clone)]
pub struct ProbabilisticSender<S, E> {
    encoder: E,
    symbols: Vec<S>,
    weights: WeightedIndex<f64>,
    min_len: usize,
    max_len: usize,
    seed: u64,
    rng: ChaCha8Rng,
    next_id: u64,
    last: Option<Message<S>>,
}

impl<S: Symbol, E> ProbabilisticSender<S, E> {
    /// Create a sender over `probabilities`, drawing lengths from `length_range`.
    ///
    /// # Errors
    /// `InvalidConfiguration` if the distribution is empty, repeats a symbol,
    /// has a negative or non-finite probability, does not sum to 1, if the
    /// length range is empty, or if the encoder rejects any symbol of the
    /// distribution.
    pub fn new<C>(
        encoder: E,
        probabilities: Vec<(S, f64)>,
        length_range: RangeInclusive<usize>,
        seed: u64,
    ) -> Result<Self>
    where
        E: Encoder<S, C>,
    {
        if probabilities.is_empty() {
            return Err(Error::InvalidConfiguration(
                "probability distribution cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(probabilities.len());
        for (symbol, p) in &probabilities {
            if !seen.insert(symbol) {
                return Err(Error::InvalidConfiguration(format!(
                    "symbol {:?} appears more than once in the distribution",
                    symbol
                )));
            }
            if !p.is_finite() || *p < 0.0 {
                return Err(Error::InvalidConfiguration(format!(
                    "probability of {:?} must be a non-negative number, got {}",
                    symbol, p
                )));
            }
        }

        let total: f64 = probabilities.iter().map(|(_, p)| p).sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(Error::InvalidConfiguration(format!(
                "probabilities must sum to 1.0, got {:.6}",
                total
            )));
        }

        let (min_len, max_len) = length_range.into_inner();
        if min_len > max_len {
            return Err(Error::InvalidConfiguration(format!(
                "message length range {}..={} is empty",
                min_len, max_len
            )));
        }

        // Every symbol the distribution can produce must be encodable, so
        // `next` can only fail on a broken encoder.
        for (symbol, _) in &probabilities {
            encoder
                .encode(std::slice::from_ref(symbol))
                .map_err(|e| {
                    Error::InvalidConfiguration(format!(
                        "symbol {:?} cannot be encoded: {}",
                        symbol, e
                    ))
                })?;
        }

        let (symbols, weights): (Vec<S>, Vec<f64>) = probabilities.into_iter().unzip();
        let weights = WeightedIndex::new(&weights)
            .map_err(|e| Error::InvalidConfiguration(format!("invalid weights: {}", e)))?;

        Ok(Self {
            encoder,
            symbols,
            weights,
            min_len,
            max_len,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_id: 0,
            last: None,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn length_range(&self) -> RangeInclusive<usize> {
        self.min_len..=self.max_len
    }

    fn draw(&mut self) -> Vec<S> {
        let len = self.rng.gen_range(self.min_len..=self.max_len);
        (0..len)
            .map(|_| self.symbols[self.weights.sample(&mut self.rng)].clone())
            .collect()
    }
}

impl<S, C, E> Sender<S, C> for ProbabilisticSender<S, E>
where
    S: Symbol,
    E: Encoder<S, C>,
{
    fn next(&mut self, log: &mut dyn Logger) -> Result<(Message<S>, Vec<C>)> {
        let message = Message::new(self.next_id, self.draw());
        self.next_id += 1;
        self.last = Some(message.clone());

        let encoded = encode_and_log(&self.encoder, &message, log)?;
        Ok((message, encoded))
    }

    fn alphabet(&self) -> Vec<S> {
        self.symbols.clone()
    }

    fn last_message(&self) -> Option<&Message<S>> {
        self.last.as_ref()
    }

    fn reset(&mut self) {
        self.next_id = 0;
        self.last = None;
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixed_length;
    use crate::code::{IdentityCode, PrefixCode};
    use crate::logger::{EventKind, MemoryLogger, NullLogger};

    fn binary_code() -> PrefixCode<char, char> {
        PrefixCode::from_table(
            vec!['A', 'B', 'C'],
            vec!['0', '1'],
            vec![
                ('A', vec!['0']),
                ('B', vec!['1', '0']),
                ('C', vec!['1', '1']),
            ],
        )
        .unwrap()
    }

    fn abc_probabilities() -> Vec<(char, f64)> {
        vec![('A', 0.5), ('B', 0.3), ('C', 0.2)]
    }

    #[test]
    fn test_fixed_sender_cycles() {
        let code = binary_code();
        let mut sender = FixedSender::new(&code, vec![vec!['A'], vec!['B', 'C']]).unwrap();
        let mut log = NullLogger;

        let (m0, e0) = sender.next(&mut log).unwrap();
        let (m1, e1) = sender.next(&mut log).unwrap();
        let (m2, _) = sender.next(&mut log).unwrap();

        assert_eq!((m0.id(), m0.data()), (0, &['A'][..]));
        assert_eq!(e0, vec!['0']);
        assert_eq!((m1.id(), m1.data()), (1, &['B', 'C'][..]));
        assert_eq!(e1, vec!['1', '0', '1', '1']);
        // Wrapped around, ids keep counting
        assert_eq!((m2.id(), m2.data()), (2, &['A'][..]));
        assert_eq!(Sender::<char, char>::last_message(&sender).map(|m| m.id()), Some(2));
    }

    #[test]
    fn test_fixed_sender_reset() {
        let code = binary_code();
        let mut sender = FixedSender::new(&code, vec![vec!['A'], vec!['B']]).unwrap();
        let mut log = NullLogger;

        sender.next(&mut log).unwrap();
        Sender::<char, char>::reset(&mut sender);
        assert_eq!(sender.position(), 0);

        let (msg, _) = sender.next(&mut log).unwrap();
        assert_eq!(msg.id(), 0);
        assert_eq!(msg.data(), &['A']);
    }

    #[test]
    fn test_fixed_sender_requires_messages() {
        let code = binary_code();
        let result = FixedSender::new(&code, Vec::<Vec<char>>::new());
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_fixed_sender_encoding_error() {
        let code = binary_code();
        let mut sender = FixedSender::new(&code, vec![vec!['A', 'Z']]).unwrap();
        let mut log = MemoryLogger::new();

        let result: Result<(Message<char>, Vec<char>)> = sender.next(&mut log);
        match result {
            Err(Error::Encoding { message_id, source }) => {
                assert_eq!(message_id, 0);
                assert!(matches!(*source, Error::UnknownSymbol { position: 1 }));
            }
            other => panic!("expected encoding error, got {:?}", other),
        }
        assert_eq!(log.of_kind(EventKind::Error).count(), 1);
    }

    #[test]
    fn test_fixed_sender_alphabet() {
        let code = binary_code();
        let sender = FixedSender::new(&code, vec![vec!['C']]).unwrap();
        assert_eq!(Sender::<char, char>::alphabet(&sender), vec!['A', 'B', 'C']);

        let identity = IdentityCode::<u8>::new();
        let sender = FixedSender::new(identity, vec![vec![3, 1], vec![1, 2]]).unwrap();
        assert_eq!(Sender::<u8, u8>::alphabet(&sender), vec![3, 1, 2]);
    }

    #[test]
    fn test_sender_logs_generation_and_encoding() {
        let code = binary_code();
        let mut sender = ProbabilisticSender::new(&code, abc_probabilities(), 2..=3, 42).unwrap();
        let mut log = MemoryLogger::new();

        for _ in 0..3 {
            sender.next(&mut log).unwrap();
        }

        let generated: Vec<_> = log.of_kind(EventKind::SourceGenerated).map(|e| e.message_id).collect();
        assert_eq!(generated, vec![0, 1, 2]);
        assert_eq!(log.of_kind(EventKind::Encoded).count(), 3);
    }

    #[test]
    fn test_probabilistic_lengths_in_range() {
        let code = binary_code();
        let mut sender = ProbabilisticSender::new(&code, abc_probabilities(), 2..=5, 7).unwrap();
        let mut log = NullLogger;

        for expected_id in 0..50 {
            let (msg, encoded) = sender.next(&mut log).unwrap();
            assert_eq!(msg.id(), expected_id);
            assert!((2..=5).contains(&msg.len()));
            assert_eq!(code.encode(msg.data()).unwrap(), encoded);
        }
    }

    #[test]
    fn test_deterministic_replay() {
        let code = binary_code();
        let mut a = ProbabilisticSender::new(&code, abc_probabilities(), 1..=8, 123).unwrap();
        let mut b = ProbabilisticSender::new(&code, abc_probabilities(), 1..=8, 123).unwrap();
        let mut log = NullLogger;

        for _ in 0..20 {
            let (ma, ea) = a.next(&mut log).unwrap();
            let (mb, eb) = b.next(&mut log).unwrap();
            assert_eq!(ma, mb);
            assert_eq!(ea, eb);
        }
    }

    #[test]
    fn test_reset_replays_sequence() {
        let code = binary_code();
        let mut sender = ProbabilisticSender::new(&code, abc_probabilities(), 1..=8, 5).unwrap();
        let mut log = NullLogger;

        let first: Vec<_> = (0..5).map(|_| sender.next(&mut log).unwrap().0).collect();
        Sender::<char, char>::reset(&mut sender);
        let second: Vec<_> = (0..5).map(|_| sender.next(&mut log).unwrap().0).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_differ() {
        let code = binary_code();
        let mut a = ProbabilisticSender::new(&code, abc_probabilities(), 5..=10, 1).unwrap();
        let mut b = ProbabilisticSender::new(&code, abc_probabilities(), 5..=10, 2).unwrap();
        let mut log = NullLogger;

        let differs = (0..10).any(|_| a.next(&mut log).unwrap().0.data() != b.next(&mut log).unwrap().0.data());
        assert!(differs);
    }

    #[test]
    fn test_distribution_is_respected() {
        let code = binary_code();
        let probs = vec![('A', 0.9), ('B', 0.1), ('C', 0.0)];
        let mut sender = ProbabilisticSender::new(&code, probs, 1000..=1000, 42).unwrap();

        let (msg, _) = sender.next(&mut NullLogger).unwrap();
        let a_count = msg.data().iter().filter(|&&s| s == 'A').count();
        let c_count = msg.data().iter().filter(|&&s| s == 'C').count();

        assert!(a_count > 800 && a_count < 980, "got {} A's", a_count);
        assert_eq!(c_count, 0);
    }

    #[test]
    fn test_zero_length_messages_allowed() {
        let code = binary_code();
        let mut sender = ProbabilisticSender::new(&code, abc_probabilities(), 0..=0, 1).unwrap();
        let (msg, encoded) = sender.next(&mut NullLogger).unwrap();
        assert!(msg.is_empty());
        assert!(encoded.is_empty());
    }

    #[test]
    fn test_invalid_configurations() {
        let code = binary_code();

        let not_normalised = ProbabilisticSender::new(&code, vec![('A', 0.3), ('B', 0.3)], 1..=2, 0);
        assert!(matches!(not_normalised, Err(Error::InvalidConfiguration(_))));

        let negative = ProbabilisticSender::new(&code, vec![('A', 1.5), ('B', -0.5)], 1..=2, 0);
        assert!(matches!(negative, Err(Error::InvalidConfiguration(_))));

        #[allow(clippy::reversed_empty_ranges)]
        let empty_range = ProbabilisticSender::new(&code, abc_probabilities(), 5..=3, 0);
        assert!(matches!(empty_range, Err(Error::InvalidConfiguration(_))));

        let empty = ProbabilisticSender::new(&code, Vec::new(), 1..=2, 0);
        assert!(matches!(empty, Err(Error::InvalidConfiguration(_))));

        let repeated = ProbabilisticSender::new(&code, vec![('A', 0.5), ('A', 0.5)], 1..=2, 0);
        assert!(matches!(repeated, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_unencodable_distribution_rejected() {
        let code = PrefixCode::new(vec!['A', 'B'], vec!['0', '1'], fixed_length()).unwrap();
        let result = ProbabilisticSender::new(&code, vec![('A', 0.5), ('Q', 0.5)], 1..=2, 0);
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }
}
