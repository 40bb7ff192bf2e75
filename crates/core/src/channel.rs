//! Channels carrying encoded messages from sender to receiver.
//!
//! # Variants
//!
//! - [`NoiselessChannel`]: output equals input, never fails
//! - [`NoisyChannel`]: seeded per-symbol substitution, deletion and insertion,
//!   plus whole-message loss
//!
//! Every transfer is reported to the event log as a `Transmitted` event,
//! including lost ones (`delivered = false`). Transport loss is reported as
//! [`Error::Transport`] and is distinct from a decode failure downstream.
//!
//! # Determinism
//!
//! All randomness comes from a ChaCha8 RNG seeded from [`NoiseConfig::seed`].
//! Given the same seed and inputs, outputs are identical.

use crate::error::{Error, Result};
use crate::logger::{LogEvent, Logger, Payload};
use crate::message::Symbol;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Transports channel-symbol sequences.
pub trait Channel<C> {
    /// Carry one encoded message.
    ///
    /// # Errors
    /// `Transport` if the message was lost entirely.
    fn transmit(&mut self, message_id: u64, encoded: &[C], log: &mut dyn Logger) -> Result<Vec<C>>;
}

fn log_transfer(log: &mut dyn Logger, message_id: u64, input_len: usize, output_len: usize, delivered: bool) {
    log.append(LogEvent::new(
        message_id,
        Payload::Transmitted {
            input_len,
            output_len,
            delivered,
        },
    ));
}

/// Identity channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiselessChannel;

impl NoiselessChannel {
    pub fn new() -> Self {
        NoiselessChannel
    }
}

impl<C: Clone> Channel<C> for NoiselessChannel {
    fn transmit(&mut self, message_id: u64, encoded: &[C], log: &mut dyn Logger) -> Result<Vec<C>> {
        log_transfer(log, message_id, encoded.len(), encoded.len(), true);
        Ok(encoded.to_vec())
    }
}

/// Noise model for [`NoisyChannel`].
///
/// Every rate is a probability in `[0.0, 1.0]`. Symbol-level rates apply
/// independently to each symbol of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseConfig {
    /// Probability a symbol is replaced by a different channel symbol
    pub substitution_rate: f64,

    /// Probability a symbol is dropped
    pub deletion_rate: f64,

    /// Probability a random channel symbol is inserted after a symbol
    pub insertion_rate: f64,

    /// Probability the whole message is lost
    pub loss_rate: f64,

    /// Random seed for determinism
    pub seed: u64,
}

impl NoiseConfig {
    /// No impairments at all.
    pub fn perfect(seed: u64) -> Self {
        Self {
            substitution_rate: 0.0,
            deletion_rate: 0.0,
            insertion_rate: 0.0,
            loss_rate: 0.0,
            seed,
        }
    }

    /// Binary-symmetric-channel style noise: substitutions only.
    pub fn substitution(rate: f64, seed: u64) -> Self {
        Self {
            substitution_rate: rate,
            ..Self::perfect(seed)
        }
    }

    /// Check every rate lies in `[0.0, 1.0]`.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("substitution_rate", self.substitution_rate),
            ("deletion_rate", self.deletion_rate),
            ("insertion_rate", self.insertion_rate),
            ("loss_rate", self.loss_rate),
        ];
        for (name, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::InvalidConfiguration(format!(
                    "{} must be in [0, 1], got {}",
                    name, rate
                )));
            }
        }
        Ok(())
    }

    pub fn is_perfect(&self) -> bool {
        self.substitution_rate == 0.0
            && self.deletion_rate == 0.0
            && self.insertion_rate == 0.0
            && self.loss_rate == 0.0
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self::perfect(0)
    }
}

/// Counters kept by a [`NoisyChannel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Messages handed to the channel
    pub messages_sent: u64,

    /// Messages lost entirely
    pub messages_lost: u64,

    /// Symbols handed to the channel
    pub symbols_in: u64,

    /// Symbols delivered
    pub symbols_out: u64,

    pub substitutions: u64,
    pub deletions: u64,
    pub insertions: u64,
}

impl ChannelStats {
    /// Fraction of messages lost.
    pub fn loss_rate(&self) -> f64 {
        if self.messages_sent == 0 {
            0.0
        } else {
            self.messages_lost as f64 / self.messages_sent as f64
        }
    }

    /// Symbol-level impairments per input symbol.
    pub fn symbol_error_rate(&self) -> f64 {
        if self.symbols_in == 0 {
            0.0
        } else {
            (self.substitutions + self.deletions + self.insertions) as f64 / self.symbols_in as f64
        }
    }
}

/// Channel with seeded symbol noise and message loss.
///
/// Substitutions and insertions draw from the channel alphabet given at
/// construction; a substitution always yields a symbol different from the
/// original.
#[derive(Debug, Clone)]
pub struct NoisyChannel<C> {
    config: NoiseConfig,
    alphabet: Vec<C>,
    rng: ChaCha8Rng,
    stats: ChannelStats,
}

impl<C: Symbol> NoisyChannel<C> {
    /// # Errors
    /// `InvalidConfiguration` if a rate is outside `[0, 1]`, the alphabet is
    /// empty or has repeats, or substitutions are enabled over a
    /// single-symbol alphabet.
    pub fn new(alphabet: Vec<C>, config: NoiseConfig) -> Result<Self> {
        config.validate()?;

        if alphabet.is_empty() {
            return Err(Error::InvalidConfiguration(
                "noisy channel needs a non-empty channel alphabet".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(repeat) = alphabet.iter().find(|c| !seen.insert(*c)) {
            return Err(Error::InvalidConfiguration(format!(
                "channel symbol {:?} appears more than once",
                repeat
            )));
        }
        if config.substitution_rate > 0.0 && alphabet.len() < 2 {
            return Err(Error::InvalidConfiguration(
                "substitution needs at least two channel symbols".to_string(),
            ));
        }

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            alphabet,
            stats: ChannelStats::default(),
        })
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Clear counters and re-seed, so the same inputs see the same noise again.
    pub fn reset(&mut self) {
        self.stats = ChannelStats::default();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
    }

    /// Bernoulli trial. A zero rate never touches the RNG.
    fn hit(&mut self, rate: f64) -> bool {
        rate > 0.0 && self.rng.gen::<f64>() < rate
    }

    fn random_symbol(&mut self) -> C {
        let index = self.rng.gen_range(0..self.alphabet.len());
        self.alphabet[index].clone()
    }

    fn substitute(&mut self, symbol: &C) -> C {
        let others: Vec<&C> = self.alphabet.iter().filter(|c| *c != symbol).collect();
        // `new` guarantees at least one distinct other symbol when substitution is on
        let index = self.rng.gen_range(0..others.len());
        others[index].clone()
    }
}

impl<C: Symbol> Channel<C> for NoisyChannel<C> {
    fn transmit(&mut self, message_id: u64, encoded: &[C], log: &mut dyn Logger) -> Result<Vec<C>> {
        self.stats.messages_sent += 1;
        self.stats.symbols_in += encoded.len() as u64;

        if self.hit(self.config.loss_rate) {
            self.stats.messages_lost += 1;
            tracing::debug!(message_id, len = encoded.len(), "message lost in channel");
            log_transfer(log, message_id, encoded.len(), 0, false);
            return Err(Error::Transport { message_id });
        }

        let mut output = Vec::with_capacity(encoded.len());
        for symbol in encoded {
            if self.hit(self.config.deletion_rate) {
                self.stats.deletions += 1;
                continue;
            }

            if self.hit(self.config.substitution_rate) {
                let replacement = self.substitute(symbol);
                output.push(replacement);
                self.stats.substitutions += 1;
            } else {
                output.push(symbol.clone());
            }

            if self.hit(self.config.insertion_rate) {
                let inserted = self.random_symbol();
                output.push(inserted);
                self.stats.insertions += 1;
            }
        }

        self.stats.symbols_out += output.len() as u64;
        log_transfer(log, message_id, encoded.len(), output.len(), true);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{EventKind, MemoryLogger, NullLogger};

    fn bits() -> Vec<u8> {
        vec![0, 1]
    }

    #[test]
    fn test_noiseless_is_identity() {
        let mut channel = NoiselessChannel::new();
        let mut log = MemoryLogger::new();

        let output = channel.transmit(7, &[1u8, 0, 1], &mut log).unwrap();
        assert_eq!(output, vec![1, 0, 1]);

        let event = &log.events()[0];
        assert_eq!(event.message_id, 7);
        assert_eq!(
            event.payload,
            Payload::Transmitted {
                input_len: 3,
                output_len: 3,
                delivered: true
            }
        );
    }

    #[test]
    fn test_perfect_noisy_channel_is_identity() {
        let mut channel = NoisyChannel::new(bits(), NoiseConfig::perfect(42)).unwrap();
        let input = vec![0u8, 1, 1, 0, 1];

        for id in 0..10 {
            assert_eq!(channel.transmit(id, &input, &mut NullLogger).unwrap(), input);
        }
        assert_eq!(channel.stats().symbols_out, 50);
        assert_eq!(channel.stats().symbol_error_rate(), 0.0);
    }

    #[test]
    fn test_total_loss() {
        let config = NoiseConfig {
            loss_rate: 1.0,
            ..NoiseConfig::perfect(1)
        };
        let mut channel = NoisyChannel::new(bits(), config).unwrap();
        let mut log = MemoryLogger::new();

        let result = channel.transmit(3, &[0, 1], &mut log);
        assert!(matches!(result, Err(Error::Transport { message_id: 3 })));
        assert_eq!(log.of_kind(EventKind::Transmitted).count(), 1);
        assert_eq!(
            log.events()[0].payload,
            Payload::Transmitted {
                input_len: 2,
                output_len: 0,
                delivered: false
            }
        );
        assert_eq!(channel.stats().loss_rate(), 1.0);
    }

    #[test]
    fn test_full_substitution_flips_binary() {
        let mut channel = NoisyChannel::new(bits(), NoiseConfig::substitution(1.0, 9)).unwrap();
        let output = channel.transmit(0, &[0u8, 1, 1, 0], &mut NullLogger).unwrap();

        assert_eq!(output, vec![1, 0, 0, 1]);
        assert_eq!(channel.stats().substitutions, 4);
    }

    #[test]
    fn test_substitution_never_keeps_symbol() {
        let alphabet = vec!['a', 'b', 'c', 'd'];
        let mut channel = NoisyChannel::new(alphabet, NoiseConfig::substitution(1.0, 5)).unwrap();
        let input = vec!['a'; 100];

        let output = channel.transmit(0, &input, &mut NullLogger).unwrap();
        assert_eq!(output.len(), 100);
        assert!(output.iter().all(|&c| c != 'a'));
    }

    #[test]
    fn test_deletion_and_insertion() {
        let deleting = NoiseConfig {
            deletion_rate: 1.0,
            ..NoiseConfig::perfect(0)
        };
        let mut channel = NoisyChannel::new(bits(), deleting).unwrap();
        assert!(channel.transmit(0, &[0, 1, 0], &mut NullLogger).unwrap().is_empty());
        assert_eq!(channel.stats().deletions, 3);

        let inserting = NoiseConfig {
            insertion_rate: 1.0,
            ..NoiseConfig::perfect(0)
        };
        let mut channel = NoisyChannel::new(bits(), inserting).unwrap();
        let output = channel.transmit(0, &[0, 1, 0], &mut NullLogger).unwrap();
        assert_eq!(output.len(), 6);
        assert_eq!(output[0], 0);
        assert_eq!(output[2], 1);
        assert_eq!(output[4], 0);
    }

    #[test]
    fn test_partial_loss() {
        let config = NoiseConfig {
            loss_rate: 0.5,
            ..NoiseConfig::perfect(42)
        };
        let mut channel = NoisyChannel::new(bits(), config).unwrap();

        for id in 0..100 {
            let _ = channel.transmit(id, &[0, 1], &mut NullLogger);
        }

        let stats = channel.stats();
        assert_eq!(stats.messages_sent, 100);
        // Allow 30-70% range due to randomness
        assert!(stats.messages_lost >= 30 && stats.messages_lost <= 70);
    }

    #[test]
    fn test_determinism() {
        let config = NoiseConfig {
            substitution_rate: 0.1,
            deletion_rate: 0.05,
            insertion_rate: 0.05,
            loss_rate: 0.1,
            seed: 12345,
        };
        let mut a = NoisyChannel::new(bits(), config).unwrap();
        let mut b = NoisyChannel::new(bits(), config).unwrap();
        let input: Vec<u8> = (0..64).map(|i| (i % 3 == 0) as u8).collect();

        for id in 0..20 {
            let out_a = a.transmit(id, &input, &mut NullLogger).ok();
            let out_b = b.transmit(id, &input, &mut NullLogger).ok();
            assert_eq!(out_a, out_b);
        }
        assert_eq!(a.stats(), b.stats());
    }

    #[test]
    fn test_reset_replays_noise() {
        let mut channel = NoisyChannel::new(bits(), NoiseConfig::substitution(0.3, 77)).unwrap();
        let input = vec![0u8; 32];

        let first = channel.transmit(0, &input, &mut NullLogger).unwrap();
        channel.reset();
        assert_eq!(channel.stats(), ChannelStats::default());
        let second = channel.transmit(0, &input, &mut NullLogger).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_configs() {
        let bad_rate = NoiseConfig {
            deletion_rate: 1.5,
            ..NoiseConfig::perfect(0)
        };
        assert!(matches!(
            NoisyChannel::new(bits(), bad_rate),
            Err(Error::InvalidConfiguration(_))
        ));

        let nan = NoiseConfig {
            loss_rate: f64::NAN,
            ..NoiseConfig::perfect(0)
        };
        assert!(nan.validate().is_err());

        assert!(matches!(
            NoisyChannel::<u8>::new(vec![], NoiseConfig::perfect(0)),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            NoisyChannel::new(vec![0u8], NoiseConfig::substitution(0.1, 0)),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_repeated_alphabet_symbols_rejected() {
        assert!(matches!(
            NoisyChannel::new(vec![0u8, 0u8], NoiseConfig::substitution(1.0, 0)),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            NoisyChannel::new(vec![0u8, 1, 0], NoiseConfig::perfect(0)),
            Err(Error::InvalidConfiguration(_))
        ));

        // Full substitution over distinct symbols always flips
        let mut channel = NoisyChannel::new(bits(), NoiseConfig::substitution(1.0, 0)).unwrap();
        let output = channel.transmit(0, &[0u8, 1, 0], &mut NullLogger).unwrap();
        assert_eq!(output, vec![1, 0, 1]);
    }
}
