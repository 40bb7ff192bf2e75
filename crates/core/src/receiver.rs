//! Receivers: decode channel output and classify each message.
//!
//! Each message ends in exactly one terminal outcome, either decoded or
//! failed. Decode errors never escape a receiver; they are logged and
//! returned as [`Outcome::DecodeFailed`].
//!
//! [`TrackingReceiver`] also folds every outcome into its own
//! [`TransmissionStats`]. Counters for one message are updated together, so
//! a snapshot never shows a half-recorded message.

use crate::code::Decoder;
use crate::error::Error;
use crate::logger::{LogEvent, Logger, Payload};
use crate::message::{Message, Symbol};
use crate::stats::TransmissionStats;
use std::time::{Duration, Instant};

/// Terminal state of one message at the receiver.
#[derive(Debug)]
pub enum Outcome<S> {
    /// Decoding succeeded
    Decoded(Message<S>),
    /// Decoding failed; the error is the per-message failure
    DecodeFailed { message_id: u64, error: Error },
}

impl<S> Outcome<S> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Decoded(_))
    }

    pub fn message_id(&self) -> u64 {
        match self {
            Outcome::Decoded(message) => message.id(),
            Outcome::DecodeFailed { message_id, .. } => *message_id,
        }
    }

    /// The decoded message, if any.
    pub fn message(&self) -> Option<&Message<S>> {
        match self {
            Outcome::Decoded(message) => Some(message),
            Outcome::DecodeFailed { .. } => None,
        }
    }
}

/// Accepts channel output for one message.
pub trait Receiver<S, C> {
    fn receive(&mut self, message_id: u64, channel_output: &[C], log: &mut dyn Logger) -> Outcome<S>;
}

/// Decodes and logs; keeps no statistics.
#[derive(Debug, Clone)]
pub struct BaseReceiver<D> {
    decoder: D,
}

impl<D> BaseReceiver<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Decode one message, returning its outcome and the time spent decoding.
    fn process<S, C>(&self, message_id: u64, channel_output: &[C], log: &mut dyn Logger) -> (Outcome<S>, Duration)
    where
        S: Symbol,
        D: Decoder<S, C>,
    {
        log.append(LogEvent::new(
            message_id,
            Payload::Received {
                channel_len: channel_output.len(),
            },
        ));

        let start = Instant::now();
        let decoded = self.decoder.decode(channel_output);
        let elapsed = start.elapsed();

        let outcome = match decoded {
            Ok(data) => {
                log.append(LogEvent::new(
                    message_id,
                    Payload::Decoded {
                        channel_len: channel_output.len(),
                        source_len: data.len(),
                    },
                ));
                Outcome::Decoded(Message::new(message_id, data))
            }
            Err(error) => {
                tracing::debug!(message_id, error = %error, "decode failed");
                log.append(LogEvent::new(
                    message_id,
                    Payload::Failed {
                        error_kind: error.kind(),
                        reason: error.to_string(),
                    },
                ));
                Outcome::DecodeFailed { message_id, error }
            }
        };

        (outcome, elapsed)
    }
}

impl<S, C, D> Receiver<S, C> for BaseReceiver<D>
where
    S: Symbol,
    D: Decoder<S, C>,
{
    fn receive(&mut self, message_id: u64, channel_output: &[C], log: &mut dyn Logger) -> Outcome<S> {
        self.process(message_id, channel_output, log).0
    }
}

/// Receiver that accumulates [`TransmissionStats`].
#[derive(Debug, Clone)]
pub struct TrackingReceiver<S, D> {
    inner: BaseReceiver<D>,
    stats: TransmissionStats,
    last: Option<Message<S>>,
}

impl<S, D> TrackingReceiver<S, D> {
    /// Tracking receiver with a baseline of one channel symbol per source symbol.
    pub fn new(decoder: D) -> Self {
        Self::with_baseline(decoder, 1)
    }

    /// Tracking receiver whose compression ratio is measured against a
    /// fixed-length code of `baseline_len` channel symbols per source symbol.
    pub fn with_baseline(decoder: D, baseline_len: usize) -> Self {
        Self {
            inner: BaseReceiver::new(decoder),
            stats: TransmissionStats::with_baseline(baseline_len as f64),
            last: None,
        }
    }

    pub fn decoder(&self) -> &D {
        self.inner.decoder()
    }

    /// Point-in-time snapshot of the statistics.
    pub fn get_stats(&self) -> TransmissionStats {
        self.stats.clone()
    }

    pub fn stats(&self) -> &TransmissionStats {
        &self.stats
    }

    /// Clear the statistics and forget the last decoded message.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
        self.last = None;
    }

    /// The most recently decoded message, corrupted or not.
    pub fn last_message(&self) -> Option<&Message<S>> {
        self.last.as_ref()
    }

    /// Count a message the channel never delivered.
    pub fn record_lost(&mut self, message_id: u64) {
        tracing::debug!(message_id, "recording lost message");
        self.stats.record_lost();
    }

    /// Mark a decoded message as differing from what was sent.
    pub fn record_corrupted(&mut self, message_id: u64) {
        tracing::debug!(message_id, "recording corrupted message");
        self.stats.record_corrupted();
    }
}

impl<S, C, D> Receiver<S, C> for TrackingReceiver<S, D>
where
    S: Symbol,
    D: Decoder<S, C>,
{
    fn receive(&mut self, message_id: u64, channel_output: &[C], log: &mut dyn Logger) -> Outcome<S> {
        let (outcome, elapsed) = self.inner.process(message_id, channel_output, log);

        match &outcome {
            Outcome::Decoded(message) => {
                self.stats
                    .record_success(message.len(), channel_output.len(), elapsed);
                self.last = Some(message.clone());
            }
            Outcome::DecodeFailed { .. } => self.stats.record_decode_error(elapsed),
        }

        outcome
    }
}
