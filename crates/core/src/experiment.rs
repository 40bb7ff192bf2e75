//! Experiment runner: drives messages through sender, channel and receiver.
//!
//! One `run` executes `num_messages` cycles strictly in sequence. A cycle
//! that fails to decode or is lost in the channel is counted and logged, and
//! the run continues. Only configuration problems (including a sender whose
//! code rejects its own message) end a run early.

use crate::channel::Channel;
use crate::code::Decoder;
use crate::error::{Error, Result};
use crate::logger::{LogEvent, Logger, Payload};
use crate::message::Symbol;
use crate::receiver::{Outcome, Receiver, TrackingReceiver};
use crate::sender::Sender;
use crate::stats::TransmissionStats;
use std::any::type_name;
use std::fmt;
use std::time::{Duration, Instant};

/// Type names of the parts an experiment was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    pub sender: &'static str,
    pub channel: &'static str,
    pub decoder: &'static str,
}

/// Outcome of one [`ExperimentRunner::run`]. Immutable.
#[derive(Debug, Clone)]
pub struct ExperimentResult {
    stats: TransmissionStats,
    num_messages: usize,
    duration: Duration,
    components: Components,
}

impl ExperimentResult {
    pub fn stats(&self) -> &TransmissionStats {
        &self.stats
    }

    pub fn num_messages(&self) -> usize {
        self.num_messages
    }

    /// Wall-clock time of the whole run.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    /// Human-readable report.
    pub fn summary(&self) -> String {
        format!(
            "=== Experiment Summary ===\n\
             Sender: {}\n\
             Channel: {}\n\
             Decoder: {}\n\
             Messages requested: {}\n\
             Duration: {} ms\n\
             \n\
             {}\n",
            self.components.sender,
            self.components.channel,
            self.components.decoder,
            self.num_messages,
            self.duration.as_millis(),
            self.stats,
        )
    }
}

impl fmt::Display for ExperimentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Owns one sender, one channel, one tracking receiver and the event log.
#[derive(Debug)]
pub struct ExperimentRunner<S, Sn, Ch, D, L> {
    sender: Sn,
    channel: Ch,
    receiver: TrackingReceiver<S, D>,
    logger: L,
}

impl<S, Sn, Ch, D, L> ExperimentRunner<S, Sn, Ch, D, L> {
    pub fn new(sender: Sn, channel: Ch, receiver: TrackingReceiver<S, D>, logger: L) -> Self {
        Self {
            sender,
            channel,
            receiver,
            logger,
        }
    }

    pub fn sender(&self) -> &Sn {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut Sn {
        &mut self.sender
    }

    pub fn channel(&self) -> &Ch {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Ch {
        &mut self.channel
    }

    pub fn receiver(&self) -> &TrackingReceiver<S, D> {
        &self.receiver
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut L {
        &mut self.logger
    }

    /// Take the event log out, dropping the rest.
    pub fn into_logger(self) -> L {
        self.logger
    }

    fn components() -> Components {
        Components {
            sender: type_name::<Sn>(),
            channel: type_name::<Ch>(),
            decoder: type_name::<D>(),
        }
    }

    /// Run `num_messages` pipeline cycles.
    ///
    /// Statistics are reset first, so the result covers this run only.
    ///
    /// # Errors
    /// - `InvalidConfiguration` if `num_messages` is zero
    /// - `Encoding` if the sender cannot encode a message it produced
    pub fn run<C>(&mut self, num_messages: usize) -> Result<ExperimentResult>
    where
        S: Symbol,
        Sn: Sender<S, C>,
        Ch: Channel<C>,
        D: Decoder<S, C>,
        L: Logger,
    {
        if num_messages == 0 {
            return Err(Error::InvalidConfiguration(
                "number of messages must be positive".to_string(),
            ));
        }

        self.receiver.reset_stats();
        tracing::info!(num_messages, "starting experiment");
        let start = Instant::now();

        for _ in 0..num_messages {
            let (sent, encoded) = self.sender.next(&mut self.logger)?;
            let id = sent.id();

            let output = match self.channel.transmit(id, &encoded, &mut self.logger) {
                Ok(output) => output,
                Err(e) if e.is_per_message() => {
                    self.logger.append(LogEvent::new(
                        id,
                        Payload::Failed {
                            error_kind: e.kind(),
                            reason: e.to_string(),
                        },
                    ));
                    self.receiver.record_lost(id);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let outcome: Outcome<S> = self.receiver.receive(id, &output, &mut self.logger);
            if let Outcome::Decoded(received) = &outcome {
                if received.data() != sent.data() {
                    self.receiver.record_corrupted(id);
                }
            }

            tracing::trace!(
                message_id = id,
                source_len = sent.len(),
                channel_len = encoded.len(),
                success = outcome.is_success(),
                "cycle complete"
            );
        }

        let duration = start.elapsed();
        let stats = self.receiver.get_stats();

        tracing::info!(
            total = stats.total_messages,
            successful = stats.successful_messages,
            failed = stats.failed_messages,
            elapsed_ms = duration.as_millis() as u64,
            "experiment finished"
        );

        Ok(ExperimentResult {
            stats,
            num_messages,
            duration,
            components: Self::components(),
        })
    }
}
