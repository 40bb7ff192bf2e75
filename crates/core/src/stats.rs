//! Transmission statistics.
//!
//! Counters are updated once per message by a tracking receiver; derived
//! values (average code length, compression ratio, success rate) are computed
//! on demand and are 0.0 while nothing has been recorded.
//!
//! # Compression ratio
//!
//! `compression_ratio = average_code_len / baseline_len`, where the baseline
//! is the codeword length of a fixed-length code over the same alphabets
//! (see [`fixed_length_baseline`](crate::code::fixed_length_baseline)).
//! Values below 1 mean the code beats the fixed-length code.

use std::fmt;
use std::time::Duration;

/// Running totals for one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionStats {
    /// Messages that reached the receiver or were lost on the way
    pub total_messages: u64,

    /// Messages that decoded
    pub successful_messages: u64,

    /// Messages that did not decode, including lost ones
    pub failed_messages: u64,

    /// Decode failures
    pub decode_errors: u64,

    /// Messages dropped by the channel
    pub lost_messages: u64,

    /// Messages that decoded to something other than what was sent
    pub corrupted_messages: u64,

    /// Source symbols across successful messages
    pub total_source_symbols: u64,

    /// Channel symbols across successful messages
    pub total_channel_symbols: u64,

    /// Time spent decoding, all messages
    pub total_processing_time: Duration,

    /// Fixed-length codeword length used as the compression reference
    pub baseline_len: f64,
}

impl TransmissionStats {
    pub fn new() -> Self {
        Self::with_baseline(1.0)
    }

    /// Empty stats measured against a fixed-length code of `baseline_len`.
    pub fn with_baseline(baseline_len: f64) -> Self {
        Self {
            total_messages: 0,
            successful_messages: 0,
            failed_messages: 0,
            decode_errors: 0,
            lost_messages: 0,
            corrupted_messages: 0,
            total_source_symbols: 0,
            total_channel_symbols: 0,
            total_processing_time: Duration::ZERO,
            baseline_len,
        }
    }

    /// Record a decoded message.
    pub fn record_success(&mut self, source_len: usize, channel_len: usize, elapsed: Duration) {
        self.total_messages += 1;
        self.successful_messages += 1;
        self.total_source_symbols += source_len as u64;
        self.total_channel_symbols += channel_len as u64;
        self.total_processing_time += elapsed;
    }

    /// Record a message that failed to decode.
    pub fn record_decode_error(&mut self, elapsed: Duration) {
        self.total_messages += 1;
        self.failed_messages += 1;
        self.decode_errors += 1;
        self.total_processing_time += elapsed;
    }

    /// Record a message the channel never delivered.
    pub fn record_lost(&mut self) {
        self.total_messages += 1;
        self.failed_messages += 1;
        self.lost_messages += 1;
    }

    /// Mark an already recorded successful message as corrupted.
    pub fn record_corrupted(&mut self) {
        self.corrupted_messages += 1;
    }

    /// Average channel symbols per source symbol.
    pub fn average_code_len(&self) -> f64 {
        if self.total_source_symbols == 0 {
            0.0
        } else {
            self.total_channel_symbols as f64 / self.total_source_symbols as f64
        }
    }

    /// Average code length relative to the fixed-length baseline.
    pub fn compression_ratio(&self) -> f64 {
        if self.baseline_len <= 0.0 {
            0.0
        } else {
            self.average_code_len() / self.baseline_len
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_messages == 0 {
            0.0
        } else {
            self.successful_messages as f64 / self.total_messages as f64
        }
    }

    /// Mean decode time per message.
    pub fn avg_message_time(&self) -> Duration {
        match u32::try_from(self.total_messages) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_processing_time / n,
            Err(_) => Duration::from_secs_f64(
                self.total_processing_time.as_secs_f64() / self.total_messages as f64,
            ),
        }
    }

    /// Add another run's counters to these. The baseline is kept.
    pub fn merge(&mut self, other: &TransmissionStats) {
        self.total_messages += other.total_messages;
        self.successful_messages += other.successful_messages;
        self.failed_messages += other.failed_messages;
        self.decode_errors += other.decode_errors;
        self.lost_messages += other.lost_messages;
        self.corrupted_messages += other.corrupted_messages;
        self.total_source_symbols += other.total_source_symbols;
        self.total_channel_symbols += other.total_channel_symbols;
        self.total_processing_time += other.total_processing_time;
    }

    /// Zero every counter, keeping the baseline.
    pub fn reset(&mut self) {
        *self = Self::with_baseline(self.baseline_len);
    }

    /// Export as `key=value` lines, for parsing and tests.
    pub fn export_text(&self) -> String {
        format!(
            "total_messages={}\n\
             successful_messages={}\n\
             failed_messages={}\n\
             decode_errors={}\n\
             lost_messages={}\n\
             corrupted_messages={}\n\
             total_source_symbols={}\n\
             total_channel_symbols={}\n\
             average_code_len={:.4}\n\
             compression_ratio={:.4}\n\
             success_rate={:.4}\n\
             avg_message_time_us={}\n",
            self.total_messages,
            self.successful_messages,
            self.failed_messages,
            self.decode_errors,
            self.lost_messages,
            self.corrupted_messages,
            self.total_source_symbols,
            self.total_channel_symbols,
            self.average_code_len(),
            self.compression_ratio(),
            self.success_rate(),
            self.avg_message_time().as_micros(),
        )
    }
}

impl Default for TransmissionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransmissionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Messages: {} total", self.total_messages)?;
        writeln!(
            f,
            "  successful: {} ({:.2}%)",
            self.successful_messages,
            self.success_rate() * 100.0
        )?;
        writeln!(
            f,
            "  failed: {} ({} decode errors, {} lost)",
            self.failed_messages, self.decode_errors, self.lost_messages
        )?;
        writeln!(f, "  corrupted: {}", self.corrupted_messages)?;
        writeln!(
            f,
            "Symbols: {} source -> {} channel",
            self.total_source_symbols, self.total_channel_symbols
        )?;
        writeln!(f, "Average code length: {:.4}", self.average_code_len())?;
        writeln!(
            f,
            "Compression ratio: {:.4} (baseline {:.0})",
            self.compression_ratio(),
            self.baseline_len
        )?;
        write!(f, "Avg decode time: {:?}", self.avg_message_time())
    }
}
