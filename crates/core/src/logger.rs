//! Pipeline event log.
//!
//! Every stage appends a [`LogEvent`] to a [`Logger`] sink as a message moves
//! through it. Sinks are append-only from the pipeline's point of view: the
//! pipeline never reads events back during a run.
//!
//! This is experiment data, separate from diagnostic logging. Diagnostics go
//! through `tracing`; [`ConsoleLogger`] bridges the two by rendering events
//! as `tracing` records.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Stage of the pipeline an event was recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    SourceGenerated,
    Encoded,
    Transmitted,
    Received,
    Decoded,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SourceGenerated => "source_generated",
            EventKind::Encoded => "encoded",
            EventKind::Transmitted => "transmitted",
            EventKind::Received => "received",
            EventKind::Decoded => "decoded",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A sender produced a source message
    Generated { source_len: usize },
    /// A sender encoded its message
    Encoded { source_len: usize, channel_len: usize },
    /// A channel finished a transfer, successful or not
    Transmitted {
        input_len: usize,
        output_len: usize,
        delivered: bool,
    },
    /// A receiver accepted channel output
    Received { channel_len: usize },
    /// A receiver decoded a message
    Decoded { channel_len: usize, source_len: usize },
    /// A stage failed for this message
    Failed { error_kind: &'static str, reason: String },
}

impl Payload {
    pub fn kind(&self) -> EventKind {
        match self {
            Payload::Generated { .. } => EventKind::SourceGenerated,
            Payload::Encoded { .. } => EventKind::Encoded,
            Payload::Transmitted { .. } => EventKind::Transmitted,
            Payload::Received { .. } => EventKind::Received,
            Payload::Decoded { .. } => EventKind::Decoded,
            Payload::Failed { .. } => EventKind::Error,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Generated { source_len } => write!(f, "source_len={}", source_len),
            Payload::Encoded {
                source_len,
                channel_len,
            }
            | Payload::Decoded {
                channel_len,
                source_len,
            } => write!(f, "source_len={} channel_len={}", source_len, channel_len),
            Payload::Transmitted {
                input_len,
                output_len,
                delivered,
            } => write!(
                f,
                "input_len={} output_len={} delivered={}",
                input_len, output_len, delivered
            ),
            Payload::Received { channel_len } => write!(f, "channel_len={}", channel_len),
            Payload::Failed { error_kind, reason } => write!(f, "{}: {}", error_kind, reason),
        }
    }
}

/// One entry in the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: SystemTime,
    pub kind: EventKind,
    pub message_id: u64,
    pub payload: Payload,
}

impl LogEvent {
    /// Create an event stamped with the current time; the kind follows the payload.
    pub fn new(message_id: u64, payload: Payload) -> Self {
        Self {
            timestamp: SystemTime::now(),
            kind: payload.kind(),
            message_id,
            payload,
        }
    }
}

/// Append-only event sink.
pub trait Logger {
    fn append(&mut self, event: LogEvent);
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn append(&mut self, event: LogEvent) {
        (**self).append(event)
    }
}

impl<L: Logger + ?Sized> Logger for Box<L> {
    fn append(&mut self, event: LogEvent) {
        (**self).append(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn append(&mut self, _event: LogEvent) {}
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    events: Vec<LogEvent>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    /// Events of one kind, in arrival order.
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &LogEvent> + '_ {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Logger for MemoryLogger {
    fn append(&mut self, event: LogEvent) {
        self.events.push(event);
    }
}

/// Renders events through `tracing` at INFO level.
///
/// In terse mode only the kind and message id are emitted.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLogger {
    verbose: bool,
}

impl ConsoleLogger {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Logger for ConsoleLogger {
    fn append(&mut self, event: LogEvent) {
        if self.verbose {
            tracing::info!(
                target: "codinglab::events",
                kind = %event.kind,
                message_id = event.message_id,
                payload = %event.payload,
                "pipeline event"
            );
        } else {
            tracing::info!(
                target: "codinglab::events",
                kind = %event.kind,
                message_id = event.message_id,
                "pipeline event"
            );
        }
    }
}

/// One row of a [`TableLogger`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub timestamp: SystemTime,
    pub kind: EventKind,
    pub detail: String,
}

/// Groups events into rows per message id, for tabular inspection.
#[derive(Debug, Clone, Default)]
pub struct TableLogger {
    rows: BTreeMap<u64, Vec<EventRow>>,
    total: usize,
}

impl TableLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows recorded for one message, in arrival order.
    pub fn rows_for(&self, message_id: u64) -> &[EventRow] {
        self.rows
            .get(&message_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Kinds recorded for one message, in arrival order.
    pub fn kinds_for(&self, message_id: u64) -> Vec<EventKind> {
        self.rows_for(message_id).iter().map(|r| r.kind).collect()
    }

    /// Message ids that have at least one row, ascending.
    pub fn message_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.rows.keys().copied()
    }

    /// Number of messages with at least one row of the given kind.
    pub fn count_messages_with(&self, kind: EventKind) -> usize {
        self.rows
            .values()
            .filter(|rows| rows.iter().any(|r| r.kind == kind))
            .count()
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl Logger for TableLogger {
    fn append(&mut self, event: LogEvent) {
        self.rows.entry(event.message_id).or_default().push(EventRow {
            timestamp: event.timestamp,
            kind: event.kind,
            detail: event.payload.to_string(),
        });
        self.total += 1;
    }
}
