//! Step recording
//!
//! The driver reports every attempted transformation twice: when it opens
//! (after the target is known) and when it closes (with the new instance's
//! snapshot or the failure). Recorders are observers only; they cannot
//! influence the outcome.

use crate::error::UnmatchReason;
use crate::successor::SuccessorClass;
use chrono::{DateTime, Utc};
use morph_types::TypeId;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// A transformation is about to be attempted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOpen {
    /// Current type
    pub from: TypeId,
    /// Target type
    pub to: TypeId,
    /// Names of carried fields of the target
    pub carried: Vec<String>,
    /// Names of provided fields of the target
    pub provided: Vec<String>,
}

/// Result of an attempted transformation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// New instance built
    Constructed {
        /// Snapshot of the new instance
        snapshot: serde_json::Value,
    },
    /// Transformation rejected
    Failed {
        /// Failure category
        reason: UnmatchReason,
        /// Rendered error
        message: String,
    },
}

impl StepOutcome {
    /// Whether an instance was built
    #[inline]
    #[must_use]
    pub fn is_constructed(&self) -> bool {
        matches!(self, Self::Constructed { .. })
    }
}

/// A transformation attempt has finished
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepClose {
    /// Current type
    pub from: TypeId,
    /// Target type
    pub to: TypeId,
    /// What happened
    pub outcome: StepOutcome,
    /// Shape of the successor declaration that triggered the step
    pub successor: SuccessorClass,
}

/// Observer of transformation steps
pub trait TransformationRecorder: Send + Sync {
    /// Called before resolving the target's fields
    fn on_step_open(&self, event: &StepOpen);

    /// Called once the attempt succeeded or failed
    fn on_step_close(&self, event: &StepClose);
}

/// Recorder that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl TransformationRecorder for NoopRecorder {
    fn on_step_open(&self, _event: &StepOpen) {}

    fn on_step_close(&self, _event: &StepClose) {}
}

/// Recorder that emits `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl TransformationRecorder for TracingRecorder {
    fn on_step_open(&self, event: &StepOpen) {
        tracing::debug!(
            from = %event.from,
            to = %event.to,
            carried = ?event.carried,
            provided = ?event.provided,
            "step opened"
        );
    }

    fn on_step_close(&self, event: &StepClose) {
        match &event.outcome {
            StepOutcome::Constructed { snapshot } => tracing::debug!(
                from = %event.from,
                to = %event.to,
                successor = %event.successor,
                %snapshot,
                "step constructed"
            ),
            StepOutcome::Failed { reason, message } => tracing::debug!(
                from = %event.from,
                to = %event.to,
                successor = %event.successor,
                %reason,
                error = %message,
                "step failed"
            ),
        }
    }
}

/// Journal errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    /// Hash chain broken at the given entry
    #[error("journal integrity violated at entry {sequence}")]
    IntegrityViolation {
        /// Sequence number of the first bad entry
        sequence: u64,
    },
}

/// Journaled event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEvent {
    /// Step opened
    Open(StepOpen),
    /// Step closed
    Close(StepClose),
}

/// One hash-chained journal entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    /// Position in the journal, starting at zero
    pub sequence: u64,
    /// Wall-clock time of recording
    pub recorded_at: DateTime<Utc>,
    /// Recorded event
    pub event: JournalEvent,
    /// Hash of the previous entry (zeroes for the first)
    #[serde(with = "hex_bytes")]
    pub prev_hash: [u8; 32],
    /// Hash of this entry
    #[serde(with = "hex_bytes")]
    pub hash: [u8; 32],
}

/// Append-only, hash-chained step journal
///
/// Each entry commits to its predecessor's hash, so reordering or editing
/// recorded steps is detected by [`verify_integrity`](Self::verify_integrity).
#[derive(Debug, Default)]
pub struct JournalRecorder {
    inner: Mutex<Vec<JournalEntry>>,
}

impl JournalRecorder {
    /// Create empty journal
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries
    #[must_use]
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.inner.lock().clone()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the journal is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Recompute the hash chain
    ///
    /// # Errors
    /// `JournalError::IntegrityViolation` at the first entry whose link or
    /// content hash does not match
    pub fn verify_integrity(&self) -> Result<(), JournalError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for entry in guard.iter() {
            if entry.prev_hash != prev || entry.hash != compute_hash(entry) {
                return Err(JournalError::IntegrityViolation {
                    sequence: entry.sequence,
                });
            }
            prev = entry.hash;
        }
        Ok(())
    }

    /// Export the journal as a JSON array
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let guard = self.inner.lock();
        serde_json::Value::Array(
            guard
                .iter()
                .filter_map(|e| serde_json::to_value(e).ok())
                .collect(),
        )
    }

    fn append(&self, event: JournalEvent) {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map_or([0u8; 32], |e| e.hash);
        let mut entry = JournalEntry {
            sequence: guard.len() as u64,
            recorded_at: Utc::now(),
            event,
            prev_hash,
            hash: [0u8; 32],
        };
        entry.hash = compute_hash(&entry);
        guard.push(entry);
    }

    #[cfg(test)]
    fn tamper<F: FnOnce(&mut JournalEntry)>(&self, index: usize, f: F) {
        if let Some(entry) = self.inner.lock().get_mut(index) {
            f(entry);
        }
    }
}

impl TransformationRecorder for JournalRecorder {
    fn on_step_open(&self, event: &StepOpen) {
        self.append(JournalEvent::Open(event.clone()));
    }

    fn on_step_close(&self, event: &StepClose) {
        self.append(JournalEvent::Close(event.clone()));
    }
}

fn compute_hash(entry: &JournalEntry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entry.sequence.to_le_bytes());
    hasher.update(entry.recorded_at.timestamp_micros().to_le_bytes());
    match &entry.event {
        JournalEvent::Open(open) => {
            hasher.update(b"open");
            hasher.update(open.from.as_str().as_bytes());
            hasher.update([0]);
            hasher.update(open.to.as_str().as_bytes());
            hasher.update([0]);
            for name in &open.carried {
                hasher.update(name.as_bytes());
                hasher.update([0]);
            }
            hasher.update([1]);
            for name in &open.provided {
                hasher.update(name.as_bytes());
                hasher.update([0]);
            }
        }
        JournalEvent::Close(close) => {
            hasher.update(b"close");
            hasher.update(close.from.as_str().as_bytes());
            hasher.update([0]);
            hasher.update(close.to.as_str().as_bytes());
            hasher.update([0]);
            hasher.update(close.successor.to_string().as_bytes());
            hasher.update([0]);
            match &close.outcome {
                StepOutcome::Constructed { snapshot } => {
                    hasher.update(snapshot.to_string().as_bytes());
                }
                StepOutcome::Failed { reason, message } => {
                    hasher.update(reason.to_string().as_bytes());
                    hasher.update([0]);
                    hasher.update(message.as_bytes());
                }
            }
        }
    }
    hasher.update([0]);
    hasher.update(entry.prev_hash);
    hasher.finalize().into()
}

mod hex_bytes {
    use serde::Serializer;

    pub(super) fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }
}
