//! Non-fatal parse diagnostics.
//!
//! Decoders report irregularities (clamped lengths, inconsistent headers, failed decoders) into an
//! [`AnomalySink`]. Recording never fails and never stops the dissection.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::range::ByteRange;

/// One diagnostic for a byte range of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub frame_number: u64,
    pub range: ByteRange,
    pub message: String,
}

/// Append-only collection of [`Anomaly`] entries, safe to share between threads.
#[derive(Debug, Default)]
pub struct AnomalySink {
    entries: Mutex<Vec<Anomaly>>,
}

impl AnomalySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Anomaly>> {
        // A panicking decoder must not make the sink unusable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record<S: Into<String>>(&self, frame_number: u64, range: ByteRange, message: S) {
        let message = message.into();
        log::warn!(
            "frame {}: [{}..={}]: {}",
            frame_number,
            range.start(),
            range.end(),
            message
        );
        self.lock().push(Anomaly {
            frame_number,
            range,
            message,
        });
    }

    /// Appends entries collected elsewhere, e.g. a frame's entries into a capture-wide sink.
    pub fn extend<I: IntoIterator<Item = Anomaly>>(&self, entries: I) {
        self.lock().extend(entries);
    }

    /// A snapshot of the entries recorded so far.
    pub fn entries(&self) -> Vec<Anomaly> {
        self.lock().clone()
    }

    pub fn drain(&self) -> Vec<Anomaly> {
        core::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
