//! Active run registry: which document has a lint run in flight.
//!
//! Each document gets a run slot: a gate that serialises its runs and a flag
//! that allows at most one request to queue behind the run in flight. A
//! request arriving while another is already queued is folded into the
//! queued one, which will lint the latest saved contents anyway.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::DocumentId;

/// Identifies one run; a progress task holding a stale ticket stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    generation: u64,
    started_at: Instant,
}

impl RunTicket {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn started_at(self) -> Instant {
        self.started_at
    }
}

#[derive(Debug, Default)]
struct RunSlot {
    gate: Arc<AsyncMutex<()>>,
    queued: bool,
    current: Option<RunTicket>,
}

#[derive(Debug, Default)]
pub struct ActiveRuns {
    next_generation: AtomicU64,
    slots: Mutex<HashMap<DocumentId, RunSlot>>,
}

impl ActiveRuns {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<DocumentId, RunSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for the document's slot and register a new run in it.
    ///
    /// Returns `None` when another request is already queued for the
    /// document; the caller should drop its request.
    pub async fn acquire(self: &Arc<Self>, document: DocumentId) -> Option<ActiveRun> {
        let gate = {
            let mut slots = self.slots();
            let slot = slots.entry(document).or_default();
            if slot.queued {
                return None;
            }
            slot.queued = true;
            slot.gate.clone()
        };

        // Clears `queued` even if this future is dropped while waiting.
        let queued = QueuedMark {
            runs: self,
            document,
        };
        let guard = gate.lock_owned().await;

        let ticket = RunTicket {
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            started_at: Instant::now(),
        };
        self.slots().entry(document).or_default().current = Some(ticket);
        drop(queued);

        Some(ActiveRun {
            runs: Arc::clone(self),
            document,
            ticket,
            _guard: guard,
        })
    }

    /// Whether `ticket` is the run currently registered for `document`.
    #[must_use]
    pub fn is_current(&self, document: DocumentId, ticket: RunTicket) -> bool {
        self.slots()
            .get(&document)
            .and_then(|slot| slot.current)
            .is_some_and(|current| current == ticket)
    }

    #[must_use]
    pub fn is_running(&self, document: DocumentId) -> bool {
        self.slots()
            .get(&document)
            .is_some_and(|slot| slot.current.is_some())
    }

    fn finish(&self, document: DocumentId, ticket: RunTicket) {
        let mut slots = self.slots();
        if let Some(slot) = slots.get_mut(&document)
            && slot.current == Some(ticket)
        {
            slot.current = None;
        }
        remove_if_idle(&mut slots, document);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots().len()
    }
}

/// Drop a slot nobody is running in or waiting on.
fn remove_if_idle(slots: &mut HashMap<DocumentId, RunSlot>, document: DocumentId) {
    if slots
        .get(&document)
        .is_some_and(|slot| !slot.queued && slot.current.is_none())
    {
        slots.remove(&document);
    }
}

struct QueuedMark<'a> {
    runs: &'a ActiveRuns,
    document: DocumentId,
}

impl Drop for QueuedMark<'_> {
    fn drop(&mut self) {
        let mut slots = self.runs.slots();
        if let Some(slot) = slots.get_mut(&self.document) {
            slot.queued = false;
        }
        remove_if_idle(&mut slots, self.document);
    }
}

/// Registration of one in-flight run. Dropping it clears the registration
/// and lets the next queued request through.
#[derive(Debug)]
pub struct ActiveRun {
    runs: Arc<ActiveRuns>,
    document: DocumentId,
    ticket: RunTicket,
    _guard: OwnedMutexGuard<()>,
}

impl ActiveRun {
    #[must_use]
    pub fn ticket(&self) -> RunTicket {
        self.ticket
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.runs.finish(self.document, self.ticket);
    }
}
