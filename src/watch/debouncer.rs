use std::path::{Path, PathBuf};
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A timer that fired: the path and the generation it was scheduled with.
pub(super) type Fired = (PathBuf, u64);

/// Per-path quiescence timers.
///
/// Each event (re)starts a timer for its path; a timer that runs out sends
/// the path back to the owning loop. Nothing here touches the session, so
/// all mutation stays on the task that owns it.
pub(super) struct Debouncer {
    delay: Duration,
    fired_tx: mpsc::UnboundedSender<Fired>,
    /// Path → (generation, timer)
    pub(super) pending: FxHashMap<PathBuf, (u64, JoinHandle<()>)>,
    next_generation: u64,
}

impl Debouncer {
    pub(super) fn new(delay: Duration, fired_tx: mpsc::UnboundedSender<Fired>) -> Self {
        Self {
            delay,
            fired_tx,
            pending: FxHashMap::default(),
            next_generation: 0,
        }
    }

    /// Start or restart the timer for `path`.
    pub(super) fn schedule(&mut self, path: PathBuf) {
        let generation = self.next_generation;
        self.next_generation += 1;

        let tx = self.fired_tx.clone();
        let delay = self.delay;
        let fired_path = path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send((fired_path, generation));
        });

        if let Some((_, previous)) = self.pending.insert(path, (generation, handle)) {
            previous.abort();
        }
    }

    /// Accept a fired timer. `false` for one that was superseded after it
    /// had already sent.
    pub(super) fn fire(&mut self, path: &Path, generation: u64) -> bool {
        match self.pending.get(path) {
            Some((current, _)) if *current == generation => {
                self.pending.remove(path);
                true
            }
            _ => false,
        }
    }

    pub(super) fn abort_all(&mut self) {
        for (_, (_, handle)) in self.pending.drain() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.abort_all();
    }
}
