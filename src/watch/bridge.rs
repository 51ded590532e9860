//! notify (sync callback) → tokio channel.

use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A live watcher and the async stream of its events.
///
/// Events stop when this is dropped: the watcher goes away, the bridge
/// thread sees its sender close and exits.
pub struct FsWatcher {
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
    pub events: mpsc::Receiver<notify::Event>,
}

impl FsWatcher {
    pub fn new(path: &Path, mode: RecursiveMode) -> notify::Result<Self> {
        // notify does not support async
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        watcher.watch(path, mode)?;

        let (async_tx, events) = mpsc::channel::<notify::Event>(64);
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            events,
        })
    }
}
