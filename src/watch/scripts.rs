//! Script-directory loop.
//!
//! Owns the [`Session`] for as long as it runs and hands it back when
//! cancelled, so the orchestrator knows no update is in flight before it
//! drops the document.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::debouncer::Debouncer;
use super::types::{ChangeKind, is_temp_file};
use crate::core::{Phase, set_phase};
use crate::debug;
use crate::logger::{status_detach, status_error, status_success, status_unchanged};
use crate::session::{RebuildRequirement, Session};
use crate::utils::path::normalize_path;

pub async fn run_scripts(
    mut session: Session,
    mut events: mpsc::Receiver<notify::Event>,
    delay: Duration,
    cancel: CancellationToken,
) -> Session {
    let (fired_tx, mut fired_rx) = mpsc::unbounded_channel();
    let mut debouncer = Debouncer::new(delay, fired_tx);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(event) = events.recv() => schedule_event(&session, &mut debouncer, &event),
            Some((path, generation)) = fired_rx.recv() => {
                if debouncer.fire(&path, generation) {
                    handle_script(&mut session, &path);
                }
            }
        }
    }

    debouncer.abort_all();
    debug!("watch"; "script loop stopped");
    session
}

fn schedule_event(session: &Session, debouncer: &mut Debouncer, event: &notify::Event) {
    let Some(kind) = ChangeKind::of(&event.kind) else {
        return;
    };

    for path in &event.paths {
        if is_temp_file(path) {
            continue;
        }
        if !session.is_script(path) {
            debug!("watch"; "ignoring {}", path.display());
            continue;
        }
        debug!("watch"; "event {}: {}", kind.label(), path.display());
        debouncer.schedule(normalize_path(path));
    }
}

/// Apply one settled script file and write whatever it requires.
///
/// Errors are reported and swallowed: one bad script never stops the loop.
fn handle_script(session: &mut Session, path: &Path) {
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    set_phase(Phase::Patching);
    let result = session.apply_script_path(path).and_then(|requirement| {
        if requirement.needs_write() {
            set_phase(Phase::Rebuilding);
            session.write()?;
        }
        Ok(requirement)
    });

    match result {
        Ok(RebuildRequirement::None) => status_unchanged(&format!("{name} unchanged")),
        Ok(RebuildRequirement::QuickPatched(count)) => {
            status_success(&format!("patched {name} ({count} nodes)"));
        }
        Ok(RebuildRequirement::FullRebuildNeeded) => {
            status_detach();
            session.report();
            status_success(&format!("rebuilt {}", session.artifact().path().display()));
        }
        Err(e) => status_error(&format!("failed: {name}"), &format!("{:#}", anyhow::Error::new(e))),
    }
    set_phase(Phase::Watching);
}
