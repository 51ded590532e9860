//! Watch orchestrator.
//!
//! ```text
//! scripts dir ──notify──► Debouncer ──fired──► script loop (owns Session)
//! project dir ──notify──► wait_for_change ──► cancel ──► await Session ──► Restart
//! Ctrl+C ───────────────────────────────────► cancel ──► await Session ──► Shutdown
//! ```
//!
//! The orchestrator never touches the session while the script loop runs;
//! awaiting the loop's return is the barrier before a restart.

mod bridge;
mod debouncer;
mod project;
mod scripts;
mod types;


use anyhow::{Context, Result};
use notify::RecursiveMode;
use tokio_util::sync::CancellationToken;

use crate::config::InjectConfig;
use crate::core::{Phase, set_phase};
use crate::session::Session;
use crate::{debug, log};
use bridge::FsWatcher;

/// Why watching stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The project file changed: reload it from scratch.
    Restart,
    /// Shutdown was requested.
    Shutdown,
}

pub async fn watch(
    session: Session,
    config: &InjectConfig,
    shutdown: &CancellationToken,
) -> Result<Exit> {
    let project = session.project().to_path_buf();
    let project_dir = project
        .parent()
        .map(std::path::Path::to_path_buf)
        .context("project file has no parent directory")?;

    // Watchers first, so nothing written after the initial pass is missed
    let scripts_watcher = FsWatcher::new(session.scripts_dir(), RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", session.scripts_dir().display()))?;
    let mut project_watcher = FsWatcher::new(&project_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", project_dir.display()))?;

    log!(
        "watch";
        "watching {} and {}",
        session.scripts_dir().display(),
        project.display()
    );
    set_phase(Phase::Watching);

    let cancel = shutdown.child_token();
    let script_loop = tokio::spawn(scripts::run_scripts(
        session,
        scripts_watcher.events,
        config.watch.debounce(),
        cancel.clone(),
    ));

    let changed =
        project::wait_for_change(&project, &mut project_watcher.events, &cancel).await;
    if changed {
        set_phase(Phase::Restarting);
        log!("watch"; "{} changed, restarting", project.display());
    }

    cancel.cancel();
    let session = script_loop.await.context("script loop panicked")?;
    debug!("watch"; "released session with {} cached scripts", session.state.cache.len());
    drop(session);

    if !changed {
        return Ok(Exit::Shutdown);
    }

    // Let the saving application finish writing before we decode
    tokio::time::sleep(config.watch.debounce()).await;
    Ok(Exit::Restart)
}
