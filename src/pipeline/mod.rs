//! Load → inject → watch, with restart and retry.
//!
//! ```text
//!            ┌──── load or watch failed: wait, ask again ───────┐
//!            ▼                                                  │
//! prompt → Loading ──ok──► write artifact ──► Watching ──────────┘
//!            ▲                                   │
//!            └──────── project changed ──────────┤
//!                                                └── Ctrl+C → exit
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, prompt};
use crate::config::InjectConfig;
use crate::core::{Phase, phase, register_shutdown, set_phase};
use crate::session::Session;
use crate::utils::path::normalize_path;
use crate::watch::{self, Exit};
use crate::{debug, log};

/// Blocking prompts may still be reading stdin at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

pub fn run(cli: &Cli, config: &InjectConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let shutdown = register_shutdown();
    let result = runtime.block_on(run_async(cli.project.clone(), config, shutdown));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run_async(
    project: Option<PathBuf>,
    config: &InjectConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut project = match project {
        Some(path) => path,
        None => match ask_project(None, &shutdown).await? {
            Some(path) => path,
            None => return Ok(()),
        },
    };

    loop {
        if shutdown.is_cancelled() {
            break;
        }
        set_phase(Phase::Loading);
        let path = normalize_path(&project);
        log!("inject"; "loading {}", path.display());

        let session = match Session::load(&path, config) {
            Ok(session) => session,
            Err(e) => {
                let e = anyhow::Error::new(e).context(format!("failed to load {}", path.display()));
                if config.once {
                    return Err(e);
                }
                match recover(&e, &project, config, &shutdown).await? {
                    Some(path) => project = path,
                    None => break,
                }
                continue;
            }
        };
        log!("inject"; "wrote {}", session.artifact().path().display());

        if config.once {
            break;
        }

        match watch::watch(session, config, &shutdown).await {
            Ok(Exit::Restart) => continue,
            Ok(Exit::Shutdown) => break,
            Err(e) => match recover(&e, &project, config, &shutdown).await? {
                Some(path) => project = path,
                None => break,
            },
        }
    }

    debug!("state"; "stopped while {}", phase());
    set_phase(Phase::Idle);
    Ok(())
}

/// Report a failed load or watch, wait, then ask for the project again.
///
/// `None` once shutdown is requested.
async fn recover(
    error: &anyhow::Error,
    project: &Path,
    config: &InjectConfig,
    shutdown: &CancellationToken,
) -> Result<Option<PathBuf>> {
    set_phase(Phase::Idle);
    log!("error"; "{:#}", error);
    if !wait_retry(config.watch.retry_delay(), shutdown).await {
        return Ok(None);
    }
    ask_project(Some(project), shutdown).await
}

/// Sleep before a retry. `false` if shutdown came first.
async fn wait_retry(delay: Duration, shutdown: &CancellationToken) -> bool {
    debug!("inject"; "retrying in {} ms", delay.as_millis());
    tokio::select! {
        _ = shutdown.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

/// `None` if shutdown came first; the blocking read is abandoned.
async fn ask_project(
    current: Option<&Path>,
    shutdown: &CancellationToken,
) -> Result<Option<PathBuf>> {
    let current = current.map(Path::to_path_buf);
    let answer = tokio::task::spawn_blocking(move || prompt::project_path(current.as_deref()));
    tokio::select! {
        _ = shutdown.cancelled() => Ok(None),
        answer = answer => answer.context("prompt task failed")?.map(Some),
    }
}
