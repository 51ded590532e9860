//! Process-wide run state.
//!
//! Two orthogonal pieces:
//! - `PHASE`: what the pipeline is doing right now (for logs and status)
//! - `SHUTDOWN_TOKEN`: root cancellation token, cancelled on Ctrl+C

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

/// Pipeline phase.
///
/// ```text
/// Idle → Loading → Watching ⇄ {Patching, Rebuilding}
///                  Watching → Restarting → Loading
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Loading = 1,
    Watching = 2,
    Patching = 3,
    Rebuilding = 4,
    Restarting = 5,
}

impl Phase {
    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Loading,
            2 => Self::Watching,
            3 => Self::Patching,
            4 => Self::Rebuilding,
            5 => Self::Restarting,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Watching => "watching",
            Self::Patching => "patching",
            Self::Rebuilding => "rebuilding",
            Self::Restarting => "restarting",
        };
        f.write_str(name)
    }
}

static PHASE: AtomicU8 = AtomicU8::new(Phase::Idle as u8);

/// Shutdown has been requested (Ctrl+C received)
/// Root token cancelled on Ctrl+C; watch loops hold child tokens.
static SHUTDOWN_TOKEN: OnceLock<CancellationToken> = OnceLock::new();

// =============================================================================
// PHASE
// =============================================================================

pub fn phase() -> Phase {
    Phase::from_u8(PHASE.load(Ordering::Acquire))
}

pub fn set_phase(phase: Phase) {
    let previous = PHASE.swap(phase as u8, Ordering::AcqRel);
    if previous != phase as u8 {
        crate::debug!("state"; "{} → {}", Phase::from_u8(previous), phase);
    }
}

// =============================================================================
// SHUTDOWN
// =============================================================================

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_shutdown()`: nothing to wind down (e.g. during the
///   path prompt), exit immediately
/// - After: cancel the registered token so the watch loops return
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if let Some(token) = SHUTDOWN_TOKEN.get() {
            crate::log!("watch"; "shutting down...");
            token.cancel();
        } else {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the root cancellation token. Returns the registered token, so a
/// second call hands back the first one.
pub fn register_shutdown() -> CancellationToken {
    SHUTDOWN_TOKEN.get_or_init(CancellationToken::new).clone()
}
