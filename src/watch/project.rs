use std::path::Path;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::ChangeKind;
use crate::debug;
use crate::utils::path::same_file_name;

/// Wait until `project` is created or modified.
///
/// Events arrive for the whole parent directory (editors save by rename), so
/// only the project's own file name counts; the artifact next to it does
/// not. `false` when cancelled or the event stream ended.
pub async fn wait_for_change(
    project: &Path,
    events: &mut mpsc::Receiver<notify::Event>,
    cancel: &CancellationToken,
) -> bool {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            event = events.recv() => match event {
                Some(event) => event,
                None => return false,
            },
        };

        if is_project_change(project, &event) {
            debug!("watch"; "project changed: {:?}", event.kind);
            return true;
        }
    }
}

fn is_project_change(project: &Path, event: &notify::Event) -> bool {
    matches!(
        ChangeKind::of(&event.kind),
        Some(ChangeKind::Created | ChangeKind::Modified)
    ) && event.paths.iter().any(|p| same_file_name(p, project))
}
