//! Cosmetic status layer.
//!
//! Follows the selection manager's updates, logs what changed and shows a
//! spinner while a request is in flight. It only reads snapshots; nothing
//! here feeds back into the selection.

use bio_risk_cli_utils::{LoadingSpinner, MultiProgress};
use bio_risk_selection::{Phase, SelectionManager, SelectionSnapshot};
use tokio::task::JoinHandle;

/// Starts narrating `manager`'s updates. The task ends once the manager is
/// dropped.
pub fn spawn(manager: &SelectionManager, multi: MultiProgress) -> JoinHandle<()> {
    let mut updates = manager.subscribe();

    tokio::spawn(async move {
        let mut last = updates.borrow_and_update().clone();
        let mut spinner: Option<LoadingSpinner> = None;

        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            for line in transitions(&last, &snapshot) {
                log::info!("{line}");
            }

            spinner = match (busy_message(&snapshot), spinner.take()) {
                (Some(message), Some(running)) => {
                    running.set_message(message);
                    Some(running)
                }
                (Some(message), None) => Some(LoadingSpinner::start(&multi, message)),
                (None, Some(running)) => {
                    running.clear();
                    None
                }
                (None, None) => None,
            };
            last = snapshot;
        }

        if let Some(running) = spinner {
            running.clear();
        }
    })
}

const fn busy_message(snapshot: &SelectionSnapshot) -> Option<&'static str> {
    if matches!(snapshot.phase, Phase::Loading) {
        Some("Analyzing region")
    } else if snapshot.exporting {
        Some("Generating report")
    } else {
        None
    }
}

/// Human-readable description of what changed between two snapshots.
fn transitions(prev: &SelectionSnapshot, next: &SelectionSnapshot) -> Vec<String> {
    let mut lines = Vec::new();

    if prev.phase != next.phase {
        lines.push(format!("Phase {} -> {}", prev.phase, next.phase));
    }

    if next.generation != prev.generation {
        let risk = next
            .current_analysis
            .as_ref()
            .and_then(|analysis| analysis.rules.as_ref())
            .map_or_else(|| "unknown".to_string(), |rules| rules.risk_level.to_string());
        lines.push(format!("Applied analysis #{} (risk {risk})", next.generation));
    }

    let prev_id = prev.selected.as_ref().and_then(|s| s.grid_id());
    let next_id = next.selected.as_ref().and_then(|s| s.grid_id());
    match next_id {
        Some(id) if next.generation == prev.generation && next_id != prev_id => {
            lines.push(format!("Selected cell {id}"));
        }
        _ => {}
    }

    if next.trend != prev.trend || next.forecast != prev.forecast {
        lines.push(format!(
            "Series updated: {} trend points, {} forecast points",
            next.trend.len(),
            next.forecast.len()
        ));
    }

    match (prev.exporting, next.exporting) {
        (false, true) => lines.push("Report export started".to_string()),
        (true, false) => lines.push("Report export finished".to_string()),
        _ => {}
    }

    lines
}
