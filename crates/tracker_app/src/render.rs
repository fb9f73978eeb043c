//! Plain-text rendering of registry snapshots for the terminal.

use tracker_core::{OperationView, RegistrySnapshot};

const BAR_WIDTH: usize = 20;

pub fn render(snapshot: &RegistrySnapshot) -> Vec<String> {
    let mut lines = Vec::with_capacity(snapshot.operations.len() + 1);
    lines.push(header(snapshot));
    lines.extend(snapshot.operations.iter().map(render_operation));
    lines
}

fn header(snapshot: &RegistrySnapshot) -> String {
    let mut text = format!("Operations: {}", snapshot.operations.len());
    if snapshot.is_stale() {
        let failures = snapshot.health.consecutive_failures;
        text.push_str(&format!(" | STALE ({failures} failed polls)"));
        if let Some(at) = snapshot.health.last_success_at {
            text.push_str(&format!(" | last update {}", at.format("%H:%M:%S")));
        }
    }
    text
}

pub fn render_operation(view: &OperationView) -> String {
    let state = &view.state;
    let mut line = format!(
        "{:<12} {:<16} {} {:>5.1}% | pages {} | code {} | depth {}",
        state.id,
        state.status.as_str(),
        progress_bar(state.display_progress),
        state.display_progress,
        pages_label(view),
        state.display_code_examples,
        state.depth_label,
    );
    if !state.target_url.is_empty() {
        line.push_str(&format!(" | {}", state.target_url));
    }
    if view.pending_cancel {
        line.push_str(" (stopping…)");
    }
    if let Some(error) = &state.error_message {
        line.push_str(&format!(" | error: {error}"));
    }
    line
}

fn pages_label(view: &OperationView) -> String {
    let range = if view.pages_range.is_empty() {
        "-".to_string()
    } else {
        view.pages_range.to_string()
    };
    match view.state.total_pages {
        Some(total) => format!("{range} of {total}"),
        None => range,
    }
}

fn progress_bar(progress: f64) -> String {
    let filled = ((progress / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}
