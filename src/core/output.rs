//! Compact output rendering helpers for CLI surfaces.
//!
//! Keeps previews bounded and readable while preserving signal.

use colored::Colorize;

/// Collapse newlines/extra whitespace and bound length for display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// One-line status banner for terminal output, e.g. `✓ add_user`.
pub fn status_line(ok: bool, label: &str, detail: &str) -> String {
    let detail = compact_line(detail, 120);
    if ok {
        format!("{} {} {}", "✓".bright_green().bold(), label.bold(), detail)
    } else {
        format!("{} {} {}", "✗".bright_red().bold(), label.bold(), detail.red())
    }
}
