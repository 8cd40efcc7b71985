use quicknote_core::models::Message;

use crate::app::SWIPE_STEP;

/// Truncate a string to a maximum length in characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a message timestamp for the list, e.g. `Mar 01 10:15`.
/// Timestamps that do not parse are shown as sent.
pub fn format_created_at(message: &Message) -> String {
    match message.created_at() {
        Some(dt) => dt.format("%b %d %H:%M").to_string(),
        None => message.created_at.clone(),
    }
}

/// Gutter drawn to the left of a dragged row: one block per swipe step.
pub fn swipe_gutter(offset: i32) -> String {
    let steps = (offset / SWIPE_STEP).max(0) as usize;
    "◀".repeat(steps)
}
