//! Presentation helpers
//!
//! Pure functions turning raw event fields into display strings. Consumer
//! views call these; none of them touch pulse state.

mod roles;
mod time;

pub use roles::{get_role_display, role_tone, RoleDirectory, RoleInfo, RoleTone};
pub use time::format_relative_time;

/// Default snippet length for event content
pub const DEFAULT_TRUNCATE_LEN: usize = 60;

/// Marker appended to truncated content
pub const ELLIPSIS: &str = "...";

/// Truncate `content` to at most `max_len` characters, appending `...` when cut.
///
/// Counts `char`s rather than bytes so multi-byte characters are never split.
pub fn truncate(content: &str, max_len: usize) -> String {
    match content.char_indices().nth(max_len) {
        None => content.to_string(),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len());
            out.push_str(&content[..cut]);
            out.push_str(ELLIPSIS);
            out
        }
    }
}
