/// Truncate `text` to at most `max_bytes` bytes without splitting a character.
///
/// When anything is cut, `…` is appended (its bytes are not counted against
/// `max_bytes`).
#[must_use]
pub fn truncate(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

/// Keep only the last `max_lines` non-empty lines of `text`.
///
/// Installer tools print the useful part of a failure at the end of their output.
#[must_use]
pub fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
