//! Filename tag encoding.
//!
//! Tags live in a bracketed prefix of the filename itself:
//! `[tag1 tag2] display name.ext`. Only a block starting at position 0 is
//! recognized; brackets anywhere else are part of the display name.
//! Nothing here can fail: a name that does not parse simply has no tags.

/// Returns the text between the leading `[` and the first `]`, if any.
fn leading_block(filename: &str) -> Option<(&str, &str)> {
    let rest = filename.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some((&rest[..end], &rest[end + 1..]))
}

/// Extracts the ordered tag tokens from a filename.
pub fn parse_tag_tokens(filename: &str) -> Vec<String> {
    match leading_block(filename) {
        Some((content, _)) => content.split_whitespace().map(str::to_string).collect(),
        None => Vec::new(),
    }
}

/// Strips the leading tag block and one following space, then trims.
///
/// A name without a block at byte 0 comes back untouched. After a strip the
/// remainder is stripped again while it still starts with a closed block, so
/// that `get_display_name(get_display_name(x)) == get_display_name(x)`.
pub fn get_display_name(filename: &str) -> String {
    let mut current = filename;
    while let Some((_, rest)) = leading_block(current) {
        current = rest.strip_prefix(' ').unwrap_or(rest).trim();
    }
    current.to_string()
}

/// Removes characters that would break the bracket grammar.
///
/// `]` closes the block early and whitespace splits a token, so both are
/// dropped, as are control characters such as newlines.
pub fn sanitize_tag_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ']' && !c.is_whitespace() && !c.is_control())
        .collect()
}

/// Builds a filename from a display name and an ordered tag list.
///
/// With no (non-empty) tags the display name is returned unchanged.
pub fn compose_filename<S: AsRef<str>>(display_name: &str, tag_names: &[S]) -> String {
    let names: Vec<String> = tag_names
        .iter()
        .map(|name| sanitize_tag_name(name.as_ref()))
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        display_name.to_string()
    } else {
        format!("[{}] {}", names.join(" "), display_name)
    }
}
