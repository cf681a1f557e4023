//! Resolution of bracket tokens against the tag library.

use rand::distributions::Alphanumeric;
use rand::Rng;
use unicode_normalization::UnicodeNormalization;

use super::types::{Tag, TagGroup, TemporaryTag, DEFAULT_TEXT_COLOR};

/// Colors handed out to temporary tags, indexed by a hash of the name.
pub const TAG_PALETTE: [&str; 16] = [
    "#ef5350", "#ec407a", "#ab47bc", "#7e57c2", "#5c6bc0", "#42a5f5", "#29b6f6", "#26c6da",
    "#26a69a", "#66bb6a", "#9ccc65", "#d4e157", "#ffca28", "#ffa726", "#ff7043", "#8d6e63",
];

const TEMP_ID_SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub matched: Vec<Tag>,
    pub unmatched: Vec<String>,
}

/// Key used for case-insensitive comparison of tag names.
pub fn match_key(name: &str) -> String {
    name.nfc().collect::<String>().to_lowercase()
}

fn find_in_library(token: &str, groups: &[TagGroup]) -> Option<Tag> {
    let key = match_key(token);
    groups.iter().find_map(|group| {
        group
            .tags
            .iter()
            .find(|tag| match_key(&tag.name) == key)
            .map(|tag| {
                let mut tag = tag.clone();
                tag.group_id = group.id.clone();
                Tag::Library(tag)
            })
    })
}

/// Splits tokens into library matches and unmatched names.
///
/// Groups are searched in order and the first tag with the same name wins.
pub fn resolve(tokens: &[String], groups: &[TagGroup]) -> Resolution {
    let mut resolution = Resolution::default();
    for token in tokens {
        match find_in_library(token, groups) {
            Some(tag) => resolution.matched.push(tag),
            None => resolution.unmatched.push(token.clone()),
        }
    }
    resolution
}

/// Stable palette color for a name: same input, same color, every call.
pub fn temporary_color(name: &str) -> &'static str {
    let mut hash: i32 = 0;
    for unit in name.encode_utf16() {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(unit as i32);
    }
    TAG_PALETTE[(hash.unsigned_abs() as usize) % TAG_PALETTE.len()]
}

fn temporary_id(name: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("temp:{}:{}", name, suffix)
}

fn temporary_tag(name: &str) -> Tag {
    Tag::Temporary(TemporaryTag {
        id: temporary_id(name),
        name: name.to_string(),
        color: temporary_color(name).to_string(),
        text_color: DEFAULT_TEXT_COLOR.to_string(),
    })
}

/// Builds temporary tags for unmatched names. Ids are fresh on every call.
pub fn synthesize_temporary(unmatched: &[String]) -> Vec<Tag> {
    unmatched.iter().map(|name| temporary_tag(name)).collect()
}

/// Resolves every token, keeping library and temporary tags in token order.
pub fn resolve_tokens(tokens: &[String], groups: &[TagGroup]) -> Vec<Tag> {
    tokens
        .iter()
        .map(|token| find_in_library(token, groups).unwrap_or_else(|| temporary_tag(token)))
        .collect()
}
