use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::codec::get_display_name;
use super::index::tags_for;
use super::resolve::match_key;
use super::types::{FileItem, Tag, TagIndex};

pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// Multi-tag filter over the index. Names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFilter {
    pub names: Vec<String>,
    #[serde(default)]
    pub mode: MatchMode,
}

impl TagFilter {
    pub fn all<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            mode: MatchMode::All,
        }
    }

    pub fn any<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            mode: MatchMode::Any,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn matches(&self, tags: &[Tag]) -> bool {
        if self.is_empty() {
            return true;
        }
        let keys: Vec<String> = tags.iter().map(|tag| match_key(tag.name())).collect();
        let mut wanted = self.names.iter().map(|name| keys.contains(&match_key(name)));
        match self.mode {
            MatchMode::All => wanted.all(|hit| hit),
            MatchMode::Any => wanted.any(|hit| hit),
        }
    }
}

/// Files whose indexed tags satisfy the filter. Directories always pass so
/// navigation keeps working while a filter is active.
pub fn filter_by_tags<'a>(files: &'a [FileItem], index: &TagIndex, filter: &TagFilter) -> Vec<&'a FileItem> {
    files
        .iter()
        .filter(|file| file.is_directory || filter.matches(tags_for(index, &file.path)))
        .collect()
}

/// Case-insensitive substring search on the display name (tag block excluded).
pub fn search_by_name<'a>(files: &'a [FileItem], query: &str) -> Vec<&'a FileItem> {
    let query = match_key(query.trim());
    if query.is_empty() {
        return files.iter().collect();
    }
    files
        .iter()
        .filter(|file| match_key(&get_display_name(&file.name)).contains(&query))
        .collect()
}

/// Coalesces rapid search input: only the last query inside the window fires.
///
/// Superseded queries resolve to `None`. Work already started for an older
/// query is not cancelled.
#[derive(Clone)]
pub struct SearchDebouncer {
    window: Duration,
    generation: Arc<AtomicU64>,
}

impl SearchDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn debounce(&self, query: String) -> Option<String> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.window).await;
        (self.generation.load(Ordering::SeqCst) == ticket).then_some(query)
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::index::build_index;
    use std::path::PathBuf;

    fn file(name: &str) -> FileItem {
        FileItem {
            name: name.to_string(),
            path: PathBuf::from("/d").join(name),
            is_directory: false,
            size: 0,
            modified: None,
        }
    }

    fn names<'a>(files: &[&'a FileItem]) -> Vec<&'a str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    fn sample() -> Vec<FileItem> {
        vec![
            file("[work urgent] plan.md"),
            file("[work] notes.md"),
            file("[Home] list.txt"),
            file("loose.txt"),
        ]
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let files = sample();
        let index = build_index(&files, &[]);
        assert_eq!(filter_by_tags(&files, &index, &TagFilter::default()).len(), 4);
    }

    #[test]
    fn test_match_all() {
        let files = sample();
        let index = build_index(&files, &[]);
        let result = filter_by_tags(&files, &index, &TagFilter::all(["work", "URGENT"]));
        assert_eq!(names(&result), vec!["[work urgent] plan.md"]);
    }

    #[test]
    fn test_match_any() {
        let files = sample();
        let index = build_index(&files, &[]);
        let result = filter_by_tags(&files, &index, &TagFilter::any(["urgent", "home"]));
        assert_eq!(names(&result), vec!["[work urgent] plan.md", "[Home] list.txt"]);
    }

    #[test]
    fn test_directories_pass_filter() {
        let mut files = sample();
        files.push(FileItem {
            is_directory: true,
            ..file("sub")
        });
        let index = build_index(&files, &[]);
        let result = filter_by_tags(&files, &index, &TagFilter::all(["nothing"]));
        assert_eq!(names(&result), vec!["sub"]);
    }

    #[test]
    fn test_search_ignores_tag_block() {
        let files = sample();
        assert_eq!(names(&search_by_name(&files, "NOTES")), vec!["[work] notes.md"]);
        assert!(search_by_name(&files, "work").is_empty());
        assert_eq!(search_by_name(&files, "  ").len(), 4);
    }

    #[tokio::test]
    async fn test_debouncer_keeps_only_latest_query() {
        let debouncer = SearchDebouncer::new(Duration::from_millis(30));
        let first = debouncer.debounce("re".to_string());
        let second = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            debouncer.debounce("report".to_string()).await
        };
        let (first, second) = tokio::join!(first, second);
        assert_eq!(first, None);
        assert_eq!(second.as_deref(), Some("report"));
    }
}
