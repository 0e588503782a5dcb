/// Pre-edit formatting snapshot.
///
/// Built once per edit session while extracting the as-fetched markdown,
/// consulted (never mutated) while serializing, and rebuilt only by an
/// explicit refresh. An explicit value rather than module state, so two
/// concurrent sessions cannot bleed into each other.
use std::collections::HashMap;

/// Original formatting of one task line.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFormatting {
    /// Leading whitespace exactly as it appeared.
    pub indent: String,
    /// List marker character (`-`, `*` or `+`).
    pub marker: char,
    /// Content after the checkbox, verbatim (task-id marker included).
    pub raw: String,
}

#[derive(Debug, Clone, Default)]
pub struct FormattingCache {
    /// lowercase cleaned board title -> original H4 heading text
    board_headings: HashMap<String, String>,
    /// lowercase column title -> original H5 heading text
    column_headings: HashMap<String, String>,
    /// normalized task text -> original formatting
    tasks: HashMap<String, TaskFormatting>,
}

/// Key normalization for task lookups: trimmed, lowercased.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

impl FormattingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later records win on duplicate keys, matching the Map-based caches
    /// this replaces.
    pub fn record_board_heading(&mut self, cleaned_title: &str, heading_text: &str) {
        self.board_headings
            .insert(cleaned_title.to_lowercase(), heading_text.to_string());
    }

    pub fn record_column_heading(&mut self, title: &str, heading_text: &str) {
        self.column_headings
            .insert(title.to_lowercase(), heading_text.to_string());
    }

    pub fn record_task(&mut self, text: &str, formatting: TaskFormatting) {
        self.tasks.insert(normalize_text(text), formatting);
    }

    pub fn board_heading(&self, title: &str) -> Option<&str> {
        self.board_headings
            .get(&title.to_lowercase())
            .map(String::as_str)
    }

    pub fn column_heading(&self, title: &str) -> Option<&str> {
        self.column_headings
            .get(&title.to_lowercase())
            .map(String::as_str)
    }

    pub fn task(&self, text: &str) -> Option<&TaskFormatting> {
        self.tasks.get(&normalize_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_lookup_is_case_insensitive() {
        let mut cache = FormattingCache::new();
        cache.record_column_heading("Todo", "Todo");
        assert_eq!(cache.column_heading("TODO"), Some("Todo"));
        assert_eq!(cache.column_heading("todo"), Some("Todo"));
        assert_eq!(cache.column_heading("Done"), None);
    }

    #[test]
    fn test_task_lookup_normalizes() {
        let mut cache = FormattingCache::new();
        cache.record_task(
            "Buy **milk**",
            TaskFormatting {
                indent: "  ".to_string(),
                marker: '*',
                raw: "Buy **milk** <!-- task-id: aa00bb11 -->".to_string(),
            },
        );
        let hit = cache.task("  buy **MILK** ").unwrap();
        assert_eq!(hit.marker, '*');
        assert_eq!(hit.indent, "  ");
    }

    #[test]
    fn test_last_record_wins() {
        let mut cache = FormattingCache::new();
        cache.record_board_heading("plan", "Plan+");
        cache.record_board_heading("plan", "Plan");
        assert_eq!(cache.board_heading("Plan"), Some("Plan"));
    }
}
