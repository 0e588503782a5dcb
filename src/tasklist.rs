/// Flat task-list checkbox toggling.
///
/// The simple cousin of the board model: no persistent structure at all.
/// A checkbox click maps to a positional index; the document is fetched
/// fresh, the Nth task line (0-based, document order) gets its checkbox
/// flipped with every other byte preserved, and the result is saved. If
/// the index has no matching line, the page and the stored document have
/// diverged and the toggle is refused.
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::store::{DocumentStore, SyncError};

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*[-*+]\s+)\[(.)\](\s.*)$").unwrap());

/// Flip the checkbox of the `index`th task line. Checked (`x`/`X`)
/// becomes unchecked; anything else becomes `x`.
pub fn toggle_line(content: &str, index: usize) -> Result<String, SyncError> {
    let mut count = 0usize;
    let mut out: Vec<String> = Vec::new();

    for line in content.split('\n') {
        match LIST_ITEM_RE.captures(line) {
            Some(caps) if count == index => {
                let flipped = if caps[2].eq_ignore_ascii_case("x") { " " } else { "x" };
                out.push(format!("{}[{}]{}", &caps[1], flipped, &caps[3]));
                count += 1;
            }
            Some(_) => {
                out.push(line.to_string());
                count += 1;
            }
            None => out.push(line.to_string()),
        }
    }

    if index >= count {
        return Err(SyncError::StructuralMismatch { index, count });
    }
    Ok(out.join("\n"))
}

/// Fetch-toggle-save for one document. Stateless between toggles: every
/// click re-reads the stored markdown.
pub struct TaskListToggler {
    store: Arc<dyn DocumentStore>,
    doc_path: String,
}

impl TaskListToggler {
    pub fn new(store: Arc<dyn DocumentStore>, doc_path: impl Into<String>) -> Self {
        Self {
            store,
            doc_path: doc_path.into(),
        }
    }

    pub async fn toggle(&self, index: usize) -> Result<(), SyncError> {
        let content = self.store.fetch(&self.doc_path).await?;
        let updated = toggle_line(&content, index)?;
        log::debug!(
            "[boardsync.tasklist] toggled checkbox {} in {}",
            index,
            self.doc_path
        );
        self.store.save(&self.doc_path, &updated).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MockStore;

    #[test]
    fn test_toggle_line_checks_and_unchecks() {
        let doc = "- [ ] buy milk\n- [x] walk dog\n";
        assert_eq!(
            toggle_line(doc, 0).unwrap(),
            "- [x] buy milk\n- [x] walk dog\n"
        );
        assert_eq!(
            toggle_line(doc, 1).unwrap(),
            "- [ ] buy milk\n- [ ] walk dog\n"
        );
    }

    #[test]
    fn test_toggle_skips_non_task_lines() {
        let doc = "# Chores\n\nsome prose\n- plain bullet\n- [ ] first\n* [X] second\n";
        let toggled = toggle_line(doc, 1).unwrap();
        assert!(toggled.contains("* [ ] second"));
        assert!(toggled.contains("- [ ] first"));
        assert!(toggled.contains("- plain bullet"));
    }

    #[test]
    fn test_toggle_preserves_indent_and_marker() {
        let doc = "  * [ ] nested item  \n";
        assert_eq!(toggle_line(doc, 0).unwrap(), "  * [x] nested item  \n");
    }

    #[test]
    fn test_odd_state_char_becomes_checked() {
        let doc = "- [?] limbo\n";
        assert_eq!(toggle_line(doc, 0).unwrap(), "- [x] limbo\n");
    }

    #[test]
    fn test_index_past_end_is_structural_mismatch() {
        let doc = "- [ ] only one\n";
        assert_eq!(
            toggle_line(doc, 3),
            Err(SyncError::StructuralMismatch { index: 3, count: 1 })
        );
    }

    #[tokio::test]
    async fn test_toggle_fetches_then_saves() {
        let store = Arc::new(MockStore::new("- [ ] buy milk\n- [ ] walk dog\n"));
        let toggler = TaskListToggler::new(Arc::clone(&store) as Arc<dyn DocumentStore>, "chores.md");

        toggler.toggle(1).await.unwrap();
        assert_eq!(
            store.last_saved().as_deref(),
            Some("- [ ] buy milk\n- [x] walk dog\n")
        );

        // The next toggle re-reads the updated document.
        toggler.toggle(1).await.unwrap();
        assert_eq!(
            store.last_saved().as_deref(),
            Some("- [ ] buy milk\n- [ ] walk dog\n")
        );
    }

    #[tokio::test]
    async fn test_mismatch_aborts_before_save() {
        let store = Arc::new(MockStore::new("- [ ] only one\n"));
        let toggler = TaskListToggler::new(Arc::clone(&store) as Arc<dyn DocumentStore>, "chores.md");

        let err = toggler.toggle(5).await.unwrap_err();
        assert!(matches!(err, SyncError::StructuralMismatch { .. }));
        assert!(store.saved.lock().unwrap().is_empty());
    }
}
