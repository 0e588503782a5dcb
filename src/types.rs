use serde::{Deserialize, Serialize};

/// A single checkbox list item, possibly carrying nested subtasks.
///
/// Tasks form a real tree in memory; the markdown wire format flattens it
/// back to indentation (two spaces per level). `id` is a process-local
/// handle assigned at parse time, while `task_id` is the persistent
/// identity carried in the markdown as a `<!-- task-id: ... -->` comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checked: bool,
    /// Original list marker character (`-`, `*` or `+`).
    #[serde(default = "default_marker")]
    pub marker: char,
    /// Raw markdown set by an explicit edit; serialized verbatim.
    #[serde(skip)]
    pub edited_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Task>,
}

fn default_marker() -> char {
    '-'
}

impl Task {
    /// Build a fresh root task: unchecked, no children, with both a new
    /// internal handle and a new persistent task id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: crate::identity::generate_id("task"),
            task_id: Some(crate::identity::generate_task_id()),
            text: text.into(),
            checked: false,
            marker: '-',
            edited_raw: None,
            children: Vec::new(),
        }
    }

    /// Ensure the task carries a persistent id, generating one if absent.
    pub fn ensure_task_id(&mut self) -> &str {
        if self.task_id.is_none() {
            self.task_id = Some(crate::identity::generate_task_id());
        }
        self.task_id.as_deref().unwrap_or_default()
    }
}

/// A named lane of tasks, introduced by a level-5 heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub title: String,
    /// Pre-rename title, set on the first rename only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    /// True when a sibling column shares this title (case-insensitive).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
    pub tasks: Vec<Task>,
}

impl Column {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            original_title: None,
            duplicate: false,
            tasks: Vec::new(),
        }
    }

    /// Depth-first walk of the task tree as (depth, task) pairs — the
    /// order and depths the markdown serialization uses.
    pub fn flat_tasks(&self) -> Vec<(usize, &Task)> {
        fn walk<'a>(tasks: &'a [Task], depth: usize, out: &mut Vec<(usize, &'a Task)>) {
            for task in tasks {
                out.push((depth, task));
                walk(&task.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.tasks, 0, &mut out);
        out
    }

    /// Total task count including nested subtasks.
    pub fn task_count(&self) -> usize {
        fn count(tasks: &[Task]) -> usize {
            tasks.iter().map(|t| 1 + count(&t.children)).sum()
        }
        count(&self.tasks)
    }
}

/// A top-level titled section (level-4 heading) containing columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub columns: Vec<Column>,
}

impl Board {
    /// Build a board with a stable synthetic id: a slug of the title, or
    /// a generated id for title-less boards.
    pub fn new(title: Option<String>) -> Self {
        let id = match title.as_deref() {
            Some(t) if !slugify(t).is_empty() => slugify(t),
            _ => crate::identity::generate_id("board"),
        };
        Self {
            id,
            title,
            columns: Vec::new(),
        }
    }
}

/// The ordered boards of one document; the root value the UI mutates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSet {
    pub boards: Vec<Board>,
}

impl BoardSet {
    /// Find a task anywhere in the set by its internal id.
    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        fn find<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
            for task in tasks {
                if task.id == id {
                    return Some(task);
                }
                if let Some(found) = find(&task.children, id) {
                    return Some(found);
                }
            }
            None
        }
        self.boards
            .iter()
            .flat_map(|b| b.columns.iter())
            .find_map(|c| find(&c.tasks, task_id))
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
