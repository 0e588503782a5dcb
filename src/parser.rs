/// Markdown extraction for board documents.
///
/// Recognized structure inside a wiki page:
///   #### Board title
///   ##### Column title
///   - [ ] Task summary <!-- task-id: 4f1a09be -->
///     - [x] Nested task (two spaces per level)
///
/// Everything else — frontmatter, prose, other headings — is left to the
/// serializer to copy through verbatim. A board section ends at the next
/// heading of level four or higher rank, or at the first line that is
/// neither a heading, a task line, nor blank.
use std::sync::LazyLock;

use regex::Regex;

use crate::cache::{FormattingCache, TaskFormatting};
use crate::identity;
use crate::types::{Board, BoardSet, Column, Task};

static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)([-*+])\s+\[(.)\]\s+(.+)$").unwrap());

static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)saving(\.\.\.|…)|\(saved\)|\(save failed\)").unwrap());

/// One parsed task line, borrowed from the source.
pub(crate) struct TaskLine<'a> {
    pub indent: &'a str,
    pub marker: char,
    pub state: char,
    pub content: &'a str,
}

pub(crate) fn parse_task_line(line: &str) -> Option<TaskLine<'_>> {
    let caps = TASK_RE.captures(line.trim_end_matches('\r'))?;
    Some(TaskLine {
        indent: caps.get(1).unwrap().as_str(),
        marker: caps.get(2).unwrap().as_str().chars().next().unwrap_or('-'),
        state: caps.get(3).unwrap().as_str().chars().next().unwrap_or(' '),
        content: caps.get(4).unwrap().as_str(),
    })
}

/// Heading rank of a line: number of leading `#` followed by a space (or
/// nothing, for a bare hash run). None for non-heading lines.
pub(crate) fn heading_level(line: &str) -> Option<usize> {
    let line = line.trim_end_matches('\r');
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 {
        return None;
    }
    match line.as_bytes().get(hashes) {
        None | Some(b' ') => Some(hashes),
        _ => None,
    }
}

/// Text after the hashes of a heading line, without the separating space.
pub(crate) fn heading_text(line: &str, level: usize) -> &str {
    let line = line.trim_end_matches('\r');
    let rest = &line[level..];
    rest.strip_prefix(' ').unwrap_or(rest)
}

/// Strip transient status-indicator text from a board title: the save
/// spinner/"saved" suffixes and the trailing add-button `+`.
pub(crate) fn clean_board_title(raw: &str) -> String {
    let cleaned = STATUS_RE.replace_all(raw, "");
    cleaned.trim().trim_end_matches('+').trim().to_string()
}

/// Number of lines taken by a leading `---` frontmatter block, including
/// both fences. An unterminated opener is ordinary content.
pub(crate) fn frontmatter_len(lines: &[&str]) -> usize {
    if lines.first().map(|l| l.trim_end() == "---") != Some(true) {
        return 0;
    }
    for (i, line) in lines.iter().enumerate().skip(1) {
        if line.trim_end() == "---" {
            return i + 1;
        }
    }
    0
}

/// Parse a document into its boards plus the formatting cache for this
/// edit session. Lines outside recognized board sections produce nothing;
/// the serializer preserves them from the original text instead.
pub fn extract(content: &str) -> (BoardSet, FormattingCache) {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut cache = FormattingCache::new();
    let mut boards: Vec<Board> = Vec::new();

    let mut current_board: Option<Board> = None;
    // Tasks collect flat (depth-tagged) per column and become a tree when
    // the column closes.
    let mut current_column: Option<(Column, Vec<(usize, Task)>)> = None;

    for line in &lines[frontmatter_len(&lines)..] {
        let trimmed = line.trim_end_matches('\r');

        if let Some(level) = heading_level(trimmed) {
            if level == 4 {
                close_column(&mut current_column, &mut current_board);
                close_board(&mut current_board, &mut boards);

                let raw = heading_text(trimmed, level);
                let cleaned = clean_board_title(raw);
                cache.record_board_heading(&cleaned, raw);
                let title = (!cleaned.is_empty()).then_some(cleaned);
                current_board = Some(Board::new(title));
                continue;
            }
            if level == 5 && current_board.is_some() {
                close_column(&mut current_column, &mut current_board);
                let title = heading_text(trimmed, level);
                if !title.is_empty() {
                    cache.record_column_heading(title, title);
                    current_column = Some((Column::new(title), Vec::new()));
                }
                continue;
            }
            if level >= 5 {
                // Deeper headings inside a section are filler; outside any
                // board they are plain content either way.
                continue;
            }
            // A rank-1..3 heading terminates the board section.
            close_column(&mut current_column, &mut current_board);
            close_board(&mut current_board, &mut boards);
            continue;
        }

        if let Some(task_line) = parse_task_line(trimmed) {
            if let Some((_, flat)) = current_column.as_mut() {
                let depth = task_line.indent.len() / 2;
                let task_id = identity::extract_task_id(task_line.content);
                let text = identity::strip_task_id(task_line.content);
                cache.record_task(
                    &text,
                    TaskFormatting {
                        indent: task_line.indent.to_string(),
                        marker: task_line.marker,
                        raw: task_line.content.to_string(),
                    },
                );
                flat.push((
                    depth,
                    Task {
                        id: identity::generate_id("task"),
                        task_id,
                        text,
                        checked: matches!(task_line.state, 'x' | 'X'),
                        marker: task_line.marker,
                        edited_raw: None,
                        children: Vec::new(),
                    },
                ));
            }
            // Task lines above the first column (or outside any board)
            // produce no node.
            continue;
        }

        if trimmed.trim().is_empty() {
            continue;
        }

        // Any other content ends the section; the line itself stays
        // untouched in the document.
        close_column(&mut current_column, &mut current_board);
        close_board(&mut current_board, &mut boards);
    }

    close_column(&mut current_column, &mut current_board);
    close_board(&mut current_board, &mut boards);

    (BoardSet { boards }, cache)
}

fn close_column(current: &mut Option<(Column, Vec<(usize, Task)>)>, board: &mut Option<Board>) {
    if let Some((mut column, flat)) = current.take() {
        column.tasks = build_forest(flat);
        if let Some(board) = board.as_mut() {
            board.columns.push(column);
        }
    }
}

fn close_board(current: &mut Option<Board>, boards: &mut Vec<Board>) {
    if let Some(board) = current.take() {
        boards.push(board);
    }
}

/// Turn a depth-tagged flat run into a task tree: a task's children are
/// the maximal contiguous run of following tasks with strictly greater
/// depth.
fn build_forest(flat: Vec<(usize, Task)>) -> Vec<Task> {
    fn build(
        items: &mut std::iter::Peekable<std::vec::IntoIter<(usize, Task)>>,
        min_depth: usize,
    ) -> Vec<Task> {
        let mut out = Vec::new();
        while items.peek().is_some_and(|(depth, _)| *depth >= min_depth) {
            let (depth, mut task) = items.next().unwrap();
            task.children = build(items, depth + 1);
            out.push(task);
        }
        out
    }
    build(&mut flat.into_iter().peekable(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_DOC: &str = "\
---
title: Team page
---

Intro prose stays put.

#### Sprint
##### Todo
- [ ] Buy groceries <!-- task-id: 4f1a09be -->
- [x] Walk the dog
  * [ ] Bring treats

##### Done
- [X] Laundry

Closing prose after the board.
- [ ] not a board task
";

    #[test]
    fn test_extract_basic_structure() {
        let (set, _) = extract(SAMPLE_DOC);
        assert_eq!(set.boards.len(), 1);

        let board = &set.boards[0];
        assert_eq!(board.title.as_deref(), Some("Sprint"));
        assert_eq!(board.id, "sprint");
        assert_eq!(board.columns.len(), 2);

        let todo = &board.columns[0];
        assert_eq!(todo.title, "Todo");
        assert_eq!(todo.tasks.len(), 2);
        assert_eq!(todo.tasks[0].text, "Buy groceries");
        assert_eq!(todo.tasks[0].task_id.as_deref(), Some("4f1a09be"));
        assert!(!todo.tasks[0].checked);
        assert!(todo.tasks[1].checked);
        assert_eq!(todo.tasks[1].children.len(), 1);
        assert_eq!(todo.tasks[1].children[0].text, "Bring treats");
        assert_eq!(todo.tasks[1].children[0].marker, '*');

        let done = &board.columns[1];
        assert_eq!(done.tasks.len(), 1);
        assert!(done.tasks[0].checked);
    }

    #[test]
    fn test_prose_ends_the_section() {
        // The checkbox line after the closing prose is plain content.
        let (set, _) = extract(SAMPLE_DOC);
        let total: usize = set.boards[0].columns.iter().map(|c| c.task_count()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_status_indicators_stripped_from_board_title() {
        assert_eq!(clean_board_title("Sprint saving…"), "Sprint");
        assert_eq!(clean_board_title("Sprint saving... +"), "Sprint");
        assert_eq!(clean_board_title("Sprint (Saved)"), "Sprint");
        assert_eq!(clean_board_title("+"), "");

        let (set, _) = extract("#### Sprint (Saved)\n##### Todo\n- [ ] a\n");
        assert_eq!(set.boards[0].title.as_deref(), Some("Sprint"));
    }

    #[test]
    fn test_all_indicator_title_is_anonymous() {
        let (set, _) = extract("#### +\n##### Todo\n- [ ] a\n");
        assert_eq!(set.boards[0].title, None);
        assert!(set.boards[0].id.starts_with("board-"));
    }

    #[test]
    fn test_indent_floor_division() {
        let doc = "#### B\n##### C\n- [ ] root\n   - [ ] three spaces\n";
        let (set, _) = extract(doc);
        let tasks = &set.boards[0].columns[0].tasks;
        assert_eq!(tasks.len(), 1);
        // 3 spaces -> level 1: a child, not a grandchild.
        assert_eq!(tasks[0].children.len(), 1);
        assert_eq!(tasks[0].children[0].text, "three spaces");
    }

    #[test]
    fn test_odd_checkbox_state_is_unchecked() {
        let (set, _) = extract("#### B\n##### C\n- [?] odd\n- [x] done\n");
        let tasks = &set.boards[0].columns[0].tasks;
        assert!(!tasks[0].checked);
        assert!(tasks[1].checked);
    }

    #[test]
    fn test_disambiguated_titles_stay_literal() {
        let doc = "#### B\n##### Todo\n- [ ] a\n##### Todo (2)\n- [ ] b\n";
        let (set, _) = extract(doc);
        let titles: Vec<&str> = set.boards[0]
            .columns
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Todo", "Todo (2)"]);
    }

    #[test]
    fn test_higher_rank_heading_closes_board() {
        let doc = "#### B\n##### C\n- [ ] a\n## Chapter\n- [ ] plain list item\n";
        let (set, _) = extract(doc);
        assert_eq!(set.boards.len(), 1);
        assert_eq!(set.boards[0].columns[0].task_count(), 1);
    }

    #[test]
    fn test_frontmatter_task_lines_ignored() {
        let doc = "---\nnotes:\n- [ ] yaml, not a task\n---\n#### B\n##### C\n- [ ] real\n";
        let (set, _) = extract(doc);
        assert_eq!(set.boards[0].columns[0].task_count(), 1);
        assert_eq!(set.boards[0].columns[0].tasks[0].text, "real");
    }

    #[test]
    fn test_unterminated_frontmatter_is_content() {
        let doc = "---\n#### B\n##### C\n- [ ] a\n";
        let (set, _) = extract(doc);
        assert_eq!(set.boards.len(), 1);
    }

    #[test]
    fn test_cache_captures_original_formatting() {
        let (_, cache) = extract(SAMPLE_DOC);
        assert_eq!(cache.board_heading("sprint"), Some("Sprint"));
        assert_eq!(cache.column_heading("todo"), Some("Todo"));

        let fmt = cache.task("bring treats").unwrap();
        assert_eq!(fmt.indent, "  ");
        assert_eq!(fmt.marker, '*');

        let with_id = cache.task("buy groceries").unwrap();
        assert_eq!(with_id.raw, "Buy groceries <!-- task-id: 4f1a09be -->");
    }

    #[test]
    fn test_two_boards_same_title() {
        let doc = "#### X\n##### A\n- [ ] one\n\n#### X\n##### B\n- [ ] two\n";
        let (set, _) = extract(doc);
        assert_eq!(set.boards.len(), 2);
        assert_eq!(set.boards[0].title, set.boards[1].title);
        assert_eq!(set.boards[0].columns[0].title, "A");
        assert_eq!(set.boards[1].columns[0].title, "B");
    }
}
