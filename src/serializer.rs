/// Formatting-preserving serialization: board tree → markdown.
///
/// The original document is walked line by line. Lines outside recognized
/// board sections are copied through byte-for-byte; each board section is
/// replaced by the current in-memory state, rendered with the formatting
/// cache so untouched headings and tasks keep their original text. Boards
/// with no original section are appended at the end. The whole result is
/// built in memory before anything touches the network.
use crate::cache::FormattingCache;
use crate::identity;
use crate::parser::{
    clean_board_title, frontmatter_len, heading_level, heading_text, parse_task_line,
};
use crate::types::{Board, BoardSet, Task};

pub fn serialize(original: &str, set: &BoardSet, cache: &FormattingCache) -> String {
    let lines: Vec<&str> = original.split('\n').collect();
    let mut out: Vec<String> = Vec::new();
    let mut used = vec![false; set.boards.len()];

    let fm = frontmatter_len(&lines);
    for line in &lines[..fm] {
        out.push((*line).to_string());
    }

    let mut i = fm;
    while i < lines.len() {
        let trimmed = lines[i].trim_end_matches('\r');
        if heading_level(trimmed) == Some(4) {
            let cleaned = clean_board_title(heading_text(trimmed, 4));
            if let Some(idx) = find_board(set, &used, &cleaned) {
                used[idx] = true;
                emit_board(&mut out, &set.boards[idx], cache);
            }
            // Skip the section span whether the board survived or not.
            i += 1;
            while i < lines.len() && is_section_line(lines[i]) {
                i += 1;
            }
            continue;
        }
        out.push(lines[i].to_string());
        i += 1;
    }

    if out.len() == 1 && out[0].is_empty() {
        out.clear();
    }
    for (idx, board) in set.boards.iter().enumerate() {
        if used[idx] {
            continue;
        }
        if out.last().is_some_and(|l| !l.trim().is_empty()) {
            out.push(String::new());
        }
        emit_board(&mut out, board, cache);
    }

    out.join("\n")
}

/// First not-yet-emitted board with the given cleaned title; an empty
/// title matches the next title-less board in encounter order.
fn find_board(set: &BoardSet, used: &[bool], cleaned: &str) -> Option<usize> {
    (0..set.boards.len()).find(|&idx| {
        let board = &set.boards[idx];
        !used[idx]
            && if cleaned.is_empty() {
                board.title.is_none()
            } else {
                board.title.as_deref() == Some(cleaned)
            }
    })
}

/// Lines a board section owns in the original: column and deeper headings,
/// task lines, blanks. The next H4 or any other content ends the span.
fn is_section_line(line: &str) -> bool {
    let trimmed = line.trim_end_matches('\r');
    if trimmed.trim().is_empty() {
        return true;
    }
    if let Some(level) = heading_level(trimmed) {
        return level >= 5;
    }
    parse_task_line(trimmed).is_some()
}

fn emit_board(out: &mut Vec<String>, board: &Board, cache: &FormattingCache) {
    let title = board.title.as_deref().unwrap_or("");
    let heading = cache.board_heading(title).unwrap_or(title);
    if heading.is_empty() {
        out.push("####".to_string());
    } else {
        out.push(format!("#### {}", heading));
    }

    if board.columns.is_empty() {
        out.push(String::new());
        return;
    }

    let mut emitted: Vec<String> = Vec::new();
    for column in &board.columns {
        let lower = column.title.to_lowercase();
        let occurrence = emitted.iter().filter(|t| **t == lower).count() + 1;
        emitted.push(lower);

        let heading = if occurrence == 1 {
            cache
                .column_heading(&column.title)
                .unwrap_or(&column.title)
                .to_string()
        } else {
            format!("{} ({})", column.title, occurrence)
        };
        out.push(format!("##### {}", heading));

        for (depth, task) in column.flat_tasks() {
            out.push(render_task_line(task, depth, cache));
        }
        out.push(String::new());
    }
}

fn render_task_line(task: &Task, depth: usize, cache: &FormattingCache) -> String {
    let fmt = cache.task(&task.text);

    // Content priority: explicit edit, cached original, plain text.
    let mut content = match (&task.edited_raw, fmt) {
        (Some(raw), _) => raw.clone(),
        (None, Some(fmt)) => fmt.raw.clone(),
        (None, None) => task.text.clone(),
    };
    if let Some(id) = &task.task_id {
        if !identity::has_task_id(&content) {
            content = format!("{} <!-- task-id: {} -->", content.trim_end(), id);
        }
    }

    // The cached indent is only trustworthy while it still maps to the
    // task's current depth; a moved task gets the canonical two spaces
    // per level.
    let indent = match fmt {
        Some(f) if f.indent.len() / 2 == depth => f.indent.clone(),
        _ => "  ".repeat(depth),
    };
    let marker = fmt.map(|f| f.marker).unwrap_or(task.marker);
    let state = if task.checked { 'x' } else { ' ' };

    format!("{}{} [{}] {}", indent, marker, state, content)
}
