/// The mutation surface: every user-facing board action, applied to the
/// in-memory tree only. No I/O happens here; the save coordinator picks
/// the tree up afterwards. Columns are addressed by (board, column)
/// index, tasks by their internal id.
use crate::types::{Board, BoardSet, Column, Task};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Board index {index} out of range (0-{max})")]
    BoardOutOfRange { index: usize, max: usize },

    #[error("Column index {index} out of range (0-{max})")]
    ColumnOutOfRange { index: usize, max: usize },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cannot move task {0} into its own subtree")]
    MoveIntoSelf(String),
}

/// Where a dragged task lands in its destination column.
#[derive(Debug, Clone, PartialEq)]
pub enum DropPosition {
    /// Onto another task: the moved subtree becomes that task's last
    /// child, one level deeper.
    Onto(String),
    /// Between root tasks, before the given one; the subtree stays at
    /// root level.
    Before(String),
    /// At the bottom of the column, root level.
    AtEnd,
}

impl BoardSet {
    fn board_mut(&mut self, index: usize) -> Result<&mut Board, ModelError> {
        let max = self.boards.len().saturating_sub(1);
        self.boards
            .get_mut(index)
            .ok_or(ModelError::BoardOutOfRange { index, max })
    }

    fn column_mut(&mut self, board: usize, col: usize) -> Result<&mut Column, ModelError> {
        let board = self.board_mut(board)?;
        let max = board.columns.len().saturating_sub(1);
        board
            .columns
            .get_mut(col)
            .ok_or(ModelError::ColumnOutOfRange { index: col, max })
    }

    fn find_task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.boards
            .iter_mut()
            .flat_map(|b| b.columns.iter_mut())
            .find_map(|c| find_in_mut(&mut c.tasks, task_id))
    }

    /// Rename a column. A no-op when the title is unchanged; otherwise
    /// the pre-rename title is recorded (first rename only) and duplicate
    /// flags are recomputed. Duplicates are flagged, never rejected.
    pub fn rename_column(
        &mut self,
        board: usize,
        col: usize,
        new_title: &str,
    ) -> Result<(), ModelError> {
        let board = self.board_mut(board)?;
        let max = board.columns.len().saturating_sub(1);
        let column = board
            .columns
            .get_mut(col)
            .ok_or(ModelError::ColumnOutOfRange { index: col, max })?;
        if column.title == new_title {
            return Ok(());
        }
        if column.original_title.is_none() {
            column.original_title = Some(column.title.clone());
        }
        column.title = new_title.to_string();
        flag_duplicates(board);
        Ok(())
    }

    /// Remove a column and all its tasks. Irreversible; the caller has
    /// already confirmed with the user.
    pub fn delete_column(&mut self, board: usize, col: usize) -> Result<Column, ModelError> {
        let board = self.board_mut(board)?;
        let max = board.columns.len().saturating_sub(1);
        if col >= board.columns.len() {
            return Err(ModelError::ColumnOutOfRange { index: col, max });
        }
        let removed = board.columns.remove(col);
        flag_duplicates(board);
        Ok(removed)
    }

    /// Append a new empty column to a board.
    pub fn add_column(&mut self, board: usize, title: &str) -> Result<(), ModelError> {
        let board = self.board_mut(board)?;
        board.columns.push(Column::new(title));
        flag_duplicates(board);
        Ok(())
    }

    /// Prepend a new unchecked root task (most-recent-first) and return
    /// its internal id.
    pub fn add_task(&mut self, board: usize, col: usize, text: &str) -> Result<String, ModelError> {
        let column = self.column_mut(board, col)?;
        let task = Task::new(text);
        let id = task.id.clone();
        column.tasks.insert(0, task);
        Ok(id)
    }

    /// Replace a task's text. The edited value is stored as the raw
    /// markdown so serialization emits it verbatim instead of any cached
    /// original.
    pub fn rename_task(&mut self, task_id: &str, new_text: &str) -> Result<(), ModelError> {
        let task = self
            .find_task_mut(task_id)
            .ok_or_else(|| ModelError::TaskNotFound(task_id.to_string()))?;
        task.text = new_text.to_string();
        task.edited_raw = Some(new_text.to_string());
        task.ensure_task_id();
        Ok(())
    }

    /// Flip a task's checkbox and return the new state.
    pub fn toggle_task(&mut self, task_id: &str) -> Result<bool, ModelError> {
        let task = self
            .find_task_mut(task_id)
            .ok_or_else(|| ModelError::TaskNotFound(task_id.to_string()))?;
        task.checked = !task.checked;
        Ok(task.checked)
    }

    /// Relocate a task together with its whole subtree. All preconditions
    /// are checked before the tree is touched, so a failed move leaves
    /// the model intact.
    pub fn move_task(
        &mut self,
        task_id: &str,
        dest_board: usize,
        dest_col: usize,
        position: DropPosition,
    ) -> Result<(), ModelError> {
        let moving = self
            .find_task(task_id)
            .ok_or_else(|| ModelError::TaskNotFound(task_id.to_string()))?;
        if let DropPosition::Onto(target) | DropPosition::Before(target) = &position {
            if target == task_id || subtree_contains(moving, target) {
                return Err(ModelError::MoveIntoSelf(task_id.to_string()));
            }
        }
        {
            let max = self.boards.len().saturating_sub(1);
            let board = self.boards.get(dest_board).ok_or(ModelError::BoardOutOfRange {
                index: dest_board,
                max,
            })?;
            let max = board.columns.len().saturating_sub(1);
            let column = board.columns.get(dest_col).ok_or(ModelError::ColumnOutOfRange {
                index: dest_col,
                max,
            })?;
            match &position {
                DropPosition::Onto(target) => {
                    find_in(&column.tasks, target)
                        .ok_or_else(|| ModelError::TaskNotFound(target.clone()))?;
                }
                DropPosition::Before(target) => {
                    // The anchor must be a root task of the destination.
                    column
                        .tasks
                        .iter()
                        .find(|t| t.id == *target)
                        .ok_or_else(|| ModelError::TaskNotFound(target.clone()))?;
                }
                DropPosition::AtEnd => {}
            }
        }

        let mut moved = self
            .detach_task(task_id)
            .ok_or_else(|| ModelError::TaskNotFound(task_id.to_string()))?;
        moved.ensure_task_id();

        let column = &mut self.boards[dest_board].columns[dest_col];
        match position {
            DropPosition::Onto(target) => {
                // Verified above; the target cannot be inside the moved
                // subtree, so it is still in place after the detach.
                let target = find_in_mut(&mut column.tasks, &target)
                    .ok_or_else(|| ModelError::TaskNotFound(target.clone()))?;
                target.children.push(moved);
            }
            DropPosition::Before(target) => {
                let pos = column
                    .tasks
                    .iter()
                    .position(|t| t.id == target)
                    .unwrap_or(column.tasks.len());
                column.tasks.insert(pos, moved);
            }
            DropPosition::AtEnd => column.tasks.push(moved),
        }
        Ok(())
    }

    fn detach_task(&mut self, task_id: &str) -> Option<Task> {
        self.boards
            .iter_mut()
            .flat_map(|b| b.columns.iter_mut())
            .find_map(|c| detach(&mut c.tasks, task_id))
    }
}

/// Recompute the duplicate flag for every column in a board
/// (case-insensitive sibling comparison).
fn flag_duplicates(board: &mut Board) {
    let titles: Vec<String> = board
        .columns
        .iter()
        .map(|c| c.title.to_lowercase())
        .collect();
    for (column, title) in board.columns.iter_mut().zip(&titles) {
        column.duplicate = titles.iter().filter(|t| *t == title).count() > 1;
    }
}

fn find_in<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    for task in tasks {
        if task.id == id {
            return Some(task);
        }
        if let Some(found) = find_in(&task.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(tasks: &'a mut [Task], id: &str) -> Option<&'a mut Task> {
    for task in tasks {
        if task.id == id {
            return Some(task);
        }
        if let Some(found) = find_in_mut(&mut task.children, id) {
            return Some(found);
        }
    }
    None
}

fn detach(tasks: &mut Vec<Task>, id: &str) -> Option<Task> {
    if let Some(pos) = tasks.iter().position(|t| t.id == id) {
        return Some(tasks.remove(pos));
    }
    tasks
        .iter_mut()
        .find_map(|t| detach(&mut t.children, id))
}

fn subtree_contains(task: &Task, id: &str) -> bool {
    find_in(&task.children, id).is_some()
}
