// Undo/Redo for timetable moves
//
// Every confirmed move is kept with its previous interval. Undoing commits
// the previous interval again; redoing commits the move again. Both go
// through the normal commit round trip, so history only changes once the
// server confirms.

use crate::models::commit::CommitRequest;

/// A confirmed move
#[derive(Debug, Clone, PartialEq)]
pub struct MoveCommand {
    request: CommitRequest,
}

impl MoveCommand {
    pub fn new(request: CommitRequest) -> Self {
        Self { request }
    }

    /// Request that applies the move (do/redo)
    pub fn execute(&self) -> CommitRequest {
        self.request.clone()
    }

    /// Request that restores the previous interval
    pub fn undo(&self) -> CommitRequest {
        self.request.inverse()
    }

    pub fn description(&self) -> String {
        format!(
            "Move entry {} to {}",
            self.request.entry_id,
            self.request.start.format("%H:%M")
        )
    }
}

/// Which history step an in-flight commit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    /// A fresh move from a drag, resize or the times dialog
    Record,
    Undo,
    Redo,
}

/// Manager for undo/redo stacks
#[derive(Debug)]
pub struct UndoManager {
    undo_stack: Vec<MoveCommand>,
    redo_stack: Vec<MoveCommand>,
    /// Maximum number of commands to keep in history
    max_history: usize,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history: 50,
        }
    }

    /// Record a move the server confirmed
    pub fn push(&mut self, request: CommitRequest) {
        self.redo_stack.clear();
        self.undo_stack.push(MoveCommand::new(request));

        while self.undo_stack.len() > self.max_history {
            self.undo_stack.remove(0);
        }
    }

    /// Request undoing the last move. History moves once the server confirms
    /// through [`UndoManager::confirm`].
    pub fn undo_request(&self) -> Option<CommitRequest> {
        self.undo_stack.last().map(MoveCommand::undo)
    }

    pub fn redo_request(&self) -> Option<CommitRequest> {
        self.redo_stack.last().map(MoveCommand::execute)
    }

    /// Update the stacks after the server confirmed a history step
    pub fn confirm(&mut self, step: HistoryStep, request: &CommitRequest) {
        match step {
            HistoryStep::Record => self.push(request.clone()),
            HistoryStep::Undo => {
                if let Some(command) = self.undo_stack.pop() {
                    self.redo_stack.push(command);
                }
            }
            HistoryStep::Redo => {
                if let Some(command) = self.redo_stack.pop() {
                    self.undo_stack.push(command);
                }
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the next command to undo (for menu display)
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(MoveCommand::description)
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(MoveCommand::description)
    }

    /// Clear all history; used when the whole timetable is reloaded
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
