//! Read-only snapshot handed to the host after each command. Derived from
//! the DOM on demand; never a source of truth.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorState {
    pub focused: bool,
    pub has_selection: bool,
    pub collapsed: bool,
    pub active_marks: Vec<String>,
    pub block_type: String,
    pub heading_level: u8,
    pub alignment: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub dirty: bool,
    pub source_view: bool,
}

impl EditorState {
    /// JSON form for hosts that ship the state across a process or script
    /// boundary.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
