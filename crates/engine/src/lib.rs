//! Selection-aware document mutation engine for `contentEditable`-style
//! editing surfaces.
//!
//! The host owns one [`Editor`] per editing surface and drives it through the
//! closed [`Command`] enum, reading back an [`EditorState`] snapshot after
//! each command. The DOM tree is the single source of truth; every derived
//! value (active marks, block type, undo availability) is recomputed on
//! demand and never cached across mutations.

mod blocks;
mod editor;
mod history;
mod marks;
mod registry;
mod sanitize;
mod selection;
mod session;
mod state;
mod surgery;
mod word;

pub use editable_dom::{DomTree, NodeId};

pub use blocks::BlockKind;
pub use editor::{Command, Editor, EditorOptions};
pub use history::HistoryStack;
pub use registry::{TagRegistry, TagRegistryConfig};
pub use sanitize::{SanitizationPolicy, clean_html};
pub use selection::{Position, RangeStore, Selection};
pub use state::EditorState;
