//! The editor facade: one instance per editing surface, driven through the
//! closed [`Command`] enum.
//!
//! Every command follows the same shape: validate the live selection against
//! the current tree, mutate, reselect, snapshot. Commands that change nothing
//! return `false` and leave the history untouched.

use editable_dom::{DomTree, NodeId, parse_fragment};
use tracing::debug;

use crate::blocks::{self, BlockKind};
use crate::history::{DEFAULT_HISTORY_LIMIT, HistoryStack};
use crate::marks;
use crate::registry::{TagRegistry, TagRegistryConfig};
use crate::sanitize::{SanitizationPolicy, clean_html};
use crate::selection::{Position, RangeStore, Selection, common_container, end_of, start_of};
use crate::session;
use crate::state::EditorState;
use crate::surgery::extract_range_in;

/// Everything the host can ask the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Sanitize the fragment and insert it at the selection, replacing any
    /// selected content.
    InsertHtml(String),
    ToggleMark(String),
    SetBlockType {
        kind: BlockKind,
        attrs: Vec<(String, String)>,
    },
    SetBlockStyle(Vec<(String, String)>),
    /// Wrap the selection in an arbitrary inline element, e.g. a link.
    WrapSelection {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    /// Remove every intersecting instance of the tag (alias-aware).
    UnwrapSelection {
        tag: String,
    },
    ClearFormatting,
    /// Re-run the sanitization pipeline over the whole document.
    CleanHtml,
    Undo,
    Redo,
    SaveSelection,
    RestoreSelection,
    ClearSavedSelection,
    SelectLinkAtCursor,
    SelectImageAtCursor,
}

#[derive(Debug, Clone)]
pub struct EditorOptions {
    pub policy: SanitizationPolicy,
    pub tags: TagRegistryConfig,
    pub history_limit: usize,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            policy: SanitizationPolicy::default(),
            tags: TagRegistryConfig::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// A single editing surface: the DOM tree, the live selection, the saved
/// range slot, and the undo log. All state is per instance; two editors
/// never share anything.
#[derive(Debug)]
pub struct Editor {
    tree: DomTree,
    root: NodeId,
    selection: Option<Selection>,
    saved: RangeStore,
    registry: TagRegistry,
    history: HistoryStack,
    policy: SanitizationPolicy,
    dirty: bool,
    source_view: bool,
    focused: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new("", EditorOptions::default())
    }
}

impl Editor {
    pub fn new(html: &str, options: EditorOptions) -> Self {
        let registry = TagRegistry::new(options.tags);
        let cleaned = clean_html(html, &options.policy, &registry);
        let tree = parse_fragment(&cleaned);
        let root = tree.root();
        let mut history = HistoryStack::new(options.history_limit);
        history.record(&tree.inner_html(root));

        Self {
            tree,
            root,
            selection: None,
            saved: RangeStore::default(),
            registry,
            history,
            policy: options.policy,
            dirty: false,
            source_view: false,
            focused: false,
        }
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn html(&self) -> String {
        self.tree.inner_html(self.root)
    }

    /// Replace the document. The content is sanitized, the history reset to
    /// the new baseline, and the dirty flag cleared.
    pub fn set_html(&mut self, html: &str) {
        let cleaned = clean_html(html, &self.policy, &self.registry);
        self.tree = parse_fragment(&cleaned);
        self.root = self.tree.root();
        self.selection = None;
        self.saved.clear();
        self.history.clear();
        self.history.record(&self.tree.inner_html(self.root));
        self.dirty = false;
    }

    pub fn text(&self) -> String {
        self.tree.text_content(self.root)
    }

    /// Whitespace-only documents with no embedded media count as empty.
    pub fn is_empty(&self) -> bool {
        self.text().trim().is_empty()
            && !self
                .tree
                .descendants(self.root)
                .into_iter()
                .any(|n| self.tree.tag(n).is_some_and(editable_dom::is_void_tag))
    }

    /// Replace the document with plain text, encoded so markup characters
    /// come through literally.
    pub fn set_text(&mut self, text: &str) {
        let encoded = html_escape::encode_text(text);
        self.set_html(&format!("<p>{encoded}</p>"));
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Adopt a selection reported by the host. Invalid endpoints clear the
    /// selection instead of poisoning later commands.
    pub fn set_selection(&mut self, selection: Selection) {
        if selection.is_valid(&self.tree, self.root) {
            self.selection = Some(selection.clamped(&self.tree));
        } else {
            self.selection = None;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn select_all(&mut self) {
        self.selection = Some(Selection::new(
            start_of(&self.tree, self.root),
            end_of(&self.tree, self.root),
        ));
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_source_view(&mut self, on: bool) {
        self.source_view = on;
    }

    /// Run one command. Returns whether the document or selection changed.
    pub fn execute(&mut self, command: Command) -> bool {
        debug!(?command, "execute");
        self.revalidate_selection();

        match command {
            Command::InsertHtml(html) => self.mutating(|ed, sel| {
                let sel = sel?;
                ed.insert_html_at(&sel, &html)
            }),
            Command::ToggleMark(mark) => self.mutating(|ed, sel| {
                let sel = sel?;
                marks::toggle_mark(&mut ed.tree, ed.root, &ed.registry, &sel, &mark)
            }),
            Command::SetBlockType { kind, attrs } => self.mutating(|ed, sel| {
                let sel = sel?;
                blocks::set_block_type(&mut ed.tree, ed.root, &ed.registry, &sel, kind, &attrs)
            }),
            Command::SetBlockStyle(styles) => {
                let Some(sel) = self.selection.clone() else {
                    return false;
                };
                if blocks::set_block_style(&mut self.tree, self.root, &self.registry, &sel, &styles)
                {
                    self.after_mutation();
                    true
                } else {
                    false
                }
            }
            Command::WrapSelection { tag, attrs } => self.mutating(|ed, sel| {
                let sel = sel?;
                marks::apply_mark(&mut ed.tree, ed.root, &ed.registry, &sel, &tag, &attrs)
            }),
            Command::UnwrapSelection { tag } => self.mutating(|ed, sel| {
                let sel = sel?;
                marks::remove_mark(&mut ed.tree, ed.root, &ed.registry, &sel, &tag)
            }),
            Command::ClearFormatting => self.mutating(|ed, sel| {
                let sel = sel?;
                marks::clear_formatting(&mut ed.tree, ed.root, &ed.registry, &sel)
            }),
            Command::CleanHtml => {
                let before = self.html();
                let cleaned = clean_html(&before, &self.policy, &self.registry);
                if cleaned == before {
                    return false;
                }
                self.tree = parse_fragment(&cleaned);
                self.root = self.tree.root();
                self.selection = None;
                self.saved.clear();
                self.after_mutation();
                true
            }
            Command::Undo => self.restore_snapshot(true),
            Command::Redo => self.restore_snapshot(false),
            Command::SaveSelection => match self.selection.clone() {
                Some(sel) => {
                    self.saved.save(sel);
                    true
                }
                None => false,
            },
            Command::RestoreSelection => {
                let Some(saved) = self.saved.get().cloned() else {
                    return false;
                };
                if saved.is_valid(&self.tree, self.root) {
                    self.selection = Some(saved.clamped(&self.tree));
                    true
                } else {
                    false
                }
            }
            Command::ClearSavedSelection => {
                let had = self.saved.is_saved();
                self.saved.clear();
                had
            }
            Command::SelectLinkAtCursor => self.select_ancestor("a"),
            Command::SelectImageAtCursor => self.select_image(),
        }
    }

    /// Handle a structural key press. Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: &keyboard_types::Key, modifiers: keyboard_types::Modifiers) -> bool {
        self.revalidate_selection();
        let Some(sel) = self.selection.clone() else {
            return false;
        };
        match session::handle_key(&mut self.tree, self.root, &self.registry, &sel, key, modifiers)
        {
            Some(next) => {
                self.selection = Some(next.clamped(&self.tree));
                self.after_mutation();
                true
            }
            None => false,
        }
    }

    /// Snapshot of everything the host renders chrome from.
    pub fn state(&self) -> EditorState {
        let (block_type, heading_level) =
            blocks::block_info(&self.tree, self.root, &self.registry, self.selection.as_ref());
        EditorState {
            focused: self.focused,
            has_selection: self.selection.is_some(),
            collapsed: self
                .selection
                .as_ref()
                .is_some_and(Selection::is_collapsed),
            active_marks: self.active_marks(),
            block_type,
            heading_level,
            alignment: self.alignment(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            dirty: self.dirty,
            source_view: self.source_view,
        }
    }

    /// Canonical tracked marks enclosing the selection's common container,
    /// sorted for stable presentation.
    pub fn active_marks(&self) -> Vec<String> {
        let Some(selection) = self.selection.as_ref() else {
            return Vec::new();
        };
        let Some(container) = common_container(&self.tree, selection) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        let mut current = Some(container);
        while let Some(node) = current {
            if let Some(tag) = self.tree.tag(node)
                && self.registry.is_tracked(tag)
            {
                let canonical = self.registry.canonical(tag).to_string();
                if !found.contains(&canonical) {
                    found.push(canonical);
                }
            }
            if node == self.root {
                break;
            }
            current = self.tree.parent(node);
        }
        found.sort();
        found
    }

    pub fn current_block_type(&self) -> String {
        blocks::block_info(&self.tree, self.root, &self.registry, self.selection.as_ref()).0
    }

    pub fn current_heading_level(&self) -> u8 {
        blocks::block_info(&self.tree, self.root, &self.registry, self.selection.as_ref()).1
    }

    /// `href` of the link enclosing the caret, if any.
    pub fn link_at_cursor(&self) -> Option<String> {
        let node = self.enclosing_at_cursor("a")?;
        self.tree.attr(node, "href").map(String::from)
    }

    /// `src` of the image at or around the caret, if any.
    pub fn image_at_cursor(&self) -> Option<String> {
        let node = self.image_node_at_cursor()?;
        self.tree.attr(node, "src").map(String::from)
    }

    fn revalidate_selection(&mut self) {
        if let Some(sel) = self.selection.take()
            && sel.is_valid(&self.tree, self.root)
        {
            self.selection = Some(sel.clamped(&self.tree));
        }
    }

    fn after_mutation(&mut self) {
        let removed = self.tree.normalize_text(self.root);
        if let Some(sel) = self.selection.as_ref()
            && (removed.contains(&sel.anchor.node) || removed.contains(&sel.focus.node))
        {
            self.revalidate_selection();
        }
        self.dirty = true;
        self.history.record(&self.tree.inner_html(self.root));
    }

    fn mutating<F>(&mut self, op: F) -> bool
    where
        F: FnOnce(&mut Self, Option<Selection>) -> Option<Selection>,
    {
        let selection = self.selection.clone();
        match op(self, selection) {
            Some(next) => {
                self.selection = Some(next.clamped(&self.tree));
                self.after_mutation();
                true
            }
            None => false,
        }
    }

    fn insert_html_at(&mut self, selection: &Selection, html: &str) -> Option<Selection> {
        let cleaned = clean_html(html, &self.policy, &self.registry);
        let fragment = parse_fragment(&cleaned);
        let imported: Vec<NodeId> = fragment
            .children(fragment.root())
            .iter()
            .filter_map(|&child| self.tree.import(&fragment, child))
            .collect();
        if imported.is_empty() {
            return None;
        }

        let (start, end) = selection.ordered(&self.tree);
        let container = common_container(&self.tree, selection).unwrap_or(self.root);
        let (start_ix, covered) = extract_range_in(&mut self.tree, container, start, end);
        for node in covered {
            self.tree.remove(node);
        }

        let mut ix = start_ix;
        for node in &imported {
            if self.tree.insert_at(container, ix, *node).is_ok() {
                ix += 1;
            }
        }
        Some(Selection::collapsed(Position::new(container, ix)))
    }

    fn restore_snapshot(&mut self, backwards: bool) -> bool {
        let snapshot = if backwards {
            self.history.undo()
        } else {
            self.history.redo()
        };
        let Some(html) = snapshot.map(String::from) else {
            return false;
        };
        self.tree = parse_fragment(&html);
        self.root = self.tree.root();
        self.selection = None;
        self.saved.clear();
        self.dirty = true;
        true
    }

    fn enclosing_at_cursor(&self, tag: &str) -> Option<NodeId> {
        let selection = self.selection.as_ref()?;
        let mut current = Some(selection.focus.node);
        while let Some(node) = current {
            if self.tree.tag(node) == Some(tag) {
                return Some(node);
            }
            if node == self.root {
                break;
            }
            current = self.tree.parent(node);
        }
        None
    }

    fn image_node_at_cursor(&self) -> Option<NodeId> {
        let selection = self.selection.as_ref()?;
        let focus = selection.focus;
        // An image is never a container, so the caret sits next to it: check
        // the children on either side of the boundary, then the focus node
        // itself for element-selections.
        if self.tree.tag(focus.node) == Some("img") {
            return Some(focus.node);
        }
        if self.tree.is_element(focus.node) {
            let children = self.tree.children(focus.node);
            for ix in [focus.offset, focus.offset.wrapping_sub(1)] {
                if let Some(&child) = children.get(ix)
                    && self.tree.tag(child) == Some("img")
                {
                    return Some(child);
                }
            }
        }
        None
    }

    fn select_ancestor(&mut self, tag: &str) -> bool {
        let Some(node) = self.enclosing_at_cursor(tag) else {
            return false;
        };
        self.selection = Some(Selection::new(
            start_of(&self.tree, node),
            end_of(&self.tree, node),
        ));
        true
    }

    fn select_image(&mut self) -> bool {
        let Some(img) = self.image_node_at_cursor() else {
            return false;
        };
        let Some(parent) = self.tree.parent(img) else {
            return false;
        };
        let Some(ix) = self.tree.index_in_parent(img) else {
            return false;
        };
        // Select the element itself as a child-index range.
        self.selection = Some(Selection::new(
            Position::new(parent, ix),
            Position::new(parent, ix + 1),
        ));
        true
    }

    fn alignment(&self) -> Option<String> {
        let selection = self.selection.as_ref()?;
        let block = marks::nearest_block(
            &self.tree,
            self.root,
            &self.registry,
            selection.focus.node,
        )?;
        if let Some(style) = self.tree.attr(block, "style")
            && let Some((_, value)) = blocks::parse_style(style)
                .into_iter()
                .find(|(name, _)| name == "text-align")
        {
            return Some(value);
        }
        self.tree.attr(block, "align").map(str::to_ascii_lowercase)
    }
}
