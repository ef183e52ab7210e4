//! Selection model and selection-derived queries.
//!
//! A [`Position`] points into the tree the way browser boundary points do:
//! inside a text node the offset is a byte offset (clamped to char
//! boundaries), inside an element it is a child index. Selections are live
//! references: they are re-validated against the tree at the start of every
//! command and never trusted across mutations.

use editable_dom::{DomTree, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Position) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Both endpoints exist and sit inside the given root.
    pub fn is_valid(&self, tree: &DomTree, root: NodeId) -> bool {
        [self.anchor, self.focus].iter().all(|p| {
            tree.contains(p.node) && (p.node == root || tree.is_ancestor(root, p.node))
        })
    }

    /// Clamp offsets to the containers' current extents.
    pub fn clamped(mut self, tree: &DomTree) -> Self {
        for point in [&mut self.anchor, &mut self.focus] {
            point.offset = clamp_offset(tree, point.node, point.offset);
        }
        self
    }

    /// Endpoints in document order.
    pub fn ordered(&self, tree: &DomTree) -> (Position, Position) {
        if boundary_key(tree, self.anchor) <= boundary_key(tree, self.focus) {
            (self.anchor, self.focus)
        } else {
            (self.focus, self.anchor)
        }
    }
}

pub(crate) fn clamp_offset(tree: &DomTree, node: NodeId, offset: usize) -> usize {
    if let Some(text) = tree.text(node) {
        let mut ix = offset.min(text.len());
        while ix > 0 && !text.is_char_boundary(ix) {
            ix -= 1;
        }
        ix
    } else {
        offset.min(tree.children(node).len())
    }
}

/// Comparable key for a boundary point: the container's path with the offset
/// appended. Lexicographic order on keys matches document order, including
/// the text-node-inside-element cases.
pub(crate) fn boundary_key(tree: &DomTree, pos: Position) -> Vec<usize> {
    let mut key = tree.path(pos.node);
    key.push(pos.offset);
    key
}

/// Key marking the start of an element's extent.
pub(crate) fn node_start_key(tree: &DomTree, node: NodeId) -> Vec<usize> {
    tree.path(node)
}

/// Key marking the end of an element's extent (exclusive).
pub(crate) fn node_end_key(tree: &DomTree, node: NodeId) -> Vec<usize> {
    let mut key = tree.path(node);
    if let Some(last) = key.last_mut() {
        *last += 1;
    }
    key
}

/// Does any part of `node` fall strictly inside the range?
pub(crate) fn node_intersects(
    tree: &DomTree,
    node: NodeId,
    start: &[usize],
    end: &[usize],
) -> bool {
    let node_start = node_start_key(tree, node);
    let node_end = node_end_key(tree, node);
    node_start.as_slice() < end && node_end.as_slice() > start
}

/// Lowest element container shared by both endpoints.
pub(crate) fn common_container(tree: &DomTree, selection: &Selection) -> Option<NodeId> {
    let common = tree.common_ancestor(selection.anchor.node, selection.focus.node)?;
    if tree.is_element(common) {
        Some(common)
    } else {
        tree.parent(common)
    }
}

/// First and last position of a node's content, for collapsing carets.
pub(crate) fn start_of(tree: &DomTree, node: NodeId) -> Position {
    if tree.is_text(node) {
        Position::new(node, 0)
    } else if let Some(first) = tree.first_child(node) {
        start_of(tree, first)
    } else {
        Position::new(node, 0)
    }
}

pub(crate) fn end_of(tree: &DomTree, node: NodeId) -> Position {
    if let Some(text) = tree.text(node) {
        Position::new(node, text.len())
    } else if let Some(last) = tree.last_child(node) {
        end_of(tree, last)
    } else {
        Position::new(node, tree.children(node).len())
    }
}

/// Single saved-range slot per editor instance. Saving overwrites any prior
/// save; restoring does not clear.
#[derive(Debug, Default)]
pub struct RangeStore {
    saved: Option<Selection>,
}

impl RangeStore {
    pub fn save(&mut self, selection: Selection) {
        self.saved = Some(selection);
    }

    pub fn get(&self) -> Option<&Selection> {
        self.saved.as_ref()
    }

    pub fn clear(&mut self) {
        self.saved = None;
    }

    pub fn is_saved(&self) -> bool {
        self.saved.is_some()
    }
}

#[cfg(test)]
mod tests {
    use editable_dom::parse_fragment;

    use super::*;

    #[test]
    fn ordered_swaps_backwards_selection() {
        let tree = parse_fragment("<p>ab</p><p>cd</p>");
        let root = tree.root();
        let first_text = tree.children(tree.children(root)[0])[0];
        let second_text = tree.children(tree.children(root)[1])[0];

        let selection = Selection::new(
            Position::new(second_text, 1),
            Position::new(first_text, 0),
        );
        let (start, end) = selection.ordered(&tree);
        assert_eq!(start.node, first_text);
        assert_eq!(end.node, second_text);
    }

    #[test]
    fn boundary_keys_interleave_text_and_element_offsets() {
        let tree = parse_fragment("<p>ab<strong>cd</strong></p>");
        let root = tree.root();
        let p = tree.children(root)[0];
        let text = tree.children(p)[0];

        // (text, 1) sits before (p, 1) which sits before (p, 2).
        let inside_text = boundary_key(&tree, Position::new(text, 1));
        let between = boundary_key(&tree, Position::new(p, 1));
        let at_end = boundary_key(&tree, Position::new(p, 2));
        assert!(inside_text < between);
        assert!(between < at_end);
    }

    #[test]
    fn intersection_counts_ancestors_but_not_neighbors() {
        let tree = parse_fragment("<p><strong>ab</strong></p><p>cd</p>");
        let root = tree.root();
        let strong = tree.children(tree.children(root)[0])[0];
        let strong_text = tree.children(strong)[0];
        let second = tree.children(root)[1];

        let selection = Selection::new(
            Position::new(strong_text, 0),
            Position::new(strong_text, 1),
        );
        let (start, end) = selection.ordered(&tree);
        let start_key = boundary_key(&tree, start);
        let end_key = boundary_key(&tree, end);

        assert!(node_intersects(&tree, strong, &start_key, &end_key));
        assert!(!node_intersects(&tree, second, &start_key, &end_key));
    }

    #[test]
    fn clamp_respects_char_boundaries() {
        let tree = parse_fragment("<p>héllo</p>");
        let root = tree.root();
        let text = tree.children(tree.children(root)[0])[0];
        // byte 2 is inside the two-byte 'é'
        assert_eq!(clamp_offset(&tree, text, 2), 1);
        assert_eq!(clamp_offset(&tree, text, 100), "héllo".len());
    }

    #[test]
    fn range_store_overwrites_and_clears() {
        let tree = parse_fragment("<p>x</p>");
        let text = tree.children(tree.children(tree.root())[0])[0];
        let mut store = RangeStore::default();
        assert!(!store.is_saved());

        store.save(Selection::collapsed(Position::new(text, 0)));
        store.save(Selection::collapsed(Position::new(text, 1)));
        assert_eq!(store.get().unwrap().focus.offset, 1);

        store.clear();
        assert!(store.get().is_none());
    }
}
