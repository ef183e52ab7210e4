//! Range surgery primitives shared by the mark and block processors.
//!
//! The central operation is boundary lifting: turning an arbitrary boundary
//! point (possibly deep inside nested inline elements or in the middle of a
//! text node) into a child index of a chosen container, splitting text nodes
//! and inline wrappers as required. Wrapping, extraction and block splitting
//! are all expressed on top of it.

use editable_dom::{Attribute, DomTree, NodeId};

use crate::selection::{Position, clamp_offset};

/// The child of `container` on the path down to `node` (or `node` itself).
pub(crate) fn child_on_path(tree: &DomTree, container: NodeId, node: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        let parent = tree.parent(current)?;
        if parent == container {
            return Some(current);
        }
        current = parent;
    }
}

fn shallow_clone(tree: &mut DomTree, id: NodeId) -> Option<NodeId> {
    let tag = tree.tag(id)?.to_string();
    let attrs: Vec<Attribute> = tree.attrs(id).to_vec();
    Some(tree.create_element_with_attrs(&tag, attrs))
}

/// Materialize a boundary point as a child index of `container`, splitting
/// whatever sits in the way. Content strictly before the boundary ends up in
/// `children[..index]`.
pub(crate) fn lift_boundary(tree: &mut DomTree, container: NodeId, pos: Position) -> usize {
    if pos.node == container {
        return pos.offset.min(tree.children(container).len());
    }
    let Some(child) = child_on_path(tree, container, pos.node) else {
        return tree.children(container).len();
    };
    let ix = tree.index_in_parent(child).unwrap_or(0);

    if child == pos.node && tree.is_text(child) {
        let offset = clamp_offset(tree, child, pos.offset);
        let text = tree.text(child).unwrap_or("").to_string();
        if offset == 0 {
            return ix;
        }
        if offset >= text.len() {
            return ix + 1;
        }
        tree.set_text(child, &text[..offset]);
        let right = tree.create_text(&text[offset..]);
        let _ = tree.insert_after(child, right);
        return ix + 1;
    }

    if !tree.is_element(child) {
        return ix;
    }

    let inner = lift_boundary(tree, child, pos);
    if inner == 0 {
        ix
    } else if inner >= tree.children(child).len() {
        ix + 1
    } else {
        let Some(tail) = shallow_clone(tree, child) else {
            return ix + 1;
        };
        let moved: Vec<NodeId> = tree.children(child)[inner..].to_vec();
        let _ = tree.insert_after(child, tail);
        for node in moved {
            let _ = tree.append(tail, node);
        }
        ix + 1
    }
}

/// Lift both boundaries of a range onto `container`, returning the covered
/// child index window. A marker keeps the end index stable while the start
/// boundary is being lifted.
pub(crate) fn lift_range(
    tree: &mut DomTree,
    container: NodeId,
    start: Position,
    end: Position,
) -> (usize, usize) {
    let end_ix = lift_boundary(tree, container, end);
    let marker = tree.create_comment("range-end");
    let _ = tree.insert_at(container, end_ix, marker);

    let start_ix = lift_boundary(tree, container, start);

    let end_ix = tree.index_in_parent(marker).unwrap_or(start_ix);
    tree.remove(marker);
    (start_ix.min(end_ix), end_ix)
}

/// Wrap the child window of `container` covered by the range in a fresh
/// element. Returns the wrapper, or `None` when the range covers nothing.
pub(crate) fn wrap_range_in(
    tree: &mut DomTree,
    container: NodeId,
    start: Position,
    end: Position,
    tag: &str,
    attrs: &[(String, String)],
) -> Option<NodeId> {
    let (start_ix, end_ix) = lift_range(tree, container, start, end);
    if start_ix >= end_ix {
        return None;
    }
    let covered: Vec<NodeId> = tree.children(container)[start_ix..end_ix].to_vec();
    let wrapper = tree.create_element(tag);
    for (name, value) in attrs {
        tree.set_attr(wrapper, name, value);
    }
    tree.insert_at(container, start_ix, wrapper).ok()?;
    for node in covered {
        let _ = tree.append(wrapper, node);
    }
    Some(wrapper)
}

/// Detach the nodes covered by the range window in `container`. Returns the
/// window's start index and the detached nodes in document order.
pub(crate) fn extract_range_in(
    tree: &mut DomTree,
    container: NodeId,
    start: Position,
    end: Position,
) -> (usize, Vec<NodeId>) {
    let (start_ix, end_ix) = lift_range(tree, container, start, end);
    let covered: Vec<NodeId> = tree.children(container)[start_ix..end_ix].to_vec();
    for &node in &covered {
        tree.detach(node);
    }
    (start_ix, covered)
}

/// Split `block` at a boundary point into two sibling elements of the same
/// tag. Returns the new trailing block.
pub(crate) fn split_block_at(tree: &mut DomTree, block: NodeId, pos: Position) -> Option<NodeId> {
    let ix = lift_boundary(tree, block, pos);
    let tail = shallow_clone(tree, block)?;
    let moved: Vec<NodeId> = tree.children(block)[ix..].to_vec();
    tree.insert_after(block, tail).ok()?;
    for node in moved {
        let _ = tree.append(tail, node);
    }
    Some(tail)
}

/// True when the boundary point sits at the very start of `block`'s content.
pub(crate) fn at_block_start(tree: &DomTree, block: NodeId, pos: Position) -> bool {
    if pos.offset != 0 {
        return false;
    }
    let mut current = pos.node;
    while current != block {
        let Some(parent) = tree.parent(current) else {
            return false;
        };
        if tree.index_in_parent(current) != Some(0) {
            return false;
        }
        current = parent;
    }
    true
}

/// True when the boundary point sits at the very end of `block`'s content.
pub(crate) fn at_block_end(tree: &DomTree, block: NodeId, pos: Position) -> bool {
    let end = match tree.text(pos.node) {
        Some(text) => pos.offset >= text.len(),
        None => pos.offset >= tree.children(pos.node).len(),
    };
    if !end {
        return false;
    }
    let mut current = pos.node;
    while current != block {
        let Some(parent) = tree.parent(current) else {
            return false;
        };
        let last = tree.children(parent).len().saturating_sub(1);
        if tree.index_in_parent(current) != Some(last) {
            return false;
        }
        current = parent;
    }
    true
}
