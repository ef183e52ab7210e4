//! Inline mark toggling: Inspect → Decide → Mutate → Reselect.
//!
//! Mark identity is canonical: `b` and `strong` are the same mark for both
//! detection and removal, so mixed legacy markup still toggles coherently.

use editable_dom::{DomTree, NodeId};
use tracing::trace;

use crate::registry::TagRegistry;
use crate::selection::{
    Selection, boundary_key, common_container, end_of, node_intersects, start_of,
};
use crate::surgery::wrap_range_in;

/// Every element of the canonical mark kind intersecting the selection,
/// ancestors included.
pub(crate) fn mark_elements_in_range(
    tree: &DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
    mark: &str,
) -> Vec<NodeId> {
    let canonical = registry.canonical(mark).to_string();
    let (start, end) = selection.ordered(tree);
    let start_key = boundary_key(tree, start);
    let end_key = boundary_key(tree, end);

    tree.descendants(root)
        .into_iter()
        .filter(|&node| {
            tree.tag(node)
                .is_some_and(|tag| registry.canonical(tag) == canonical)
                && node_intersects(tree, node, &start_key, &end_key)
        })
        .collect()
}

pub(crate) fn mark_present(
    tree: &DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
    mark: &str,
) -> bool {
    !mark_elements_in_range(tree, root, registry, selection, mark).is_empty()
}

/// Nearest enclosing block of a node, bounded by the editable root. Falls
/// back to the root-level child on the node's path.
pub(crate) fn nearest_block(
    tree: &DomTree,
    root: NodeId,
    registry: &TagRegistry,
    node: NodeId,
) -> Option<NodeId> {
    let mut current = node;
    while current != root {
        if tree.tag(current).is_some_and(|t| registry.is_block(t)) {
            return Some(current);
        }
        current = tree.parent(current)?;
    }
    None
}

fn block_or_root_child(
    tree: &DomTree,
    root: NodeId,
    registry: &TagRegistry,
    node: NodeId,
) -> NodeId {
    nearest_block(tree, root, registry, node).unwrap_or_else(|| {
        crate::surgery::child_on_path(tree, root, node).unwrap_or(root)
    })
}

/// Unwrap the given elements deepest-first so nested unwraps never
/// invalidate an ancestor that is still pending. Returns the new selection
/// spanning the affected blocks.
fn unwrap_and_reselect(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
    mut targets: Vec<NodeId>,
) -> Option<Selection> {
    if targets.is_empty() {
        return None;
    }
    targets.sort_by_key(|&node| std::cmp::Reverse(tree.path(node).len()));

    let (start, end) = selection.ordered(tree);
    let first_block = block_or_root_child(tree, root, registry, start.node);
    let last_block = block_or_root_child(tree, root, registry, end.node);

    for node in targets {
        if tree.contains(node) {
            let _ = tree.unwrap(node);
        }
    }
    tree.normalize_text(root);

    let anchor = if tree.contains(first_block) {
        start_of(tree, first_block)
    } else {
        start_of(tree, root)
    };
    let focus = if tree.contains(last_block) {
        end_of(tree, last_block)
    } else {
        end_of(tree, root)
    };
    Some(Selection::new(anchor, focus))
}

/// Remove every intersecting instance of the mark.
pub(crate) fn remove_mark(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
    mark: &str,
) -> Option<Selection> {
    let targets = mark_elements_in_range(tree, root, registry, selection, mark);
    unwrap_and_reselect(tree, root, registry, selection, targets)
}

/// The innermost blocks intersecting the range, document order. A block
/// qualifies when none of its own block descendants intersect the range.
pub(crate) fn innermost_blocks_in_range(
    tree: &DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
) -> Vec<NodeId> {
    let (start, end) = selection.ordered(tree);
    let start_key = boundary_key(tree, start);
    let end_key = boundary_key(tree, end);

    let intersecting: Vec<NodeId> = tree
        .descendants(root)
        .into_iter()
        .filter(|&node| {
            tree.tag(node).is_some_and(|t| registry.is_block(t))
                && node_intersects(tree, node, &start_key, &end_key)
        })
        .collect();

    intersecting
        .iter()
        .copied()
        .filter(|&node| !intersecting.iter().any(|&other| tree.is_ancestor(node, other)))
        .collect()
}

/// Apply a mark over the selection. Refused on a collapsed selection: a mark
/// cannot wrap an empty caret without leaving zero-width elements behind.
pub(crate) fn apply_mark(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
    mark: &str,
    attrs: &[(String, String)],
) -> Option<Selection> {
    if selection.is_collapsed() {
        trace!(mark, "mark application refused on collapsed selection");
        return None;
    }
    let canonical = registry.canonical(mark).to_string();
    let (start, end) = selection.ordered(tree);
    let container = common_container(tree, selection)?;

    if container != root {
        let wrapper = wrap_range_in(tree, container, start, end, &canonical, attrs)?;
        return Some(Selection::new(start_of(tree, wrapper), end_of(tree, wrapper)));
    }

    // Selection spans multiple top-level blocks: wrap each block's covered
    // window separately, since one wrapper straddling block boundaries is
    // not legal markup.
    let blocks = innermost_blocks_in_range(tree, root, registry, selection);
    if blocks.is_empty() {
        let wrapper = wrap_range_in(tree, root, start, end, &canonical, attrs)?;
        return Some(Selection::new(start_of(tree, wrapper), end_of(tree, wrapper)));
    }

    let mut wrappers = Vec::new();
    for block in blocks {
        let block_start = if block == start.node || tree.is_ancestor(block, start.node) {
            start
        } else {
            start_of(tree, block)
        };
        let block_end = if block == end.node || tree.is_ancestor(block, end.node) {
            end
        } else {
            end_of(tree, block)
        };
        if let Some(wrapper) = wrap_range_in(tree, block, block_start, block_end, &canonical, attrs)
        {
            wrappers.push(wrapper);
        }
    }

    let first = *wrappers.first()?;
    let last = *wrappers.last()?;
    Some(Selection::new(start_of(tree, first), end_of(tree, last)))
}

pub(crate) fn toggle_mark(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
    mark: &str,
) -> Option<Selection> {
    if mark_present(tree, root, registry, selection, mark) {
        remove_mark(tree, root, registry, selection, mark)
    } else {
        apply_mark(tree, root, registry, selection, mark, &[])
    }
}

/// Strip every tracked mark intersecting the selection. Targets for all
/// marks are collected against the original range before the first unwrap,
/// so removing one mark never widens what the next one sees.
pub(crate) fn clear_formatting(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
) -> Option<Selection> {
    let mut targets: Vec<NodeId> = Vec::new();
    for mark in registry.tracked_tags() {
        for node in mark_elements_in_range(tree, root, registry, selection, mark) {
            if !targets.contains(&node) {
                targets.push(node);
            }
        }
    }
    unwrap_and_reselect(tree, root, registry, selection, targets)
}
