//! Keyboard-driven structural edits: Enter, Backspace/Delete at block
//! boundaries, Tab in lists and tables. Thin orchestration over the block
//! processor and the surgery primitives.

use editable_dom::{DomTree, NodeId};
use keyboard_types::{Key, Modifiers, NamedKey};
use tracing::trace;

use crate::blocks::{BlockKind, convert_block, promote_list_item};
use crate::marks::nearest_block;
use crate::registry::TagRegistry;
use crate::selection::{Position, Selection, end_of, start_of};
use crate::surgery::{at_block_end, at_block_start, lift_boundary, split_block_at};

/// Handle a structural key. Returns the post-edit selection when the key was
/// consumed; `None` hands the event back to the host's default handling.
pub(crate) fn handle_key(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
    key: &Key,
    modifiers: Modifiers,
) -> Option<Selection> {
    if !selection.is_collapsed() {
        return None;
    }
    let caret = selection.focus;

    match key {
        Key::Named(NamedKey::Enter) if modifiers.contains(Modifiers::SHIFT) => {
            line_break(tree, root, registry, caret)
        }
        Key::Named(NamedKey::Enter) => block_break(tree, root, registry, caret),
        Key::Named(NamedKey::Backspace) => backspace_boundary(tree, root, registry, caret),
        Key::Named(NamedKey::Delete) => delete_boundary(tree, root, registry, caret),
        Key::Named(NamedKey::Tab) => {
            let outdent = modifiers.contains(Modifiers::SHIFT);
            tab_key(tree, root, registry, caret, outdent)
        }
        _ => None,
    }
}

fn enclosing(tree: &DomTree, root: NodeId, node: NodeId, tags: &[&str]) -> Option<NodeId> {
    let mut current = node;
    while current != root {
        if tree.tag(current).is_some_and(|t| tags.contains(&t)) {
            return Some(current);
        }
        current = tree.parent(current)?;
    }
    None
}

/// Shift+Enter: soft line break. A trailing `<br>` is doubled so the break
/// is actually visible.
fn line_break(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    caret: Position,
) -> Option<Selection> {
    let block = nearest_block(tree, root, registry, caret.node).unwrap_or(root);
    let ix = lift_boundary(tree, block, caret);
    let br = tree.create_element("br");
    tree.insert_at(block, ix, br).ok()?;
    if ix + 1 == tree.children(block).len() {
        let extra = tree.create_element("br");
        let _ = tree.insert_after(br, extra);
    }
    Some(Selection::collapsed(Position::new(block, ix + 1)))
}

fn block_break(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    caret: Position,
) -> Option<Selection> {
    let block = nearest_block(tree, root, registry, caret.node)?;

    if tree.tag(block) == Some("li") {
        if tree.text_content(block).trim().is_empty() {
            // Enter on an empty item exits the list.
            trace!("empty list item: exiting list");
            if promote_list_item(tree, block) {
                return Some(Selection::collapsed(start_of(tree, block)));
            }
            let paragraph = convert_block(tree, registry, block, BlockKind::Paragraph, &[])?;
            return Some(Selection::collapsed(start_of(tree, paragraph)));
        }
        let tail = split_block_at(tree, block, caret)?;
        return Some(Selection::collapsed(start_of_or_self(tree, tail)));
    }

    if matches!(tree.tag(block), Some("td") | Some("th")) {
        return None;
    }

    let at_end = at_block_end(tree, block, caret);
    let tail = split_block_at(tree, block, caret)?;
    // Enter at the end of a heading starts a paragraph, not another heading.
    if at_end
        && tree
            .tag(tail)
            .is_some_and(|t| matches!(t, "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
    {
        let _ = tree.retag(tail, "p");
    }
    Some(Selection::collapsed(start_of_or_self(tree, tail)))
}

fn start_of_or_self(tree: &DomTree, node: NodeId) -> Position {
    if tree.children(node).is_empty() {
        Position::new(node, 0)
    } else {
        start_of(tree, node)
    }
}

fn backspace_boundary(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    caret: Position,
) -> Option<Selection> {
    let block = nearest_block(tree, root, registry, caret.node)?;
    if !at_block_start(tree, block, caret) {
        return None;
    }

    if tree.tag(block) == Some("li") {
        let list = tree.parent(block)?;
        let nested = tree
            .parent(list)
            .is_some_and(|outer| tree.tag(outer) == Some("li"));
        if nested {
            // Outdent: splice after the enclosing item, drop the emptied list.
            promote_list_item(tree, block).then(|| ())?;
            return Some(Selection::collapsed(start_of(tree, block)));
        }
        if tree.index_in_parent(block) == Some(0) {
            let paragraph = convert_block(tree, registry, block, BlockKind::Paragraph, &[])?;
            return Some(Selection::collapsed(start_of_or_self(tree, paragraph)));
        }
        let previous = tree.prev_sibling(block)?;
        let junction = end_of(tree, previous);
        let _ = tree.reparent_children(block, previous);
        tree.remove(block);
        tree.normalize_text(previous);
        return Some(Selection::collapsed(junction));
    }

    let previous = tree.prev_sibling(block)?;
    let target = if tree.tag(previous).is_some_and(|t| registry.is_list(t)) {
        tree.last_child(previous)?
    } else if tree.is_element(previous) {
        previous
    } else {
        return None;
    };
    let junction = end_of(tree, target);
    let _ = tree.reparent_children(block, target);
    tree.remove(block);
    tree.normalize_text(target);
    Some(Selection::collapsed(junction))
}

fn delete_boundary(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    caret: Position,
) -> Option<Selection> {
    let block = nearest_block(tree, root, registry, caret.node)?;
    if !at_block_end(tree, block, caret) {
        return None;
    }
    let next = tree.next_sibling(block)?;
    let junction = end_of(tree, block);

    if tree.tag(next).is_some_and(|t| registry.is_list(t)) {
        let first_item = tree.first_child(next)?;
        let _ = tree.reparent_children(first_item, block);
        tree.remove(first_item);
        if tree.children(next).is_empty() {
            tree.remove(next);
        }
    } else if tree.is_element(next) {
        let _ = tree.reparent_children(next, block);
        tree.remove(next);
    } else {
        return None;
    }
    tree.normalize_text(block);
    Some(Selection::collapsed(junction))
}

fn tab_key(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    caret: Position,
    outdent: bool,
) -> Option<Selection> {
    if let Some(cell) = enclosing(tree, root, caret.node, &["td", "th"]) {
        let target = if outdent {
            previous_cell(tree, cell)
        } else {
            next_cell(tree, cell)
        }?;
        return Some(Selection::collapsed(start_of_or_self(tree, target)));
    }

    let li = enclosing(tree, root, caret.node, &["li"])?;
    if outdent {
        if promote_list_item(tree, li) {
            return Some(Selection::collapsed(start_of_or_self(tree, li)));
        }
        let paragraph = convert_block(tree, registry, li, BlockKind::Paragraph, &[])?;
        return Some(Selection::collapsed(start_of_or_self(tree, paragraph)));
    }

    // Indent: nest under the previous item, reusing its trailing sublist
    // when one exists.
    let previous = tree.prev_sibling(li)?;
    if tree.tag(previous) != Some("li") {
        return None;
    }
    let list_tag = tree.parent(li).and_then(|l| tree.tag(l))?.to_string();
    let sublist = match tree.last_child(previous) {
        Some(last) if tree.tag(last) == Some(list_tag.as_str()) => last,
        _ => {
            let created = tree.create_element(&list_tag);
            let _ = tree.append(previous, created);
            created
        }
    };
    tree.append(sublist, li).ok()?;
    Some(Selection::collapsed(start_of_or_self(tree, li)))
}

fn cells_of_table(tree: &DomTree, table: NodeId) -> Vec<NodeId> {
    tree.descendants(table)
        .into_iter()
        .filter(|&n| matches!(tree.tag(n), Some("td") | Some("th")))
        .collect()
}

fn next_cell(tree: &DomTree, cell: NodeId) -> Option<NodeId> {
    let table = table_of(tree, cell)?;
    let cells = cells_of_table(tree, table);
    let ix = cells.iter().position(|&c| c == cell)?;
    cells.get(ix + 1).copied()
}

fn previous_cell(tree: &DomTree, cell: NodeId) -> Option<NodeId> {
    let table = table_of(tree, cell)?;
    let cells = cells_of_table(tree, table);
    let ix = cells.iter().position(|&c| c == cell)?;
    ix.checked_sub(1).map(|ix| cells[ix])
}

fn table_of(tree: &DomTree, cell: NodeId) -> Option<NodeId> {
    let mut current = tree.parent(cell);
    while let Some(node) = current {
        if tree.tag(node) == Some("table") {
            return Some(node);
        }
        current = tree.parent(node);
    }
    None
}
