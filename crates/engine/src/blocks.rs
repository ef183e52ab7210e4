//! Block-type conversion: paragraphs, headings, quotes, code blocks and the
//! list promotion/demotion/merge special cases.

use editable_dom::{Attribute, DomTree, NodeId};
use tracing::trace;

use crate::marks::{innermost_blocks_in_range, nearest_block};
use crate::registry::TagRegistry;
use crate::selection::{Selection, common_container, end_of, start_of};

/// Closed set of block conversion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    Blockquote,
    CodeBlock,
    BulletList,
    OrderedList,
}

impl BlockKind {
    pub fn tag(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "p",
            BlockKind::Heading(1) => "h1",
            BlockKind::Heading(2) => "h2",
            BlockKind::Heading(3) => "h3",
            BlockKind::Heading(4) => "h4",
            BlockKind::Heading(5) => "h5",
            BlockKind::Heading(_) => "h6",
            BlockKind::Blockquote => "blockquote",
            BlockKind::CodeBlock => "pre",
            BlockKind::BulletList => "ul",
            BlockKind::OrderedList => "ol",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, BlockKind::BulletList | BlockKind::OrderedList)
    }

    /// The kind a block element currently is, if it maps onto one.
    pub fn of_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "p" => BlockKind::Paragraph,
            "h1" => BlockKind::Heading(1),
            "h2" => BlockKind::Heading(2),
            "h3" => BlockKind::Heading(3),
            "h4" => BlockKind::Heading(4),
            "h5" => BlockKind::Heading(5),
            "h6" => BlockKind::Heading(6),
            "blockquote" => BlockKind::Blockquote,
            "pre" => BlockKind::CodeBlock,
            "ul" => BlockKind::BulletList,
            "ol" => BlockKind::OrderedList,
            _ => return None,
        })
    }
}

/// Block type and heading level reported to the host. List items report as
/// their parent list's tag.
pub(crate) fn block_info(
    tree: &DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: Option<&Selection>,
) -> (String, u8) {
    let fallback = ("paragraph".to_string(), 0);
    let Some(selection) = selection else {
        return fallback;
    };
    let Some(container) = common_container(tree, selection) else {
        return fallback;
    };

    let mut current = container;
    while current != root {
        if let Some(tag) = tree.tag(current) {
            if registry.is_block(tag) {
                if tag == "li" {
                    let list_tag = tree
                        .parent(current)
                        .and_then(|p| tree.tag(p))
                        .filter(|t| registry.is_list(t))
                        .unwrap_or("ul");
                    return (list_tag.to_string(), 0);
                }
                if let Some(level) = heading_level(tag) {
                    return ("heading".to_string(), level);
                }
                return (tag.to_string(), 0);
            }
        }
        match tree.parent(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    fallback
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Replace `block` with a fresh element of the target tag, copying
/// attributes and moving content. `pre` sources get their `code` wrapper
/// unwrapped first; `pre` targets get one added.
fn convert_generic(
    tree: &mut DomTree,
    block: NodeId,
    target: BlockKind,
    attrs: &[(String, String)],
) -> Option<NodeId> {
    let source_tag = tree.tag(block)?.to_string();
    let copied: Vec<Attribute> = tree.attrs(block).to_vec();
    let new_block = tree.create_element_with_attrs(target.tag(), copied);
    for (name, value) in attrs {
        tree.set_attr(new_block, name, value);
    }

    if source_tag == "pre" {
        let code_children: Vec<NodeId> = tree
            .children(block)
            .iter()
            .copied()
            .filter(|&c| tree.tag(c) == Some("code"))
            .collect();
        for code in code_children {
            let _ = tree.unwrap(code);
        }
    }

    tree.insert_before(block, new_block).ok()?;
    if target == BlockKind::CodeBlock {
        let code = tree.create_element("code");
        let _ = tree.append(new_block, code);
        let _ = tree.reparent_children(block, code);
    } else {
        let _ = tree.reparent_children(block, new_block);
    }
    tree.remove(block);
    Some(new_block)
}

/// Unwrap every block-level descendant so the content is purely inline.
fn flatten_blocks_within(tree: &mut DomTree, registry: &TagRegistry, node: NodeId) {
    loop {
        let nested: Vec<NodeId> = tree
            .descendants(node)
            .into_iter()
            .filter(|&d| tree.tag(d).is_some_and(|t| registry.is_block(t)))
            .collect();
        if nested.is_empty() {
            return;
        }
        for block in nested {
            if tree.contains(block) {
                let _ = tree.unwrap(block);
            }
        }
    }
}

/// Convert a non-list block into a single-item list of the target type.
fn wrap_block_in_list(
    tree: &mut DomTree,
    registry: &TagRegistry,
    block: NodeId,
    target: BlockKind,
) -> Option<NodeId> {
    let list = tree.create_element(target.tag());
    let item = tree.create_element("li");
    tree.insert_before(block, list).ok()?;
    let _ = tree.append(list, item);
    let _ = tree.reparent_children(block, item);
    flatten_blocks_within(tree, registry, item);
    tree.remove(block);
    Some(item)
}

/// Move a nested list item one level up: splice it in after the enclosing
/// item of the outer list, removing the inner list if it is left empty.
pub(crate) fn promote_list_item(tree: &mut DomTree, li: NodeId) -> bool {
    let Some(inner_list) = tree.parent(li) else {
        return false;
    };
    if !matches!(tree.tag(inner_list), Some("ul") | Some("ol")) {
        return false;
    }
    let Some(outer_li) = tree.parent(inner_list).filter(|&p| tree.tag(p) == Some("li")) else {
        return false;
    };
    if tree.insert_after(outer_li, li).is_err() {
        return false;
    }
    if tree.children(inner_list).is_empty() {
        tree.remove(inner_list);
    }
    true
}

/// Pull an item out of its list and turn it into the target block.
/// Single-item lists are replaced wholesale; head/tail items leave the list
/// intact; pulling a middle item splits the list in two.
fn flatten_list_item(
    tree: &mut DomTree,
    registry: &TagRegistry,
    li: NodeId,
    target: BlockKind,
    attrs: &[(String, String)],
) -> Option<NodeId> {
    let list = tree.parent(li)?;
    let items = tree.children(list).len();
    let ix = tree.index_in_parent(li)?;

    let copied: Vec<Attribute> = tree.attrs(li).to_vec();
    let new_block = tree.create_element_with_attrs(target.tag(), copied);
    for (name, value) in attrs {
        tree.set_attr(new_block, name, value);
    }

    // Nested sublists inside the item stay lists, as following siblings of
    // the new block.
    let sublists: Vec<NodeId> = tree
        .children(li)
        .iter()
        .copied()
        .filter(|&c| tree.tag(c).is_some_and(|t| registry.is_list(t)))
        .collect();
    for sublist in &sublists {
        tree.detach(*sublist);
    }

    if items <= 1 {
        tree.insert_before(list, new_block).ok()?;
        let _ = tree.reparent_children(li, new_block);
        tree.remove(list);
    } else if ix == 0 {
        tree.insert_before(list, new_block).ok()?;
        let _ = tree.reparent_children(li, new_block);
        tree.remove(li);
    } else if ix == items - 1 {
        tree.insert_after(list, new_block).ok()?;
        let _ = tree.reparent_children(li, new_block);
        tree.remove(li);
    } else {
        let list_tag = tree.tag(list)?.to_string();
        let tail = tree.create_element(&list_tag);
        let moved: Vec<NodeId> = tree.children(list)[ix + 1..].to_vec();
        tree.insert_after(list, new_block).ok()?;
        tree.insert_after(new_block, tail).ok()?;
        for item in moved {
            let _ = tree.append(tail, item);
        }
        let _ = tree.reparent_children(li, new_block);
        tree.remove(li);
    }

    let mut anchor = new_block;
    for sublist in sublists {
        let _ = tree.insert_after(anchor, sublist);
        anchor = sublist;
    }
    Some(new_block)
}

fn convert_list_item(
    tree: &mut DomTree,
    registry: &TagRegistry,
    li: NodeId,
    target: BlockKind,
    attrs: &[(String, String)],
) -> Option<NodeId> {
    let list = tree.parent(li)?;
    let list_tag = tree.tag(list)?.to_string();
    if !registry.is_list(&list_tag) {
        return convert_generic(tree, li, target, attrs);
    }

    if target.is_list() {
        if target.tag() == list_tag {
            // Same list type. Nested items are promoted a level rather than
            // silently flattened to paragraphs; top-level items leave the
            // list as paragraphs.
            let nested = tree
                .parent(list)
                .is_some_and(|outer| tree.tag(outer) == Some("li"));
            if nested {
                return promote_list_item(tree, li).then_some(li);
            }
            return flatten_list_item(tree, registry, li, BlockKind::Paragraph, attrs);
        }
        // Different list type: the entire list is retagged, attributes kept.
        tree.retag(list, target.tag()).ok()?;
        return Some(li);
    }

    flatten_list_item(tree, registry, li, target, attrs)
}

/// Single-block conversion with the toggle rule: converting a block to its
/// own current kind yields a paragraph instead.
pub(crate) fn convert_block(
    tree: &mut DomTree,
    registry: &TagRegistry,
    block: NodeId,
    target: BlockKind,
    attrs: &[(String, String)],
) -> Option<NodeId> {
    let tag = tree.tag(block)?.to_string();
    if tag == "li" {
        return convert_list_item(tree, registry, block, target, attrs);
    }

    let current = BlockKind::of_tag(&tag);
    let effective = match current {
        Some(kind) if kind == target => {
            if target == BlockKind::Paragraph {
                // Paragraph to paragraph is a no-op, not a toggle.
                return Some(block);
            }
            BlockKind::Paragraph
        }
        _ => target,
    };

    if effective.is_list() {
        return wrap_block_in_list(tree, registry, block, effective);
    }
    convert_generic(tree, block, effective, attrs)
}

/// Multi-item conversion for selections that intersect list items: items are
/// grouped by parent list, then each group flattens (same type) or retags
/// (different type) independently.
fn convert_list_items_grouped(
    tree: &mut DomTree,
    registry: &TagRegistry,
    items: Vec<NodeId>,
    target: BlockKind,
    attrs: &[(String, String)],
) -> Vec<NodeId> {
    let mut groups: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
    for li in items {
        let Some(list) = tree.parent(li) else {
            continue;
        };
        match groups.last_mut() {
            Some((current, members)) if *current == list => members.push(li),
            _ => groups.push((list, vec![li])),
        }
    }

    let mut results = Vec::new();
    for (list, members) in groups {
        let Some(list_tag) = tree.tag(list).map(String::from) else {
            continue;
        };
        if target.is_list() && target.tag() != list_tag {
            if tree.retag(list, target.tag()).is_ok() {
                results.extend(members);
            }
            continue;
        }
        for li in members {
            if !tree.contains(li) {
                continue;
            }
            if let Some(node) = convert_list_item(tree, registry, li, target, attrs) {
                results.push(node);
            }
        }
    }
    results
}

/// Merge a run of non-list blocks into one new list, preserving text order.
fn merge_blocks_into_list(
    tree: &mut DomTree,
    registry: &TagRegistry,
    blocks: Vec<NodeId>,
    target: BlockKind,
) -> Option<NodeId> {
    let first = *blocks.first()?;
    let list = tree.create_element(target.tag());
    tree.insert_before(first, list).ok()?;
    for block in blocks {
        let item = tree.create_element("li");
        let _ = tree.append(list, item);
        let _ = tree.reparent_children(block, item);
        flatten_blocks_within(tree, registry, item);
        tree.remove(block);
    }
    Some(list)
}

/// Entry point for the block command: resolves the selection to one or many
/// blocks and returns the selection spanning the converted content.
pub(crate) fn set_block_type(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
    target: BlockKind,
    attrs: &[(String, String)],
) -> Option<Selection> {
    let blocks = innermost_blocks_in_range(tree, root, registry, selection);

    if blocks.len() <= 1 {
        let block = blocks
            .first()
            .copied()
            .or_else(|| nearest_block(tree, root, registry, selection.focus.node))?;
        let converted = convert_block(tree, registry, block, target, attrs)?;
        return Some(Selection::new(
            start_of(tree, converted),
            end_of(tree, converted),
        ));
    }

    trace!(count = blocks.len(), "multi-block conversion");
    let has_items = blocks.iter().any(|&b| tree.tag(b) == Some("li"));

    let converted: Vec<NodeId> = if has_items {
        let (items, others): (Vec<NodeId>, Vec<NodeId>) = blocks
            .into_iter()
            .partition(|&b| tree.tag(b) == Some("li"));
        let mut out = convert_list_items_grouped(tree, registry, items, target, attrs);
        for block in others {
            if tree.contains(block)
                && let Some(node) = convert_block(tree, registry, block, target, attrs)
            {
                out.push(node);
            }
        }
        out
    } else if target.is_list() {
        merge_blocks_into_list(tree, registry, blocks, target)
            .into_iter()
            .collect()
    } else {
        let mut out = Vec::new();
        for block in blocks {
            if tree.contains(block)
                && let Some(node) = convert_block(tree, registry, block, target, attrs)
            {
                out.push(node);
            }
        }
        out
    };

    let live: Vec<NodeId> = converted
        .into_iter()
        .filter(|&n| tree.contains(n))
        .collect();
    let first = *live.first()?;
    let last = *live.last()?;
    Some(Selection::new(start_of(tree, first), end_of(tree, last)))
}

/// Patch inline CSS on the current block's `style` attribute.
pub(crate) fn set_block_style(
    tree: &mut DomTree,
    root: NodeId,
    registry: &TagRegistry,
    selection: &Selection,
    styles: &[(String, String)],
) -> bool {
    let Some(block) = nearest_block(tree, root, registry, selection.focus.node) else {
        return false;
    };
    let mut decls: Vec<(String, String)> = tree
        .attr(block, "style")
        .map(parse_style)
        .unwrap_or_default();
    for (name, value) in styles {
        if let Some(decl) = decls.iter_mut().find(|(n, _)| n == name) {
            decl.1 = value.clone();
        } else {
            decls.push((name.clone(), value.clone()));
        }
    }
    decls.retain(|(_, v)| !v.is_empty());
    if decls.is_empty() {
        tree.remove_attr(block, "style");
    } else {
        let css: Vec<String> = decls.iter().map(|(n, v)| format!("{n}: {v}")).collect();
        tree.set_attr(block, "style", &css.join("; "));
    }
    true
}

pub(crate) fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            (!name.is_empty()).then_some((name, value))
        })
        .collect()
}
