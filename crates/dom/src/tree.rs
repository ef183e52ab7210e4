use std::cmp::Ordering;

use slab::Slab;
use thiserror::Error;

/// Index-based handle into a [`DomTree`]. Stable across mutations of other
/// nodes; invalidated when the node itself is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element { tag: String, attrs: Vec<Attribute> },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
pub struct DomNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

#[derive(Debug, Error)]
pub enum DomError {
    #[error("node {0:?} is not in the tree")]
    Missing(NodeId),
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
}

/// Owned DOM tree. The root is a synthetic `body` element; fragment content
/// lives in its children.
#[derive(Debug)]
pub struct DomTree {
    nodes: Slab<DomNode>,
    root: NodeId,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    pub fn new() -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(DomNode {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element {
                tag: "body".to_string(),
                attrs: Vec::new(),
            },
        }));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn get(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut DomNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.get(id).map(|n| &n.data)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Text(_)))
    }

    /// Lowercase tag name, or `None` for non-elements.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match self.data(id) {
            Some(NodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(NodeData::Element { attrs, .. }) = self.get_mut(id).map(|n| &mut n.data) {
            if let Some(attr) = attrs.iter_mut().find(|a| a.name == name) {
                attr.value = value.to_string();
            } else {
                attrs.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(NodeData::Element { attrs, .. }) = self.get_mut(id).map(|n| &mut n.data) {
            attrs.retain(|a| a.name != name);
        }
    }

    /// Retain only attributes accepted by the predicate.
    pub fn retain_attrs(&mut self, id: NodeId, mut keep: impl FnMut(&Attribute) -> bool) {
        if let Some(NodeData::Element { attrs, .. }) = self.get_mut(id).map(|n| &mut n.data) {
            attrs.retain(|a| keep(a));
        }
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_with_attrs(tag, Vec::new())
    }

    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: Vec<Attribute>) -> NodeId {
        NodeId(self.nodes.insert(DomNode {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
            },
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        NodeId(self.nodes.insert(DomNode {
            parent: None,
            children: Vec::new(),
            data: NodeData::Text(text.to_string()),
        }))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        NodeId(self.nodes.insert(DomNode {
            parent: None,
            children: Vec::new(),
            data: NodeData::Comment(text.to_string()),
        }))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let ix = self.index_in_parent(id)?;
        ix.checked_sub(1).map(|ix| self.children(parent)[ix])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let ix = self.index_in_parent(id)?;
        self.children(parent).get(ix + 1).copied()
    }

    /// Ancestor chain starting at the node's parent, ending at the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Pre-order traversal of the subtree rooted at `id`, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Child indices from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut out = Vec::new();
        let mut current = id;
        while let Some(ix) = self.index_in_parent(current) {
            out.push(ix);
            current = self.parent(current).unwrap_or(current);
        }
        out.reverse();
        out
    }

    /// Document-order comparison of two nodes.
    pub fn compare(&self, a: NodeId, b: NodeId) -> Ordering {
        self.path(a).cmp(&self.path(b))
    }

    /// Lowest common ancestor. Either node may itself be the answer.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        if a == b {
            return Some(a);
        }
        let mut chain_a = self.ancestors(a);
        chain_a.insert(0, a);
        let mut chain_b = self.ancestors(b);
        chain_b.insert(0, b);
        chain_a.reverse();
        chain_b.reverse();
        let mut found = None;
        for (x, y) in chain_a.iter().zip(chain_b.iter()) {
            if x == y {
                found = Some(*x);
            } else {
                break;
            }
        }
        found
    }

    /// Remove `id` from its parent's child list without deleting the subtree.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|&c| c != id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
    }

    /// Delete `id` and its entire subtree from the arena.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(removed) = self.nodes.try_remove(node.0) {
                stack.extend(removed.children);
            }
        }
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.contains(parent) {
            return Err(DomError::Missing(parent));
        }
        if !self.is_element(parent) {
            return Err(DomError::NotAnElement(parent));
        }
        self.detach(child);
        self.get_mut(parent)
            .ok_or(DomError::Missing(parent))?
            .children
            .push(child);
        self.get_mut(child).ok_or(DomError::Missing(child))?.parent = Some(parent);
        Ok(())
    }

    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
        if !self.is_element(parent) {
            return Err(DomError::NotAnElement(parent));
        }
        self.detach(child);
        let node = self.get_mut(parent).ok_or(DomError::Missing(parent))?;
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        self.get_mut(child).ok_or(DomError::Missing(child))?.parent = Some(parent);
        Ok(())
    }

    pub fn insert_before(&mut self, sibling: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self.parent(sibling).ok_or(DomError::Detached(sibling))?;
        let ix = self
            .index_in_parent(sibling)
            .ok_or(DomError::Detached(sibling))?;
        self.insert_at(parent, ix, new)
    }

    pub fn insert_after(&mut self, sibling: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self.parent(sibling).ok_or(DomError::Detached(sibling))?;
        let ix = self
            .index_in_parent(sibling)
            .ok_or(DomError::Detached(sibling))?;
        self.insert_at(parent, ix + 1, new)
    }

    /// Splice the element's children into its parent at its position and
    /// delete the element itself.
    pub fn unwrap(&mut self, id: NodeId) -> Result<Vec<NodeId>, DomError> {
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        let ix = self.index_in_parent(id).ok_or(DomError::Detached(id))?;
        let children: Vec<NodeId> = self.children(id).to_vec();
        for (offset, &child) in children.iter().enumerate() {
            self.insert_at(parent, ix + offset, child)?;
        }
        self.remove(id);
        Ok(children)
    }

    /// Move every child of `from` to the end of `to`.
    pub fn reparent_children(&mut self, from: NodeId, to: NodeId) -> Result<(), DomError> {
        let children: Vec<NodeId> = self.children(from).to_vec();
        for child in children {
            self.append(to, child)?;
        }
        Ok(())
    }

    /// Change an element's tag in place, keeping attributes and children.
    pub fn retag(&mut self, id: NodeId, new_tag: &str) -> Result<(), DomError> {
        match self.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Element { tag, .. }) => {
                *tag = new_tag.to_ascii_lowercase();
                Ok(())
            }
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::Missing(id)),
        }
    }

    /// Deep copy of a subtree. The copy is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        let data = self.data(id)?.clone();
        let children: Vec<NodeId> = self.children(id).to_vec();
        let copy = NodeId(self.nodes.insert(DomNode {
            parent: None,
            children: Vec::new(),
            data,
        }));
        for child in children {
            if let Some(child_copy) = self.clone_subtree(child) {
                let _ = self.append(copy, child_copy);
            }
        }
        Some(copy)
    }

    /// Copy a subtree from another tree into this one. The copy is detached.
    pub fn import(&mut self, other: &DomTree, id: NodeId) -> Option<NodeId> {
        let data = other.data(id)?.clone();
        let copy = NodeId(self.nodes.insert(DomNode {
            parent: None,
            children: Vec::new(),
            data,
        }));
        for &child in other.children(id) {
            if let Some(child_copy) = self.import(other, child) {
                let _ = self.append(copy, child_copy);
            }
        }
        Some(copy)
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element { .. }) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(NodeData::Text(current)) = self.get_mut(id).map(|n| &mut n.data) {
            *current = text.to_string();
        }
    }

    pub fn append_to_text(&mut self, id: NodeId, extra: &str) -> Result<(), DomError> {
        match self.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Text(text)) => {
                text.push_str(extra);
                Ok(())
            }
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::Missing(id)),
        }
    }

    /// Merge adjacent text siblings and drop empty text nodes, recursively.
    /// Returns the set of removed node ids so callers can re-validate
    /// positions they are holding.
    pub fn normalize_text(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut removed = Vec::new();
        self.normalize_text_in(id, &mut removed);
        removed
    }

    fn normalize_text_in(&mut self, id: NodeId, removed: &mut Vec<NodeId>) {
        let children: Vec<NodeId> = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            match self.data(child) {
                Some(NodeData::Text(text)) => {
                    if text.is_empty() {
                        self.remove(child);
                        removed.push(child);
                        continue;
                    }
                    if let Some(prev) = previous_text {
                        let text = text.clone();
                        let _ = self.append_to_text(prev, &text);
                        self.remove(child);
                        removed.push(child);
                    } else {
                        previous_text = Some(child);
                    }
                }
                Some(NodeData::Element { .. }) => {
                    previous_text = None;
                    self.normalize_text_in(child, removed);
                }
                _ => {
                    previous_text = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_traverse() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        let text = tree.create_text("hello");
        tree.append(tree.root(), p).unwrap();
        tree.append(p, text).unwrap();

        assert_eq!(tree.parent(text), Some(p));
        assert_eq!(tree.children(tree.root()), &[p]);
        assert_eq!(tree.text_content(tree.root()), "hello");
        assert_eq!(tree.path(text), vec![0, 0]);
    }

    #[test]
    fn unwrap_splices_children_in_place() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        let strong = tree.create_element("strong");
        let before = tree.create_text("a");
        let inner = tree.create_text("b");
        let after = tree.create_text("c");
        tree.append(tree.root(), p).unwrap();
        tree.append(p, before).unwrap();
        tree.append(p, strong).unwrap();
        tree.append(strong, inner).unwrap();
        tree.append(p, after).unwrap();

        tree.unwrap(strong).unwrap();

        assert_eq!(tree.children(p), &[before, inner, after]);
        assert!(!tree.contains(strong));
    }

    #[test]
    fn normalize_text_merges_siblings() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        let a = tree.create_text("a");
        let empty = tree.create_text("");
        let b = tree.create_text("b");
        tree.append(tree.root(), p).unwrap();
        tree.append(p, a).unwrap();
        tree.append(p, empty).unwrap();
        tree.append(p, b).unwrap();

        tree.normalize_text(tree.root());

        assert_eq!(tree.children(p).len(), 1);
        assert_eq!(tree.text(a), Some("ab"));
    }

    #[test]
    fn compare_follows_document_order() {
        let mut tree = DomTree::new();
        let first = tree.create_element("p");
        let second = tree.create_element("p");
        let inner = tree.create_text("x");
        tree.append(tree.root(), first).unwrap();
        tree.append(tree.root(), second).unwrap();
        tree.append(second, inner).unwrap();

        assert_eq!(tree.compare(first, second), Ordering::Less);
        assert_eq!(tree.compare(inner, first), Ordering::Greater);
        assert_eq!(tree.common_ancestor(first, inner), Some(tree.root()));
    }

    #[test]
    fn remove_drops_whole_subtree() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let li = tree.create_element("li");
        let text = tree.create_text("item");
        tree.append(tree.root(), ul).unwrap();
        tree.append(ul, li).unwrap();
        tree.append(li, text).unwrap();

        tree.remove(ul);

        assert!(!tree.contains(ul));
        assert!(!tree.contains(li));
        assert!(!tree.contains(text));
        assert!(tree.children(tree.root()).is_empty());
    }
}
