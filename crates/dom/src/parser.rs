//! html5ever sink that builds a [`DomTree`] arena directly.

use std::borrow::Cow;
use std::cell::{Cell, Ref, RefCell};

use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeBuilderOpts, TreeSink};
use html5ever::{LocalName, ParseOpts, QualName, local_name, namespace_url, ns};

use crate::tree::{Attribute, DomTree, NodeId};

struct FragmentSink {
    tree: RefCell<DomTree>,
    errors: RefCell<Vec<Cow<'static, str>>>,
    quirks_mode: Cell<QuirksMode>,
    // Scratch slot so elem_name can hand out a borrowed QualName.
    name_cache: RefCell<Option<QualName>>,
}

impl FragmentSink {
    fn new() -> Self {
        Self {
            tree: RefCell::new(DomTree::new()),
            errors: RefCell::new(Vec::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
            name_cache: RefCell::new(None),
        }
    }
}

fn convert_attr(attr: html5ever::Attribute) -> Attribute {
    Attribute {
        name: attr.name.local.to_string().to_ascii_lowercase(),
        value: attr.value.to_string(),
    }
}

impl TreeSink for FragmentSink {
    type Output = DomTree;
    type Handle = NodeId;

    type ElemName<'a>
        = Ref<'a, QualName>
    where
        Self: 'a;

    fn finish(self) -> DomTree {
        let mut tree = self.tree.into_inner();
        // The fragment tree builder parents parsed content under a synthetic
        // <html> element; lift it out so fragment children sit on the root.
        let root = tree.root();
        let wrappers: Vec<NodeId> = tree
            .children(root)
            .iter()
            .copied()
            .filter(|&c| tree.tag(c) == Some("html"))
            .collect();
        for wrapper in wrappers {
            let _ = tree.unwrap(wrapper);
        }
        tree
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.errors.borrow_mut().push(msg);
    }

    fn get_document(&self) -> NodeId {
        self.tree.borrow().root()
    }

    fn elem_name<'a>(&'a self, target: &'a NodeId) -> Self::ElemName<'a> {
        let tag = self
            .tree
            .borrow()
            .tag(*target)
            .expect("elem_name called on a non-element node")
            .to_string();
        *self.name_cache.borrow_mut() = Some(QualName::new(None, ns!(html), LocalName::from(tag)));
        Ref::map(self.name_cache.borrow(), |cache| {
            cache.as_ref().expect("name cache was just filled")
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<html5ever::Attribute>,
        _flags: ElementFlags,
    ) -> NodeId {
        let attrs = attrs.into_iter().map(convert_attr).collect();
        self.tree
            .borrow_mut()
            .create_element_with_attrs(&name.local, attrs)
    }

    fn create_comment(&self, text: StrTendril) -> NodeId {
        self.tree.borrow_mut().create_comment(&text)
    }

    // Processing instructions are represented as comments so the cleaning
    // pipeline strips them in the same pass.
    fn create_pi(&self, target: StrTendril, data: StrTendril) -> NodeId {
        self.tree
            .borrow_mut()
            .create_comment(&format!("?{target} {data}?"))
    }

    fn append(&self, parent: &NodeId, child: NodeOrText<NodeId>) {
        let mut tree = self.tree.borrow_mut();
        match child {
            NodeOrText::AppendNode(id) => {
                let _ = tree.append(*parent, id);
            }
            NodeOrText::AppendText(text) => {
                // Merge into a trailing text node when there is one.
                let last = tree.last_child(*parent);
                let appended =
                    last.is_some_and(|last| tree.append_to_text(last, &text).is_ok());
                if !appended {
                    let node = tree.create_text(&text);
                    let _ = tree.append(*parent, node);
                }
            }
        }
    }

    fn append_before_sibling(&self, sibling: &NodeId, new_node: NodeOrText<NodeId>) {
        let mut tree = self.tree.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(id) => {
                let _ = tree.insert_before(*sibling, id);
            }
            NodeOrText::AppendText(text) => {
                let prev = tree.prev_sibling(*sibling);
                let appended =
                    prev.is_some_and(|prev| tree.append_to_text(prev, &text).is_ok());
                if !appended {
                    let node = tree.create_text(&text);
                    let _ = tree.insert_before(*sibling, node);
                }
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &NodeId,
        prev_element: &NodeId,
        child: NodeOrText<NodeId>,
    ) {
        let has_parent = self.tree.borrow().parent(*element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &NodeId) -> NodeId {
        *target
    }

    fn same_node(&self, x: &NodeId, y: &NodeId) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    fn add_attrs_if_missing(&self, target: &NodeId, attrs: Vec<html5ever::Attribute>) {
        let mut tree = self.tree.borrow_mut();
        for attr in attrs.into_iter().map(convert_attr) {
            if tree.attr(*target, &attr.name).is_none() {
                tree.set_attr(*target, &attr.name, &attr.value);
            }
        }
    }

    fn remove_from_parent(&self, target: &NodeId) {
        self.tree.borrow_mut().detach(*target);
    }

    fn reparent_children(&self, node: &NodeId, new_parent: &NodeId) {
        let _ = self.tree.borrow_mut().reparent_children(*node, *new_parent);
    }
}

/// Parse an HTML fragment in `body` context into an owned tree.
pub fn parse_fragment(html: &str) -> DomTree {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    html5ever::driver::parse_fragment(
        FragmentSink::new(),
        opts,
        QualName::new(None, ns!(html), local_name!("body")),
        Vec::new(),
    )
    .one(html)
}
