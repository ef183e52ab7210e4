//! An owned HTML DOM tree with index-based node references.
//!
//! The tree is arena-backed: nodes live in a slab, hold a `Vec` of child ids
//! and an id reference to their parent. All references handed out are plain
//! [`NodeId`]s which callers must re-validate after mutations.

mod parser;
mod serialize;
mod tree;

pub use parser::parse_fragment;
pub use serialize::is_void_tag;
pub use tree::{Attribute, DomError, DomNode, DomTree, NodeData, NodeId};
