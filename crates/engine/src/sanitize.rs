//! Paste sanitization pipeline.
//!
//! Stages, in order: comment/PI strip, allow-list tag filter, Word markup
//! cleanup, Word list reconstruction, the authoritative attribute pass, and
//! empty-element removal. Output is policy-closed HTML safe for direct
//! insertion.

use std::collections::{HashMap, HashSet};

use editable_dom::{DomTree, NodeData, NodeId, is_void_tag, parse_fragment};
use tracing::debug;

use crate::registry::TagRegistry;
use crate::word::rebuild_word_lists;

#[derive(Debug, Clone)]
pub struct SanitizationPolicy {
    pub allowed_tags: HashSet<String>,
    /// Tag → attribute allow-list; the `"*"` entry applies to every tag.
    pub allowed_attributes: HashMap<String, HashSet<String>>,
    pub allow_data_urls: bool,
    pub allow_external_images: bool,
}

impl Default for SanitizationPolicy {
    fn default() -> Self {
        let allowed_tags = [
            "p",
            "div",
            "br",
            "hr",
            "h1",
            "h2",
            "h3",
            "h4",
            "h5",
            "h6",
            "blockquote",
            "pre",
            "code",
            "ul",
            "ol",
            "li",
            "table",
            "thead",
            "tbody",
            "tr",
            "td",
            "th",
            "strong",
            "em",
            "u",
            "s",
            "sub",
            "sup",
            "a",
            "img",
        ]
        .map(String::from)
        .into_iter()
        .collect();

        let mut allowed_attributes: HashMap<String, HashSet<String>> = HashMap::new();
        let mut insert = |tag: &str, attrs: &[&str]| {
            allowed_attributes.insert(
                tag.to_string(),
                attrs.iter().map(|a| a.to_string()).collect(),
            );
        };
        insert("*", &["class", "style"]);
        insert("a", &["href", "title", "target"]);
        insert("img", &["src", "alt", "width", "height"]);
        insert("td", &["colspan", "rowspan"]);
        insert("th", &["colspan", "rowspan"]);
        insert("ol", &["start", "type"]);

        Self {
            allowed_tags,
            allowed_attributes,
            allow_data_urls: false,
            allow_external_images: true,
        }
    }
}

impl SanitizationPolicy {
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.allowed_tags.contains(tag)
    }

    pub fn allows_attr(&self, tag: &str, attr: &str) -> bool {
        let in_set = |key: &str| {
            self.allowed_attributes
                .get(key)
                .is_some_and(|set| set.contains(attr))
        };
        in_set(tag) || in_set("*")
    }
}

/// Tags whose entire subtree is dangerous or meaningless as content.
const DROP_CONTENT_TAGS: &[&str] = &[
    "script", "style", "head", "title", "meta", "link", "base", "object", "embed", "applet",
    "iframe", "noscript", "xml",
];

/// Run the full pipeline over an HTML string.
pub fn clean_html(html: &str, policy: &SanitizationPolicy, registry: &TagRegistry) -> String {
    let mut tree = parse_fragment(html);
    let root = tree.root();

    strip_comments(&mut tree, root);
    filter_tags(&mut tree, root, policy, registry);
    word_cleanup(&mut tree, root, registry);
    rebuild_word_lists(&mut tree, root);
    enforce_attributes(&mut tree, root, policy);
    drop_empty_elements(&mut tree, root);

    tree.normalize_text(root);
    let out = tree.inner_html(root);
    debug!(
        input_len = html.len(),
        output_len = out.len(),
        "sanitized pasted html"
    );
    out
}

/// Stage 1: comments and processing instructions go unconditionally; this
/// also covers Word's conditional comments.
fn strip_comments(tree: &mut DomTree, root: NodeId) {
    let comments: Vec<NodeId> = tree
        .descendants(root)
        .into_iter()
        .filter(|&n| matches!(tree.data(n), Some(NodeData::Comment(_))))
        .collect();
    for node in comments {
        tree.remove(node);
    }
}

/// Stage 2: allow-list tag filter. Disallowed containers are unwrapped so
/// their content survives; content-dropping tags lose the whole subtree. A
/// tag whose canonical form is allowed is kept for the later upgrade pass.
fn filter_tags(
    tree: &mut DomTree,
    node: NodeId,
    policy: &SanitizationPolicy,
    registry: &TagRegistry,
) {
    let children: Vec<NodeId> = tree.children(node).to_vec();
    for child in children {
        if !tree.contains(child) {
            continue;
        }
        let Some(tag) = tree.tag(child).map(String::from) else {
            continue;
        };
        if DROP_CONTENT_TAGS.contains(&tag.as_str()) {
            tree.remove(child);
            continue;
        }
        filter_tags(tree, child, policy, registry);
        if !policy.allows_tag(&tag) && !policy.allows_tag(registry.canonical(&tag)) {
            let _ = tree.unwrap(child);
        }
    }
}

/// Stage 3: Word-specific cleanup: `mso-*` styles, `Mso*` classes, legacy
/// tag upgrades through the registry aliases, `<font>` stripped.
fn word_cleanup(tree: &mut DomTree, root: NodeId, registry: &TagRegistry) {
    let nodes: Vec<NodeId> = tree.descendants(root).into_iter().collect();
    for node in nodes {
        if !tree.contains(node) {
            continue;
        }
        let Some(tag) = tree.tag(node).map(String::from) else {
            continue;
        };

        if tag == "font" {
            let _ = tree.unwrap(node);
            continue;
        }

        let canonical = registry.canonical(&tag).to_string();
        if canonical != tag {
            let _ = tree.retag(node, &canonical);
        }

        if let Some(style) = tree.attr(node, "style").map(String::from) {
            let kept: Vec<String> = crate::blocks::parse_style(&style)
                .into_iter()
                .filter(|(name, _)| !name.starts_with("mso-"))
                .map(|(name, value)| format!("{name}: {value}"))
                .collect();
            if kept.is_empty() {
                tree.remove_attr(node, "style");
            } else {
                tree.set_attr(node, "style", &kept.join("; "));
            }
        }

        if let Some(class) = tree.attr(node, "class").map(String::from) {
            let kept: Vec<&str> = class
                .split_whitespace()
                .filter(|c| !c.starts_with("Mso"))
                .collect();
            if kept.is_empty() {
                tree.remove_attr(node, "class");
            } else {
                tree.set_attr(node, "class", &kept.join(" "));
            }
        }
    }
}

/// Stage 5: the authoritative attribute pass. Everything not present in the
/// policy for that tag (or under `"*"`) is dropped, whatever earlier stages
/// decided. Image sources are additionally gated by the policy flags.
fn enforce_attributes(tree: &mut DomTree, root: NodeId, policy: &SanitizationPolicy) {
    let nodes: Vec<NodeId> = tree.descendants(root).into_iter().collect();
    for node in nodes {
        if !tree.contains(node) {
            continue;
        }
        let Some(tag) = tree.tag(node).map(String::from) else {
            continue;
        };
        tree.retain_attrs(node, |attr| policy.allows_attr(&tag, &attr.name));

        if tag == "img" {
            let Some(src) = tree.attr(node, "src").map(String::from) else {
                tree.remove(node);
                continue;
            };
            let lowered = src.trim().to_ascii_lowercase();
            let is_data = lowered.starts_with("data:");
            let is_external = lowered.starts_with("http:")
                || lowered.starts_with("https:")
                || lowered.starts_with("//");
            if (is_data && !policy.allow_data_urls)
                || (is_external && !policy.allow_external_images)
                || lowered.starts_with("javascript:")
                || lowered.starts_with("vbscript:")
            {
                tree.remove(node);
            }
        }

        if tag == "a"
            && let Some(href) = tree.attr(node, "href").map(String::from)
        {
            let lowered = href.trim().to_ascii_lowercase();
            if lowered.starts_with("javascript:") || lowered.starts_with("vbscript:") {
                tree.remove_attr(node, "href");
            }
        }
    }
}

/// Stage 6: drop elements left with no renderable content. Table cells are
/// exempt since an empty cell is still structure.
fn drop_empty_elements(tree: &mut DomTree, node: NodeId) {
    let children: Vec<NodeId> = tree.children(node).to_vec();
    for child in children {
        if tree.is_element(child) {
            drop_empty_elements(tree, child);
        }
    }
    let Some(tag) = tree.tag(node).map(String::from) else {
        return;
    };
    if tag == "body" || is_void_tag(&tag) || tag == "td" || tag == "th" {
        return;
    }
    let has_void_descendant = tree
        .descendants(node)
        .into_iter()
        .any(|d| tree.tag(d).is_some_and(is_void_tag));
    if !has_void_descendant && tree.text_content(node).trim().is_empty() {
        tree.remove(node);
    }
}
