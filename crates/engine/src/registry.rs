//! Per-instance tag maps: tracked inline marks, alias normalization and the
//! block-level tag set. Supplied once at editor construction and immutable
//! for the instance's lifetime.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct TagRegistryConfig {
    /// Inline mark tags reported by state queries and toggled by commands.
    pub tracked_tags: Vec<String>,
    /// Legacy tag → canonical tag (e.g. `b` → `strong`).
    pub aliases: Vec<(String, String)>,
    /// Tags treated as structural blocks.
    pub block_tags: Vec<String>,
}

impl Default for TagRegistryConfig {
    fn default() -> Self {
        Self {
            tracked_tags: ["strong", "em", "u", "s", "code", "sub", "sup", "a"]
                .map(String::from)
                .to_vec(),
            aliases: [("b", "strong"), ("i", "em"), ("strike", "s"), ("del", "s")]
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .to_vec(),
            block_tags: [
                "p",
                "div",
                "h1",
                "h2",
                "h3",
                "h4",
                "h5",
                "h6",
                "blockquote",
                "pre",
                "li",
                "td",
                "th",
                "ul",
                "ol",
                "table",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Debug)]
pub struct TagRegistry {
    tracked: HashSet<String>,
    aliases: HashMap<String, String>,
    blocks: HashSet<String>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new(TagRegistryConfig::default())
    }
}

impl TagRegistry {
    pub fn new(config: TagRegistryConfig) -> Self {
        Self {
            tracked: config.tracked_tags.into_iter().collect(),
            aliases: config.aliases.into_iter().collect(),
            blocks: config.block_tags.into_iter().collect(),
        }
    }

    /// Canonical form of a tag name. Unaliased tags map to themselves.
    pub fn canonical<'a>(&'a self, tag: &'a str) -> &'a str {
        self.aliases.get(tag).map(String::as_str).unwrap_or(tag)
    }

    pub fn is_tracked(&self, tag: &str) -> bool {
        self.tracked.contains(self.canonical(tag))
    }

    pub fn is_block(&self, tag: &str) -> bool {
        self.blocks.contains(tag)
    }

    pub fn is_list(&self, tag: &str) -> bool {
        tag == "ul" || tag == "ol"
    }

    pub fn tracked_tags(&self) -> impl Iterator<Item = &str> {
        self.tracked.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_normalize_to_canonical() {
        let registry = TagRegistry::default();
        assert_eq!(registry.canonical("b"), "strong");
        assert_eq!(registry.canonical("i"), "em");
        assert_eq!(registry.canonical("strong"), "strong");
        assert_eq!(registry.canonical("span"), "span");
    }

    #[test]
    fn tracked_checks_go_through_aliases() {
        let registry = TagRegistry::default();
        assert!(registry.is_tracked("b"));
        assert!(registry.is_tracked("strong"));
        assert!(!registry.is_tracked("span"));
    }

    #[test]
    fn block_set_is_extensible() {
        let mut config = TagRegistryConfig::default();
        config.block_tags.push("section".to_string());
        let registry = TagRegistry::new(config);
        assert!(registry.is_block("section"));
        assert!(registry.is_block("li"));
        assert!(!registry.is_block("strong"));
    }
}
