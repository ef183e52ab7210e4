//! Stage 4 of the paste pipeline: reconstructing semantic lists from the
//! flat paragraphs Microsoft Word exports.
//!
//! Detection is pattern-matching over leading marker text (bullet glyphs,
//! `1.` / `a)` / roman numerals) with nesting inferred from `margin-left` /
//! `text-indent`. This is a best-effort heuristic set with no claim of
//! covering every Word export variant.

use std::sync::LazyLock;

use editable_dom::{DomTree, NodeId};
use regex::Regex;

use crate::blocks::parse_style;

static BULLET_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[•·▪◦○‣§o\*\-]\s+").expect("bullet marker regex"));

static ORDERED_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\(?(?:\d{1,3}|[a-zA-Z]|[ivxlcdm]{1,6}|[IVXLCDM]{1,6})[.)\]]\s+")
        .expect("ordered marker regex")
});

static MSO_LIST_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"level(\d+)").expect("mso level regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Bullet,
    Ordered,
}

#[derive(Debug, Clone, Copy)]
struct ListCandidate {
    kind: MarkerKind,
    level: u8,
}

fn detect_candidate(tree: &DomTree, block: NodeId) -> Option<ListCandidate> {
    if tree.tag(block) != Some("p") {
        return None;
    }
    let text = tree.text_content(block);
    let kind = if BULLET_MARKER.is_match(&text) {
        MarkerKind::Bullet
    } else if ORDERED_MARKER.is_match(&text) {
        MarkerKind::Ordered
    } else {
        return None;
    };
    Some(ListCandidate {
        kind,
        level: indent_level(tree, block),
    })
}

/// Nesting level, 1-based. `mso-list: l0 level2 lfo1` wins when present;
/// otherwise the level is derived from the left indent, one level per 36pt
/// (Word's default list indent step).
fn indent_level(tree: &DomTree, block: NodeId) -> u8 {
    let Some(style) = tree.attr(block, "style") else {
        return 1;
    };
    let decls = parse_style(style);

    if let Some((_, value)) = decls.iter().find(|(name, _)| name == "mso-list")
        && let Some(caps) = MSO_LIST_LEVEL.captures(value)
        && let Some(level) = caps.get(1).and_then(|m| m.as_str().parse::<u8>().ok())
    {
        return level.clamp(1, 9);
    }

    let indent: f32 = decls
        .iter()
        .filter(|(name, _)| name == "margin-left" || name == "text-indent")
        .filter_map(|(_, value)| parse_length_pt(value))
        .sum();
    // Word indents the first level by 36pt already, so 36pt ⇒ level 1.
    ((indent / 36.0).floor() as u8).clamp(1, 9)
}

fn parse_length_pt(value: &str) -> Option<f32> {
    let value = value.trim();
    let (number, unit) = value
        .find(|c: char| c.is_ascii_alphabetic())
        .map(|ix| value.split_at(ix))?;
    let number: f32 = number.trim().parse().ok()?;
    match unit {
        "pt" => Some(number),
        "px" => Some(number * 0.75),
        "em" => Some(number * 12.0),
        "in" => Some(number * 72.0),
        "cm" => Some(number * 28.35),
        _ => None,
    }
}

/// Remove the leading marker text from the block's first text run.
fn strip_marker(tree: &mut DomTree, block: NodeId, kind: MarkerKind) {
    let pattern: &Regex = match kind {
        MarkerKind::Bullet => &BULLET_MARKER,
        MarkerKind::Ordered => &ORDERED_MARKER,
    };
    // Only the first non-blank text run can hold the marker.
    let first_text = tree
        .descendants(block)
        .into_iter()
        .find(|&n| tree.text(n).is_some_and(|t| !t.trim().is_empty()));
    if let Some(node) = first_text {
        let text = tree.text(node).unwrap_or("").to_string();
        if let Some(m) = pattern.find(&text) {
            tree.set_text(node, &text[m.end()..]);
        }
    }
}

/// Scan the root's children for contiguous runs of marker paragraphs and
/// fold each run into a single semantic list. Items deeper than level one
/// carry their level as a class so styling can restore the nesting.
pub(crate) fn rebuild_word_lists(tree: &mut DomTree, root: NodeId) {
    let mut runs: Vec<Vec<(NodeId, ListCandidate)>> = Vec::new();
    let mut current: Vec<(NodeId, ListCandidate)> = Vec::new();

    for &child in tree.children(root).to_vec().iter() {
        match detect_candidate(tree, child) {
            Some(candidate) => current.push((child, candidate)),
            None => {
                if current.len() > 1 {
                    runs.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() > 1 {
        runs.push(current);
    }

    for run in runs {
        let (first_block, first) = run[0];
        let list_tag = match first.kind {
            MarkerKind::Bullet => "ul",
            MarkerKind::Ordered => "ol",
        };
        let list = tree.create_element(list_tag);
        if tree.insert_before(first_block, list).is_err() {
            continue;
        }
        for (block, candidate) in run {
            strip_marker(tree, block, candidate.kind);
            let item = tree.create_element("li");
            if candidate.level > 1 {
                tree.set_attr(item, "class", &format!("list-level-{}", candidate.level));
            }
            let _ = tree.append(list, item);
            let _ = tree.reparent_children(block, item);
            tree.remove(block);
        }
    }
}
