use editable_engine::{Command, Editor, EditorOptions, NodeId, Position, Selection};
use pretty_assertions::assert_eq;

fn editor(html: &str) -> Editor {
    Editor::new(html, EditorOptions::default())
}

fn find_text(ed: &Editor, needle: &str) -> NodeId {
    let tree = ed.tree();
    tree.descendants(ed.root())
        .into_iter()
        .find(|&n| tree.text(n) == Some(needle))
        .unwrap_or_else(|| panic!("no text node {needle:?} in {}", ed.html()))
}

fn select(ed: &mut Editor, needle: &str, start: usize, end: usize) {
    let node = find_text(ed, needle);
    ed.set_selection(Selection::new(
        Position::new(node, start),
        Position::new(node, end),
    ));
}

#[test]
fn toggle_strong_wraps_only_the_selected_range() {
    let mut ed = editor("<p>abcde</p>");
    select(&mut ed, "abcde", 1, 3);

    assert!(ed.execute(Command::ToggleMark("strong".into())));
    assert_eq!(ed.html(), "<p>a<strong>bc</strong>de</p>");
    assert_eq!(ed.active_marks(), vec!["strong".to_string()]);
}

#[test]
fn toggle_is_an_involution() {
    let mut ed = editor("<p>abcde</p>");
    select(&mut ed, "abcde", 1, 3);

    assert!(ed.execute(Command::ToggleMark("strong".into())));
    assert!(ed.execute(Command::ToggleMark("strong".into())));
    assert_eq!(ed.html(), "<p>abcde</p>");
    assert!(ed.active_marks().is_empty());
}

#[test]
fn legacy_alias_toggles_the_canonical_mark() {
    let mut ed = editor("<p><strong>bold</strong> text</p>");
    select(&mut ed, "bold", 0, 4);

    // `b` and `strong` are the same mark, so toggling `b` removes it.
    assert!(ed.execute(Command::ToggleMark("b".into())));
    assert_eq!(ed.html(), "<p>bold text</p>");
}

#[test]
fn collapsed_selection_refuses_mark_application() {
    let mut ed = editor("<p>abcde</p>");
    select(&mut ed, "abcde", 2, 2);

    assert!(!ed.execute(Command::ToggleMark("em".into())));
    assert_eq!(ed.html(), "<p>abcde</p>");
}

#[test]
fn mark_spanning_two_blocks_wraps_each_block_separately() {
    let mut ed = editor("<p>one</p><p>two</p>");
    let first = find_text(&ed, "one");
    let second = find_text(&ed, "two");
    ed.set_selection(Selection::new(
        Position::new(first, 1),
        Position::new(second, 2),
    ));

    assert!(ed.execute(Command::ToggleMark("em".into())));
    assert_eq!(
        ed.html(),
        "<p>o<em>ne</em></p><p><em>tw</em>o</p>"
    );
}

#[test]
fn wrap_and_unwrap_a_link() {
    let mut ed = editor("<p>click here</p>");
    select(&mut ed, "click here", 6, 10);

    assert!(ed.execute(Command::WrapSelection {
        tag: "a".into(),
        attrs: vec![("href".into(), "https://example.com".into())],
    }));
    assert_eq!(
        ed.html(),
        "<p>click <a href=\"https://example.com\">here</a></p>"
    );
    assert_eq!(ed.link_at_cursor().as_deref(), Some("https://example.com"));

    assert!(ed.execute(Command::UnwrapSelection { tag: "a".into() }));
    assert_eq!(ed.html(), "<p>click here</p>");
    assert!(ed.link_at_cursor().is_none());
}

#[test]
fn clear_formatting_strips_nested_marks() {
    let mut ed = editor("<p><strong><em>both</em></strong></p>");
    select(&mut ed, "both", 0, 4);

    assert!(ed.execute(Command::ClearFormatting));
    assert_eq!(ed.html(), "<p>both</p>");
    assert!(ed.active_marks().is_empty());
}

#[test]
fn clear_formatting_leaves_marks_outside_the_selection() {
    let mut ed = editor("<p><em>a</em>mid<strong>b</strong></p>");
    select(&mut ed, "a", 0, 1);

    assert!(ed.execute(Command::ClearFormatting));
    assert_eq!(ed.html(), "<p>amid<strong>b</strong></p>");
}

#[test]
fn removing_a_mark_from_inside_splits_nothing_extra() {
    // The whole <strong> intersects, so the whole element unwraps.
    let mut ed = editor("<p><strong>abcdef</strong></p>");
    select(&mut ed, "abcdef", 2, 4);

    assert!(ed.execute(Command::ToggleMark("strong".into())));
    assert_eq!(ed.html(), "<p>abcdef</p>");
}
