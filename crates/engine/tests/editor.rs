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
fn construction_sanitizes_the_initial_document() {
    let ed = editor("<script>alert(1)</script><p><b>hi</b></p>");
    assert_eq!(ed.html(), "<p><strong>hi</strong></p>");
}

#[test]
fn insert_html_replaces_the_selected_range() {
    let mut ed = editor("<p>abcd</p>");
    select(&mut ed, "abcd", 1, 3);

    assert!(ed.execute(Command::InsertHtml("<strong>X</strong>".into())));
    assert_eq!(ed.html(), "<p>a<strong>X</strong>d</p>");
}

#[test]
fn inserted_html_is_sanitized() {
    let mut ed = editor("<p>ab</p>");
    select(&mut ed, "ab", 1, 1);

    assert!(ed.execute(Command::InsertHtml(
        "<em onclick=\"evil()\">ok</em><script>boom()</script>".into()
    )));
    assert_eq!(ed.html(), "<p>a<em>ok</em>b</p>");
}

#[test]
fn insert_without_selection_is_refused() {
    let mut ed = editor("<p>ab</p>");
    assert!(!ed.execute(Command::InsertHtml("<em>x</em>".into())));
    assert_eq!(ed.html(), "<p>ab</p>");
}

#[test]
fn saved_selection_survives_selection_loss() {
    let mut ed = editor("<p>abcde</p>");
    select(&mut ed, "abcde", 1, 3);
    assert!(ed.execute(Command::SaveSelection));

    ed.clear_selection();
    assert!(!ed.state().has_selection);

    assert!(ed.execute(Command::RestoreSelection));
    assert!(ed.state().has_selection);
    assert!(ed.execute(Command::ToggleMark("strong".into())));
    assert_eq!(ed.html(), "<p>a<strong>bc</strong>de</p>");
}

#[test]
fn clearing_the_saved_selection_empties_the_slot() {
    let mut ed = editor("<p>x</p>");
    select(&mut ed, "x", 0, 1);
    assert!(ed.execute(Command::SaveSelection));
    assert!(ed.execute(Command::ClearSavedSelection));
    assert!(!ed.execute(Command::ClearSavedSelection));
    assert!(!ed.execute(Command::RestoreSelection));
}

#[test]
fn stale_selections_are_dropped_not_trusted() {
    let mut ed = editor("<p>abcde</p>");
    select(&mut ed, "abcde", 0, 5);
    assert!(ed.execute(Command::SaveSelection));

    // Replacing the document invalidates every node id.
    ed.set_html("<p>new</p>");
    assert!(!ed.execute(Command::RestoreSelection));
    assert!(!ed.execute(Command::ToggleMark("strong".into())));
}

#[test]
fn select_link_at_cursor_selects_the_whole_link() {
    let mut ed = editor("<p>go <a href=\"https://example.com\">there</a> now</p>");
    let text = find_text(&ed, "there");
    ed.set_selection(Selection::collapsed(Position::new(text, 2)));

    assert!(ed.execute(Command::SelectLinkAtCursor));
    let sel = ed.selection().cloned().unwrap();
    assert!(!sel.is_collapsed());
    assert_eq!(ed.link_at_cursor().as_deref(), Some("https://example.com"));
}

#[test]
fn select_image_at_cursor_wraps_the_element() {
    let mut ed = editor("<p>a<img src=\"https://example.com/x.png\">b</p>");
    let p = ed.tree().children(ed.root())[0];
    // Caret boundary right before the image.
    ed.set_selection(Selection::collapsed(Position::new(p, 1)));

    assert!(ed.execute(Command::SelectImageAtCursor));
    assert_eq!(
        ed.image_at_cursor().as_deref(),
        Some("https://example.com/x.png")
    );
    let sel = ed.selection().cloned().unwrap();
    assert_eq!(sel.focus.offset - sel.anchor.offset, 1);
}

#[test]
fn select_all_spans_the_document() {
    let mut ed = editor("<p>one</p><p>two</p>");
    ed.select_all();
    assert!(ed.execute(Command::ToggleMark("em".into())));
    assert_eq!(ed.html(), "<p><em>one</em></p><p><em>two</em></p>");
}

#[test]
fn clean_command_reruns_the_pipeline() {
    let mut ed = editor("<p>keep</p>");
    // Nothing to fix: the command reports no change.
    assert!(!ed.execute(Command::CleanHtml));
}

#[test]
fn set_text_escapes_markup() {
    let mut ed = editor("");
    ed.set_text("a < b & c");
    assert_eq!(ed.html(), "<p>a &lt; b &amp; c</p>");
    assert_eq!(ed.text(), "a < b & c");
}

#[test]
fn state_snapshot_reflects_the_selection() {
    let mut ed = editor("<h2><em>styled</em></h2>");
    let text = find_text(&ed, "styled");
    ed.set_selection(Selection::new(
        Position::new(text, 0),
        Position::new(text, 6),
    ));
    ed.set_focused(true);

    let state = ed.state();
    assert!(state.focused);
    assert!(state.has_selection);
    assert!(!state.collapsed);
    assert_eq!(state.active_marks, vec!["em".to_string()]);
    assert_eq!(state.block_type, "heading");
    assert_eq!(state.heading_level, 2);
    assert!(!state.dirty);
    assert!(!state.source_view);
}

#[test]
fn state_serializes_to_json() {
    let ed = editor("<p>x</p>");
    let json: serde_json::Value = serde_json::from_str(&ed.state().to_json()).unwrap();
    assert_eq!(json["block_type"], "paragraph");
    assert_eq!(json["can_undo"], false);
    assert_eq!(json["has_selection"], false);
}

#[test]
fn two_editors_share_nothing() {
    let mut a = editor("<p>alpha</p>");
    let mut b = editor("<p>beta</p>");

    select(&mut a, "alpha", 0, 5);
    assert!(a.execute(Command::SaveSelection));
    assert!(a.execute(Command::ToggleMark("strong".into())));

    assert_eq!(b.html(), "<p>beta</p>");
    assert!(!b.state().can_undo);
    assert!(!b.execute(Command::RestoreSelection));
}
