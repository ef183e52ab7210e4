use editable_engine::{BlockKind, Command, Editor, EditorOptions, NodeId, Position, Selection};
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

fn set_block(ed: &mut Editor, kind: BlockKind) -> bool {
    ed.execute(Command::SetBlockType {
        kind,
        attrs: Vec::new(),
    })
}

#[test]
fn two_paragraphs_merge_into_one_list() {
    let mut ed = editor("<p>one</p><p>two</p>");
    let first = find_text(&ed, "one");
    let second = find_text(&ed, "two");
    ed.set_selection(Selection::new(
        Position::new(first, 0),
        Position::new(second, 3),
    ));

    assert!(set_block(&mut ed, BlockKind::BulletList));
    assert_eq!(ed.html(), "<ul><li>one</li><li>two</li></ul>");
    assert_eq!(ed.current_block_type(), "ul");
}

#[test]
fn single_paragraph_becomes_single_item_list() {
    let mut ed = editor("<p>solo</p>");
    let text = find_text(&ed, "solo");
    ed.set_selection(Selection::collapsed(Position::new(text, 0)));

    assert!(set_block(&mut ed, BlockKind::OrderedList));
    assert_eq!(ed.html(), "<ol><li>solo</li></ol>");
}

#[test]
fn same_list_type_pulls_the_item_out_as_paragraph() {
    let mut ed = editor("<ul><li>one</li><li>two</li></ul>");
    let text = find_text(&ed, "one");
    ed.set_selection(Selection::collapsed(Position::new(text, 0)));

    assert!(set_block(&mut ed, BlockKind::BulletList));
    assert_eq!(ed.html(), "<p>one</p><ul><li>two</li></ul>");
}

#[test]
fn different_list_type_retags_the_whole_list() {
    let mut ed = editor("<ul><li>one</li><li>two</li></ul>");
    let text = find_text(&ed, "one");
    ed.set_selection(Selection::collapsed(Position::new(text, 0)));

    assert!(set_block(&mut ed, BlockKind::OrderedList));
    assert_eq!(ed.html(), "<ol><li>one</li><li>two</li></ol>");
}

#[test]
fn pulling_a_middle_item_splits_the_list() {
    let mut ed = editor("<ul><li>one</li><li>two</li><li>three</li></ul>");
    let text = find_text(&ed, "two");
    ed.set_selection(Selection::collapsed(Position::new(text, 0)));

    assert!(set_block(&mut ed, BlockKind::Heading(2)));
    assert_eq!(
        ed.html(),
        "<ul><li>one</li></ul><h2>two</h2><ul><li>three</li></ul>"
    );
}

#[test]
fn item_with_sublist_keeps_the_sublist_when_flattened() {
    let mut ed = editor("<ul><li>top<ul><li>inner</li></ul></li></ul>");
    let text = find_text(&ed, "top");
    ed.set_selection(Selection::collapsed(Position::new(text, 0)));

    assert!(set_block(&mut ed, BlockKind::Paragraph));
    assert_eq!(ed.html(), "<p>top</p><ul><li>inner</li></ul>");
}

#[test]
fn nested_item_converted_to_same_type_is_promoted() {
    let mut ed = editor("<ul><li>outer<ul><li>inner</li></ul></li></ul>");
    let text = find_text(&ed, "inner");
    ed.set_selection(Selection::collapsed(Position::new(text, 0)));

    assert!(set_block(&mut ed, BlockKind::BulletList));
    assert_eq!(ed.html(), "<ul><li>outer</li><li>inner</li></ul>");
}

#[test]
fn list_items_report_their_parent_list_tag() {
    let mut ed = editor("<ol><li>alpha</li></ol>");
    let text = find_text(&ed, "alpha");
    ed.set_selection(Selection::collapsed(Position::new(text, 1)));

    assert_eq!(ed.current_block_type(), "ol");
    assert_eq!(ed.state().heading_level, 0);
}
