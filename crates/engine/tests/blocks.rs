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

fn caret_in(ed: &mut Editor, needle: &str) {
    let node = find_text(ed, needle);
    ed.set_selection(Selection::collapsed(Position::new(node, 0)));
}

fn set_block(ed: &mut Editor, kind: BlockKind) -> bool {
    ed.execute(Command::SetBlockType {
        kind,
        attrs: Vec::new(),
    })
}

#[test]
fn paragraph_becomes_heading() {
    let mut ed = editor("<p>title</p>");
    caret_in(&mut ed, "title");

    assert!(set_block(&mut ed, BlockKind::Heading(2)));
    assert_eq!(ed.html(), "<h2>title</h2>");
    assert_eq!(ed.current_block_type(), "heading");
    assert_eq!(ed.current_heading_level(), 2);
}

#[test]
fn converting_to_own_type_toggles_back_to_paragraph() {
    let mut ed = editor("<h3>title</h3>");
    caret_in(&mut ed, "title");

    assert!(set_block(&mut ed, BlockKind::Heading(3)));
    assert_eq!(ed.html(), "<p>title</p>");
}

#[test]
fn paragraph_to_paragraph_is_a_no_op() {
    let mut ed = editor("<p>text</p>");
    caret_in(&mut ed, "text");

    assert!(set_block(&mut ed, BlockKind::Paragraph));
    assert_eq!(ed.html(), "<p>text</p>");
    // No-op conversions must not grow the undo log.
    assert!(!ed.state().can_undo);
}

#[test]
fn code_block_gets_a_code_wrapper() {
    let mut ed = editor("<p>let x = 1;</p>");
    caret_in(&mut ed, "let x = 1;");

    assert!(set_block(&mut ed, BlockKind::CodeBlock));
    assert_eq!(ed.html(), "<pre><code>let x = 1;</code></pre>");
    assert_eq!(ed.current_block_type(), "pre");
}

#[test]
fn code_block_back_to_paragraph_unwraps_code() {
    let mut ed = editor("<pre><code>let x = 1;</code></pre>");
    caret_in(&mut ed, "let x = 1;");

    assert!(set_block(&mut ed, BlockKind::Paragraph));
    assert_eq!(ed.html(), "<p>let x = 1;</p>");
}

#[test]
fn blockquote_keeps_attributes() {
    let mut ed = editor("<p class=\"lede\">quote me</p>");
    caret_in(&mut ed, "quote me");

    assert!(set_block(&mut ed, BlockKind::Blockquote));
    assert_eq!(ed.html(), "<blockquote class=\"lede\">quote me</blockquote>");
}

#[test]
fn multi_block_selection_converts_every_block() {
    let mut ed = editor("<p>one</p><p>two</p>");
    let first = find_text(&ed, "one");
    let second = find_text(&ed, "two");
    ed.set_selection(Selection::new(
        Position::new(first, 0),
        Position::new(second, 3),
    ));

    assert!(set_block(&mut ed, BlockKind::Heading(1)));
    assert_eq!(ed.html(), "<h1>one</h1><h1>two</h1>");
}

#[test]
fn block_style_patches_the_style_attribute() {
    let mut ed = editor("<p>centered</p>");
    caret_in(&mut ed, "centered");

    assert!(ed.execute(Command::SetBlockStyle(vec![(
        "text-align".into(),
        "center".into()
    )])));
    assert_eq!(ed.html(), "<p style=\"text-align: center\">centered</p>");
    assert_eq!(ed.state().alignment.as_deref(), Some("center"));

    // An empty value clears the declaration.
    assert!(ed.execute(Command::SetBlockStyle(vec![(
        "text-align".into(),
        String::new()
    )])));
    assert_eq!(ed.html(), "<p>centered</p>");
}
