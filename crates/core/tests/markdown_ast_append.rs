use quire_core::markdown_ast::{MarkdownAstError, MarkdownEditor, SectionMatch};

// === Placement ===

#[test]
fn append_skips_over_subsections() {
    let input = "# Project\n\n## Tasks\n\n- a\n\n### Sub\n\n- b\n\n## Log\n";

    let result =
        MarkdownEditor::append_to_section(input, &SectionMatch::new("Tasks"), "- c").unwrap();

    assert_eq!(result.content, "# Project\n\n## Tasks\n\n- a\n\n### Sub\n\n- b\n- c\n\n## Log\n");
    assert_eq!(result.matched_heading.line, 3);
}

#[test]
fn append_preserves_wikilinks() {
    let input = "## Inbox\n- see [[people/freya|Freya]]\n";

    let result = MarkdownEditor::append_to_section(
        input,
        &SectionMatch::from_heading_line("## Inbox"),
        "- [[projects/alpha]] kickoff\n",
    )
    .unwrap();

    assert_eq!(result.content, "## Inbox\n- see [[people/freya|Freya]]\n- [[projects/alpha]] kickoff\n");
}

#[test]
fn append_to_heading_on_last_line() {
    let input = "# A\n## Empty";
    let result = MarkdownEditor::append_to_section(input, &SectionMatch::new("Empty"), "x").unwrap();
    assert_eq!(result.content, "# A\n## Empty\nx\n");
}

// === Matching ===

#[test]
fn case_insensitive_by_default() {
    let input = "## Inbox\n";
    assert!(MarkdownEditor::append_to_section(input, &SectionMatch::new("INBOX"), "x").is_ok());

    let err = MarkdownEditor::append_to_section(
        input,
        &SectionMatch::new("inbox").case_sensitive(true),
        "x",
    )
    .unwrap_err();
    assert!(matches!(err, MarkdownAstError::SectionNotFound(ref t) if t == "inbox"));
}

#[test]
fn from_heading_line_without_hashes_matches_any_level() {
    let m = SectionMatch::from_heading_line("Captured");
    assert_eq!(m.level, None);
    assert!(MarkdownEditor::section_exists("### Captured\n", &m));
    assert!(!MarkdownEditor::section_exists("### Captured\n", &SectionMatch::from_heading_line("## Captured")));
}

#[test]
fn section_exists_ignores_code_blocks() {
    let input = "# Real\n\n```\n## Fake\n```\n";
    assert!(MarkdownEditor::section_exists(input, &SectionMatch::new("Real")));
    assert!(!MarkdownEditor::section_exists(input, &SectionMatch::new("Fake")));
}

#[test]
fn empty_document_is_rejected() {
    let err = MarkdownEditor::append_to_section("  \n", &SectionMatch::new("Any"), "x").unwrap_err();
    assert!(matches!(err, MarkdownAstError::EmptyDocument));
}
