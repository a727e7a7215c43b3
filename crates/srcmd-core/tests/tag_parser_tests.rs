//! Integration tests for the incremental tag parser

use srcmd_core::{Tag, TagError, TagParser};

const PLAN: &str = "<plan>\n<planDescription><![CDATA[\nSome text goes here.\n]]>\n</planDescription>\n<action type=\"file\">\n<description><![CDATA[\n...\n]]></description>\n<file filename=\"index.tsx\"><![CDATA[\nconsole.log();\n]]></file>\n</action>\n</plan>";

/// Feed `chunks` and return every completed tag in callback order.
fn collect<'a>(chunks: impl IntoIterator<Item = &'a str>) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut parser = TagParser::new(|tag: &Tag| tags.push(tag.clone()));
    for chunk in chunks {
        parser.parse(chunk);
    }
    parser.finish().unwrap();
    tags
}

fn chars(text: &str) -> Vec<&str> {
    text.char_indices()
        .map(|(i, c)| &text[i..i + c.len_utf8()])
        .collect()
}

// ============================================================================
// Streaming Tests
// ============================================================================

#[test]
fn test_plan_fed_one_character_at_a_time() {
    let tags = collect(chars(PLAN));
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        ["planDescription", "description", "file", "action", "plan"]
    );

    assert_eq!(tags[0].content, "\nSome text goes here.\n");

    let action = &tags[3];
    assert_eq!(action.attribute("type"), Some("file"));
    assert_eq!(action.children.len(), 2);
    assert_eq!(action.children[0].name, "description");
    assert_eq!(action.children[0].content, "\n...\n");

    let file = &action.children[1];
    assert_eq!(file.name, "file");
    assert_eq!(file.attribute("filename"), Some("index.tsx"));
    assert_eq!(file.content, "\nconsole.log();\n");
}

#[test]
fn test_children_reported_before_parent() {
    let tags = collect([PLAN]);
    let action = tags.iter().position(|t| t.name == "action").unwrap();
    let file = tags.iter().position(|t| t.name == "file").unwrap();
    let description = tags.iter().position(|t| t.name == "description").unwrap();
    assert!(description < action);
    assert!(file < action);
    assert_eq!(tags.last().unwrap().name, "plan");
}

#[test]
fn test_chunk_boundaries_do_not_change_result() {
    let whole = collect([PLAN]);
    for size in [2, 3, 5, 7, 13] {
        let chunks: Vec<&str> = PLAN
            .as_bytes()
            .chunks(size)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect();
        assert_eq!(collect(chunks), whole, "chunk size {}", size);
    }
}

#[test]
fn test_cdata_closer_split_across_many_chunks() {
    let tags = collect(["<a><![CDATA[x]", "]", ">", "</a>"]);
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].content, "x");
}

#[test]
fn test_cdata_closer_reported_as_soon_as_it_arrives() {
    let mut seen = 0;
    let mut parser = TagParser::new(|_: &Tag| seen += 1);
    parser.parse("<a><![CDATA[body]]");
    assert_eq!(parser.open_tags().collect::<Vec<_>>(), ["a"]);
    parser.parse("></a>");
    assert_eq!(parser.open_tags().count(), 0);
    parser.finish().unwrap();
    assert_eq!(seen, 1);
}

#[test]
fn test_cdata_keeps_markup_literal() {
    let tags = collect(["<file><![CDATA[<div>\"x\" & <b>y</b></div>]]></file>"]);
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].content, "<div>\"x\" & <b>y</b></div>");
    assert!(tags[0].children.is_empty());
}

#[test]
fn test_multibyte_text_fed_per_character() {
    let tags = collect(chars("<note><![CDATA[héllo → wörld]]></note>"));
    assert_eq!(tags[0].content, "héllo → wörld");
}

// ============================================================================
// Content and Attribute Tests
// ============================================================================

#[test]
fn test_plain_text_content() {
    let tags = collect(["<package>react</package>"]);
    assert_eq!(tags[0].content, "react");
}

#[test]
fn test_whitespace_between_tags_is_not_content() {
    let tags = collect(["<a>\n  <b>x</b>\n</a>"]);
    assert_eq!(tags[1].name, "a");
    assert_eq!(tags[1].content, "");
    assert_eq!(tags[1].children[0].content, "x");
}

#[test]
fn test_multiple_attributes() {
    let tags = collect(["<file filename=\"src/a.ts\" mode = \"replace\" data-x=\"\"></file>"]);
    let file = &tags[0];
    assert_eq!(file.attribute("filename"), Some("src/a.ts"));
    assert_eq!(file.attribute("mode"), Some("replace"));
    assert_eq!(file.attribute("data-x"), Some(""));
    assert_eq!(file.attribute("missing"), None);
}

#[test]
fn test_self_closing_tag() {
    let tags = collect(["<plan><file filename=\"a.js\"/></plan>"]);
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "file");
    assert_eq!(tags[0].attribute("filename"), Some("a.js"));
    assert_eq!(tags[1].children.len(), 1);
}

#[test]
fn test_comments_and_declarations_are_skipped() {
    let tags = collect(["<?xml version=\"1.0\"?><!-- note --><a>x</a>"]);
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "a");
}

#[test]
fn test_repeated_children_keep_document_order() {
    let tags = collect(["<action><package>a</package><package>b</package></action>"]);
    let action = tags.last().unwrap();
    let packages: Vec<&str> = action
        .children_named("package")
        .map(|p| p.content.as_str())
        .collect();
    assert_eq!(packages, ["a", "b"]);
    assert_eq!(action.child("package").unwrap().content, "a");
}

// ============================================================================
// Error Reporting Tests
// ============================================================================

#[test]
fn test_finish_reports_unterminated_tags() {
    let mut parser = TagParser::new(|_: &Tag| {});
    parser.parse("<plan><action type=\"file\">");
    let errors = parser.finish().err().unwrap();
    let errors: Vec<TagError> = errors.into_iter().collect();
    assert_eq!(
        errors,
        [
            TagError::Unterminated {
                name: "plan".to_string()
            },
            TagError::Unterminated {
                name: "action".to_string()
            },
        ]
    );
}

#[test]
fn test_finish_reports_unterminated_cdata() {
    let mut parser = TagParser::new(|_: &Tag| {});
    parser.parse("<file><![CDATA[half");
    let errors = parser.finish().err().unwrap();
    assert_eq!(
        errors.iter().next(),
        Some(&TagError::UnterminatedCdata {
            tag: Some("file".to_string())
        })
    );
    assert_eq!(
        errors.messages()[0],
        "CDATA section was never closed inside <file>"
    );
}

#[test]
fn test_finish_reports_unterminated_marker() {
    let mut parser = TagParser::new(|_: &Tag| {});
    parser.parse("<a></a><fil");
    let errors = parser.finish().err().unwrap();
    assert_eq!(
        errors.iter().next(),
        Some(&TagError::UnterminatedMarker {
            fragment: "<fil".to_string()
        })
    );
}

#[test]
fn test_mismatched_close_is_reported_and_dropped() {
    let mut names = Vec::new();
    let mut parser = TagParser::new(|tag: &Tag| names.push(tag.name.clone()));
    parser.parse("<a><b></a></b></a>");
    assert_eq!(parser.errors().len(), 1);
    assert!(parser.finish().is_err());
    assert_eq!(names, ["b", "a"]);
}

#[test]
fn test_mismatched_close_message() {
    let mut parser = TagParser::new(|_: &Tag| {});
    parser.parse("</orphan>");
    assert_eq!(
        parser.errors().messages(),
        ["unexpected closing tag </orphan> with no open tag"]
    );

    let mut parser = TagParser::new(|_: &Tag| {});
    parser.parse("<a></b>");
    assert_eq!(
        parser.errors().messages(),
        ["unexpected closing tag </b>, expected </a>"]
    );
}

#[test]
fn test_clean_stream_finishes_ok() {
    let mut parser = TagParser::new(|_: &Tag| {});
    parser.parse("<a>text</a> trailing prose without markers");
    assert!(parser.finish().is_ok());
}

#[test]
fn test_sink_can_be_a_struct() {
    struct Counter(usize);

    impl srcmd_core::TagSink for Counter {
        fn on_tag(&mut self, _tag: &Tag) {
            self.0 += 1;
        }
    }

    let mut parser = TagParser::new(Counter(0));
    parser.parse("<a><b/><c></c></a>");
    assert_eq!(parser.sink().0, 3);
    assert_eq!(parser.finish().unwrap().0, 3);
}
