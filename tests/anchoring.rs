//! End-to-end anchoring and highlighting tests

use amnesia_anchor::anchor::{Anchor, AnchorError, ResolutionTrace, Resolver, StepOutcome, Strategy};
use amnesia_anchor::annotations::{Annotation, AnnotationQuery, AnnotationStore, JsonFileStore};
use amnesia_anchor::dom::{BoundaryPoint, Document, NodeId, TreeRange};
use amnesia_anchor::highlight::{mark, marks_for, HighlightConfig, MarkLabel, MarkOutcome};
use amnesia_anchor::selectors::{build_selectors, SelectorConfig, StructuralSelector, Target};
use amnesia_anchor::text::DocumentSnapshot;
use amnesia_anchor::Highlighter;

const FOX: &str = "The quick brown fox jumps over the lazy dog.";

fn parse(markup: &str) -> (Document, NodeId) {
    let doc = Document::parse(markup).unwrap();
    let root = doc.first_element_by_tag("body").unwrap_or_else(|| doc.root());
    (doc, root)
}

fn target_at(doc: &Document, root: NodeId, start: usize, end: usize) -> Target {
    let snapshot = DocumentSnapshot::build(doc, root);
    let range = snapshot.offsets_to_tree_range(start, end).unwrap();
    build_selectors(doc, &snapshot, &range, "chapter.xhtml", &SelectorConfig::default()).unwrap()
}

fn resolve(doc: &Document, root: NodeId, target: &Target) -> (Result<Anchor, AnchorError>, ResolutionTrace) {
    let snapshot = DocumentSnapshot::build(doc, root);
    let mut trace = ResolutionTrace::new();
    let result = Resolver::default().resolve(doc, &snapshot, target, Some(&mut trace));
    (result, trace)
}

fn resolved_text(doc: &Document, root: NodeId, range: &TreeRange) -> String {
    let snapshot = DocumentSnapshot::build(doc, root);
    snapshot.range_text(doc, range).unwrap_or_default().to_string()
}

#[test]
fn test_resolution_is_idempotent() {
    let (doc, root) = parse("<html><body><p>one <i>two</i> three</p><p>two again</p></body></html>");
    let target = target_at(&doc, root, 4, 13);

    let (first, _) = resolve(&doc, root, &target);
    let (second, _) = resolve(&doc, root, &target);
    let first = first.unwrap();
    assert_eq!(first, second.unwrap());
    assert_eq!(resolved_text(&doc, root, &first.range), "two three");
}

#[test]
fn test_structural_has_priority() {
    let (doc, root) = parse(&format!("<body><p>{}</p></body>", FOX));
    let target = target_at(&doc, root, 10, 19);

    let (result, trace) = resolve(&doc, root, &target);
    assert_eq!(result.unwrap().strategy, Strategy::Structural);
    assert_eq!(trace.attempted(), vec![Strategy::Structural]);
}

#[test]
fn test_mismatched_quote_falls_through() {
    let (doc, root) = parse("<body><p>alpha beta gamma</p></body>");
    let target = target_at(&doc, root, 6, 10);

    let (edited, root) = parse("<body><p>alpha XXbeta gamma</p></body>");
    let (result, trace) = resolve(&edited, root, &target);
    let anchor = result.unwrap();

    for strategy in [Strategy::Structural, Strategy::Position, Strategy::ContextQuote] {
        assert!(matches!(
            trace.step(strategy).unwrap().outcome,
            StepOutcome::Rejected { .. }
        ));
    }
    assert_eq!(anchor.strategy, Strategy::Quote);
    assert_eq!((anchor.start, anchor.end), (8, 12));
}

#[test]
fn test_disambiguation_picks_context_match() {
    let (doc, root) = parse("<body><p>ab se se cd</p></body>");
    let mut target = Target::empty("chapter.xhtml");
    target.add_text_quote("se", Some("ab "), Some(" se"));

    let (result, _) = resolve(&doc, root, &target);
    let anchor = result.unwrap();
    assert_eq!((anchor.start, anchor.end), (3, 5));
}

#[test]
fn test_disambiguation_with_soft_signals() {
    // The stored suffix no longer matches verbatim, so only the bare quote
    // search can succeed; the prefix still singles out the first occurrence
    let (doc, root) = parse("<body><p>ab se se cd</p></body>");
    let mut target = Target::empty("chapter.xhtml");
    target.add_text_position(0, 2);
    target.add_text_quote("se", Some("ab "), Some(" zz"));

    let (result, trace) = resolve(&doc, root, &target);
    let anchor = result.unwrap();
    assert_eq!(anchor.strategy, Strategy::Quote);
    assert_eq!((anchor.start, anchor.end), (3, 5));
    assert_eq!(trace.step(Strategy::Quote).unwrap().candidates, 2);
}

#[test]
fn test_no_false_positives() {
    let (doc, root) = parse(&format!("<body><p>{}</p></body>", FOX));
    let mut target = Target::empty("chapter.xhtml");
    target.add_range(StructuralSelector {
        start_container: "/div[3]/text()[1]".parse().unwrap(),
        start_offset: 0,
        end_container: "/div[3]/text()[1]".parse().unwrap(),
        end_offset: 5,
    });
    target.add_text_position(500, 505);
    target.add_text_quote("zebra", Some("a "), Some(" b"));

    let (result, trace) = resolve(&doc, root, &target);
    assert_eq!(
        result,
        Err(AnchorError::Exhausted {
            attempted: Strategy::ALL.to_vec()
        })
    );
    assert_eq!(trace.winner(), None);
}

#[test]
fn test_whitespace_only_range_marks_nothing() {
    let (mut doc, _) = parse("<body><div><p>a</p> <p>b</p></div></body>");
    let div = doc.first_element_by_tag("div").unwrap();
    let range = TreeRange::new(BoundaryPoint::new(div, 1), BoundaryPoint::new(div, 2));
    let before = doc.to_markup();

    let outcome = mark(&mut doc, &range, &MarkLabel::new("ws", "highlight"), &HighlightConfig::default()).unwrap();
    assert_eq!(outcome, MarkOutcome::NothingMarkable);
    assert_eq!(doc.to_markup(), before);
}

#[test]
fn test_table_cell_tagged_in_place() {
    let (mut doc, _) = parse("<body><table><tr><td>Cell one</td><td>Cell two</td></tr></table></body>");
    let table = doc.first_element_by_tag("table").unwrap();
    let row = doc.first_element_by_tag("tr").unwrap();
    let cells = doc.elements_by_tag("td");
    let row_children = doc.children(row).to_vec();
    let first_text = doc.children(cells[0])[0];
    let second_text = doc.children(cells[1])[0];

    // All of the first cell, part of the second
    let range = TreeRange::new(BoundaryPoint::new(first_text, 0), BoundaryPoint::new(second_text, 4));
    let config = HighlightConfig::default();
    let outcome = mark(&mut doc, &range, &MarkLabel::new("cell", "highlight"), &config).unwrap();

    let MarkOutcome::Marked { wrappers, tagged } = outcome else {
        panic!("expected a mark");
    };
    assert_eq!(tagged, vec![cells[0]]);
    assert_eq!(wrappers.len(), 1);
    assert_eq!(doc.parent(wrappers[0]), Some(cells[1]));

    // Row and table untouched apart from the tag
    assert_eq!(doc.children(table), &[row]);
    assert_eq!(doc.children(row), row_children.as_slice());
    assert_eq!(doc.children(cells[0]), &[first_text]);
    assert_eq!(doc.attribute(cells[0], "data-annotation-id"), Some("cell"));
    assert!(doc.attribute(row, "data-annotation-id").is_none());
    assert_eq!(marks_for(&doc, "cell", &config).len(), 2);
}

#[test]
fn test_round_trip_within_segments() {
    let (doc, root) = parse("<body><p>héllo <b>wörld</b></p><p>again</p></body>");
    let snapshot = DocumentSnapshot::build(&doc, root);

    for segment in snapshot.segments() {
        let len = segment.len();
        for start in 0..len {
            for end in start + 1..=len {
                let range = TreeRange::within(segment.node, start, end);
                let (s, e) = snapshot.tree_range_to_offsets(&doc, &range).unwrap();
                let back = snapshot.offsets_to_tree_range(s, e).unwrap();
                assert_eq!(
                    snapshot.range_text(&doc, &back),
                    snapshot.range_text(&doc, &range)
                );
                assert_eq!(back, range);
            }
        }
    }
}

#[test]
fn test_brown_fox_end_to_end() {
    let (mut doc, root) = parse(&format!("<html><body><p>{}</p></body></html>", FOX));
    let target = target_at(&doc, root, 10, 19);

    let quote = target.quote().unwrap();
    assert_eq!(quote.exact, "brown fox");
    assert_eq!(quote.prefix(), "The quick ");
    assert_eq!(quote.suffix(), " jumps over the lazy dog.");

    // Delete "quick "
    let p = doc.first_element_by_tag("p").unwrap();
    let text = doc.children(p)[0];
    doc.set_text(text, "The brown fox jumps over the lazy dog.").unwrap();

    let (result, trace) = resolve(&doc, root, &target);
    let anchor = result.unwrap();
    assert!(matches!(
        trace.step(Strategy::Position).unwrap().outcome,
        StepOutcome::Rejected { .. }
    ));
    assert!(matches!(
        trace.step(Strategy::ContextQuote).unwrap().outcome,
        StepOutcome::Rejected { .. }
    ));
    assert_eq!(anchor.strategy, Strategy::Quote);
    assert_eq!(resolved_text(&doc, root, &anchor.range), "brown fox");

    let outcome = mark(&mut doc, &anchor.range, &MarkLabel::new("fox", "highlight"), &HighlightConfig::default()).unwrap();
    assert!(outcome.is_marked());
    assert!(doc.to_markup().contains(">brown fox</span> jumps"));
}

#[test]
fn test_restructured_document_uses_position() {
    let (doc, root) = parse("<body><p>Hello world</p></body>");
    let target = target_at(&doc, root, 6, 11);

    let (moved, root) = parse("<body><div><p>Hello world</p></div></body>");
    let (result, trace) = resolve(&moved, root, &target);
    assert!(matches!(
        trace.step(Strategy::Structural).unwrap().outcome,
        StepOutcome::Rejected { .. }
    ));
    assert_eq!(result.unwrap().strategy, Strategy::Position);
}

#[test]
fn test_store_and_render_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.json");
    let (mut doc, root) = parse(&format!("<body><p>{}</p><p>Second line.</p></body>", FOX));
    let mut highlighter = Highlighter::default();

    let note_id = {
        let mut store = JsonFileStore::open(&path).unwrap();
        let fox = highlighter
            .create_target_from_offsets(&doc, root, 10, 19, "chapter.xhtml")
            .unwrap();
        let line = highlighter
            .create_target_from_offsets(&doc, root, 44, 50, "chapter.xhtml")
            .unwrap();
        store.save(Annotation::new_highlight(fox)).unwrap();
        store.save(Annotation::new_note(line, "which one?")).unwrap()
    };

    let mut store = JsonFileStore::open(&path).unwrap();
    let annotations = store.load(&AnnotationQuery::for_source("chapter.xhtml")).unwrap();
    assert_eq!(annotations.len(), 2);

    let report = highlighter.apply(&mut doc, root, &annotations).unwrap();
    assert_eq!(report.summary(), "2 of 2 shown");

    assert!(store.delete(&note_id).unwrap());
    assert_eq!(highlighter.remove(&mut doc, &note_id).unwrap(), 1);
    assert!(doc.to_markup().contains("<p>Second line.</p>"));
    assert_eq!(store.load(&AnnotationQuery::default()).unwrap().len(), 1);
}
